//! Path helpers.
//!
//! VFS paths are `/`-separated strings, independent of the host platform.
//! Normalized paths are absolute, contain no `.` or `..` components, and have
//! no trailing or repeated separators. The root is `/`.

use super::error::{VfsError, VfsResult};

/// Normalize a path: make it absolute, resolve `.` and `..`, drop empty
/// components.
///
/// Fails with [`VfsError::IllegalBackReference`] if `..` would climb above
/// the root.
pub fn normalize(path: &str) -> VfsResult<String> {
    let mut parts: Vec<&str> = Vec::new();
    for component in path.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    return Err(VfsError::IllegalBackReference(path.to_string()));
                }
            }
            name => parts.push(name),
        }
    }
    Ok(format!("/{}", parts.join("/")))
}

/// Normalize and reject any of `invalid_chars`.
pub fn validate(path: &str, invalid_chars: &str) -> VfsResult<String> {
    if path.chars().any(|c| invalid_chars.contains(c)) {
        return Err(VfsError::InvalidCharsInPath(path.to_string()));
    }
    normalize(path)
}

/// Returns true for the root path.
pub fn is_root(path: &str) -> bool {
    path.is_empty() || path.trim_matches('/').is_empty()
}

/// Join a normalized base with a relative (or absolute) child path.
///
/// The child is always interpreted relative to `base`, so the result cannot
/// leave `base`.
pub fn join(base: &str, child: &str) -> VfsResult<String> {
    let child = normalize(child)?;
    if child == "/" {
        return Ok(base.to_string());
    }
    if base == "/" {
        Ok(child)
    } else {
        Ok(format!("{base}{child}"))
    }
}

/// Parent of a normalized path. The parent of `/` is `/`.
pub fn dirname(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &path[..idx],
    }
}

/// Final component of a normalized path. Empty for `/`.
pub fn basename(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// The token the remote listing API expects: the empty string for root,
/// the absolute path otherwise.
pub fn remote_token(path: &str) -> &str {
    if path == "/" { "" } else { path }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("").unwrap(), "/");
        assert_eq!(normalize("/").unwrap(), "/");
        assert_eq!(normalize("a/b").unwrap(), "/a/b");
        assert_eq!(normalize("/a//b/").unwrap(), "/a/b");
        assert_eq!(normalize("/a/./b/../c").unwrap(), "/a/c");
    }

    #[test]
    fn test_normalize_back_reference() {
        assert!(matches!(
            normalize("/.."),
            Err(VfsError::IllegalBackReference(_))
        ));
        assert!(matches!(
            normalize("a/../../b"),
            Err(VfsError::IllegalBackReference(_))
        ));
    }

    #[test]
    fn test_validate_invalid_chars() {
        assert!(matches!(
            validate("/a:b", ":"),
            Err(VfsError::InvalidCharsInPath(_))
        ));
        assert_eq!(validate("/a/b", ":").unwrap(), "/a/b");
    }

    #[test]
    fn test_join() {
        assert_eq!(join("/", "a").unwrap(), "/a");
        assert_eq!(join("/base", "a/b").unwrap(), "/base/a/b");
        assert_eq!(join("/base", "/a").unwrap(), "/base/a");
        assert_eq!(join("/base", "/").unwrap(), "/base");
        assert!(join("/base", "..").is_err());
    }

    #[test]
    fn test_dirname_basename() {
        assert_eq!(dirname("/a/b"), "/a");
        assert_eq!(dirname("/a"), "/");
        assert_eq!(dirname("/"), "/");
        assert_eq!(basename("/a/b.txt"), "b.txt");
        assert_eq!(basename("/"), "");
    }

    #[test]
    fn test_root_and_token() {
        assert!(is_root("/"));
        assert!(is_root(""));
        assert!(is_root("//"));
        assert!(!is_root("/a"));
        assert_eq!(remote_token("/"), "");
        assert_eq!(remote_token("/a"), "/a");
    }
}
