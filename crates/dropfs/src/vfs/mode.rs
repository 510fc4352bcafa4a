//! Open modes.
//!
//! Files are opened with a mode string such as `"rb"`, `"w"`, `"r+"` or
//! `"ra"`. The string is parsed once into [`OpenMode`] flags.

use std::fmt;
use std::str::FromStr;

use super::error::{VfsError, VfsResult};

const MODE_CHARS: &str = "rwxabt+";

/// Parsed open mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenMode {
    raw: String,
    /// Read access requested.
    pub reading: bool,
    /// Write access requested.
    pub writing: bool,
    /// Writes land after the existing content.
    pub appending: bool,
    /// Existing content is discarded on open.
    pub truncate: bool,
    /// Create the file if it does not exist.
    pub create: bool,
    /// Fail if the file already exists.
    pub exclusive: bool,
    /// Binary mode was requested explicitly.
    pub binary: bool,
    /// Text mode was requested explicitly.
    pub text: bool,
}

impl OpenMode {
    /// Parse a mode string.
    ///
    /// The first character must be one of `r`, `w`, `x` or `a`; the rest may be
    /// any of `rwxabt+`. `b` and `t` are mutually exclusive.
    pub fn parse(mode: &str) -> VfsResult<Self> {
        let Some(first) = mode.chars().next() else {
            return Err(VfsError::invalid_mode("empty mode"));
        };
        if !"rwxa".contains(first) {
            return Err(VfsError::invalid_mode(format!(
                "mode must start with 'r', 'w', 'x' or 'a': {mode:?}"
            )));
        }
        if let Some(bad) = mode.chars().find(|c| !MODE_CHARS.contains(*c)) {
            return Err(VfsError::invalid_mode(format!(
                "unknown mode character {bad:?} in {mode:?}"
            )));
        }

        let has = |c: char| mode.contains(c);
        if has('b') && has('t') {
            return Err(VfsError::invalid_mode(format!(
                "mode can't be both binary and text: {mode:?}"
            )));
        }

        Ok(Self {
            raw: mode.to_string(),
            reading: has('r') || has('+'),
            writing: has('w') || has('a') || has('x') || has('+'),
            appending: has('a'),
            truncate: has('w') || has('x'),
            create: has('a') || has('w') || has('x'),
            exclusive: has('x'),
            binary: has('b'),
            text: has('t'),
        })
    }

    /// Parse a mode for binary access, rejecting text mode.
    pub fn parse_binary(mode: &str) -> VfsResult<Self> {
        let parsed = Self::parse(mode)?;
        if parsed.text {
            return Err(VfsError::invalid_mode(format!(
                "text mode not valid for binary access: {mode:?}"
            )));
        }
        Ok(parsed)
    }

    /// Read-only access.
    pub fn read() -> Self {
        Self::fixed("rb")
    }

    /// Create or truncate, write-only.
    pub fn write() -> Self {
        Self::fixed("wb")
    }

    /// Create if missing, append.
    pub fn append() -> Self {
        Self::fixed("ab")
    }

    /// Read and write existing content in place.
    pub fn update() -> Self {
        Self::fixed("rb+")
    }

    /// Create exclusively (fail if exists), write-only.
    pub fn create_exclusive() -> Self {
        Self::fixed("xb")
    }

    fn fixed(mode: &str) -> Self {
        match Self::parse(mode) {
            Ok(parsed) => parsed,
            Err(_) => unreachable!("built-in mode {mode:?} is valid"),
        }
    }

    /// The original mode string.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether the existing remote content should be loaded into the buffer.
    pub fn keeps_content(&self) -> bool {
        !self.truncate && (self.reading || self.appending)
    }
}

impl FromStr for OpenMode {
    type Err = VfsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
