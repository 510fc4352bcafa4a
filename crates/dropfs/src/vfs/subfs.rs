//! Sub-directory views.
//!
//! A [`SubFs`] exposes one directory of a parent filesystem as its own root.
//! Paths are rewritten onto the parent and every operation is delegated.

use async_trait::async_trait;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use super::error::{VfsError, VfsResult};
use super::ops::{BinaryFile, Filesystem};
use super::path;
use super::types::{Capabilities, EntryInfo, SetInfo};

/// A filesystem bound to a subtree of a parent filesystem.
#[derive(Clone)]
pub struct SubFs {
    parent: Arc<dyn Filesystem>,
    /// Normalized absolute path of the bound directory in the parent.
    root: String,
}

impl fmt::Debug for SubFs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubFs").field("root", &self.root).finish()
    }
}

impl SubFs {
    /// Bind `root` (a path in `parent`) as the root of a new view.
    ///
    /// No remote call is made; use `opendir` on the provider to check the
    /// directory exists first.
    pub fn new(parent: Arc<dyn Filesystem>, root: &str) -> VfsResult<Self> {
        Ok(Self {
            parent,
            root: path::normalize(root)?,
        })
    }

    /// The bound directory, as a path in the parent.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// The filesystem this view delegates to.
    pub fn parent(&self) -> &Arc<dyn Filesystem> {
        &self.parent
    }

    /// Translate a path in this view to a path in the parent.
    pub fn delegate_path(&self, path: &str) -> VfsResult<String> {
        path::join(&self.root, path)
    }

    /// Open a directory of this view as a further view on the same parent.
    pub async fn opendir(&self, path: &str) -> VfsResult<SubFs> {
        let full = self.delegate_path(path)?;
        let info = self.parent.getinfo(&full).await?;
        if !info.is_dir() {
            return Err(VfsError::directory_expected(path));
        }
        SubFs::new(Arc::clone(&self.parent), &full)
    }
}

#[async_trait]
impl Filesystem for SubFs {
    async fn getinfo(&self, path: &str) -> VfsResult<EntryInfo> {
        let full = self.delegate_path(path)?;
        let mut info = self.parent.getinfo(&full).await?;
        if path::is_root(path) {
            info.name.clear();
        }
        Ok(info)
    }

    async fn listdir(&self, path: &str) -> VfsResult<Vec<String>> {
        let full = self.delegate_path(path)?;
        self.parent.listdir(&full).await
    }

    async fn scandir(&self, path: &str, page: Option<Range<usize>>) -> VfsResult<Vec<EntryInfo>> {
        let full = self.delegate_path(path)?;
        self.parent.scandir(&full, page).await
    }

    async fn openbin(&self, path: &str, mode: &str) -> VfsResult<Box<dyn BinaryFile>> {
        let full = self.delegate_path(path)?;
        self.parent.openbin(&full, mode).await
    }

    async fn setinfo(&self, path: &str, info: &SetInfo) -> VfsResult<()> {
        let full = self.delegate_path(path)?;
        self.parent.setinfo(&full, info).await
    }

    async fn makedir(&self, path: &str, recreate: bool) -> VfsResult<SubFs> {
        let full = self.delegate_path(path)?;
        self.parent.makedir(&full, recreate).await
    }

    async fn remove(&self, path: &str) -> VfsResult<()> {
        let full = self.delegate_path(path)?;
        self.parent.remove(&full).await
    }

    async fn removedir(&self, path: &str) -> VfsResult<()> {
        if path::is_root(&path::normalize(path)?) {
            return Err(VfsError::RemoveRoot);
        }
        let full = self.delegate_path(path)?;
        self.parent.removedir(&full).await
    }

    fn capabilities(&self) -> Capabilities {
        self.parent.capabilities()
    }
}
