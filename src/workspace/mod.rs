//! Workspace file access.
//!
//! The engine reads grounding context through the [`Workspace`] trait so it
//! never touches the file system directly.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

/// File listing and reading for one workspace root.
#[async_trait]
pub trait Workspace: Send + Sync {
    /// The workspace root directory.
    fn root(&self) -> &Path;

    /// Resolve a glob pattern (relative to the root) to matching files.
    async fn list_files(&self, pattern: &str) -> anyhow::Result<Vec<PathBuf>>;

    /// Read a file as text.
    async fn read_file(&self, path: &Path) -> anyhow::Result<String>;
}

/// Whether a pattern contains glob wildcards.
pub fn is_glob_pattern(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Workspace backed by the local file system.
#[derive(Debug, Clone)]
pub struct LocalWorkspace {
    root: PathBuf,
}

impl LocalWorkspace {
    /// Create a workspace rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create a workspace rooted at the current directory.
    pub fn from_current_dir() -> anyhow::Result<Self> {
        Ok(Self::new(std::env::current_dir()?))
    }

    /// Resolve a workspace-relative or absolute path.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

#[async_trait]
impl Workspace for LocalWorkspace {
    fn root(&self) -> &Path {
        &self.root
    }

    async fn list_files(&self, pattern: &str) -> anyhow::Result<Vec<PathBuf>> {
        let full = self.resolve(Path::new(pattern));
        let full = full.to_string_lossy().into_owned();

        let mut files = Vec::new();
        for entry in glob::glob(&full)? {
            match entry {
                Ok(path) if path.is_file() => files.push(path),
                Ok(_) => {}
                Err(e) => tracing::warn!(pattern, error = %e, "Unreadable glob match"),
            }
        }

        Ok(files)
    }

    async fn read_file(&self, path: &Path) -> anyhow::Result<String> {
        let content = tokio::fs::read_to_string(self.resolve(path)).await?;
        Ok(content)
    }
}
