//! Storage configuration types.

use std::path::{Path, PathBuf};

use crate::upload::Destination;

/// Storage service configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Upload root. Relative paths resolve against the working directory.
    pub root: PathBuf,
}

impl StorageConfig {
    /// Default upload root.
    pub const DEFAULT_ROOT: &'static str = "uploads";

    /// Create a config rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directories that must exist before uploads are accepted: the root,
    /// then one per destination.
    #[must_use]
    pub fn required_dirs(&self) -> Vec<PathBuf> {
        std::iter::once(self.root.clone())
            .chain(Destination::ALL.iter().map(|d| self.root.join(d.as_str())))
            .collect()
    }

    /// Upload root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ROOT)
    }
}
