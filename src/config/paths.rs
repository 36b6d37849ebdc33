//! Absolute locations of the fixed site directories.
//!
//! ```text
//! <root>/
//!   ├── content/   pages (required)
//!   ├── layouts/   layout wrappers + include fragments
//!   ├── assets/    copied to _output/assets/
//!   ├── extra/     merged into _output/
//!   └── _output/   generated, wiped on every build
//! ```

use super::defaults::dirs;
use std::path::{Path, PathBuf};

/// Directory layout of one site, resolved against its root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SitePaths {
    pub root: PathBuf,
    pub content: PathBuf,
    pub layouts: PathBuf,
    pub assets: PathBuf,
    pub extra: PathBuf,
    pub output: PathBuf,
}

impl SitePaths {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            content: root.join(dirs::CONTENT),
            layouts: root.join(dirs::LAYOUTS),
            assets: root.join(dirs::ASSETS),
            extra: root.join(dirs::EXTRA),
            output: root.join(dirs::OUTPUT),
        }
    }

    /// Whether `path` is the output directory or lives inside it.
    #[inline]
    pub fn is_output(&self, path: &Path) -> bool {
        path.starts_with(&self.output)
    }
}

/// Make a path absolute, using canonicalize if the path exists.
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        }
    })
}
