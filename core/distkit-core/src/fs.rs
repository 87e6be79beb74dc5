//! Filesystem seam used by the stages that gate a run

use std::io;
use std::path::Path;

/// The handful of filesystem operations whose failure decides whether a run
/// continues. Tests swap in implementations that refuse removals.
pub trait FileSystem {
    fn exists(&self, path: &Path) -> bool;

    fn remove_dir_all(&self, path: &Path) -> io::Result<()>;
}

/// Pass-through to `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_dir_all(path)
    }
}
