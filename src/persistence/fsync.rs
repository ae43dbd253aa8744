//! fsync helpers for durable file replacement.
//!
//! Replacing a file safely needs two syncs: one on the staged file so its
//! bytes are on disk before the rename, and one on the parent directory so
//! the rename itself survives a power loss.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

/// Syncs a file's contents and metadata to disk (`fsync(2)`).
pub fn fsync_file(file: &File) -> io::Result<()> {
    file.sync_all()
}

/// Syncs a directory so that entries created or renamed in it are durable.
///
/// # Errors
///
/// Returns an error if the directory cannot be opened or the sync fails.
pub fn fsync_dir(dir_path: &Path) -> io::Result<()> {
    let dir = OpenOptions::new().read(true).open(dir_path)?;
    dir.sync_all()
}
