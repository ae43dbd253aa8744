//! All-or-nothing file replacement.
//!
//! A [`ReplaceFile`] is a staging file created next to its target. Bytes are
//! written to the staging file and only [`ReplaceFile::commit`] moves them
//! into place:
//! 1. fsync the staging file
//! 2. close it
//! 3. rename it onto the target
//! 4. fsync the parent directory (best effort, logged on failure)
//!
//! Readers of the target see either its previous complete content or the new
//! complete content. If anything fails before the rename, or the handle is
//! dropped without committing, the target is untouched and the staging file
//! may be left behind. Staging names never alias the target.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use super::fsync::{fsync_dir, fsync_file};
use crate::sources::RandomSource;

/// Errors from staging or committing a replacement.
#[derive(Debug, Error)]
pub enum ReplaceError {
    /// The target path has no file name to derive a staging name from.
    #[error("cannot replace {0}: path has no file name")]
    InvalidTarget(PathBuf),

    /// The parent directory or the staging file could not be created.
    #[error("failed to create staging file {path}: {source}")]
    Staging {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Writing the payload to the staging file failed.
    #[error("failed to write staging file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Syncing the staging file failed. The rename was not attempted.
    #[error("failed to sync staging file {path}: {source}")]
    Durability {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The rename onto the target failed. The target is unchanged.
    #[error("failed to rename {staging} to {target}: {source}")]
    Commit {
        staging: PathBuf,
        target: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result type for replace operations.
pub type Result<T> = std::result::Result<T, ReplaceError>;

/// A staging file that replaces its target when committed.
#[derive(Debug)]
pub struct ReplaceFile {
    file: File,
    staging_path: PathBuf,
    target: PathBuf,
}

impl ReplaceFile {
    /// Creates a fresh staging file `<target>.<hex suffix>` beside `target`.
    ///
    /// The parent directory chain is created if missing. The staging file is
    /// opened with `create_new`, so a suffix collision is an error rather than
    /// a silent overwrite of someone else's staging file.
    pub fn create(target: impl AsRef<Path>, random: &dyn RandomSource) -> Result<Self> {
        let target = target.as_ref().to_path_buf();
        let file_name = target
            .file_name()
            .ok_or_else(|| ReplaceError::InvalidTarget(target.clone()))?;

        let mut staging_name = file_name.to_os_string();
        staging_name.push(format!(".{:x}", random.next_u64()));
        let staging_path = target.with_file_name(staging_name);

        fs::create_dir_all(parent_dir(&target)).map_err(|source| ReplaceError::Staging {
            path: staging_path.clone(),
            source,
        })?;

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&staging_path)
            .map_err(|source| ReplaceError::Staging {
                path: staging_path.clone(),
                source,
            })?;

        Ok(ReplaceFile {
            file,
            staging_path,
            target,
        })
    }

    /// Returns the path of the staging file.
    pub fn staging_path(&self) -> &Path {
        &self.staging_path
    }

    /// Returns the path that will be replaced on commit.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Writes the whole payload to the staging file.
    pub fn write_payload(&mut self, bytes: &[u8]) -> Result<()> {
        self.file
            .write_all(bytes)
            .map_err(|source| ReplaceError::Write {
                path: self.staging_path.clone(),
                source,
            })
    }

    /// Syncs, closes and renames the staging file onto the target.
    ///
    /// Close errors are not observable through `std::fs::File`; the preceding
    /// `sync_all` is what establishes durability. Once the rename has
    /// succeeded the replace is complete: a failed directory sync is logged
    /// and not returned.
    pub fn commit(self) -> Result<()> {
        self.commit_with(fsync_file, fsync_dir)
    }

    fn commit_with<F, D>(self, sync_file: F, sync_dir: D) -> Result<()>
    where
        F: FnOnce(&File) -> io::Result<()>,
        D: FnOnce(&Path) -> io::Result<()>,
    {
        let ReplaceFile {
            file,
            staging_path,
            target,
        } = self;

        if let Err(source) = sync_file(&file) {
            warn!(path = %staging_path.display(), error = %source, "Leaving unsynced staging file behind");
            return Err(ReplaceError::Durability {
                path: staging_path,
                source,
            });
        }
        drop(file);

        if let Err(source) = fs::rename(&staging_path, &target) {
            warn!(path = %staging_path.display(), error = %source, "Leaving staging file behind after failed rename");
            return Err(ReplaceError::Commit {
                staging: staging_path,
                target,
                source,
            });
        }

        let dir = parent_dir(&target);
        if let Err(e) = sync_dir(dir) {
            warn!(dir = %dir.display(), error = %e, "Replaced file but could not sync its directory");
        }

        debug!(path = %target.display(), "Replaced file");
        Ok(())
    }

    /// Discards the staging file without touching the target.
    pub fn abort(self) -> io::Result<()> {
        let ReplaceFile {
            file, staging_path, ..
        } = self;
        drop(file);
        fs::remove_file(&staging_path)
    }
}

impl Write for ReplaceFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Returns the directory holding `path`, treating a bare file name as `.`.
fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}
