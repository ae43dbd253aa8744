//! Per-organization silence files.
//!
//! # File Layout
//!
//! ```text
//! <data_path>/alerting/<org_id>/silences
//! ```
//!
//! The file holds a length-delimited stream of silences (see [`super::codec`]).
//! It is always rewritten as a whole through [`ReplaceFile`], never appended to.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use super::codec::{self, CodecError};
use super::replace::{ReplaceError, ReplaceFile};
use crate::config::MigrationConfig;
use crate::sources::{RandomSource, ThreadRandom};
use crate::types::{OrgId, SilenceBatch};

/// Errors that can occur while writing or reading a silence file.
#[derive(Debug, Error)]
pub enum SilenceFileError {
    /// The batch could not be encoded. Nothing was written.
    #[error("encoding error: {0}")]
    Codec(#[from] CodecError),

    /// Staging, syncing or renaming the file failed.
    #[error(transparent)]
    Replace(#[from] ReplaceError),

    /// IO error while reading a silence file.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for silence file operations.
pub type Result<T> = std::result::Result<T, SilenceFileError>;

/// Returns the silence file path for an organization.
pub fn silences_path(data_path: &Path, org_id: OrgId) -> PathBuf {
    data_path
        .join("alerting")
        .join(org_id.to_string())
        .join("silences")
}

/// Writes silence batches to per-organization files under a data root.
///
/// The writer holds no per-write state, so one instance can serve many
/// organizations, including from several threads at once.
#[derive(Clone)]
pub struct SilenceFileWriter {
    data_path: PathBuf,
    random: Arc<dyn RandomSource>,
}

impl SilenceFileWriter {
    /// Creates a writer rooted at `data_path` that names staging files with
    /// the given random source.
    pub fn new(data_path: impl Into<PathBuf>, random: Arc<dyn RandomSource>) -> Self {
        SilenceFileWriter {
            data_path: data_path.into(),
            random,
        }
    }

    /// Creates a writer from configuration using the thread-local RNG.
    pub fn from_config(config: &MigrationConfig) -> Self {
        SilenceFileWriter::new(config.data_path.clone(), Arc::new(ThreadRandom))
    }

    /// Returns the data root.
    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    /// Returns the silence file path for an organization.
    pub fn path_for_org(&self, org_id: OrgId) -> PathBuf {
        silences_path(&self.data_path, org_id)
    }

    /// Atomically replaces the organization's silence file with `batch`.
    ///
    /// The whole batch is encoded in memory first, so an invalid record aborts
    /// the write before any file is created. Returns the path written.
    pub fn write(&self, org_id: OrgId, batch: &SilenceBatch) -> Result<PathBuf> {
        debug!(org_id = %org_id, silences = batch.len(), "Writing silences file");

        let bytes = codec::encode_silences(batch)?;
        let path = self.path_for_org(org_id);

        let mut staged = ReplaceFile::create(&path, self.random.as_ref())?;
        if let Err(e) = staged.write_payload(&bytes) {
            let staging_path = staged.staging_path().to_path_buf();
            if let Err(cleanup) = staged.abort() {
                warn!(path = %staging_path.display(), error = %cleanup, "Failed to remove staging file");
            }
            return Err(e.into());
        }
        staged.commit()?;

        debug!(org_id = %org_id, path = %path.display(), bytes = bytes.len(), "Wrote silences file");
        Ok(path)
    }
}

impl std::fmt::Debug for SilenceFileWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SilenceFileWriter")
            .field("data_path", &self.data_path)
            .finish_non_exhaustive()
    }
}

/// Reads and decodes a silence file.
pub fn read_silences_file(path: &Path) -> Result<SilenceBatch> {
    let bytes = std::fs::read(path)?;
    Ok(codec::decode_silences(&bytes)?)
}

/// Reads a silence file, returning None if it doesn't exist.
pub fn try_read_silences_file(path: &Path) -> Result<Option<SilenceBatch>> {
    match read_silences_file(path) {
        Ok(batch) => Ok(Some(batch)),
        Err(SilenceFileError::Io(e)) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}
