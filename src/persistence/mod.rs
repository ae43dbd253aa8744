//! Persistence layer for migrated silences.
//!
//! # File Layout
//!
//! ```text
//! <data_path>/alerting/<org_id>/
//!   silences                # length-delimited MeshSilence frames
//!   silences.<hex suffix>   # staging file, present only mid-write or after a failed write
//! ```
//!
//! # Crash Safety
//!
//! - The batch is encoded fully in memory before any file is touched
//! - Bytes go to a uniquely named staging file in the same directory
//! - The staging file is fsynced, closed and renamed over `silences`
//! - The directory is fsynced where the platform allows; a failure there is
//!   logged, since the rename has already happened
//!
//! A reader therefore sees either the previous file or the new one, never a
//! mixture or a truncation.

pub mod codec;
pub mod fsync;
pub mod replace;
pub mod silence_file;

pub use codec::{CodecError, decode_silences, encode_silences};
pub use fsync::{fsync_dir, fsync_file};
pub use replace::{ReplaceError, ReplaceFile};
pub use silence_file::{
    SilenceFileError, SilenceFileWriter, read_silences_file, silences_path, try_read_silences_file,
};
