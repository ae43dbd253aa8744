//! Core domain types for silence migration.

pub mod ids;
pub mod silence;

pub use ids::{OrgId, SilenceId};
pub use silence::{InvalidSilence, MatchType, Matcher, SilenceBatch, SilenceRecord};
