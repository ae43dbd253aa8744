//! Newtype wrappers for domain identifiers.
//!
//! These keep organization ids and silence ids from being mixed up with other
//! integers and strings flowing through the migration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An organization identifier. Each organization gets its own silence file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrgId(pub i64);

impl fmt::Display for OrgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for OrgId {
    fn from(n: i64) -> Self {
        OrgId(n)
    }
}

/// A short silence identifier.
///
/// Note: uniqueness is probabilistic. Ids are drawn from a random source and
/// never checked against existing silences.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SilenceId(pub String);

impl SilenceId {
    pub fn new(s: impl Into<String>) -> Self {
        SilenceId(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SilenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SilenceId {
    fn from(s: String) -> Self {
        SilenceId(s)
    }
}

impl From<&str> for SilenceId {
    fn from(s: &str) -> Self {
        SilenceId(s.to_string())
    }
}
