//! Silence records and batches.
//!
//! A silence suppresses notifications for alerts whose labels satisfy every
//! one of its matchers while the current time lies inside its window.

use std::collections::BTreeMap;
use std::ops::Deref;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ids::SilenceId;

/// How a matcher compares a label value against its pattern.
///
/// Only exact equality is produced by the migration; other alertmanager
/// matcher kinds are rejected when decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Equal,
}

/// A `(label name, pattern, match type)` triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Matcher {
    pub name: String,
    pub pattern: String,
    pub match_type: MatchType,
}

impl Matcher {
    /// Creates an exact-equality matcher.
    pub fn equal(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Matcher {
            name: name.into(),
            pattern: pattern.into(),
            match_type: MatchType::Equal,
        }
    }

    /// Checks whether a label set satisfies this matcher.
    ///
    /// A missing label is treated as the empty string, as alertmanager does.
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        let value = labels.get(&self.name).map(String::as_str).unwrap_or("");
        match self.match_type {
            MatchType::Equal => value == self.pattern,
        }
    }
}

/// Reasons a silence record cannot be persisted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidSilence {
    #[error("silence has an empty id")]
    EmptyId,

    #[error("silence {0} has no matchers")]
    NoMatchers(SilenceId),

    #[error("silence {0} has a matcher with an empty label name")]
    EmptyMatcherName(SilenceId),

    #[error("silence {id} ends at {ends_at}, not after its start {starts_at}")]
    EmptyWindow {
        id: SilenceId,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    },

    #[error("silence {id} expires at {expires_at}, before it ends at {ends_at}")]
    ExpiresBeforeEnd {
        id: SilenceId,
        ends_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    },
}

/// A silence together with the time its stored envelope may be garbage collected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SilenceRecord {
    pub id: SilenceId,

    /// All matchers must match (logical AND).
    pub matchers: Vec<Matcher>,

    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,

    pub created_by: String,
    pub comment: String,

    /// When the downstream store may drop this record. Equal to `ends_at` for
    /// migration-generated silences.
    pub expires_at: DateTime<Utc>,
}

impl SilenceRecord {
    /// Checks the structural invariants required before a record is written.
    pub fn validate(&self) -> Result<(), InvalidSilence> {
        if self.id.is_empty() {
            return Err(InvalidSilence::EmptyId);
        }
        if self.matchers.is_empty() {
            return Err(InvalidSilence::NoMatchers(self.id.clone()));
        }
        if self.matchers.iter().any(|m| m.name.is_empty()) {
            return Err(InvalidSilence::EmptyMatcherName(self.id.clone()));
        }
        if self.ends_at <= self.starts_at {
            return Err(InvalidSilence::EmptyWindow {
                id: self.id.clone(),
                starts_at: self.starts_at,
                ends_at: self.ends_at,
            });
        }
        if self.expires_at < self.ends_at {
            return Err(InvalidSilence::ExpiresBeforeEnd {
                id: self.id.clone(),
                ends_at: self.ends_at,
                expires_at: self.expires_at,
            });
        }
        Ok(())
    }

    /// Checks whether every matcher is satisfied by the label set.
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.matchers.iter().all(|m| m.matches(labels))
    }

    /// Checks whether `at` lies within `[starts_at, ends_at)`.
    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        self.starts_at <= at && at < self.ends_at
    }
}

/// An ordered batch of silences destined for one organization's file.
///
/// Order is write order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SilenceBatch(Vec<SilenceRecord>);

impl SilenceBatch {
    pub fn new() -> Self {
        SilenceBatch(Vec::new())
    }

    pub fn push(&mut self, record: SilenceRecord) {
        self.0.push(record);
    }

    pub fn into_inner(self) -> Vec<SilenceRecord> {
        self.0
    }
}

impl Deref for SilenceBatch {
    type Target = [SilenceRecord];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<SilenceRecord>> for SilenceBatch {
    fn from(records: Vec<SilenceRecord>) -> Self {
        SilenceBatch(records)
    }
}

impl FromIterator<SilenceRecord> for SilenceBatch {
    fn from_iter<I: IntoIterator<Item = SilenceRecord>>(iter: I) -> Self {
        SilenceBatch(iter.into_iter().collect())
    }
}

impl IntoIterator for SilenceBatch {
    type Item = SilenceRecord;
    type IntoIter = std::vec::IntoIter<SilenceRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a SilenceBatch {
    type Item = &'a SilenceRecord;
    type IntoIter = std::slice::Iter<'a, SilenceRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn record() -> SilenceRecord {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        SilenceRecord {
            id: SilenceId::new("abc"),
            matchers: vec![
                Matcher::equal("alertname", "DatasourceError"),
                Matcher::equal("marker", "true"),
            ],
            starts_at: start,
            ends_at: start + Duration::days(1),
            created_by: "tester".to_string(),
            comment: "test".to_string(),
            expires_at: start + Duration::days(1),
        }
    }

    #[test]
    fn valid_record_passes_validation() {
        assert_eq!(record().validate(), Ok(()));
    }

    #[test]
    fn empty_id_rejected() {
        let mut r = record();
        r.id = SilenceId::new("");
        assert_eq!(r.validate(), Err(InvalidSilence::EmptyId));
    }

    #[test]
    fn no_matchers_rejected() {
        let mut r = record();
        r.matchers.clear();
        assert!(matches!(r.validate(), Err(InvalidSilence::NoMatchers(_))));
    }

    #[test]
    fn empty_matcher_name_rejected() {
        let mut r = record();
        r.matchers.push(Matcher::equal("", "x"));
        assert!(matches!(
            r.validate(),
            Err(InvalidSilence::EmptyMatcherName(_))
        ));
    }

    #[test]
    fn zero_length_window_rejected() {
        let mut r = record();
        r.ends_at = r.starts_at;
        assert!(matches!(
            r.validate(),
            Err(InvalidSilence::EmptyWindow { .. })
        ));
    }

    #[test]
    fn expiry_before_end_rejected() {
        let mut r = record();
        r.expires_at = r.ends_at - Duration::seconds(1);
        assert!(matches!(
            r.validate(),
            Err(InvalidSilence::ExpiresBeforeEnd { .. })
        ));
    }

    #[test]
    fn matchers_are_anded() {
        let r = record();
        assert!(r.matches(&labels(&[
            ("alertname", "DatasourceError"),
            ("marker", "true"),
            ("team", "ops"),
        ])));
        assert!(!r.matches(&labels(&[("alertname", "DatasourceError")])));
        assert!(!r.matches(&labels(&[("marker", "true")])));
    }

    #[test]
    fn missing_label_matches_empty_pattern() {
        let m = Matcher::equal("absent", "");
        assert!(m.matches(&BTreeMap::new()));
    }

    #[test]
    fn window_is_half_open() {
        let r = record();
        assert!(r.is_active_at(r.starts_at));
        assert!(r.is_active_at(r.ends_at - Duration::seconds(1)));
        assert!(!r.is_active_at(r.ends_at));
        assert!(!r.is_active_at(r.starts_at - Duration::seconds(1)));
    }

    #[test]
    fn batch_preserves_order() {
        let mut first = record();
        first.id = SilenceId::new("first");
        let mut second = record();
        second.id = SilenceId::new("second");

        let batch: SilenceBatch = vec![first, second].into();
        let ids: Vec<&str> = batch.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second"]);
        assert_eq!(batch.len(), 2);

        let records = batch.into_inner();
        assert_eq!(records[0].id.as_str(), "first");
        assert_eq!(records[1].id.as_str(), "second");
    }
}
