//! Synthetic silences that preserve legacy "Keep Last State" behavior.
//!
//! Legacy alert rules could be told to keep their last state when a query
//! errored or returned no data. Unified alerting instead fires a
//! `DatasourceError` or `DatasourceNoData` alert. Migrated rules that used
//! keep-state get a marker label, and one silence per condition matches
//! `alertname = <reserved name>` AND `<marker> = "true"`. The reserved alerts
//! of exactly those rules are silenced, with no per-rule silences.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, Utc};

use crate::sources::{RandomSource, ThreadRandom, short_uid};
use crate::types::{Matcher, SilenceId, SilenceRecord};

/// Label holding an alert's name.
pub const ALERT_NAME_LABEL: &str = "alertname";

/// Alert name fired when a rule's query fails.
pub const ERROR_ALERT_NAME: &str = "DatasourceError";

/// Alert name fired when a rule's query returns no data.
pub const NO_DATA_ALERT_NAME: &str = "DatasourceNoData";

/// Prefix shared by all marker labels attached during migration.
pub const MIGRATED_SILENCE_LABEL_PREFIX: &str = "__legacy_silence_";

/// Marker label for rules whose error state was "Keep Last State".
pub const ERROR_KEEP_STATE_LABEL: &str = "__legacy_silence_error_keep_state__";

/// Marker label for rules whose no-data state was "Keep Last State".
pub const NO_DATA_KEEP_STATE_LABEL: &str = "__legacy_silence_nodata_keep_state__";

/// Value of every marker label.
pub const MARKER_LABEL_VALUE: &str = "true";

/// `created_by` of every migration silence.
pub const MIGRATION_CREATED_BY: &str = "Grafana Migration";

const ERROR_STATE_COMMENT: &str = "Created during migration to unified alerting to silence Error state when the option 'Keep Last State' was selected for Error state";

const NO_DATA_STATE_COMMENT: &str = "Created during migration to unified alerting to silence NoData state when the option 'Keep Last State' was selected for NoData state";

/// Returns the `(key, value)` label to attach to rules whose error state was
/// "Keep Last State".
pub fn error_keep_state_label() -> (&'static str, &'static str) {
    (ERROR_KEEP_STATE_LABEL, MARKER_LABEL_VALUE)
}

/// Returns the `(key, value)` label to attach to rules whose no-data state was
/// "Keep Last State".
pub fn no_data_keep_state_label() -> (&'static str, &'static str) {
    (NO_DATA_KEEP_STATE_LABEL, MARKER_LABEL_VALUE)
}

/// Adds one calendar year.
///
/// February 29 rolls over to March 1 when the following year has no leap day.
pub fn one_year_after(at: DateTime<Utc>) -> DateTime<Utc> {
    at.with_year(at.year() + 1).unwrap_or_else(|| {
        at.checked_add_signed(Duration::days(366))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    })
}

/// Builds the migration's keep-state silences.
///
/// Each record gets a fresh id from the random source. Ids are not checked
/// for uniqueness; with 14 random characters a collision is negligible.
#[derive(Clone)]
pub struct SilenceFactory {
    random: Arc<dyn RandomSource>,
}

impl Default for SilenceFactory {
    fn default() -> Self {
        SilenceFactory::new(Arc::new(ThreadRandom))
    }
}

impl SilenceFactory {
    pub fn new(random: Arc<dyn RandomSource>) -> Self {
        SilenceFactory { random }
    }

    /// Silence for `DatasourceError` alerts of rules marked with
    /// [`ERROR_KEEP_STATE_LABEL`], active for one year from `now`.
    pub fn build_error_state_silence(&self, now: DateTime<Utc>) -> SilenceRecord {
        self.build(
            now,
            ERROR_ALERT_NAME,
            ERROR_KEEP_STATE_LABEL,
            ERROR_STATE_COMMENT,
        )
    }

    /// Silence for `DatasourceNoData` alerts of rules marked with
    /// [`NO_DATA_KEEP_STATE_LABEL`], active for one year from `now`.
    pub fn build_no_data_state_silence(&self, now: DateTime<Utc>) -> SilenceRecord {
        self.build(
            now,
            NO_DATA_ALERT_NAME,
            NO_DATA_KEEP_STATE_LABEL,
            NO_DATA_STATE_COMMENT,
        )
    }

    fn build(
        &self,
        now: DateTime<Utc>,
        alert_name: &str,
        marker_label: &str,
        comment: &str,
    ) -> SilenceRecord {
        let ends_at = one_year_after(now);
        SilenceRecord {
            id: SilenceId::new(short_uid(self.random.as_ref())),
            matchers: vec![
                Matcher::equal(ALERT_NAME_LABEL, alert_name),
                Matcher::equal(marker_label, MARKER_LABEL_VALUE),
            ],
            starts_at: now,
            ends_at,
            created_by: MIGRATION_CREATED_BY.to_string(),
            comment: comment.to_string(),
            expires_at: ends_at,
        }
    }
}

impl std::fmt::Debug for SilenceFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SilenceFactory").finish_non_exhaustive()
    }
}
