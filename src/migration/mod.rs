//! Per-organization silence migration step.
//!
//! The rule migration records which legacy keep-state modes an organization
//! used while it converts rules, then calls [`migrate_org_silences`] once to
//! build the matching silences and persist them.

pub mod factory;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::persistence::{SilenceFileWriter, silence_file};
use crate::sources::Clock;
use crate::types::{OrgId, SilenceBatch};

pub use factory::{
    ALERT_NAME_LABEL, ERROR_ALERT_NAME, ERROR_KEEP_STATE_LABEL, MIGRATED_SILENCE_LABEL_PREFIX,
    NO_DATA_ALERT_NAME, NO_DATA_KEEP_STATE_LABEL, SilenceFactory, error_keep_state_label,
    no_data_keep_state_label, one_year_after,
};

/// Which legacy "Keep Last State" modes were seen among an organization's rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeepStateUsage {
    /// Some rule kept its last state on query errors.
    pub error: bool,
    /// Some rule kept its last state when its query returned no data.
    pub no_data: bool,
}

impl KeepStateUsage {
    /// Returns true if no rule needs a keep-state silence.
    pub fn is_empty(&self) -> bool {
        !self.error && !self.no_data
    }

    /// Merges the usage of another rule or rule group into this one.
    pub fn merge(&mut self, other: KeepStateUsage) {
        self.error |= other.error;
        self.no_data |= other.no_data;
    }
}

/// Builds the silences required by `usage`: the error silence first, then the
/// no-data silence.
pub fn build_keep_state_silences(
    factory: &SilenceFactory,
    usage: KeepStateUsage,
    now: DateTime<Utc>,
) -> SilenceBatch {
    let mut batch = SilenceBatch::new();
    if usage.error {
        batch.push(factory.build_error_state_silence(now));
    }
    if usage.no_data {
        batch.push(factory.build_no_data_state_silence(now));
    }
    batch
}

/// Builds and writes the keep-state silences for one organization.
///
/// Returns the written path, or None when the organization used neither
/// keep-state mode (no file is written in that case).
pub fn migrate_org_silences(
    writer: &SilenceFileWriter,
    factory: &SilenceFactory,
    clock: &dyn Clock,
    org_id: OrgId,
    usage: KeepStateUsage,
) -> silence_file::Result<Option<PathBuf>> {
    if usage.is_empty() {
        debug!(org_id = %org_id, "No keep-state rules, skipping silences file");
        return Ok(None);
    }

    let batch = build_keep_state_silences(factory, usage, clock.now());
    let path = writer.write(org_id, &batch)?;

    info!(
        org_id = %org_id,
        silences = batch.len(),
        path = %path.display(),
        "Migrated keep-state silences"
    );
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::read_silences_file;
    use crate::sources::{FixedClock, SeededRandom, ThreadRandom};
    use chrono::TimeZone;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn setup(data_path: &std::path::Path) -> (SilenceFileWriter, SilenceFactory) {
        (
            SilenceFileWriter::new(data_path, Arc::new(ThreadRandom)),
            SilenceFactory::new(Arc::new(SeededRandom::new(3))),
        )
    }

    #[test]
    fn both_modes_write_two_silences_in_order() {
        let dir = tempdir().unwrap();
        let (writer, factory) = setup(dir.path());
        let usage = KeepStateUsage {
            error: true,
            no_data: true,
        };

        let path = migrate_org_silences(&writer, &factory, &FixedClock(now()), OrgId(7), usage)
            .unwrap()
            .unwrap();

        let batch = read_silences_file(&path).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].matchers[0].pattern, ERROR_ALERT_NAME);
        assert_eq!(batch[1].matchers[0].pattern, NO_DATA_ALERT_NAME);
        assert_eq!(
            batch[1].ends_at,
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
        );
        assert_ne!(batch[0].id, batch[1].id);
    }

    #[test]
    fn single_mode_writes_one_silence() {
        let dir = tempdir().unwrap();
        let (writer, factory) = setup(dir.path());
        let usage = KeepStateUsage {
            error: false,
            no_data: true,
        };

        let path = migrate_org_silences(&writer, &factory, &FixedClock(now()), OrgId(2), usage)
            .unwrap()
            .unwrap();

        let batch = read_silences_file(&path).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].matchers[1].name, NO_DATA_KEEP_STATE_LABEL);
    }

    #[test]
    fn no_usage_writes_nothing() {
        let dir = tempdir().unwrap();
        let (writer, factory) = setup(dir.path());

        let result = migrate_org_silences(
            &writer,
            &factory,
            &FixedClock(now()),
            OrgId(1),
            KeepStateUsage::default(),
        )
        .unwrap();

        assert!(result.is_none());
        assert!(!writer.path_for_org(OrgId(1)).exists());
    }

    #[test]
    fn rerun_replaces_previous_file() {
        let dir = tempdir().unwrap();
        let (writer, factory) = setup(dir.path());
        let both = KeepStateUsage {
            error: true,
            no_data: true,
        };
        let only_error = KeepStateUsage {
            error: true,
            no_data: false,
        };

        migrate_org_silences(&writer, &factory, &FixedClock(now()), OrgId(4), both).unwrap();
        let path =
            migrate_org_silences(&writer, &factory, &FixedClock(now()), OrgId(4), only_error)
                .unwrap()
                .unwrap();

        let batch = read_silences_file(&path).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].matchers[0].pattern, ERROR_ALERT_NAME);
    }

    #[test]
    fn usage_merge() {
        let mut usage = KeepStateUsage::default();
        assert!(usage.is_empty());

        usage.merge(KeepStateUsage {
            error: true,
            no_data: false,
        });
        usage.merge(KeepStateUsage::default());
        assert_eq!(
            usage,
            KeepStateUsage {
                error: true,
                no_data: false
            }
        );

        usage.merge(KeepStateUsage {
            error: false,
            no_data: true,
        });
        assert!(usage.error && usage.no_data);
    }

    #[test]
    fn build_respects_usage_flags() {
        let factory = SilenceFactory::new(Arc::new(SeededRandom::new(8)));
        assert!(build_keep_state_silences(&factory, KeepStateUsage::default(), now()).is_empty());

        let batch = build_keep_state_silences(
            &factory,
            KeepStateUsage {
                error: true,
                no_data: false,
            },
            now(),
        );
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].matchers[1].name, ERROR_KEEP_STATE_LABEL);
    }
}
