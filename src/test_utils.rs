//! Shared test utilities and arbitrary generators for property-based testing.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use crate::types::{Matcher, SilenceBatch, SilenceId, SilenceRecord};

/// Timestamps between 2000 and 2100, with sub-second precision.
pub fn arb_datetime() -> impl Strategy<Value = DateTime<Utc>> {
    (946684800i64..4102444800i64, 0u32..1_000_000_000)
        .prop_map(|(secs, nanos)| DateTime::from_timestamp(secs, nanos).unwrap())
}

pub fn arb_matcher() -> impl Strategy<Value = Matcher> {
    ("[a-zA-Z_][a-zA-Z0-9_]{0,30}", "[ -~]{0,40}")
        .prop_map(|(name, pattern)| Matcher::equal(name, pattern))
}

/// Valid silence records: non-empty window, expiry at or after the end.
pub fn arb_silence_record() -> impl Strategy<Value = SilenceRecord> {
    (
        "[a-z][a-z0-9]{0,13}",
        prop::collection::vec(arb_matcher(), 1..5),
        arb_datetime(),
        1i64..(5 * 365 * 24 * 3600),
        0i64..(30 * 24 * 3600),
        "[ -~]{0,30}",
        "\\PC{0,80}",
    )
        .prop_map(
            |(id, matchers, starts_at, window_secs, grace_secs, created_by, comment)| {
                let ends_at = starts_at + Duration::seconds(window_secs);
                SilenceRecord {
                    id: SilenceId::new(id),
                    matchers,
                    starts_at,
                    ends_at,
                    created_by,
                    comment,
                    expires_at: ends_at + Duration::seconds(grace_secs),
                }
            },
        )
}

pub fn arb_silence_batch() -> impl Strategy<Value = SilenceBatch> {
    prop::collection::vec(arb_silence_record(), 0..6).prop_map(SilenceBatch::from)
}

/// A fixed valid record with the given id.
pub fn sample_record(id: &str) -> SilenceRecord {
    let starts_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let ends_at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    SilenceRecord {
        id: SilenceId::new(id),
        matchers: vec![
            Matcher::equal("alertname", "DatasourceError"),
            Matcher::equal("__legacy_silence_error_keep_state__", "true"),
        ],
        starts_at,
        ends_at,
        created_by: "Grafana Migration".to_string(),
        comment: "sample".to_string(),
        expires_at: ends_at,
    }
}
