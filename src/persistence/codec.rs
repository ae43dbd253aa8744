//! Length-delimited protobuf encoding of silence batches.
//!
//! # Wire Format
//!
//! A silence file is a sequence of frames written back to back:
//!
//! ```text
//! [varint length][MeshSilence bytes][varint length][MeshSilence bytes]...
//! ```
//!
//! There is no header, separator, index or trailer. Each frame is an
//! alertmanager `MeshSilence` envelope (the silence plus the envelope's
//! expiry), so the alertmanager silence store can load the file directly.

use chrono::{DateTime, Utc};
use prost::Message;
use thiserror::Error;

use crate::types::{InvalidSilence, MatchType, Matcher, SilenceBatch, SilenceId, SilenceRecord};

/// Errors that can occur while encoding or decoding silences.
#[derive(Debug, Error)]
pub enum CodecError {
    /// A record failed validation and was not encoded.
    #[error("invalid silence: {0}")]
    Invalid(#[from] InvalidSilence),

    #[error("protobuf encode error: {0}")]
    Encode(#[from] prost::EncodeError),

    #[error("protobuf decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    /// A required envelope field was absent in a decoded frame.
    #[error("frame {frame} is missing field `{field}`")]
    MissingField { frame: usize, field: &'static str },

    /// A decoded matcher used a kind other than exact equality.
    #[error("frame {frame} has unsupported matcher type {value}")]
    UnsupportedMatchType { frame: usize, value: i32 },

    #[error("frame {frame} has out-of-range timestamp {seconds}s {nanos}ns")]
    TimestampOutOfRange {
        frame: usize,
        seconds: i64,
        nanos: i32,
    },
}

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;

/// `google.protobuf.Timestamp`.
#[derive(Clone, PartialEq, Message)]
struct TimestampProto {
    #[prost(int64, tag = "1")]
    seconds: i64,
    #[prost(int32, tag = "2")]
    nanos: i32,
}

/// `silencepb.Matcher.Type`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
enum MatcherTypeProto {
    Equal = 0,
    Regexp = 1,
    NotEqual = 2,
    NotRegexp = 3,
}

/// `silencepb.Matcher`.
#[derive(Clone, PartialEq, Message)]
struct MatcherProto {
    #[prost(enumeration = "MatcherTypeProto", tag = "1")]
    r#type: i32,
    #[prost(string, tag = "2")]
    name: String,
    #[prost(string, tag = "3")]
    pattern: String,
}

/// `silencepb.Silence`. Tag 7 (deprecated comments) is never written.
#[derive(Clone, PartialEq, Message)]
struct SilenceProto {
    #[prost(string, tag = "1")]
    id: String,
    #[prost(message, repeated, tag = "2")]
    matchers: Vec<MatcherProto>,
    #[prost(message, optional, tag = "3")]
    starts_at: Option<TimestampProto>,
    #[prost(message, optional, tag = "4")]
    ends_at: Option<TimestampProto>,
    #[prost(message, optional, tag = "5")]
    updated_at: Option<TimestampProto>,
    #[prost(string, tag = "8")]
    created_by: String,
    #[prost(string, tag = "9")]
    comment: String,
}

/// `silencepb.MeshSilence`.
#[derive(Clone, PartialEq, Message)]
struct MeshSilenceProto {
    #[prost(message, optional, tag = "1")]
    silence: Option<SilenceProto>,
    #[prost(message, optional, tag = "2")]
    expires_at: Option<TimestampProto>,
}

fn timestamp_to_proto(at: DateTime<Utc>) -> TimestampProto {
    TimestampProto {
        seconds: at.timestamp(),
        nanos: at.timestamp_subsec_nanos() as i32,
    }
}

fn timestamp_from_proto(
    frame: usize,
    field: &'static str,
    ts: Option<TimestampProto>,
) -> Result<DateTime<Utc>> {
    let ts = ts.ok_or(CodecError::MissingField { frame, field })?;
    u32::try_from(ts.nanos)
        .ok()
        .and_then(|nanos| DateTime::from_timestamp(ts.seconds, nanos))
        .ok_or(CodecError::TimestampOutOfRange {
            frame,
            seconds: ts.seconds,
            nanos: ts.nanos,
        })
}

fn record_to_proto(record: &SilenceRecord) -> MeshSilenceProto {
    let matchers = record
        .matchers
        .iter()
        .map(|m| MatcherProto {
            r#type: match m.match_type {
                MatchType::Equal => MatcherTypeProto::Equal as i32,
            },
            name: m.name.clone(),
            pattern: m.pattern.clone(),
        })
        .collect();

    MeshSilenceProto {
        silence: Some(SilenceProto {
            id: record.id.as_str().to_string(),
            matchers,
            starts_at: Some(timestamp_to_proto(record.starts_at)),
            ends_at: Some(timestamp_to_proto(record.ends_at)),
            updated_at: None,
            created_by: record.created_by.clone(),
            comment: record.comment.clone(),
        }),
        expires_at: Some(timestamp_to_proto(record.expires_at)),
    }
}

fn record_from_proto(frame: usize, mesh: MeshSilenceProto) -> Result<SilenceRecord> {
    let silence = mesh.silence.ok_or(CodecError::MissingField {
        frame,
        field: "silence",
    })?;

    let matchers = silence
        .matchers
        .into_iter()
        .map(|m| match MatcherTypeProto::try_from(m.r#type) {
            Ok(MatcherTypeProto::Equal) => Ok(Matcher {
                name: m.name,
                pattern: m.pattern,
                match_type: MatchType::Equal,
            }),
            _ => Err(CodecError::UnsupportedMatchType {
                frame,
                value: m.r#type,
            }),
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(SilenceRecord {
        id: SilenceId::new(silence.id),
        matchers,
        starts_at: timestamp_from_proto(frame, "starts_at", silence.starts_at)?,
        ends_at: timestamp_from_proto(frame, "ends_at", silence.ends_at)?,
        created_by: silence.created_by,
        comment: silence.comment,
        expires_at: timestamp_from_proto(frame, "expires_at", mesh.expires_at)?,
    })
}

/// Encodes a batch into a length-delimited byte stream, in batch order.
///
/// Every record is validated first; nothing is returned for a batch that
/// contains an invalid record.
pub fn encode_silences(batch: &SilenceBatch) -> Result<Vec<u8>> {
    for record in batch {
        record.validate()?;
    }

    let mut buf = Vec::new();
    for record in batch {
        record_to_proto(record).encode_length_delimited(&mut buf)?;
    }
    Ok(buf)
}

/// Decodes a length-delimited byte stream back into a batch.
///
/// An empty stream decodes to an empty batch. A truncated final frame is a
/// decode error.
pub fn decode_silences(mut bytes: &[u8]) -> Result<SilenceBatch> {
    let mut batch = SilenceBatch::new();
    let mut frame = 0;
    while !bytes.is_empty() {
        let mesh = MeshSilenceProto::decode_length_delimited(&mut bytes)?;
        batch.push(record_from_proto(frame, mesh)?);
        frame += 1;
    }
    Ok(batch)
}
