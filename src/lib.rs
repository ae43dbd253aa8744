//! Silence migration - synthesizes the silences that keep legacy "Keep Last
//! State" alert rules quiet after migrating to unified alerting, and persists
//! them as crash-safe per-organization silence files.
//!
//! The migration driver calls [`migration::migrate_org_silences`] once per
//! organization. Lower-level pieces are usable on their own:
//! [`migration::SilenceFactory`] builds records,
//! [`persistence::SilenceFileWriter`] encodes and writes them, and
//! [`persistence::ReplaceFile`] replaces any file without exposing partial writes.

pub mod config;
pub mod migration;
pub mod persistence;
pub mod sources;
pub mod types;

#[cfg(test)]
mod test_utils;
