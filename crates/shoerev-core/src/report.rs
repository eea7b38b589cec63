//! Per-run, per-source-kind outcome records.

use std::time::Duration;

use serde::Serialize;

use crate::mention::SourceKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Ok,
    Partial,
    Skipped,
    Failed,
}

impl RunStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Ok => "ok",
            RunStatus::Partial => "partial",
            RunStatus::Skipped => "skipped",
            RunStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one requested source kind for one shoe.
///
/// Exactly one entry exists per requested kind, whatever happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReportEntry {
    pub shoe_id: i64,
    pub kind: SourceKind,
    pub status: RunStatus,
    /// Unique mention candidates produced for this kind in this run.
    pub item_count: usize,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Malformed items dropped by the adapters.
    pub dropped: usize,
    /// Human-readable cause for anything other than a clean `ok`.
    pub error: Option<String>,
    #[serde(serialize_with = "serialize_millis")]
    pub duration: Duration,
}

impl RunReportEntry {
    #[must_use]
    pub fn skipped(shoe_id: i64, kind: SourceKind, reason: impl Into<String>) -> Self {
        Self::empty(shoe_id, kind, RunStatus::Skipped, reason.into())
    }

    #[must_use]
    pub fn failed(shoe_id: i64, kind: SourceKind, reason: impl Into<String>) -> Self {
        Self::empty(shoe_id, kind, RunStatus::Failed, reason.into())
    }

    fn empty(shoe_id: i64, kind: SourceKind, status: RunStatus, reason: String) -> Self {
        Self {
            shoe_id,
            kind,
            status,
            item_count: 0,
            inserted: 0,
            updated: 0,
            unchanged: 0,
            dropped: 0,
            error: Some(reason),
            duration: Duration::ZERO,
        }
    }
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}
