//! Write pipeline results
//!
//! A canonical write either fails the call or succeeds; what happened to each
//! mirror afterwards is reported alongside the record and never unwinds it.

use serde::Serialize;

/// Result of one best-effort mirror call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum MirrorOutcome {
    /// Mirror write acknowledged
    Synced,
    /// Nothing to do (no parent reference, unmatched parent, self-reference)
    Skipped,
    /// Mirror write failed or timed out; logged and swallowed
    Failed(String),
}

impl MirrorOutcome {
    pub fn is_synced(&self) -> bool {
        matches!(self, MirrorOutcome::Synced)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, MirrorOutcome::Failed(_))
    }
}

/// Canonical record plus the per-mirror outcome of fanning it out
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Synced<T> {
    pub record: T,
    pub search: MirrorOutcome,
    pub graph: MirrorOutcome,
}

impl<T> Synced<T> {
    pub fn new(record: T, search: MirrorOutcome, graph: MirrorOutcome) -> Self {
        Self {
            record,
            search,
            graph,
        }
    }

    pub fn into_record(self) -> T {
        self.record
    }

    /// Every mirror either synced or had nothing to do
    pub fn fully_synced(&self) -> bool {
        !self.search.is_failed() && !self.graph.is_failed()
    }
}
