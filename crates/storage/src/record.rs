//! Stored run records.

use chrono::{DateTime, Utc};
use harness::{CaseReport, Outcome};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unique identifier for a stored run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One case outcome as stored for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseRecord {
    pub run_id: RunId,
    /// Position of the case within its run.
    pub seq: u32,
    pub recorded_at: DateTime<Utc>,
    pub report: CaseReport,
}

impl CaseRecord {
    pub fn new(run_id: RunId, seq: u32, report: CaseReport) -> Self {
        Self {
            run_id,
            seq,
            recorded_at: Utc::now(),
            report,
        }
    }

    pub fn outcome(&self) -> &Outcome {
        &self.report.outcome
    }
}
