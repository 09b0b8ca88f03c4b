//! Case outcomes and run reports.

use policy::Permission;
use serde::{Deserialize, Serialize};

/// Failure reason for a completed body whose case expected it never to finish.
pub const EXPECTED_UNREACHABLE: &str = "expected-unreachable";

/// Failure reason for a body abandoned after its time budget.
pub const TIMEOUT: &str = "timeout";

/// How one case ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed { reason: String },
    Violated { permission: Permission, api_name: String },
}

impl Outcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        Outcome::Failed {
            reason: reason.into(),
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, Outcome::Passed)
    }

    /// Short name of the variant: `passed`, `failed` or `violated`.
    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::Passed => "passed",
            Outcome::Failed { .. } => "failed",
            Outcome::Violated { .. } => "violated",
        }
    }

    /// Variant payload rendered for display, if any.
    pub fn detail(&self) -> Option<String> {
        match self {
            Outcome::Passed => None,
            Outcome::Failed { reason } => Some(reason.clone()),
            Outcome::Violated {
                permission,
                api_name,
            } => Some(format!("{permission} ({api_name})")),
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.detail() {
            Some(detail) => write!(f, "{}: {detail}", self.kind()),
            None => f.write_str(self.kind()),
        }
    }
}

/// Outcome of a single case, with its wall-clock time when the body ran.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseReport {
    pub name: String,
    pub outcome: Outcome,
    pub elapsed_ms: Option<u64>,
}

/// Ordered case reports from one run, in registration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Report {
    pub cases: Vec<CaseReport>,
}

impl Report {
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CaseReport> {
        self.cases.iter()
    }

    /// Number of cases whose outcome is not `Passed`.
    pub fn not_passed(&self) -> usize {
        self.cases.iter().filter(|c| !c.outcome.is_passed()).count()
    }

    pub fn all_passed(&self) -> bool {
        self.not_passed() == 0
    }
}
