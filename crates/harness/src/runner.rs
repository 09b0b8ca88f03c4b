//! Sequential case execution.

use std::time::{Duration, Instant};

use policy::PermissionSet;
use tracing::{debug, info, warn};

use crate::case::{Case, CaseRegistry, Expectation};
use crate::outcome::{CaseReport, Outcome, Report};
use crate::Sandbox;

/// Default time budget for a single case body.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs every case of a registry, one at a time, each in a fresh sandbox.
#[derive(Debug, Clone)]
pub struct Runner {
    timeout: Option<Duration>,
    ceiling: PermissionSet,
}

impl Default for Runner {
    fn default() -> Self {
        Self {
            timeout: Some(DEFAULT_TIMEOUT),
            ceiling: PermissionSet::all(),
        }
    }
}

impl Runner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Abandon any body still running after `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Let bodies run for as long as they take.
    pub fn without_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// Set the most any case may be granted.
    ///
    /// A case whose grant exceeds the ceiling never enters its body.
    pub fn with_ceiling(mut self, ceiling: PermissionSet) -> Self {
        self.ceiling = ceiling;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn ceiling(&self) -> &PermissionSet {
        &self.ceiling
    }

    /// Run every case in registration order.
    ///
    /// Every case is run regardless of earlier outcomes, and none is retried.
    pub async fn run_all(&self, registry: &CaseRegistry) -> Report {
        info!(cases = registry.len(), ceiling = %self.ceiling, "Starting run");

        let mut report = Report::default();
        for case in registry.all() {
            report.cases.push(self.run_case(case).await);
        }

        info!(
            cases = report.len(),
            not_passed = report.not_passed(),
            "Run completed"
        );
        report
    }

    /// Run one case in a sandbox built for it alone.
    pub async fn run_case(&self, case: &Case) -> CaseReport {
        let exceeding = case.grant().exceeding(&self.ceiling);
        if !exceeding.is_empty() {
            let names: Vec<_> = exceeding.iter().map(|p| p.as_str()).collect();
            debug!(case = %case.name(), exceeding = ?names, "Grant exceeds ceiling, body skipped");
            let outcome = match case.expectation() {
                Expectation::Unreachable => Outcome::Passed,
                Expectation::Complete => {
                    Outcome::failed(format!("grant exceeds ceiling: {}", names.join(", ")))
                }
            };
            log_outcome(case.name(), &outcome);
            return CaseReport {
                name: case.name().to_string(),
                outcome,
                elapsed_ms: None,
            };
        }

        info!(case = %case.name(), grant = %case.grant(), "Running case");
        let sandbox = Sandbox::new(case.name(), *case.grant());
        let start = Instant::now();
        let outcome = sandbox
            .run(case.body(), case.expectation(), self.timeout)
            .await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        log_outcome(case.name(), &outcome);
        CaseReport {
            name: case.name().to_string(),
            outcome,
            elapsed_ms: Some(elapsed_ms),
        }
    }
}

fn log_outcome(case: &str, outcome: &Outcome) {
    if outcome.is_passed() {
        info!(case = %case, outcome = %outcome, "Case finished");
    } else {
        warn!(case = %case, outcome = %outcome, "Case finished");
    }
}
