//! Per-case execution context.

use std::any::Any;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use policy::{Decision, Permission, PermissionRequest, PermissionSet};
use tracing::debug;

use crate::case::{CaseBody, Expectation};
use crate::outcome::{EXPECTED_UNREACHABLE, Outcome, TIMEOUT};
use crate::{CaseError, Violation};

/// An isolated execution context enforcing one grant.
///
/// Each case gets its own sandbox; there is no process-wide grant. Clones
/// share state, so the copy handed to a body and the copy the runner keeps
/// observe the same recorded violation.
#[derive(Debug, Clone)]
pub struct Sandbox {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    case: String,
    grant: PermissionSet,
    started: Instant,
    violation: Mutex<Option<Violation>>,
}

impl Sandbox {
    /// Create a fresh sandbox for one case.
    pub fn new(case: impl Into<String>, grant: PermissionSet) -> Self {
        Self {
            inner: Arc::new(Inner {
                case: case.into(),
                grant,
                started: Instant::now(),
                violation: Mutex::new(None),
            }),
        }
    }

    pub fn is_granted(&self, permission: Permission) -> bool {
        self.inner.grant.is_granted(permission)
    }

    /// Time since the sandbox was created.
    pub fn elapsed(&self) -> Duration {
        self.inner.started.elapsed()
    }

    /// Check a request without recording anything.
    pub fn check(&self, request: &PermissionRequest) -> Decision {
        self.inner.grant.check(request)
    }

    /// Gate a capability-checked operation.
    ///
    /// A denial is returned to the caller and recorded; the first recorded
    /// violation decides the case outcome even if the body ignores the error.
    pub fn require(&self, request: PermissionRequest) -> Result<(), Violation> {
        match self.check(&request) {
            Decision::Allow => Ok(()),
            Decision::Deny { reason } => {
                let violation = Violation {
                    permission: request.permission,
                    api_name: request.api_name,
                    reason,
                };
                debug!(
                    case = %self.inner.case,
                    permission = %violation.permission,
                    api = %violation.api_name,
                    "Permission denied"
                );
                let mut recorded = self
                    .inner
                    .violation
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                if recorded.is_none() {
                    *recorded = Some(violation.clone());
                }
                Err(violation)
            }
        }
    }

    /// The first violation recorded in this sandbox, if any.
    pub fn violation(&self) -> Option<Violation> {
        self.inner
            .violation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Run `body` in this sandbox and classify how it ended.
    ///
    /// The body runs as its own task; when `timeout` elapses the task is
    /// aborted and the case fails with [`TIMEOUT`]. A body that overruns
    /// the budget without yielding also fails with [`TIMEOUT`] once it ends.
    pub async fn run(
        &self,
        body: &CaseBody,
        expectation: Expectation,
        timeout: Option<Duration>,
    ) -> Outcome {
        let started = Instant::now();
        let mut task = tokio::spawn(body(self.clone()));

        let joined = match timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut task).await {
                Ok(joined) => joined,
                Err(_) => {
                    task.abort();
                    return Outcome::failed(TIMEOUT);
                }
            },
            None => task.await,
        };

        if timeout.is_some_and(|limit| started.elapsed() > limit) {
            return Outcome::failed(TIMEOUT);
        }

        let result = match joined {
            Ok(result) => result,
            Err(e) if e.is_panic() => {
                return Outcome::failed(format!("panicked: {}", panic_message(e.into_panic())));
            }
            Err(e) => return Outcome::failed(format!("aborted: {e}")),
        };

        if let Some(violation) = self.violation() {
            return Outcome::Violated {
                permission: violation.permission,
                api_name: violation.api_name,
            };
        }

        match result {
            Ok(()) => match expectation {
                Expectation::Complete => Outcome::Passed,
                Expectation::Unreachable => Outcome::failed(EXPECTED_UNREACHABLE),
            },
            // Built by the body itself rather than by `require`.
            Err(CaseError::Violation(violation)) => Outcome::Violated {
                permission: violation.permission,
                api_name: violation.api_name,
            },
            Err(e) => Outcome::failed(e.to_string()),
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Case;

    #[test]
    fn test_require_records_first_violation() {
        let sandbox = Sandbox::new("read", PermissionSet::only(Permission::Read));
        assert!(sandbox.require(PermissionRequest::read("fs.read")).is_ok());
        assert!(sandbox.violation().is_none());

        let err = sandbox
            .require(PermissionRequest::write("fs.write"))
            .unwrap_err();
        assert_eq!(err.permission, Permission::Write);
        let _ = sandbox.require(PermissionRequest::net("net.lookup"));

        let recorded = sandbox.violation().unwrap();
        assert_eq!(recorded.permission, Permission::Write);
        assert_eq!(recorded.api_name, "fs.write");
    }

    #[test]
    fn test_sandboxes_do_not_share_state() {
        let a = Sandbox::new("a", PermissionSet::none());
        let b = Sandbox::new("b", PermissionSet::none());
        let _ = a.require(PermissionRequest::env("env.var"));
        assert!(a.violation().is_some());
        assert!(b.violation().is_none());
    }

    #[test]
    fn test_never_grants_outside_set() {
        for n in Permission::ALL {
            let sandbox = Sandbox::new(n.as_str(), PermissionSet::only(n));
            for m in Permission::ALL {
                let allowed = sandbox
                    .check(&PermissionRequest::new(m, "probe"))
                    .is_allowed();
                assert_eq!(allowed, m == n);
                assert_eq!(sandbox.is_granted(m), m == n);
            }
        }
    }

    #[tokio::test]
    async fn test_swallowed_violation_still_reported() {
        let case = Case::new("sneaky", PermissionSet::none(), |sandbox: Sandbox| async move {
            let _ = sandbox.require(PermissionRequest::run("process.spawn"));
            Ok(())
        });
        let sandbox = Sandbox::new(case.name(), *case.grant());
        let outcome = sandbox.run(case.body(), case.expectation(), None).await;
        assert_eq!(
            outcome,
            Outcome::Violated {
                permission: Permission::Run,
                api_name: "process.spawn".into(),
            }
        );
    }

    #[tokio::test]
    async fn test_ordinary_failure_is_not_a_violation() {
        let case = Case::new("fails", PermissionSet::none(), |_sandbox: Sandbox| async {
            Err(CaseError::failed("bad input"))
        });
        let sandbox = Sandbox::new(case.name(), *case.grant());
        let outcome = sandbox.run(case.body(), case.expectation(), None).await;
        assert_eq!(outcome, Outcome::failed("bad input"));
    }

    #[tokio::test]
    async fn test_panic_becomes_failure() {
        async fn boom(_sandbox: Sandbox) -> Result<(), CaseError> {
            panic!("boom")
        }
        let case = Case::new("panics", PermissionSet::none(), boom);
        let sandbox = Sandbox::new(case.name(), *case.grant());
        let outcome = sandbox.run(case.body(), case.expectation(), None).await;
        assert_eq!(outcome, Outcome::failed("panicked: boom"));
    }

    #[tokio::test]
    async fn test_unreachable_completion_fails() {
        let case = Case::new("net", PermissionSet::only(Permission::Net), |_: Sandbox| async {
            Ok(())
        })
        .expect_unreachable();
        let sandbox = Sandbox::new(case.name(), *case.grant());
        let outcome = sandbox.run(case.body(), case.expectation(), None).await;
        assert_eq!(outcome, Outcome::failed(EXPECTED_UNREACHABLE));
    }

    #[tokio::test]
    async fn test_timeout_aborts_body() {
        let case = Case::new("slow", PermissionSet::none(), |_sandbox: Sandbox| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        });
        let sandbox = Sandbox::new(case.name(), *case.grant());
        let outcome = sandbox
            .run(
                case.body(),
                case.expectation(),
                Some(Duration::from_millis(20)),
            )
            .await;
        assert_eq!(outcome, Outcome::failed(TIMEOUT));
    }

    #[tokio::test]
    async fn test_body_that_never_yields_still_times_out() {
        let case = Case::new("busy", PermissionSet::none(), |_sandbox: Sandbox| async {
            std::thread::sleep(Duration::from_millis(200));
            Ok(())
        });
        let sandbox = Sandbox::new(case.name(), *case.grant());
        let outcome = sandbox
            .run(
                case.body(),
                case.expectation(),
                Some(Duration::from_millis(20)),
            )
            .await;
        assert_eq!(outcome, Outcome::failed(TIMEOUT));
    }

    #[tokio::test]
    async fn test_blocking_panic_becomes_failure() {
        let case = Case::blocking("panics", PermissionSet::none(), |_sandbox| {
            panic!("blocking boom")
        });
        let sandbox = Sandbox::new(case.name(), *case.grant());
        let outcome = sandbox.run(case.body(), case.expectation(), None).await;
        assert_eq!(outcome, Outcome::failed("panicked: blocking boom"));
    }
}
