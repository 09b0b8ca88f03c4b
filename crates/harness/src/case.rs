//! Cases and the registry that holds them.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use policy::PermissionSet;

use crate::{CaseError, Error, Result, Sandbox};

/// Future returned by a case body.
pub type BodyFuture = Pin<Box<dyn Future<Output = std::result::Result<(), CaseError>> + Send>>;

/// A case body. It receives the case's sandbox and must route every
/// capability-checked operation through it.
pub type CaseBody = Arc<dyn Fn(Sandbox) -> BodyFuture + Send + Sync>;

/// What a case's body is expected to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expectation {
    /// The body runs to completion.
    #[default]
    Complete,
    /// The body must never run to completion.
    Unreachable,
}

/// One named unit of work with its grant.
#[derive(Clone)]
pub struct Case {
    name: String,
    grant: PermissionSet,
    expectation: Expectation,
    body: CaseBody,
}

impl Case {
    /// Create a case with an async body, expected to complete.
    pub fn new<F, Fut>(name: impl Into<String>, grant: PermissionSet, body: F) -> Self
    where
        F: Fn(Sandbox) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<(), CaseError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            grant,
            expectation: Expectation::Complete,
            body: Arc::new(move |sandbox: Sandbox| -> BodyFuture { Box::pin(body(sandbox)) }),
        }
    }

    /// Create a case whose body is synchronous.
    ///
    /// The body runs on tokio's blocking pool so a time budget can still be
    /// enforced. A body abandoned on timeout keeps its thread until it
    /// returns, but only ever sees its own sandbox.
    pub fn blocking<F>(name: impl Into<String>, grant: PermissionSet, body: F) -> Self
    where
        F: Fn(&Sandbox) -> std::result::Result<(), CaseError> + Send + Sync + 'static,
    {
        let body = Arc::new(body);
        Self::new(name, grant, move |sandbox| {
            let body = Arc::clone(&body);
            async move {
                match tokio::task::spawn_blocking(move || body(&sandbox)).await {
                    Ok(result) => result,
                    Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                    Err(e) => Err(CaseError::failed(format!("blocking body cancelled: {e}"))),
                }
            }
        })
    }

    /// Mark the body as one that must never complete.
    pub fn expect_unreachable(mut self) -> Self {
        self.expectation = Expectation::Unreachable;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn grant(&self) -> &PermissionSet {
        &self.grant
    }

    pub fn expectation(&self) -> Expectation {
        self.expectation
    }

    pub(crate) fn body(&self) -> &CaseBody {
        &self.body
    }
}

impl fmt::Debug for Case {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Case")
            .field("name", &self.name)
            .field("grant", &self.grant)
            .field("expectation", &self.expectation)
            .finish_non_exhaustive()
    }
}

/// Uniquely named cases, kept in registration order.
#[derive(Debug, Clone, Default)]
pub struct CaseRegistry {
    cases: Vec<Case>,
}

impl CaseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a case expected to complete.
    pub fn register<F, Fut>(
        &mut self,
        name: impl Into<String>,
        grant: PermissionSet,
        body: F,
    ) -> Result<()>
    where
        F: Fn(Sandbox) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<(), CaseError>> + Send + 'static,
    {
        self.register_case(Case::new(name, grant, body))
    }

    /// Register a case granting the named permissions.
    ///
    /// Unknown names are rejected before the registry is touched.
    pub fn register_names<I, S, F, Fut>(
        &mut self,
        name: impl Into<String>,
        permissions: I,
        body: F,
    ) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: Fn(Sandbox) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<(), CaseError>> + Send + 'static,
    {
        let grant = PermissionSet::from_names(permissions)?;
        self.register(name, grant, body)
    }

    /// Register a fully built case.
    ///
    /// Fails without modifying the registry if the name is empty or taken.
    pub fn register_case(&mut self, case: Case) -> Result<()> {
        if case.name.is_empty() {
            return Err(Error::InvalidName);
        }
        if self.get(&case.name).is_some() {
            return Err(Error::DuplicateName(case.name));
        }
        self.cases.push(case);
        Ok(())
    }

    /// All cases in registration order.
    pub fn all(&self) -> &[Case] {
        &self.cases
    }

    pub fn get(&self, name: &str) -> Option<&Case> {
        self.cases.iter().find(|c| c.name == name)
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use policy::Permission;

    async fn noop(_sandbox: Sandbox) -> std::result::Result<(), CaseError> {
        Ok(())
    }

    #[test]
    fn test_register_keeps_order() {
        let mut registry = CaseRegistry::new();
        for p in Permission::ALL {
            registry
                .register(p.as_str(), PermissionSet::only(p), noop)
                .unwrap();
        }
        let names: Vec<_> = registry.all().iter().map(Case::name).collect();
        assert_eq!(
            names,
            vec!["read", "write", "net", "env", "run", "ffi", "hrtime"]
        );
    }

    #[test]
    fn test_duplicate_name_leaves_registry_unchanged() {
        let mut registry = CaseRegistry::new();
        registry
            .register("read", PermissionSet::only(Permission::Read), noop)
            .unwrap();

        let err = registry
            .register("read", PermissionSet::only(Permission::Write), noop)
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateName(name) if name == "read"));

        assert_eq!(registry.len(), 1);
        let kept = registry.get("read").unwrap();
        assert!(kept.grant().is_granted(Permission::Read));
        assert!(!kept.grant().is_granted(Permission::Write));
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut registry = CaseRegistry::new();
        let err = registry
            .register("", PermissionSet::none(), noop)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidName));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unknown_permission_rejected_at_registration() {
        let mut registry = CaseRegistry::new();
        let err = registry
            .register_names("sys", ["read", "sys"], noop)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Policy(policy::Error::UnknownPermission(_))
        ));
        assert!(registry.is_empty());

        registry
            .register_names("net", ["net"], noop)
            .unwrap();
        assert!(registry.get("net").unwrap().grant().is_granted(Permission::Net));
    }

    #[test]
    fn test_expectation_defaults_to_complete() {
        let case = Case::new("a", PermissionSet::none(), noop);
        assert_eq!(case.expectation(), Expectation::Complete);
        assert_eq!(
            case.expect_unreachable().expectation(),
            Expectation::Unreachable
        );
    }
}
