//! Capability-scoped case runner.
//!
//! This crate runs named units of work under an explicit permission grant
//! and reports how each one ended.
//!
//! # Overview
//!
//! The harness is organized around these concepts:
//!
//! - **Case**: a name, a [`PermissionSet`](policy::PermissionSet) grant, an
//!   [`Expectation`] and an async body.
//! - **CaseRegistry**: uniquely named cases in registration order.
//! - **Sandbox**: the per-case context. Bodies receive it and pass it to
//!   every capability-checked operation (see [`ops`]); there is no global
//!   grant to fall back on.
//! - **Runner**: executes cases one at a time, each in a fresh sandbox, under
//!   a time budget and a permission ceiling, and collects a [`Report`].
//!
//! # Example
//!
//! ```no_run
//! use harness::{CaseRegistry, Outcome, Runner, Sandbox, ops};
//! use policy::{Permission, PermissionSet};
//!
//! # async fn example() -> harness::Result<()> {
//! let mut registry = CaseRegistry::new();
//! registry.register("read", PermissionSet::only(Permission::Read), |sandbox: Sandbox| async move {
//!     ops::read_to_string(&sandbox, "Cargo.toml").await?;
//!     ops::write(&sandbox, "out.txt", "denied").await?;
//!     Ok(())
//! })?;
//!
//! let report = Runner::new().run_all(&registry).await;
//! assert!(matches!(report.cases[0].outcome, Outcome::Violated { .. }));
//! # Ok(())
//! # }
//! ```

mod case;
mod error;
pub mod family;
pub mod ops;
mod outcome;
mod runner;
mod sandbox;

pub use case::{BodyFuture, Case, CaseBody, CaseRegistry, Expectation};
pub use error::{CaseError, Error, Result, Violation};
pub use outcome::{CaseReport, EXPECTED_UNREACHABLE, Outcome, Report, TIMEOUT};
pub use runner::{DEFAULT_TIMEOUT, Runner};
pub use sandbox::Sandbox;
