use policy::Permission;
use thiserror::Error;

/// Registration errors.
///
/// These abort setup; nothing here is produced while cases run.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("duplicate case name: {0}")]
    DuplicateName(String),

    #[error("case name must not be empty")]
    InvalidName,

    #[error(transparent)]
    Policy(#[from] policy::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A capability-checked operation attempted outside the active grant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("permission violation: {reason}")]
pub struct Violation {
    pub permission: Permission,
    pub api_name: String,
    pub reason: String,
}

/// Errors a case body can return.
#[derive(Debug, Error)]
pub enum CaseError {
    /// A capability check failed. The sandbox has already recorded it.
    #[error(transparent)]
    Violation(#[from] Violation),

    /// An ordinary failure of the benchmarked code.
    #[error("{0}")]
    Failed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CaseError {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }
}
