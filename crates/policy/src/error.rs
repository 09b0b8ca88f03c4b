//! Policy error types.

use thiserror::Error;

/// Policy errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A permission name outside the closed set.
    #[error("unknown permission: {0}")]
    UnknownPermission(String),

    /// Failed to parse a grant file.
    #[error("failed to parse grant: {0}")]
    Parse(String),

    /// An I/O error occurred while reading a grant file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
