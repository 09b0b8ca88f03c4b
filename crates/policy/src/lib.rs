//! Permission grants for sandboxed cases.
//!
//! Core principle: **A case may only do what its grant names.**

mod error;
mod permission;
mod set;

pub use error::{Error, Result};
pub use permission::{Permission, PermissionRequest};
pub use set::{Decision, PermissionSet};
