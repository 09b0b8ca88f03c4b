use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Capabilities that can be granted or denied to a case.
///
/// The set is closed: every check matches on it exhaustively, and names
/// outside it are rejected when parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Read,
    Write,
    Net,
    Env,
    Run,
    Ffi,
    Hrtime,
}

impl Permission {
    /// Number of permissions in the closed set.
    pub const COUNT: usize = 7;

    /// Every permission, in declaration order.
    pub const ALL: [Permission; Self::COUNT] = [
        Permission::Read,
        Permission::Write,
        Permission::Net,
        Permission::Env,
        Permission::Run,
        Permission::Ffi,
        Permission::Hrtime,
    ];

    /// Canonical lower-case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Permission::Read => "read",
            Permission::Write => "write",
            Permission::Net => "net",
            Permission::Env => "env",
            Permission::Run => "run",
            Permission::Ffi => "ffi",
            Permission::Hrtime => "hrtime",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| Error::UnknownPermission(s.to_string()))
    }
}

/// A single capability-checked operation asking for a permission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionRequest {
    pub permission: Permission,
    pub api_name: String, // e.g., "fs.read", "net.lookup"
}

impl PermissionRequest {
    pub fn new(permission: Permission, api_name: impl Into<String>) -> Self {
        Self {
            permission,
            api_name: api_name.into(),
        }
    }

    pub fn read(api_name: impl Into<String>) -> Self {
        Self::new(Permission::Read, api_name)
    }

    pub fn write(api_name: impl Into<String>) -> Self {
        Self::new(Permission::Write, api_name)
    }

    pub fn net(api_name: impl Into<String>) -> Self {
        Self::new(Permission::Net, api_name)
    }

    pub fn env(api_name: impl Into<String>) -> Self {
        Self::new(Permission::Env, api_name)
    }

    pub fn run(api_name: impl Into<String>) -> Self {
        Self::new(Permission::Run, api_name)
    }

    pub fn ffi(api_name: impl Into<String>) -> Self {
        Self::new(Permission::Ffi, api_name)
    }

    pub fn hrtime(api_name: impl Into<String>) -> Self {
        Self::new(Permission::Hrtime, api_name)
    }
}
