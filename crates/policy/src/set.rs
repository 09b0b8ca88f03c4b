//! Immutable permission grants and enforcement.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Permission, PermissionRequest, Result};

/// The grant for one execution: an explicit granted/denied entry for every
/// [`Permission`].
///
/// Values never change after construction. Methods that "modify" a set
/// return a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<Permission, bool>",
    into = "BTreeMap<Permission, bool>"
)]
pub struct PermissionSet {
    granted: [bool; Permission::COUNT],
}

/// Result of a permission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny { reason: String },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

impl PermissionSet {
    /// Every permission denied.
    pub const fn none() -> Self {
        Self {
            granted: [false; Permission::COUNT],
        }
    }

    /// Every permission granted.
    pub const fn all() -> Self {
        Self {
            granted: [true; Permission::COUNT],
        }
    }

    /// Only `permission` granted.
    pub fn only(permission: Permission) -> Self {
        Self::none().grant(permission)
    }

    /// Build from an all-denied base plus overrides, applied in order.
    ///
    /// A later override of the same permission wins.
    pub fn from_overrides(overrides: impl IntoIterator<Item = (Permission, bool)>) -> Self {
        overrides
            .into_iter()
            .fold(Self::none(), |set, (p, value)| set.with(p, value))
    }

    /// Grant every named permission, rejecting names outside the closed set.
    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::none();
        for name in names {
            set = set.grant(name.as_ref().parse()?);
        }
        Ok(set)
    }

    /// Load a grant table from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse a grant table such as `read = true` / `net = false`.
    ///
    /// Permissions not mentioned are denied.
    pub fn parse(toml: &str) -> Result<Self> {
        toml::from_str(toml).map_err(|e| Error::Parse(e.to_string()))
    }

    pub fn is_granted(&self, permission: Permission) -> bool {
        self.granted[permission.index()]
    }

    /// A copy with `permission` set to `value`.
    pub fn with(mut self, permission: Permission, value: bool) -> Self {
        self.granted[permission.index()] = value;
        self
    }

    pub fn grant(self, permission: Permission) -> Self {
        self.with(permission, true)
    }

    pub fn revoke(self, permission: Permission) -> Self {
        self.with(permission, false)
    }

    /// A copy granting everything granted by either set.
    pub fn union(self, other: &PermissionSet) -> Self {
        other.granted().fold(self, |set, p| set.grant(p))
    }

    /// Granted permissions, in [`Permission::ALL`] order.
    pub fn granted(&self) -> impl Iterator<Item = Permission> + '_ {
        Permission::ALL.into_iter().filter(|p| self.is_granted(*p))
    }

    pub fn is_empty(&self) -> bool {
        self.granted().next().is_none()
    }

    /// Permissions granted here but not by `ceiling`.
    pub fn exceeding(&self, ceiling: &PermissionSet) -> Vec<Permission> {
        self.granted().filter(|p| !ceiling.is_granted(*p)).collect()
    }

    /// Check a request against this grant.
    pub fn check(&self, request: &PermissionRequest) -> Decision {
        if self.is_granted(request.permission) {
            Decision::Allow
        } else {
            Decision::Deny {
                reason: format!(
                    "{} requires {} permission, which is not granted",
                    request.api_name, request.permission
                ),
            }
        }
    }
}

impl From<BTreeMap<Permission, bool>> for PermissionSet {
    fn from(map: BTreeMap<Permission, bool>) -> Self {
        Self::from_overrides(map)
    }
}

impl From<PermissionSet> for BTreeMap<Permission, bool> {
    fn from(set: PermissionSet) -> Self {
        Permission::ALL
            .into_iter()
            .map(|p| (p, set.is_granted(p)))
            .collect()
    }
}

impl fmt::Display for PermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("{}");
        }
        let names: Vec<_> = self.granted().map(Permission::as_str).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}
