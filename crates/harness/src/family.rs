//! The single-permission benchmark family.

use policy::{Permission, PermissionSet};

use crate::{Case, CaseError, CaseRegistry, Result, Sandbox};

async fn unreachable_body(_sandbox: Sandbox) -> std::result::Result<(), CaseError> {
    Ok(())
}

/// One case per permission, named after it and granted only it.
///
/// Every body is expected to be unreachable: a runner whose ceiling does
/// not cover a case's grant must refuse to enter it.
pub fn permission_family() -> Result<CaseRegistry> {
    let mut registry = CaseRegistry::new();
    for permission in Permission::ALL {
        registry.register_case(
            Case::new(
                permission.as_str(),
                PermissionSet::only(permission),
                unreachable_body,
            )
            .expect_unreachable(),
        )?;
    }
    Ok(registry)
}
