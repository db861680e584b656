//! Permission checks consulted after a route's role gate.

use std::collections::{HashMap, HashSet};

use super::auth::Identity;

pub trait PermissionPolicy: Send + Sync {
    fn has_permission(&self, identity: &Identity, permission: &str) -> bool;
}

/// Placeholder policy: every authenticated identity holds every permission.
///
/// No mapping from permissions to roles has been defined for the studio yet.
/// Swap in a real policy through `SecurityProvider::with_permission_policy`.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAllPermissions;

impl PermissionPolicy for AllowAllPermissions {
    fn has_permission(&self, _identity: &Identity, _permission: &str) -> bool {
        true
    }
}

/// Grants permissions from an explicit role table supplied by the operator.
#[derive(Debug, Default, Clone)]
pub struct RolePermissionTable {
    grants: HashMap<String, HashSet<String>>,
}

impl RolePermissionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(mut self, role_id: impl Into<String>, permission: impl Into<String>) -> Self {
        self.grants
            .entry(role_id.into())
            .or_default()
            .insert(permission.into());
        self
    }
}

impl PermissionPolicy for RolePermissionTable {
    fn has_permission(&self, identity: &Identity, permission: &str) -> bool {
        self.grants
            .get(&identity.role_id)
            .is_some_and(|permissions| permissions.contains(permission))
    }
}
