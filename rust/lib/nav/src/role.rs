//! Roles and effective-role computation.
//!
//! A profile carries exactly one [`Role`]. Routing never looks at it
//! directly: it first goes through a [`RolePolicy`] (subscription
//! upgrades and the like live there) and the result is wrapped in an
//! [`EffectiveRole`]. The newtype is what every routing function accepts,
//! so an un-policed role cannot reach the router by accident.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::NavError;

/// Base access category of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Engineer,
    Client,
    Enterprise,
    Admin,
}

impl Role {
    /// All roles, in a stable order.
    pub const ALL: [Role; 4] = [Role::Engineer, Role::Client, Role::Enterprise, Role::Admin];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Engineer => "engineer",
            Role::Client => "client",
            Role::Enterprise => "enterprise",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = NavError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "engineer" => Ok(Role::Engineer),
            "client" => Ok(Role::Client),
            "enterprise" => Ok(Role::Enterprise),
            "admin" => Ok(Role::Admin),
            other => Err(NavError::UnknownRole(other.to_string())),
        }
    }
}

/// The role used for routing after any override has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EffectiveRole(Role);

impl EffectiveRole {
    pub fn role(self) -> Role {
        self.0
    }

    /// URL prefix of this role's subtree.
    pub fn base(self) -> &'static str {
        role_base(self.0)
    }
}

impl From<Role> for EffectiveRole {
    fn from(role: Role) -> Self {
        EffectiveRole(role)
    }
}

impl fmt::Display for EffectiveRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// URL prefix owned by a role.
pub fn role_base(role: Role) -> &'static str {
    match role {
        Role::Engineer => "/engineer",
        Role::Client => "/client",
        Role::Enterprise => "/enterprise",
        Role::Admin => "/admin",
    }
}

// ── RolePolicy ──

/// External collaborator that may upgrade a base role, e.g. from
/// subscription status. Must be deterministic: it runs on every render.
pub trait RolePolicy: Send + Sync + 'static {
    fn effective_role(&self, role: Role) -> Role;
}

/// Closures implement RolePolicy.
impl<F> RolePolicy for F
where
    F: Fn(Role) -> Role + Send + Sync + 'static,
{
    fn effective_role(&self, role: Role) -> Role {
        (self)(role)
    }
}

/// Identity policy: the base role is the effective role.
#[derive(Debug, Clone, Copy, Default)]
pub struct BaseRole;

impl RolePolicy for BaseRole {
    fn effective_role(&self, role: Role) -> Role {
        role
    }
}

/// Compute the effective role for a profile role.
///
/// Callers must not invoke this without a profile; absence is handled by
/// the guard as the unauthenticated state.
pub fn effective_role(role: Role, policy: &dyn RolePolicy) -> EffectiveRole {
    EffectiveRole(policy.effective_role(role))
}
