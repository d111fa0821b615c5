use crate::role::{EffectiveRole, Role};

/// Default dashboard of a role. Target of `/` and of the catch-all.
pub fn landing_page(role: EffectiveRole) -> &'static str {
    match role.role() {
        Role::Engineer => "/engineer/dashboard",
        Role::Client => "/client/dashboard",
        Role::Enterprise => "/enterprise/dashboard",
        Role::Admin => "/admin/dashboard",
    }
}
