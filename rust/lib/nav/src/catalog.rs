//! The marketplace route tables.
//!
//! Four role subtrees plus the legacy redirects that keep old links alive.
//! Every subtree also carries the shared sections (messages, network,
//! learning, profile, settings and the AI tools) so role-scoped aliases like
//! `/ai` land somewhere for every role.

use crate::config::ShellConfig;
use crate::error::NavError;
use crate::redirect::RedirectTable;
use crate::registry::{RouteNode, RouteRegistry, ViewRef};
use crate::role::Role;

/// Single-segment paths every role owns under its own prefix.
pub const ROLE_SCOPED_SEGMENTS: [&str; 6] =
    ["ai", "profile", "network", "learning", "messages", "settings"];

/// Registry of the four role subtrees and the forbidden page.
pub fn default_registry() -> Result<RouteRegistry, NavError> {
    RouteRegistry::builder()
        .role(Role::Engineer, engineer())
        .role(Role::Client, client())
        .role(Role::Enterprise, enterprise())
        .role(Role::Admin, admin())
        .forbidden(ViewRef::eager("shared.forbidden"))
        .build()
}

/// Legacy redirects, sending role-less visitors to `config.auth_entry`.
pub fn default_redirects(config: &ShellConfig) -> Result<RedirectTable, NavError> {
    let mut builder = RedirectTable::builder(&config.auth_entry)
        .alias("/e/checkin", "/engineer/checkin")
        .alias("/checkin", "/engineer/checkin")
        .alias("/check-in", "/engineer/checkin")
        .alias("/e/dashboard", "/engineer/dashboard");
    for segment in ROLE_SCOPED_SEGMENTS {
        builder = builder.role_scoped(segment);
    }
    builder
        .prefix("/c", "/client")
        .prefix("/e", "/enterprise")
        .prefix("/free", "/client")
        .role_exception("/client/payments", Role::Engineer, "/engineer/payments")
        .build()
}

fn engineer() -> RouteNode {
    RouteNode::new("engineer")
        .index("dashboard")
        .child(RouteNode::leaf("dashboard", ViewRef::eager("engineer.dashboard")))
        .child(RouteNode::leaf("checkin", ViewRef::eager("engineer.checkin")))
        .child(RouteNode::leaf("jobs", ViewRef::eager("engineer.jobs")))
        .child(RouteNode::leaf("jobs/:jobId", ViewRef::eager("engineer.job")))
        .child(RouteNode::leaf("jobs/:jobId/tasks/:taskId", ViewRef::eager("engineer.job")))
        .child(RouteNode::leaf("calendar", ViewRef::eager("engineer.calendar")))
        .child(RouteNode::leaf("calendar/events/:eventId", ViewRef::eager("engineer.event")))
        .child(RouteNode::leaf("payments", ViewRef::eager("engineer.payments")))
        .children(shared())
}

fn client() -> RouteNode {
    RouteNode::new("client")
        .index("dashboard")
        .child(RouteNode::leaf("dashboard", ViewRef::eager("client.dashboard")))
        .child(RouteNode::leaf("jobs", ViewRef::eager("client.jobs")))
        .child(RouteNode::leaf("jobs/new", ViewRef::eager("client.job_new")))
        .child(RouteNode::leaf("jobs/:jobId", ViewRef::eager("client.job")))
        .child(RouteNode::leaf("jobs/:jobId/tasks/:taskId", ViewRef::eager("client.job")))
        .child(RouteNode::leaf("engineers", ViewRef::eager("client.engineers")))
        .child(RouteNode::leaf("engineers/:engineerId", ViewRef::eager("client.engineer")))
        .child(RouteNode::leaf("payments", ViewRef::eager("client.payments")))
        .children(shared())
}

fn enterprise() -> RouteNode {
    RouteNode::new("enterprise")
        .index("dashboard")
        .child(RouteNode::leaf("dashboard", ViewRef::eager("enterprise.dashboard")))
        .child(RouteNode::leaf("jobs", ViewRef::eager("enterprise.jobs")))
        .child(RouteNode::leaf("jobs/:jobId", ViewRef::eager("enterprise.job")))
        .child(RouteNode::leaf("jobs/:jobId/tasks/:taskId", ViewRef::eager("enterprise.job")))
        .child(RouteNode::leaf("teams", ViewRef::eager("enterprise.teams")))
        .child(RouteNode::leaf("teams/:teamId", ViewRef::eager("enterprise.team")))
        .child(RouteNode::leaf("projects/:projectId", ViewRef::eager("enterprise.project")))
        .child(RouteNode::leaf("analytics", ViewRef::deferred("enterprise.analytics")))
        .children(shared())
}

fn admin() -> RouteNode {
    RouteNode::new("admin")
        .index("dashboard")
        .child(RouteNode::leaf("dashboard", ViewRef::eager("admin.dashboard")))
        .child(RouteNode::leaf("users", ViewRef::eager("admin.users")))
        .child(RouteNode::leaf("users/:userId", ViewRef::eager("admin.user")))
        .child(RouteNode::leaf("disputes", ViewRef::eager("admin.disputes")))
        .child(RouteNode::leaf("disputes/:disputeId", ViewRef::eager("admin.dispute")))
        .child(RouteNode::leaf("reports", ViewRef::deferred("admin.reports")))
        .children(shared())
}

/// Sections mounted under every role prefix.
fn shared() -> Vec<RouteNode> {
    vec![
        RouteNode::leaf("messages", ViewRef::eager("shared.messages")),
        RouteNode::leaf("messages/:threadId", ViewRef::eager("shared.thread")),
        RouteNode::leaf("network", ViewRef::deferred("shared.network")),
        RouteNode::leaf("learning", ViewRef::deferred("shared.learning")),
        RouteNode::leaf("learning/:courseId", ViewRef::deferred("shared.course")),
        RouteNode::leaf("profile", ViewRef::eager("shared.profile")),
        RouteNode::leaf("settings", ViewRef::eager("shared.settings")),
        ai_tools(),
    ]
}

fn ai_tools() -> RouteNode {
    RouteNode::new("ai")
        .index("tools")
        .child(
            RouteNode::leaf("tools", ViewRef::deferred("ai.tools"))
                .child(RouteNode::leaf(":toolId", ViewRef::deferred("ai.tool"))),
        )
        .child(
            RouteNode::leaf("workflows", ViewRef::deferred("ai.workflows")).child(
                RouteNode::leaf(":workflowId", ViewRef::deferred("ai.workflow"))
                    .child(RouteNode::leaf("steps/:stepId", ViewRef::deferred("ai.workflow"))),
            ),
        )
}
