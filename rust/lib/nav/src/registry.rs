//! Route Tree Registry: per-role route subtrees compiled into pattern tries.
//!
//! Each role owns one subtree mounted under its URL prefix (`/engineer`,
//! `/client`, ...). A subtree is a declarative [`RouteNode`] tree: nodes bind
//! a path (one or more segments, `:params` allowed) to a [`ViewRef`], may
//! redirect their own path to an `index` child, and nest children.
//!
//! A role sees its own subtree plus the shared `/403` leaf. Anything else
//! falls through to the catch-all, which lands on the role's dashboard.
//!
//! The registry does not care whether a view loads eagerly or deferred; it
//! only hands out the [`ViewRef`]. The suspense layer owns the difference.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::NavError;
use crate::landing::landing_page;
use crate::pattern::{PatternTrie, RouteParams};
use crate::redirect::{split_suffix, RedirectTable};
use crate::role::{role_base, EffectiveRole, Role};

/// The dedicated forbidden path, outside every role subtree.
pub const FORBIDDEN_PATH: &str = "/403";

// ── Views ──

/// Stable identifier of a page view, e.g. `engineer.dashboard`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewId(String);

impl ViewId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ViewId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// When a view's code is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStrategy {
    /// Loaded at startup.
    #[default]
    Eager,
    /// Loaded on first navigation.
    Deferred,
}

/// A reference to a view plus its loading strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewRef {
    pub id: ViewId,
    #[serde(default)]
    pub load: LoadStrategy,
}

impl ViewRef {
    pub fn eager(id: &str) -> Self {
        Self {
            id: ViewId::from(id),
            load: LoadStrategy::Eager,
        }
    }

    pub fn deferred(id: &str) -> Self {
        Self {
            id: ViewId::from(id),
            load: LoadStrategy::Deferred,
        }
    }
}

// ── RouteNode ──

/// One node of a declarative route tree.
///
/// ```ignore
/// RouteNode::new("engineer")
///     .index("dashboard")
///     .child(RouteNode::leaf("dashboard", ViewRef::eager("engineer.dashboard")))
///     .child(RouteNode::leaf("jobs/:jobId", ViewRef::eager("engineer.job")));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteNode {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<ViewRef>,
    /// Child path this node's own path redirects to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RouteNode>,
}

impl RouteNode {
    /// A grouping node with no view of its own.
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            view: None,
            index: None,
            children: Vec::new(),
        }
    }

    pub fn leaf(path: &str, view: ViewRef) -> Self {
        Self::new(path).with_view(view)
    }

    pub fn with_view(mut self, view: ViewRef) -> Self {
        self.view = Some(view);
        self
    }

    pub fn index(mut self, target: &str) -> Self {
        self.index = Some(target.to_string());
        self
    }

    pub fn child(mut self, child: RouteNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = RouteNode>) -> Self {
        self.children.extend(children);
        self
    }

    /// Parse a tree from its JSON description.
    pub fn from_json(json: &str) -> Result<Self, NavError> {
        Ok(serde_json::from_str(json)?)
    }
}

// ── Resolution ──

/// A matched view route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub view: ViewRef,
    /// Full pattern that matched, e.g. `/engineer/jobs/:jobId`.
    pub pattern: String,
    pub params: RouteParams,
}

/// Outcome of routing a path for a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A view is mounted at this path.
    View(RouteMatch),
    /// The root path or an index node redirects.
    Redirect(String),
    /// Nothing matched; the catch-all sends the role to its landing page.
    Fallback(String),
}

#[derive(Debug, Clone)]
enum Target {
    View { view: ViewRef, pattern: String },
    Redirect(String),
    Landing,
}

/// One compiled route, for listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteEntry {
    pub pattern: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<ViewRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

// ── RouteRegistry ──

/// Validated per-role route tables.
pub struct RouteRegistry {
    subtrees: BTreeMap<Role, RouteNode>,
    tables: HashMap<Role, PatternTrie<Target>>,
    entries: BTreeMap<Role, Vec<RouteEntry>>,
    forbidden: ViewRef,
}

impl fmt::Debug for RouteRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let routes: BTreeMap<Role, usize> =
            self.entries.iter().map(|(role, e)| (*role, e.len())).collect();
        f.debug_struct("RouteRegistry")
            .field("routes", &routes)
            .field("forbidden", &self.forbidden)
            .finish()
    }
}

impl RouteRegistry {
    pub fn builder() -> RouteRegistryBuilder {
        RouteRegistryBuilder {
            subtrees: BTreeMap::new(),
            forbidden: None,
        }
    }

    /// Route `path` for `role`. A query string or fragment is ignored.
    pub fn resolve(&self, role: EffectiveRole, path: &str) -> Resolution {
        let (path, _) = split_suffix(path);
        let landing = landing_page(role).to_string();
        let Some(table) = self.tables.get(&role.role()) else {
            return Resolution::Fallback(landing);
        };
        match table.find(path) {
            Some(m) => match m.value {
                Target::View { view, pattern } => Resolution::View(RouteMatch {
                    view: view.clone(),
                    pattern: pattern.clone(),
                    params: m.params,
                }),
                Target::Redirect(to) => Resolution::Redirect(to.clone()),
                Target::Landing => Resolution::Redirect(landing),
            },
            None => Resolution::Fallback(landing),
        }
    }

    /// Declared subtree of a role.
    pub fn subtree(&self, role: Role) -> Option<&RouteNode> {
        self.subtrees.get(&role)
    }

    /// Compiled routes of a role, in declaration order.
    pub fn routes(&self, role: Role) -> &[RouteEntry] {
        self.entries.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every view to fetch at startup, deduplicated.
    pub fn eager_views(&self) -> Vec<ViewRef> {
        self.views_with(LoadStrategy::Eager)
    }

    /// Every view fetched on first navigation, deduplicated.
    pub fn deferred_views(&self) -> Vec<ViewRef> {
        self.views_with(LoadStrategy::Deferred)
    }

    fn views_with(&self, load: LoadStrategy) -> Vec<ViewRef> {
        let ids: BTreeSet<&ViewId> = self
            .entries
            .values()
            .flatten()
            .filter_map(|e| e.view.as_ref())
            .chain(std::iter::once(&self.forbidden))
            .filter(|v| v.load == load)
            .map(|v| &v.id)
            .collect();
        ids.into_iter()
            .map(|id| ViewRef {
                id: id.clone(),
                load,
            })
            .collect()
    }

    /// Check that every redirect landing inside the caller's own subtree
    /// reaches a route. Catches role-scoped aliases a subtree forgot.
    pub fn check_redirects(&self, table: &RedirectTable) -> Result<(), NavError> {
        for rule in table.rules() {
            let path = rule.sample_path();
            for role in Role::ALL {
                let role = EffectiveRole::from(role);
                let Some(target) = table.resolve(&path, Some(role)) else {
                    continue;
                };
                let (bare, _) = split_suffix(&target);
                if !is_under(bare, role.base()) {
                    continue;
                }
                if let Resolution::Fallback(_) = self.resolve(role, bare) {
                    return Err(NavError::DanglingRedirect {
                        role: role.role(),
                        target,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Builder for [`RouteRegistry`].
pub struct RouteRegistryBuilder {
    subtrees: BTreeMap<Role, RouteNode>,
    forbidden: Option<ViewRef>,
}

impl RouteRegistryBuilder {
    /// Mount `root` as the subtree of `role`. Its path must be the role's
    /// prefix without the leading slash.
    pub fn role(mut self, role: Role, root: RouteNode) -> Self {
        self.subtrees.insert(role, root);
        self
    }

    /// View mounted at [`FORBIDDEN_PATH`] for every role.
    pub fn forbidden(mut self, view: ViewRef) -> Self {
        self.forbidden = Some(view);
        self
    }

    /// Validate every subtree and compile the per-role tables.
    pub fn build(self) -> Result<RouteRegistry, NavError> {
        let forbidden = self
            .forbidden
            .unwrap_or_else(|| ViewRef::eager("shared.forbidden"));

        let mut tables = HashMap::new();
        let mut entries = BTreeMap::new();

        for role in Role::ALL {
            let root = self
                .subtrees
                .get(&role)
                .ok_or(NavError::MissingSubtree(role))?;
            let base = role_base(role);
            if format!("/{}", root.path.trim_matches('/')) != base {
                return Err(NavError::invalid_pattern(
                    &root.path,
                    format!("subtree for role {role} must be mounted at {base}"),
                ));
            }
            let Some(ref index) = root.index else {
                return Err(NavError::MissingIndex(role));
            };

            let mut compiled = Vec::new();
            let mut indexes = Vec::new();
            compile(root, "", &mut compiled, &mut indexes)?;

            let mut table = PatternTrie::new();
            table.insert("/", Target::Landing)?;
            table.insert(
                FORBIDDEN_PATH,
                Target::View {
                    view: forbidden.clone(),
                    pattern: FORBIDDEN_PATH.to_string(),
                },
            )?;
            for entry in &compiled {
                let target = match (&entry.view, &entry.redirect) {
                    (Some(view), _) => Target::View {
                        view: view.clone(),
                        pattern: entry.pattern.clone(),
                    },
                    (None, Some(to)) => Target::Redirect(to.clone()),
                    (None, None) => continue,
                };
                table.insert(&entry.pattern, target)?;
            }

            // Index redirects must land on a view, not another redirect.
            for target in &indexes {
                match table.find(target).map(|m| m.value) {
                    Some(Target::View { .. }) => {}
                    _ => {
                        return Err(NavError::DanglingIndex {
                            role,
                            target: target.clone(),
                        })
                    }
                }
            }

            // The landing page is the root index target and renders a view.
            let landing = landing_page(EffectiveRole::from(role));
            let root_index = join(base, index);
            let lands = matches!(
                table.find(landing).map(|m| m.value),
                Some(Target::View { .. })
            );
            if root_index != landing || !lands {
                return Err(NavError::DanglingLanding {
                    role,
                    path: landing.to_string(),
                });
            }

            tables.insert(role, table);
            entries.insert(role, compiled);
        }

        Ok(RouteRegistry {
            subtrees: self.subtrees,
            tables,
            entries,
            forbidden,
        })
    }
}

/// Flatten `node` into route entries with absolute patterns.
fn compile(
    node: &RouteNode,
    parent: &str,
    out: &mut Vec<RouteEntry>,
    indexes: &mut Vec<String>,
) -> Result<(), NavError> {
    let segment = node.path.trim_matches('/');
    if segment.is_empty() {
        return Err(NavError::invalid_pattern(&node.path, "empty route path"));
    }
    let pattern = join(parent, segment);

    let mut siblings = HashSet::new();
    for child in &node.children {
        if !siblings.insert(child.path.trim_matches('/')) {
            return Err(NavError::DuplicateSegment {
                parent: pattern.clone(),
                segment: child.path.clone(),
            });
        }
    }

    let redirect = match &node.index {
        Some(index) => {
            let index = index.trim_matches('/');
            if !node.children.iter().any(|c| c.path.trim_matches('/') == index) {
                return Err(NavError::DanglingIndex {
                    role: role_of(&pattern),
                    target: join(&pattern, index),
                });
            }
            let target = join(&pattern, index);
            indexes.push(target.clone());
            Some(target)
        }
        None => None,
    };

    if node.view.is_some() && redirect.is_some() {
        return Err(NavError::invalid_pattern(
            &pattern,
            "a route cannot render a view and redirect to an index",
        ));
    }
    if node.view.is_some() || redirect.is_some() {
        out.push(RouteEntry {
            pattern: pattern.clone(),
            view: node.view.clone(),
            redirect,
        });
    }

    for child in &node.children {
        compile(child, &pattern, out, indexes)?;
    }
    Ok(())
}

fn join(parent: &str, segment: &str) -> String {
    format!("{}/{}", parent.trim_end_matches('/'), segment.trim_matches('/'))
}

fn is_under(path: &str, base: &str) -> bool {
    path == base || path.starts_with(&format!("{base}/"))
}

/// Role owning an absolute pattern, for error reporting.
fn role_of(pattern: &str) -> Role {
    Role::ALL
        .into_iter()
        .find(|r| is_under(pattern, role_base(*r)))
        .unwrap_or(Role::Engineer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subtree(role: Role) -> RouteNode {
        let name = role.as_str();
        RouteNode::new(name)
            .index("dashboard")
            .child(RouteNode::leaf("dashboard", ViewRef::eager(&format!("{name}.dashboard"))))
            .child(RouteNode::leaf("jobs", ViewRef::eager(&format!("{name}.jobs"))))
            .child(RouteNode::leaf("jobs/:jobId", ViewRef::eager(&format!("{name}.job"))))
            .child(RouteNode::leaf(
                "jobs/:jobId/tasks/:taskId",
                ViewRef::eager(&format!("{name}.job")),
            ))
            .child(
                RouteNode::new("ai")
                    .index("tools")
                    .child(RouteNode::leaf("tools", ViewRef::deferred("ai.tools")))
                    .child(
                        RouteNode::new("workflows").child(
                            RouteNode::leaf(":workflowId", ViewRef::deferred("ai.workflow"))
                                .child(RouteNode::leaf(
                                    "steps/:stepId",
                                    ViewRef::deferred("ai.workflow"),
                                )),
                        ),
                    ),
            )
    }

    fn builder() -> RouteRegistryBuilder {
        Role::ALL
            .into_iter()
            .fold(RouteRegistry::builder(), |b, role| b.role(role, subtree(role)))
    }

    fn eff(role: Role) -> EffectiveRole {
        EffectiveRole::from(role)
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    #[test]
    fn exact_leaf() {
        let reg = builder().build().unwrap();
        match reg.resolve(eff(Role::Engineer), "/engineer/dashboard") {
            Resolution::View(m) => {
                assert_eq!(m.view.id.as_str(), "engineer.dashboard");
                assert_eq!(m.pattern, "/engineer/dashboard");
                assert!(m.params.is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parameterized_leaves_share_a_view() {
        let reg = builder().build().unwrap();
        let Resolution::View(a) = reg.resolve(eff(Role::Client), "/client/jobs/42") else {
            panic!("no match");
        };
        let Resolution::View(b) = reg.resolve(eff(Role::Client), "/client/jobs/42/tasks/7") else {
            panic!("no match");
        };
        assert_eq!(a.view, b.view);
        assert_eq!(a.params.get("jobId"), Some("42"));
        assert_eq!(b.params.get("jobId"), Some("42"));
        assert_eq!(b.params.get("taskId"), Some("7"));
    }

    #[test]
    fn nested_groups_compile_to_full_patterns() {
        let reg = builder().build().unwrap();
        let path = "/admin/ai/workflows/w1/steps/3";
        let Resolution::View(m) = reg.resolve(eff(Role::Admin), path) else {
            panic!("no match");
        };
        assert_eq!(m.pattern, "/admin/ai/workflows/:workflowId/steps/:stepId");
        assert_eq!(m.view.load, LoadStrategy::Deferred);
        assert_eq!(m.params.get("stepId"), Some("3"));
    }

    #[test]
    fn index_and_root_redirect() {
        let reg = builder().build().unwrap();
        assert_eq!(
            reg.resolve(eff(Role::Engineer), "/engineer"),
            Resolution::Redirect("/engineer/dashboard".into())
        );
        assert_eq!(
            reg.resolve(eff(Role::Engineer), "/engineer/ai"),
            Resolution::Redirect("/engineer/ai/tools".into())
        );
        assert_eq!(
            reg.resolve(eff(Role::Enterprise), "/"),
            Resolution::Redirect("/enterprise/dashboard".into())
        );
    }

    #[test]
    fn other_roles_subtrees_are_not_mounted() {
        let reg = builder().build().unwrap();
        assert_eq!(
            reg.resolve(eff(Role::Engineer), "/client/jobs"),
            Resolution::Fallback("/engineer/dashboard".into())
        );
        assert_eq!(
            reg.resolve(eff(Role::Admin), "/nowhere/at/all"),
            Resolution::Fallback("/admin/dashboard".into())
        );
    }

    #[test]
    fn forbidden_is_mounted_for_every_role() {
        let reg = builder().build().unwrap();
        for role in Role::ALL {
            let Resolution::View(m) = reg.resolve(eff(role), "/403") else {
                panic!("403 not mounted for {role}");
            };
            assert_eq!(m.view.id.as_str(), "shared.forbidden");
        }
    }

    #[test]
    fn query_is_ignored_for_matching() {
        let reg = builder().build().unwrap();
        assert!(matches!(
            reg.resolve(eff(Role::Client), "/client/jobs?page=2"),
            Resolution::View(_)
        ));
    }

    // ========================================================================
    // Validation
    // ========================================================================

    #[test]
    fn duplicate_siblings_are_rejected() {
        let root = subtree(Role::Client).child(RouteNode::leaf("jobs", ViewRef::eager("dup")));
        let err = builder().role(Role::Client, root).build().unwrap_err();
        assert_eq!(err.error_code(), "DUPLICATE_SEGMENT");
    }

    #[test]
    fn missing_subtree_is_rejected() {
        let err = RouteRegistry::builder()
            .role(Role::Engineer, subtree(Role::Engineer))
            .build()
            .unwrap_err();
        assert_eq!(err.error_code(), "MISSING_SUBTREE");
    }

    #[test]
    fn missing_root_index_is_rejected() {
        let mut root = subtree(Role::Admin);
        root.index = None;
        let err = builder().role(Role::Admin, root).build().unwrap_err();
        assert_eq!(err.error_code(), "MISSING_INDEX");
    }

    #[test]
    fn index_to_unknown_child_is_rejected() {
        let root = subtree(Role::Admin).index("overview");
        let err = builder().role(Role::Admin, root).build().unwrap_err();
        assert_eq!(err.error_code(), "DANGLING_INDEX");
    }

    #[test]
    fn landing_must_be_root_index() {
        let root = subtree(Role::Enterprise).index("jobs");
        let err = builder().role(Role::Enterprise, root).build().unwrap_err();
        assert_eq!(err.error_code(), "DANGLING_LANDING");
    }

    #[test]
    fn subtree_must_sit_on_role_prefix() {
        let mut root = subtree(Role::Client);
        root.path = "free".into();
        let err = builder().role(Role::Client, root).build().unwrap_err();
        assert_eq!(err.error_code(), "INVALID_PATTERN");
    }

    // ========================================================================
    // Listing
    // ========================================================================

    #[test]
    fn eager_and_deferred_views_are_split() {
        let reg = builder().build().unwrap();
        let deferred: Vec<_> = reg.deferred_views().into_iter().map(|v| v.id.to_string()).collect();
        assert_eq!(deferred, vec!["ai.tools", "ai.workflow"]);
        let eager = reg.eager_views();
        assert!(eager.iter().all(|v| v.load == LoadStrategy::Eager));
        assert!(eager.iter().any(|v| v.id.as_str() == "client.job"));
        assert!(eager.iter().any(|v| v.id.as_str() == "shared.forbidden"));
    }

    #[test]
    fn routes_list_in_declaration_order() {
        let reg = builder().build().unwrap();
        let patterns: Vec<_> = reg
            .routes(Role::Engineer)
            .iter()
            .map(|e| e.pattern.as_str())
            .collect();
        assert_eq!(patterns[0], "/engineer");
        assert_eq!(patterns[1], "/engineer/dashboard");
        assert!(patterns.contains(&"/engineer/ai/workflows/:workflowId/steps/:stepId"));
    }

    #[test]
    fn tree_parses_from_json() {
        let json = r#"{
            "path": "admin",
            "index": "dashboard",
            "children": [
                {"path": "dashboard", "view": {"id": "admin.dashboard"}},
                {"path": "reports", "view": {"id": "admin.reports", "load": "deferred"}}
            ]
        }"#;
        let root = RouteNode::from_json(json).unwrap();
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[1].view, Some(ViewRef::deferred("admin.reports")));

        let reg = builder().role(Role::Admin, root).build().unwrap();
        assert!(matches!(
            reg.resolve(eff(Role::Admin), "/admin/reports"),
            Resolution::View(_)
        ));
    }

    #[test]
    fn redirect_targets_inside_own_subtree_must_exist() {
        let reg = builder().build().unwrap();
        let ok = RedirectTable::builder("/login")
            .prefix("/c", "/client")
            .role_scoped("ai")
            .build()
            .unwrap();
        reg.check_redirects(&ok).unwrap();

        let dangling = RedirectTable::builder("/login").role_scoped("learning").build().unwrap();
        let err = reg.check_redirects(&dangling).unwrap_err();
        assert_eq!(err.error_code(), "DANGLING_REDIRECT");
    }
}
