//! Legacy path translation.
//!
//! Deprecated and ambiguous URLs are rewritten into the role-scoped URL
//! scheme by an ordered list of rules. Rules are data, not control flow:
//! each one pairs a [`Matcher`] with an action, and the table evaluates
//! them top to bottom, first match wins.
//!
//! # Tiers
//!
//! Rules are grouped in four tiers that always run in this order,
//! regardless of the order they were added in:
//!
//! 1. [`RuleTier::Fixed`]: role-independent aliases (`/e/checkin`).
//! 2. [`RuleTier::RoleScoped`]: shared single-segment paths (`/ai`) that
//!    move under the caller's role base, or to the sign-in entry when
//!    there is no role.
//! 3. [`RuleTier::PrefixRewrite`]: short prefixes (`/c/...`) rewritten to
//!    the long prefix, keeping the remainder of the path.
//! 4. [`RuleTier::RoleException`]: a literal path that redirects for one
//!    role only.
//!
//! Overlap across tiers is legal and settled by tier order. Two rules
//! with the same matcher inside one tier are rejected at build time.
//!
//! # Example
//!
//! ```ignore
//! let table = RedirectTable::builder("/login")
//!     .alias("/e/checkin", "/engineer/checkin")
//!     .prefix("/c", "/client")
//!     .build()?;
//! assert_eq!(table.resolve("/c/jobs/42", None).as_deref(), Some("/client/jobs/42"));
//! ```

use std::collections::HashSet;
use std::fmt;

use crate::error::NavError;
use crate::role::{EffectiveRole, Role};

/// Evaluation tier of a rule. Lower tiers run first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleTier {
    Fixed,
    RoleScoped,
    PrefixRewrite,
    RoleException,
}

/// What part of a path a rule looks at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Matcher {
    /// The whole path, ignoring one trailing slash.
    Exact(String),
    /// The path itself or anything below it, on a segment boundary.
    Prefix(String),
}

impl Matcher {
    fn pattern(&self) -> &str {
        match self {
            Matcher::Exact(p) | Matcher::Prefix(p) => p,
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Exact(p) => f.write_str(p),
            Matcher::Prefix(p) => write!(f, "{p}/**"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    To(String),
    UnderRole { segment: String },
    Rewrite { to: String },
    ForRole { role: Role, target: String },
}

/// One matcher → target rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectRule {
    tier: RuleTier,
    matcher: Matcher,
    action: Action,
}

impl RedirectRule {
    pub fn tier(&self) -> RuleTier {
        self.tier
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// A concrete path this rule matches, for table sweeps.
    pub fn sample_path(&self) -> String {
        match &self.matcher {
            Matcher::Exact(p) => p.clone(),
            Matcher::Prefix(p) => format!("{p}/jobs/42"),
        }
    }

    fn apply(
        &self,
        raw: &str,
        path: &str,
        suffix: &str,
        role: Option<EffectiveRole>,
        auth_entry: &str,
    ) -> Option<String> {
        match (&self.matcher, &self.action) {
            (Matcher::Exact(p), Action::To(target)) if p == path => {
                Some(format!("{target}{suffix}"))
            }
            (Matcher::Exact(p), Action::UnderRole { segment }) if p == path => Some(match role {
                Some(role) => format!("{}/{segment}{suffix}", role.base()),
                None => auth_entry.to_string(),
            }),
            (Matcher::Exact(p), Action::ForRole { role: only, target }) if p == path => {
                match role {
                    Some(role) if role.role() == *only => Some(format!("{target}{suffix}")),
                    _ => None,
                }
            }
            (Matcher::Prefix(p), Action::Rewrite { to }) => {
                let rest = strip_segment_prefix(raw, p)?;
                Some(format!("{to}{rest}{suffix}"))
            }
            _ => None,
        }
    }
}

// ── RedirectTable ──

/// Ordered, validated set of redirect rules.
#[derive(Debug, Clone)]
pub struct RedirectTable {
    rules: Vec<RedirectRule>,
    auth_entry: String,
}

impl RedirectTable {
    /// Start a table whose role-scoped rules send role-less callers to
    /// `auth_entry`.
    pub fn builder(auth_entry: &str) -> RedirectTableBuilder {
        RedirectTableBuilder {
            auth_entry: auth_entry.to_string(),
            rules: Vec::new(),
        }
    }

    /// Translate `path` for `role`, or `None` when no rule matches.
    ///
    /// Pure in `(path, role)`. A query string or fragment is carried over
    /// to the target, except when the target is the sign-in entry. The
    /// target is translated again until no rule matches, so resolving a
    /// result never redirects further.
    pub fn resolve(&self, path: &str, role: Option<EffectiveRole>) -> Option<String> {
        let mut target = self.apply_first(path, role)?;
        // `/c/payments` rewrites to `/client/payments`, which an engineer
        // is then sent on from.
        for _ in 0..self.rules.len() {
            match self.apply_first(&target, role) {
                Some(next) if next != target => target = next,
                _ => break,
            }
        }
        Some(target)
    }

    fn apply_first(&self, path: &str, role: Option<EffectiveRole>) -> Option<String> {
        let (raw, suffix) = split_suffix(path);
        let normalized = trim_trailing_slash(raw);
        self.rules
            .iter()
            .find_map(|rule| rule.apply(raw, normalized, suffix, role, &self.auth_entry))
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> &[RedirectRule] {
        &self.rules
    }

    pub fn auth_entry(&self) -> &str {
        &self.auth_entry
    }
}

/// Builder for [`RedirectTable`]. Rule order inside a tier is insertion order.
#[derive(Debug, Clone)]
pub struct RedirectTableBuilder {
    auth_entry: String,
    rules: Vec<RedirectRule>,
}

impl RedirectTableBuilder {
    /// Role-independent alias: `from` always goes to `to`.
    pub fn alias(mut self, from: &str, to: &str) -> Self {
        self.rules.push(RedirectRule {
            tier: RuleTier::Fixed,
            matcher: Matcher::Exact(from.to_string()),
            action: Action::To(to.to_string()),
        });
        self
    }

    /// Shared single-segment path: `/<segment>` goes to `<role base>/<segment>`.
    pub fn role_scoped(mut self, segment: &str) -> Self {
        self.rules.push(RedirectRule {
            tier: RuleTier::RoleScoped,
            matcher: Matcher::Exact(format!("/{segment}")),
            action: Action::UnderRole {
                segment: segment.to_string(),
            },
        });
        self
    }

    /// Short prefix rewrite: `from/<rest>` goes to `to/<rest>`.
    pub fn prefix(mut self, from: &str, to: &str) -> Self {
        self.rules.push(RedirectRule {
            tier: RuleTier::PrefixRewrite,
            matcher: Matcher::Prefix(from.to_string()),
            action: Action::Rewrite { to: to.to_string() },
        });
        self
    }

    /// `path` goes to `target` for `role` only; other roles pass through.
    pub fn role_exception(mut self, path: &str, role: Role, target: &str) -> Self {
        self.rules.push(RedirectRule {
            tier: RuleTier::RoleException,
            matcher: Matcher::Exact(path.to_string()),
            action: Action::ForRole {
                role,
                target: target.to_string(),
            },
        });
        self
    }

    /// Validate and freeze the table.
    pub fn build(mut self) -> Result<RedirectTable, NavError> {
        validate_path(&self.auth_entry)?;

        let mut seen = HashSet::new();
        for rule in &self.rules {
            validate_path(rule.matcher.pattern())?;
            if let Matcher::Prefix(p) = &rule.matcher {
                if p == "/" {
                    return Err(NavError::invalid_pattern(p, "prefix rule cannot cover the root"));
                }
            }
            match &rule.action {
                Action::To(target) | Action::ForRole { target, .. } => validate_path(target)?,
                Action::Rewrite { to } => validate_path(to)?,
                Action::UnderRole { segment } => {
                    if segment.is_empty() || segment.contains('/') {
                        return Err(NavError::invalid_pattern(
                            segment,
                            "role-scoped alias must be a single segment",
                        ));
                    }
                }
            }
            if !seen.insert((rule.tier, rule.matcher.clone())) {
                return Err(NavError::AmbiguousRule(rule.matcher.to_string()));
            }
        }

        // Stable: insertion order survives inside each tier.
        self.rules.sort_by_key(|rule| rule.tier);

        let table = RedirectTable {
            rules: self.rules,
            auth_entry: self.auth_entry,
        };
        table.check_settles()?;
        Ok(table)
    }
}

impl RedirectTable {
    /// Every rule's target must be a fixed point for every caller,
    /// signed out included.
    fn check_settles(&self) -> Result<(), NavError> {
        let callers: Vec<Option<EffectiveRole>> = std::iter::once(None)
            .chain(Role::ALL.into_iter().map(|r| Some(EffectiveRole::from(r))))
            .collect();
        for rule in &self.rules {
            let path = rule.sample_path();
            for role in &callers {
                let Some(target) = self.resolve(&path, *role) else {
                    continue;
                };
                if self.resolve(&target, *role).is_some() {
                    return Err(NavError::RedirectCycle { path, target });
                }
            }
        }
        Ok(())
    }
}

/// Every rule target and matcher must be an absolute path without empty
/// segments or a trailing slash.
fn validate_path(path: &str) -> Result<(), NavError> {
    if !path.starts_with('/') {
        return Err(NavError::invalid_pattern(path, "must start with '/'"));
    }
    if path.len() > 1 && path.ends_with('/') {
        return Err(NavError::invalid_pattern(path, "must not end with '/'"));
    }
    if path.contains("//") {
        return Err(NavError::invalid_pattern(path, "empty segment"));
    }
    if path.contains(['?', '#']) {
        return Err(NavError::invalid_pattern(path, "query or fragment not allowed"));
    }
    Ok(())
}

/// Split `"/a/b?x=1"` into `("/a/b", "?x=1")`.
pub(crate) fn split_suffix(path: &str) -> (&str, &str) {
    match path.find(['?', '#']) {
        Some(idx) => (&path[..idx], &path[idx..]),
        None => (path, ""),
    }
}

/// `"/a/b/"` -> `"/a/b"`; `"/"` stays `"/"`.
pub(crate) fn trim_trailing_slash(path: &str) -> &str {
    if path.len() > 1 {
        path.strip_suffix('/').unwrap_or(path)
    } else {
        path
    }
}

/// Remainder of `path` below `prefix`, if `prefix` ends on a segment
/// boundary. `("/c/jobs", "/c")` -> `Some("/jobs")`, `("/client", "/c")` -> `None`.
fn strip_segment_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RedirectTable {
        RedirectTable::builder("/login")
            .alias("/e/checkin", "/engineer/checkin")
            .role_scoped("ai")
            .role_scoped("profile")
            .prefix("/c", "/client")
            .prefix("/e", "/enterprise")
            .role_exception("/client/payments", Role::Engineer, "/engineer/payments")
            .build()
            .unwrap()
    }

    fn eff(role: Role) -> Option<EffectiveRole> {
        Some(EffectiveRole::from(role))
    }

    // ========================================================================
    // Fixed aliases
    // ========================================================================

    #[test]
    fn fixed_alias_ignores_role() {
        let t = table();
        assert_eq!(t.resolve("/e/checkin", None).as_deref(), Some("/engineer/checkin"));
        for role in Role::ALL {
            assert_eq!(
                t.resolve("/e/checkin", eff(role)).as_deref(),
                Some("/engineer/checkin")
            );
        }
    }

    #[test]
    fn fixed_alias_beats_prefix_rewrite() {
        // "/e/checkin" is also under the "/e" prefix.
        let t = table();
        assert_eq!(
            t.resolve("/e/checkin", eff(Role::Client)).as_deref(),
            Some("/engineer/checkin")
        );
        assert_eq!(
            t.resolve("/e/projects", eff(Role::Client)).as_deref(),
            Some("/enterprise/projects")
        );
    }

    #[test]
    fn fixed_alias_tolerates_trailing_slash() {
        assert_eq!(table().resolve("/e/checkin/", None).as_deref(), Some("/engineer/checkin"));
    }

    // ========================================================================
    // Role-scoped aliases
    // ========================================================================

    #[test]
    fn role_scoped_alias_follows_role() {
        let t = table();
        assert_eq!(t.resolve("/ai", eff(Role::Engineer)).as_deref(), Some("/engineer/ai"));
        assert_eq!(t.resolve("/ai", eff(Role::Client)).as_deref(), Some("/client/ai"));
        assert_eq!(t.resolve("/ai", eff(Role::Enterprise)).as_deref(), Some("/enterprise/ai"));
        assert_eq!(t.resolve("/profile", eff(Role::Admin)).as_deref(), Some("/admin/profile"));
    }

    #[test]
    fn role_scoped_alias_without_role_goes_to_sign_in() {
        let t = table();
        assert_eq!(t.resolve("/ai", None).as_deref(), Some("/login"));
        assert_eq!(t.resolve("/profile?tab=2", None).as_deref(), Some("/login"));
    }

    #[test]
    fn role_scoped_alias_keeps_query() {
        assert_eq!(
            table().resolve("/ai?tool=estimator", eff(Role::Client)).as_deref(),
            Some("/client/ai?tool=estimator")
        );
    }

    #[test]
    fn role_scoped_alias_is_exact() {
        let t = table();
        assert_eq!(t.resolve("/ai/tools", eff(Role::Client)), None);
        assert_eq!(t.resolve("/aim", eff(Role::Client)), None);
    }

    // ========================================================================
    // Prefix rewrites
    // ========================================================================

    #[test]
    fn prefix_rewrite_keeps_remainder() {
        let t = table();
        for role in [None, eff(Role::Engineer), eff(Role::Client)] {
            assert_eq!(t.resolve("/c/jobs/42", role).as_deref(), Some("/client/jobs/42"));
        }
        assert_eq!(t.resolve("/c", None).as_deref(), Some("/client"));
        assert_eq!(t.resolve("/c/jobs/42/", None).as_deref(), Some("/client/jobs/42/"));
        assert_eq!(
            t.resolve("/c/jobs?page=3#top", None).as_deref(),
            Some("/client/jobs?page=3#top")
        );
    }

    #[test]
    fn prefix_rewrite_respects_segment_boundary() {
        let t = table();
        assert_eq!(t.resolve("/client/jobs", eff(Role::Client)), None);
        assert_eq!(t.resolve("/cx/jobs", eff(Role::Client)), None);
        assert_eq!(t.resolve("/engineer/dashboard", eff(Role::Engineer)), None);
    }

    // ========================================================================
    // Role exception
    // ========================================================================

    #[test]
    fn exception_applies_to_engineer_only() {
        let t = table();
        assert_eq!(
            t.resolve("/client/payments", eff(Role::Engineer)).as_deref(),
            Some("/engineer/payments")
        );
        assert_eq!(t.resolve("/client/payments", eff(Role::Client)), None);
        assert_eq!(t.resolve("/client/payments", eff(Role::Enterprise)), None);
        assert_eq!(t.resolve("/client/payments", eff(Role::Admin)), None);
        assert_eq!(t.resolve("/client/payments", None), None);
    }

    // ========================================================================
    // Ordering and validation
    // ========================================================================

    #[test]
    fn tiers_sort_regardless_of_insertion_order() {
        let t = RedirectTable::builder("/login")
            .prefix("/c", "/client")
            .role_scoped("ai")
            .alias("/ai", "/engineer/ai")
            .build()
            .unwrap();
        let tiers: Vec<_> = t.rules().iter().map(|r| r.tier()).collect();
        assert_eq!(tiers, vec![RuleTier::Fixed, RuleTier::RoleScoped, RuleTier::PrefixRewrite]);

        // Fixed and role-scoped both match "/ai"; fixed runs first.
        assert_eq!(t.resolve("/ai", eff(Role::Client)).as_deref(), Some("/engineer/ai"));
        assert_eq!(t.resolve("/ai", None).as_deref(), Some("/engineer/ai"));
    }

    #[test]
    fn duplicate_matcher_in_one_tier_is_rejected() {
        let err = RedirectTable::builder("/login")
            .alias("/x", "/engineer/x")
            .alias("/x", "/client/x")
            .build()
            .unwrap_err();
        assert_eq!(err.error_code(), "AMBIGUOUS_RULE");
    }

    #[test]
    fn malformed_rules_are_rejected() {
        let cases = [
            RedirectTable::builder("/login").alias("x", "/engineer/x"),
            RedirectTable::builder("/login").alias("/x/", "/engineer/x"),
            RedirectTable::builder("/login").prefix("/", "/client"),
            RedirectTable::builder("/login").role_scoped("a/b"),
            RedirectTable::builder("/login").alias("/x", "/engineer//x"),
            RedirectTable::builder("login"),
        ];
        for builder in cases {
            assert_eq!(builder.build().unwrap_err().error_code(), "INVALID_PATTERN");
        }
    }

    #[test]
    fn alias_cycle_is_rejected() {
        let err = RedirectTable::builder("/login")
            .alias("/a", "/b")
            .alias("/b", "/a")
            .build()
            .unwrap_err();
        assert_eq!(err.error_code(), "REDIRECT_CYCLE");
    }

    #[test]
    fn cycle_through_one_role_is_rejected() {
        // Only engineers bounce between the exception and the prefix.
        let err = RedirectTable::builder("/login")
            .prefix("/c", "/client")
            .role_exception("/client/payments", Role::Engineer, "/c/payments")
            .build()
            .unwrap_err();
        assert!(matches!(err, NavError::RedirectCycle { .. }), "{err}");
    }

    #[test]
    fn self_rewrite_is_rejected() {
        let err = RedirectTable::builder("/login")
            .prefix("/x", "/x")
            .build()
            .unwrap_err();
        assert_eq!(err.error_code(), "REDIRECT_CYCLE");
    }

    #[test]
    fn alias_onto_the_sign_in_entry_must_settle() {
        let err = RedirectTable::builder("/login")
            .role_scoped("ai")
            .alias("/login", "/ai")
            .build()
            .unwrap_err();
        assert_eq!(err.error_code(), "REDIRECT_CYCLE");
    }

    #[test]
    fn unmatched_path_is_none() {
        let t = table();
        assert_eq!(t.resolve("/definitely/not/a/rule", eff(Role::Admin)), None);
        assert_eq!(t.resolve("/", None), None);
        assert_eq!(t.resolve("", None), None);
    }

    #[test]
    fn rewritten_paths_reach_the_role_exception() {
        let t = table();
        assert_eq!(
            t.resolve("/c/payments", eff(Role::Engineer)).as_deref(),
            Some("/engineer/payments")
        );
        assert_eq!(
            t.resolve("/c/payments", eff(Role::Client)).as_deref(),
            Some("/client/payments")
        );
    }

    #[test]
    fn resolve_is_idempotent_over_every_rule() {
        let t = table();
        let roles = [
            None,
            eff(Role::Engineer),
            eff(Role::Client),
            eff(Role::Enterprise),
            eff(Role::Admin),
        ];
        for rule in t.rules() {
            let path = rule.sample_path();
            for role in roles {
                if let Some(target) = t.resolve(&path, role) {
                    assert_eq!(t.resolve(&target, role), None, "{path} -> {target} for {role:?}");
                }
            }
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    #[test]
    fn split_suffix_cases() {
        assert_eq!(split_suffix("/a/b?x=1"), ("/a/b", "?x=1"));
        assert_eq!(split_suffix("/a#frag"), ("/a", "#frag"));
        assert_eq!(split_suffix("/a"), ("/a", ""));
    }

    #[test]
    fn strip_segment_prefix_cases() {
        assert_eq!(strip_segment_prefix("/c/jobs", "/c"), Some("/jobs"));
        assert_eq!(strip_segment_prefix("/c", "/c"), Some(""));
        assert_eq!(strip_segment_prefix("/client", "/c"), None);
        assert_eq!(strip_segment_prefix("/x/c", "/c"), None);
    }
}
