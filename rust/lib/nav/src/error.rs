use thiserror::Error;

use crate::role::Role;

// ── Error codes ─────────────────────────────────────────────────────
//
// Stable identifiers for tooling and logs. Match on these, never on the
// message text.

/// Stable error code constants.
pub mod error_code {
    pub const INVALID_PATTERN: &str = "INVALID_PATTERN";
    pub const DUPLICATE_SEGMENT: &str = "DUPLICATE_SEGMENT";
    pub const DUPLICATE_PATTERN: &str = "DUPLICATE_PATTERN";
    pub const MISSING_SUBTREE: &str = "MISSING_SUBTREE";
    pub const MISSING_INDEX: &str = "MISSING_INDEX";
    pub const DANGLING_INDEX: &str = "DANGLING_INDEX";
    pub const DANGLING_LANDING: &str = "DANGLING_LANDING";
    pub const DANGLING_REDIRECT: &str = "DANGLING_REDIRECT";
    pub const AMBIGUOUS_RULE: &str = "AMBIGUOUS_RULE";
    pub const REDIRECT_CYCLE: &str = "REDIRECT_CYCLE";
    pub const VIEW_UNAVAILABLE: &str = "VIEW_UNAVAILABLE";
    pub const UNKNOWN_ROLE: &str = "UNKNOWN_ROLE";
    pub const CONFIG: &str = "CONFIG";
}

// ── NavError ────────────────────────────────────────────────────────

/// Errors raised while building route tables, loading views or reading
/// configuration.
///
/// Routing outcomes themselves (no legacy rule matched, no session) are
/// plain values and never show up here.
#[derive(Error, Debug)]
pub enum NavError {
    /// A route or redirect pattern could not be parsed.
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Two children of the same node share a path.
    #[error("duplicate route segment '{segment}' under '{parent}'")]
    DuplicateSegment { parent: String, segment: String },

    /// Two routes in one subtree compile to the same pattern.
    #[error("route pattern '{0}' is registered twice")]
    DuplicatePattern(String),

    /// A role has no subtree mounted.
    #[error("no route subtree registered for role {0}")]
    MissingSubtree(Role),

    /// A role subtree root has no index redirect.
    #[error("route subtree for role {0} has no index redirect")]
    MissingIndex(Role),

    /// An index redirect points at a path that renders nothing.
    #[error("index redirect '{target}' for role {role} does not reach a view")]
    DanglingIndex { role: Role, target: String },

    /// A landing page is not served by the role's own subtree.
    #[error("landing page '{path}' for role {role} does not reach a view")]
    DanglingLanding { role: Role, path: String },

    /// A redirect into the caller's own subtree reaches no route.
    #[error("redirect target '{target}' for role {role} reaches no route")]
    DanglingRedirect { role: Role, target: String },

    /// Two redirect rules of the same tier share a matcher.
    #[error("redirect rule '{0}' is declared twice in the same tier")]
    AmbiguousRule(String),

    /// A translated path is matched by a rule again.
    #[error("redirect '{path}' -> '{target}' does not settle: '{target}' redirects again")]
    RedirectCycle { path: String, target: String },

    /// A view resolver could not produce a view.
    #[error("view '{view}' unavailable: {reason}")]
    ViewUnavailable { view: String, reason: String },

    /// A role name outside the four known roles.
    #[error("unknown role '{0}'")]
    UnknownRole(String),

    /// Configuration could not be read or parsed.
    #[error("config: {0}")]
    Config(String),
}

impl NavError {
    /// Stable, machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            NavError::InvalidPattern { .. } => error_code::INVALID_PATTERN,
            NavError::DuplicateSegment { .. } => error_code::DUPLICATE_SEGMENT,
            NavError::DuplicatePattern(_) => error_code::DUPLICATE_PATTERN,
            NavError::MissingSubtree(_) => error_code::MISSING_SUBTREE,
            NavError::MissingIndex(_) => error_code::MISSING_INDEX,
            NavError::DanglingIndex { .. } => error_code::DANGLING_INDEX,
            NavError::DanglingLanding { .. } => error_code::DANGLING_LANDING,
            NavError::DanglingRedirect { .. } => error_code::DANGLING_REDIRECT,
            NavError::AmbiguousRule(_) => error_code::AMBIGUOUS_RULE,
            NavError::RedirectCycle { .. } => error_code::REDIRECT_CYCLE,
            NavError::ViewUnavailable { .. } => error_code::VIEW_UNAVAILABLE,
            NavError::UnknownRole(_) => error_code::UNKNOWN_ROLE,
            NavError::Config(_) => error_code::CONFIG,
        }
    }

    pub(crate) fn invalid_pattern(pattern: &str, reason: impl Into<String>) -> Self {
        NavError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<toml::de::Error> for NavError {
    fn from(err: toml::de::Error) -> Self {
        NavError::Config(err.to_string())
    }
}

impl From<std::io::Error> for NavError {
    fn from(err: std::io::Error) -> Self {
        NavError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for NavError {
    fn from(err: serde_json::Error) -> Self {
        NavError::Config(err.to_string())
    }
}
