//! Portal navigation: role-based route resolution and access control.
//!
//! Decides, for an immutable session snapshot and a requested path, what the
//! marketplace front end shows: a loading placeholder, the sign-in entry, a
//! role's page, a skeleton while that page loads, or the error boundary's
//! fault screen.
//!
//! # Layers
//!
//! - [`role`]: roles and effective-role computation
//! - [`redirect`]: legacy path translator, an ordered table of rules
//! - [`landing`]: landing page per role
//! - [`registry`]: per-role route subtrees, compiled into pattern tries
//! - [`guard`]: the `Loading | Unauthenticated | Authorized | Errored`
//!   state machine, with [`suspense`] for view loading and [`boundary`]
//!   for fault capture
//! - [`shell`]: wires a [`SessionFeed`] to a guard
//!
//! # Example
//!
//! ```ignore
//! use portal_nav::*;
//!
//! let config = ShellConfig::default();
//! let guard = NavigationGuard::new(
//!     Arc::new(catalog::default_registry()?),
//!     Arc::new(catalog::default_redirects(&config)?),
//!     Arc::new(StaticViews::placeholders()),
//! )
//! .with_config(&config);
//!
//! let feed = Arc::new(SessionFeed::new());
//! let shell = Shell::new(Arc::clone(&feed), guard);
//! feed.publish(Session::signed_in("u1", Role::Engineer));
//!
//! shell.navigate("/e/checkin");
//! let outcome = shell.settle().await;
//! assert_eq!(outcome.location, "/engineer/checkin");
//! ```

pub mod boundary;
pub mod catalog;
pub mod config;
pub mod error;
pub mod guard;
pub mod landing;
pub mod pattern;
pub mod redirect;
pub mod registry;
pub mod role;
pub mod session;
pub mod shell;
pub mod suspense;

// Re-export primary types at crate root.
pub use boundary::{ErrorBoundary, Fault, FaultKind};
pub use config::ShellConfig;
pub use error::{error_code, NavError};
pub use guard::{GuardState, Navigation, NavigationGuard, Outcome, Screen};
pub use landing::landing_page;
pub use pattern::RouteParams;
pub use redirect::{RedirectRule, RedirectTable, RuleTier};
pub use registry::{
    LoadStrategy, Resolution, RouteEntry, RouteMatch, RouteNode, RouteRegistry, ViewId, ViewRef,
    FORBIDDEN_PATH,
};
pub use role::{effective_role, role_base, BaseRole, EffectiveRole, Role, RolePolicy};
pub use session::{Profile, Session, SessionFeed, SessionPhase, SubscriptionId, UserId};
pub use shell::Shell;
pub use suspense::{
    BoxFuture, Epoch, LoadTicket, LoadedView, Page, PlaceholderView, RenderError, StaticViews,
    View, ViewResolver,
};
