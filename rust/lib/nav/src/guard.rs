//! Navigation Guard: the state machine that decides what is on screen.
//!
//! ```text
//!   Loading ──session ready──▶ Unauthenticated
//!      ▲                            │
//!      │                       signed in
//!      │                            ▼
//!      └──────session refresh── Authorized(role) ──fault──▶ Errored(role)
//!                                   ▲                          │
//!                                   └────────── reset ─────────┘
//! ```
//!
//! Every evaluation runs the legacy translator before the route registry,
//! so a redirect always wins over a route match. Hops are recorded in
//! [`Outcome::redirected_from`] and bounded by
//! [`ShellConfig::max_redirects`]; a navigation that keeps bouncing trips
//! the error boundary.
//!
//! View loads started while authorized carry the current [`Epoch`]. Leaving
//! the role bumps it, so a load that resolves late is discarded by
//! [`NavigationGuard::commit`] instead of being mounted for the wrong role.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::boundary::{ErrorBoundary, Fault};
use crate::config::ShellConfig;
use crate::pattern::RouteParams;
use crate::redirect::{split_suffix, trim_trailing_slash, RedirectTable};
use crate::registry::{Resolution, RouteMatch, RouteRegistry, ViewId};
use crate::role::{effective_role, BaseRole, EffectiveRole, RolePolicy};
use crate::session::{Session, SessionPhase};
use crate::suspense::{
    Epoch, LoadTicket, LoadedView, Page, RenderError, View, ViewCache, ViewResolver,
};

// ── State ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "role", rename_all = "snake_case")]
pub enum GuardState {
    /// The session is not ready. Nothing is routed.
    Loading,
    /// No user or no profile. Everything leads to the sign-in entry.
    Unauthenticated,
    Authorized(EffectiveRole),
    /// The error boundary holds a fault for this role.
    Errored(EffectiveRole),
}

impl GuardState {
    /// Role of an authorized or errored guard.
    pub fn role(self) -> Option<EffectiveRole> {
        match self {
            GuardState::Authorized(role) | GuardState::Errored(role) => Some(role),
            GuardState::Loading | GuardState::Unauthenticated => None,
        }
    }
}

impl fmt::Display for GuardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuardState::Loading => f.write_str("loading"),
            GuardState::Unauthenticated => f.write_str("unauthenticated"),
            GuardState::Authorized(role) => write!(f, "authorized({role})"),
            GuardState::Errored(role) => write!(f, "errored({role})"),
        }
    }
}

/// What the shell renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "screen", rename_all = "snake_case")]
pub enum Screen {
    /// Session placeholder.
    Loading,
    /// The sign-in entry.
    SignIn,
    /// Route-level skeleton while a view loads.
    Skeleton { view: ViewId },
    View {
        view: ViewId,
        params: RouteParams,
        page: Page,
    },
    /// Diagnostic screen of the error boundary, with a reset action.
    Fault(Fault),
}

/// Result of one evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    /// Final location after every redirect hop.
    pub location: String,
    /// Locations redirected away from, in order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub redirected_from: Vec<String>,
    pub screen: Screen,
}

impl Outcome {
    fn at(location: &str, screen: Screen) -> Self {
        Self {
            location: location.to_string(),
            redirected_from: Vec::new(),
            screen,
        }
    }

    pub fn redirected(&self) -> bool {
        !self.redirected_from.is_empty()
    }
}

/// An outcome plus the view load it is waiting on, if any.
#[derive(Debug)]
pub struct Navigation {
    pub outcome: Outcome,
    pub pending: Option<LoadTicket>,
}

struct TranslateMemo {
    path: String,
    role: Option<EffectiveRole>,
    target: Option<String>,
}

// ── NavigationGuard ──

pub struct NavigationGuard {
    registry: Arc<RouteRegistry>,
    redirects: Arc<RedirectTable>,
    resolver: Arc<dyn ViewResolver>,
    policy: Arc<dyn RolePolicy>,
    max_redirects: usize,

    session: Arc<Session>,
    state: GuardState,
    location: String,
    epoch: Epoch,
    cache: ViewCache,
    boundary: ErrorBoundary,
    memo: Option<TranslateMemo>,
    outcome: Outcome,
}

impl NavigationGuard {
    /// A guard in the `Loading` state at `/`, using the identity role policy.
    pub fn new(
        registry: Arc<RouteRegistry>,
        redirects: Arc<RedirectTable>,
        resolver: Arc<dyn ViewResolver>,
    ) -> Self {
        Self {
            registry,
            redirects,
            resolver,
            policy: Arc::new(BaseRole),
            max_redirects: ShellConfig::default().max_redirects,
            session: Arc::new(Session::initializing()),
            state: GuardState::Loading,
            location: "/".to_string(),
            epoch: Epoch::default(),
            cache: ViewCache::new(),
            boundary: ErrorBoundary::new(),
            memo: None,
            outcome: Outcome::at("/", Screen::Loading),
        }
    }

    pub fn with_policy(mut self, policy: impl RolePolicy) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    pub fn with_config(mut self, config: &ShellConfig) -> Self {
        self.max_redirects = config.max_redirects;
        self
    }

    // ====================================================================
    // Inputs
    // ====================================================================

    /// Take a new session snapshot and re-evaluate the current location.
    pub fn apply_session(&mut self, session: Arc<Session>) -> Navigation {
        let next = self.state_for(&session);
        self.session = session;
        self.transition(next);
        self.evaluate()
    }

    /// Navigate to `path`.
    pub fn navigate(&mut self, path: &str) -> Navigation {
        self.location = path.to_string();
        self.evaluate()
    }

    /// Manual reset of the error boundary: `Errored(role)` goes back to
    /// `Authorized(role)` and the location is evaluated from scratch. The
    /// session is left alone.
    pub fn reset(&mut self) -> Navigation {
        if let GuardState::Errored(role) = self.state {
            if let Some(fault) = self.boundary.reset() {
                info!(kind = %fault.kind, location = %fault.location, "error boundary reset");
            }
            self.transition(GuardState::Authorized(role));
        }
        self.evaluate()
    }

    /// Apply a finished view load.
    ///
    /// Returns `None` when nothing on screen changes: the load belongs to an
    /// older epoch, or the view it brings is not the one being waited on.
    pub fn commit(&mut self, loaded: LoadedView) -> Option<Navigation> {
        if loaded.epoch != self.epoch {
            debug!(
                view = %loaded.view,
                load_epoch = %loaded.epoch,
                epoch = %self.epoch,
                "discarding stale view load"
            );
            return None;
        }
        self.cache.clear_pending(&loaded.view);

        let waiting = matches!(self.state, GuardState::Authorized(_))
            && matches!(&self.outcome.screen, Screen::Skeleton { view } if *view == loaded.view);

        match loaded.result {
            Ok(view) => self.cache.insert(loaded.view, view),
            Err(err) => {
                if !waiting {
                    warn!(view = %loaded.view, error = %err, "view load failed");
                    return None;
                }
                let fault = Fault::load(&self.location, loaded.view, &err);
                return Some(self.trip(fault));
            }
        }
        waiting.then(|| self.evaluate())
    }

    /// A mounted view failed after rendering, e.g. while committing.
    pub fn report_fault(&mut self, view: ViewId, err: RenderError) -> Navigation {
        if matches!(self.state, GuardState::Authorized(_)) {
            return self.trip(Fault::render(&self.location, view, &err));
        }
        debug!(view = %view, state = %self.state, "ignoring fault outside authorized state");
        self.evaluate()
    }

    /// Make `view` available without going through the resolver.
    pub fn install(&mut self, id: ViewId, view: Arc<dyn View>) {
        self.cache.insert(id, view);
    }

    // ====================================================================
    // Accessors
    // ====================================================================

    pub fn state(&self) -> GuardState {
        self.state
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Outcome of the latest evaluation.
    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    pub fn boundary(&self) -> &ErrorBoundary {
        &self.boundary
    }

    pub fn is_loaded(&self, id: &ViewId) -> bool {
        self.cache.contains(id)
    }

    pub fn registry(&self) -> &Arc<RouteRegistry> {
        &self.registry
    }

    pub fn resolver(&self) -> &Arc<dyn ViewResolver> {
        &self.resolver
    }

    // ====================================================================
    // Evaluation
    // ====================================================================

    fn state_for(&self, session: &Session) -> GuardState {
        match session.phase() {
            SessionPhase::Pending => GuardState::Loading,
            SessionPhase::Anonymous => GuardState::Unauthenticated,
            SessionPhase::SignedIn(role) => {
                let role = effective_role(role, self.policy.as_ref());
                // A refreshed snapshot for the same role does not clear a fault.
                match self.state {
                    GuardState::Errored(current) if current == role => GuardState::Errored(role),
                    _ => GuardState::Authorized(role),
                }
            }
        }
    }

    fn transition(&mut self, next: GuardState) {
        if self.state == next {
            return;
        }
        let leaving = self.state.role();
        if leaving.is_some() && leaving != next.role() {
            self.epoch = self.epoch.next();
            let abandoned = self.cache.abandon_pending();
            self.boundary.reset();
            debug!(epoch = %self.epoch, abandoned, "left authorized role");
        }
        info!(from = %self.state, to = %next, "guard transition");
        self.state = next;
    }

    fn evaluate(&mut self) -> Navigation {
        let (outcome, pending) = match self.state {
            GuardState::Loading => (Outcome::at(&self.location, Screen::Loading), None),
            GuardState::Unauthenticated => (self.evaluate_anonymous(), None),
            GuardState::Authorized(role) => self.evaluate_authorized(role),
            GuardState::Errored(role) => match self.boundary.fault() {
                Some(fault) => (Outcome::at(&self.location, Screen::Fault(fault.clone())), None),
                None => {
                    self.transition(GuardState::Authorized(role));
                    self.evaluate_authorized(role)
                }
            },
        };
        self.outcome = outcome.clone();
        Navigation { outcome, pending }
    }

    fn evaluate_anonymous(&mut self) -> Outcome {
        let entry = self.redirects.auth_entry().to_string();
        let mut location = self.location.clone();
        let mut hops = Vec::new();

        while trim_trailing_slash(split_suffix(&location).0) != entry {
            let next = match self.translate(&location, None) {
                Some(target) if hops.len() < self.max_redirects => target,
                _ => entry.clone(),
            };
            debug!(from = %location, to = %next, "redirect");
            hops.push(std::mem::replace(&mut location, next));
        }

        self.location = location.clone();
        Outcome {
            location,
            redirected_from: hops,
            screen: Screen::SignIn,
        }
    }

    fn evaluate_authorized(&mut self, role: EffectiveRole) -> (Outcome, Option<LoadTicket>) {
        let mut location = self.location.clone();
        let mut hops: Vec<String> = Vec::new();

        loop {
            let next = match self.translate(&location, Some(role)) {
                Some(target) => target,
                None => match self.registry.resolve(role, &location) {
                    Resolution::View(matched) => {
                        self.location = location.clone();
                        return self.mount(role, location, hops, matched);
                    }
                    Resolution::Redirect(target) | Resolution::Fallback(target) => target,
                },
            };

            if hops.len() >= self.max_redirects {
                hops.push(location);
                warn!(
                    role = %role,
                    hops = hops.len(),
                    limit = self.max_redirects,
                    "redirect limit exceeded"
                );
                let fault = Fault::redirect_loop(&self.location, &hops);
                let nav = self.trip(fault);
                return (nav.outcome, None);
            }
            debug!(from = %location, to = %next, role = %role, "redirect");
            hops.push(std::mem::replace(&mut location, next));
        }
    }

    /// Render a matched view, or start loading it.
    fn mount(
        &mut self,
        role: EffectiveRole,
        location: String,
        hops: Vec<String>,
        matched: RouteMatch,
    ) -> (Outcome, Option<LoadTicket>) {
        let RouteMatch { view, params, .. } = matched;
        let id = view.id.clone();

        if let Some(loaded) = self.cache.get(&id) {
            let rendered = self.boundary.run(|| {
                loaded
                    .render(&params)
                    .map_err(|err| Fault::render(&location, id.clone(), &err))
            });
            let screen = match rendered {
                Ok(page) => Screen::View {
                    view: id,
                    params,
                    page,
                },
                Err(fault) => {
                    self.transition(GuardState::Errored(role));
                    Screen::Fault(fault)
                }
            };
            let outcome = Outcome {
                location,
                redirected_from: hops,
                screen,
            };
            return (outcome, None);
        }

        let pending = if self.cache.mark_pending(id.clone()) {
            debug!(view = %id, load = ?view.load, epoch = %self.epoch, "loading view");
            let load = self.resolver.resolve(&id);
            Some(LoadTicket::new(view, self.epoch, load))
        } else {
            None
        };
        let outcome = Outcome {
            location,
            redirected_from: hops,
            screen: Screen::Skeleton { view: id },
        };
        (outcome, pending)
    }

    /// Capture `fault`, move to `Errored` and show the diagnostic screen.
    fn trip(&mut self, fault: Fault) -> Navigation {
        self.boundary.capture(fault);
        if let Some(role) = self.state.role() {
            self.transition(GuardState::Errored(role));
        }
        self.evaluate()
    }

    /// Legacy translation, memoized on the last `(path, role)` pair.
    fn translate(&mut self, path: &str, role: Option<EffectiveRole>) -> Option<String> {
        if let Some(memo) = &self.memo {
            if memo.path == path && memo.role == role {
                return memo.target.clone();
            }
        }
        let target = self.redirects.resolve(path, role);
        self.memo = Some(TranslateMemo {
            path: path.to_string(),
            role,
            target: target.clone(),
        });
        target
    }
}
