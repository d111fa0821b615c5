//! Session snapshots and the feed that publishes them.
//!
//! The navigation core never mutates a session. The external session store
//! publishes a fresh immutable [`Session`] into a [`SessionFeed`] whenever
//! anything changes; subscribers receive the new `Arc<Session>`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::NavError;
use crate::role::Role;

/// Opaque identity of a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub role: Role,
}

/// Read-only snapshot of the authentication state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default)]
    pub user: Option<UserId>,
    #[serde(default)]
    pub profile: Option<Profile>,
    #[serde(default)]
    pub is_loading: bool,
    #[serde(default)]
    pub is_initialized: bool,
}

/// What a session snapshot means for navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Not initialized yet, or a refresh is in flight.
    Pending,
    /// Initialized without a user or without a profile.
    Anonymous,
    /// A user with a profile role.
    SignedIn(Role),
}

impl Session {
    /// The store has not finished initializing.
    pub fn initializing() -> Self {
        Self {
            is_loading: true,
            ..Self::default()
        }
    }

    /// Initialized, nobody signed in.
    pub fn signed_out() -> Self {
        Self {
            is_initialized: true,
            ..Self::default()
        }
    }

    pub fn signed_in(user: &str, role: Role) -> Self {
        Self {
            user: Some(UserId::new(user)),
            profile: Some(Profile { role }),
            is_loading: false,
            is_initialized: true,
        }
    }

    /// Parse a snapshot handed over as JSON by the host.
    pub fn from_json(json: &str) -> Result<Self, NavError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn phase(&self) -> SessionPhase {
        if !self.is_initialized || self.is_loading {
            return SessionPhase::Pending;
        }
        match (&self.user, &self.profile) {
            (Some(_), Some(profile)) => SessionPhase::SignedIn(profile.role),
            _ => SessionPhase::Anonymous,
        }
    }
}

// ── SessionFeed ──

/// Handle for a feed subscription, returned by [`SessionFeed::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Callback invoked with each published snapshot.
pub type SessionHandler = Arc<dyn Fn(&Arc<Session>) + Send + Sync>;

#[derive(Clone)]
struct HandlerEntry {
    id: SubscriptionId,
    handler: SessionHandler,
}

/// Latest session snapshot plus change subscribers.
///
/// - `publish(session)` replaces the snapshot and notifies every subscriber.
/// - `current()` reads the snapshot (Arc clone).
/// - `subscribe(handler)` / `unsubscribe(id)` manage observers.
///
/// Handlers run synchronously on the publishing thread, in subscription
/// order, outside the feed's locks.
pub struct SessionFeed {
    current: RwLock<Arc<Session>>,
    handlers: RwLock<Vec<HandlerEntry>>,
    next_id: AtomicU64,
}

impl SessionFeed {
    /// A feed whose first snapshot is still initializing.
    pub fn new() -> Self {
        Self::with_session(Session::initializing())
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            current: RwLock::new(Arc::new(session)),
            handlers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Replace the snapshot and notify subscribers.
    pub fn publish(&self, session: Session) -> Arc<Session> {
        let session = Arc::new(session);
        {
            let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
            *current = Arc::clone(&session);
        }
        let entries: Vec<HandlerEntry> = self
            .handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        for entry in entries {
            (entry.handler)(&session);
        }
        session
    }

    pub fn current(&self) -> Arc<Session> {
        let current = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&current)
    }

    /// Register a handler for future snapshots. The current snapshot is not
    /// replayed; read it with [`current`](Self::current).
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&Arc<Session>) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let entry = HandlerEntry {
            id,
            handler: Arc::new(handler),
        };
        self.handlers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(entry);
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.handlers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|entry| entry.id != id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Default for SessionFeed {
    fn default() -> Self {
        Self::new()
    }
}
