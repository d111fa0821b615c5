use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::guard::{GuardState, Navigation, NavigationGuard, Outcome};
use crate::registry::ViewId;
use crate::session::{SessionFeed, SubscriptionId};
use crate::suspense::{preload, LoadTicket, RenderError};

/// Shell: wires a [`SessionFeed`] to a [`NavigationGuard`].
///
/// - Every snapshot published on the feed is pushed into the guard.
/// - `navigate(path)` / `reset()` / `report_fault(..)` forward to the guard.
/// - View loads the guard asks for are queued; `settle().await` drives
///   them and commits the results.
/// - `preload().await` installs every eager view up front.
///
/// # Examples
///
/// ```ignore
/// let feed = Arc::new(SessionFeed::new());
/// let shell = Shell::new(Arc::clone(&feed), guard);
///
/// feed.publish(Session::signed_in("u1", Role::Engineer));
/// shell.navigate("/e/checkin");
/// let outcome = shell.settle().await;
/// assert_eq!(outcome.location, "/engineer/checkin");
/// ```
pub struct Shell {
    feed: Arc<SessionFeed>,
    subscription: SubscriptionId,
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    guard: NavigationGuard,
    queue: VecDeque<LoadTicket>,
}

impl Inner {
    fn accept(&mut self, nav: Navigation) -> Outcome {
        if let Some(ticket) = nav.pending {
            self.queue.push_back(ticket);
        }
        nav.outcome
    }
}

impl Shell {
    /// Follow every snapshot published on `feed`, starting from the
    /// current one.
    pub fn new(feed: Arc<SessionFeed>, guard: NavigationGuard) -> Self {
        let inner = Arc::new(Mutex::new(Inner {
            guard,
            queue: VecDeque::new(),
        }));

        // Subscribed before the current snapshot is read, under the lock: a
        // publish racing this waits for the lock and is applied last.
        let subscription = {
            let mut locked = lock(&inner);
            let observer = Arc::clone(&inner);
            let subscription = feed.subscribe(move |session| {
                let mut locked = lock(&observer);
                let nav = locked.guard.apply_session(Arc::clone(session));
                locked.accept(nav);
            });
            let nav = locked.guard.apply_session(feed.current());
            locked.accept(nav);
            subscription
        };

        Self {
            feed,
            subscription,
            inner,
        }
    }

    // ====================================================================
    // Navigation
    // ====================================================================

    pub fn navigate(&self, path: &str) -> Outcome {
        let mut inner = lock(&self.inner);
        let nav = inner.guard.navigate(path);
        inner.accept(nav)
    }

    /// Manual reset action of the fault screen.
    pub fn reset(&self) -> Outcome {
        let mut inner = lock(&self.inner);
        let nav = inner.guard.reset();
        inner.accept(nav)
    }

    pub fn report_fault(&self, view: ViewId, err: RenderError) -> Outcome {
        let mut inner = lock(&self.inner);
        let nav = inner.guard.report_fault(view, err);
        inner.accept(nav)
    }

    // ====================================================================
    // Loading
    // ====================================================================

    /// Await every queued view load and commit it. Returns the outcome on
    /// screen once nothing is left to load.
    pub async fn settle(&self) -> Outcome {
        loop {
            let ticket = lock(&self.inner).queue.pop_front();
            let Some(ticket) = ticket else {
                break;
            };
            let loaded = ticket.wait().await;
            let mut inner = lock(&self.inner);
            if let Some(nav) = inner.guard.commit(loaded) {
                inner.accept(nav);
            }
        }
        self.current()
    }

    /// Resolve and install every eager view. Views that fail to load are
    /// skipped and fetched again on first navigation. Returns how many were
    /// installed.
    pub async fn preload(&self) -> usize {
        let (resolver, views) = {
            let inner = lock(&self.inner);
            (
                Arc::clone(inner.guard.resolver()),
                inner.guard.registry().eager_views(),
            )
        };
        let loaded = preload(resolver.as_ref(), &views).await;

        let mut inner = lock(&self.inner);
        let mut installed = 0;
        for (id, result) in loaded {
            match result {
                Ok(view) => {
                    inner.guard.install(id, view);
                    installed += 1;
                }
                Err(err) => warn!(view = %id, error = %err, "eager view failed to preload"),
            }
        }
        debug!(installed, requested = views.len(), "preloaded eager views");
        installed
    }

    // ====================================================================
    // State
    // ====================================================================

    pub fn current(&self) -> Outcome {
        lock(&self.inner).guard.outcome().clone()
    }

    pub fn state(&self) -> GuardState {
        lock(&self.inner).guard.state()
    }

    /// Number of view loads waiting for [`settle`](Self::settle).
    pub fn queued(&self) -> usize {
        lock(&self.inner).queue.len()
    }

    pub fn feed(&self) -> &Arc<SessionFeed> {
        &self.feed
    }
}

impl Drop for Shell {
    fn drop(&mut self) {
        self.feed.unsubscribe(self.subscription);
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(|e| e.into_inner())
}
