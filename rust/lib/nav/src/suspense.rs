//! Views, view loading and the suspense cache.
//!
//! The registry only names views. Turning a [`ViewId`] into something that
//! renders goes through a [`ViewResolver`], which may take time (deferred
//! views are fetched on first navigation). While a fetch is outstanding the
//! guard shows a route-level skeleton and hands the caller a [`LoadTicket`];
//! awaiting the ticket yields a [`LoadedView`] to commit back into the guard.
//!
//! Every load is stamped with the [`Epoch`] it started in. The guard bumps
//! its epoch whenever it leaves an authorized role, so a load that finishes
//! afterwards is recognised as stale and dropped.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::error::NavError;
use crate::pattern::RouteParams;
use crate::registry::{ViewId, ViewRef};

/// A boxed, `Send`-able future returned by view resolvers.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

// ── Views ──

/// Rendered output of a view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub body: String,
}

impl Page {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: String::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }
}

/// A failure raised while rendering a view.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("missing route parameter '{0}'")]
    MissingParam(String),

    #[error("{0}")]
    Failed(String),
}

/// A mounted page. Receives the route parameters and nothing else.
pub trait View: Send + Sync {
    fn render(&self, params: &RouteParams) -> Result<Page, RenderError>;
}

/// Closures implement View.
impl<F> View for F
where
    F: Fn(&RouteParams) -> Result<Page, RenderError> + Send + Sync,
{
    fn render(&self, params: &RouteParams) -> Result<Page, RenderError> {
        self(params)
    }
}

/// Renders the view id and its parameters. Stands in for real pages in
/// tooling and tests.
#[derive(Debug, Clone)]
pub struct PlaceholderView {
    id: ViewId,
}

impl PlaceholderView {
    pub fn new(id: ViewId) -> Self {
        Self { id }
    }
}

impl View for PlaceholderView {
    fn render(&self, params: &RouteParams) -> Result<Page, RenderError> {
        let body = params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(" ");
        Ok(Page::new(self.id.as_str()).with_body(body))
    }
}

// ── Resolution ──

/// Turns a view id into a view, possibly asynchronously.
pub trait ViewResolver: Send + Sync + 'static {
    fn resolve(&self, view: &ViewId) -> BoxFuture<Result<Arc<dyn View>, NavError>>;
}

/// A resolver over an in-memory table of views.
#[derive(Default, Clone)]
pub struct StaticViews {
    views: HashMap<ViewId, Arc<dyn View>>,
    placeholders: bool,
}

impl StaticViews {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve a [`PlaceholderView`] for every id not registered explicitly.
    pub fn placeholders() -> Self {
        Self {
            views: HashMap::new(),
            placeholders: true,
        }
    }

    pub fn with(mut self, id: &str, view: impl View + 'static) -> Self {
        self.insert(ViewId::from(id), Arc::new(view));
        self
    }

    pub fn insert(&mut self, id: ViewId, view: Arc<dyn View>) {
        self.views.insert(id, view);
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    fn lookup(&self, id: &ViewId) -> Result<Arc<dyn View>, NavError> {
        if let Some(view) = self.views.get(id) {
            return Ok(Arc::clone(view));
        }
        if self.placeholders {
            return Ok(Arc::new(PlaceholderView::new(id.clone())));
        }
        Err(NavError::ViewUnavailable {
            view: id.to_string(),
            reason: "not registered".into(),
        })
    }
}

impl ViewResolver for StaticViews {
    fn resolve(&self, view: &ViewId) -> BoxFuture<Result<Arc<dyn View>, NavError>> {
        let found = self.lookup(view);
        Box::pin(async move { found })
    }
}

// ── Epochs and tickets ──

/// Generation counter of the guard's authorized state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Epoch(u64);

impl Epoch {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An outstanding view load. Await it with [`wait`](Self::wait) and commit
/// the result back into the guard.
pub struct LoadTicket {
    view: ViewRef,
    epoch: Epoch,
    load: BoxFuture<Result<Arc<dyn View>, NavError>>,
}

impl LoadTicket {
    pub(crate) fn new(
        view: ViewRef,
        epoch: Epoch,
        load: BoxFuture<Result<Arc<dyn View>, NavError>>,
    ) -> Self {
        Self { view, epoch, load }
    }

    pub fn view(&self) -> &ViewRef {
        &self.view
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub async fn wait(self) -> LoadedView {
        let result = self.load.await;
        LoadedView {
            view: self.view.id,
            epoch: self.epoch,
            result,
        }
    }
}

impl fmt::Debug for LoadTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadTicket")
            .field("view", &self.view)
            .field("epoch", &self.epoch)
            .finish()
    }
}

/// A finished view load, ready to commit.
pub struct LoadedView {
    pub view: ViewId,
    pub epoch: Epoch,
    pub result: Result<Arc<dyn View>, NavError>,
}

impl fmt::Debug for LoadedView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedView")
            .field("view", &self.view)
            .field("epoch", &self.epoch)
            .field("ok", &self.result.is_ok())
            .finish()
    }
}

// ── Cache ──

/// Views that finished loading, plus the ids currently being fetched.
#[derive(Default)]
pub struct ViewCache {
    ready: HashMap<ViewId, Arc<dyn View>>,
    pending: HashSet<ViewId>,
}

impl ViewCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &ViewId) -> Option<Arc<dyn View>> {
        self.ready.get(id).cloned()
    }

    pub fn contains(&self, id: &ViewId) -> bool {
        self.ready.contains_key(id)
    }

    pub fn insert(&mut self, id: ViewId, view: Arc<dyn View>) {
        self.pending.remove(&id);
        self.ready.insert(id, view);
    }

    pub fn is_pending(&self, id: &ViewId) -> bool {
        self.pending.contains(id)
    }

    /// Returns false if a load for `id` is already outstanding.
    pub fn mark_pending(&mut self, id: ViewId) -> bool {
        self.pending.insert(id)
    }

    pub fn clear_pending(&mut self, id: &ViewId) {
        self.pending.remove(id);
    }

    /// Forget every outstanding load.
    pub fn abandon_pending(&mut self) -> usize {
        let n = self.pending.len();
        self.pending.clear();
        n
    }

    pub fn len(&self) -> usize {
        self.ready.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ready.is_empty()
    }
}

/// Resolve `views` one after another.
pub async fn preload(
    resolver: &dyn ViewResolver,
    views: &[ViewRef],
) -> Vec<(ViewId, Result<Arc<dyn View>, NavError>)> {
    let mut loaded = Vec::with_capacity(views.len());
    for view in views {
        let result = resolver.resolve(&view.id).await;
        loaded.push((view.id.clone(), result));
    }
    loaded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> RouteParams {
        pairs.iter().map(|(k, v)| (*k, *v)).collect()
    }

    // ========================================================================
    // Views
    // ========================================================================

    #[test]
    fn closure_views_render() {
        let view = |p: &RouteParams| match p.get("jobId") {
            Some(id) => Ok(Page::new(format!("job {id}"))),
            None => Err(RenderError::MissingParam("jobId".into())),
        };
        assert_eq!(view.render(&params(&[("jobId", "42")])).unwrap().title, "job 42");
        assert_eq!(
            view.render(&RouteParams::new()).unwrap_err(),
            RenderError::MissingParam("jobId".into())
        );
    }

    #[test]
    fn placeholder_lists_params() {
        let view = PlaceholderView::new(ViewId::from("engineer.job"));
        let page = view.render(&params(&[("jobId", "7")])).unwrap();
        assert_eq!(page.title, "engineer.job");
        assert_eq!(page.body, "jobId=7");
    }

    // ========================================================================
    // Resolvers
    // ========================================================================

    #[tokio::test]
    async fn static_views_resolve_registered_ids() {
        let views = StaticViews::new()
            .with("a", |_: &RouteParams| Ok::<_, RenderError>(Page::new("A")));
        let view = views.resolve(&ViewId::from("a")).await.unwrap();
        assert_eq!(view.render(&RouteParams::new()).unwrap().title, "A");
    }

    #[tokio::test]
    async fn static_views_reject_unknown_ids() {
        let views = StaticViews::new();
        let err = views.resolve(&ViewId::from("ghost")).await.err().unwrap();
        assert_eq!(err.error_code(), "VIEW_UNAVAILABLE");
    }

    #[tokio::test]
    async fn placeholder_resolver_serves_everything() {
        let views = StaticViews::placeholders();
        let view = views.resolve(&ViewId::from("any.view")).await.unwrap();
        assert_eq!(view.render(&RouteParams::new()).unwrap().title, "any.view");
    }

    #[tokio::test]
    async fn ticket_carries_view_and_epoch() {
        let views = StaticViews::placeholders();
        let view = ViewRef::deferred("ai.tools");
        let ticket =
            LoadTicket::new(view.clone(), Epoch::default().next(), views.resolve(&view.id));
        assert_eq!(ticket.epoch().value(), 1);

        let loaded = ticket.wait().await;
        assert_eq!(loaded.view, view.id);
        assert_eq!(loaded.epoch.value(), 1);
        assert!(loaded.result.is_ok());
    }

    #[tokio::test]
    async fn preload_reports_each_view() {
        let views = StaticViews::new()
            .with("a", |_: &RouteParams| Ok::<_, RenderError>(Page::new("A")));
        let loaded = preload(&views, &[ViewRef::eager("a"), ViewRef::eager("b")]).await;
        assert_eq!(loaded.len(), 2);
        assert!(loaded[0].1.is_ok());
        assert!(loaded[1].1.is_err());
    }

    // ========================================================================
    // Cache
    // ========================================================================

    #[test]
    fn insert_clears_pending() {
        let mut cache = ViewCache::new();
        let id = ViewId::from("a");
        assert!(cache.mark_pending(id.clone()));
        assert!(!cache.mark_pending(id.clone()));
        assert!(cache.is_pending(&id));

        cache.insert(id.clone(), Arc::new(PlaceholderView::new(id.clone())));
        assert!(!cache.is_pending(&id));
        assert!(cache.contains(&id));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn abandon_forgets_pending_only() {
        let mut cache = ViewCache::new();
        cache.insert(ViewId::from("a"), Arc::new(PlaceholderView::new(ViewId::from("a"))));
        cache.mark_pending(ViewId::from("b"));
        cache.mark_pending(ViewId::from("c"));

        assert_eq!(cache.abandon_pending(), 2);
        assert!(!cache.is_pending(&ViewId::from("b")));
        assert!(cache.contains(&ViewId::from("a")));
    }
}
