//! Error boundary around the authorized route tree.
//!
//! A supervisor over fallible render steps: the first failure is captured as
//! a [`Fault`] and held until [`ErrorBoundary::reset`]. While tripped, the
//! boundary refuses to run further steps. There is no automatic retry.

use std::fmt;

use serde::Serialize;
use tracing::error;

use crate::error::NavError;
use crate::registry::ViewId;
use crate::suspense::RenderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// A mounted view failed during render or commit.
    Render,
    /// A view could not be loaded.
    Load,
    /// Redirect hops exceeded the configured limit.
    RedirectLoop,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FaultKind::Render => "render",
            FaultKind::Load => "load",
            FaultKind::RedirectLoop => "redirect_loop",
        })
    }
}

/// A captured failure, shown by the boundary's diagnostic screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fault {
    pub kind: FaultKind,
    /// Location being shown when the fault happened.
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<ViewId>,
    pub message: String,
}

impl Fault {
    pub fn render(location: &str, view: ViewId, err: &RenderError) -> Self {
        Self {
            kind: FaultKind::Render,
            location: location.to_string(),
            view: Some(view),
            message: err.to_string(),
        }
    }

    pub fn load(location: &str, view: ViewId, err: &NavError) -> Self {
        Self {
            kind: FaultKind::Load,
            location: location.to_string(),
            view: Some(view),
            message: err.to_string(),
        }
    }

    pub fn redirect_loop(location: &str, hops: &[String]) -> Self {
        Self {
            kind: FaultKind::RedirectLoop,
            location: location.to_string(),
            view: None,
            message: format!("too many redirects: {}", hops.join(" -> ")),
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} fault at {}: {}", self.kind, self.location, self.message)
    }
}

#[derive(Debug, Default)]
pub struct ErrorBoundary {
    fault: Option<Fault>,
    trips: u64,
}

impl ErrorBoundary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `step` unless the boundary is tripped. A failing step trips it.
    pub fn run<T>(&mut self, step: impl FnOnce() -> Result<T, Fault>) -> Result<T, Fault> {
        if let Some(fault) = &self.fault {
            return Err(fault.clone());
        }
        step().map_err(|fault| {
            self.capture(fault.clone());
            fault
        })
    }

    /// Hold `fault`. A boundary that is already tripped keeps its first fault.
    pub fn capture(&mut self, fault: Fault) -> &Fault {
        if self.fault.is_none() {
            self.trips += 1;
            error!(
                kind = %fault.kind,
                location = %fault.location,
                view = fault.view.as_ref().map(ViewId::as_str),
                message = %fault.message,
                "error boundary captured fault"
            );
        }
        self.fault.get_or_insert(fault)
    }

    pub fn fault(&self) -> Option<&Fault> {
        self.fault.as_ref()
    }

    pub fn is_tripped(&self) -> bool {
        self.fault.is_some()
    }

    /// Release the held fault so the next step runs again.
    pub fn reset(&mut self) -> Option<Fault> {
        self.fault.take()
    }

    /// How many faults were captured over the boundary's life.
    pub fn trips(&self) -> u64 {
        self.trips
    }
}
