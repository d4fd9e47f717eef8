//! The evaluate/expose boundary to the controlled browser page.
//!
//! The browser process and page lifecycle are external collaborators; this
//! crate only ever talks to them through [`RemoteExecutionPort`]. Host
//! callbacks invoked from the page are message passing across an RPC
//! boundary, so exposure binds a channel sender rather than a closure.

pub mod scripts;

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors produced at the page boundary.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PageError {
    #[error("page closed")]
    Closed,
    #[error("wait for {selector:?} timed out after {timeout:?}")]
    Timeout {
        selector: String,
        timeout: Duration,
    },
    #[error("script evaluation failed: {0}")]
    Evaluation(String),
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error("failed to expose {0}")]
    Exposure(String),
}

/// Lifecycle notifications surfaced by the page.
#[derive(Debug, Clone, PartialEq)]
pub enum PageLifecycleEvent {
    /// The page or its browser was closed.
    Closed,
    /// The page navigated to a new URL on its own.
    Navigated(String),
}

/// Capability interface over the controlled page.
///
/// Every method is an independent asynchronous round trip; ordering between
/// overlapping invocations is not guaranteed unless the caller serializes
/// them. `close` transitively rejects outstanding round trips with
/// [`PageError::Closed`].
#[async_trait]
pub trait RemoteExecutionPort: Send + Sync {
    /// Drive the page to a URL.
    async fn navigate(&self, url: &str) -> Result<(), PageError>;

    /// Run a script in the page context with serializable args and return
    /// its serializable result.
    async fn evaluate(&self, script: &str, args: Value) -> Result<Value, PageError>;

    /// Bind a host-side sink so the page can invoke `name(payload)`.
    /// Deliveries are fire-and-forget; the page never awaits a result.
    async fn expose_function(
        &self,
        name: &str,
        sink: mpsc::Sender<Value>,
    ) -> Result<(), PageError>;

    /// Resolve once a DOM marker appears. Waits forever when `timeout` is
    /// `None`.
    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Option<Duration>,
    ) -> Result<(), PageError>;

    /// Stream of page-closed and navigation notifications.
    fn lifecycle_events(&self) -> mpsc::Receiver<PageLifecycleEvent>;

    /// Release the underlying browser resource.
    async fn close(&self) -> Result<(), PageError>;
}
