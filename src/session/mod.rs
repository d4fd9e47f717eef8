//! Session lifecycle.
//!
//! The controller owns the one `SessionState` instance per client,
//! sequences handshake, store readiness, event wiring and readiness, then
//! stays passive apart from two lifetime watchers (page closed, page
//! navigated) and the connection-state policy.

mod auth;

pub use auth::{render_qr_ascii, HandshakeOutcome};
pub(crate) use auth::AuthenticationHandshake;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::{mpsc, RwLock};

use crate::bridge::{EventBridge, RawMutation};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::page::scripts::{self, callbacks};
use crate::page::{PageError, PageLifecycleEvent, RemoteExecutionPort};
use crate::types::{ClientInfo, ConnectionState, DisconnectReason, Event, EventSink};

const STORE_POLL_INTERVAL: Duration = Duration::from_millis(250);
const MUTATION_CHANNEL_CAPACITY: usize = 64;

/// Lifecycle state of a client session. Transitions are monotonic except
/// the AwaitingAuth token refresh and the drop to Disconnected.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Uninitialized,
    Launching,
    AwaitingAuth { qr_token: String, retry_count: u32 },
    Authenticated { credentials: Option<ClientInfo> },
    StoreReady,
    Ready,
    Disconnected { reason: DisconnectReason },
    Destroyed,
}

impl SessionState {
    fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Disconnected { .. } | SessionState::Destroyed
        )
    }
}

pub struct SessionController {
    config: ClientConfig,
    port: Arc<dyn RemoteExecutionPort>,
    sink: EventSink,
    state: Arc<RwLock<SessionState>>,
    info: RwLock<Option<ClientInfo>>,
    destroyed: AtomicBool,
}

impl SessionController {
    pub fn new(
        config: ClientConfig,
        port: Arc<dyn RemoteExecutionPort>,
        sink: EventSink,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            port,
            sink,
            state: Arc::new(RwLock::new(SessionState::Uninitialized)),
            info: RwLock::new(None),
            destroyed: AtomicBool::new(false),
        })
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> SessionState {
        self.state.read().await.clone()
    }

    /// Identity of the logged-in account, once Ready.
    pub async fn info(&self) -> Option<ClientInfo> {
        self.info.read().await.clone()
    }

    /// Drive the session to Ready.
    ///
    /// A QR retry exhaustion is a terminal disconnect plus teardown, not an
    /// error; everything else that goes wrong during startup is.
    pub async fn initialize(self: &Arc<Self>) -> Result<(), ClientError> {
        self.config.validate()?;
        self.set_state(SessionState::Launching).await;

        self.port
            .navigate(scripts::WEB_URL)
            .await
            .map_err(|e| ClientError::Initialization(e.to_string()))?;

        let handshake = AuthenticationHandshake::new(
            Arc::clone(&self.port),
            self.sink.clone(),
            Arc::clone(&self.state),
            &self.config,
        );

        let outcome = match handshake.run().await {
            Ok(outcome) => outcome,
            Err(err) if self.config.restart_on_auth_fail => {
                log::warn!("authentication race failed ({err}), restarting once");
                self.sink.emit(Event::AuthFailure(err.to_string()));
                self.port
                    .navigate(scripts::WEB_URL)
                    .await
                    .map_err(|e| ClientError::Initialization(e.to_string()))?;
                handshake.run().await.map_err(|err| {
                    self.sink.emit(Event::AuthFailure(err.to_string()));
                    err
                })?
            }
            Err(err) => {
                self.sink.emit(Event::AuthFailure(err.to_string()));
                return Err(err);
            }
        };

        if outcome == HandshakeOutcome::MaxRetriesReached {
            self.transition_disconnected(DisconnectReason::MaxQrRetries)
                .await;
            self.destroy().await?;
            return Ok(());
        }

        self.set_state(SessionState::Authenticated { credentials: None })
            .await;
        self.sink.emit(Event::Authenticated(None));

        self.wait_store_ready().await?;
        self.set_state(SessionState::StoreReady).await;

        self.install_bridge().await?;

        let info = self.fetch_runtime_info().await?;
        *self.info.write().await = Some(info);

        self.spawn_lifecycle_watcher();

        self.set_state(SessionState::Ready).await;
        self.sink.emit(Event::Ready);
        Ok(())
    }

    /// Poll until the remote store object graph reports ready.
    async fn wait_store_ready(&self) -> Result<(), ClientError> {
        loop {
            let ready = self
                .port
                .evaluate(scripts::STORE_READY, Value::Null)
                .await?;
            if ready.as_bool().unwrap_or(false) {
                return Ok(());
            }
            tokio::time::sleep(STORE_POLL_INTERVAL).await;
        }
    }

    /// Expose the mutation sink, register the in-page forwarders and spawn
    /// the consumer routing mutations to the bridge.
    async fn install_bridge(self: &Arc<Self>) -> Result<(), ClientError> {
        let (tx, mut rx) = mpsc::channel::<Value>(MUTATION_CHANNEL_CAPACITY);
        self.port
            .expose_function(callbacks::STORE_MUTATION, tx)
            .await?;
        self.port
            .evaluate(
                scripts::REGISTER_FORWARDERS,
                json!({ "disableMessageHistory": self.config.disable_message_history }),
            )
            .await?;

        let bridge = EventBridge::new(self.sink.clone());
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(payload) = rx.recv().await {
                match serde_json::from_value::<RawMutation>(payload) {
                    Ok(RawMutation::AppStateChanged { state }) => {
                        controller.handle_connection_state(state).await;
                    }
                    Ok(mutation) => bridge.dispatch(mutation),
                    Err(err) => log::debug!("dropping malformed store mutation: {err}"),
                }
            }
        });
        Ok(())
    }

    async fn fetch_runtime_info(&self) -> Result<ClientInfo, ClientError> {
        let raw = self
            .port
            .evaluate(scripts::RUNTIME_INFO, Value::Null)
            .await?;
        Ok(serde_json::from_value(raw)?)
    }

    /// Map a remote connection state into `change_state`, a takeover, or a
    /// disconnect.
    pub(crate) async fn handle_connection_state(self: &Arc<Self>, state: ConnectionState) {
        const ACCEPTED: [ConnectionState; 4] = [
            ConnectionState::Connected,
            ConnectionState::Opening,
            ConnectionState::Pairing,
            ConnectionState::Timeout,
        ];

        if state == ConnectionState::Conflict && self.config.takeover_on_conflict {
            self.sink.emit(Event::ChangeState(state));
            let controller = Arc::clone(self);
            let delay = Duration::from_millis(self.config.takeover_timeout_ms);
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                // Best effort: a lost takeover race must not kill the
                // session.
                if let Err(err) = controller
                    .port
                    .evaluate(scripts::TAKEOVER, Value::Null)
                    .await
                {
                    log::warn!("session takeover failed: {err}");
                }
            });
            return;
        }

        if ACCEPTED.contains(&state) {
            self.sink.emit(Event::ChangeState(state));
            return;
        }

        self.transition_disconnected(DisconnectReason::State(state))
            .await;
        if self.config.teardown_on_disconnect {
            if let Err(err) = self.destroy().await {
                log::warn!("teardown after disconnect failed: {err}");
            }
        }
    }

    /// Watch page-closed and navigation notifications for the lifetime of
    /// the session. Either unconditionally drops the session to
    /// Disconnected.
    fn spawn_lifecycle_watcher(self: &Arc<Self>) {
        let mut events = self.port.lifecycle_events();
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let reason = match event {
                    PageLifecycleEvent::Closed => DisconnectReason::PageClosed,
                    PageLifecycleEvent::Navigated(url) => {
                        log::info!("page navigated to {url}, treating as logout");
                        DisconnectReason::Navigation
                    }
                };
                let closed = reason == DisconnectReason::PageClosed;
                controller.transition_disconnected(reason).await;
                if controller.config.teardown_on_disconnect {
                    if let Err(err) = controller.destroy().await {
                        log::warn!("teardown after disconnect failed: {err}");
                    }
                }
                if closed {
                    break;
                }
            }
        });
    }

    /// Drop to Disconnected once; later reasons are ignored.
    async fn transition_disconnected(&self, reason: DisconnectReason) {
        {
            let mut state = self.state.write().await;
            if state.is_terminal() {
                return;
            }
            *state = SessionState::Disconnected {
                reason: reason.clone(),
            };
        }
        log::info!("session disconnected: {reason}");
        self.sink.emit(Event::Disconnected(reason));
    }

    /// Release the browser resource. Idempotent and safe to call from a
    /// disconnect handler.
    pub async fn destroy(&self) -> Result<(), ClientError> {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let result = self.port.close().await;
        *self.state.write().await = SessionState::Destroyed;
        match result {
            Ok(()) | Err(PageError::Closed) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Log out remotely, then remove this client's on-disk session data.
    pub async fn logout(&self) -> Result<(), ClientError> {
        self.port.evaluate(scripts::LOGOUT, Value::Null).await?;
        let dir = self.config.session_dir();
        if dir.exists() {
            tokio::fs::remove_dir_all(&dir).await?;
        }
        Ok(())
    }

    async fn set_state(&self, state: SessionState) {
        *self.state.write().await = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::fake::{FakePage, SelectorBehavior};
    use crate::page::scripts::selectors;
    use std::sync::Mutex;

    fn capture(sink: &EventSink) -> Arc<Mutex<Vec<Event>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&events);
        sink.on_event(move |event| captured.lock().unwrap().push(event));
        events
    }

    fn runtime_info() -> Value {
        json!({
            "pushname": "Ada",
            "wid": { "user": "123", "server": "c.us", "_serialized": "123@c.us" },
            "platform": "web"
        })
    }

    fn ready_page() -> Arc<FakePage> {
        let page = Arc::new(FakePage::new());
        page.script_selector(
            selectors::AUTHENTICATED_PANE,
            SelectorBehavior::AppearAfter(Duration::from_millis(1)),
        );
        page.push_eval_result("window.Store && window.Store.Msg", Value::from(true));
        page.push_eval_result("window.Store.Conn.pushname", runtime_info());
        page
    }

    #[tokio::test]
    async fn test_initialize_reaches_ready() {
        let page = ready_page();
        let sink = EventSink::new();
        let events = capture(&sink);
        let controller =
            SessionController::new(ClientConfig::default(), page.clone(), sink);

        controller.initialize().await.unwrap();

        assert_eq!(controller.state().await, SessionState::Ready);
        assert_eq!(controller.info().await.unwrap().pushname, "Ada");
        let events = events.lock().unwrap();
        assert!(events.contains(&Event::Authenticated(None)));
        assert_eq!(events.last(), Some(&Event::Ready));
        assert_eq!(page.navigations(), vec![scripts::WEB_URL.to_string()]);
        assert!(page.exposed(callbacks::STORE_MUTATION).is_some());
    }

    #[tokio::test]
    async fn test_auth_failure_without_restart_is_fatal() {
        let page = Arc::new(FakePage::new());
        let sink = EventSink::new();
        let events = capture(&sink);
        let config = ClientConfig::default().with_auth_timeout_ms(20);
        let controller = SessionController::new(config, page, sink);

        let err = controller.initialize().await.unwrap_err();
        assert!(matches!(err, ClientError::Initialization(_)));
        assert!(events
            .lock()
            .unwrap()
            .iter()
            .any(|event| matches!(event, Event::AuthFailure(_))));
    }

    #[tokio::test]
    async fn test_mutations_flow_through_bridge() {
        let page = ready_page();
        let sink = EventSink::new();
        let events = capture(&sink);
        let controller =
            SessionController::new(ClientConfig::default(), page.clone(), sink);
        controller.initialize().await.unwrap();

        let mutation_sink = page.exposed(callbacks::STORE_MUTATION).unwrap();
        mutation_sink
            .send(json!({
                "kind": "message_added",
                "message": {
                    "id": {
                        "fromMe": false,
                        "remote": "9@c.us",
                        "id": "M1",
                        "_serialized": "false_9@c.us_M1"
                    },
                    "type": "chat",
                    "body": "ping",
                    "isNewMsg": true
                }
            }))
            .await
            .unwrap();

        // The consumer task runs concurrently; give it a beat.
        tokio::time::sleep(Duration::from_millis(20)).await;
        let events = events.lock().unwrap();
        assert!(events
            .iter()
            .any(|event| matches!(event, Event::MessageCreate(_))));
        assert!(events.iter().any(|event| matches!(event, Event::Message(_))));
    }

    #[tokio::test]
    async fn test_connection_state_policy() {
        let page = ready_page();
        let sink = EventSink::new();
        let events = capture(&sink);
        let controller =
            SessionController::new(ClientConfig::default(), page.clone(), sink);
        controller.initialize().await.unwrap();

        controller
            .handle_connection_state(ConnectionState::Opening)
            .await;
        controller
            .handle_connection_state(ConnectionState::Unpaired)
            .await;

        let events = events.lock().unwrap();
        assert!(events.contains(&Event::ChangeState(ConnectionState::Opening)));
        assert!(events.contains(&Event::Disconnected(DisconnectReason::State(
            ConnectionState::Unpaired
        ))));
        drop(events);
        assert_eq!(
            controller.state().await,
            SessionState::Disconnected {
                reason: DisconnectReason::State(ConnectionState::Unpaired)
            }
        );
        // Default policy keeps the browser resource alive.
        assert!(!page.is_closed());
    }

    #[tokio::test]
    async fn test_conflict_with_takeover_issues_takeover() {
        let page = ready_page();
        let sink = EventSink::new();
        let events = capture(&sink);
        let config = ClientConfig::default()
            .with_takeover_on_conflict(true)
            .with_takeover_timeout_ms(5);
        let controller = SessionController::new(config, page.clone(), sink);
        controller.initialize().await.unwrap();

        controller
            .handle_connection_state(ConnectionState::Conflict)
            .await;
        tokio::time::sleep(Duration::from_millis(40)).await;

        assert!(page.evaluated("takeover"));
        let events = events.lock().unwrap();
        assert!(events.contains(&Event::ChangeState(ConnectionState::Conflict)));
        assert!(!events
            .iter()
            .any(|event| matches!(event, Event::Disconnected(_))));
    }

    #[tokio::test]
    async fn test_page_close_disconnects() {
        let page = ready_page();
        let sink = EventSink::new();
        let events = capture(&sink);
        let controller =
            SessionController::new(ClientConfig::default(), page.clone(), sink);
        controller.initialize().await.unwrap();

        page.emit_lifecycle(PageLifecycleEvent::Closed).await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(events
            .lock()
            .unwrap()
            .contains(&Event::Disconnected(DisconnectReason::PageClosed)));
    }

    #[tokio::test]
    async fn test_navigation_disconnects() {
        let page = ready_page();
        let sink = EventSink::new();
        let events = capture(&sink);
        let controller =
            SessionController::new(ClientConfig::default(), page.clone(), sink);
        controller.initialize().await.unwrap();

        page.emit_lifecycle(PageLifecycleEvent::Navigated(
            "https://web.whatsapp.com/logout".to_string(),
        ))
        .await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(events
            .lock()
            .unwrap()
            .contains(&Event::Disconnected(DisconnectReason::Navigation)));
    }

    #[tokio::test]
    async fn test_destroy_is_idempotent() {
        let page = ready_page();
        let controller =
            SessionController::new(ClientConfig::default(), page.clone(), EventSink::new());
        controller.destroy().await.unwrap();
        controller.destroy().await.unwrap();
        assert!(page.is_closed());
        assert_eq!(controller.state().await, SessionState::Destroyed);
    }

    #[tokio::test]
    async fn test_max_retries_disconnects_and_destroys() {
        let page = Arc::new(FakePage::new());
        page.script_selector(
            selectors::QR_CONTAINER,
            SelectorBehavior::AppearAfter(Duration::from_millis(1)),
        );
        let sink = EventSink::new();
        let events = capture(&sink);
        let config = ClientConfig::default().with_qr_max_retries(1);
        let controller = SessionController::new(config, page.clone(), sink);

        let feeder = {
            let page = Arc::clone(&page);
            tokio::spawn(async move {
                let sender = loop {
                    if let Some(sender) = page.exposed(callbacks::QR_CHANGED) {
                        break sender;
                    }
                    tokio::time::sleep(Duration::from_millis(2)).await;
                };
                let _ = sender.send(Value::from("token-1")).await;
                let _ = sender.send(Value::from("token-2")).await;
            })
        };

        controller.initialize().await.unwrap();
        feeder.await.unwrap();

        assert_eq!(controller.state().await, SessionState::Destroyed);
        assert!(page.is_closed());
        let events = events.lock().unwrap();
        let disconnects: Vec<_> = events
            .iter()
            .filter(|event| matches!(event, Event::Disconnected(_)))
            .collect();
        assert_eq!(disconnects.len(), 1);
        assert_eq!(
            *disconnects[0],
            Event::Disconnected(DisconnectReason::MaxQrRetries)
        );
    }
}
