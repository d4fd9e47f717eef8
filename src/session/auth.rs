//! Authentication handshake.
//!
//! Races the authenticated-UI marker against the QR marker under the
//! configured budget, then drives the QR token/refresh flow until the
//! authenticated UI appears or retries run out.

use std::sync::Arc;
use std::time::Duration;

use qrcode::{render::unicode, QrCode};
use serde_json::Value;
use tokio::sync::{mpsc, RwLock};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::page::scripts::{self, callbacks, selectors};
use crate::page::{PageError, RemoteExecutionPort};
use crate::session::SessionState;
use crate::types::{Event, EventSink};

const QR_CHANNEL_CAPACITY: usize = 8;

/// Terminal outcome of the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeOutcome {
    /// The authenticated UI was already present.
    AlreadyAuthenticated,
    /// A QR token was scanned and the authenticated UI appeared.
    Authenticated,
    /// The configured retry budget was exhausted before a scan.
    /// Not an error: the caller disconnects and tears down.
    MaxRetriesReached,
}

pub(crate) struct AuthenticationHandshake {
    port: Arc<dyn RemoteExecutionPort>,
    sink: EventSink,
    state: Arc<RwLock<SessionState>>,
    auth_timeout: Option<Duration>,
    qr_max_retries: u32,
}

impl AuthenticationHandshake {
    pub fn new(
        port: Arc<dyn RemoteExecutionPort>,
        sink: EventSink,
        state: Arc<RwLock<SessionState>>,
        config: &ClientConfig,
    ) -> Self {
        let auth_timeout = match config.auth_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };
        Self {
            port,
            sink,
            state,
            auth_timeout,
            qr_max_retries: config.qr_max_retries,
        }
    }

    /// Run the handshake to a terminal outcome. Any error during the race
    /// is fatal to initialization.
    pub async fn run(&self) -> Result<HandshakeOutcome, ClientError> {
        let mut authenticated = self
            .port
            .wait_for_selector(selectors::AUTHENTICATED_PANE, self.auth_timeout);
        let mut qr = self
            .port
            .wait_for_selector(selectors::QR_CONTAINER, self.auth_timeout);

        // First marker to resolve wins; the loser is dropped. A winner that
        // resolved to an error aborts initialization.
        let needs_qr = tokio::select! {
            result = &mut authenticated => {
                result.map_err(race_error)?;
                false
            }
            result = &mut qr => {
                result.map_err(race_error)?;
                true
            }
        };

        if !needs_qr {
            log::info!("authenticated session restored, no QR scan needed");
            return Ok(HandshakeOutcome::AlreadyAuthenticated);
        }
        self.qr_flow().await
    }

    /// Consume QR tokens until the authenticated UI appears (scanning is
    /// human-paced, so that wait is unbounded) or retries run out.
    async fn qr_flow(&self) -> Result<HandshakeOutcome, ClientError> {
        let (token_tx, mut token_rx) = mpsc::channel::<Value>(QR_CHANNEL_CAPACITY);
        self.port
            .expose_function(callbacks::QR_CHANGED, token_tx)
            .await
            .map_err(race_error)?;
        self.port
            .evaluate(scripts::OBSERVE_QR, Value::Null)
            .await
            .map_err(race_error)?;

        let mut retries: u32 = 0;
        let mut authenticated = self
            .port
            .wait_for_selector(selectors::AUTHENTICATED_PANE, None);

        loop {
            tokio::select! {
                result = &mut authenticated => {
                    result.map_err(race_error)?;
                    log::info!("QR scan confirmed after {retries} token deliveries");
                    return Ok(HandshakeOutcome::Authenticated);
                }
                delivery = token_rx.recv() => {
                    let Some(payload) = delivery else {
                        return Err(ClientError::Initialization(
                            "QR token channel closed by the page".to_string(),
                        ));
                    };
                    let token = payload.as_str().unwrap_or_default().to_string();
                    retries += 1;
                    *self.state.write().await = SessionState::AwaitingAuth {
                        qr_token: token.clone(),
                        retry_count: retries,
                    };
                    self.sink.emit(Event::Qr(token));
                    if self.qr_max_retries > 0 && retries > self.qr_max_retries {
                        log::warn!(
                            "QR retry budget of {} exhausted",
                            self.qr_max_retries
                        );
                        return Ok(HandshakeOutcome::MaxRetriesReached);
                    }
                }
            }
        }
    }
}

fn race_error(err: PageError) -> ClientError {
    ClientError::Initialization(err.to_string())
}

/// Render a QR token as a unicode block image for terminal display.
pub fn render_qr_ascii(data: &str) -> Result<String, ClientError> {
    let code = QrCode::new(data.as_bytes())
        .map_err(|e| ClientError::Validation(format!("QR generation failed: {e}")))?;
    let image = code
        .render::<unicode::Dense1x2>()
        .dark_color(unicode::Dense1x2::Light)
        .light_color(unicode::Dense1x2::Dark)
        .build();
    Ok(image)
}
