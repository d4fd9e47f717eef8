//! Canonical domain events emitted by the client.
//!
//! Each event carries an independent snapshot, never a live reference into
//! remote state.

use std::fmt;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::types::{Call, ClientInfo, GroupNotification, Message, MessageAck};

/// Connection states reported by the remote app-state model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    Conflict,
    Connected,
    DeprecatedVersion,
    Opening,
    Pairing,
    Proxyblock,
    SmbTosBlock,
    Timeout,
    TosBlock,
    Unlaunched,
    Unpaired,
    UnpairedIdle,
    #[serde(other)]
    Unknown,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Conflict => "CONFLICT",
            ConnectionState::Connected => "CONNECTED",
            ConnectionState::DeprecatedVersion => "DEPRECATED_VERSION",
            ConnectionState::Opening => "OPENING",
            ConnectionState::Pairing => "PAIRING",
            ConnectionState::Proxyblock => "PROXYBLOCK",
            ConnectionState::SmbTosBlock => "SMB_TOS_BLOCK",
            ConnectionState::Timeout => "TIMEOUT",
            ConnectionState::TosBlock => "TOS_BLOCK",
            ConnectionState::Unlaunched => "UNLAUNCHED",
            ConnectionState::Unpaired => "UNPAIRED",
            ConnectionState::UnpairedIdle => "UNPAIRED_IDLE",
            ConnectionState::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why the session dropped to Disconnected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The remote connection state left the accepted set.
    State(ConnectionState),
    /// The page navigated away; the remote client reloads itself on real
    /// logout, so navigation during active use is an implicit logout.
    Navigation,
    /// QR retries exhausted.
    MaxQrRetries,
    /// The page or browser was closed.
    PageClosed,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::State(state) => write!(f, "{}", state.as_str()),
            DisconnectReason::Navigation => write!(f, "NAVIGATION"),
            DisconnectReason::MaxQrRetries => write!(f, "max retries reached"),
            DisconnectReason::PageClosed => write!(f, "page closed"),
        }
    }
}

/// All events the client can emit.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A QR token to present for scanning.
    Qr(String),
    /// Authentication confirmed; a credentials snapshot when one exists.
    Authenticated(Option<ClientInfo>),
    /// The authentication race failed.
    AuthFailure(String),
    /// The session is fully wired and usable.
    Ready,
    /// A message arrived from another account.
    Message(Message),
    /// A message record was created, own messages included.
    MessageCreate(Message),
    /// A message's acknowledgment level changed.
    MessageAck { message: Message, ack: MessageAck },
    /// A message was deleted for this client only.
    MessageRevokeMe(Message),
    /// A message was deleted for everyone; the pre-revoke record when the
    /// bridge still had it cached.
    MessageRevokeEveryone {
        message: Message,
        revoked: Option<Message>,
    },
    /// Media belonging to an own message finished uploading.
    MediaUploaded(Message),
    GroupJoin(GroupNotification),
    GroupLeave(GroupNotification),
    GroupUpdate(GroupNotification),
    /// The remote connection state changed within the accepted set.
    ChangeState(ConnectionState),
    Disconnected(DisconnectReason),
    IncomingCall(Call),
}

/// Event handler type.
pub type EventHandler = Box<dyn Fn(Event) + Send + Sync>;

/// Registry fanning events out to host handlers.
///
/// Clones share the same handler list, so every subsystem holding a sink
/// feeds the same public stream.
#[derive(Clone, Default)]
pub struct EventSink {
    handlers: Arc<RwLock<Vec<EventHandler>>>,
}

impl EventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an event handler.
    pub fn on_event<F>(&self, handler: F)
    where
        F: Fn(Event) + Send + Sync + 'static,
    {
        if let Ok(mut handlers) = self.handlers.write() {
            handlers.push(Box::new(handler));
        }
    }

    /// Emit an event to all handlers.
    pub fn emit(&self, event: Event) {
        let Ok(handlers) = self.handlers.read() else {
            return;
        };
        for handler in handlers.iter() {
            handler(event.clone());
        }
    }
}
