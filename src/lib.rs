//! Waweb-rust: Browser-driven WhatsApp Web client
//!
//! A Rust client library that drives a real browser session loaded with the
//! WhatsApp Web client and mirrors its in-page state into a typed event
//! stream and command surface. The browser itself is an external
//! collaborator, consumed through the [`page::RemoteExecutionPort`]
//! capability trait.
//!
//! ## Modules
//!
//! - `types` - Core types like WId, messages, events and domain snapshots
//! - `page` - The evaluate/expose boundary to the controlled page
//! - `session` - Lifecycle state machine and authentication handshake
//! - `bridge` - Raw store mutations to canonical domain events
//! - `dispatch` - Outbound message content resolution and sending
//! - `client` - High-level client API
//! - `config` - Configuration management

pub mod page;
pub mod types;

mod bridge;
mod client;
mod config;
mod dispatch;
mod error;
mod session;

pub use bridge::{EventBridge, RawMutation, LAST_SEEN_CAPACITY};
pub use client::{Client, MAX_PINNED_CHATS};
pub use config::ClientConfig;
pub use dispatch::{
    Button, Buttons, ButtonsBody, List, ListRow, ListSection, Location, OutboundContent,
    OutboundMessageDispatcher, SendOptions,
};
pub use error::ClientError;
pub use session::{render_qr_ascii, HandshakeOutcome, SessionController, SessionState};

// Re-export the types host programs touch on every call.
pub use page::{PageError, PageLifecycleEvent, RemoteExecutionPort};
pub use types::{
    Call, Chat, ClientInfo, ConnectionState, Contact, CreateGroupResult, DisconnectReason, Event,
    EventSink, GroupNotification, GroupV4Invite, InviteInfo, Label, MediaAttachment, Message,
    MessageAck, MessageId, MessageType, SearchOptions, StickerTranscoder, TranscodeError, WId,
};
