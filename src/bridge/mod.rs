//! Bridge from raw store mutations to canonical domain events.
//!
//! The remote context forwards every store mutation as a tagged record
//! through one exposed host function. Each entry point here is
//! synchronous-in, fire-and-forget-out; the remote side never awaits a
//! result. The bridge holds no state beyond the bounded last-seen cache.

mod cache;

use serde::Deserialize;

use crate::types::{
    Call, ConnectionState, Event, EventSink, GroupNotification, Message, MessageAck, MessageType,
};
use cache::LastSeenMessageCache;

/// Capacity of the last-seen message cache.
pub const LAST_SEEN_CAPACITY: usize = 64;

/// One raw mutation notification, as forwarded by the remote context.
/// Ephemeral; consumed immediately and never stored.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawMutation {
    MessageAdded { message: Message },
    MessageChanged { message: Message },
    MessageTypeChanged { message: Message },
    MessageAckChanged { message: Message, ack: MessageAck },
    MessageMediaUploaded { message: Message, unsent: bool },
    MessageRemoved { message: Message },
    AppStateChanged { state: ConnectionState },
    CallAdded { call: Call },
}

pub struct EventBridge {
    sink: EventSink,
    last_seen: LastSeenMessageCache,
}

impl EventBridge {
    pub fn new(sink: EventSink) -> Self {
        Self {
            sink,
            last_seen: LastSeenMessageCache::new(LAST_SEEN_CAPACITY),
        }
    }

    /// Route a raw mutation to its handler. App-state changes are owned by
    /// the session controller and only logged here.
    pub fn dispatch(&self, mutation: RawMutation) {
        match mutation {
            RawMutation::MessageAdded { message } => self.handle_message_added(message),
            RawMutation::MessageChanged { message } => self.handle_message_changed(message),
            RawMutation::MessageTypeChanged { message } => {
                self.handle_message_type_changed(message)
            }
            RawMutation::MessageAckChanged { message, ack } => {
                self.handle_message_ack_changed(message, ack)
            }
            RawMutation::MessageMediaUploaded { message, unsent } => {
                self.handle_media_uploaded(message, unsent)
            }
            RawMutation::MessageRemoved { message } => self.handle_message_removed(message),
            RawMutation::CallAdded { call } => self.handle_call_added(call),
            RawMutation::AppStateChanged { state } => {
                log::debug!("app state change {state} reached the bridge unrouted");
            }
        }
    }

    /// New record in the store. Stale records are dropped; group
    /// notifications classify into exactly one group event and never a
    /// message event.
    pub fn handle_message_added(&self, message: Message) {
        if !message.is_new_msg {
            return;
        }
        if message.is_group_notification() {
            let notification = GroupNotification::from_message(&message);
            let event = match notification.subtype.as_str() {
                "add" | "invite" => Event::GroupJoin(notification),
                "remove" | "leave" => Event::GroupLeave(notification),
                _ => Event::GroupUpdate(notification),
            };
            self.sink.emit(event);
            return;
        }
        let from_me = message.from_me();
        self.sink.emit(Event::MessageCreate(message.clone()));
        if !from_me {
            self.sink.emit(Event::Message(message));
        }
    }

    /// Generic change. Remembers the record as the pre-revoke content for
    /// its identity; the store fires this before the type-specific revoke
    /// for the same edit.
    pub fn handle_message_changed(&self, message: Message) {
        if message.kind != MessageType::Revoked {
            self.last_seen.store(message);
        }
    }

    /// Type change. Only the transition to "revoked" is observable; the
    /// cached pre-revoke record is attached when the identity matches.
    pub fn handle_message_type_changed(&self, message: Message) {
        if message.kind != MessageType::Revoked {
            return;
        }
        let revoked = self.last_seen.get(&message.id.serialized);
        self.sink.emit(Event::MessageRevokeEveryone { message, revoked });
    }

    pub fn handle_message_ack_changed(&self, message: Message, ack: MessageAck) {
        self.sink.emit(Event::MessageAck { message, ack });
    }

    /// Upload completion is only meaningful for own messages that have left
    /// the unsent state.
    pub fn handle_media_uploaded(&self, message: Message, unsent: bool) {
        if message.from_me() && !unsent {
            self.sink.emit(Event::MediaUploaded(message));
        }
    }

    pub fn handle_message_removed(&self, message: Message) {
        if message.is_new_msg {
            self.sink.emit(Event::MessageRevokeMe(message));
        }
    }

    pub fn handle_call_added(&self, call: Call) {
        self.sink.emit(Event::IncomingCall(call));
    }
}
