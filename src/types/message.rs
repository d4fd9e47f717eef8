//! Message snapshots mirrored from the remote store.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::types::WId;

/// Identity of a message in the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageId {
    /// Whether the message originates from the client's own account.
    pub from_me: bool,
    /// Serialized id of the chat the message lives in.
    pub remote: String,
    /// Store-assigned unique part.
    pub id: String,
    #[serde(rename = "_serialized")]
    pub serialized: String,
}

impl MessageId {
    pub fn new(from_me: bool, remote: impl Into<String>, id: impl Into<String>) -> Self {
        let remote = remote.into();
        let id = id.into();
        let serialized = format!("{}_{}_{}", from_me, remote, id);
        Self {
            from_me,
            remote,
            id,
            serialized,
        }
    }
}

/// Delivery/read acknowledgment stage of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum MessageAck {
    Error,
    #[default]
    Pending,
    Server,
    Device,
    Read,
    Played,
}

impl From<i32> for MessageAck {
    fn from(raw: i32) -> Self {
        match raw {
            -1 => MessageAck::Error,
            1 => MessageAck::Server,
            2 => MessageAck::Device,
            3 => MessageAck::Read,
            4 => MessageAck::Played,
            _ => MessageAck::Pending,
        }
    }
}

impl From<MessageAck> for i32 {
    fn from(ack: MessageAck) -> Self {
        match ack {
            MessageAck::Error => -1,
            MessageAck::Pending => 0,
            MessageAck::Server => 1,
            MessageAck::Device => 2,
            MessageAck::Read => 3,
            MessageAck::Played => 4,
        }
    }
}

/// Message types as reported by the remote store. Only the variants this
/// crate branches on are spelled out; everything else folds into `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Chat,
    Image,
    Video,
    Audio,
    Ptt,
    Document,
    Sticker,
    Location,
    Vcard,
    MultiVcard,
    Revoked,
    #[serde(rename = "gp2")]
    GroupNotification,
    List,
    ButtonsResponse,
    #[default]
    #[serde(other)]
    Unknown,
}

/// A message record snapshot.
///
/// Field names follow the remote store's serialized model so records cross
/// the evaluate boundary without translation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Message {
    pub id: MessageId,
    #[serde(rename = "type")]
    pub kind: MessageType,
    /// Group-notification sub-kind ("add", "remove", "leave", ...).
    pub subtype: Option<String>,
    pub body: String,
    /// Store timestamp, seconds since the epoch.
    pub t: i64,
    pub from: Option<WId>,
    pub to: Option<WId>,
    /// Sender within a group chat.
    pub author: Option<WId>,
    pub ack: MessageAck,
    /// Set by the store only on freshly arrived records.
    pub is_new_msg: bool,
    pub star: bool,
    pub broadcast: bool,
    pub has_media: bool,
    pub is_forwarded: bool,
    pub caption: Option<String>,
    /// Serialized ids mentioned in the body.
    pub mentioned_jid_list: Vec<String>,
    /// Group-notification recipients.
    pub recipients: Vec<WId>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl Message {
    /// Whether this message originates from the client's own account.
    pub fn from_me(&self) -> bool {
        self.id.from_me
    }

    /// Whether the record is a group-notification subtype.
    pub fn is_group_notification(&self) -> bool {
        self.kind == MessageType::GroupNotification
    }

    /// Store timestamp as a UTC instant.
    pub fn timestamp(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.t, 0).single().unwrap_or_default()
    }
}
