//! Thin domain snapshots for chats, contacts, labels, calls and group
//! notifications, deserialized from the records the remote store hands back.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{Message, MessageId, WId};

/// A chat entry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Chat {
    pub id: WId,
    pub name: Option<String>,
    pub is_group: bool,
    pub is_read_only: bool,
    pub unread_count: i32,
    /// Seconds since the epoch of the latest activity.
    pub timestamp: i64,
    pub archived: bool,
    pub pinned: bool,
    pub is_muted: bool,
    /// Mute horizon, seconds since the epoch; -1 mutes forever.
    pub mute_expiration: i64,
}

/// A contact entry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Contact {
    pub id: WId,
    pub number: String,
    pub name: Option<String>,
    pub pushname: Option<String>,
    pub short_name: Option<String>,
    pub is_me: bool,
    pub is_user: bool,
    pub is_group: bool,
    pub is_wa_contact: bool,
    pub is_my_contact: bool,
    pub is_blocked: bool,
    pub is_business: bool,
    pub is_enterprise: bool,
}

/// A business label.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Label {
    pub id: String,
    pub name: String,
    pub hex_color: String,
}

/// An incoming call notification.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Call {
    pub id: String,
    pub peer_jid: WId,
    /// Seconds since the epoch of the call offer.
    pub offer_time: i64,
    pub is_video: bool,
    pub is_group: bool,
}

/// A group membership change or subject/settings update.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GroupNotification {
    pub id: MessageId,
    /// Raw notification sub-kind ("add", "remove", "subject", ...).
    pub subtype: String,
    pub chat_id: WId,
    /// Who performed the action, when known.
    pub author: Option<WId>,
    /// Members affected by the action.
    pub recipients: Vec<WId>,
    pub body: String,
    pub timestamp: i64,
}

impl GroupNotification {
    /// Build a notification snapshot from a group-notification message
    /// record.
    pub fn from_message(msg: &Message) -> Self {
        let chat_id = msg
            .from
            .clone()
            .or_else(|| msg.id.remote.parse().ok())
            .unwrap_or_default();
        Self {
            id: msg.id.clone(),
            subtype: msg.subtype.clone().unwrap_or_default(),
            chat_id,
            author: msg.author.clone(),
            recipients: msg.recipients.clone(),
            body: msg.body.clone(),
            timestamp: msg.t,
        }
    }
}

/// Identity of the logged-in account, fetched once after the store becomes
/// ready.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientInfo {
    pub pushname: String,
    pub wid: WId,
    pub platform: String,
}

/// Result of creating a group.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateGroupResult {
    pub gid: WId,
    /// Participant serialized id to status code, for anyone not added.
    pub missing_participants: HashMap<String, String>,
}

/// Metadata resolved for a group invite code.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InviteInfo {
    pub id: WId,
    pub subject: Option<String>,
    pub owner: Option<WId>,
    pub size: Option<u32>,
}

/// A v4 group invite, delivered inside a groups_v4_invite message.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GroupV4Invite {
    pub invite_code: String,
    pub invite_code_exp: i64,
    pub group_id: String,
    pub from_id: Option<String>,
}

/// Paging for message search.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchOptions {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub chat_id: Option<WId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessageType;

    #[test]
    fn test_group_notification_from_message() {
        let msg = Message {
            id: MessageId::new(false, "123-456@g.us", "AA11"),
            kind: MessageType::GroupNotification,
            subtype: Some("add".to_string()),
            recipients: vec![WId::user("111"), WId::user("222")],
            body: String::new(),
            t: 1_700_000_100,
            ..Default::default()
        };
        let notification = GroupNotification::from_message(&msg);
        assert_eq!(notification.subtype, "add");
        assert_eq!(notification.chat_id, WId::group("123-456"));
        assert_eq!(notification.recipients.len(), 2);
        assert_eq!(notification.timestamp, 1_700_000_100);
    }

    #[test]
    fn test_chat_deserializes_from_raw_record() {
        let raw = serde_json::json!({
            "id": { "user": "123", "server": "c.us", "_serialized": "123@c.us" },
            "name": "Ada",
            "unreadCount": 2,
            "pinned": true,
            "muteExpiration": -1
        });
        let chat: Chat = serde_json::from_value(raw).unwrap();
        assert_eq!(chat.name.as_deref(), Some("Ada"));
        assert_eq!(chat.unread_count, 2);
        assert!(chat.pinned);
        assert_eq!(chat.mute_expiration, -1);
    }
}
