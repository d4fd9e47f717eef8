//! High-level client API.
//!
//! One `Client` owns one browser page, one session controller and one
//! dispatcher. Commands are independent round trips into the remote
//! context; errors they produce are scoped to the call and never poison
//! the session.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::config::ClientConfig;
use crate::dispatch::{OutboundContent, OutboundMessageDispatcher, SendOptions};
use crate::error::ClientError;
use crate::page::{scripts, RemoteExecutionPort};
use crate::session::{SessionController, SessionState};
use crate::types::{
    Chat, ClientInfo, ConnectionState, Contact, CreateGroupResult, Event, EventSink,
    GroupV4Invite, InviteInfo, Label, Message, SearchOptions, StickerTranscoder, WId,
};

/// Maximum number of simultaneously pinned chats the platform allows.
pub const MAX_PINNED_CHATS: u64 = 3;

pub struct Client {
    port: Arc<dyn RemoteExecutionPort>,
    session: Arc<SessionController>,
    dispatcher: OutboundMessageDispatcher,
    sink: EventSink,
}

impl Client {
    /// Create a client over a page port. Fails fast on unusable
    /// configuration.
    pub fn new(
        config: ClientConfig,
        port: Arc<dyn RemoteExecutionPort>,
    ) -> Result<Self, ClientError> {
        Self::with_transcoder(config, port, None)
    }

    /// Create a client with an external sticker transcoder for non-image
    /// media.
    pub fn with_transcoder(
        config: ClientConfig,
        port: Arc<dyn RemoteExecutionPort>,
        transcoder: Option<Arc<dyn StickerTranscoder>>,
    ) -> Result<Self, ClientError> {
        config.validate()?;
        let sink = EventSink::new();
        let session = SessionController::new(config, Arc::clone(&port), sink.clone());
        let dispatcher = OutboundMessageDispatcher::new(Arc::clone(&port), transcoder);
        Ok(Self {
            port,
            session,
            dispatcher,
            sink,
        })
    }

    /// Register an event handler on the public stream.
    pub fn on_event<F>(&self, handler: F)
    where
        F: Fn(Event) + Send + Sync + 'static,
    {
        self.sink.on_event(handler);
    }

    /// Drive the session from launch to Ready.
    pub async fn initialize(&self) -> Result<(), ClientError> {
        self.session.initialize().await
    }

    /// Current lifecycle state of this client.
    pub async fn session_state(&self) -> SessionState {
        self.session.state().await
    }

    /// Identity of the logged-in account, once Ready.
    pub async fn info(&self) -> Option<ClientInfo> {
        self.session.info().await
    }

    /// Release the browser resource. Idempotent.
    pub async fn destroy(&self) -> Result<(), ClientError> {
        self.session.destroy().await
    }

    /// Log out remotely and remove the on-disk session directory.
    pub async fn logout(&self) -> Result<(), ClientError> {
        self.session.logout().await
    }

    /// Send a message to a chat.
    pub async fn send_message(
        &self,
        chat_id: &WId,
        content: OutboundContent,
        options: SendOptions,
    ) -> Result<Message, ClientError> {
        self.dispatcher.send(chat_id, content, options).await
    }

    /// Mark a chat as read.
    pub async fn send_seen(&self, chat_id: &WId) -> Result<(), ClientError> {
        self.command::<Value>(scripts::SEND_SEEN, json!({ "chatId": chat_id.serialized }))
            .await?;
        Ok(())
    }

    /// Search messages, optionally scoped to one chat.
    pub async fn search_messages(
        &self,
        query: &str,
        options: SearchOptions,
    ) -> Result<Vec<Message>, ClientError> {
        self.command(
            scripts::SEARCH_MESSAGES,
            json!({
                "query": query,
                "page": options.page,
                "limit": options.limit,
                "chatId": options.chat_id.map(|wid| wid.serialized),
            }),
        )
        .await
    }

    pub async fn get_chats(&self) -> Result<Vec<Chat>, ClientError> {
        self.command(scripts::GET_CHATS, Value::Null).await
    }

    pub async fn get_chat_by_id(&self, chat_id: &WId) -> Result<Chat, ClientError> {
        self.command(
            scripts::GET_CHAT_BY_ID,
            json!({ "chatId": chat_id.serialized }),
        )
        .await
    }

    pub async fn get_contacts(&self) -> Result<Vec<Contact>, ClientError> {
        self.command(scripts::GET_CONTACTS, Value::Null).await
    }

    pub async fn get_contact_by_id(&self, contact_id: &WId) -> Result<Contact, ClientError> {
        self.command(
            scripts::GET_CONTACT_BY_ID,
            json!({ "contactId": contact_id.serialized }),
        )
        .await
    }

    /// Join a group through an invite code. The code is validated before
    /// any round trip; an expired or unknown code surfaces as a validation
    /// error too.
    pub async fn accept_invite(&self, code: &str) -> Result<WId, ClientError> {
        let code = code.trim();
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ClientError::Validation(format!(
                "malformed invite code {code:?}"
            )));
        }
        let joined: Option<String> = self
            .command(scripts::ACCEPT_INVITE, json!({ "code": code }))
            .await?;
        let serialized = joined.ok_or_else(|| {
            ClientError::Validation("invalid or expired invite code".to_string())
        })?;
        serialized
            .parse()
            .map_err(|_| ClientError::RemoteCommand("malformed group id in reply".to_string()))
    }

    /// Resolve invite metadata without joining.
    pub async fn get_invite_info(&self, code: &str) -> Result<InviteInfo, ClientError> {
        self.command(scripts::GET_INVITE_INFO, json!({ "code": code }))
            .await
    }

    /// Accept a v4 group invite delivered in a message.
    pub async fn accept_group_v4_invite(
        &self,
        invite: &GroupV4Invite,
    ) -> Result<(), ClientError> {
        if invite.invite_code.is_empty() {
            return Err(ClientError::Validation(
                "v4 invite carries no invite code".to_string(),
            ));
        }
        self.command::<Value>(
            scripts::ACCEPT_G4_INVITE,
            json!({ "invite": serde_json::to_value(invite)? }),
        )
        .await?;
        Ok(())
    }

    pub async fn set_status(&self, status: &str) -> Result<(), ClientError> {
        self.command::<Value>(scripts::SET_STATUS, json!({ "status": status }))
            .await?;
        Ok(())
    }

    pub async fn set_display_name(&self, name: &str) -> Result<(), ClientError> {
        self.command::<Value>(scripts::SET_DISPLAY_NAME, json!({ "name": name }))
            .await?;
        Ok(())
    }

    /// Connection state as the remote app-state model reports it.
    pub async fn get_state(&self) -> Result<ConnectionState, ClientError> {
        self.command(scripts::GET_STATE, Value::Null).await
    }

    /// Version of the web client loaded in the page.
    pub async fn get_wweb_version(&self) -> Result<String, ClientError> {
        self.command(scripts::GET_WWEB_VERSION, Value::Null).await
    }

    pub async fn archive_chat(&self, chat_id: &WId) -> Result<(), ClientError> {
        self.set_archive(chat_id, true).await
    }

    pub async fn unarchive_chat(&self, chat_id: &WId) -> Result<(), ClientError> {
        self.set_archive(chat_id, false).await
    }

    async fn set_archive(&self, chat_id: &WId, archive: bool) -> Result<(), ClientError> {
        self.command::<Value>(
            scripts::ARCHIVE_CHAT,
            json!({ "chatId": chat_id.serialized, "archive": archive }),
        )
        .await?;
        Ok(())
    }

    /// Pin a chat. Returns false without issuing any pin mutation when the
    /// platform cap of three pinned chats is already used up.
    pub async fn pin_chat(&self, chat_id: &WId) -> Result<bool, ClientError> {
        let state: Value = self
            .command(
                scripts::CHAT_PIN_STATE,
                json!({ "chatId": chat_id.serialized }),
            )
            .await?;
        if state["pinned"].as_bool().unwrap_or(false) {
            return Ok(true);
        }
        if state["pinnedCount"].as_u64().unwrap_or(0) >= MAX_PINNED_CHATS {
            log::debug!("pin of {chat_id} refused, {MAX_PINNED_CHATS} chats already pinned");
            return Ok(false);
        }
        self.command::<Value>(
            scripts::PIN_CHAT,
            json!({ "chatId": chat_id.serialized, "pin": true }),
        )
        .await?;
        Ok(true)
    }

    pub async fn unpin_chat(&self, chat_id: &WId) -> Result<(), ClientError> {
        self.command::<Value>(
            scripts::PIN_CHAT,
            json!({ "chatId": chat_id.serialized, "pin": false }),
        )
        .await?;
        Ok(())
    }

    /// Mute a chat until an instant, or forever when none is given.
    pub async fn mute_chat(
        &self,
        chat_id: &WId,
        unmute_date: Option<DateTime<Utc>>,
    ) -> Result<(), ClientError> {
        let expiration = unmute_date.map(|date| date.timestamp()).unwrap_or(-1);
        self.command::<Value>(
            scripts::MUTE_CHAT,
            json!({ "chatId": chat_id.serialized, "expiration": expiration }),
        )
        .await?;
        Ok(())
    }

    pub async fn unmute_chat(&self, chat_id: &WId) -> Result<(), ClientError> {
        self.command::<Value>(
            scripts::UNMUTE_CHAT,
            json!({ "chatId": chat_id.serialized }),
        )
        .await?;
        Ok(())
    }

    /// Profile picture URL for an entity, when one is visible.
    pub async fn get_profile_pic_url(
        &self,
        contact_id: &WId,
    ) -> Result<Option<String>, ClientError> {
        self.command(
            scripts::GET_PROFILE_PIC_URL,
            json!({ "contactId": contact_id.serialized }),
        )
        .await
    }

    /// Canonical id for a raw phone number, or None when unregistered.
    pub async fn get_number_id(&self, number: &str) -> Result<Option<WId>, ClientError> {
        let digits: String = number.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            return Err(ClientError::Validation(format!(
                "number {number:?} contains no digits"
            )));
        }
        self.command(scripts::QUERY_NUMBER_ID, json!({ "number": digits }))
            .await
    }

    /// Whether a number is registered on the platform.
    pub async fn is_registered_user(&self, number: &str) -> Result<bool, ClientError> {
        Ok(self.get_number_id(number).await?.is_some())
    }

    /// Create a group. Participants that could not be added come back as a
    /// serialized-id to status-code mapping.
    pub async fn create_group(
        &self,
        name: &str,
        participants: &[WId],
    ) -> Result<CreateGroupResult, ClientError> {
        if participants.is_empty() {
            return Err(ClientError::Validation(
                "group creation needs at least one participant".to_string(),
            ));
        }
        let participant_ids: Vec<&str> = participants
            .iter()
            .map(|wid| wid.serialized.as_str())
            .collect();
        self.command(
            scripts::CREATE_GROUP,
            json!({ "name": name, "participantIds": participant_ids }),
        )
        .await
    }

    /// Groups this contact and the logged-in account share.
    pub async fn get_common_groups(&self, contact_id: &WId) -> Result<Vec<WId>, ClientError> {
        self.command(
            scripts::GET_COMMON_GROUPS,
            json!({ "contactId": contact_id.serialized }),
        )
        .await
    }

    pub async fn get_labels(&self) -> Result<Vec<Label>, ClientError> {
        self.command(scripts::GET_LABELS, Value::Null).await
    }

    pub async fn get_label_by_id(&self, label_id: &str) -> Result<Label, ClientError> {
        self.command(scripts::GET_LABEL_BY_ID, json!({ "labelId": label_id }))
            .await
    }

    pub async fn get_chat_labels(&self, chat_id: &WId) -> Result<Vec<Label>, ClientError> {
        self.command(
            scripts::GET_CHAT_LABELS,
            json!({ "chatId": chat_id.serialized }),
        )
        .await
    }

    pub async fn get_chats_by_label_id(&self, label_id: &str) -> Result<Vec<Chat>, ClientError> {
        self.command(
            scripts::GET_CHATS_BY_LABEL,
            json!({ "labelId": label_id }),
        )
        .await
    }

    pub async fn get_blocked_contacts(&self) -> Result<Vec<Contact>, ClientError> {
        self.command(scripts::GET_BLOCKED_CONTACTS, Value::Null).await
    }

    /// One typed round trip into the remote context.
    async fn command<T: DeserializeOwned>(
        &self,
        script: &str,
        args: Value,
    ) -> Result<T, ClientError> {
        let raw = self.port.evaluate(script, args).await?;
        Ok(serde_json::from_value(raw)?)
    }
}
