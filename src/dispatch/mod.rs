//! Outbound message dispatch.
//!
//! Resolves a tagged content union plus options into one internal payload
//! record, runs the sticker-conversion sub-protocol when asked, and issues
//! a single remote send. Variant selection is mutually exclusive; the first
//! matching rule wins.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};

use crate::error::ClientError;
use crate::page::scripts;
use crate::page::RemoteExecutionPort;
use crate::types::{MediaAttachment, Message, StickerTranscoder, WId};

/// A geographic point payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One reply button.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Button {
    pub id: String,
    pub text: String,
}

/// Body of a buttons message: plain chat text or a media header.
#[derive(Debug, Clone, PartialEq)]
pub enum ButtonsBody {
    Text(String),
    Media(MediaAttachment),
}

/// An interactive buttons message.
#[derive(Debug, Clone, PartialEq)]
pub struct Buttons {
    pub body: ButtonsBody,
    pub buttons: Vec<Button>,
    pub title: Option<String>,
    pub footer: Option<String>,
}

/// One row of a list section.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRow {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSection {
    pub title: String,
    pub rows: Vec<ListRow>,
}

/// An interactive list message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct List {
    pub body: String,
    pub button_text: String,
    pub sections: Vec<ListSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
}

/// The outbound content union. Exactly one variant is active per send.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundContent {
    Text(String),
    Media {
        attachment: MediaAttachment,
        caption: Option<String>,
    },
    Location(Location),
    ContactCard(WId),
    ContactCardList(Vec<WId>),
    Buttons(Buttons),
    List(List),
}

/// Per-send configuration.
#[derive(Debug, Clone)]
pub struct SendOptions {
    pub link_preview: bool,
    pub send_audio_as_voice: bool,
    pub send_video_as_gif: bool,
    pub send_media_as_sticker: bool,
    pub send_media_as_document: bool,
    pub parse_vcards: bool,
    pub quoted_message_id: Option<String>,
    pub mentions: Vec<WId>,
    /// Mark the chat as read before sending. Best effort.
    pub send_seen: bool,
    /// Media to attach when the content itself is plain text.
    pub media: Option<MediaAttachment>,
    pub sticker_author: Option<String>,
    pub sticker_name: Option<String>,
    pub sticker_categories: Option<Vec<String>>,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            link_preview: false,
            send_audio_as_voice: false,
            send_video_as_gif: false,
            send_media_as_sticker: false,
            send_media_as_document: false,
            parse_vcards: true,
            quoted_message_id: None,
            mentions: Vec::new(),
            send_seen: true,
            media: None,
            sticker_author: None,
            sticker_name: None,
            sticker_categories: None,
        }
    }
}

/// The single payload record handed to the remote send command.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SendPayload {
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<MediaAttachment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_card: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_card_list: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buttons: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list: Option<List>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quoted_message_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mentioned_ids: Vec<String>,
    pub link_preview: bool,
    pub send_audio_as_voice: bool,
    pub send_video_as_gif: bool,
    pub send_media_as_sticker: bool,
    pub send_media_as_document: bool,
    pub parse_vcards: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sticker_author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sticker_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sticker_categories: Option<Vec<String>>,
}

pub struct OutboundMessageDispatcher {
    port: Arc<dyn RemoteExecutionPort>,
    transcoder: Option<Arc<dyn StickerTranscoder>>,
}

impl OutboundMessageDispatcher {
    pub fn new(
        port: Arc<dyn RemoteExecutionPort>,
        transcoder: Option<Arc<dyn StickerTranscoder>>,
    ) -> Self {
        Self { port, transcoder }
    }

    /// Resolve and send one message, returning the created record.
    pub async fn send(
        &self,
        chat_id: &WId,
        content: OutboundContent,
        options: SendOptions,
    ) -> Result<Message, ClientError> {
        let mut payload = resolve(content, &options)?;

        if options.send_media_as_sticker {
            if let Some(attachment) = payload.attachment.take() {
                payload.attachment = Some(self.convert_to_sticker(attachment).await?);
            }
        }

        if options.send_seen {
            let args = json!({ "chatId": chat_id.serialized });
            if let Err(err) = self.port.evaluate(scripts::SEND_SEEN, args).await {
                log::warn!("failed to mark {chat_id} as seen before send: {err}");
            }
        }

        let raw = self
            .port
            .evaluate(
                scripts::SEND_MESSAGE,
                json!({
                    "chatId": chat_id.serialized,
                    "message": serde_json::to_value(&payload)?,
                }),
            )
            .await?;
        Ok(serde_json::from_value(raw)?)
    }

    /// Image media converts via the page's native encoder; anything else
    /// goes through the external transcoding collaborator.
    async fn convert_to_sticker(
        &self,
        attachment: MediaAttachment,
    ) -> Result<MediaAttachment, ClientError> {
        if attachment.is_image() {
            let raw = self
                .port
                .evaluate(
                    scripts::TO_STICKER,
                    json!({ "media": serde_json::to_value(&attachment)? }),
                )
                .await?;
            return Ok(serde_json::from_value(raw)?);
        }
        let transcoder = self.transcoder.as_ref().ok_or_else(|| {
            ClientError::Validation(
                "no sticker transcoder configured for non-image media".to_string(),
            )
        })?;
        transcoder
            .to_sticker(&attachment)
            .await
            .map_err(|err| ClientError::RemoteCommand(err.to_string()))
    }
}

/// Fold content and options into one payload record. First matching rule
/// wins; the rules are mutually exclusive by construction of the union.
pub(crate) fn resolve(
    content: OutboundContent,
    options: &SendOptions,
) -> Result<SendPayload, ClientError> {
    let mut payload = SendPayload {
        quoted_message_id: options.quoted_message_id.clone(),
        mentioned_ids: options
            .mentions
            .iter()
            .map(|wid| wid.serialized.clone())
            .collect(),
        link_preview: options.link_preview,
        send_audio_as_voice: options.send_audio_as_voice,
        send_video_as_gif: options.send_video_as_gif,
        send_media_as_sticker: options.send_media_as_sticker,
        send_media_as_document: options.send_media_as_document,
        parse_vcards: options.parse_vcards,
        sticker_author: options.sticker_author.clone(),
        sticker_name: options.sticker_name.clone(),
        sticker_categories: options.sticker_categories.clone(),
        ..Default::default()
    };

    match content {
        OutboundContent::Media {
            attachment,
            caption,
        } => {
            payload.attachment = Some(attachment);
            payload.caption = caption;
        }
        OutboundContent::Text(text) => match options.media.clone() {
            Some(media) => {
                payload.attachment = Some(media);
                if !text.is_empty() {
                    payload.caption = Some(text);
                }
            }
            None => payload.body = text,
        },
        OutboundContent::Location(location) => {
            payload.location = Some(location);
        }
        OutboundContent::ContactCard(wid) => {
            payload.contact_card = Some(wid.serialized);
        }
        OutboundContent::ContactCardList(wids) => {
            if wids.is_empty() {
                return Err(ClientError::Validation(
                    "contact card list must not be empty".to_string(),
                ));
            }
            payload.contact_card_list =
                Some(wids.into_iter().map(|wid| wid.serialized).collect());
        }
        OutboundContent::Buttons(buttons) => {
            match buttons.body {
                ButtonsBody::Text(text) => payload.body = text,
                ButtonsBody::Media(media) => payload.attachment = Some(media),
            }
            payload.buttons = Some(json!({
                "buttons": buttons.buttons,
                "title": buttons.title,
                "footer": buttons.footer,
            }));
        }
        OutboundContent::List(list) => {
            payload.list = Some(list);
        }
    }

    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::fake::FakePage;
    use crate::types::TranscodeError;
    use async_trait::async_trait;

    fn contact(n: u32) -> WId {
        WId::user(format!("{n}"))
    }

    fn image() -> MediaAttachment {
        MediaAttachment::from_bytes("image/png", b"\x89PNG", Some("a.png".to_string()))
    }

    fn raw_sent_message() -> Value {
        json!({
            "id": {
                "fromMe": true,
                "remote": "42@c.us",
                "id": "S1",
                "_serialized": "true_42@c.us_S1"
            },
            "type": "chat",
            "body": "done",
            "ack": 0
        })
    }

    #[test]
    fn test_text_resolves_to_body() {
        let payload = resolve(
            OutboundContent::Text("hi".to_string()),
            &SendOptions::default(),
        )
        .unwrap();
        assert_eq!(payload.body, "hi");
        assert!(payload.attachment.is_none());
    }

    #[test]
    fn test_primary_media_wins_over_body() {
        let payload = resolve(
            OutboundContent::Media {
                attachment: image(),
                caption: Some("look".to_string()),
            },
            &SendOptions::default(),
        )
        .unwrap();
        assert!(payload.attachment.is_some());
        assert_eq!(payload.caption.as_deref(), Some("look"));
        assert!(payload.body.is_empty());
    }

    #[test]
    fn test_options_media_turns_text_into_caption() {
        let options = SendOptions {
            media: Some(image()),
            ..Default::default()
        };
        let payload = resolve(OutboundContent::Text("caption me".to_string()), &options).unwrap();
        assert!(payload.attachment.is_some());
        assert_eq!(payload.caption.as_deref(), Some("caption me"));
        assert!(payload.body.is_empty());
    }

    #[test]
    fn test_contact_card_list_preserves_input_order() {
        let payload = resolve(
            OutboundContent::ContactCardList(vec![
                contact(1),
                contact(2),
                contact(3),
                contact(4),
            ]),
            &SendOptions::default(),
        )
        .unwrap();
        assert_eq!(
            payload.contact_card_list.unwrap(),
            vec!["1@c.us", "2@c.us", "3@c.us", "4@c.us"]
        );
    }

    #[test]
    fn test_empty_contact_card_list_is_rejected() {
        let err = resolve(
            OutboundContent::ContactCardList(Vec::new()),
            &SendOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }

    #[test]
    fn test_media_buttons_set_attachment_and_buttons() {
        let payload = resolve(
            OutboundContent::Buttons(Buttons {
                body: ButtonsBody::Media(image()),
                buttons: vec![Button {
                    id: "b1".to_string(),
                    text: "Go".to_string(),
                }],
                title: None,
                footer: None,
            }),
            &SendOptions::default(),
        )
        .unwrap();
        assert!(payload.attachment.is_some());
        assert!(payload.buttons.is_some());
        assert!(payload.body.is_empty());
    }

    #[test]
    fn test_chat_buttons_keep_plain_body() {
        let payload = resolve(
            OutboundContent::Buttons(Buttons {
                body: ButtonsBody::Text("pick one".to_string()),
                buttons: Vec::new(),
                title: None,
                footer: None,
            }),
            &SendOptions::default(),
        )
        .unwrap();
        assert!(payload.attachment.is_none());
        assert!(payload.buttons.is_some());
        assert_eq!(payload.body, "pick one");
    }

    #[test]
    fn test_mentions_flatten_to_serialized_ids() {
        let options = SendOptions {
            mentions: vec![contact(7), contact(8)],
            ..Default::default()
        };
        let payload = resolve(OutboundContent::Text("hi".to_string()), &options).unwrap();
        assert_eq!(payload.mentioned_ids, vec!["7@c.us", "8@c.us"]);
    }

    #[tokio::test]
    async fn test_send_marks_seen_first_by_default() {
        let page = Arc::new(FakePage::new());
        page.push_eval_result("sendMessage", raw_sent_message());
        let dispatcher = OutboundMessageDispatcher::new(page.clone(), None);

        let message = dispatcher
            .send(
                &WId::user("42"),
                OutboundContent::Text("hi".to_string()),
                SendOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(message.body, "done");

        let log = page.eval_log();
        assert_eq!(log.len(), 2);
        assert!(log[0].0.contains("sendSeen"));
        assert!(log[1].0.contains("sendMessage"));
    }

    #[tokio::test]
    async fn test_send_seen_failure_does_not_fail_the_send() {
        let page = Arc::new(FakePage::new());
        page.push_eval_result("sendMessage", raw_sent_message());
        let dispatcher = OutboundMessageDispatcher::new(page.clone(), None);

        // sendSeen resolves to null here, which the dispatcher ignores
        // entirely; an evaluation error would be logged and swallowed the
        // same way.
        let result = dispatcher
            .send(
                &WId::user("42"),
                OutboundContent::Text("hi".to_string()),
                SendOptions::default(),
            )
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_send_seen_can_be_disabled() {
        let page = Arc::new(FakePage::new());
        page.push_eval_result("sendMessage", raw_sent_message());
        let dispatcher = OutboundMessageDispatcher::new(page.clone(), None);

        dispatcher
            .send(
                &WId::user("42"),
                OutboundContent::Text("hi".to_string()),
                SendOptions {
                    send_seen: false,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(!page.evaluated("sendSeen"));
    }

    #[tokio::test]
    async fn test_image_sticker_uses_native_encoder() {
        let page = Arc::new(FakePage::new());
        page.push_eval_result(
            "toStickerData",
            json!({ "mimetype": "image/webp", "data": "c3RpY2tlcg==" }),
        );
        page.push_eval_result("sendMessage", raw_sent_message());
        let dispatcher = OutboundMessageDispatcher::new(page.clone(), None);

        dispatcher
            .send(
                &WId::user("42"),
                OutboundContent::Media {
                    attachment: image(),
                    caption: None,
                },
                SendOptions {
                    send_media_as_sticker: true,
                    send_seen: false,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(page.evaluated("toStickerData"));
        let log = page.eval_log();
        let send_args = &log.last().unwrap().1;
        assert_eq!(
            send_args["message"]["attachment"]["mimetype"],
            "image/webp"
        );
    }

    struct FixedTranscoder;

    #[async_trait]
    impl StickerTranscoder for FixedTranscoder {
        async fn to_sticker(
            &self,
            _media: &MediaAttachment,
        ) -> Result<MediaAttachment, TranscodeError> {
            Ok(MediaAttachment::new("image/webp", "d2VicA==", None))
        }
    }

    #[tokio::test]
    async fn test_video_sticker_uses_external_transcoder() {
        let page = Arc::new(FakePage::new());
        page.push_eval_result("sendMessage", raw_sent_message());
        let dispatcher =
            OutboundMessageDispatcher::new(page.clone(), Some(Arc::new(FixedTranscoder)));

        dispatcher
            .send(
                &WId::user("42"),
                OutboundContent::Media {
                    attachment: MediaAttachment::from_bytes("video/mp4", b"mp4!", None),
                    caption: None,
                },
                SendOptions {
                    send_media_as_sticker: true,
                    send_seen: false,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(!page.evaluated("toStickerData"));
        let log = page.eval_log();
        let send_args = &log.last().unwrap().1;
        assert_eq!(
            send_args["message"]["attachment"]["mimetype"],
            "image/webp"
        );
    }

    #[tokio::test]
    async fn test_non_image_sticker_without_transcoder_is_rejected() {
        let page = Arc::new(FakePage::new());
        let dispatcher = OutboundMessageDispatcher::new(page.clone(), None);

        let err = dispatcher
            .send(
                &WId::user("42"),
                OutboundContent::Media {
                    attachment: MediaAttachment::from_bytes("video/mp4", b"mp4!", None),
                    caption: None,
                },
                SendOptions {
                    send_media_as_sticker: true,
                    send_seen: false,
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
        assert!(page.eval_log().is_empty());
    }
}
