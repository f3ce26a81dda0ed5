//! Renderer of a single chat item.
//!
//! A [`Renderer`] is built from one `addChatItemAction.item` object and a type
//! tag chosen by the caller. It flattens the item into a [`ChatSnippet`] and
//! then drops the raw item, so that snippets buffered over a long stream do not
//! keep the JSON they were built from alive.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

use super::error::{ChatParseError, ChatResult};
use super::schema::{AuthorBadge, ChatItemRenderer, Message};
use crate::config::CHANNEL_URL_PREFIX;

/// Kind of chat item, decided by the caller from the renderer key it matched.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "camelCase")]
pub enum ChatType {
    #[display("textMessage")]
    TextMessage,
    #[display("superChat")]
    SuperChat,
    #[display("superSticker")]
    SuperSticker,
    #[display("newSponsor")]
    NewSponsor,
}

impl ChatType {
    /// Map a `liveChat*Renderer` key to its chat type.
    pub fn from_renderer_key(key: &str) -> Option<Self> {
        match key {
            "liveChatTextMessageRenderer" => Some(ChatType::TextMessage),
            "liveChatPaidMessageRenderer" => Some(ChatType::SuperChat),
            "liveChatPaidStickerRenderer" => Some(ChatType::SuperSticker),
            "liveChatMembershipItemRenderer" => Some(ChatType::NewSponsor),
            _ => None,
        }
    }
}

/// One fragment of a message: plain text, or the image URL of an emoji.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MessagePiece {
    Text(String),
    EmojiUrl(String),
}

impl MessagePiece {
    pub fn as_str(&self) -> &str {
        match self {
            MessagePiece::Text(text) => text,
            MessagePiece::EmojiUrl(url) => url,
        }
    }
}

/// Message and timing fields of a chat item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    #[serde(rename = "type")]
    pub chat_type: ChatType,
    pub id: Option<String>,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    /// Elapsed-time label, empty for live chat
    pub elapsed_time: String,
    /// Local time as `%Y-%m-%d %H:%M:%S`
    pub datetime: String,
    /// Text with emojis replaced by their first shortcut
    pub message: String,
    /// Text runs and emoji image URLs in message order
    pub message_ex: Vec<MessagePiece>,
    /// Context menu parameter token
    pub params: String,
}

/// Author status flags from the badge list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Badges {
    pub is_verified: bool,
    pub is_chat_owner: bool,
    pub is_chat_sponsor: bool,
    pub is_chat_moderator: bool,
    /// Image of the membership badge, if any
    pub sponsor_badge_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorDetails {
    #[serde(flatten)]
    pub badges: Badges,
    pub channel_id: String,
    pub channel_url: String,
    pub name: String,
    pub image_url: String,
}

/// Flat record of one chat item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatSnippet {
    #[serde(flatten)]
    pub snippet: Snippet,
    pub author: AuthorDetails,
}

/// Extracts a [`ChatSnippet`] from one chat item.
#[derive(Debug)]
pub struct Renderer {
    chat_type: ChatType,
    channel_prefix: String,
    renderer: Option<ChatItemRenderer>,
}

impl Renderer {
    /// Build a renderer from an `addChatItemAction.item` object.
    ///
    /// The item holds a single `liveChat*Renderer` key; its value is what gets
    /// rendered. The key itself is not inspected, `chat_type` is taken as given.
    pub fn new(item: Value, chat_type: ChatType) -> ChatResult<Self> {
        let body = match item {
            Value::Object(map) => map.into_iter().next().map(|(_, body)| body),
            _ => None,
        }
        .ok_or_else(|| ChatParseError::missing_field("renderer", "chat item"))?;

        Ok(Self {
            chat_type,
            channel_prefix: CHANNEL_URL_PREFIX.to_string(),
            renderer: Some(serde_json::from_value(body)?),
        })
    }

    /// Use a different prefix for author channel URLs.
    pub fn with_channel_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.channel_prefix = prefix.into();
        self
    }

    pub fn chat_type(&self) -> ChatType {
        self.chat_type
    }

    fn body(&self) -> ChatResult<&ChatItemRenderer> {
        self.renderer.as_ref().ok_or_else(|| {
            ChatParseError::IllegalFunctionCall("renderer was already released".to_string())
        })
    }

    /// Extract id, timing, message and context menu fields.
    ///
    /// # Errors
    /// `MissingField` when the context menu parameter path is absent
    pub fn extract_snippet(&self) -> ChatResult<Snippet> {
        let body = self.body()?;

        let timestamp_usec = match body.timestamp_usec.as_deref() {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .map_err(|_| ChatParseError::invalid_number("timestampUsec", raw))?,
            None => 0,
        };
        let elapsed_time = body
            .timestamp_text
            .as_ref()
            .and_then(|text| text.simple_text.clone())
            .unwrap_or_default();
        let (message, message_ex) = extract_message(body.message.as_ref())?;
        let params = body
            .context_menu_endpoint
            .as_ref()
            .and_then(|endpoint| endpoint.live_chat_item_context_menu_endpoint.as_ref())
            .and_then(|endpoint| endpoint.params.clone())
            .ok_or_else(|| {
                ChatParseError::missing_field(
                    "contextMenuEndpoint.liveChatItemContextMenuEndpoint.params",
                    "chat item",
                )
            })?;

        Ok(Snippet {
            chat_type: self.chat_type,
            id: body.id.clone(),
            timestamp: timestamp_usec / 1000,
            elapsed_time,
            datetime: format_datetime(timestamp_usec)?,
            message,
            message_ex,
            params,
        })
    }

    /// Extract author identity and badge flags.
    ///
    /// # Errors
    /// `MissingField` when the channel id, name or second photo thumbnail is absent
    pub fn extract_author_details(&self) -> ChatResult<AuthorDetails> {
        let body = self.body()?;

        let badges = scan_badges(body.author_badges.as_deref())?;
        let channel_id = body
            .author_external_channel_id
            .clone()
            .ok_or_else(|| ChatParseError::missing_field("authorExternalChannelId", "chat item"))?;
        let name = body
            .author_name
            .as_ref()
            .and_then(|name| name.simple_text.clone())
            .ok_or_else(|| ChatParseError::missing_field("authorName.simpleText", "chat item"))?;
        let image_url = body
            .author_photo
            .as_ref()
            .and_then(|photo| photo.url_at(1))
            .map(str::to_string)
            .ok_or_else(|| {
                ChatParseError::missing_field("authorPhoto.thumbnails[1].url", "chat item")
            })?;

        Ok(AuthorDetails {
            badges,
            channel_url: format!("{}{}", self.channel_prefix, channel_id),
            channel_id,
            name,
            image_url,
        })
    }

    /// Drop the raw item. Further extraction calls fail with `IllegalFunctionCall`.
    pub fn release(&mut self) {
        self.renderer = None;
    }

    pub fn is_released(&self) -> bool {
        self.renderer.is_none()
    }

    /// Extract every field, then release the raw item.
    pub fn render(mut self) -> ChatResult<ChatSnippet> {
        let snippet = self.extract_snippet()?;
        let author = self.extract_author_details()?;
        self.release();

        trace!(chat_type = %snippet.chat_type, id = ?snippet.id, "Chat item rendered");

        Ok(ChatSnippet { snippet, author })
    }
}

/// Join the runs of a message into text and a parallel list of pieces.
///
/// Emoji runs contribute their first shortcut to the text and their second
/// thumbnail URL to the pieces. `null` runs are skipped, and a run whose
/// `emoji` is `{}` counts as text.
pub fn extract_message(message: Option<&Message>) -> ChatResult<(String, Vec<MessagePiece>)> {
    let mut text = String::new();
    let mut pieces = Vec::new();

    let runs = message.and_then(|message| message.runs.as_ref());
    for run in runs.into_iter().flatten().flatten() {
        if let Some(emoji) = &run.emoji {
            let shortcut = emoji
                .shortcuts
                .as_ref()
                .and_then(|shortcuts| shortcuts.first())
                .map(String::as_str)
                .unwrap_or("");
            let url = emoji
                .image
                .as_ref()
                .and_then(|image| image.url_at(1))
                .ok_or_else(|| ChatParseError::missing_field("image.thumbnails[1].url", "emoji"))?;
            text.push_str(shortcut);
            pieces.push(MessagePiece::EmojiUrl(url.to_string()));
        } else {
            let run_text = run.text.as_deref().unwrap_or("");
            text.push_str(run_text);
            pieces.push(MessagePiece::Text(run_text.to_string()));
        }
    }

    Ok((text, pieces))
}

/// Scan author badges into status flags.
///
/// Icon badges set verified/owner/moderator. A custom thumbnail marks a
/// membership badge and provides the sponsor badge URL. One badge may do both.
pub fn scan_badges(badges: Option<&[AuthorBadge]>) -> ChatResult<Badges> {
    let mut flags = Badges::default();

    for badge in badges.unwrap_or_default() {
        let renderer = &badge.renderer;
        if let Some(icon) = &renderer.icon {
            let icon_type = icon
                .icon_type
                .as_deref()
                .ok_or_else(|| ChatParseError::missing_field("icon.iconType", "author badge"))?;
            match icon_type {
                "VERIFIED" => flags.is_verified = true,
                "OWNER" => flags.is_chat_owner = true,
                "MODERATOR" => flags.is_chat_moderator = true,
                _ => {}
            }
        }
        if let Some(thumbnail) = &renderer.custom_thumbnail {
            flags.is_chat_sponsor = true;
            let url = thumbnail.url_at(0).ok_or_else(|| {
                ChatParseError::missing_field("customThumbnail.thumbnails[0].url", "author badge")
            })?;
            flags.sponsor_badge_url = Some(url.to_string());
        }
    }

    Ok(flags)
}

fn format_datetime(timestamp_usec: i64) -> ChatResult<String> {
    let datetime = DateTime::from_timestamp_micros(timestamp_usec)
        .ok_or_else(|| ChatParseError::invalid_number("timestampUsec", timestamp_usec))?;
    Ok(datetime
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text_item() -> Value {
        json!({
            "liveChatTextMessageRenderer": {
                "id": "msg-1",
                "timestampUsec": "1590000000123456",
                "message": { "runs": [{ "text": "hi" }] },
                "authorExternalChannelId": "UCabc",
                "authorName": { "simpleText": "alice" },
                "authorPhoto": { "thumbnails": [
                    { "url": "http://img/32.jpg" },
                    { "url": "http://img/64.jpg" }
                ] },
                "contextMenuEndpoint": {
                    "liveChatItemContextMenuEndpoint": { "params": "ctx-params" }
                }
            }
        })
    }

    fn badges(value: Value) -> Vec<AuthorBadge> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_message_text_and_emoji() {
        let message: Message = serde_json::from_value(json!({
            "runs": [
                { "text": "hello " },
                { "emoji": {
                    "shortcuts": [":smile:"],
                    "image": { "thumbnails": [{}, { "url": "http://x/img.png" }] }
                } }
            ]
        }))
        .unwrap();

        let (text, pieces) = extract_message(Some(&message)).unwrap();
        assert_eq!(text, "hello :smile:");
        let pieces: Vec<&str> = pieces.iter().map(MessagePiece::as_str).collect();
        assert_eq!(pieces, vec!["hello ", "http://x/img.png"]);
    }

    #[test]
    fn test_message_without_runs() {
        let (text, pieces) = extract_message(None).unwrap();
        assert!(text.is_empty());
        assert!(pieces.is_empty());

        let message: Message = serde_json::from_value(json!({ "runs": [null, { "text": "a" }] })).unwrap();
        let (text, pieces) = extract_message(Some(&message)).unwrap();
        assert_eq!(text, "a");
        assert_eq!(pieces, vec![MessagePiece::Text("a".to_string())]);
    }

    #[test]
    fn test_emoji_without_shortcut() {
        let message: Message = serde_json::from_value(json!({
            "runs": [{ "emoji": { "image": { "thumbnails": [{ "url": "s" }, { "url": "l" }] } } }]
        }))
        .unwrap();
        let (text, pieces) = extract_message(Some(&message)).unwrap();
        assert_eq!(text, "");
        assert_eq!(pieces, vec![MessagePiece::EmojiUrl("l".to_string())]);
    }

    #[test]
    fn test_empty_emoji_is_plain_text() {
        let message: Message =
            serde_json::from_value(json!({ "runs": [{ "text": "a", "emoji": {} }] })).unwrap();
        let (text, pieces) = extract_message(Some(&message)).unwrap();
        assert_eq!(text, "a");
        assert_eq!(pieces, vec![MessagePiece::Text("a".to_string())]);
    }

    #[test]
    fn test_badge_scan_empty_icon_and_thumbnail() {
        let list = badges(json!([
            { "liveChatAuthorBadgeRenderer": { "icon": {}, "customThumbnail": {} } }
        ]));
        assert_eq!(scan_badges(Some(list.as_slice())).unwrap(), Badges::default());

        let list = badges(json!([
            { "liveChatAuthorBadgeRenderer": {
                "icon": {},
                "customThumbnail": { "thumbnails": [{ "url": "http://badge/16.png" }] }
            } }
        ]));
        let flags = scan_badges(Some(list.as_slice())).unwrap();
        assert!(flags.is_chat_sponsor);
        assert!(!flags.is_verified && !flags.is_chat_owner && !flags.is_chat_moderator);
    }

    #[test]
    fn test_badge_scan_moderator() {
        let list = badges(json!([
            { "liveChatAuthorBadgeRenderer": { "icon": { "iconType": "MODERATOR" } } }
        ]));
        let flags = scan_badges(Some(list.as_slice())).unwrap();
        assert!(flags.is_chat_moderator);
        assert!(!flags.is_verified);
        assert!(!flags.is_chat_owner);
        assert!(!flags.is_chat_sponsor);
        assert_eq!(flags.sponsor_badge_url, None);
    }

    #[test]
    fn test_badge_scan_sponsor() {
        let list = badges(json!([
            { "liveChatAuthorBadgeRenderer": {
                "customThumbnail": { "thumbnails": [{ "url": "http://badge/16.png" }] }
            } }
        ]));
        let flags = scan_badges(Some(list.as_slice())).unwrap();
        assert!(flags.is_chat_sponsor);
        assert_eq!(flags.sponsor_badge_url.as_deref(), Some("http://badge/16.png"));
        assert!(!flags.is_chat_moderator);
    }

    #[test]
    fn test_badge_scan_combined_and_absent() {
        let list = badges(json!([
            { "liveChatAuthorBadgeRenderer": { "icon": { "iconType": "VERIFIED" } } },
            { "liveChatAuthorBadgeRenderer": {
                "icon": { "iconType": "OWNER" },
                "customThumbnail": { "thumbnails": [{ "url": "u" }] }
            } }
        ]));
        let flags = scan_badges(Some(list.as_slice())).unwrap();
        assert!(flags.is_verified && flags.is_chat_owner && flags.is_chat_sponsor);
        assert!(!flags.is_chat_moderator);

        assert_eq!(scan_badges(None).unwrap(), Badges::default());
    }

    #[test]
    fn test_render_text_message() {
        let snippet = Renderer::new(text_item(), ChatType::TextMessage)
            .unwrap()
            .render()
            .unwrap();

        assert_eq!(snippet.snippet.chat_type, ChatType::TextMessage);
        assert_eq!(snippet.snippet.id.as_deref(), Some("msg-1"));
        assert_eq!(snippet.snippet.timestamp, 1590000000123);
        assert_eq!(snippet.snippet.elapsed_time, "");
        assert_eq!(snippet.snippet.message, "hi");
        assert_eq!(snippet.snippet.params, "ctx-params");
        assert_eq!(snippet.snippet.datetime.len(), "2020-05-20 18:40:00".len());

        assert_eq!(snippet.author.channel_id, "UCabc");
        assert_eq!(snippet.author.channel_url, "http://www.youtube.com/channel/UCabc");
        assert_eq!(snippet.author.name, "alice");
        assert_eq!(snippet.author.image_url, "http://img/64.jpg");
        assert_eq!(snippet.author.badges, Badges::default());
    }

    #[test]
    fn test_datetime_matches_local_time() {
        let expected = DateTime::from_timestamp(1_590_000_000, 0)
            .unwrap()
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();
        assert_eq!(format_datetime(1_590_000_000_000_000).unwrap(), expected);
    }

    #[test]
    fn test_missing_context_menu_fails() {
        let mut item = text_item();
        item["liveChatTextMessageRenderer"]
            .as_object_mut()
            .unwrap()
            .remove("contextMenuEndpoint");
        let renderer = Renderer::new(item, ChatType::TextMessage).unwrap();
        assert!(matches!(
            renderer.extract_snippet(),
            Err(ChatParseError::MissingField { .. })
        ));
        // author details do not depend on the context menu
        assert!(renderer.extract_author_details().is_ok());
    }

    #[test]
    fn test_missing_author_photo_fails() {
        let mut item = text_item();
        item["liveChatTextMessageRenderer"]["authorPhoto"] = json!({ "thumbnails": [{ "url": "only" }] });
        let renderer = Renderer::new(item, ChatType::TextMessage).unwrap();
        match renderer.extract_author_details() {
            Err(ChatParseError::MissingField { field, .. }) => assert!(field.contains("authorPhoto")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_release_drops_item() {
        let mut renderer = Renderer::new(text_item(), ChatType::SuperChat)
            .unwrap()
            .with_channel_prefix("https://youtube.com/channel/");
        let author = renderer.extract_author_details().unwrap();
        assert_eq!(author.channel_url, "https://youtube.com/channel/UCabc");

        renderer.release();
        assert!(renderer.is_released());
        assert!(matches!(
            renderer.extract_snippet(),
            Err(ChatParseError::IllegalFunctionCall(_))
        ));
    }

    #[test]
    fn test_elapsed_time_and_missing_timestamp() {
        let mut item = text_item();
        let body = &mut item["liveChatTextMessageRenderer"];
        body["timestampText"] = json!({ "simpleText": "1:02" });
        body.as_object_mut().unwrap().remove("timestampUsec");

        let snippet = Renderer::new(item, ChatType::TextMessage)
            .unwrap()
            .extract_snippet()
            .unwrap();
        assert_eq!(snippet.elapsed_time, "1:02");
        assert_eq!(snippet.timestamp, 0);
    }

    #[test]
    fn test_invalid_item_shape() {
        assert!(matches!(
            Renderer::new(json!({}), ChatType::TextMessage),
            Err(ChatParseError::MissingField { .. })
        ));
        assert!(matches!(
            Renderer::new(json!({ "liveChatTextMessageRenderer": { "id": 5 } }), ChatType::TextMessage),
            Err(ChatParseError::Json(_))
        ));
    }

    #[test]
    fn test_chat_type_tags() {
        assert_eq!(
            ChatType::from_renderer_key("liveChatPaidMessageRenderer"),
            Some(ChatType::SuperChat)
        );
        assert_eq!(ChatType::from_renderer_key("liveChatPlaceholderItemRenderer"), None);
        assert_eq!(ChatType::NewSponsor.to_string(), "newSponsor");
        assert_eq!(
            serde_json::to_value(ChatType::SuperSticker).unwrap(),
            json!("superSticker")
        );
    }

    #[test]
    fn test_snippet_serialization() {
        let snippet = Renderer::new(text_item(), ChatType::TextMessage)
            .unwrap()
            .render()
            .unwrap();
        let value = serde_json::to_value(&snippet).unwrap();
        assert_eq!(value["type"], "textMessage");
        assert_eq!(value["messageEx"], json!(["hi"]));
        assert_eq!(value["author"]["isChatOwner"], false);
        assert_eq!(value["author"]["channelUrl"], "http://www.youtube.com/channel/UCabc");
    }
}
