//! Serde view of a single chat item renderer.
//!
//! Every field is optional so that partially populated items deserialize.
//! The renderer decides which of them are required.

use serde::de::{DeserializeOwned, Deserializer, Error as _};
use serde::Deserialize;
use serde_json::Value;

/// Body of a `liveChat*Renderer` object inside an `addChatItemAction` item.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatItemRenderer {
    /// Unique identifier for the message
    pub id: Option<String>,
    /// Timestamp in microseconds when the message was sent
    pub timestamp_usec: Option<String>,
    /// Elapsed-time label shown in replays
    pub timestamp_text: Option<SimpleText>,
    /// Content of the message with text and/or emojis
    pub message: Option<Message>,
    /// External channel ID of the author
    pub author_external_channel_id: Option<String>,
    /// Name of the message author
    pub author_name: Option<SimpleText>,
    /// Profile photo of the message author
    pub author_photo: Option<Image>,
    /// Badges displayed next to the author's name
    pub author_badges: Option<Vec<AuthorBadge>>,
    /// Endpoint for context menu actions
    pub context_menu_endpoint: Option<ContextMenuEndpoint>,
}

/// Simple text container with plain text content.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleText {
    pub simple_text: Option<String>,
}

/// A message containing a sequence of text and/or emoji runs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Message {
    /// Runs may contain `null` entries, which are skipped
    pub runs: Option<Vec<Option<MessageRun>>>,
}

/// A fragment of a message, containing either text or an emoji.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageRun {
    pub text: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub emoji: Option<Emoji>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Emoji {
    /// Shortcut text strings to input this emoji
    pub shortcuts: Option<Vec<String>>,
    pub image: Option<Image>,
}

/// Image data with thumbnails of increasing size.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Image {
    #[serde(default)]
    pub thumbnails: Vec<Thumbnail>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Thumbnail {
    pub url: Option<String>,
}

/// Badge displayed next to an author's name.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorBadge {
    #[serde(rename = "liveChatAuthorBadgeRenderer")]
    pub renderer: AuthorBadgeRenderer,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorBadgeRenderer {
    /// Icon of a built-in badge (verified, owner, moderator)
    #[serde(default, deserialize_with = "non_empty")]
    pub icon: Option<Icon>,
    /// Custom thumbnail of a membership badge
    #[serde(default, deserialize_with = "non_empty")]
    pub custom_thumbnail: Option<Image>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Icon {
    pub icon_type: Option<String>,
}

/// Endpoint for context menu interactions.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextMenuEndpoint {
    pub live_chat_item_context_menu_endpoint: Option<LiveChatItemContextMenuEndpoint>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LiveChatItemContextMenuEndpoint {
    pub params: Option<String>,
}

impl Image {
    /// URL of the thumbnail at `index`, if both exist.
    pub fn url_at(&self, index: usize) -> Option<&str> {
        self.thumbnails.get(index)?.url.as_deref()
    }
}

/// `null` and `{}` both deserialize to `None`.
fn non_empty<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) if map.is_empty() => Ok(None),
        Some(value) => serde_json::from_value(value).map(Some).map_err(D::Error::custom),
    }
}
