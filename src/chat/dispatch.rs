//! Dispatch of normalized actions to the renderer.
//!
//! Only `addChatItemAction`s whose item carries one of the known
//! `liveChat*Renderer` keys are rendered. Deletions, tickers, moderation
//! commands and placeholder items are skipped.

use serde_json::Value;
use tracing::debug;

use super::error::ChatResult;
use super::renderer::{ChatSnippet, ChatType, Renderer};

pub const ADD_CHAT_ITEM_KEY: &str = "addChatItemAction";

/// Chat type and item object of a renderable action.
///
/// # Arguments
/// * `action` - One action in live shape, as returned by `Parser::parse`
///
/// # Returns
/// `None` for actions that are not chat items of a known type
pub fn classify_action(action: &Value) -> Option<(ChatType, &Value)> {
    let item = action.get(ADD_CHAT_ITEM_KEY)?.get("item")?;
    let (key, _) = item.as_object()?.iter().next()?;
    ChatType::from_renderer_key(key).map(|chat_type| (chat_type, item))
}

/// Render every chat item action, in order.
///
/// Each renderer is released as soon as its snippet is built. The first
/// rendering failure aborts the page.
pub fn render_actions(actions: Vec<Value>, channel_prefix: &str) -> ChatResult<Vec<ChatSnippet>> {
    let total = actions.len();
    let mut snippets = Vec::with_capacity(total);

    for mut action in actions {
        let Some(chat_type) = classify_action(&action).map(|(chat_type, _)| chat_type) else {
            continue;
        };
        let item = action[ADD_CHAT_ITEM_KEY]["item"].take();
        let snippet = Renderer::new(item, chat_type)?
            .with_channel_prefix(channel_prefix)
            .render()?;
        snippets.push(snippet);
    }

    debug!(
        rendered = snippets.len(),
        skipped = total - snippets.len(),
        "Actions rendered"
    );

    Ok(snippets)
}
