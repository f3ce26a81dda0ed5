//! Continuation variants of a live chat continuation entry.
//!
//! A `liveChatContinuation.continuations[0]` object carries one of four
//! keys. They are checked in [`ContinuationKind::PRIORITY`] order and the first
//! one present wins. Payloads normally carry exactly one, but nothing upstream
//! guarantees it, so the order is part of the parser's behavior.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key YouTube uses to redirect a replay request to a seek position.
pub const PLAYER_SEEK_KEY: &str = "playerSeekContinuationData";

/// Known continuation variants.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "camelCase")]
pub enum ContinuationKind {
    /// `invalidationContinuationData` - live chat pushed by invalidation
    #[display("invalidation")]
    Invalidation,
    /// `timedContinuationData` - live chat polled on a fixed timer
    #[display("timed")]
    Timed,
    /// `reloadContinuationData` - initial or reloaded page
    #[display("reload")]
    Reload,
    /// `liveChatReplayContinuationData` - archived chat of a finished stream
    #[display("replay")]
    Replay,
}

impl ContinuationKind {
    /// Classification order. The first key present in an entry decides the variant.
    pub const PRIORITY: [ContinuationKind; 4] = [
        ContinuationKind::Invalidation,
        ContinuationKind::Timed,
        ContinuationKind::Reload,
        ContinuationKind::Replay,
    ];

    /// JSON key of this variant inside a continuation entry.
    pub fn key(self) -> &'static str {
        match self {
            ContinuationKind::Invalidation => "invalidationContinuationData",
            ContinuationKind::Timed => "timedContinuationData",
            ContinuationKind::Reload => "reloadContinuationData",
            ContinuationKind::Replay => "liveChatReplayContinuationData",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::PRIORITY.into_iter().find(|kind| kind.key() == key)
    }
}

/// Result of classifying one continuation entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Classified<'a> {
    /// A known variant and its data object.
    Known(ContinuationKind, &'a Map<String, Value>),
    /// No known variant, but a player seek redirect is present.
    PlayerSeek(&'a Value),
    /// No known variant; carries the first key of the entry.
    Unknown(&'a str),
    /// The entry has no keys at all.
    Empty,
}

/// Look up `key` in `entry`, treating `null` and empty objects as absent.
pub(crate) fn present<'a>(entry: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    match entry.get(key)? {
        Value::Null => None,
        Value::Object(map) if map.is_empty() => None,
        value => Some(value),
    }
}

/// Classify a continuation entry.
///
/// Known variants whose data is not an object are skipped, like absent ones.
pub fn classify(entry: &Map<String, Value>) -> Classified<'_> {
    let known = ContinuationKind::PRIORITY.into_iter().find_map(|kind| {
        present(entry, kind.key())
            .and_then(Value::as_object)
            .map(|data| (kind, data))
    });
    if let Some((kind, data)) = known {
        return Classified::Known(kind, data);
    }
    if let Some(seek) = present(entry, PLAYER_SEEK_KEY) {
        return Classified::PlayerSeek(seek);
    }
    match entry.keys().next() {
        Some(key) if !key.is_empty() => Classified::Unknown(key),
        _ => Classified::Empty,
    }
}
