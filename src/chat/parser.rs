//! Parser of live chat continuation JSON.
//!
//! The parser validates a fetched response, classifies its continuation entry,
//! turns replay action envelopes into the live action shape and works out how
//! long the transport should wait before fetching the next page.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::continuation::{classify, present, Classified, ContinuationKind, PLAYER_SEEK_KEY};
use super::dispatch;
use super::error::{ChatParseError, ChatResult};
use super::renderer::ChatSnippet;
use crate::config::ParserConfig;

/// Wrapper key of an archived chat action.
pub const REPLAY_ACTION_KEY: &str = "replayChatItemAction";

/// Anti-forgery and session values echoed back on the next request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken {
    pub xsrf_token: Option<String>,
    pub csn: Option<String>,
}

/// Metadata of one parsed page, handed to the transport.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Continuation variant the page was classified as
    pub kind: ContinuationKind,
    /// Token for fetching the next page
    pub continuation: Option<String>,
    /// Delay before the next fetch, in milliseconds
    pub timeout_ms: i64,
    /// Session token pair for the next request
    pub token: SessionToken,
    /// Remaining fields of the continuation data
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Metadata {
    /// Polling delay as a `Duration`. Negative intervals become zero.
    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms.max(0) as u64)
    }
}

#[derive(Debug, Deserialize)]
struct RawResponse {
    response: ResponseBody,
    #[serde(default)]
    xsrf_token: Option<String>,
    #[serde(default)]
    csn: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseBody {
    response_context: ResponseContext,
    #[serde(default)]
    continuation_contents: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ResponseContext {
    #[serde(default)]
    errors: Option<Value>,
}

/// Continuation parser for one chat stream.
///
/// The live/replay mode is fixed at construction. The session token pair seen
/// by the last [`Parser::extract_contents`] call is attached to every
/// [`Metadata`] produced afterwards.
#[derive(Debug, Clone)]
pub struct Parser {
    config: ParserConfig,
    token: SessionToken,
}

impl Parser {
    pub fn new(is_replay: bool) -> Self {
        Self::with_config(ParserConfig::with_mode(is_replay))
    }

    pub fn with_config(config: ParserConfig) -> Self {
        Self {
            config,
            token: SessionToken::default(),
        }
    }

    pub fn is_replay(&self) -> bool {
        self.config.is_replay
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Session token pair captured by the last `extract_contents` call.
    pub fn session_token(&self) -> &SessionToken {
        &self.token
    }

    /// Validate a raw response and take its continuation contents.
    ///
    /// # Arguments
    /// * `raw` - The fetched payload, `None` if nothing was fetched yet
    ///
    /// # Returns
    /// The `continuationContents` object, `None` when the round produced none
    ///
    /// # Errors
    /// * `IllegalFunctionCall` when `raw` is `None`
    /// * `ResponseContextError` when the response context reports errors
    pub fn extract_contents(&mut self, raw: Option<Value>) -> ChatResult<Option<Value>> {
        let raw = raw.ok_or_else(|| {
            ChatParseError::IllegalFunctionCall("Called with None at JSON parameter.".to_string())
        })?;
        let raw: RawResponse = serde_json::from_value(raw)?;

        if let Some(errors) = raw.response.response_context.errors.filter(has_errors) {
            warn!(errors = %errors, "❌ Response context reported errors");
            return Err(ChatParseError::ResponseContextError(errors.to_string()));
        }

        self.token = SessionToken {
            xsrf_token: raw.xsrf_token,
            csn: raw.csn,
        };

        Ok(raw.response.continuation_contents.filter(|c| !c.is_null()))
    }

    /// Classify the continuation entry and normalize the action list.
    ///
    /// # Arguments
    /// * `contents` - The `continuationContents` object from `extract_contents`
    ///
    /// # Returns
    /// The page metadata and the actions in live shape
    pub fn parse(&self, contents: Option<Value>) -> ChatResult<(Metadata, Vec<Value>)> {
        let mut contents = contents.ok_or(ChatParseError::NoContents)?;
        let live = live_chat_continuation_mut(&mut contents)?;

        let (kind, data) = {
            let entry = first_continuation(live)?;
            match classify(entry) {
                Classified::Known(kind, data) => (kind, data.clone()),
                Classified::PlayerSeek(_) => return Err(ChatParseError::ChatDataFinished),
                Classified::Unknown(key) => {
                    warn!(key, "⚠️ Received unknown continuation type");
                    return Err(ChatParseError::ReceivedUnknownContinuation {
                        key: key.to_string(),
                    });
                }
                Classified::Empty => return Err(ChatParseError::FailedExtractContinuation),
            }
        };

        let actions: Option<Vec<Value>> = match live.remove("actions") {
            Some(actions) => serde_json::from_value(actions)?,
            None => None,
        };

        self.normalize(kind, data, actions)
    }

    /// Find the redirect token of a "from the start" request.
    ///
    /// Only meaningful for the first fetch of a session that asked for the
    /// stream from its beginning. YouTube sometimes answers such a request with
    /// a player seek redirect instead of chat data.
    ///
    /// # Returns
    /// `None` when the page already carries replay data, otherwise the seek
    /// continuation token (which may itself be absent)
    pub fn resolve_initial_continuation(&self, contents: Option<&Value>) -> ChatResult<Option<String>> {
        let contents = contents.ok_or(ChatParseError::NoContents)?;
        let live = contents
            .get("liveChatContinuation")
            .and_then(Value::as_object)
            .ok_or(ChatParseError::NoContinuation)?;
        let entry = first_continuation(live)?;

        if present(entry, ContinuationKind::Replay.key()).is_some() {
            return Ok(None);
        }
        if let Some(seek) = present(entry, PLAYER_SEEK_KEY) {
            let token = seek
                .get("continuation")
                .and_then(Value::as_str)
                .map(str::to_string);
            debug!(has_token = token.is_some(), "Initial request redirected by player seek");
            return Ok(token);
        }
        Err(ChatParseError::ChatDataFinished)
    }

    /// Render the chat items of a parsed page, using the configured channel
    /// URL prefix.
    pub fn render_actions(&self, actions: Vec<Value>) -> ChatResult<Vec<ChatSnippet>> {
        dispatch::render_actions(actions, &self.config.channel_url_prefix)
    }

    fn normalize(
        &self,
        kind: ContinuationKind,
        mut data: Map<String, Value>,
        actions: Option<Vec<Value>>,
    ) -> ChatResult<(Metadata, Vec<Value>)> {
        // An explicit timeoutMs is kept as-is, zero included.
        let mut timeout_ms = match data.remove("timeoutMs") {
            Some(value) => Some(parse_integer("timeoutMs", &value)?),
            None => None,
        };
        let continuation = match data.remove("continuation") {
            Some(Value::String(token)) => Some(token),
            Some(other) => {
                data.insert("continuation".to_string(), other);
                None
            }
            None => None,
        };

        let actions = if self.config.is_replay {
            let actions = actions.unwrap_or_default();
            let interval = replay_interval(&actions)?;
            debug!(interval, actions = actions.len(), "Replay interval computed");
            timeout_ms.get_or_insert(interval);
            unwrap_replay_actions(actions)?
        } else {
            actions.unwrap_or_default()
        };

        let metadata = Metadata {
            kind,
            continuation,
            timeout_ms: timeout_ms.unwrap_or(self.config.default_timeout_ms),
            token: self.token.clone(),
            extra: data,
        };

        debug!(
            kind = %metadata.kind,
            timeout_ms = metadata.timeout_ms,
            actions = actions.len(),
            "Continuation parsed"
        );

        Ok((metadata, actions))
    }
}

fn has_errors(errors: &Value) -> bool {
    match errors {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Number(number) => number.as_f64() != Some(0.0),
    }
}

fn live_chat_continuation_mut(contents: &mut Value) -> ChatResult<&mut Map<String, Value>> {
    contents
        .get_mut("liveChatContinuation")
        .and_then(Value::as_object_mut)
        .ok_or(ChatParseError::NoContinuation)
}

fn first_continuation(live: &Map<String, Value>) -> ChatResult<&Map<String, Value>> {
    live.get("continuations")
        .and_then(Value::as_array)
        .and_then(|continuations| continuations.first())
        .and_then(Value::as_object)
        .ok_or(ChatParseError::NoContinuation)
}

/// Read an integer that YouTube sends either as a number or a numeric string.
fn parse_integer(field: &str, value: &Value) -> ChatResult<i64> {
    let parsed = match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| ChatParseError::invalid_number(field, value))
}

fn video_offset(action: &Value) -> ChatResult<i64> {
    let offset = action
        .get(REPLAY_ACTION_KEY)
        .ok_or_else(|| ChatParseError::missing_field(REPLAY_ACTION_KEY, "replay action"))?
        .get("videoOffsetTimeMsec")
        .ok_or_else(|| ChatParseError::missing_field("videoOffsetTimeMsec", REPLAY_ACTION_KEY))?;
    parse_integer("videoOffsetTimeMsec", offset)
}

/// Offset of the last action minus offset of the first, 0 for no actions.
fn replay_interval(actions: &[Value]) -> ChatResult<i64> {
    let (Some(first), Some(last)) = (actions.first(), actions.last()) else {
        return Ok(0);
    };
    Ok(video_offset(last)?.saturating_sub(video_offset(first)?))
}

fn unwrap_replay_actions(actions: Vec<Value>) -> ChatResult<Vec<Value>> {
    actions
        .into_iter()
        .enumerate()
        .map(|(index, action)| unwrap_envelope(index, action))
        .collect()
}

fn unwrap_envelope(index: usize, mut action: Value) -> ChatResult<Value> {
    let inner = action
        .get_mut(REPLAY_ACTION_KEY)
        .and_then(|envelope| envelope.get_mut("actions"))
        .map(Value::take)
        .ok_or_else(|| ChatParseError::missing_field("actions", REPLAY_ACTION_KEY))?;

    let mut inner: Vec<Value> = serde_json::from_value(inner)?;
    match inner.pop() {
        Some(action) if inner.is_empty() => Ok(action),
        popped => Err(ChatParseError::MalformedReplayEnvelope {
            index,
            count: inner.len() + usize::from(popped.is_some()),
        }),
    }
}
