//! Error types for continuation parsing and chat item rendering.
//!
//! Every failure the parser or renderer can raise is a variant of
//! [`ChatParseError`]. Callers decide whether to retry a fetch, stop polling,
//! or report an upstream format change by looking at [`ChatParseError::class`].

use thiserror::Error;

/// How a caller should react to a [`ChatParseError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum ErrorClass {
    /// Incorrect call sequencing; a bug in the caller.
    #[display("misuse")]
    Misuse,
    /// The stream is over or unusable; stop polling.
    #[display("terminal")]
    Terminal,
    /// The payload round was empty or incomplete; fetch again.
    #[display("transient")]
    Transient,
    /// YouTube sent a continuation shape this crate does not know.
    #[display("schema-drift")]
    SchemaDrift,
    /// A required field of a chat item or envelope is missing or unreadable.
    #[display("malformed")]
    Malformed,
}

/// Errors raised while extracting contents, classifying continuations or
/// rendering chat items.
#[derive(Error, Debug)]
pub enum ChatParseError {
    /// Called with no payload, or after the data it needs was released
    #[error("Illegal function call: {0}")]
    IllegalFunctionCall(String),

    /// The response context reported errors (removed, private or wrong video id)
    #[error("The video_id would be wrong, or video is deleted or private: {0}")]
    ResponseContextError(String),

    /// No continuation contents in this round
    #[error("Chat data stream is empty")]
    NoContents,

    /// Continuation contents without a continuation entry
    #[error("No continuation")]
    NoContinuation,

    /// Playback reached the end of the archived chat
    #[error("Finished chat data")]
    ChatDataFinished,

    /// The continuation entry carries a key this parser does not recognize
    #[error("Received unknown continuation type: {key}")]
    ReceivedUnknownContinuation { key: String },

    /// The continuation entry is empty
    #[error("Cannot extract continuation data")]
    FailedExtractContinuation,

    /// A replay envelope did not wrap exactly one inner action
    #[error("Replay envelope #{index} wraps {count} actions, expected exactly one")]
    MalformedReplayEnvelope { index: usize, count: usize },

    /// Missing required field in data structure
    #[error("Missing required field '{field}' in {structure}")]
    MissingField { field: String, structure: String },

    /// A numeric field holds something that is not an integer
    #[error("Invalid number in '{field}': {value}")]
    InvalidNumber { field: String, value: String },

    /// The payload does not deserialize into the expected shape
    #[error("JSON shape error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ChatParseError {
    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>, structure: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
            structure: structure.into(),
        }
    }

    /// Create an invalid number error
    pub fn invalid_number(field: impl Into<String>, value: impl ToString) -> Self {
        Self::InvalidNumber {
            field: field.into(),
            value: value.to_string(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::IllegalFunctionCall(_) => ErrorClass::Misuse,
            Self::ResponseContextError(_) | Self::ChatDataFinished => ErrorClass::Terminal,
            Self::NoContents | Self::NoContinuation | Self::FailedExtractContinuation => {
                ErrorClass::Transient
            }
            Self::ReceivedUnknownContinuation { .. } => ErrorClass::SchemaDrift,
            Self::MalformedReplayEnvelope { .. }
            | Self::MissingField { .. }
            | Self::InvalidNumber { .. }
            | Self::Json(_) => ErrorClass::Malformed,
        }
    }

    /// True when the caller should stop polling this stream.
    pub fn is_terminal(&self) -> bool {
        self.class() == ErrorClass::Terminal
    }

    /// True when fetching the same page again is a reasonable reaction.
    pub fn is_retryable(&self) -> bool {
        matches!(self.class(), ErrorClass::Transient | ErrorClass::Malformed)
    }

    pub fn is_schema_drift(&self) -> bool {
        self.class() == ErrorClass::SchemaDrift
    }
}

/// Result alias used throughout the chat module.
pub type ChatResult<T> = Result<T, ChatParseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert_eq!(
            ChatParseError::IllegalFunctionCall("x".into()).class(),
            ErrorClass::Misuse
        );
        assert!(ChatParseError::ResponseContextError("x".into()).is_terminal());
        assert!(ChatParseError::ChatDataFinished.is_terminal());
        assert!(ChatParseError::NoContents.is_retryable());
        assert!(ChatParseError::NoContinuation.is_retryable());
        assert!(ChatParseError::FailedExtractContinuation.is_retryable());
        assert!(!ChatParseError::FailedExtractContinuation.is_terminal());

        let drift = ChatParseError::ReceivedUnknownContinuation {
            key: "fooBar".into(),
        };
        assert!(drift.is_schema_drift());
        assert!(!drift.is_retryable());
        assert!(!drift.is_terminal());
    }

    #[test]
    fn test_error_display() {
        let error = ChatParseError::ReceivedUnknownContinuation {
            key: "fooBar".into(),
        };
        assert!(format!("{}", error).contains("fooBar"));

        let error = ChatParseError::missing_field("authorName", "liveChatTextMessageRenderer");
        assert!(format!("{}", error).contains("authorName"));
        assert!(format!("{}", error).contains("liveChatTextMessageRenderer"));

        let error = ChatParseError::MalformedReplayEnvelope { index: 3, count: 2 };
        assert!(format!("{}", error).contains("#3"));
        assert_eq!(ErrorClass::SchemaDrift.to_string(), "schema-drift");
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let error: ChatParseError = json_error.into();
        assert_eq!(error.class(), ErrorClass::Malformed);
        assert!(std::error::Error::source(&error).is_some());
    }
}
