pub mod chat;
pub mod config;
pub mod io;
pub mod logging;

pub use chat::{dispatch, parser, renderer};

// Re-export the main types for convenience
pub use chat::{
    ChatParseError, ChatResult, ChatSnippet, ChatType, ContinuationKind, ErrorClass,
    MessagePiece, Metadata, Parser, Renderer, SessionToken,
};
pub use config::ParserConfig;

// Re-export I/O utilities for convenience
pub use io::{read_captures, replay_captures, CaptureEntry, CaptureError};
