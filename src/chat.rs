//! YouTube live chat parsing.
//!
//! [`parser::Parser`] validates a fetched continuation response and returns its
//! metadata and actions; [`renderer::Renderer`] turns one chat item into a flat
//! [`renderer::ChatSnippet`]; [`dispatch`] connects the two.

pub mod continuation; // Continuation variant classification
pub mod dispatch;
pub mod error;
pub mod parser;
pub mod renderer;
pub mod schema; // Serde view of chat item renderers

pub use continuation::ContinuationKind;
pub use error::{ChatParseError, ChatResult, ErrorClass};
pub use parser::{Metadata, Parser, SessionToken};
pub use renderer::{ChatSnippet, ChatType, MessagePiece, Renderer};
