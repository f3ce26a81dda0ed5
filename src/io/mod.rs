//! I/O utilities for captured live chat responses.
//!
//! This module provides utilities for reading NDJSON capture files and
//! feeding them through the continuation parser.

pub mod ndjson;

// Re-export commonly used types and functions
pub use ndjson::{read_captures, replay_captures, CaptureEntry, CaptureError};
