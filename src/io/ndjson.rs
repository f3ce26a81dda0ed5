//! NDJSON (Newline Delimited JSON) capture file processing.
//!
//! A capture file holds one fetched live chat response per line, either as the
//! raw payload or wrapped as `{"timestamp": <unix>, "response": <payload>}`.
//! Replaying a capture runs every payload through a [`Parser`] exactly as the
//! polling loop would.

use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use crate::chat::error::ChatResult;
use crate::chat::parser::{Metadata, Parser};

/// Error types for reading capture files.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// I/O error when reading files
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error at line {line}: {source}")]
    JsonParse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// Empty or invalid data
    #[error("No valid data found: {context}")]
    NoData { context: String },

    /// Generic error with context
    #[error("Error in {context}: {message}")]
    Generic { context: String, message: String },
}

impl CaptureError {
    /// Create a new generic error with context
    pub fn generic(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Generic {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Create a no data error
    pub fn no_data(context: impl Into<String>) -> Self {
        Self::NoData {
            context: context.into(),
        }
    }
}

/// One captured response.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureEntry {
    /// Unix timestamp when the response was received, if recorded
    pub timestamp: Option<u64>,
    /// The raw response payload
    pub payload: Value,
}

impl CaptureEntry {
    /// Split a capture line into timestamp and payload.
    ///
    /// Lines with a numeric `timestamp` and a `response` are treated as wrapped
    /// entries; anything else is taken as a bare payload.
    pub fn from_line(value: Value) -> Self {
        if let Value::Object(mut map) = value {
            let timestamp = map.get("timestamp").and_then(Value::as_u64);
            if let (Some(timestamp), true) = (timestamp, map.contains_key("response")) {
                return Self {
                    timestamp: Some(timestamp),
                    payload: map.remove("response").unwrap_or_default(),
                };
            }
            return Self {
                timestamp: None,
                payload: Value::Object(map),
            };
        }
        Self {
            timestamp: None,
            payload: value,
        }
    }
}

/// Read every entry of an NDJSON capture file.
///
/// # Arguments
/// * `path` - Path to the NDJSON file
///
/// # Returns
/// The entries in file order, or a CaptureError
pub fn read_captures(path: impl AsRef<Path>) -> Result<Vec<CaptureEntry>, CaptureError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        CaptureError::generic(
            "opening file",
            format!("Failed to open '{}': {}", path.display(), e),
        )
    })?;
    let reader = BufReader::new(file);
    let mut entries = Vec::new();

    for (line_number, line) in reader.lines().enumerate() {
        let line = line?;

        // Skip empty lines
        if line.trim().is_empty() {
            continue;
        }

        let value: Value = serde_json::from_str(&line).map_err(|e| CaptureError::JsonParse {
            line: line_number + 1,
            source: e,
        })?;
        entries.push(CaptureEntry::from_line(value));
    }

    if entries.is_empty() {
        return Err(CaptureError::no_data(format!(
            "No valid entries found in file '{}'",
            path.display()
        )));
    }

    debug!("📂 Read {} capture entries from {}", entries.len(), path.display());

    Ok(entries)
}

/// Run captured responses through `extract_contents` and `parse`.
///
/// Returns one result per replayed entry. Replay stops after the first
/// terminal error, which is the last element of the returned list.
pub fn replay_captures(
    parser: &mut Parser,
    entries: Vec<CaptureEntry>,
) -> Vec<ChatResult<(Metadata, Vec<Value>)>> {
    let mut results = Vec::with_capacity(entries.len());

    for entry in entries {
        let result = parser
            .extract_contents(Some(entry.payload))
            .and_then(|contents| parser.parse(contents));
        let terminal = matches!(&result, Err(error) if error.is_terminal());
        results.push(result);
        if terminal {
            info!("🛑 Capture replay stopped at entry {}", results.len());
            break;
        }
    }

    results
}
