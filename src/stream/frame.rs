//! Frame splitting and payload parsing.
//!
//! The response body is a sequence of newline-delimited lines. A line is a
//! frame only when it starts with [`DATA_PREFIX`]; its payload is either
//! [`DONE_SENTINEL`] or a JSON record with optional `text` and `credits`.

use serde::Deserialize;

/// Prefix marking a meaningful frame.
pub const DATA_PREFIX: &str = "data: ";

/// Payload that marks a normal end of stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// The structured record carried by a data frame.
///
/// Both fields are optional and independent. A zero balance is a real value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FramePayload {
    /// Incremental translated text
    #[serde(default)]
    pub text: Option<String>,
    /// New credit balance for the logged-in user
    #[serde(default)]
    pub credits: Option<f64>,
}

/// A classified line of the response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Line without the data prefix
    Ignored,
    /// The end-of-stream sentinel
    Done,
    /// A successfully parsed record
    Payload(FramePayload),
    /// A data line whose payload did not parse
    Malformed {
        /// Raw payload text
        payload: String,
        /// Parser error message
        error: String,
    },
}

impl Frame {
    /// Classifies one complete line (without its newline).
    ///
    /// A trailing carriage return is tolerated so CRLF bodies parse the same.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let line = line.strip_suffix('\r').unwrap_or(line);

        let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
            return Self::Ignored;
        };

        if payload.trim() == DONE_SENTINEL {
            return Self::Done;
        }

        match serde_json::from_str::<FramePayload>(payload) {
            Ok(record) => Self::Payload(record),
            Err(e) => Self::Malformed {
                payload: payload.to_string(),
                error: e.to_string(),
            },
        }
    }
}

/// Pending-text window that hands out complete lines.
#[derive(Debug, Clone, Default)]
pub struct LineBuffer {
    /// Text after the last newline seen so far
    pending: String,
}

impl LineBuffer {
    /// Creates an empty line buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends decoded text and returns every line it completed.
    pub fn push(&mut self, text: &str) -> Vec<String> {
        self.pending.push_str(text);

        let Some(last_newline) = self.pending.rfind('\n') else {
            return Vec::new();
        };

        let rest = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, rest);
        complete.split_terminator('\n').map(str::to_owned).collect()
    }

    /// Takes the unterminated trailing line, if any.
    pub fn take_remainder(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending))
        }
    }

    /// Returns the text waiting for a newline.
    #[must_use]
    pub fn pending(&self) -> &str {
        &self.pending
    }
}
