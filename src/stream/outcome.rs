//! Terminal results of a stream session.

use std::fmt;

/// Text shown in place of a translation when the session failed.
///
/// Callers that only handle strings detect failure by comparing against this
/// value. It can never be produced by a real translation stream because
/// failures never carry partial content.
pub const FAILURE_MARKER: &str = "An error occurred while translating. Please try again later.";

/// The final value of a stream session.
#[derive(Debug, Clone, PartialEq)]
pub enum TranslationOutcome {
    /// The stream ended normally with the full accumulated text
    Completed(String),
    /// A transport error ended the session
    Failed {
        /// What went wrong, for logs and diagnostics
        reason: String,
    },
}

impl TranslationOutcome {
    /// Creates a failed outcome.
    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    /// Returns true if the session failed.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Returns the text to display: the translation, or [`FAILURE_MARKER`].
    #[must_use]
    pub fn display_text(&self) -> &str {
        match self {
            Self::Completed(text) => text,
            Self::Failed { .. } => FAILURE_MARKER,
        }
    }

    /// Converts into a `Result`, with the failure reason as the error.
    pub fn into_result(self) -> Result<String, String> {
        match self {
            Self::Completed(text) => Ok(text),
            Self::Failed { reason } => Err(reason),
        }
    }
}

impl fmt::Display for TranslationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_text())
    }
}

/// How a stream session ended.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamTermination {
    /// The session delivered its final outcome
    Finished(TranslationOutcome),
    /// The caller stopped the session; no final outcome was delivered
    Cancelled,
}

impl StreamTermination {
    /// Returns the outcome if the session finished.
    #[must_use]
    pub fn outcome(&self) -> Option<&TranslationOutcome> {
        match self {
            Self::Finished(outcome) => Some(outcome),
            Self::Cancelled => None,
        }
    }

    /// Returns true if the session was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
