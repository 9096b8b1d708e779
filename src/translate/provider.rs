//! Translation providers and their model catalogues.

use crate::error::EasyTLError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An LLM provider the translation API can route a request to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Provider {
    /// OpenAI chat models
    #[default]
    OpenAI,
    /// Google Gemini models
    Gemini,
    /// Anthropic Claude models
    Anthropic,
}

impl Provider {
    /// Every supported provider, in display order.
    pub const ALL: [Provider; 3] = [Self::OpenAI, Self::Gemini, Self::Anthropic];

    /// Returns the wire name of this provider.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAI => "OpenAI",
            Self::Gemini => "Gemini",
            Self::Anthropic => "Anthropic",
        }
    }

    /// Returns the models offered for this provider.
    ///
    /// The first entry is the default selection.
    #[must_use]
    pub fn models(self) -> &'static [&'static str] {
        match self {
            Self::OpenAI => &["gpt-3.5-turbo", "gpt-4", "gpt-4-turbo", "gpt-4o", "gpt-4o-mini"],
            Self::Gemini => &["gemini-1.0-pro", "gemini-1.5-pro", "gemini-1.5-flash"],
            Self::Anthropic => &[
                "claude-3-haiku-20240307",
                "claude-3-sonnet-20240229",
                "claude-3-opus-20240229",
                "claude-3-5-sonnet-20240620",
            ],
        }
    }

    /// Returns the model selected when switching to this provider.
    #[must_use]
    pub fn default_model(self) -> &'static str {
        self.models()[0]
    }

    /// Returns true if `model` is in this provider's catalogue.
    #[must_use]
    pub fn supports_model(self, model: &str) -> bool {
        self.models().contains(&model)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = EasyTLError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                EasyTLError::configuration(
                    "provider",
                    format!("unknown provider '{s}'; expected one of OpenAI, Gemini, Anthropic"),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("openai".parse::<Provider>().unwrap(), Provider::OpenAI);
        assert_eq!(" GEMINI ".parse::<Provider>().unwrap(), Provider::Gemini);
        assert_eq!("Anthropic".parse::<Provider>().unwrap(), Provider::Anthropic);
    }

    #[test]
    fn parse_unknown_is_configuration_error() {
        let err = "mistral".parse::<Provider>().unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("mistral"));
    }

    #[test]
    fn default_model_is_first_in_catalogue() {
        assert_eq!(Provider::OpenAI.default_model(), "gpt-3.5-turbo");
        assert_eq!(Provider::Gemini.default_model(), "gemini-1.0-pro");
        assert_eq!(Provider::Anthropic.default_model(), "claude-3-haiku-20240307");
    }

    #[test]
    fn models_belong_to_one_provider() {
        assert!(Provider::OpenAI.supports_model("gpt-4o"));
        assert!(!Provider::Gemini.supports_model("gpt-4o"));
        assert!(Provider::Anthropic.supports_model("claude-3-5-sonnet-20240620"));
    }

    #[test]
    fn serializes_with_wire_name() {
        assert_eq!(serde_json::to_string(&Provider::OpenAI).unwrap(), "\"OpenAI\"");
        assert_eq!(Provider::Gemini.to_string(), "Gemini");
    }
}
