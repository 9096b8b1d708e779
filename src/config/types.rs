//! Configuration types.
//!
//! Every table and field is optional in the file; missing values fall back
//! to the defaults below.

use crate::error::EasyTLError;
use crate::logging::LoggingConfig;
use crate::translate::{InstructionTemplate, Provider};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Root configuration structure.
///
/// ```toml
/// [api]
/// base_url = "https://easytl.example.com"
/// translate_path = "/translate"
/// timeout_secs = 300
///
/// [defaults]
/// provider = "Anthropic"
/// model = "claude-3-5-sonnet-20240620"
/// language = "Japanese"
/// tone = "Formal"
///
/// [logging]
/// level = "debug"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EasyTLConfig {
    /// Backend endpoints
    pub api: ApiConfig,
    /// Form defaults for the translate command
    pub defaults: TranslationDefaults,
    /// File logging
    pub logging: LoggingConfig,
}

impl EasyTLConfig {
    /// Creates a configuration with every default.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api.base_url = base_url.into();
        self
    }

    /// Checks values serde cannot: URL syntax, timeout, model catalogue.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the offending field.
    pub fn validate(&self) -> Result<(), EasyTLError> {
        self.api.base_url()?;

        if !self.api.translate_path.starts_with('/') {
            return Err(EasyTLError::configuration(
                "api.translate_path",
                "must start with '/'",
            ));
        }

        if self.api.timeout_secs == Some(0) {
            return Err(EasyTLError::configuration(
                "api.timeout_secs",
                "must be greater than zero; omit it to wait indefinitely",
            ));
        }

        if let Some(model) = &self.defaults.model {
            if !self.defaults.provider.supports_model(model) {
                return Err(EasyTLError::configuration(
                    "defaults.model",
                    format!("'{}' is not offered by {}", model, self.defaults.provider),
                ));
            }
        }

        Ok(())
    }
}

/// The `[api]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Root URL of the EasyTL backend
    pub base_url: String,
    /// Path of the streaming translation endpoint
    pub translate_path: String,
    /// Whole-request timeout. Unset means no timeout, so long streams are
    /// never cut off.
    pub timeout_secs: Option<u64>,
    /// Seconds allowed for establishing a connection
    pub connect_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            translate_path: "/translate".to_string(),
            timeout_secs: None,
            connect_timeout_secs: 10,
        }
    }
}

impl ApiConfig {
    /// Parses the base URL.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the URL is invalid or not HTTP(S).
    pub fn base_url(&self) -> Result<Url, EasyTLError> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| EasyTLError::configuration("api.base_url", e.to_string()))?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(EasyTLError::configuration(
                "api.base_url",
                format!("unsupported scheme '{}'", other),
            )),
        }
    }

    /// Resolves an endpoint path against the base URL.
    ///
    /// A base URL with a path prefix (`https://host/api`) keeps the prefix.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the base URL is invalid.
    pub fn endpoint(&self, path: &str) -> Result<Url, EasyTLError> {
        let mut url = self.base_url()?;
        let joined = format!(
            "{}/{}",
            url.path().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        url.set_path(&joined);
        Ok(url)
    }

    /// Returns the request timeout, if any.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Returns the connect timeout.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// The `[defaults]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationDefaults {
    /// Provider used when none is given on the command line
    pub provider: Provider,
    /// Model used when none is given; the provider's first model if unset
    pub model: Option<String>,
    /// Target language
    pub language: Option<String>,
    /// Tone
    pub tone: String,
    /// Custom instruction format with `{{language}}`, `{{tone}}`, and
    /// `{{additional_instructions}}` placeholders
    pub instruction_format: Option<String>,
}

impl Default for TranslationDefaults {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            model: None,
            language: None,
            tone: "Formal; Polite".to_string(),
            instruction_format: None,
        }
    }
}

impl TranslationDefaults {
    /// Returns the configured instruction template.
    #[must_use]
    pub fn template(&self) -> InstructionTemplate {
        self.instruction_format
            .as_deref()
            .map(InstructionTemplate::new)
            .unwrap_or_default()
    }
}
