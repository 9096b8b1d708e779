//! Translation request construction.
//!
//! [`TranslationRequestBuilder`] collects the form inputs, validates them,
//! and renders the instructions. The resulting [`TranslationRequest`] is
//! what a [`TranslationBackend`](crate::client::TranslationBackend) sends.

use super::instructions::InstructionTemplate;
use super::provider::Provider;
use crate::error::EasyTLError;
use serde::Serialize;
use std::fmt;

/// How the request is paid for.
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialMode {
    /// Debit the logged-in user's credit balance
    Credits {
        /// Bearer token of the logged-in user
        access_token: String,
    },
    /// Use the caller's own provider API key
    ApiKey {
        /// Provider API key
        key: String,
    },
}

impl CredentialMode {
    /// Returns true if this request spends credits.
    #[must_use]
    pub fn uses_credits(&self) -> bool {
        matches!(self, Self::Credits { .. })
    }
}

impl fmt::Debug for CredentialMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Credits { .. } => f.debug_struct("Credits").finish_non_exhaustive(),
            Self::ApiKey { .. } => f.debug_struct("ApiKey").finish_non_exhaustive(),
        }
    }
}

/// A validated translation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    /// Source text
    pub text: String,
    /// Target language, free-form (e.g. "Spanish", "es")
    pub language: String,
    /// Requested tone (e.g. "Formal; Polite")
    pub tone: String,
    /// Provider to route the request to
    pub provider: Provider,
    /// Model of that provider
    pub model: String,
    /// Rendered translation instructions
    pub instructions: String,
    /// Payment mode
    pub credentials: CredentialMode,
}

/// JSON body posted to the translation endpoint.
#[derive(Debug, Serialize)]
pub struct RequestBody<'a> {
    text: &'a str,
    instructions: &'a str,
    provider: Provider,
    model: &'a str,
    using_credits: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
    stream: bool,
}

impl TranslationRequest {
    /// Starts building a request for `text`.
    #[must_use]
    pub fn builder(text: impl Into<String>) -> TranslationRequestBuilder {
        TranslationRequestBuilder::new(text)
    }

    /// Returns the JSON body for a streaming request.
    #[must_use]
    pub fn body(&self) -> RequestBody<'_> {
        let api_key = match &self.credentials {
            CredentialMode::ApiKey { key } => Some(key.as_str()),
            CredentialMode::Credits { .. } => None,
        };

        RequestBody {
            text: &self.text,
            instructions: &self.instructions,
            provider: self.provider,
            model: &self.model,
            using_credits: self.credentials.uses_credits(),
            api_key,
            stream: true,
        }
    }

    /// Returns the bearer token to authenticate with, if paying with credits.
    #[must_use]
    pub fn bearer_token(&self) -> Option<&str> {
        match &self.credentials {
            CredentialMode::Credits { access_token } => Some(access_token),
            CredentialMode::ApiKey { .. } => None,
        }
    }
}

/// Fluent builder for [`TranslationRequest`].
///
/// # Example
///
/// ```rust
/// use easytl::translate::{CredentialMode, Provider, TranslationRequest};
///
/// let request = TranslationRequest::builder("Hello world")
///     .language("Spanish")
///     .tone("Casual")
///     .provider(Provider::Anthropic)
///     .credentials(CredentialMode::ApiKey { key: "sk-...".into() })
///     .build()
///     .unwrap();
///
/// assert_eq!(request.model, "claude-3-haiku-20240307");
/// ```
#[derive(Debug, Clone)]
pub struct TranslationRequestBuilder {
    text: String,
    language: String,
    tone: String,
    provider: Provider,
    model: Option<String>,
    additional_instructions: Option<String>,
    template: InstructionTemplate,
    credentials: Option<CredentialMode>,
}

impl TranslationRequestBuilder {
    /// Creates a builder for `text` with default settings.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language: String::new(),
            tone: String::new(),
            provider: Provider::default(),
            model: None,
            additional_instructions: None,
            template: InstructionTemplate::default(),
            credentials: None,
        }
    }

    /// Sets the target language.
    #[must_use]
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Sets the tone.
    #[must_use]
    pub fn tone(mut self, tone: impl Into<String>) -> Self {
        self.tone = tone.into();
        self
    }

    /// Selects the provider. Clears a previously chosen model.
    #[must_use]
    pub fn provider(mut self, provider: Provider) -> Self {
        self.provider = provider;
        self.model = None;
        self
    }

    /// Selects a model of the current provider.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Adds free-form additional instructions.
    #[must_use]
    pub fn additional_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.additional_instructions = Some(instructions.into());
        self
    }

    /// Replaces the default instruction template.
    #[must_use]
    pub fn template(mut self, template: InstructionTemplate) -> Self {
        self.template = template;
        self
    }

    /// Sets the payment mode.
    #[must_use]
    pub fn credentials(mut self, credentials: CredentialMode) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Validates the inputs and renders the instructions.
    ///
    /// # Errors
    ///
    /// Returns an invalid request error if the text or language is blank, the
    /// model is not offered by the provider, or credentials are missing.
    pub fn build(self) -> Result<TranslationRequest, EasyTLError> {
        if self.text.trim().is_empty() {
            return Err(EasyTLError::invalid_request("text", "nothing to translate"));
        }

        let language = self.language.trim().to_string();
        if language.is_empty() {
            return Err(EasyTLError::invalid_request(
                "language",
                "a target language is required",
            ));
        }

        let model = match self.model {
            Some(model) if self.provider.supports_model(&model) => model,
            Some(model) => {
                return Err(EasyTLError::invalid_request(
                    "model",
                    format!(
                        "'{}' is not offered by {}; choose one of {}",
                        model,
                        self.provider,
                        self.provider.models().join(", ")
                    ),
                ));
            }
            None => self.provider.default_model().to_string(),
        };

        let credentials = match self.credentials {
            Some(CredentialMode::Credits { access_token }) if access_token.trim().is_empty() => {
                return Err(EasyTLError::authentication(
                    "paying with credits requires logging in",
                ));
            }
            Some(CredentialMode::ApiKey { key }) if key.trim().is_empty() => {
                return Err(EasyTLError::invalid_request("api_key", "API key is empty"));
            }
            Some(credentials) => credentials,
            None => {
                return Err(EasyTLError::invalid_request(
                    "credentials",
                    "log in to use credits or provide an API key",
                ));
            }
        };

        let tone = self.tone.trim().to_string();
        let instructions = self.template.render(
            &language,
            &tone,
            self.additional_instructions.as_deref(),
        );

        Ok(TranslationRequest {
            text: self.text,
            language,
            tone,
            provider: self.provider,
            model,
            instructions,
            credentials,
        })
    }
}
