//! # EasyTL: streaming translation client
//!
//! A client for the EasyTL translation API. A translation request is sent to
//! the backend, which answers with a newline-delimited event body; the
//! translated text arrives fragment by fragment, together with the user's
//! updated credit balance.
//!
//! ## Architecture
//!
//! - **Request builder** ([`translate`]): provider and model catalogue,
//!   instruction template, credential mode
//! - **Client** ([`client`]): dispatches requests and account calls over HTTP
//! - **Stream consumer** ([`stream`]): decodes the response body into text
//!   updates, balance updates, and one terminal outcome
//! - **Sessions** ([`session`]): run one consumer per request on its own
//!   task, with prompt cancellation
//! - **Account** ([`auth`], [`credits`]): stored login token, user info,
//!   credit balance
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use easytl::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), EasyTLError> {
//!     let config = easytl::config::load()?;
//!     let client = Arc::new(TranslationClient::new(config.api)?);
//!
//!     let request = TranslationRequest::builder("Good morning")
//!         .language("Japanese")
//!         .credentials(CredentialMode::ApiKey { key: "sk-...".into() })
//!         .build()?;
//!
//!     let (tx, mut rx) = event_channel();
//!     let session = TranslationSession::spawn(client, request, tx);
//!     while let Some(event) = rx.recv().await {
//!         if let StreamEvent::Update { text } = event {
//!             println!("{text}");
//!         }
//!     }
//!     session.join().await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod credits;
pub mod error;
pub mod logging;
pub mod session;
pub mod stream;
pub mod translate;
pub mod types;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::auth::{AccessToken, AuthState, TokenStore};
    pub use crate::client::{CheckoutSession, TranslationBackend, TranslationClient, UserInfo};
    pub use crate::config::EasyTLConfig;
    pub use crate::credits::CreditLedger;
    pub use crate::error::{EasyTLError, EasyTLErrorKind};
    pub use crate::session::{SessionSlot, TranslationSession};
    pub use crate::stream::{
        event_channel, StreamConsumer, StreamEvent, StreamHandler, StreamTermination,
        TranslationOutcome,
    };
    pub use crate::translate::{CredentialMode, Provider, TranslationRequest};
    pub use crate::types::SessionId;
}
