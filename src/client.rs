//! HTTP client for the EasyTL backend.
//!
//! [`TranslationBackend`] is the seam between sessions and the network: it
//! dispatches a [`TranslationRequest`] and hands back the raw response body
//! as a [`ByteStream`]. [`TranslationClient`] implements it with reqwest and
//! also carries the account calls (user info, login, checkout hand-off).

use crate::config::ApiConfig;
use crate::error::EasyTLError;
use crate::translate::TranslationRequest;
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::pin::Pin;
use tracing::debug;

/// Boxed response body of a dispatched translation request.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, EasyTLError>> + Send>>;

/// Something that can dispatch a translation request.
///
/// Implementations fail before returning a stream if the request cannot be
/// sent or the backend answers with a non-success status.
#[async_trait]
pub trait TranslationBackend: Send + Sync + fmt::Debug {
    /// Sends `request` and returns its streaming response body.
    ///
    /// # Errors
    ///
    /// Returns a network error if the request could not be sent and an API
    /// error if the backend rejected it.
    async fn open_stream(&self, request: &TranslationRequest) -> Result<ByteStream, EasyTLError>;
}

/// Account details returned by `GET /user/info`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserInfo {
    /// Account email
    pub email: String,
    /// Current credit balance
    pub credits: f64,
    /// Privileged accounts are not charged
    #[serde(rename = "isPrivilegedUser", default)]
    pub is_privileged_user: bool,
}

#[derive(Debug, Serialize)]
struct GoogleLoginRequest<'a> {
    token: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access_token: String,
}

#[derive(Debug, Serialize)]
struct CheckoutRequest<'a> {
    is_home_page: bool,
    success_url: &'a str,
    cancel_url: &'a str,
}

/// A checkout session created by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckoutSession {
    /// Payment provider session id, later passed to
    /// [`TranslationClient::verify_payment`].
    pub id: String,
    /// Hosted payment page, when the backend returns one.
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
struct VerifyPaymentRequest<'a> {
    session_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct VerifyPaymentResponse {
    success: bool,
}

/// Error body shapes the backend is known to send.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiErrorBody {
    detail: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

impl ApiErrorBody {
    fn into_message(self) -> Option<String> {
        self.detail.or(self.message).or(self.error)
    }
}

/// reqwest-backed client for the EasyTL API.
#[derive(Debug, Clone)]
pub struct TranslationClient {
    client: Client,
    api: ApiConfig,
}

impl TranslationClient {
    /// Creates a client for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the base URL is invalid and a
    /// network error if the HTTP client cannot be created.
    pub fn new(api: ApiConfig) -> Result<Self, EasyTLError> {
        api.base_url()?;

        let mut builder = Client::builder()
            .connect_timeout(api.connect_timeout())
            .user_agent(concat!("easytl/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = api.timeout() {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| EasyTLError::network(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client, api })
    }

    /// Returns the endpoint configuration.
    #[must_use]
    pub fn api(&self) -> &ApiConfig {
        &self.api
    }

    /// Fetches the account behind `access_token`.
    ///
    /// # Errors
    ///
    /// Returns an API error with status 401 if the token is rejected.
    pub async fn user_info(&self, access_token: &str) -> Result<UserInfo, EasyTLError> {
        let request = self
            .client
            .get(self.api.endpoint("/user/info")?)
            .bearer_auth(access_token);
        self.send_json(request).await
    }

    /// Exchanges a Google ID token for an EasyTL access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the credential.
    pub async fn google_login(&self, credential: &str) -> Result<String, EasyTLError> {
        let request = self
            .client
            .post(self.api.endpoint("/auth/google-login")?)
            .json(&GoogleLoginRequest { token: credential });
        let response: LoginResponse = self.send_json(request).await?;
        Ok(response.access_token)
    }

    /// Starts a payment checkout.
    ///
    /// The payment itself happens on the payment provider's page. Without
    /// a `url` in the response, a browser front-end has to open that page
    /// from the session id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses to create the session.
    pub async fn create_checkout_session(
        &self,
        access_token: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<CheckoutSession, EasyTLError> {
        let request = self
            .client
            .post(self.api.endpoint("/stripe/create-checkout-session")?)
            .bearer_auth(access_token)
            .json(&CheckoutRequest {
                is_home_page: false,
                success_url,
                cancel_url,
            });
        self.send_json(request).await
    }

    /// Asks the backend whether checkout session `session_id` was paid.
    ///
    /// # Errors
    ///
    /// Returns an error if the verification call itself fails.
    pub async fn verify_payment(
        &self,
        access_token: &str,
        session_id: &str,
    ) -> Result<bool, EasyTLError> {
        let request = self
            .client
            .post(self.api.endpoint("/stripe/verify-payment")?)
            .bearer_auth(access_token)
            .json(&VerifyPaymentRequest { session_id });
        let response: VerifyPaymentResponse = self.send_json(request).await?;
        Ok(response.success)
    }

    async fn send_json<R: DeserializeOwned>(&self, request: RequestBuilder) -> Result<R, EasyTLError> {
        let response = request.send().await.map_err(|e| self.map_reqwest_error(e))?;
        let response = Self::check_status(response).await?;

        response
            .json::<R>()
            .await
            .map_err(|e| EasyTLError::parse(format!("failed to parse response: {}", e)))
    }

    async fn check_status(response: Response) -> Result<Response, EasyTLError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Self::parse_error_response(response).await)
        }
    }

    async fn parse_error_response(response: Response) -> EasyTLError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .ok()
            .and_then(ApiErrorBody::into_message)
            .or_else(|| {
                let trimmed = body.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());

        EasyTLError::api(status.as_u16(), message)
    }

    fn map_reqwest_error(&self, error: reqwest::Error) -> EasyTLError {
        if error.is_timeout() {
            EasyTLError::network(format!("request timed out: {}", error))
        } else if error.is_connect() {
            EasyTLError::network(format!("connection failed: {}", error))
        } else {
            EasyTLError::network(error.to_string())
        }
    }
}

#[async_trait]
impl TranslationBackend for TranslationClient {
    async fn open_stream(&self, request: &TranslationRequest) -> Result<ByteStream, EasyTLError> {
        let url = self.api.endpoint(&self.api.translate_path)?;
        debug!(
            %url,
            provider = %request.provider,
            model = %request.model,
            using_credits = request.credentials.uses_credits(),
            "dispatching translation request"
        );

        let mut builder = self
            .client
            .post(url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(&request.body());
        if let Some(token) = request.bearer_token() {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|e| self.map_reqwest_error(e))?;
        let response = Self::check_status(response).await?;

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| EasyTLError::stream(format!("stream read error: {}", e))));
        Ok(Box::pin(body))
    }
}
