//! JWT access tokens.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;

#[derive(Debug, Deserialize)]
struct Claims {
    exp: Option<f64>,
}

/// Bearer token issued by the backend after login.
///
/// Only the `exp` claim is read, and the signature is never checked: the
/// backend remains the authority on whether a token is valid.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wraps a raw token, trimming surrounding whitespace.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into().trim().to_string())
    }

    /// Returns the raw token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the expiry from the `exp` claim, or `None` if the token
    /// cannot be decoded or has no expiry.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let payload = self.0.split('.').nth(1)?;
        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .ok()?;
        let claims: Claims = serde_json::from_slice(&bytes).ok()?;
        DateTime::from_timestamp(claims.exp?.floor() as i64, 0)
    }

    /// Returns true if the token is expired at `now`.
    ///
    /// A token that cannot be decoded counts as expired.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().map_or(true, |exp| exp <= now)
    }

    /// Returns true if the token is expired now.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AccessToken")
            .field(&format_args!("<{} chars>", self.0.len()))
            .finish()
    }
}

impl From<String> for AccessToken {
    fn from(token: String) -> Self {
        Self::new(token)
    }
}

#[cfg(test)]
pub(crate) fn token_expiring_at(exp: i64) -> AccessToken {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"user@example.com","exp":{}}}"#, exp));
    AccessToken::new(format!("{}.{}.signature", header, payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[test]
    fn reads_expiry_claim() {
        let token = token_expiring_at(1_700_000_000);
        assert_eq!(token.expires_at().unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn expiry_compares_against_now() {
        let now = Utc::now();
        let token = token_expiring_at(now.timestamp() + 60);

        assert!(!token.is_expired_at(now));
        assert!(token.is_expired_at(now + TimeDelta::minutes(2)));
    }

    #[test]
    fn expiry_instant_itself_is_expired() {
        let token = token_expiring_at(1_700_000_000);
        let exp = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert!(token.is_expired_at(exp));
    }

    #[test]
    fn undecodable_tokens_are_expired() {
        assert!(AccessToken::new("not-a-jwt").is_expired());
        assert!(AccessToken::new("a.!!!.c").is_expired());

        let no_exp = format!("h.{}.s", URL_SAFE_NO_PAD.encode(br#"{"sub":"x"}"#));
        assert!(AccessToken::new(no_exp).is_expired());
    }

    #[test]
    fn padded_payload_is_accepted() {
        let payload = base64::engine::general_purpose::URL_SAFE.encode(br#"{"exp":1700000000}"#);
        let token = AccessToken::new(format!("h.{}.s", payload));
        assert!(token.expires_at().is_some());
    }

    #[test]
    fn debug_hides_token() {
        let token = AccessToken::new("secret.value.here");
        assert!(!format!("{:?}", token).contains("secret"));
    }
}
