//! Login state.

use super::store::TokenStore;
use super::token::AccessToken;
use crate::client::{TranslationClient, UserInfo};
use crate::credits::CreditLedger;
use crate::error::EasyTLError;
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info, warn};

/// How long user info is trusted before it is fetched again.
pub const FULL_CHECK_INTERVAL: TimeDelta = TimeDelta::minutes(30);

/// Source of account details for a token.
#[async_trait]
pub trait AccountSource: Send + Sync {
    /// Fetches the account behind `access_token`.
    async fn user_info(&self, access_token: &str) -> Result<UserInfo, EasyTLError>;
}

#[async_trait]
impl AccountSource for TranslationClient {
    async fn user_info(&self, access_token: &str) -> Result<UserInfo, EasyTLError> {
        TranslationClient::user_info(self, access_token).await
    }
}

/// What a login status check did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginCheck {
    /// User info was fetched and the user is logged in
    Refreshed,
    /// A full check found no valid token; state was reset
    NoValidToken,
    /// The token was rejected or user info could not be fetched; logged out
    LoggedOut,
    /// The logged-in token expired since the last check; logged out
    Expired,
    /// Nothing needed doing
    Unchanged,
}

/// Account state of the current user.
#[derive(Debug)]
pub struct AuthState<A> {
    source: A,
    store: TokenStore,
    logged_in: bool,
    email: Option<String>,
    privileged: bool,
    credits: CreditLedger,
    last_full_check: Option<DateTime<Utc>>,
}

impl<A: AccountSource> AuthState<A> {
    /// Creates a logged-out state backed by `store`.
    #[must_use]
    pub fn new(source: A, store: TokenStore) -> Self {
        Self {
            source,
            store,
            logged_in: false,
            email: None,
            privileged: false,
            credits: CreditLedger::new(),
            last_full_check: None,
        }
    }

    /// Returns true if the last check confirmed a login.
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    /// Returns the logged-in user's email.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Returns true for accounts that are not charged.
    #[must_use]
    pub fn is_privileged(&self) -> bool {
        self.privileged
    }

    /// Returns the credit ledger.
    #[must_use]
    pub fn credits(&self) -> &CreditLedger {
        &self.credits
    }

    /// Replaces the credit balance, e.g. from a stream balance update.
    pub fn update_credits(&mut self, credits: f64) {
        self.credits.update(credits);
    }

    /// Returns the stored token.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the token file cannot be read.
    pub fn access_token(&self) -> Result<Option<AccessToken>, EasyTLError> {
        self.store.load()
    }

    /// Stores `token` and runs a forced check.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the token cannot be saved.
    pub async fn login(&mut self, token: AccessToken) -> Result<LoginCheck, EasyTLError> {
        self.store.save(&token)?;
        self.check_login_status(true).await
    }

    /// Forgets the token and resets all account state.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the token file cannot be removed. The
    /// in-memory state is reset regardless.
    pub fn logout(&mut self) -> Result<(), EasyTLError> {
        self.reset();
        self.last_full_check = None;
        self.store.clear()
    }

    /// Brings the state in line with the stored token.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the token file cannot be accessed.
    pub async fn check_login_status(&mut self, force: bool) -> Result<LoginCheck, EasyTLError> {
        self.check_login_status_at(force, Utc::now()).await
    }

    /// [`check_login_status`](Self::check_login_status) with an explicit
    /// clock.
    ///
    /// - forced, or the last full check is older than
    ///   [`FULL_CHECK_INTERVAL`]: full check;
    /// - logged out but holding a valid token: full check;
    /// - logged in with an expired token: logout.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the token file cannot be accessed.
    pub async fn check_login_status_at(
        &mut self,
        force: bool,
        now: DateTime<Utc>,
    ) -> Result<LoginCheck, EasyTLError> {
        let token = self.store.load()?;
        let token_valid = token.as_ref().is_some_and(|t| !t.is_expired_at(now));
        let stale = self
            .last_full_check
            .map_or(true, |at| now - at > FULL_CHECK_INTERVAL);

        if force || stale || (!self.logged_in && token_valid) {
            return self.full_check(token.filter(|_| token_valid), now).await;
        }

        if self.logged_in && !token_valid {
            info!("access token expired; logging out");
            self.logout()?;
            return Ok(LoginCheck::Expired);
        }

        Ok(LoginCheck::Unchanged)
    }

    async fn full_check(
        &mut self,
        token: Option<AccessToken>,
        now: DateTime<Utc>,
    ) -> Result<LoginCheck, EasyTLError> {
        let Some(token) = token else {
            debug!("no valid access token; resetting account state");
            self.reset();
            return Ok(LoginCheck::NoValidToken);
        };

        match self.source.user_info(token.as_str()).await {
            Ok(info) => {
                debug!(email = %info.email, credits = info.credits, "refreshed user info");
                self.logged_in = true;
                self.email = Some(info.email);
                self.privileged = info.is_privileged_user;
                self.credits.update(info.credits);
                self.last_full_check = Some(now);
                Ok(LoginCheck::Refreshed)
            }
            Err(e) => {
                warn!(error = %e, "failed to fetch user info; logging out");
                self.logout()?;
                Ok(LoginCheck::LoggedOut)
            }
        }
    }

    fn reset(&mut self) {
        self.logged_in = false;
        self.email = None;
        self.privileged = false;
        self.credits.reset();
    }
}
