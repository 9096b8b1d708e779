//! Credit balance tracking.

use chrono::{DateTime, Utc};
use std::fmt;

/// The user's current credit balance.
///
/// Every update replaces the previous value; the backend is the source of
/// truth and reports absolute balances, never deltas.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreditLedger {
    balance: f64,
    updated_at: Option<DateTime<Utc>>,
}

impl CreditLedger {
    /// Creates a ledger with a zero balance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current balance.
    #[must_use]
    pub fn balance(&self) -> f64 {
        self.balance
    }

    /// Returns when the balance last changed, if ever.
    #[must_use]
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Replaces the balance.
    pub fn update(&mut self, credits: f64) {
        self.balance = credits;
        self.updated_at = Some(Utc::now());
    }

    /// Zeroes the balance, as on logout.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl fmt::Display for CreditLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} credits", self.balance)
    }
}
