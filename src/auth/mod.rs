//! Login and account state.
//!
//! The access token lives in a [`TokenStore`] file between runs.
//! [`AuthState`] keeps the account details fetched for it and decides when
//! they must be fetched again.

mod state;
mod store;
mod token;

pub use state::{AccountSource, AuthState, LoginCheck, FULL_CHECK_INTERVAL};
pub use store::TokenStore;
pub use token::AccessToken;
