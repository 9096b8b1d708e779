//! Core identifier types.
//!
//! - `SessionId`: names one translation stream session

mod session_id;

pub use session_id::SessionId;
