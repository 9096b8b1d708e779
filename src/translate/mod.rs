//! Building translation requests.
//!
//! - [`Provider`]: provider and model catalogue
//! - [`InstructionTemplate`]: renders the instructions sent with the text
//! - [`TranslationRequest`]: a validated request and its JSON body

mod instructions;
mod provider;
mod request;

pub use instructions::{InstructionTemplate, DEFAULT_INSTRUCTION_FORMAT};
pub use provider::Provider;
pub use request::{CredentialMode, RequestBody, TranslationRequest, TranslationRequestBuilder};
