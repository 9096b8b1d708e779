//! Streaming translation responses.
//!
//! The translation API answers with a newline-delimited event body:
//!
//! ```text
//! data: {"text":"Hola"}
//! data: {"text":" mundo"}
//! data: {"credits":42}
//! data: [DONE]
//! ```
//!
//! [`StreamConsumer`] reads such a body chunk by chunk and reports the
//! growing translation, balance updates, and a single terminal outcome to a
//! [`StreamHandler`].

mod consumer;
mod decoder;
mod frame;
mod handler;
mod outcome;

pub use consumer::{ConsumerStats, StreamConsumer};
pub use decoder::Utf8Decoder;
pub use frame::{Frame, FramePayload, LineBuffer, DATA_PREFIX, DONE_SENTINEL};
pub use handler::{event_channel, event_stream, StreamEvent, StreamHandler};
pub use outcome::{StreamTermination, TranslationOutcome, FAILURE_MARKER};
