//! Event delivery from the stream consumer.
//!
//! The consumer calls a [`StreamHandler`] synchronously, in frame order, from
//! the single task that reads the stream. Handlers that live on another task
//! use the channel adapter and read events back with [`event_stream`].

use super::outcome::TranslationOutcome;
use futures::Stream;
use tokio::sync::mpsc;

/// An event emitted by a stream session.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// The accumulated translation grew
    Update {
        /// Full accumulated text so far
        text: String,
    },
    /// The server reported a new credit balance
    Balance {
        /// Replacement balance value
        credits: f64,
    },
    /// The session ended; always the last event when present
    Finished {
        /// Final value of the session
        outcome: TranslationOutcome,
    },
}

/// Receives the events of one stream session.
///
/// # Example
///
/// ```rust
/// use easytl::stream::{StreamHandler, TranslationOutcome};
///
/// struct Printer;
///
/// impl StreamHandler for Printer {
///     fn on_update(&mut self, text: &str) {
///         println!("{text}");
///     }
///
///     fn on_finish(&mut self, outcome: &TranslationOutcome) {
///         println!("done: {}", outcome.display_text());
///     }
/// }
/// ```
pub trait StreamHandler: Send {
    /// Called with the full accumulated text each time a fragment arrives.
    fn on_update(&mut self, text: &str);

    /// Called when a frame carries a balance value.
    fn on_balance(&mut self, _credits: f64) {}

    /// Called exactly once when the session finishes (never after cancellation).
    fn on_finish(&mut self, _outcome: &TranslationOutcome) {}
}

impl<H: StreamHandler + ?Sized> StreamHandler for &mut H {
    fn on_update(&mut self, text: &str) {
        (**self).on_update(text);
    }

    fn on_balance(&mut self, credits: f64) {
        (**self).on_balance(credits);
    }

    fn on_finish(&mut self, outcome: &TranslationOutcome) {
        (**self).on_finish(outcome);
    }
}

impl<H: StreamHandler + ?Sized> StreamHandler for Box<H> {
    fn on_update(&mut self, text: &str) {
        (**self).on_update(text);
    }

    fn on_balance(&mut self, credits: f64) {
        (**self).on_balance(credits);
    }

    fn on_finish(&mut self, outcome: &TranslationOutcome) {
        (**self).on_finish(outcome);
    }
}

/// Records every event in order.
impl StreamHandler for Vec<StreamEvent> {
    fn on_update(&mut self, text: &str) {
        self.push(StreamEvent::Update {
            text: text.to_string(),
        });
    }

    fn on_balance(&mut self, credits: f64) {
        self.push(StreamEvent::Balance { credits });
    }

    fn on_finish(&mut self, outcome: &TranslationOutcome) {
        self.push(StreamEvent::Finished {
            outcome: outcome.clone(),
        });
    }
}

/// Forwards events to a single consumer on another task.
///
/// A dropped receiver is not an error; events are discarded.
impl StreamHandler for mpsc::UnboundedSender<StreamEvent> {
    fn on_update(&mut self, text: &str) {
        forward(
            self,
            StreamEvent::Update {
                text: text.to_string(),
            },
        );
    }

    fn on_balance(&mut self, credits: f64) {
        forward(self, StreamEvent::Balance { credits });
    }

    fn on_finish(&mut self, outcome: &TranslationOutcome) {
        forward(
            self,
            StreamEvent::Finished {
                outcome: outcome.clone(),
            },
        );
    }
}

fn forward(tx: &mpsc::UnboundedSender<StreamEvent>, event: StreamEvent) {
    if tx.send(event).is_err() {
        tracing::debug!("stream event receiver dropped; discarding event");
    }
}

/// Creates the channel pair used with the sender-side handler.
#[must_use]
pub fn event_channel() -> (
    mpsc::UnboundedSender<StreamEvent>,
    mpsc::UnboundedReceiver<StreamEvent>,
) {
    mpsc::unbounded_channel()
}

/// Turns the receiving half of [`event_channel`] into a `Stream`.
///
/// The stream ends once the session drops its sender.
pub fn event_stream(
    mut rx: mpsc::UnboundedReceiver<StreamEvent>,
) -> impl Stream<Item = StreamEvent> + Send {
    async_stream::stream! {
        while let Some(event) = rx.recv().await {
            yield event;
        }
    }
}
