//! The streaming translation response consumer.
//!
//! [`StreamConsumer`] turns a chunked response body into a growing translated
//! text plus out-of-band balance updates. It decodes bytes incrementally,
//! splits the text into frames, and reports every parsed fragment to a
//! [`StreamHandler`].
//!
//! Termination is deterministic:
//! - `[DONE]` or end of source finishes with the accumulated text;
//! - a read error before either finishes with [`TranslationOutcome::Failed`];
//! - cancellation drops the byte source and emits nothing further.
//!
//! # Example
//!
//! ```rust
//! use easytl::stream::{StreamConsumer, StreamEvent, TranslationOutcome};
//!
//! # tokio_test::block_on(async {
//! let body = futures::stream::iter(vec![
//!     Ok::<_, std::io::Error>(&b"data: {\"text\":\"Hola\"}\n"[..]),
//!     Ok(&b"data: [DONE]\n"[..]),
//! ]);
//!
//! let mut events: Vec<StreamEvent> = Vec::new();
//! let termination = StreamConsumer::new().consume(body, &mut events).await;
//!
//! assert_eq!(
//!     termination.outcome(),
//!     Some(&TranslationOutcome::Completed("Hola".to_string()))
//! );
//! # });
//! ```

use super::decoder::Utf8Decoder;
use super::frame::{Frame, FramePayload, LineBuffer};
use super::handler::StreamHandler;
use super::outcome::{StreamTermination, TranslationOutcome};
use futures::{Stream, StreamExt};
use std::fmt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Counters describing one consumed stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    /// Bytes received from the source
    pub bytes: usize,
    /// Data frames seen, including malformed ones
    pub frames: usize,
    /// Data frames skipped because their payload did not parse
    pub malformed: usize,
}

/// Incremental consumer for one Stream Session.
///
/// Holds the decoder state, the pending line window, and the accumulated
/// result. It is owned by exactly one session and never shared.
#[derive(Debug)]
pub struct StreamConsumer {
    decoder: Utf8Decoder,
    lines: LineBuffer,
    accumulated: String,
    done: bool,
    stats: ConsumerStats,
    cancel: CancellationToken,
}

impl Default for StreamConsumer {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamConsumer {
    /// Creates a consumer that can only be stopped by dropping it.
    #[must_use]
    pub fn new() -> Self {
        Self::with_cancellation(CancellationToken::new())
    }

    /// Creates a consumer that stops when `cancel` is triggered.
    #[must_use]
    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self {
            decoder: Utf8Decoder::new(),
            lines: LineBuffer::new(),
            accumulated: String::new(),
            done: false,
            stats: ConsumerStats::default(),
            cancel,
        }
    }

    /// Returns the translated text accumulated so far.
    #[must_use]
    pub fn accumulated(&self) -> &str {
        &self.accumulated
    }

    /// Returns true once the `[DONE]` sentinel has been seen.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Returns the counters for this stream so far.
    #[must_use]
    pub fn stats(&self) -> ConsumerStats {
        self.stats
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Processes one chunk of the response body.
    ///
    /// Every line the chunk completes is handled before this returns. Lines
    /// after the sentinel, and all chunks once cancelled, are ignored.
    pub fn feed<H: StreamHandler + ?Sized>(&mut self, chunk: &[u8], handler: &mut H) {
        self.stats.bytes += chunk.len();
        if self.done || self.is_cancelled() {
            return;
        }

        let text = self.decoder.decode(chunk);
        for line in self.lines.push(&text) {
            if self.done || self.is_cancelled() {
                break;
            }
            self.process_line(&line, handler);
        }
    }

    /// Flushes the decoder and handles an unterminated final line.
    ///
    /// Called once the source is exhausted without a sentinel.
    pub fn finish_source<H: StreamHandler + ?Sized>(&mut self, handler: &mut H) {
        if self.done || self.is_cancelled() {
            return;
        }

        let tail = self.decoder.finish();
        let mut lines = self.lines.push(&tail);
        lines.extend(self.lines.take_remainder());

        for line in lines {
            if self.done || self.is_cancelled() {
                break;
            }
            self.process_line(&line, handler);
        }
    }

    fn process_line<H: StreamHandler + ?Sized>(&mut self, line: &str, handler: &mut H) {
        match Frame::parse(line) {
            Frame::Ignored => {}
            Frame::Done => {
                self.stats.frames += 1;
                self.done = true;
                debug!(frames = self.stats.frames, "stream [DONE] received");
            }
            Frame::Payload(payload) => {
                self.stats.frames += 1;
                self.apply(payload, handler);
            }
            Frame::Malformed { payload, error } => {
                self.stats.frames += 1;
                self.stats.malformed += 1;
                warn!(
                    frame = self.stats.frames,
                    %error,
                    "skipping malformed stream frame: {}",
                    payload
                );
            }
        }
    }

    fn apply<H: StreamHandler + ?Sized>(&mut self, payload: FramePayload, handler: &mut H) {
        if let Some(text) = payload.text {
            self.accumulated.push_str(&text);
            handler.on_update(&self.accumulated);
        }

        if let Some(credits) = payload.credits {
            debug!(credits, "balance update received");
            handler.on_balance(credits);
        }
    }

    /// Reads `source` to completion and reports the result to `handler`.
    ///
    /// The source is dropped before this returns on every path. The handler
    /// receives `on_finish` exactly once unless the session was cancelled.
    pub async fn consume<S, B, E, H>(mut self, source: S, handler: &mut H) -> StreamTermination
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: fmt::Display,
        H: StreamHandler + ?Sized,
    {
        let cancel = self.cancel.clone();
        let mut source = Box::pin(source);

        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                next = source.next() => Some(next),
            };

            let Some(next) = next else {
                drop(source);
                info!(
                    bytes = self.stats.bytes,
                    frames = self.stats.frames,
                    "stream session cancelled; read handle released"
                );
                return StreamTermination::Cancelled;
            };

            match next {
                Some(Ok(chunk)) => self.feed(chunk.as_ref(), handler),
                Some(Err(e)) if self.done => {
                    // The sentinel already ended the translation; this is only drain noise.
                    debug!(error = %e, "read error while draining after [DONE]");
                    break;
                }
                Some(Err(e)) => {
                    drop(source);
                    warn!(
                        error = %e,
                        bytes = self.stats.bytes,
                        "stream read failed; ending session with failure"
                    );
                    return self.finish(TranslationOutcome::failed(e.to_string()), handler);
                }
                None => break,
            }
        }

        drop(source);
        self.finish_source(handler);

        if self.is_cancelled() {
            return StreamTermination::Cancelled;
        }

        let text = std::mem::take(&mut self.accumulated);
        self.finish(TranslationOutcome::Completed(text), handler)
    }

    fn finish<H: StreamHandler + ?Sized>(
        &mut self,
        outcome: TranslationOutcome,
        handler: &mut H,
    ) -> StreamTermination {
        if self.is_cancelled() {
            return StreamTermination::Cancelled;
        }

        info!(
            bytes = self.stats.bytes,
            frames = self.stats.frames,
            malformed = self.stats.malformed,
            failed = outcome.is_failure(),
            "stream session finished"
        );
        handler.on_finish(&outcome);
        StreamTermination::Finished(outcome)
    }
}
