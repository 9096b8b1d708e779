//! Stream sessions.
//!
//! A [`TranslationSession`] owns one dispatched request from start to
//! termination: it opens the response body through a [`TranslationBackend`]
//! and runs a [`StreamConsumer`] over it on its own task. [`SessionSlot`]
//! keeps at most one session alive per output target.

use crate::client::TranslationBackend;
use crate::error::EasyTLError;
use crate::stream::{StreamConsumer, StreamHandler, StreamTermination, TranslationOutcome};
use crate::translate::TranslationRequest;
use crate::types::SessionId;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, warn, Instrument};

/// A running translation stream.
///
/// Dropping an unjoined session stops it.
#[derive(Debug)]
pub struct TranslationSession {
    id: SessionId,
    cancel: CancellationToken,
    handle: Option<JoinHandle<StreamTermination>>,
}

impl TranslationSession {
    /// Dispatches `request` and starts consuming its response on a new task.
    ///
    /// Must be called from within a Tokio runtime. `handler` receives the
    /// session's events in stream order.
    pub fn spawn<B, H>(backend: Arc<B>, request: TranslationRequest, handler: H) -> Self
    where
        B: TranslationBackend + ?Sized + 'static,
        H: StreamHandler + 'static,
    {
        let id = SessionId::new();
        let cancel = CancellationToken::new();
        let span = info_span!(
            "translation_session",
            session_id = %id,
            provider = %request.provider,
            model = %request.model,
        );

        let handle = tokio::spawn(run(backend, request, handler, cancel.clone()).instrument(span));
        debug!(session_id = %id, "translation session started");

        Self {
            id,
            cancel,
            handle: Some(handle),
        }
    }

    /// Returns the session id.
    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Signals the session to stop. Calling it again has no effect.
    ///
    /// The session task notices the signal before its next line; an update
    /// already being delivered may still land. Await
    /// [`SessionSlot::stop`] or [`join`](Self::join) when nothing may reach
    /// the handler afterwards.
    pub fn stop(&self) {
        if !self.cancel.is_cancelled() {
            debug!(session_id = %self.id, "stopping translation session");
            self.cancel.cancel();
        }
    }

    /// Returns true once [`stop`](Self::stop) was called.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Returns true if the session task has ended.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Waits for the session to end.
    ///
    /// # Errors
    ///
    /// Returns a session error if the task panicked or was aborted.
    pub async fn join(mut self) -> Result<StreamTermination, EasyTLError> {
        let handle = self
            .handle
            .take()
            .ok_or_else(|| EasyTLError::session("session already joined"))?;

        handle.await.map_err(|e| {
            if e.is_panic() {
                EasyTLError::session(format!("session {} panicked", self.id))
            } else {
                EasyTLError::session(format!("session {} was aborted", self.id))
            }
        })
    }
}

impl Drop for TranslationSession {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.cancel.cancel();
        }
    }
}

async fn run<B, H>(
    backend: Arc<B>,
    request: TranslationRequest,
    mut handler: H,
    cancel: CancellationToken,
) -> StreamTermination
where
    B: TranslationBackend + ?Sized,
    H: StreamHandler,
{
    let opened = tokio::select! {
        biased;
        () = cancel.cancelled() => return StreamTermination::Cancelled,
        opened = backend.open_stream(&request) => opened,
    };

    match opened {
        Ok(body) => {
            StreamConsumer::with_cancellation(cancel)
                .consume(body, &mut handler)
                .await
        }
        Err(e) if cancel.is_cancelled() => {
            debug!(error = %e, "request failed after stop");
            StreamTermination::Cancelled
        }
        Err(e) => {
            warn!(error = %e, "translation request failed before streaming");
            let outcome = TranslationOutcome::failed(e.to_string());
            handler.on_finish(&outcome);
            StreamTermination::Finished(outcome)
        }
    }
}

/// Holds at most one active session for an output target.
#[derive(Debug, Default)]
pub struct SessionSlot {
    current: Option<TranslationSession>,
}

impl SessionSlot {
    /// Creates an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the active session, if any.
    #[must_use]
    pub fn current(&self) -> Option<&TranslationSession> {
        self.current.as_ref()
    }

    /// Starts a new session after fully terminating the previous one.
    ///
    /// The previous session is stopped and awaited before the new request
    /// is dispatched, so its handler sees nothing after this call begins.
    pub async fn start<B, H>(
        &mut self,
        backend: Arc<B>,
        request: TranslationRequest,
        handler: H,
    ) -> SessionId
    where
        B: TranslationBackend + ?Sized + 'static,
        H: StreamHandler + 'static,
    {
        self.stop().await;

        let session = TranslationSession::spawn(backend, request, handler);
        let id = session.id().clone();
        self.current = Some(session);
        id
    }

    /// Stops and awaits the active session.
    ///
    /// Returns its termination, or `None` if the slot was empty or the task
    /// failed.
    pub async fn stop(&mut self) -> Option<StreamTermination> {
        let session = self.current.take()?;
        session.stop();
        Self::settle(session).await
    }

    /// Awaits the active session without stopping it.
    pub async fn join(&mut self) -> Option<StreamTermination> {
        let session = self.current.take()?;
        Self::settle(session).await
    }

    async fn settle(session: TranslationSession) -> Option<StreamTermination> {
        let id = session.id().clone();
        match session.join().await {
            Ok(termination) => Some(termination),
            Err(e) => {
                warn!(session_id = %id, error = %e, "translation session ended abnormally");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ByteStream;
    use crate::stream::{event_channel, StreamEvent, FAILURE_MARKER};
    use crate::translate::CredentialMode;
    use async_trait::async_trait;
    use bytes::Bytes;
    use futures::{stream, StreamExt};
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::mpsc::UnboundedReceiver;

    struct ReleaseFlag(Arc<AtomicBool>);

    impl Drop for ReleaseFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[derive(Debug, Default)]
    struct FakeBackend {
        chunks: Vec<&'static str>,
        hold_open: bool,
        reject: bool,
        released: Arc<AtomicBool>,
    }

    #[async_trait]
    impl TranslationBackend for FakeBackend {
        async fn open_stream(
            &self,
            _request: &TranslationRequest,
        ) -> Result<ByteStream, EasyTLError> {
            if self.reject {
                return Err(EasyTLError::api(402, "Insufficient credits"));
            }

            let flag = ReleaseFlag(Arc::clone(&self.released));
            let chunks: Vec<Result<Bytes, EasyTLError>> = self
                .chunks
                .iter()
                .map(|c| Ok(Bytes::from_static(c.as_bytes())))
                .collect();
            let tail = if self.hold_open {
                stream::pending().boxed()
            } else {
                stream::empty().boxed()
            };

            let body = stream::iter(chunks).chain(tail).map(move |chunk| {
                let _held = &flag;
                chunk
            });
            Ok(Box::pin(body))
        }
    }

    fn request() -> TranslationRequest {
        TranslationRequest::builder("Hello world")
            .language("Spanish")
            .credentials(CredentialMode::ApiKey {
                key: "sk-test".to_string(),
            })
            .build()
            .unwrap()
    }

    async fn drain(mut rx: UnboundedReceiver<StreamEvent>) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn session_delivers_events_in_order() {
        let backend = Arc::new(FakeBackend {
            chunks: vec![
                "data: {\"text\":\"Hola\"}\n",
                "data: {\"text\":\" mundo\"}\ndata: {\"credits\":42}\n",
                "data: [DONE]\n",
            ],
            ..Default::default()
        });
        let (tx, rx) = event_channel();

        let session = TranslationSession::spawn(backend, request(), tx);
        let termination = session.join().await.unwrap();

        assert_eq!(
            termination.outcome(),
            Some(&TranslationOutcome::Completed("Hola mundo".to_string()))
        );
        assert_eq!(
            drain(rx).await,
            vec![
                StreamEvent::Update {
                    text: "Hola".to_string()
                },
                StreamEvent::Update {
                    text: "Hola mundo".to_string()
                },
                StreamEvent::Balance { credits: 42.0 },
                StreamEvent::Finished {
                    outcome: TranslationOutcome::Completed("Hola mundo".to_string())
                },
            ]
        );
    }

    #[tokio::test]
    async fn rejected_request_finishes_with_failure_marker() {
        let backend = Arc::new(FakeBackend {
            reject: true,
            ..Default::default()
        });
        let (tx, rx) = event_channel();

        let termination = TranslationSession::spawn(backend, request(), tx)
            .join()
            .await
            .unwrap();

        let outcome = termination.outcome().unwrap();
        assert!(outcome.is_failure());
        assert_eq!(outcome.display_text(), FAILURE_MARKER);

        let events = drain(rx).await;
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            StreamEvent::Finished { outcome } if outcome.is_failure()
        ));
    }

    #[tokio::test]
    async fn stop_is_idempotent_and_releases_body() {
        let backend = Arc::new(FakeBackend {
            chunks: vec!["data: {\"text\":\"Hola\"}\n"],
            hold_open: true,
            ..Default::default()
        });
        let released = Arc::clone(&backend.released);
        let (tx, mut rx) = event_channel();

        let session = TranslationSession::spawn(backend, request(), tx);
        assert_eq!(
            rx.recv().await,
            Some(StreamEvent::Update {
                text: "Hola".to_string()
            })
        );

        session.stop();
        session.stop();
        assert!(session.is_stopped());

        assert_eq!(session.join().await.unwrap(), StreamTermination::Cancelled);
        assert!(released.load(Ordering::SeqCst));
        assert!(drain(rx).await.is_empty());
    }

    #[tokio::test]
    async fn dropping_session_stops_it() {
        let backend = Arc::new(FakeBackend {
            chunks: vec!["data: {\"text\":\"Hola\"}\n"],
            hold_open: true,
            ..Default::default()
        });
        let released = Arc::clone(&backend.released);
        let (tx, mut rx) = event_channel();

        let session = TranslationSession::spawn(backend, request(), tx);
        assert!(rx.recv().await.is_some());
        drop(session);

        // The channel closes once the task ends and drops its handler.
        assert!(drain(rx).await.is_empty());
        assert!(released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn slot_terminates_previous_session_first() {
        let first_backend = Arc::new(FakeBackend {
            chunks: vec!["data: {\"text\":\"Bonjour\"}\n"],
            hold_open: true,
            ..Default::default()
        });
        let first_released = Arc::clone(&first_backend.released);
        let second_backend = Arc::new(FakeBackend {
            chunks: vec!["data: {\"text\":\"Hallo\"}\n", "data: [DONE]\n"],
            ..Default::default()
        });

        let mut slot = SessionSlot::new();
        let (first_tx, mut first_rx) = event_channel();
        let first_id = slot.start(first_backend, request(), first_tx).await;
        assert!(first_rx.recv().await.is_some());

        let (second_tx, second_rx) = event_channel();
        let second_id = slot.start(second_backend, request(), second_tx).await;

        assert_ne!(first_id, second_id);
        assert!(first_released.load(Ordering::SeqCst));
        assert!(drain(first_rx).await.is_empty());

        let termination = slot.join().await.unwrap();
        assert_eq!(
            termination.outcome(),
            Some(&TranslationOutcome::Completed("Hallo".to_string()))
        );
        assert_eq!(drain(second_rx).await.len(), 2);
        assert!(slot.current().is_none());
    }

    struct LateEventCheck {
        stop_returned: Arc<AtomicBool>,
        late: Arc<AtomicBool>,
    }

    impl StreamHandler for LateEventCheck {
        fn on_update(&mut self, _text: &str) {
            if self.stop_returned.load(Ordering::SeqCst) {
                self.late.store(true, Ordering::SeqCst);
            }
        }

        fn on_finish(&mut self, _outcome: &TranslationOutcome) {
            if self.stop_returned.load(Ordering::SeqCst) {
                self.late.store(true, Ordering::SeqCst);
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn awaited_slot_stop_leaves_no_late_events() {
        let backend = Arc::new(FakeBackend {
            chunks: vec!["data: {\"text\":\"la \"}\n"; 500],
            hold_open: true,
            ..Default::default()
        });
        let stop_returned = Arc::new(AtomicBool::new(false));
        let late = Arc::new(AtomicBool::new(false));
        let handler = LateEventCheck {
            stop_returned: Arc::clone(&stop_returned),
            late: Arc::clone(&late),
        };

        let mut slot = SessionSlot::new();
        slot.start(backend, request(), handler).await;
        tokio::task::yield_now().await;

        assert_eq!(slot.stop().await, Some(StreamTermination::Cancelled));
        stop_returned.store(true, Ordering::SeqCst);

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!late.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn stopping_empty_slot_is_noop() {
        let mut slot = SessionSlot::new();
        assert!(slot.stop().await.is_none());
        assert!(slot.join().await.is_none());
    }
}
