//! Streaming session state machine
//!
//! A [`Session`] owns one in-flight exchange: it folds staged attachments
//! into the outgoing request, drives the frame decoder over the response
//! byte stream, grows the assistant turn delta by delta, and commits both
//! turns of the exchange into the [`ConversationStore`] for the active
//! model.
//!
//! # States
//!
//! `Idle → Sending → Streaming → Settled`. `Settled` is reached either by
//! the terminal frame (`done: true`), by transport closure without one, or
//! by cancellation; the latter two keep the partial content already
//! delivered and are not errors.
//!
//! Processing between awaits is synchronous: deltas are applied to the
//! assistant turn strictly in arrival order and the statistics aggregator
//! is never fed events out of order.

use crate::attachments::AttachmentPipeline;
use crate::conversation::{ConversationStore, Turn};
use crate::error::{OzetteError, Result};
use crate::stats::{StatsAggregator, StatsSnapshot};
use crate::stream::{FrameDecoder, StreamEvent};
use crate::transport::{ChatMessage, ChatRequest, ChatTransport};
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Lifecycle of one exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No exchange in progress
    Idle,
    /// Request submitted, awaiting the first response bytes
    Sending,
    /// Response frames are being consumed
    Streaming,
    /// The last exchange completed; a new submit is accepted
    Settled,
}

/// Incremental notification emitted while a submission streams
///
/// The presentation layer subscribes via [`Session::updates`]; the core
/// never assumes a particular rendering mechanism.
#[derive(Debug, Clone)]
pub enum SessionUpdate {
    /// A piece of assistant text, already appended to the in-flight turn
    Delta(String),
    /// A fresh statistics snapshot
    Stats(StatsSnapshot),
    /// The settled assistant turn that closed the exchange
    Settled(Turn),
}

/// Drives one conversational exchange at a time against a transport
///
/// Only one submission may be in flight; a second submit while one is
/// active is rejected deterministically with [`OzetteError::SessionBusy`].
pub struct Session {
    transport: Arc<dyn ChatTransport>,
    state: SessionState,
    stats: StatsAggregator,
    cancel: CancellationToken,
    update_tx: mpsc::UnboundedSender<SessionUpdate>,
    update_rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<SessionUpdate>>>,
}

impl Session {
    /// Create an idle session over the given transport
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        Self {
            transport,
            state: SessionState::Idle,
            stats: StatsAggregator::new(""),
            cancel: CancellationToken::new(),
            update_tx,
            update_rx: Arc::new(tokio::sync::Mutex::new(update_rx)),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Latest statistics snapshot
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Token for cancelling the in-flight stream
    ///
    /// Cancellation closes the transport at the next suspension point and
    /// settles the session with the partial content retained.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Install a fresh cancellation token for the next exchange
    ///
    /// Call before grabbing [`Session::cancel_token`] when the previous
    /// exchange may have been cancelled; outstanding clones of the old
    /// token no longer affect this session.
    pub fn reset_cancellation(&mut self) {
        self.cancel = CancellationToken::new();
    }

    /// Subscribe to incremental updates
    ///
    /// Updates are delivered in production order across submissions; the
    /// stream ends when the session is dropped. Updates produced while no
    /// subscriber exists are dropped, not queued.
    pub fn updates(&self) -> Pin<Box<dyn Stream<Item = SessionUpdate> + Send>> {
        let rx = Arc::clone(&self.update_rx);
        Box::pin(futures::stream::unfold(rx, |rx| async move {
            let mut guard = rx.lock().await;
            let item = guard.recv().await?;
            drop(guard);
            Some((item, rx))
        }))
    }

    /// Send an update if anyone is subscribed
    ///
    /// The session holds the receiver itself, so an unconditional send
    /// would queue messages forever when [`Session::updates`] is never
    /// called. Subscribers each hold a clone of the receiver handle.
    fn emit(&self, update: SessionUpdate) {
        if Arc::strong_count(&self.update_rx) > 1 {
            let _ = self.update_tx.send(update);
        }
    }

    /// Submit a user turn and drive the exchange to settlement
    ///
    /// Binds all currently staged attachments to the outgoing turn, sends
    /// the combined payload, and consumes the response stream. Returns the
    /// final statistics snapshot once the session settles.
    ///
    /// # Errors
    ///
    /// - [`OzetteError::EmptySubmit`] for empty/whitespace-only input
    /// - [`OzetteError::NoModelSelected`] when `model` is empty
    /// - [`OzetteError::SessionBusy`] while another exchange is active
    /// - [`OzetteError::Transport`] when the transport fails before any
    ///   response bytes; the store is untouched and staged attachments
    ///   return to the pending set
    pub async fn submit(
        &mut self,
        input: &str,
        model: &str,
        store: &mut ConversationStore,
        pipeline: &mut AttachmentPipeline,
    ) -> Result<StatsSnapshot> {
        if input.trim().is_empty() {
            return Err(OzetteError::EmptySubmit.into());
        }
        if model.trim().is_empty() {
            return Err(OzetteError::NoModelSelected.into());
        }
        if matches!(self.state, SessionState::Sending | SessionState::Streaming) {
            return Err(OzetteError::SessionBusy.into());
        }

        self.state = SessionState::Sending;
        self.stats.reset(model);
        if self.cancel.is_cancelled() {
            self.cancel = CancellationToken::new();
        }
        let started = Instant::now();

        // Bind staged attachments to this turn and fold their content into
        // the outgoing text. The stored turn keeps the raw input; folded
        // content travels only on the wire.
        let attachments = pipeline.take_pending();
        let resolved = pipeline.resolve(&attachments).await;
        let outgoing = format!("{}{}", input, resolved);

        let mut messages: Vec<ChatMessage> = store
            .history(model)
            .iter()
            .map(|turn| ChatMessage {
                role: turn.role.clone(),
                content: turn.content.clone(),
            })
            .collect();
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: outgoing,
        });

        let request = ChatRequest {
            model: model.to_string(),
            messages,
            stream: true,
        };

        let mut byte_stream = match self.transport.chat_stream(&request).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!(error = %e, "submit failed before streaming started");
                pipeline.restore_pending(attachments);
                self.state = SessionState::Idle;
                return Err(e);
            }
        };

        // First response bytes have arrived: commit the user turn and the
        // assistant placeholder, in submission order.
        store.append(model, Turn::user(input, attachments.clone()));
        store.append(model, Turn::assistant_placeholder());
        self.state = SessionState::Streaming;
        tracing::debug!(%model, "streaming response");

        // The request is with the transport now; attachments are
        // single-use, so their backing storage goes away.
        pipeline.release(&attachments).await;

        let mut decoder = FrameDecoder::new();

        'stream: loop {
            let chunk = tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!("stream cancelled; keeping partial content");
                    decoder.finish();
                    break 'stream;
                }
                chunk = byte_stream.next() => chunk,
            };

            match chunk {
                Some(Ok(bytes)) => {
                    for event in decoder.feed(&bytes) {
                        let snapshot = self.stats.update(&event, started.elapsed());
                        match event {
                            StreamEvent::Delta(text) => {
                                if let Some(turn) = store.last_turn_mut(model) {
                                    turn.append_delta(&text);
                                }
                                self.emit(SessionUpdate::Delta(text));
                                self.emit(SessionUpdate::Stats(snapshot));
                            }
                            StreamEvent::Done(_) => {
                                self.emit(SessionUpdate::Stats(snapshot));
                                break 'stream;
                            }
                        }
                    }
                }
                Some(Err(e)) => {
                    // Mid-stream failure: partial content already delivered
                    // is preserved, same as closure without a terminal frame.
                    tracing::warn!(error = %e, "transport closed mid-stream");
                    decoder.finish();
                    break 'stream;
                }
                None => {
                    decoder.finish();
                    break 'stream;
                }
            }
        }

        if let Some(turn) = store.last_turn_mut(model) {
            turn.settle();
            self.emit(SessionUpdate::Settled(turn.clone()));
        }
        self.state = SessionState::Settled;
        tracing::debug!(%model, "session settled");

        Ok(self.stats.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachments::FsAttachmentStore;
    use crate::config::AttachmentsConfig;
    use crate::transport::{ByteStream, ModelEntry};
    use async_trait::async_trait;
    use bytes::Bytes;

    /// Transport that replays a scripted chunk sequence
    struct ScriptedTransport {
        chunks: Vec<Vec<u8>>,
        fail_connect: bool,
    }

    impl ScriptedTransport {
        fn new(chunks: Vec<&str>) -> Self {
            Self {
                chunks: chunks.into_iter().map(|c| c.as_bytes().to_vec()).collect(),
                fail_connect: false,
            }
        }

        fn refusing() -> Self {
            Self {
                chunks: Vec::new(),
                fail_connect: true,
            }
        }
    }

    #[async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn chat_stream(&self, _request: &ChatRequest) -> Result<ByteStream> {
            if self.fail_connect {
                return Err(OzetteError::Transport("connection refused".into()).into());
            }
            let chunks: Vec<Result<Bytes>> = self
                .chunks
                .iter()
                .map(|c| Ok(Bytes::from(c.clone())))
                .collect();
            Ok(Box::pin(futures::stream::iter(chunks)))
        }

        async fn list_models(&self) -> Result<Vec<ModelEntry>> {
            Ok(Vec::new())
        }
    }

    fn pipeline() -> (AttachmentPipeline, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FsAttachmentStore::new(dir.path()));
        (
            AttachmentPipeline::new(store, AttachmentsConfig::default()),
            dir,
        )
    }

    #[tokio::test]
    async fn test_empty_input_rejected_without_network() {
        let mut session = Session::new(Arc::new(ScriptedTransport::refusing()));
        let mut store = ConversationStore::new();
        let (mut pipe, _dir) = pipeline();

        let err = session.submit("   ", "m1", &mut store, &mut pipe).await.unwrap_err();
        assert!(err
            .downcast_ref::<OzetteError>()
            .is_some_and(|e| matches!(e, OzetteError::EmptySubmit)));
        assert_eq!(session.state(), SessionState::Idle);
        assert!(store.history("m1").is_empty());
    }

    #[tokio::test]
    async fn test_missing_model_rejected() {
        let mut session = Session::new(Arc::new(ScriptedTransport::refusing()));
        let mut store = ConversationStore::new();
        let (mut pipe, _dir) = pipeline();

        let err = session.submit("hi", "", &mut store, &mut pipe).await.unwrap_err();
        assert!(err
            .downcast_ref::<OzetteError>()
            .is_some_and(|e| matches!(e, OzetteError::NoModelSelected)));
    }

    #[tokio::test]
    async fn test_transport_failure_leaves_store_untouched() {
        let mut session = Session::new(Arc::new(ScriptedTransport::refusing()));
        let mut store = ConversationStore::new();
        let (mut pipe, _dir) = pipeline();

        let result = session.submit("hello", "m1", &mut store, &mut pipe).await;
        assert!(result.is_err());
        assert!(store.history("m1").is_empty());
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_full_exchange_settles_with_stats() {
        let transport = ScriptedTransport::new(vec![
            "{\"message\":{\"content\":\"Hi\"},\"done\":false}\n",
            "{\"message\":{\"content\":\" there\"},\"done\":false}\n",
            "{\"done\":true,\"eval_count\":5,\"eval_duration\":1000000000,\"prompt_eval_count\":2,\"prompt_eval_duration\":500000000}\n",
        ]);
        let mut session = Session::new(Arc::new(transport));
        let mut store = ConversationStore::new();
        let (mut pipe, _dir) = pipeline();

        let stats = session.submit("hello", "m1", &mut store, &mut pipe).await.unwrap();

        assert_eq!(session.state(), SessionState::Settled);
        assert_eq!(stats.input_tokens, 2);
        assert_eq!(stats.output_tokens, 5);
        assert_eq!(stats.total_tokens, 7);
        assert_eq!(stats.tokens_per_second, 5.0);

        let history = store.history("m1");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, "user");
        assert_eq!(history[0].content, "hello");
        assert_eq!(history[1].role, "assistant");
        assert_eq!(history[1].content, "Hi there");
        assert!(!history[1].in_flight);
    }

    #[tokio::test]
    async fn test_closure_without_terminal_frame_settles_partial() {
        let transport = ScriptedTransport::new(vec![
            "{\"message\":{\"content\":\"par\"},\"done\":false}\n",
            "{\"message\":{\"content\":\"tial\"},\"done\":false}\n",
        ]);
        let mut session = Session::new(Arc::new(transport));
        let mut store = ConversationStore::new();
        let (mut pipe, _dir) = pipeline();

        let stats = session.submit("q", "m1", &mut store, &mut pipe).await.unwrap();

        assert_eq!(session.state(), SessionState::Settled);
        let history = store.history("m1");
        assert_eq!(history[1].content, "partial");
        assert!(!history[1].in_flight);
        // Heuristic counts stand; no authoritative counters ever arrived.
        assert_eq!(stats.output_tokens, 2);
        assert_eq!(stats.input_tokens, 0);
    }

    #[tokio::test]
    async fn test_resubmit_after_settlement_is_accepted() {
        let transport = ScriptedTransport::new(vec!["{\"done\":true}\n"]);
        let mut session = Session::new(Arc::new(transport));
        let mut store = ConversationStore::new();
        let (mut pipe, _dir) = pipeline();

        session.submit("one", "m1", &mut store, &mut pipe).await.unwrap();
        session.submit("two", "m1", &mut store, &mut pipe).await.unwrap();

        assert_eq!(store.history("m1").len(), 4);
    }

    #[tokio::test]
    async fn test_stats_reset_between_submissions() {
        let transport = ScriptedTransport::new(vec![
            "{\"message\":{\"content\":\"a\"},\"done\":false}\n{\"done\":true,\"eval_count\":9,\"eval_duration\":1000000000,\"prompt_eval_count\":3,\"prompt_eval_duration\":1}\n",
        ]);
        let mut session = Session::new(Arc::new(transport));
        let mut store = ConversationStore::new();
        let (mut pipe, _dir) = pipeline();

        let first = session.submit("one", "m1", &mut store, &mut pipe).await.unwrap();
        assert_eq!(first.total_tokens, 12);

        let second = session.submit("two", "m1", &mut store, &mut pipe).await.unwrap();
        // Fresh aggregator: same scripted counters, not accumulated ones.
        assert_eq!(second.total_tokens, 12);
    }

    #[tokio::test]
    async fn test_updates_stream_reports_exchange() {
        let transport = ScriptedTransport::new(vec![
            "{\"message\":{\"content\":\"Hi\"},\"done\":false}\n{\"done\":true}\n",
        ]);
        let mut session = Session::new(Arc::new(transport));
        let mut store = ConversationStore::new();
        let (mut pipe, _dir) = pipeline();

        let mut updates = session.updates();
        session.submit("hello", "m1", &mut store, &mut pipe).await.unwrap();

        match updates.next().await.unwrap() {
            SessionUpdate::Delta(text) => assert_eq!(text, "Hi"),
            other => panic!("expected delta, got {:?}", other),
        }
        assert!(matches!(updates.next().await.unwrap(), SessionUpdate::Stats(_)));
        assert!(matches!(updates.next().await.unwrap(), SessionUpdate::Stats(_)));
        match updates.next().await.unwrap() {
            SessionUpdate::Settled(turn) => {
                assert_eq!(turn.content, "Hi");
                assert!(!turn.in_flight);
            }
            other => panic!("expected settled, got {:?}", other),
        }
    }

    /// Yields one content frame and then never completes
    struct StallingTransport;

    #[async_trait]
    impl ChatTransport for StallingTransport {
        async fn chat_stream(&self, _request: &ChatRequest) -> Result<ByteStream> {
            let first = futures::stream::iter(vec![Ok(Bytes::from_static(
                b"{\"message\":{\"content\":\"par\"},\"done\":false}\n",
            ))]);
            Ok(Box::pin(first.chain(futures::stream::pending())))
        }

        async fn list_models(&self) -> Result<Vec<ModelEntry>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_cancel_mid_stream_keeps_partial_content() {
        let mut session = Session::new(Arc::new(StallingTransport));
        let mut store = ConversationStore::new();
        let (mut pipe, _dir) = pipeline();

        // Cancel as soon as the first delta lands; the transport would
        // otherwise stall forever.
        let cancel = session.cancel_token();
        let mut updates = session.updates();
        let canceller = tokio::spawn(async move {
            while let Some(update) = updates.next().await {
                if matches!(update, SessionUpdate::Delta(_)) {
                    cancel.cancel();
                    break;
                }
            }
        });

        let stats = session.submit("q", "m1", &mut store, &mut pipe).await.unwrap();
        canceller.await.unwrap();

        assert_eq!(session.state(), SessionState::Settled);
        let history = store.history("m1");
        assert_eq!(history[1].content, "par");
        assert!(!history[1].in_flight);
        assert_eq!(stats.output_tokens, 1);
    }

    #[tokio::test]
    async fn test_updates_are_dropped_without_subscriber() {
        // Two distinct scripted responses, consumed in order.
        struct SequencedTransport {
            scripts: std::sync::Mutex<std::collections::VecDeque<Vec<u8>>>,
        }

        #[async_trait]
        impl ChatTransport for SequencedTransport {
            async fn chat_stream(&self, _request: &ChatRequest) -> Result<ByteStream> {
                let chunk = self
                    .scripts
                    .lock()
                    .unwrap()
                    .pop_front()
                    .ok_or_else(|| OzetteError::Transport("script exhausted".into()))?;
                Ok(Box::pin(futures::stream::iter(vec![Ok(Bytes::from(chunk))])))
            }

            async fn list_models(&self) -> Result<Vec<ModelEntry>> {
                Ok(Vec::new())
            }
        }

        let transport = SequencedTransport {
            scripts: std::sync::Mutex::new(
                [
                    b"{\"message\":{\"content\":\"first\"},\"done\":false}\n{\"done\":true}\n"
                        .to_vec(),
                    b"{\"message\":{\"content\":\"second\"},\"done\":false}\n{\"done\":true}\n"
                        .to_vec(),
                ]
                .into_iter()
                .collect(),
            ),
        };

        let mut session = Session::new(Arc::new(transport));
        let mut store = ConversationStore::new();
        let (mut pipe, _dir) = pipeline();

        // No subscriber exists during the first exchange, so nothing from
        // it may be queued.
        session.submit("one", "m1", &mut store, &mut pipe).await.unwrap();

        let mut updates = session.updates();
        session.submit("two", "m1", &mut store, &mut pipe).await.unwrap();

        match updates.next().await.unwrap() {
            SessionUpdate::Delta(text) => assert_eq!(text, "second"),
            other => panic!("expected the second exchange's delta, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_histories_stay_isolated_across_models() {
        let transport = Arc::new(ScriptedTransport::new(vec!["{\"done\":true}\n"]));
        let mut session = Session::new(transport);
        let mut store = ConversationStore::new();
        let (mut pipe, _dir) = pipeline();

        session.submit("for m1", "m1", &mut store, &mut pipe).await.unwrap();
        session.submit("for m2", "m2", &mut store, &mut pipe).await.unwrap();

        assert_eq!(store.history("m1").len(), 2);
        assert_eq!(store.history("m2").len(), 2);
        assert_eq!(store.history("m1")[0].content, "for m1");
        assert_eq!(store.history("m2")[0].content, "for m2");
    }
}
