//! Decoded frame types for the streaming chat response
//!
//! Each line of the response body is one JSON object: either a content
//! delta carrying a piece of assistant text, or the terminal object with
//! `done: true` and the backend's token usage counters.

use serde::Deserialize;

/// One raw JSON frame from the chat stream, as sent by the backend
///
/// Intermediate frames look like `{"message":{"content":"Hi"},"done":false}`.
/// The terminal frame has `done: true` and optionally carries
/// `eval_count`, `eval_duration` (nanoseconds), `prompt_eval_count`, and
/// `prompt_eval_duration` (nanoseconds).
#[derive(Debug, Deserialize)]
pub struct ChatChunk {
    /// Partial assistant message, present on content frames
    #[serde(default)]
    pub message: Option<ChunkMessage>,

    /// True on the terminal frame
    #[serde(default)]
    pub done: bool,

    /// Output tokens generated, reported on the terminal frame
    #[serde(default)]
    pub eval_count: u64,

    /// Generation duration in nanoseconds
    #[serde(default)]
    pub eval_duration: u64,

    /// Prompt tokens evaluated, reported on the terminal frame
    #[serde(default)]
    pub prompt_eval_count: u64,

    /// Prompt evaluation duration in nanoseconds
    #[serde(default)]
    pub prompt_eval_duration: u64,
}

/// Message payload inside a content frame
#[derive(Debug, Deserialize)]
pub struct ChunkMessage {
    #[serde(default)]
    pub content: String,
}

/// Backend-reported usage counters from the terminal frame
///
/// A counter is only authoritative when it is positive and its paired
/// duration is positive; the statistics aggregator falls back to its
/// heuristic otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UsageCounters {
    pub eval_count: u64,
    pub eval_duration_ns: u64,
    pub prompt_eval_count: u64,
    pub prompt_eval_duration_ns: u64,
}

/// A decoded event from the chat stream
///
/// Events are transient: the session and the statistics aggregator consume
/// them synchronously and they are then discarded. A single wire frame may
/// produce both a `Delta` and a `Done` when the terminal frame carries a
/// trailing piece of content.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A piece of assistant text to append to the in-flight turn
    Delta(String),
    /// The stream is complete; counters may be all-zero if unreported
    Done(UsageCounters),
}

impl ChatChunk {
    /// Convert a wire frame into zero, one, or two [`StreamEvent`]s
    ///
    /// Order matters: a delta carried on the terminal frame is emitted
    /// before the `Done` event so the session appends it first.
    pub fn into_events(self) -> Vec<StreamEvent> {
        let mut events = Vec::with_capacity(2);

        if let Some(message) = self.message {
            if !message.content.is_empty() {
                events.push(StreamEvent::Delta(message.content));
            }
        }

        if self.done {
            events.push(StreamEvent::Done(UsageCounters {
                eval_count: self.eval_count,
                eval_duration_ns: self.eval_duration,
                prompt_eval_count: self.prompt_eval_count,
                prompt_eval_duration_ns: self.prompt_eval_duration,
            }));
        }

        events
    }
}
