//! Newline-delimited JSON frame decoder
//!
//! Transport chunks arrive in arbitrary sizes: one logical frame may span
//! several chunks, or one chunk may carry several frames. [`FrameDecoder`]
//! holds the trailing partial line between `feed` calls so the decoded
//! event sequence is identical for every chunking of the same byte stream.

use crate::stream::event::{ChatChunk, StreamEvent};

/// Stateful decoder turning raw byte chunks into [`StreamEvent`]s
///
/// The carry buffer holds at most one pending partial line. Malformed lines
/// are skipped with a warning so a single corrupt frame never loses the
/// rest of the response.
///
/// # Examples
///
/// ```
/// use ozette::stream::{FrameDecoder, StreamEvent};
///
/// let mut decoder = FrameDecoder::new();
/// let events = decoder.feed(b"{\"message\":{\"content\":\"Hi\"},\"done\":false}\n");
/// assert_eq!(events, vec![StreamEvent::Delta("Hi".to_string())]);
/// ```
#[derive(Debug, Default)]
pub struct FrameDecoder {
    /// Bytes of the trailing, possibly-incomplete line
    carry: Vec<u8>,
}

impl FrameDecoder {
    /// Create a decoder with an empty carry buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one transport chunk, yielding all events completed by it
    ///
    /// The chunk is appended to the carry buffer and every complete
    /// newline-terminated segment is parsed as one JSON frame. The trailing
    /// segment (everything after the last newline) becomes the new carry
    /// buffer. Empty and whitespace-only segments are dropped silently.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.carry.extend_from_slice(chunk);

        let mut events = Vec::new();

        // Split on newline; the segment after the last newline stays carried.
        while let Some(pos) = self.carry.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.carry.drain(..=pos).take(pos).collect();
            self.decode_line(&line, &mut events);
        }

        events
    }

    /// Signal end of stream
    ///
    /// A non-empty carry buffer at this point means the transport closed
    /// mid-line. The truncated frame is never parsed; it is reported as a
    /// warning because upstream has already closed the connection.
    pub fn finish(&mut self) {
        if !self.carry.is_empty() && !self.carry.iter().all(|b| b.is_ascii_whitespace()) {
            tracing::warn!(
                bytes = self.carry.len(),
                "stream ended with an unterminated frame; discarding"
            );
        }
        self.carry.clear();
    }

    /// Returns true if a partial line is currently carried
    pub fn has_partial(&self) -> bool {
        !self.carry.is_empty()
    }

    fn decode_line(&self, line: &[u8], events: &mut Vec<StreamEvent>) {
        if line.iter().all(|b| b.is_ascii_whitespace()) {
            return;
        }

        match serde_json::from_slice::<ChatChunk>(line) {
            Ok(chunk) => events.extend(chunk.into_events()),
            Err(e) => {
                // Skip-and-continue: one bad frame must not abort the stream.
                tracing::warn!(error = %e, "skipping malformed stream frame");
            }
        }
    }
}
