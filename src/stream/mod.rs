//! Streaming wire protocol for the Ollama chat endpoint
//!
//! The backend replies with newline-delimited JSON objects. This module
//! contains the frame types ([`event`]) and the chunk-boundary-tolerant
//! decoder ([`decoder`]) that turns raw byte chunks into [`StreamEvent`]s.

pub mod decoder;
pub mod event;

pub use decoder::FrameDecoder;
pub use event::{ChatChunk, StreamEvent, UsageCounters};
