//! Ozette - streaming chat client library for Ollama
//!
//! This library provides the core functionality for the Ozette chat
//! client: NDJSON stream decoding, live token statistics, per-model
//! conversation histories, and single-use document attachments.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `stream`: NDJSON frame decoding tolerant of arbitrary chunk boundaries
//! - `session`: Exchange lifecycle (`Idle → Sending → Streaming → Settled`)
//! - `stats`: Token statistics with backend counters over heuristic fallback
//! - `conversation`: Per-model turn histories
//! - `attachments`: Staging, binding, and release of uploaded documents
//! - `transport`: HTTP transport speaking the Ollama API
//! - `annotate`: Reasoning-trace extraction from assistant text
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use ozette::{Config, Session};
//! use ozette::transport::OllamaTransport;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let transport = Arc::new(OllamaTransport::new(&config.ollama)?);
//!     let _session = Session::new(transport);
//!     Ok(())
//! }
//! ```

pub mod annotate;
pub mod attachments;
pub mod cli;
pub mod commands;
pub mod config;
pub mod conversation;
pub mod error;
pub mod session;
pub mod stats;
pub mod stream;
pub mod transport;

// Re-export commonly used types
pub use config::Config;
pub use conversation::{ConversationStore, Turn};
pub use error::{OzetteError, Result};
pub use session::{Session, SessionState, SessionUpdate};
pub use stats::{StatsAggregator, StatsSnapshot};
pub use stream::{FrameDecoder, StreamEvent};
