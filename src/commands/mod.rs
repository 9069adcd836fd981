/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

It exposes two top-level command modules:

- `chat`   — Interactive streaming chat session
- `models` — Model discovery against the backend

These handlers are intentionally small and use the library components:
the transport, the session, the conversation store, and the attachment
pipeline.
*/

pub mod chat;
pub mod models;
