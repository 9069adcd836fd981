//! Per-model conversation histories
//!
//! Each model identifier owns an ordered sequence of [`Turn`]s; switching
//! the active model swaps the visible sequence without touching any other
//! model's history. Histories live for the process lifetime only.

use crate::attachments::AttachmentRef;
use std::collections::HashMap;

/// One exchange unit in a conversation
///
/// A user turn is created at submission time; an assistant turn is created
/// empty when the first response bytes arrive and grows by delta appends
/// while `in_flight` is true. Once settled it is never mutated again.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    /// Role of the turn ("user" or "assistant")
    pub role: String,
    /// Full text of the turn
    pub content: String,
    /// Attachments bound to this turn (user turns only, order preserved)
    pub attachments: Vec<AttachmentRef>,
    /// True while the assistant turn is still streaming
    pub in_flight: bool,
}

impl Turn {
    /// Creates a settled user turn with its bound attachments
    ///
    /// # Examples
    ///
    /// ```
    /// use ozette::conversation::Turn;
    ///
    /// let turn = Turn::user("hello", Vec::new());
    /// assert_eq!(turn.role, "user");
    /// assert!(!turn.in_flight);
    /// ```
    pub fn user(content: impl Into<String>, attachments: Vec<AttachmentRef>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
            attachments,
            in_flight: false,
        }
    }

    /// Creates the empty in-flight assistant placeholder
    pub fn assistant_placeholder() -> Self {
        Self {
            role: "assistant".to_string(),
            content: String::new(),
            attachments: Vec::new(),
            in_flight: true,
        }
    }

    /// Appends a content delta to an in-flight turn
    ///
    /// Appends are concatenation in arrival order; a settled turn ignores
    /// them (the stream has already completed).
    pub fn append_delta(&mut self, delta: &str) {
        if self.in_flight {
            self.content.push_str(delta);
        }
    }

    /// Marks the turn settled; no further mutation is accepted
    pub fn settle(&mut self) {
        self.in_flight = false;
    }
}

/// Mapping from model identifier to its ordered turn history
///
/// The store is the only state shared across sessions for different
/// models; a session for one model never writes into another model's
/// history because every write is keyed by the caller-held model handle.
///
/// # Examples
///
/// ```
/// use ozette::conversation::{ConversationStore, Turn};
///
/// let mut store = ConversationStore::new();
/// store.append("m1", Turn::user("hi", Vec::new()));
/// assert_eq!(store.history("m1").len(), 1);
/// assert!(store.history("m2").is_empty());
/// ```
#[derive(Debug, Default)]
pub struct ConversationStore {
    histories: HashMap<String, Vec<Turn>>,
}

impl ConversationStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a turn to the given model's history
    pub fn append(&mut self, model: &str, turn: Turn) {
        self.histories.entry(model.to_string()).or_default().push(turn);
    }

    /// Returns the ordered turn history for a model
    ///
    /// A model that has never been selected yields an empty slice.
    pub fn history(&self, model: &str) -> &[Turn] {
        self.histories.get(model).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Makes a model's history visible, creating an empty one on first use
    ///
    /// Returns the (possibly empty) turn sequence for the model. No other
    /// model's history is discarded.
    pub fn switch_model(&mut self, model: &str) -> &[Turn] {
        self.histories.entry(model.to_string()).or_default()
    }

    /// Mutable access to the most recent turn of a model's history
    ///
    /// Used by the session to grow the in-flight assistant turn.
    pub fn last_turn_mut(&mut self, model: &str) -> Option<&mut Turn> {
        self.histories.get_mut(model).and_then(|turns| turns.last_mut())
    }

    /// Model identifiers with recorded history, in no particular order
    pub fn models(&self) -> Vec<&str> {
        self.histories.keys().map(String::as_str).collect()
    }
}
