//! Reasoning-trace extraction from assistant text
//!
//! Some models interleave a chain-of-thought block with their visible
//! answer, delimited by `<think>` and `</think>` markers. The splitter
//! separates the two so the presentation layer can render the trace
//! collapsed or dimmed, without the core ever interpreting the content.

/// Assistant text split into its visible answer and optional reasoning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedText {
    /// Text intended for the user, markers removed, trimmed
    pub visible: String,
    /// The reasoning trace, if the text carried one
    pub thinking: Option<String>,
}

const OPEN_MARKER: &str = "<think>";
const CLOSE_MARKER: &str = "</think>";

/// Split assistant text on `<think>`/`</think>` markers
///
/// Handles the partial forms models actually emit:
///
/// - both markers present: the enclosed text is the reasoning trace and
///   the surrounding text is the visible answer
/// - opening marker only (stream cut off mid-thought): everything after
///   the marker is the trace
/// - closing marker only (opener lost to an earlier truncation): the
///   marker is stripped and no trace is reported
/// - no markers: the text passes through untouched
///
/// # Examples
///
/// ```
/// use ozette::annotate::split_reasoning;
///
/// let parts = split_reasoning("<think>hmm</think>Paris.");
/// assert_eq!(parts.visible, "Paris.");
/// assert_eq!(parts.thinking.as_deref(), Some("hmm"));
/// ```
pub fn split_reasoning(text: &str) -> AnnotatedText {
    let Some(open) = text.find(OPEN_MARKER) else {
        if let Some(close) = text.find(CLOSE_MARKER) {
            // Lone closing marker: drop it, keep everything else visible.
            let mut visible = String::with_capacity(text.len() - CLOSE_MARKER.len());
            visible.push_str(&text[..close]);
            visible.push_str(&text[close + CLOSE_MARKER.len()..]);
            return AnnotatedText {
                visible: visible.trim().to_string(),
                thinking: None,
            };
        }
        return AnnotatedText {
            visible: text.to_string(),
            thinking: None,
        };
    };

    let before = &text[..open];
    let after_open = &text[open + OPEN_MARKER.len()..];

    match after_open.find(CLOSE_MARKER) {
        Some(close) => {
            let thinking = &after_open[..close];
            let after = &after_open[close + CLOSE_MARKER.len()..];
            AnnotatedText {
                visible: format!("{}{}", before, after).trim().to_string(),
                thinking: Some(thinking.trim().to_string()),
            }
        }
        None => AnnotatedText {
            // Unterminated trace: the stream ended mid-thought.
            visible: before.trim().to_string(),
            thinking: Some(after_open.trim().to_string()),
        },
    }
}
