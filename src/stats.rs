//! Live token statistics for a streaming response
//!
//! The aggregator consumes every decoded [`StreamEvent`] and derives a
//! fresh [`StatsSnapshot`] each time, so the presentation layer observes a
//! plausible live throughput figure during generation and the backend's
//! authoritative figure at stream end.
//!
//! # Counter precedence
//!
//! Backend-reported counters on the terminal frame win over the running
//! heuristic, but only when the corresponding duration is positive:
//!
//! - `prompt_eval_count` with positive `prompt_eval_duration` sets the
//!   input token count.
//! - `eval_count` with positive `eval_duration` sets the output token
//!   count and tokens/sec = `eval_count / (eval_duration / 1e9)`.
//!
//! Without authoritative output counters the heuristic applies: one output
//! token per content delta, tokens/sec = heuristic count / elapsed wall
//! clock. Division edge cases (zero duration, zero elapsed, NaN) are
//! normalized to `0`, never propagated.

use crate::stream::event::{StreamEvent, UsageCounters};
use std::time::Duration;

/// A point-in-time view of session statistics
///
/// Snapshots are recomputed from scratch on every update and never mutated
/// in place. `total_tokens` is always `input_tokens + output_tokens`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatsSnapshot {
    /// Output throughput, rounded to two decimals, never negative or NaN
    pub tokens_per_second: f64,
    /// Prompt tokens evaluated by the backend
    pub input_tokens: u64,
    /// Output tokens generated (heuristic until the backend reports)
    pub output_tokens: u64,
    /// Derived sum of input and output tokens
    pub total_tokens: u64,
    /// Model that produced these numbers
    pub model_name: String,
}

/// Accumulates token counts across one streaming response
///
/// Reset whenever a new user turn is submitted; updated on every decoded
/// event with the elapsed wall clock supplied by the caller.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use ozette::stats::StatsAggregator;
/// use ozette::stream::StreamEvent;
///
/// let mut stats = StatsAggregator::new("gemma3:4b");
/// let snapshot = stats.update(
///     &StreamEvent::Delta("Hi".to_string()),
///     Duration::from_secs(1),
/// );
/// assert_eq!(snapshot.output_tokens, 1);
/// assert_eq!(snapshot.tokens_per_second, 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct StatsAggregator {
    model_name: String,
    input_tokens: u64,
    output_tokens: u64,
    /// True once the backend's eval counters have overwritten the heuristic
    precise_output: bool,
    tokens_per_second: f64,
}

impl StatsAggregator {
    /// Create an all-zero aggregator for the given model
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            input_tokens: 0,
            output_tokens: 0,
            precise_output: false,
            tokens_per_second: 0.0,
        }
    }

    /// Reset all counters for a new submission, keeping the model name fresh
    pub fn reset(&mut self, model_name: impl Into<String>) {
        *self = Self::new(model_name);
    }

    /// Consume one decoded event and derive a fresh snapshot
    ///
    /// # Arguments
    ///
    /// * `event` - The decoded stream event
    /// * `elapsed` - Wall clock time since the submission started
    pub fn update(&mut self, event: &StreamEvent, elapsed: Duration) -> StatsSnapshot {
        match event {
            StreamEvent::Delta(_) => {
                if !self.precise_output {
                    self.output_tokens += 1;
                }
                self.tokens_per_second = heuristic_rate(self.output_tokens, elapsed);
            }
            StreamEvent::Done(usage) => self.apply_usage(*usage, elapsed),
        }

        self.snapshot()
    }

    /// Current snapshot without consuming an event
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            tokens_per_second: round2(normalize(self.tokens_per_second)),
            input_tokens: self.input_tokens,
            output_tokens: self.output_tokens,
            total_tokens: self.input_tokens + self.output_tokens,
            model_name: self.model_name.clone(),
        }
    }

    fn apply_usage(&mut self, usage: UsageCounters, elapsed: Duration) {
        if usage.prompt_eval_count > 0 && usage.prompt_eval_duration_ns > 0 {
            self.input_tokens = usage.prompt_eval_count;
        }

        if usage.eval_count > 0 && usage.eval_duration_ns > 0 {
            self.output_tokens = usage.eval_count;
            self.precise_output = true;
            self.tokens_per_second =
                usage.eval_count as f64 / (usage.eval_duration_ns as f64 / 1e9);
        } else if self.output_tokens > 0 {
            self.tokens_per_second = heuristic_rate(self.output_tokens, elapsed);
        } else {
            self.tokens_per_second = 0.0;
        }
    }
}

/// Heuristic throughput: observed deltas over elapsed wall clock
fn heuristic_rate(output_tokens: u64, elapsed: Duration) -> f64 {
    let seconds = elapsed.as_secs_f64();
    if seconds > 0.0 {
        output_tokens as f64 / seconds
    } else {
        0.0
    }
}

/// Clamp non-finite or negative rates to zero
fn normalize(rate: f64) -> f64 {
    if rate.is_finite() && rate > 0.0 {
        rate
    } else {
        0.0
    }
}

/// Round to two decimal places for display parity with the stats panel
fn round2(rate: f64) -> f64 {
    (rate * 100.0).round() / 100.0
}
