//! Execution Timeline
//!
//! Records what happened to each step of a workflow instance: which
//! topic it was dispatched to, which branch a condition selected, which
//! steps were skipped, and where execution failed.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Type of timeline event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventType {
    /// Step message was published to a topic
    Dispatched { topic: String },
    /// Condition was evaluated; `branch` is the label it selected
    ConditionEvaluated { result: bool, branch: String },
    /// Step had an unrecognized type and was skipped
    Skipped { type_tag: String },
    /// Step raised an error and stopped the workflow
    Failed { reason: String },
}

/// A single event in the execution timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepEvent {
    /// Name of the step
    pub step: String,
    #[serde(flatten)]
    pub event_type: EventType,
    /// When the event occurred
    pub timestamp: DateTime<Utc>,
}

/// Ordered log of step events for one workflow instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionTimeline {
    events: Vec<StepEvent>,
}

impl ExecutionTimeline {
    /// Creates an empty timeline.
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Records an event for a step.
    pub fn add_event(&mut self, step: impl Into<String>, event_type: EventType) {
        self.events.push(StepEvent {
            step: step.into(),
            event_type,
            timestamp: Utc::now(),
        });
    }

    /// Returns all recorded events in order.
    pub fn get_events(&self) -> &[StepEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Returns the topics that were published to, in dispatch order.
    pub fn dispatched_topics(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match &event.event_type {
                EventType::Dispatched { topic } => Some(topic.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Renders a plain-text report, one line per event, with each event's
    /// offset from the first one.
    pub fn summary(&self) -> String {
        let mut output = String::from("Execution Timeline:\n");

        let Some(first) = self.events.first() else {
            output.push_str("  (no steps executed)\n");
            return output;
        };

        for event in &self.events {
            let offset = (event.timestamp - first.timestamp).num_milliseconds();
            let detail = match &event.event_type {
                EventType::Dispatched { topic } => format!("dispatched -> {}", topic),
                EventType::ConditionEvaluated { result, branch } => {
                    format!("condition {} -> {}", result, branch)
                }
                EventType::Skipped { type_tag } => format!("skipped (unknown type '{}')", type_tag),
                EventType::Failed { reason } => format!("FAILED: {}", reason),
            };
            let _ = writeln!(output, "  +{:>6} ms  {:12} {}", offset, truncate(&event.step, 12), detail);
        }

        output
    }
}

/// Truncates a string to a maximum length.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}
