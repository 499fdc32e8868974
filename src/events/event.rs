//! The progress event shape streamed to a session's subscriber.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session::context::{EntityRelationship, GraphJson};

/// Lifecycle state of one agent step, as seen by a stream subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    /// The step has been scheduled but not yet invoked.
    Queued,
    /// The agent plug-in is currently running.
    Processing,
    /// The step finished successfully.
    Complete,
    /// The step (or the workflow) terminated with an error.
    Error,
}

/// Progress metadata accompanying every event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMetadata {
    /// Milliseconds since the workflow started.
    pub elapsed_ms: u64,
    /// 1-based step index of the agent this event concerns.
    pub step: usize,
    /// Total steps in the canonical sequence (always 4).
    pub total_steps: usize,
    /// The canonical agent execution order, for client display.
    pub agent_sequence: Vec<String>,
}

/// The typed, optional fields carried by an event, shaped by `status`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    /// Present on the summariser's `complete` event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Present on the linker's `complete` event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<String>>,
    /// Present on the linker's `complete` event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationships: Option<Vec<EntityRelationship>>,
    /// Present on the visualiser's `complete` event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visualization: Option<GraphJson>,
    /// Present on `error` events: the taxonomy kind.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Present on `error` events: a human-readable message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
    /// Optional partial results requested via `include_partial_results`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial_results: Option<serde_json::Value>,
}

/// One progress event in a session's stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    /// Unique event id.
    pub id: String,
    /// The agent this event concerns.
    pub agent: String,
    /// Lifecycle state.
    pub status: EventStatus,
    /// When the event was produced.
    pub timestamp: DateTime<Utc>,
    /// Progress metadata.
    pub metadata: EventMetadata,
    /// Status-dependent payload.
    pub payload: EventPayload,
}

impl ProgressEvent {
    /// Construct a new event with a fresh id and the current timestamp.
    pub fn new(
        agent: impl Into<String>,
        status: EventStatus,
        metadata: EventMetadata,
        payload: EventPayload,
    ) -> Self {
        Self {
            id: format!("evt_{}", Uuid::new_v4()),
            agent: agent.into(),
            status,
            timestamp: Utc::now(),
            metadata,
            payload,
        }
    }

    /// A synthetic event inserted when a session's buffer overflows,
    /// replacing the oldest dropped entry.
    pub fn buffer_overflow(agent_sequence: &[String]) -> Self {
        Self::new(
            "hub",
            EventStatus::Error,
            EventMetadata {
                elapsed_ms: 0,
                step: 0,
                total_steps: agent_sequence.len(),
                agent_sequence: agent_sequence.to_vec(),
            },
            EventPayload {
                error: Some("buffer_overflow".to_string()),
                error_details: Some("event buffer overflowed; oldest events were dropped".to_string()),
                ..Default::default()
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_overflow_event_carries_error_kind() {
        let event = ProgressEvent::buffer_overflow(&["orchestrator".to_string()]);
        assert_eq!(event.status, EventStatus::Error);
        assert_eq!(event.payload.error.as_deref(), Some("buffer_overflow"));
    }

    #[test]
    fn serialises_without_absent_optional_fields() {
        let event = ProgressEvent::new(
            "summariser",
            EventStatus::Queued,
            EventMetadata {
                elapsed_ms: 0,
                step: 2,
                total_steps: 4,
                agent_sequence: vec!["orchestrator".into(), "summariser".into()],
            },
            EventPayload::default(),
        );
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("\"summary\""));
    }
}
