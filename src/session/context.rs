//! `SessionContext` — the shared, evolving workflow state.
//!
//! A flat record, deliberately: no graph, no cycles, single-writer
//! (the executor). Agents never see a `&mut SessionContext`; they return a
//! [`crate::executor::agent::PartialResult`] that the executor merges in.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// The canonical agent execution order. Every `completed_agents` value is a
/// prefix of this sequence.
pub const AGENT_SEQUENCE: [&str; 4] = ["orchestrator", "summariser", "linker", "visualiser"];

/// What kind of input the workflow is exploring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// Free-form prose, articles, notes.
    Document,
    /// A source tree.
    Codebase,
}

/// Workflow lifecycle state. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    /// Constructed, no step has begun.
    Pending,
    /// At least one step has begun.
    Running,
    /// All four agents ran and no fatal error occurred.
    Completed,
    /// A fatal error or cancellation terminated the run early.
    Failed,
}

/// Confidence band attached to an inferred relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Low confidence.
    Low,
    /// Medium confidence.
    Medium,
    /// High confidence.
    High,
}

/// A directed relationship between two entities, produced by the linker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRelationship {
    /// The source entity name.
    pub source: String,
    /// The target entity name.
    pub target: String,
    /// The relationship kind (free-form, agent-defined taxonomy).
    #[serde(rename = "type")]
    pub relationship_type: String,
    /// Human-readable label for display.
    pub label: String,
    /// How confident the linker is in this relationship.
    pub confidence: Confidence,
}

/// One recorded failure during a workflow run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEntry {
    /// The agent that produced (or was running when) this error.
    pub agent: String,
    /// The taxonomy kind string, e.g. `"agent_fault"`.
    pub error_kind: String,
    /// Human-readable message.
    pub message: String,
    /// When the error was recorded.
    pub timestamp: DateTime<Utc>,
}

/// The structured knowledge-graph payload produced by the visualiser.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GraphJson {
    /// Graph rendering kind, e.g. `"MIND_MAP"`.
    #[serde(rename = "type")]
    pub graph_type: String,
    /// Graph nodes, shape left to the visualiser plug-in.
    pub nodes: Vec<Value>,
    /// Graph edges, shape left to the visualiser plug-in.
    pub edges: Vec<Value>,
}

/// The shared, evolving workflow state.
///
/// Fields are grouped by which agent owns writing them; the executor is the
/// only code that ever constructs or mutates one directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    /// Stable, unique for the life of the workflow.
    pub session_id: String,
    /// Immutable after creation.
    pub raw_input: String,
    /// Set at creation, or by the orchestrator if undetermined.
    pub content_type: ContentType,

    /// Written once by the summariser.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_text: Option<String>,
    /// Written by the summariser (and the orchestrator's own notes key).
    pub summary_insights: HashMap<String, Value>,

    /// Written by the linker.
    pub key_entities: Vec<String>,
    /// Written by the linker.
    pub relationships: Vec<EntityRelationship>,
    /// Written by the linker.
    pub entity_metadata: HashMap<String, Value>,

    /// Written by the visualiser.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph_json: Option<GraphJson>,

    /// Append-only; always a prefix of [`AGENT_SEQUENCE`].
    pub completed_agents: Vec<String>,
    /// The agent currently executing, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_agent: Option<String>,
    /// Current lifecycle state.
    pub workflow_status: WorkflowStatus,
    /// Every observed error, in occurrence order.
    pub errors: Vec<ErrorEntry>,

    /// When the session was created.
    pub started_at: DateTime<Utc>,
    /// Last time any field was mutated.
    pub updated_at: DateTime<Utc>,

    /// Unknown fields encountered on deserialisation are logged and
    /// dropped rather than rejected, without widening the public schema.
    #[serde(skip)]
    _non_exhaustive: (),
}

impl SessionContext {
    /// Construct a brand-new context in `pending` state.
    pub fn new(raw_input: impl Into<String>, content_type: ContentType) -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::new_v4().to_string(),
            raw_input: raw_input.into(),
            content_type,
            summary_text: None,
            summary_insights: HashMap::new(),
            key_entities: Vec::new(),
            relationships: Vec::new(),
            entity_metadata: HashMap::new(),
            graph_json: None,
            completed_agents: Vec::new(),
            current_agent: None,
            workflow_status: WorkflowStatus::Pending,
            errors: Vec::new(),
            started_at: now,
            updated_at: now,
            _non_exhaustive: (),
        }
    }

    /// Whether `completed_agents` already contains all four agents in order.
    pub fn all_agents_completed(&self) -> bool {
        self.completed_agents == AGENT_SEQUENCE
    }

    /// Record a failure and bump `updated_at`. Does not change
    /// `workflow_status` — the executor decides that based on fatality.
    pub fn record_error(&mut self, agent: impl Into<String>, kind: &str, message: impl Into<String>) {
        self.errors.push(ErrorEntry {
            agent: agent.into(),
            error_kind: kind.to_string(),
            message: message.into(),
            timestamp: Utc::now(),
        });
        self.touch();
    }

    /// Bump `updated_at` to now. Called by the executor after every mutation.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_context_starts_pending_with_no_progress() {
        let ctx = SessionContext::new("hello world", ContentType::Document);
        assert_eq!(ctx.workflow_status, WorkflowStatus::Pending);
        assert!(ctx.completed_agents.is_empty());
        assert!(ctx.summary_text.is_none());
        assert!(!ctx.all_agents_completed());
    }

    #[test]
    fn all_agents_completed_requires_exact_order() {
        let mut ctx = SessionContext::new("x", ContentType::Document);
        ctx.completed_agents = vec!["orchestrator".into(), "summariser".into()];
        assert!(!ctx.all_agents_completed());
        ctx.completed_agents = AGENT_SEQUENCE.iter().map(|s| s.to_string()).collect();
        assert!(ctx.all_agents_completed());
    }

    #[test]
    fn round_trip_json_preserves_fields() {
        let mut ctx = SessionContext::new("round trip me", ContentType::Codebase);
        ctx.summary_text = Some("a summary".to_string());
        ctx.key_entities.push("mitochondrion".to_string());
        ctx.relationships.push(EntityRelationship {
            source: "mitochondrion".into(),
            target: "cell".into(),
            relationship_type: "part_of".into(),
            label: "part of".into(),
            confidence: Confidence::High,
        });

        let json = serde_json::to_string(&ctx).unwrap();
        let restored: SessionContext = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.session_id, ctx.session_id);
        assert_eq!(restored.summary_text, ctx.summary_text);
        assert_eq!(restored.key_entities, ctx.key_entities);
        assert_eq!(restored.relationships.len(), 1);
        assert_eq!(restored.relationships[0].confidence, Confidence::High);
    }

    #[test]
    fn record_error_appends_and_touches() {
        let mut ctx = SessionContext::new("x", ContentType::Document);
        let before = ctx.updated_at;
        std::thread::sleep(std::time::Duration::from_millis(2));
        ctx.record_error("linker", "agent_fault", "boom");
        assert_eq!(ctx.errors.len(), 1);
        assert_eq!(ctx.errors[0].agent, "linker");
        assert!(ctx.updated_at >= before);
    }
}
