//! `A2AMessage` — every message on the bus.
//!
//! Payloads are typed by message kind rather than a free-form map: tagged
//! variants with schema-level validation at the bus boundary, rejecting
//! unknown keys. [`MessagePayload`] is an adjacently-tagged enum: the wire
//! form carries a
//! `messageType` discriminator and a `data` object shaped only by that
//! variant, in the spirit of an internally-tagged payload convention,
//! keeping `message_type` and `data` as the field names.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::session::context::{EntityRelationship, GraphJson};

/// Delivery precedence on a recipient queue. Higher values drain first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Lowest precedence.
    Low,
    /// Default precedence.
    Medium,
    /// Above default.
    High,
    /// Drained before everything else. Avoid flooding with this priority —
    /// the bus provides no starvation guarantee.
    Critical,
}

/// Lifecycle state of a message on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// Enqueued, not yet delivered.
    Pending,
    /// Delivered to the recipient and marked in-flight by `receive`.
    Processing,
    /// Acknowledged successfully.
    Completed,
    /// Acknowledged as failed.
    Failed,
}

/// The security envelope every message carries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityEnvelope {
    /// The sender's resolved service-account identity.
    pub service_account_id: String,
    /// Base64-encoded signature over the canonical message bytes.
    pub signature: String,
    /// Signing algorithm name, e.g. `"hmac-sha256"` or `"pbkdf2-hmac-sha256"`.
    pub algorithm: String,
    /// Set `true` only once the bus has verified the signature and
    /// authorisation for this message.
    pub verified: bool,
}

impl SecurityEnvelope {
    /// An unsigned, unverified envelope — filled in during `publish`.
    pub fn unsigned(service_account_id: impl Into<String>) -> Self {
        Self {
            service_account_id: service_account_id.into(),
            signature: String::new(),
            algorithm: String::new(),
            verified: false,
        }
    }
}

/// Correlation and causal-parent tracking. `parent_message_id` induces a
/// DAG across messages, never a cycle — store as an id reference only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceContext {
    /// Constant across every message generated within one workflow run.
    pub correlation_id: String,
    /// The message this one is causally descended from, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_message_id: Option<String>,
    /// A per-message span identifier for fine-grained tracing.
    pub span_id: String,
    /// Free-form trace metadata.
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl TraceContext {
    /// Start a fresh trace, generating a new correlation id.
    pub fn new_root() -> Self {
        Self {
            correlation_id: Uuid::new_v4().to_string(),
            parent_message_id: None,
            span_id: Uuid::new_v4().to_string(),
            metadata: HashMap::new(),
        }
    }

    /// Derive a child trace that inherits `correlation_id` from `self` and
    /// sets `parent_message_id` to `parent_id`.
    pub fn child_of(&self, parent_id: impl Into<String>) -> Self {
        Self {
            correlation_id: self.correlation_id.clone(),
            parent_message_id: Some(parent_id.into()),
            span_id: Uuid::new_v4().to_string(),
            metadata: HashMap::new(),
        }
    }
}

/// The typed, per-kind payload of an [`A2AMessage`].
///
/// Unknown fields within a known variant are rejected by serde's normal
/// strict struct deserialisation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "messageType", content = "data")]
pub enum MessagePayload {
    /// Orchestrator (or self) asks an agent to run its step.
    TaskDelegation {
        /// The step being delegated, e.g. `"summarise"`.
        task: String,
        /// Arbitrary task parameters (model_type, correlation id echo, etc).
        #[serde(default)]
        parameters: HashMap<String, Value>,
    },
    /// Summariser's completion announcement.
    SummarizationCompleted {
        /// The produced summary text.
        summary_text: String,
        /// Structured insights accompanying the summary.
        #[serde(default)]
        insights: HashMap<String, Value>,
    },
    /// Linker's completion announcement.
    RelationshipMapped {
        /// Entities discovered.
        key_entities: Vec<String>,
        /// Relationships discovered.
        relationships: Vec<EntityRelationship>,
        /// Per-entity attributes.
        #[serde(default)]
        entity_metadata: HashMap<String, Value>,
    },
    /// Visualiser's completion announcement.
    VisualizationReady {
        /// The produced graph.
        graph: GraphJson,
    },
    /// A direct field handoff between agents outside the normal
    /// completion messages (e.g. orchestrator pre-seeding context).
    KnowledgeTransfer {
        /// Arbitrary keyed fields being transferred.
        fields: HashMap<String, Value>,
    },
    /// A lightweight heartbeat/progress announcement.
    AgentStatus {
        /// Free-form status string, e.g. `"working"`.
        status: String,
        /// Optional human-readable detail.
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
}

impl MessagePayload {
    /// The stable discriminator string for this payload's kind — used for
    /// bus `receive` type filtering and store history filtering.
    pub fn tag(&self) -> &'static str {
        match self {
            MessagePayload::TaskDelegation { .. } => "TaskDelegation",
            MessagePayload::SummarizationCompleted { .. } => "SummarizationCompleted",
            MessagePayload::RelationshipMapped { .. } => "RelationshipMapped",
            MessagePayload::VisualizationReady { .. } => "VisualizationReady",
            MessagePayload::KnowledgeTransfer { .. } => "KnowledgeTransfer",
            MessagePayload::AgentStatus { .. } => "AgentStatus",
        }
    }
}

/// Address meaning "every registered agent except the sender".
pub const BROADCAST: &str = "*";

/// Every message on the A2A bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct A2AMessage {
    /// Unique, process-wide.
    pub message_id: String,
    /// Sending agent's name.
    pub from_agent: String,
    /// Recipient agent's name, or [`BROADCAST`].
    pub to_agent: String,
    /// Delivery precedence.
    pub priority: Priority,
    /// Lifecycle state.
    pub status: MessageStatus,
    /// Wall-clock seconds since the epoch, with fractional precision.
    pub timestamp: f64,
    /// Seconds until expiry; `0` means the message never expires.
    pub ttl_seconds: u64,
    /// Signing/authorisation envelope.
    pub security: SecurityEnvelope,
    /// Correlation and causal-parent tracking.
    pub trace: TraceContext,
    /// The typed payload.
    pub payload: MessagePayload,
}

impl A2AMessage {
    /// Construct a new, unsigned message. `publish` fills in `security` and
    /// assigns `trace.correlation_id` if absent.
    pub fn new(
        from_agent: impl Into<String>,
        to_agent: impl Into<String>,
        priority: Priority,
        ttl_seconds: u64,
        trace: TraceContext,
        payload: MessagePayload,
        now: f64,
    ) -> Self {
        let from_agent = from_agent.into();
        Self {
            message_id: Uuid::new_v4().to_string(),
            security: SecurityEnvelope::unsigned(from_agent.clone()),
            from_agent,
            to_agent: to_agent.into(),
            priority,
            status: MessageStatus::Pending,
            timestamp: now,
            ttl_seconds,
            trace,
            payload,
        }
    }

    /// Whether `to_agent` addresses every registered agent except the sender.
    pub fn is_broadcast(&self) -> bool {
        self.to_agent == BROADCAST
    }

    /// `true` once `timestamp + ttl_seconds < now - skew_tolerance`.
    /// `ttl_seconds == 0` means the message never expires.
    pub fn is_expired(&self, now: f64, clock_skew_tolerance_seconds: i64) -> bool {
        if self.ttl_seconds == 0 {
            return false;
        }
        let deadline = self.timestamp + self.ttl_seconds as f64;
        now - clock_skew_tolerance_seconds as f64 > deadline
    }

    /// The stable discriminator string for this message's payload kind.
    pub fn message_type_tag(&self) -> &'static str {
        self.payload.tag()
    }

    /// Canonical bytes to sign/verify: the message with `security.signature`
    /// cleared, serialised with serde_json's stable field order (derive
    /// order) and no insignificant whitespace.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut canon = self.clone();
        canon.security.signature.clear();
        serde_json::to_vec(&canon).expect("A2AMessage always serialises")
    }
}

/// Orders by `(priority desc, timestamp asc)` — the bus's `receive` sort
/// order.
pub fn delivery_order(a: &A2AMessage, b: &A2AMessage) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| a.timestamp.partial_cmp(&b.timestamp).unwrap_or(Ordering::Equal))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> A2AMessage {
        A2AMessage::new(
            "orchestrator",
            "summariser",
            Priority::Medium,
            60,
            TraceContext::new_root(),
            MessagePayload::TaskDelegation {
                task: "summarise".into(),
                parameters: HashMap::new(),
            },
            1_000.0,
        )
    }

    #[test]
    fn zero_ttl_never_expires() {
        let mut m = sample();
        m.ttl_seconds = 0;
        assert!(!m.is_expired(1_000_000.0, 5));
    }

    #[test]
    fn ttl_expiry_respects_clock_skew_tolerance() {
        let m = sample(); // timestamp 1000, ttl 60 -> deadline 1060
        assert!(!m.is_expired(1064.0, 5)); // within tolerance
        assert!(m.is_expired(1066.0, 5)); // past tolerance
    }

    #[test]
    fn priority_then_timestamp_ordering() {
        let mut high = sample();
        high.priority = Priority::High;
        high.timestamp = 2000.0;
        let mut low_earlier = sample();
        low_earlier.priority = Priority::Low;
        low_earlier.timestamp = 1.0;
        assert_eq!(delivery_order(&high, &low_earlier), Ordering::Less);

        let mut medium_early = sample();
        medium_early.timestamp = 1.0;
        let mut medium_late = sample();
        medium_late.timestamp = 2.0;
        assert_eq!(delivery_order(&medium_early, &medium_late), Ordering::Less);
    }

    #[test]
    fn canonical_bytes_ignore_signature_field() {
        let mut m = sample();
        let base = m.canonical_bytes();
        m.security.signature = "deadbeef".into();
        let after = m.canonical_bytes();
        assert_eq!(base, after);
    }

    #[test]
    fn payload_tag_matches_variant() {
        let m = sample();
        assert_eq!(m.message_type_tag(), "TaskDelegation");
    }
}
