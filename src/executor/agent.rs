//! The agent plug-in interface: a capability interface
//! (`process`) plus data-only records, replacing a base-class
//! agent hierarchy.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::ModelType;
use crate::error::NavigatorResult;
use crate::session::context::{EntityRelationship, GraphJson, SessionContext};

/// A cooperative cancellation signal shared between the executor and a
/// running agent invocation: cheap to clone, checked by polling
/// rather than by forced abort.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Construct a fresh, not-yet-cancelled token.
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Signal cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been signalled.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-invocation options passed to every agent.
#[derive(Clone)]
pub struct AgentOptions {
    /// Which model tier the agent should prefer.
    pub model_type: ModelType,
    /// The workflow's correlation id, for the agent's own tracing.
    pub correlation_id: String,
    /// Polled by long-running agent work to observe cooperative cancellation.
    pub cancellation_token: CancellationToken,
}

/// An agent's typed delta to merge into the shared [`SessionContext`].
/// Recognised keys only — this being a typed
/// Rust interface rather than a free-form map, there is no "unknown key" to
/// log and ignore; a plug-in can only populate fields that exist here.
#[derive(Debug, Clone, Default)]
pub struct PartialResult {
    /// Summariser: the produced summary text.
    pub summary_text: Option<String>,
    /// Orchestrator/summariser: structured insights.
    pub summary_insights: HashMap<String, Value>,
    /// Linker: discovered entities.
    pub key_entities: Vec<String>,
    /// Linker: discovered relationships.
    pub relationships: Vec<EntityRelationship>,
    /// Linker: per-entity attributes.
    pub entity_metadata: HashMap<String, Value>,
    /// Orchestrator: content type, if it determined one that was absent.
    pub content_type: Option<crate::session::context::ContentType>,
    /// Visualiser: the produced graph.
    pub graph_json: Option<GraphJson>,
}

/// The capability interface every agent plug-in implements: a capability
/// interface plus data-only records for per-agent metadata, rather than an
/// inheritance hierarchy.
#[async_trait]
pub trait AgentPlugin: Send + Sync {
    /// This plug-in's name, matching one of
    /// [`crate::session::context::AGENT_SEQUENCE`].
    fn name(&self) -> &str;

    /// Run this agent's step against a read-only view of the context,
    /// returning a partial result to merge in, or an error recorded against
    /// this agent's name.
    async fn process(
        &self,
        context: &SessionContext,
        options: &AgentOptions,
    ) -> NavigatorResult<PartialResult>;
}
