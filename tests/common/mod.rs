//! Shared test fixtures for integration tests: stub agent plug-ins and a
//! ready-made executor wiring.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use agentic_navigator_core::prelude::*;
use agentic_navigator_core::session::context::{Confidence, EntityRelationship, GraphJson};
use async_trait::async_trait;
use serde_json::json;

/// Orchestrator stub: records nothing, just marks its step complete.
pub struct NoopOrchestrator;

#[async_trait]
impl AgentPlugin for NoopOrchestrator {
    fn name(&self) -> &str {
        "orchestrator"
    }

    async fn process(&self, _context: &SessionContext, _options: &AgentOptions) -> NavigatorResult<PartialResult> {
        Ok(PartialResult::default())
    }
}

/// Summariser stub producing a deterministic summary and an insight.
pub struct StubSummariser;

#[async_trait]
impl AgentPlugin for StubSummariser {
    fn name(&self) -> &str {
        "summariser"
    }

    async fn process(&self, context: &SessionContext, _options: &AgentOptions) -> NavigatorResult<PartialResult> {
        let mut insights = HashMap::new();
        insights.insert("word_count".to_string(), json!(context.raw_input.split_whitespace().count()));
        Ok(PartialResult {
            summary_text: Some(format!("summary of: {}", context.raw_input)),
            summary_insights: insights,
            ..Default::default()
        })
    }
}

/// Linker stub that always discovers the same mitochondrion/cell pair.
pub struct StubLinker;

#[async_trait]
impl AgentPlugin for StubLinker {
    fn name(&self) -> &str {
        "linker"
    }

    async fn process(&self, _context: &SessionContext, _options: &AgentOptions) -> NavigatorResult<PartialResult> {
        Ok(PartialResult {
            key_entities: vec!["mitochondrion".to_string(), "cell".to_string()],
            relationships: vec![EntityRelationship {
                source: "mitochondrion".to_string(),
                target: "cell".to_string(),
                relationship_type: "part_of".to_string(),
                label: "part of".to_string(),
                confidence: Confidence::High,
            }],
            ..Default::default()
        })
    }
}

/// Linker stub that always fails with a non-fatal `agent_fault`.
pub struct FailingLinker;

#[async_trait]
impl AgentPlugin for FailingLinker {
    fn name(&self) -> &str {
        "linker"
    }

    async fn process(&self, _context: &SessionContext, _options: &AgentOptions) -> NavigatorResult<PartialResult> {
        Err(NavigatorError::AgentFault {
            agent: "linker".to_string(),
            message: "entity extraction failed".to_string(),
        })
    }
}

/// Visualiser stub that renders whatever the linker found as a mind map.
pub struct StubVisualiser;

#[async_trait]
impl AgentPlugin for StubVisualiser {
    fn name(&self) -> &str {
        "visualiser"
    }

    async fn process(&self, context: &SessionContext, _options: &AgentOptions) -> NavigatorResult<PartialResult> {
        Ok(PartialResult {
            graph_json: Some(GraphJson {
                graph_type: "MIND_MAP".to_string(),
                nodes: context.key_entities.iter().map(|e| json!({ "id": e })).collect(),
                edges: context
                    .relationships
                    .iter()
                    .map(|r| json!({ "source": r.source, "target": r.target }))
                    .collect(),
            }),
            ..Default::default()
        })
    }
}

/// A linker that blocks until `release()` is called, used to pin the
/// workflow at a known point for cancellation tests.
pub struct GatedLinker {
    gate: Arc<tokio::sync::Notify>,
    steps_taken: Arc<AtomicUsize>,
}

impl GatedLinker {
    pub fn new() -> (Self, Arc<tokio::sync::Notify>) {
        let gate = Arc::new(tokio::sync::Notify::new());
        (
            Self {
                gate: gate.clone(),
                steps_taken: Arc::new(AtomicUsize::new(0)),
            },
            gate,
        )
    }
}

#[async_trait]
impl AgentPlugin for GatedLinker {
    fn name(&self) -> &str {
        "linker"
    }

    async fn process(&self, _context: &SessionContext, options: &AgentOptions) -> NavigatorResult<PartialResult> {
        self.steps_taken.fetch_add(1, Ordering::SeqCst);
        loop {
            if options.cancellation_token.is_cancelled() {
                return Err(NavigatorError::Cancelled);
            }
            tokio::select! {
                _ = self.gate.notified() => return Ok(PartialResult::default()),
                _ = tokio::time::sleep(std::time::Duration::from_millis(10)) => continue,
            }
        }
    }
}

/// Session store stub whose `save_context` always fails, to exercise the
/// `persisted = false` degraded-persistence path.
pub struct UnavailableStore;

#[async_trait]
impl SessionStore for UnavailableStore {
    async fn save_context(&self, _context: &SessionContext) -> NavigatorResult<()> {
        Err(NavigatorError::StoreUnavailable {
            message: "store is down".to_string(),
        })
    }

    async fn load_context(&self, _session_id: &str) -> NavigatorResult<Option<SessionContext>> {
        Ok(None)
    }

    async fn delete_context(&self, _session_id: &str) -> NavigatorResult<()> {
        Ok(())
    }

    async fn list_contexts(
        &self,
        _limit: usize,
        _after_cursor: Option<&str>,
    ) -> NavigatorResult<(Vec<String>, Option<String>)> {
        Ok((Vec::new(), None))
    }

    async fn append_history(
        &self,
        _session_id: &str,
        _message: &agentic_navigator_core::bus::A2AMessage,
    ) -> NavigatorResult<()> {
        Ok(())
    }

    async fn read_history(
        &self,
        _session_id: &str,
        _filter: &agentic_navigator_core::session::HistoryFilter,
        _limit: usize,
    ) -> NavigatorResult<Vec<agentic_navigator_core::bus::A2AMessage>> {
        Ok(Vec::new())
    }
}

/// A matching `Config` for tests: development environment, a fixed key,
/// and a trusted dev identity so agent-to-agent sends are authorised.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.signing_key = "test-signing-key".to_string();
    // Matches the synthetic development identity `EnvIdentityProvider`
    // resolves when no `service_account_email`/`project_id` env vars are set.
    config.trusted_service_accounts = vec!["dev-agent@localhost".to_string()];
    config
}

/// Build an `IdentityService`, `MessageBus`, and `StreamHub` from a test
/// config, ready to hand to `WorkflowExecutor::new`.
pub fn build_runtime(config: &Config) -> (Arc<IdentityService>, Arc<MessageBus>, Arc<StreamHub>) {
    let identity = Arc::new(IdentityService::from_config(config));
    let hub = Arc::new(StreamHub::new(config.event_buffer_capacity));
    let bus = Arc::new(MessageBus::new(
        identity.clone(),
        AGENT_SEQUENCE.iter().map(|s| s.to_string()),
        config.message_queue_capacity,
        config.history_capacity_per_session,
        config.clock_skew_tolerance_seconds,
    ));
    (identity, bus, hub)
}
