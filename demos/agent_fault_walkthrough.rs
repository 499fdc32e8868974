//! Agent fault walkthrough — the linker raises a non-fatal error partway
//! through the pipeline; the run still finishes with the orchestrator,
//! summariser, and visualiser's work intact.
//!
//! Run with:
//! ```sh
//! cargo run --example agent_fault_walkthrough
//! ```

use std::sync::Arc;

use agentic_navigator_core::prelude::*;
use async_trait::async_trait;

struct OrchestratorAgent;

#[async_trait]
impl AgentPlugin for OrchestratorAgent {
    fn name(&self) -> &str {
        "orchestrator"
    }

    async fn process(&self, _context: &SessionContext, _options: &AgentOptions) -> NavigatorResult<PartialResult> {
        Ok(PartialResult::default())
    }
}

struct SummariserAgent;

#[async_trait]
impl AgentPlugin for SummariserAgent {
    fn name(&self) -> &str {
        "summariser"
    }

    async fn process(&self, context: &SessionContext, _options: &AgentOptions) -> NavigatorResult<PartialResult> {
        Ok(PartialResult {
            summary_text: Some(format!("{} bytes of input", context.raw_input.len())),
            ..Default::default()
        })
    }
}

/// Always fails, as if an upstream model call errored out.
struct FlakyLinkerAgent;

#[async_trait]
impl AgentPlugin for FlakyLinkerAgent {
    fn name(&self) -> &str {
        "linker"
    }

    async fn process(&self, _context: &SessionContext, _options: &AgentOptions) -> NavigatorResult<PartialResult> {
        Err(NavigatorError::AgentFault {
            agent: "linker".to_string(),
            message: "entity extraction model timed out".to_string(),
        })
    }
}

struct VisualiserAgent;

#[async_trait]
impl AgentPlugin for VisualiserAgent {
    fn name(&self) -> &str {
        "visualiser"
    }

    async fn process(&self, context: &SessionContext, _options: &AgentOptions) -> NavigatorResult<PartialResult> {
        Ok(PartialResult {
            graph_json: Some(agentic_navigator_core::session::context::GraphJson {
                graph_type: "MIND_MAP".to_string(),
                nodes: context
                    .key_entities
                    .iter()
                    .map(|e| serde_json::json!({ "id": e }))
                    .collect(),
                edges: Vec::new(),
            }),
            ..Default::default()
        })
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let mut config = Config::default();
    config.signing_key = "demo-signing-key".to_string();
    // Matches the synthetic development identity `EnvIdentityProvider`
    // resolves when no service account env vars are set.
    config.trusted_service_accounts = vec!["dev-agent@localhost".to_string()];

    let identity = Arc::new(IdentityService::from_config(&config));
    let store: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new(config.history_capacity_per_session));
    let hub = Arc::new(StreamHub::new(config.event_buffer_capacity));
    let bus = Arc::new(MessageBus::new(
        identity,
        AGENT_SEQUENCE.iter().map(|s| s.to_string()),
        config.message_queue_capacity,
        config.history_capacity_per_session,
        config.clock_skew_tolerance_seconds,
    ));

    let agents: Vec<Arc<dyn AgentPlugin>> = vec![
        Arc::new(OrchestratorAgent),
        Arc::new(SummariserAgent),
        Arc::new(FlakyLinkerAgent),
        Arc::new(VisualiserAgent),
    ];

    let executor = WorkflowExecutor::new(
        agents,
        bus,
        store,
        hub,
        config.model_type,
        config.max_workflow_duration_seconds,
    );

    let outcome = executor
        .run_workflow("a short note with no linkable entities", ContentType::Document, RunOptions::default())
        .await;

    println!("status: {:?}", outcome.context.workflow_status);
    println!("completed agents: {:?}", outcome.context.completed_agents);
    println!("errors: {:?}", outcome.context.errors);
}
