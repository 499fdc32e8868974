//! Document walkthrough — runs the full four-agent pipeline over a short
//! piece of prose and prints the resulting summary and knowledge graph.
//!
//! Run with:
//! ```sh
//! cargo run --example document_walkthrough
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use agentic_navigator_core::prelude::*;
use async_trait::async_trait;
use serde_json::json;

/// Stands in for the orchestrator's own domain logic: here it just confirms
/// the content type it was handed.
struct OrchestratorAgent;

#[async_trait]
impl AgentPlugin for OrchestratorAgent {
    fn name(&self) -> &str {
        "orchestrator"
    }

    async fn process(
        &self,
        context: &SessionContext,
        _options: &AgentOptions,
    ) -> NavigatorResult<PartialResult> {
        let mut insights = HashMap::new();
        insights.insert(
            "orchestrator_notes".to_string(),
            json!(format!("routing {} characters as {:?}", context.raw_input.len(), context.content_type)),
        );
        Ok(PartialResult {
            summary_insights: insights,
            ..Default::default()
        })
    }
}

/// A toy summariser: takes the first sentence as the summary.
struct SummariserAgent;

#[async_trait]
impl AgentPlugin for SummariserAgent {
    fn name(&self) -> &str {
        "summariser"
    }

    async fn process(
        &self,
        context: &SessionContext,
        _options: &AgentOptions,
    ) -> NavigatorResult<PartialResult> {
        let summary = context
            .raw_input
            .split('.')
            .next()
            .unwrap_or(&context.raw_input)
            .trim()
            .to_string();
        Ok(PartialResult {
            summary_text: Some(summary),
            ..Default::default()
        })
    }
}

/// A toy linker: looks for a couple of known biology terms.
struct LinkerAgent;

#[async_trait]
impl AgentPlugin for LinkerAgent {
    fn name(&self) -> &str {
        "linker"
    }

    async fn process(
        &self,
        context: &SessionContext,
        _options: &AgentOptions,
    ) -> NavigatorResult<PartialResult> {
        let mut key_entities = Vec::new();
        let mut relationships = Vec::new();
        if context.raw_input.contains("mitochondrion") && context.raw_input.contains("cell") {
            key_entities.push("mitochondrion".to_string());
            key_entities.push("cell".to_string());
            relationships.push(agentic_navigator_core::session::context::EntityRelationship {
                source: "mitochondrion".to_string(),
                target: "cell".to_string(),
                relationship_type: "part_of".to_string(),
                label: "part of".to_string(),
                confidence: agentic_navigator_core::session::context::Confidence::High,
            });
        }
        Ok(PartialResult {
            key_entities,
            relationships,
            ..Default::default()
        })
    }
}

/// A toy visualiser: builds a two-node mind map from the linker's output.
struct VisualiserAgent;

#[async_trait]
impl AgentPlugin for VisualiserAgent {
    fn name(&self) -> &str {
        "visualiser"
    }

    async fn process(
        &self,
        context: &SessionContext,
        _options: &AgentOptions,
    ) -> NavigatorResult<PartialResult> {
        let nodes = context
            .key_entities
            .iter()
            .map(|e| json!({ "id": e, "label": e }))
            .collect();
        let edges = context
            .relationships
            .iter()
            .map(|r| json!({ "source": r.source, "target": r.target, "label": r.label }))
            .collect();
        Ok(PartialResult {
            graph_json: Some(agentic_navigator_core::session::context::GraphJson {
                graph_type: "MIND_MAP".to_string(),
                nodes,
                edges,
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
        Arc::new(LinkerAgent),
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
        .run_workflow(
            "The mitochondrion is the powerhouse of the cell. It generates most of the cell's ATP.",
            ContentType::Document,
            RunOptions::default(),
        )
        .await;

    println!("status: {:?}", outcome.context.workflow_status);
    println!("persisted: {}", outcome.persisted);
    println!("summary: {:?}", outcome.context.summary_text);
    println!("entities: {:?}", outcome.context.key_entities);
    if let Some(graph) = &outcome.context.graph_json {
        println!("graph type: {} nodes: {} edges: {}", graph.graph_type, graph.nodes.len(), graph.edges.len());
    }
}
