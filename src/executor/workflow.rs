//! The workflow executor: drives the four agents in strict
//! sequential order over one `SessionContext`, persisting, publishing, and
//! emitting at every step, following an event-merge-then-persist sequencing
//! with terminal-state guards, generalised from a single task's lifecycle
//! to a four-step
//! pipeline.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use tracing::{info, warn};
use uuid::Uuid;

use crate::bus::message::{MessagePayload, Priority, TraceContext};
use crate::bus::MessageBus;
use crate::config::ModelType;
use crate::error::NavigatorError;
use crate::events::event::{EventMetadata, EventPayload, EventStatus, ProgressEvent};
use crate::events::StreamHub;
use crate::executor::agent::{AgentOptions, AgentPlugin, CancellationToken, PartialResult};
use crate::session::context::{ContentType, SessionContext, WorkflowStatus, AGENT_SEQUENCE};
use crate::session::store::SessionStore;

fn now_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// Per-run overrides for [`WorkflowExecutor::run_workflow`].
#[derive(Clone, Default)]
pub struct RunOptions {
    /// Overrides the process-level default model tier for this run, read
    /// once at workflow start and propagated to every agent invocation.
    pub model_type: Option<ModelType>,
    /// Caller-supplied session id, useful for tests that must know the id
    /// before the run starts (e.g. to drive cancellation concurrently).
    /// Generated fresh if absent.
    pub session_id: Option<String>,
    /// Overrides the process-level default workflow duration budget.
    pub max_workflow_duration_seconds: Option<u64>,
}

/// The terminal context plus response metadata — records
/// `persisted = false` on a degraded store — that does
/// not belong on `SessionContext` itself.
#[derive(Debug, Clone)]
pub struct WorkflowOutcome {
    /// The terminal session state.
    pub context: SessionContext,
    /// Whether the final `save_context` call succeeded.
    pub persisted: bool,
}

/// Drives the canonical `orchestrator -> summariser -> linker -> visualiser`
/// sequence.
pub struct WorkflowExecutor {
    agents: HashMap<String, Arc<dyn AgentPlugin>>,
    bus: Arc<MessageBus>,
    store: Arc<dyn SessionStore>,
    hub: Arc<StreamHub>,
    default_model_type: ModelType,
    default_max_duration_seconds: u64,
}

impl WorkflowExecutor {
    /// Construct an executor from its four plug-ins (keyed by
    /// [`AgentPlugin::name`]) and the three runtime components it drives.
    pub fn new(
        agents: Vec<Arc<dyn AgentPlugin>>,
        bus: Arc<MessageBus>,
        store: Arc<dyn SessionStore>,
        hub: Arc<StreamHub>,
        default_model_type: ModelType,
        default_max_duration_seconds: u64,
    ) -> Self {
        let agents = agents
            .into_iter()
            .map(|agent| (agent.name().to_string(), agent))
            .collect();
        Self {
            agents,
            bus,
            store,
            hub,
            default_model_type,
            default_max_duration_seconds,
        }
    }

    /// Run the full four-agent pipeline over a freshly created session,
    /// returning the terminal context and whether it was durably persisted.
    pub async fn run_workflow(
        &self,
        raw_input: impl Into<String>,
        content_type: ContentType,
        options: RunOptions,
    ) -> WorkflowOutcome {
        let mut context = SessionContext::new(raw_input, content_type);
        if let Some(session_id) = options.session_id {
            context.session_id = session_id;
        }
        let session_id = context.session_id.clone();
        let agent_sequence: Vec<String> = AGENT_SEQUENCE.iter().map(|s| s.to_string()).collect();
        self.hub.register(&session_id, agent_sequence.clone()).await;

        let agent_options = AgentOptions {
            model_type: options.model_type.unwrap_or(self.default_model_type),
            correlation_id: session_id.clone(),
            cancellation_token: CancellationToken::new(),
        };

        let start = Instant::now();
        let max_duration = options
            .max_workflow_duration_seconds
            .unwrap_or(self.default_max_duration_seconds);

        let mut persisted = true;
        let mut terminated_early = false;

        for (index, agent_name) in AGENT_SEQUENCE.iter().enumerate() {
            if self.hub.is_cancelled(&session_id).await {
                context.record_error(*agent_name, "cancelled", "cancellation observed before step start");
                context.workflow_status = WorkflowStatus::Failed;
                self.emit_terminal_error(&session_id, &agent_sequence, start, "cancelled", "workflow was cancelled")
                    .await;
                terminated_early = true;
                break;
            }
            if start.elapsed().as_secs() > max_duration {
                context.record_error(
                    *agent_name,
                    "resource_exhausted",
                    "workflow exceeded its configured duration budget",
                );
                context.workflow_status = WorkflowStatus::Failed;
                self.emit_terminal_error(
                    &session_id,
                    &agent_sequence,
                    start,
                    "resource_exhausted",
                    "workflow exceeded max_workflow_duration_seconds",
                )
                .await;
                terminated_early = true;
                break;
            }

            if context.workflow_status == WorkflowStatus::Pending {
                context.workflow_status = WorkflowStatus::Running;
            }
            context.current_agent = Some(agent_name.to_string());

            self.emit(
                &session_id,
                agent_name,
                EventStatus::Queued,
                index,
                &agent_sequence,
                start,
                EventPayload::default(),
            )
            .await;

            if let Err(e) = self.delegate(agent_name, &session_id).await {
                warn!(session_id = %session_id, agent = %agent_name, error = %e, "task delegation not enqueued");
            }

            self.emit(
                &session_id,
                agent_name,
                EventStatus::Processing,
                index,
                &agent_sequence,
                start,
                EventPayload::default(),
            )
            .await;

            let Some(plugin) = self.agents.get(*agent_name) else {
                context.record_error(*agent_name, "config_invalid", "no plug-in registered for this agent");
                self.emit(
                    &session_id,
                    agent_name,
                    EventStatus::Error,
                    index,
                    &agent_sequence,
                    start,
                    EventPayload {
                        error: Some("config_invalid".to_string()),
                        error_details: Some("no plug-in registered for this agent".to_string()),
                        ..Default::default()
                    },
                )
                .await;
                continue;
            };

            let watcher_token = agent_options.cancellation_token.clone();
            let watcher_hub = self.hub.clone();
            let watcher_session_id = session_id.clone();
            let watcher = tokio::spawn(async move {
                loop {
                    if watcher_hub.is_cancelled(&watcher_session_id).await {
                        watcher_token.cancel();
                        return;
                    }
                    if start.elapsed().as_secs() > max_duration {
                        watcher_token.cancel();
                        return;
                    }
                    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                }
            });

            let process_result = plugin.process(&context, &agent_options).await;
            watcher.abort();

            match process_result {
                Ok(partial) => {
                    merge_partial(&mut context, agent_name, partial);
                    context.completed_agents.push(agent_name.to_string());
                    context.touch();

                    if let Err(e) = self.store.save_context(&context).await {
                        persisted = false;
                        warn!(session_id = %session_id, error = %e, "session persistence failed");
                    }

                    if let Err(e) = self.publish_completion(agent_name, &session_id, &context).await {
                        warn!(session_id = %session_id, agent = %agent_name, error = %e, "completion message not enqueued");
                    }

                    self.emit(
                        &session_id,
                        agent_name,
                        EventStatus::Complete,
                        index,
                        &agent_sequence,
                        start,
                        completion_payload(agent_name, &context),
                    )
                    .await;
                }
                Err(e) => {
                    context.record_error(*agent_name, e.kind(), e.to_string());

                    if let Err(store_err) = self.store.save_context(&context).await {
                        persisted = false;
                        warn!(session_id = %session_id, error = %store_err, "session persistence failed");
                    }

                    self.emit(
                        &session_id,
                        agent_name,
                        EventStatus::Error,
                        index,
                        &agent_sequence,
                        start,
                        EventPayload {
                            error: Some(e.kind().to_string()),
                            error_details: Some(e.to_string()),
                            ..Default::default()
                        },
                    )
                    .await;

                    if e.is_fatal() {
                        context.workflow_status = WorkflowStatus::Failed;
                        terminated_early = true;
                        break;
                    }
                }
            }
        }

        if !terminated_early {
            context.workflow_status = if context.all_agents_completed() {
                WorkflowStatus::Completed
            } else {
                WorkflowStatus::Failed
            };
        }
        context.current_agent = None;
        context.touch();

        if let Err(e) = self.store.save_context(&context).await {
            persisted = false;
            warn!(session_id = %session_id, error = %e, "final session persistence failed");
        }

        self.hub.close(&session_id).await;
        self.hub.unregister(&session_id).await;
        info!(session_id = %session_id, status = ?context.workflow_status, persisted, "workflow finished");

        WorkflowOutcome { context, persisted }
    }

    async fn delegate(
        &self,
        agent_name: &str,
        session_id: &str,
    ) -> Result<(), NavigatorError> {
        let trace = TraceContext {
            correlation_id: session_id.to_string(),
            parent_message_id: None,
            span_id: Uuid::new_v4().to_string(),
            metadata: HashMap::new(),
        };
        let message = crate::bus::message::A2AMessage::new(
            "orchestrator",
            agent_name,
            Priority::Medium,
            60,
            trace,
            MessagePayload::TaskDelegation {
                task: agent_name.to_string(),
                parameters: HashMap::new(),
            },
            now_seconds(),
        );
        self.bus.publish(message, now_seconds()).await
    }

    async fn publish_completion(
        &self,
        agent_name: &str,
        session_id: &str,
        context: &SessionContext,
    ) -> Result<(), NavigatorError> {
        let (to_agent, payload) = match agent_name {
            "orchestrator" => (
                crate::bus::message::BROADCAST.to_string(),
                MessagePayload::AgentStatus {
                    status: "completed".to_string(),
                    detail: None,
                },
            ),
            "summariser" => (
                "orchestrator".to_string(),
                MessagePayload::SummarizationCompleted {
                    summary_text: context.summary_text.clone().unwrap_or_default(),
                    insights: context.summary_insights.clone(),
                },
            ),
            "linker" => (
                "orchestrator".to_string(),
                MessagePayload::RelationshipMapped {
                    key_entities: context.key_entities.clone(),
                    relationships: context.relationships.clone(),
                    entity_metadata: context.entity_metadata.clone(),
                },
            ),
            "visualiser" => (
                "orchestrator".to_string(),
                MessagePayload::VisualizationReady {
                    graph: context.graph_json.clone().unwrap_or_default(),
                },
            ),
            _ => return Ok(()),
        };
        let trace = TraceContext {
            correlation_id: session_id.to_string(),
            parent_message_id: None,
            span_id: Uuid::new_v4().to_string(),
            metadata: HashMap::new(),
        };
        let message = crate::bus::message::A2AMessage::new(
            agent_name,
            to_agent,
            Priority::Medium,
            60,
            trace,
            payload,
            now_seconds(),
        );
        self.bus.publish(message, now_seconds()).await
    }

    #[allow(clippy::too_many_arguments)]
    async fn emit(
        &self,
        session_id: &str,
        agent_name: &str,
        status: EventStatus,
        step_index: usize,
        agent_sequence: &[String],
        start: Instant,
        payload: EventPayload,
    ) {
        let event = ProgressEvent::new(
            agent_name,
            status,
            EventMetadata {
                elapsed_ms: start.elapsed().as_millis() as u64,
                step: step_index + 1,
                total_steps: agent_sequence.len(),
                agent_sequence: agent_sequence.to_vec(),
            },
            payload,
        );
        self.hub.emit(session_id, event).await;
    }

    async fn emit_terminal_error(
        &self,
        session_id: &str,
        agent_sequence: &[String],
        start: Instant,
        kind: &str,
        detail: &str,
    ) {
        let event = ProgressEvent::new(
            "executor",
            EventStatus::Error,
            EventMetadata {
                elapsed_ms: start.elapsed().as_millis() as u64,
                step: 0,
                total_steps: agent_sequence.len(),
                agent_sequence: agent_sequence.to_vec(),
            },
            EventPayload {
                error: Some(kind.to_string()),
                error_details: Some(detail.to_string()),
                ..Default::default()
            },
        );
        self.hub.emit(session_id, event).await;
    }
}

/// Apply `partial` to `context`, enforcing that each field is written only
/// by its owning agent.
fn merge_partial(context: &mut SessionContext, agent_name: &str, partial: PartialResult) {
    match agent_name {
        "orchestrator" => {
            if let Some(content_type) = partial.content_type {
                context.content_type = content_type;
            }
            if let Some(notes) = partial.summary_insights.get("orchestrator_notes") {
                context
                    .summary_insights
                    .insert("orchestrator_notes".to_string(), notes.clone());
            }
        }
        "summariser" => {
            if context.summary_text.is_none() {
                context.summary_text = partial.summary_text;
            }
            for (key, value) in partial.summary_insights {
                if key != "orchestrator_notes" {
                    context.summary_insights.insert(key, value);
                }
            }
        }
        "linker" => {
            context.key_entities = partial.key_entities;
            context.relationships = partial.relationships;
            context.entity_metadata = partial.entity_metadata;
        }
        "visualiser" => {
            context.graph_json = partial.graph_json;
        }
        _ => {}
    }
}

fn completion_payload(agent_name: &str, context: &SessionContext) -> EventPayload {
    match agent_name {
        "summariser" => EventPayload {
            summary: context.summary_text.clone(),
            ..Default::default()
        },
        "linker" => EventPayload {
            entities: Some(context.key_entities.clone()),
            relationships: Some(context.relationships.clone()),
            ..Default::default()
        },
        "visualiser" => EventPayload {
            visualization: context.graph_json.clone(),
            ..Default::default()
        },
        _ => EventPayload::default(),
    }
}
