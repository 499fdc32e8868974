//! Workflow Executor component: the orchestration loop that
//! drives agent plug-ins in a fixed order over a shared `SessionContext`.

pub mod agent;
pub mod workflow;

pub use agent::{AgentOptions, AgentPlugin, CancellationToken, PartialResult};
pub use workflow::{RunOptions, WorkflowExecutor, WorkflowOutcome};
