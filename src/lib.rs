//! # agentic-navigator-core — multi-agent orchestration runtime
//!
//! The core of Agentic Navigator, a multi-agent knowledge-exploration
//! service: a document or codebase goes in, a pipeline of four agents
//! (orchestrator, summariser, linker, visualiser) runs over it in strict
//! sequence, and a textual summary plus a JSON knowledge graph come out,
//! with progress streamed to a client in real time.
//!
//! This crate covers the hard engineering problems underneath that
//! pipeline: ordered cross-agent state transfer, signed and authorised
//! inter-agent messaging, typed structured outputs, and live progress
//! fan-out. The four agents' own domain logic (summarisation, entity
//! linking, graph layout) is supplied by the embedder as
//! [`executor::AgentPlugin`] implementations — this crate only drives them.
//!
//! ## Components
//!
//! - [`identity`] — process identity resolution, HMAC/PBKDF2 message
//!   signing and verification, static authorisation policy, bearer
//!   ID-token checks.
//! - [`session`] — the shared [`session::SessionContext`] data model and its
//!   durable persistence ([`session::SessionStore`]: in-memory or
//!   local-file backed).
//! - [`bus`] — the in-process, priority-ordered, signed A2A message bus
//!   agents use to talk to each other.
//! - [`events`] — the per-session bounded progress-event stream hub.
//! - [`executor`] — [`executor::WorkflowExecutor`], the orchestration loop
//!   tying the above together.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use agentic_navigator_core::prelude::*;
//!
//! # async fn run(agents: Vec<Arc<dyn AgentPlugin>>) {
//! let config = Config::from_env().expect("valid configuration");
//! let identity = Arc::new(IdentityService::from_config(&config));
//! let store: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new(
//!     config.history_capacity_per_session,
//! ));
//! let hub = Arc::new(StreamHub::new(config.event_buffer_capacity));
//! let bus = Arc::new(MessageBus::new(
//!     identity.clone(),
//!     AGENT_SEQUENCE.iter().map(|s| s.to_string()),
//!     config.message_queue_capacity,
//!     config.history_capacity_per_session,
//!     config.clock_skew_tolerance_seconds,
//! ));
//!
//! let executor = WorkflowExecutor::new(
//!     agents,
//!     bus,
//!     store,
//!     hub,
//!     config.model_type,
//!     config.max_workflow_duration_seconds,
//! );
//!
//! let outcome = executor
//!     .run_workflow("some input", ContentType::Document, RunOptions::default())
//!     .await;
//! println!("{:?}", outcome.context.workflow_status);
//! # }
//! ```

pub mod bus;
pub mod config;
pub mod error;
pub mod events;
pub mod executor;
pub mod identity;
pub mod session;

/// Commonly used types and traits, re-exported for `use
/// agentic_navigator_core::prelude::*;`.
pub mod prelude {
    pub use crate::bus::{AckOutcome, BusStats, MessageBus, MessagePayload, Priority, BROADCAST};
    pub use crate::config::{Config, Environment, ModelType, StoreBackend};
    pub use crate::error::{NavigatorError, NavigatorResult};
    pub use crate::events::{EventStatus, ProgressEvent, StreamHub};
    pub use crate::executor::{AgentOptions, AgentPlugin, PartialResult, RunOptions, WorkflowExecutor};
    pub use crate::identity::{IdentityService, SigningMode};
    pub use crate::session::{
        ContentType, FileSessionStore, InMemorySessionStore, SessionContext, SessionStore,
        WorkflowStatus,
    };
    pub use crate::session::context::AGENT_SEQUENCE;
}

pub use error::{NavigatorError, NavigatorResult};
