//! Error taxonomy for the orchestration runtime.
//!
//! One variant per failure kind recognised by the bus, the store, the
//! identity service, and the workflow executor. No exceptions propagate out
//! of a component's public API; every fallible operation returns
//! `NavigatorResult<T>` and callers match on the variant to decide whether a
//! failure is recoverable.

use serde::{Deserialize, Serialize};

/// Unified error type for the orchestration core.
///
/// Every variant corresponds to exactly one taxonomy entry. Two variants —
/// `Cancelled` and `ResourceExhausted` — are fatal to a running workflow;
/// the rest are recoverable by the caller (bus, store, or executor).
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NavigatorError {
    /// Identity not trusted, or authorisation policy denies the route.
    #[error("unauthorised: {message}")]
    Unauthorised {
        /// Human-readable reason.
        message: String,
    },

    /// Message or input failed schema validation or signature verification.
    #[error("malformed: {message}")]
    Malformed {
        /// Human-readable reason.
        message: String,
    },

    /// TTL exceeded at receive time.
    #[error("expired: message {message_id} expired at {expired_at}")]
    Expired {
        /// The expired message's id.
        message_id: String,
        /// The wall-clock time the message was judged expired, seconds.
        expired_at: f64,
    },

    /// Queue or buffer at capacity.
    #[error("busy: {resource}")]
    Busy {
        /// Name of the saturated resource (e.g. a recipient queue).
        resource: String,
    },

    /// Routing target is not registered.
    #[error("unknown recipient: {recipient}")]
    UnknownRecipient {
        /// The unresolved recipient name.
        recipient: String,
    },

    /// Session or record absent in the store.
    #[error("not found: {resource}")]
    NotFound {
        /// What was being looked up.
        resource: String,
    },

    /// Transient persistence failure.
    #[error("store unavailable: {message}")]
    StoreUnavailable {
        /// Human-readable reason.
        message: String,
    },

    /// An agent plug-in raised an unexpected fault.
    #[error("agent fault in {agent}: {message}")]
    AgentFault {
        /// The agent that faulted.
        agent: String,
        /// Human-readable reason.
        message: String,
    },

    /// Cooperative cancellation was observed. Fatal.
    #[error("cancelled")]
    Cancelled,

    /// The workflow exceeded its configured duration budget. Fatal.
    #[error("resource exhausted: {message}")]
    ResourceExhausted {
        /// Human-readable reason.
        message: String,
    },

    /// A startup-time configuration check failed. Fatal at startup only.
    #[error("config invalid: {message}")]
    ConfigInvalid {
        /// Human-readable reason.
        message: String,
    },
}

impl NavigatorError {
    /// Fatal error kinds force the workflow into `failed` without running
    /// subsequent steps.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            NavigatorError::Cancelled | NavigatorError::ResourceExhausted { .. }
        )
    }

    /// The taxonomy kind name, stable across variant field changes — used
    /// in `SessionContext.errors` entries and audit records.
    pub fn kind(&self) -> &'static str {
        match self {
            NavigatorError::Unauthorised { .. } => "unauthorised",
            NavigatorError::Malformed { .. } => "malformed",
            NavigatorError::Expired { .. } => "expired",
            NavigatorError::Busy { .. } => "busy",
            NavigatorError::UnknownRecipient { .. } => "unknown_recipient",
            NavigatorError::NotFound { .. } => "not_found",
            NavigatorError::StoreUnavailable { .. } => "store_unavailable",
            NavigatorError::AgentFault { .. } => "agent_fault",
            NavigatorError::Cancelled => "cancelled",
            NavigatorError::ResourceExhausted { .. } => "resource_exhausted",
            NavigatorError::ConfigInvalid { .. } => "config_invalid",
        }
    }
}

/// Convenience result type for orchestration-core operations.
pub type NavigatorResult<T> = Result<T, NavigatorError>;
