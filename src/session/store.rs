//! Session Store — durable persistence for `SessionContext` snapshots and
//! A2A message history.
//!
//! `save`/`get`/`delete`/`list` generalise directly onto
//! `save_context`/`load_context`/`delete_context`/`list_contexts`, with an
//! added bounded history ring via `append_history`/`read_history`.

use async_trait::async_trait;

use crate::bus::message::A2AMessage;
use crate::error::NavigatorResult;
use crate::session::context::SessionContext;

/// Parameters for [`SessionStore::read_history`].
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    /// Restrict to messages sent to or from this agent.
    pub agent: Option<String>,
    /// Restrict to this message type tag (e.g. `"TaskDelegation"`).
    pub message_type: Option<String>,
    /// Restrict to messages at or after this many seconds since the epoch.
    pub since: Option<f64>,
}

/// Opaque pagination cursor for [`SessionStore::list_contexts`] — the
/// session id to resume after, newest-first.
pub type Cursor = String;

/// Durable key-value persistence for `SessionContext` snapshots and bounded
/// A2A message history, keyed by `session_id`.
///
/// All store failures are non-fatal to the workflow: the
/// executor logs them and records `persisted = false` in response metadata
/// rather than aborting. Implementations must never block longer than a
/// configured per-call timeout — enforced by callers via
/// `tokio::time::timeout`, not by this trait.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Overwrite the snapshot for `session_id`. Atomic at the record level.
    async fn save_context(&self, context: &SessionContext) -> NavigatorResult<()>;

    /// Load the latest snapshot for `session_id`, or `Ok(None)` if absent.
    async fn load_context(&self, session_id: &str) -> NavigatorResult<Option<SessionContext>>;

    /// Delete the snapshot for `session_id`. Succeeds (no error) if absent.
    async fn delete_context(&self, session_id: &str) -> NavigatorResult<()>;

    /// List session ids newest-first, paginated by an opaque cursor.
    async fn list_contexts(
        &self,
        limit: usize,
        after_cursor: Option<&str>,
    ) -> NavigatorResult<(Vec<String>, Option<Cursor>)>;

    /// Append a message to `session_id`'s bounded history ring (oldest
    /// evicted once the configured capacity is exceeded).
    async fn append_history(&self, session_id: &str, message: &A2AMessage) -> NavigatorResult<()>;

    /// Read history for `session_id` matching `filter`, newest-last,
    /// capped at `limit` entries.
    async fn read_history(
        &self,
        session_id: &str,
        filter: &HistoryFilter,
        limit: usize,
    ) -> NavigatorResult<Vec<A2AMessage>>;
}

/// Apply a [`HistoryFilter`] to a message; shared by every `SessionStore`
/// implementation so filtering semantics stay identical across backends.
pub fn matches_filter(message: &A2AMessage, filter: &HistoryFilter) -> bool {
    if let Some(ref agent) = filter.agent {
        if &message.from_agent != agent && &message.to_agent != agent {
            return false;
        }
    }
    if let Some(ref ty) = filter.message_type {
        if message.message_type_tag() != ty.as_str() {
            return false;
        }
    }
    if let Some(since) = filter.since {
        if message.timestamp < since {
            return false;
        }
    }
    true
}
