//! In-memory [`SessionStore`] — no durability across restarts: a `Mutex`-
//! guarded map plus an insertion-order `Vec` for stable pagination.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::bus::message::A2AMessage;
use crate::error::NavigatorResult;
use crate::session::context::SessionContext;
use crate::session::store::{matches_filter, Cursor, HistoryFilter, SessionStore};

struct State {
    contexts: HashMap<String, SessionContext>,
    insertion_order: Vec<String>,
    history: HashMap<String, Vec<A2AMessage>>,
}

/// A `SessionStore` backed entirely by process memory.
pub struct InMemorySessionStore {
    state: Mutex<State>,
    history_capacity_per_session: usize,
}

impl InMemorySessionStore {
    /// Construct an empty store, evicting the oldest history entry once a
    /// session's ring exceeds `history_capacity_per_session`.
    pub fn new(history_capacity_per_session: usize) -> Self {
        Self {
            state: Mutex::new(State {
                contexts: HashMap::new(),
                insertion_order: Vec::new(),
                history: HashMap::new(),
            }),
            history_capacity_per_session,
        }
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn save_context(&self, context: &SessionContext) -> NavigatorResult<()> {
        let mut state = self.state.lock().await;
        if !state.contexts.contains_key(&context.session_id) {
            state.insertion_order.push(context.session_id.clone());
        }
        state
            .contexts
            .insert(context.session_id.clone(), context.clone());
        Ok(())
    }

    async fn load_context(&self, session_id: &str) -> NavigatorResult<Option<SessionContext>> {
        let state = self.state.lock().await;
        Ok(state.contexts.get(session_id).cloned())
    }

    async fn delete_context(&self, session_id: &str) -> NavigatorResult<()> {
        let mut state = self.state.lock().await;
        state.contexts.remove(session_id);
        state.insertion_order.retain(|id| id != session_id);
        state.history.remove(session_id);
        Ok(())
    }

    async fn list_contexts(
        &self,
        limit: usize,
        after_cursor: Option<&str>,
    ) -> NavigatorResult<(Vec<String>, Option<Cursor>)> {
        let state = self.state.lock().await;
        let newest_first: Vec<&String> = state.insertion_order.iter().rev().collect();
        let start = match after_cursor {
            Some(cursor) => newest_first
                .iter()
                .position(|id| id.as_str() == cursor)
                .map(|idx| idx + 1)
                .unwrap_or(newest_first.len()),
            None => 0,
        };
        let page: Vec<String> = newest_first
            .iter()
            .skip(start)
            .take(limit)
            .map(|id| (*id).clone())
            .collect();
        let next_cursor = if start + page.len() < newest_first.len() {
            page.last().cloned()
        } else {
            None
        };
        Ok((page, next_cursor))
    }

    async fn append_history(&self, session_id: &str, message: &A2AMessage) -> NavigatorResult<()> {
        let mut state = self.state.lock().await;
        let ring = state.history.entry(session_id.to_string()).or_default();
        ring.push(message.clone());
        if ring.len() > self.history_capacity_per_session {
            let overflow = ring.len() - self.history_capacity_per_session;
            ring.drain(0..overflow);
        }
        Ok(())
    }

    async fn read_history(
        &self,
        session_id: &str,
        filter: &HistoryFilter,
        limit: usize,
    ) -> NavigatorResult<Vec<A2AMessage>> {
        let state = self.state.lock().await;
        let matched: Vec<A2AMessage> = state
            .history
            .get(session_id)
            .map(|ring| {
                ring.iter()
                    .filter(|m| matches_filter(m, filter))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        let start = matched.len().saturating_sub(limit);
        Ok(matched[start..].to_vec())
    }
}
