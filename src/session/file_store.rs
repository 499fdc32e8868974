//! Local-file [`SessionStore`]: one JSON file per record
//! under a base directory, with an in-memory cache and insertion-order
//! index so reads never touch disk on the hot path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::bus::message::A2AMessage;
use crate::error::{NavigatorError, NavigatorResult};
use crate::session::context::SessionContext;
use crate::session::store::{matches_filter, Cursor, HistoryFilter, SessionStore};

struct State {
    contexts: HashMap<String, SessionContext>,
    insertion_order: Vec<String>,
    history: HashMap<String, Vec<A2AMessage>>,
}

/// A `SessionStore` that persists each `SessionContext` and its history ring
/// as JSON files under `base_dir`, mirroring reads through an in-memory
/// cache populated at construction time.
pub struct FileSessionStore {
    base_dir: PathBuf,
    state: Mutex<State>,
    history_capacity_per_session: usize,
}

fn context_path(base_dir: &Path, session_id: &str) -> PathBuf {
    base_dir.join(format!("context_{session_id}.json"))
}

fn history_path(base_dir: &Path, session_id: &str) -> PathBuf {
    base_dir.join(format!("history_{session_id}.json"))
}

impl FileSessionStore {
    /// Load every `context_*.json` file already under `base_dir` into the
    /// in-memory cache, creating the directory if absent.
    pub async fn new(
        base_dir: impl Into<PathBuf>,
        history_capacity_per_session: usize,
    ) -> NavigatorResult<Self> {
        let base_dir = base_dir.into();
        tokio::fs::create_dir_all(&base_dir)
            .await
            .map_err(|e| NavigatorError::StoreUnavailable {
                message: format!("cannot create session store directory: {e}"),
            })?;

        let mut contexts = HashMap::new();
        let mut insertion_order = Vec::new();
        let mut history = HashMap::new();

        let mut entries = tokio::fs::read_dir(&base_dir).await.map_err(|e| {
            NavigatorError::StoreUnavailable {
                message: format!("cannot read session store directory: {e}"),
            }
        })?;
        while let Some(entry) = entries.next_entry().await.ok().flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(session_id) = name
                .strip_prefix("context_")
                .and_then(|n| n.strip_suffix(".json"))
            {
                if let Ok(bytes) = tokio::fs::read(entry.path()).await {
                    if let Ok(ctx) = serde_json::from_slice::<SessionContext>(&bytes) {
                        insertion_order.push(session_id.to_string());
                        contexts.insert(session_id.to_string(), ctx);
                    }
                }
                if let Ok(bytes) =
                    tokio::fs::read(history_path(&base_dir, session_id)).await
                {
                    if let Ok(ring) = serde_json::from_slice::<Vec<A2AMessage>>(&bytes) {
                        history.insert(session_id.to_string(), ring);
                    }
                }
            }
        }
        insertion_order.sort_by_key(|id| {
            contexts
                .get(id)
                .map(|c| c.started_at)
                .unwrap_or_default()
        });

        Ok(Self {
            base_dir,
            state: Mutex::new(State {
                contexts,
                insertion_order,
                history,
            }),
            history_capacity_per_session,
        })
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn save_context(&self, context: &SessionContext) -> NavigatorResult<()> {
        let bytes =
            serde_json::to_vec_pretty(context).map_err(|e| NavigatorError::Malformed {
                message: format!("cannot serialise session context: {e}"),
            })?;
        tokio::fs::write(context_path(&self.base_dir, &context.session_id), bytes)
            .await
            .map_err(|e| NavigatorError::StoreUnavailable {
                message: format!("cannot write session context: {e}"),
            })?;

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
        let _ = tokio::fs::remove_file(context_path(&self.base_dir, session_id)).await;
        let _ = tokio::fs::remove_file(history_path(&self.base_dir, session_id)).await;
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
        let bytes = serde_json::to_vec(ring).map_err(|e| NavigatorError::Malformed {
            message: format!("cannot serialise history ring: {e}"),
        })?;
        drop(state);
        tokio::fs::write(history_path(&self.base_dir, session_id), bytes)
            .await
            .map_err(|e| NavigatorError::StoreUnavailable {
                message: format!("cannot write history ring: {e}"),
            })
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::context::ContentType;

    #[tokio::test]
    async fn save_then_reload_from_disk_round_trips() {
        let dir = std::env::temp_dir().join(format!("navigator-test-{}", uuid::Uuid::new_v4()));
        let store = FileSessionStore::new(&dir, 1000).await.unwrap();
        let ctx = SessionContext::new("hello", ContentType::Document);
        store.save_context(&ctx).await.unwrap();

        let reopened = FileSessionStore::new(&dir, 1000).await.unwrap();
        let loaded = reopened.load_context(&ctx.session_id).await.unwrap().unwrap();
        assert_eq!(loaded.session_id, ctx.session_id);

        tokio::fs::remove_dir_all(&dir).await.ok();
    }

    #[tokio::test]
    async fn delete_removes_files_and_cache() {
        let dir = std::env::temp_dir().join(format!("navigator-test-{}", uuid::Uuid::new_v4()));
        let store = FileSessionStore::new(&dir, 1000).await.unwrap();
        let ctx = SessionContext::new("hello", ContentType::Document);
        store.save_context(&ctx).await.unwrap();
        store.delete_context(&ctx.session_id).await.unwrap();
        assert!(store.load_context(&ctx.session_id).await.unwrap().is_none());
        tokio::fs::remove_dir_all(&dir).await.ok();
    }
}
