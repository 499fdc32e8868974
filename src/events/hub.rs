//! The event emitter / stream hub: a map of
//! per-session queues guarded by short critical sections, an `Arc<AtomicBool>`
//! closed flag, and a `Notify`-driven consumer loop, enforcing a single
//! subscriber per session.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, Notify};
use tracing::debug;

use crate::error::{NavigatorError, NavigatorResult};
use crate::events::event::ProgressEvent;

struct SessionChannel {
    buffer: Mutex<VecDeque<ProgressEvent>>,
    notify: Notify,
    capacity: usize,
    subscriber_open: AtomicBool,
    closed: AtomicBool,
    cancelled: AtomicBool,
    agent_sequence: Vec<String>,
}

/// A live handle to one session's event stream, returned by
/// [`StreamHub::open`]. Dropping it does not close the channel — call
/// [`StreamHub::close`] explicitly so the executor observes disconnect.
pub struct EventSubscription {
    channel: Arc<SessionChannel>,
}

impl EventSubscription {
    /// Await the next event, or `None` once the channel is closed and
    /// drained.
    pub async fn recv(&self) -> Option<ProgressEvent> {
        loop {
            {
                let mut buffer = self.channel.buffer.lock().await;
                if let Some(event) = buffer.pop_front() {
                    return Some(event);
                }
                if self.channel.closed.load(Ordering::SeqCst) {
                    return None;
                }
            }
            self.channel.notify.notified().await;
        }
    }
}

/// Per-session bounded FIFO event delivery to a single subscriber.
pub struct StreamHub {
    sessions: Mutex<HashMap<String, Arc<SessionChannel>>>,
    default_capacity: usize,
}

impl StreamHub {
    /// Construct a hub whose sessions default to `default_capacity` buffered
    /// events.
    pub fn new(default_capacity: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            default_capacity,
        }
    }

    /// Register a session's channel before any subscriber connects, so the
    /// executor can emit and check cancellation even in headless mode (no
    /// client ever calls `open`).
    pub async fn register(&self, session_id: &str, agent_sequence: Vec<String>) {
        let mut sessions = self.sessions.lock().await;
        sessions.entry(session_id.to_string()).or_insert_with(|| {
            Arc::new(SessionChannel {
                buffer: Mutex::new(VecDeque::new()),
                notify: Notify::new(),
                capacity: self.default_capacity,
                subscriber_open: AtomicBool::new(false),
                closed: AtomicBool::new(false),
                cancelled: AtomicBool::new(false),
                agent_sequence,
            })
        });
    }

    /// Open the single subscription for `session_id`. Fails if one is
    /// already open, or if the session was never registered.
    pub async fn open(&self, session_id: &str) -> NavigatorResult<EventSubscription> {
        let sessions = self.sessions.lock().await;
        let channel = sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| NavigatorError::NotFound {
                resource: format!("session {session_id}"),
            })?;
        if channel
            .subscriber_open
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(NavigatorError::Busy {
                resource: format!("subscription for session {session_id}"),
            });
        }
        Ok(EventSubscription { channel })
    }

    /// Non-blocking emit. Drops the event (replacing it with a
    /// `buffer_overflow` marker) if the session's buffer is full; silently
    /// no-ops if the session was never registered or was already closed.
    pub async fn emit(&self, session_id: &str, event: ProgressEvent) {
        let sessions = self.sessions.lock().await;
        let Some(channel) = sessions.get(session_id) else {
            debug!(session_id, "emit with no registered session");
            return;
        };
        if channel.closed.load(Ordering::SeqCst) {
            return;
        }
        let mut buffer = channel.buffer.lock().await;
        if buffer.len() >= channel.capacity {
            buffer.pop_front();
            buffer.push_back(ProgressEvent::buffer_overflow(&channel.agent_sequence));
        } else {
            buffer.push_back(event);
        }
        drop(buffer);
        channel.notify.notify_waiters();
    }

    /// Close `session_id`'s channel, waking any blocked subscriber with a
    /// terminal `None` from `recv`.
    pub async fn close(&self, session_id: &str) {
        let sessions = self.sessions.lock().await;
        if let Some(channel) = sessions.get(session_id) {
            channel.closed.store(true, Ordering::SeqCst);
            channel.notify.notify_waiters();
        }
    }

    /// Signal cancellation for `session_id`: a client `cancel` command or a
    /// subscription disconnect becomes a cooperative cancellation flag the
    /// executor observes between agent steps.
    pub async fn cancel(&self, session_id: &str) {
        let sessions = self.sessions.lock().await;
        if let Some(channel) = sessions.get(session_id) {
            channel.cancelled.store(true, Ordering::SeqCst);
            channel.notify.notify_waiters();
        }
    }

    /// Whether `session_id` has been cancelled. `false` for an unregistered
    /// session.
    pub async fn is_cancelled(&self, session_id: &str) -> bool {
        self.sessions
            .lock()
            .await
            .get(session_id)
            .map(|c| c.cancelled.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    /// Drop a session's channel entirely once the workflow has finished.
    pub async fn unregister(&self, session_id: &str) {
        self.sessions.lock().await.remove(session_id);
    }
}
