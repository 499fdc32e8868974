//! The A2A message bus: priority-ordered, signed, authorised,
//! TTL-enforced message exchange between the four agents of one session.
//!
//! One bus instance lives per active session, a passive data structure
//! guarded by short critical sections around per-recipient queues rather
//! than a shared global: a small map of per-agent queues behind one lock.

use std::collections::{HashMap, HashSet, VecDeque};

use tokio::sync::Mutex;
use tracing::warn;

use uuid::Uuid;

use crate::bus::message::{A2AMessage, MessageStatus, BROADCAST};
use crate::bus::queue::RecipientQueue;
use crate::error::{NavigatorError, NavigatorResult};
use crate::identity::IdentityService;
use crate::session::store::{matches_filter, HistoryFilter};

/// Terminal outcome passed to [`MessageBus::acknowledge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// The recipient processed the message successfully.
    Completed,
    /// The recipient failed to process the message.
    Failed,
}

/// Snapshot returned by [`MessageBus::stats`].
#[derive(Debug, Clone, Default)]
pub struct BusStats {
    /// Total messages ever published on this bus.
    pub total: u64,
    /// Messages currently sitting in a recipient queue.
    pub pending: u64,
    /// History entry count by `messageType` tag.
    pub by_type: HashMap<String, u64>,
    /// History entry count by `from_agent`.
    pub agent_activity: HashMap<String, u64>,
}

struct BusState {
    queues: HashMap<String, RecipientQueue>,
    in_flight: HashMap<String, A2AMessage>,
    history: VecDeque<A2AMessage>,
    total_published: u64,
    expired_drops: u64,
}

/// In-process A2A message exchange for one session.
pub struct MessageBus {
    identity: std::sync::Arc<IdentityService>,
    agents: HashSet<String>,
    history_capacity: usize,
    clock_skew_tolerance_seconds: i64,
    state: Mutex<BusState>,
}

impl MessageBus {
    /// Construct a bus with one bounded queue per entry in `agents`.
    pub fn new(
        identity: std::sync::Arc<IdentityService>,
        agents: impl IntoIterator<Item = String>,
        queue_capacity: usize,
        history_capacity: usize,
        clock_skew_tolerance_seconds: i64,
    ) -> Self {
        let agents: HashSet<String> = agents.into_iter().collect();
        let queues = agents
            .iter()
            .map(|a| (a.clone(), RecipientQueue::new(queue_capacity)))
            .collect();
        Self {
            identity,
            agents,
            history_capacity,
            clock_skew_tolerance_seconds,
            state: Mutex::new(BusState {
                queues,
                in_flight: HashMap::new(),
                history: VecDeque::new(),
                total_published: 0,
                expired_drops: 0,
            }),
        }
    }

    /// Sign, validate, and enqueue `message`. Broadcast recipients fan out
    /// to every registered agent except the sender.
    pub async fn publish(&self, mut message: A2AMessage, now: f64) -> NavigatorResult<()> {
        let identity = self.identity.current_identity().await?;
        message.security.service_account_id = identity.email.clone();
        message.security.algorithm = self.identity.signing_mode().algorithm_name().to_string();

        if !message.is_broadcast() && !self.agents.contains(&message.to_agent) {
            return Err(NavigatorError::UnknownRecipient {
                recipient: message.to_agent.clone(),
            });
        }

        let mut state = self.state.lock().await;

        if message.trace.correlation_id.is_empty() {
            let inherited = message
                .trace
                .parent_message_id
                .as_ref()
                .and_then(|parent_id| state.history.iter().find(|m| &m.message_id == parent_id))
                .map(|parent| parent.trace.correlation_id.clone());
            message.trace.correlation_id = inherited.unwrap_or_else(|| Uuid::new_v4().to_string());
        }

        message.security.signature = self.identity.sign(&message);
        self.identity.check_publish(&message)?;
        message.security.verified = true;

        state.total_published += 1;

        if message.is_broadcast() {
            let mut any_delivered = false;
            for agent in self.agents.iter().filter(|a| *a != &message.from_agent) {
                if let Some(queue) = state.queues.get_mut(agent) {
                    let mut copy = message.clone();
                    copy.to_agent = agent.clone();
                    if queue.push(copy) {
                        any_delivered = true;
                    }
                }
            }
            push_history(&mut state.history, self.history_capacity, message);
            if !any_delivered {
                return Err(NavigatorError::Busy {
                    resource: "broadcast: every recipient queue full".to_string(),
                });
            }
            Ok(())
        } else {
            let to_agent = message.to_agent.clone();
            let delivered = state
                .queues
                .get_mut(&to_agent)
                .map(|q| q.push(message.clone()))
                .unwrap_or(false);
            push_history(&mut state.history, self.history_capacity, message);
            if delivered {
                Ok(())
            } else {
                Err(NavigatorError::Busy { resource: to_agent })
            }
        }
    }

    /// Return non-expired pending messages addressed to `agent_name`,
    /// optionally filtered by message-type tag, sorted by priority then
    /// timestamp, and mark them `processing`.
    pub async fn receive(
        &self,
        agent_name: &str,
        types: Option<&[String]>,
        now: f64,
    ) -> NavigatorResult<Vec<A2AMessage>> {
        let mut state = self.state.lock().await;
        let Some(queue) = state.queues.get_mut(agent_name) else {
            return Err(NavigatorError::UnknownRecipient {
                recipient: agent_name.to_string(),
            });
        };
        let drained = queue.drain_matching(|m| {
            types
                .map(|allowed| allowed.iter().any(|t| t == m.message_type_tag()))
                .unwrap_or(true)
        });

        let mut delivered = Vec::with_capacity(drained.len());
        for mut message in drained {
            if message.is_expired(now, self.clock_skew_tolerance_seconds) {
                state.expired_drops += 1;
                warn!(
                    message_id = %message.message_id,
                    from_agent = %message.from_agent,
                    to_agent = %message.to_agent,
                    reason = "expired",
                    "a2a message dropped at receive"
                );
                continue;
            }
            message.status = MessageStatus::Processing;
            state.in_flight.insert(message.message_id.clone(), message.clone());
            delivered.push(message);
        }
        Ok(delivered)
    }

    /// Mark a previously-received message's final status and move it out of
    /// the in-flight set.
    pub async fn acknowledge(&self, message_id: &str, outcome: AckOutcome) -> NavigatorResult<()> {
        let mut state = self.state.lock().await;
        let Some(mut message) = state.in_flight.remove(message_id) else {
            return Err(NavigatorError::NotFound {
                resource: format!("in-flight message {message_id}"),
            });
        };
        message.status = match outcome {
            AckOutcome::Completed => MessageStatus::Completed,
            AckOutcome::Failed => MessageStatus::Failed,
        };
        if let Some(entry) = state
            .history
            .iter_mut()
            .find(|m| m.message_id == message_id)
        {
            entry.status = message.status;
        }
        Ok(())
    }

    /// Snapshot counters and per-type/per-agent activity from history.
    pub async fn stats(&self) -> BusStats {
        let state = self.state.lock().await;
        let mut by_type = HashMap::new();
        let mut agent_activity = HashMap::new();
        for message in &state.history {
            *by_type.entry(message.message_type_tag().to_string()).or_insert(0) += 1;
            *agent_activity.entry(message.from_agent.clone()).or_insert(0) += 1;
        }
        BusStats {
            total: state.total_published,
            pending: state.queues.values().map(|q| q.len() as u64).sum(),
            by_type,
            agent_activity,
        }
    }

    /// Total messages dropped at receive time for TTL expiry.
    pub async fn expired_drop_count(&self) -> u64 {
        self.state.lock().await.expired_drops
    }

    /// Query the in-memory history ring.
    pub async fn history(&self, filter: &HistoryFilter, limit: usize) -> Vec<A2AMessage> {
        let state = self.state.lock().await;
        let matched: Vec<A2AMessage> = state
            .history
            .iter()
            .filter(|m| matches_filter(m, filter))
            .cloned()
            .collect();
        let start = matched.len().saturating_sub(limit);
        matched[start..].to_vec()
    }
}

fn push_history(history: &mut VecDeque<A2AMessage>, capacity: usize, message: A2AMessage) {
    history.push_back(message);
    while history.len() > capacity {
        history.pop_front();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::message::{MessagePayload, Priority, TraceContext};
    use crate::config::Config;
    use std::collections::HashMap as Map;
    use std::sync::Arc;

    fn bus() -> MessageBus {
        let mut config = Config::default();
        config.signing_key = "test-key".to_string();
        config.trusted_service_accounts = vec!["dev-agent@localhost".to_string()];
        let identity = Arc::new(IdentityService::from_config(&config));
        MessageBus::new(
            identity,
            vec![
                "orchestrator".to_string(),
                "summariser".to_string(),
                "linker".to_string(),
                "visualiser".to_string(),
            ],
            4,
            100,
            5,
        )
    }

    fn delegation(from: &str, to: &str, now: f64) -> A2AMessage {
        A2AMessage::new(
            from,
            to,
            Priority::Medium,
            60,
            TraceContext::new_root(),
            MessagePayload::TaskDelegation {
                task: "summarise".into(),
                parameters: Map::new(),
            },
            now,
        )
    }

    #[tokio::test]
    async fn publish_then_receive_round_trips_and_verifies() {
        let bus = bus();
        bus.publish(delegation("orchestrator", "summariser", 1000.0), 1000.0)
            .await
            .unwrap();
        let received = bus.receive("summariser", None, 1000.0).await.unwrap();
        assert_eq!(received.len(), 1);
        assert!(received[0].security.verified);
    }

    #[tokio::test]
    async fn unauthorised_sender_is_rejected_before_enqueue() {
        let bus = bus();
        let result = bus
            .publish(delegation("summariser", "linker", 1000.0), 1000.0)
            .await;
        assert!(matches!(result, Err(NavigatorError::Unauthorised { .. })));
        let received = bus.receive("linker", None, 1000.0).await.unwrap();
        assert!(received.is_empty());
    }

    #[tokio::test]
    async fn expired_message_is_dropped_at_receive_not_publish() {
        let bus = bus();
        let mut msg = delegation("orchestrator", "summariser", 900.0);
        msg.ttl_seconds = 1;
        bus.publish(msg, 900.0).await.unwrap();
        let received = bus.receive("summariser", None, 1_000_000.0).await.unwrap();
        assert!(received.is_empty());
        assert_eq!(bus.expired_drop_count().await, 1);
    }

    #[tokio::test]
    async fn broadcast_excludes_sender() {
        let bus = bus();
        bus.publish(
            A2AMessage::new(
                "orchestrator",
                BROADCAST,
                Priority::Low,
                0,
                TraceContext::new_root(),
                MessagePayload::AgentStatus {
                    status: "working".into(),
                    detail: None,
                },
                1000.0,
            ),
            1000.0,
        )
        .await
        .unwrap();
        assert!(bus
            .receive("orchestrator", None, 1000.0)
            .await
            .unwrap()
            .is_empty());
        assert_eq!(bus.receive("summariser", None, 1000.0).await.unwrap().len(), 1);
        assert_eq!(bus.receive("linker", None, 1000.0).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn full_queue_yields_busy_without_panicking() {
        let mut config = Config::default();
        config.signing_key = "test-key".to_string();
        config.trusted_service_accounts = vec!["dev-agent@localhost".to_string()];
        let identity = Arc::new(IdentityService::from_config(&config));
        let bus = MessageBus::new(
            identity,
            vec!["orchestrator".to_string(), "summariser".to_string()],
            1,
            10,
            5,
        );
        bus.publish(delegation("orchestrator", "summariser", 1.0), 1.0)
            .await
            .unwrap();
        let result = bus.publish(delegation("orchestrator", "summariser", 2.0), 2.0).await;
        assert!(matches!(result, Err(NavigatorError::Busy { .. })));
    }

    #[tokio::test]
    async fn acknowledge_updates_history_status() {
        let bus = bus();
        bus.publish(delegation("orchestrator", "summariser", 1.0), 1.0)
            .await
            .unwrap();
        let received = bus.receive("summariser", None, 1.0).await.unwrap();
        let message_id = received[0].message_id.clone();
        bus.acknowledge(&message_id, AckOutcome::Completed).await.unwrap();
        let history = bus.history(&HistoryFilter::default(), 10).await;
        let entry = history.iter().find(|m| m.message_id == message_id).unwrap();
        assert_eq!(entry.status, MessageStatus::Completed);
    }
}
