//! Per-recipient bounded priority queue: FIFO within a
//! priority level, higher priorities drained first, bounded capacity with a
//! `busy` result on overflow rather than blocking.

use std::collections::VecDeque;

use crate::bus::message::{delivery_order, A2AMessage};

/// A single recipient's pending-message queue.
pub struct RecipientQueue {
    capacity: usize,
    messages: VecDeque<A2AMessage>,
    dropped_count: u64,
}

impl RecipientQueue {
    /// Construct an empty queue bounded at `capacity`.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            messages: VecDeque::new(),
            dropped_count: 0,
        }
    }

    /// Enqueue `message`, inserted in priority-then-timestamp order.
    /// Returns `false` (and bumps `dropped_count`) if the queue is full.
    pub fn push(&mut self, message: A2AMessage) -> bool {
        if self.messages.len() >= self.capacity {
            self.dropped_count += 1;
            return false;
        }
        let pos = self
            .messages
            .iter()
            .position(|existing| delivery_order(&message, existing) == std::cmp::Ordering::Less)
            .unwrap_or(self.messages.len());
        self.messages.insert(pos, message);
        true
    }

    /// Drain every message for which `predicate` returns `true`, in queue
    /// order (already priority-then-timestamp sorted).
    pub fn drain_matching(&mut self, predicate: impl Fn(&A2AMessage) -> bool) -> Vec<A2AMessage> {
        let mut drained = Vec::new();
        let mut remaining = VecDeque::with_capacity(self.messages.len());
        for message in self.messages.drain(..) {
            if predicate(&message) {
                drained.push(message);
            } else {
                remaining.push_back(message);
            }
        }
        self.messages = remaining;
        drained
    }

    /// Current pending count.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the queue currently holds nothing.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Total messages dropped for fullness over this queue's lifetime.
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::message::{MessagePayload, Priority, TraceContext};
    use std::collections::HashMap;

    fn msg(priority: Priority, timestamp: f64) -> A2AMessage {
        A2AMessage::new(
            "orchestrator",
            "summariser",
            priority,
            0,
            TraceContext::new_root(),
            MessagePayload::AgentStatus {
                status: "x".into(),
                detail: None,
            },
            timestamp,
        )
    }

    #[test]
    fn higher_priority_drains_before_lower() {
        let mut q = RecipientQueue::new(10);
        q.push(msg(Priority::Low, 1.0));
        q.push(msg(Priority::Critical, 2.0));
        q.push(msg(Priority::Medium, 3.0));
        let drained = q.drain_matching(|_| true);
        assert_eq!(drained[0].priority, Priority::Critical);
        assert_eq!(drained[1].priority, Priority::Medium);
        assert_eq!(drained[2].priority, Priority::Low);
    }

    #[test]
    fn same_priority_is_fifo_by_timestamp() {
        let mut q = RecipientQueue::new(10);
        q.push(msg(Priority::Medium, 5.0));
        q.push(msg(Priority::Medium, 1.0));
        q.push(msg(Priority::Medium, 3.0));
        let drained = q.drain_matching(|_| true);
        let timestamps: Vec<f64> = drained.iter().map(|m| m.timestamp).collect();
        assert_eq!(timestamps, vec![1.0, 3.0, 5.0]);
    }

    #[test]
    fn full_queue_drops_and_counts_without_panicking() {
        let mut q = RecipientQueue::new(1);
        assert!(q.push(msg(Priority::Low, 1.0)));
        assert!(!q.push(msg(Priority::Low, 2.0)));
        assert_eq!(q.dropped_count(), 1);
    }
}
