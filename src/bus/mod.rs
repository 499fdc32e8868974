//! A2A Message Bus component: typed, signed, priority-ordered
//! message exchange between the four pipeline agents.

pub mod bus;
pub mod message;
pub mod queue;

pub use bus::{AckOutcome, BusStats, MessageBus};
pub use message::{A2AMessage, MessagePayload, Priority, TraceContext, BROADCAST};
