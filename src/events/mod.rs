//! Event Emitter / Stream Hub component: per-session bounded
//! progress-event delivery to a single subscriber.

pub mod event;
pub mod hub;

pub use event::{EventMetadata, EventPayload, EventStatus, ProgressEvent};
pub use hub::{EventSubscription, StreamHub};
