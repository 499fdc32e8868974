//! Scenario 5 (unauthorised sender): a non-orchestrator agent addressing
//! another non-orchestrator agent directly is denied by policy before
//! anything is enqueued.

mod common;

use std::collections::HashMap;

use agentic_navigator_core::bus::{A2AMessage, MessagePayload, Priority, TraceContext};
use agentic_navigator_core::error::NavigatorError;
use common::{build_runtime, test_config};

#[tokio::test]
async fn summariser_addressing_linker_directly_is_rejected() {
    let config = test_config();
    let (_identity, bus, _hub) = build_runtime(&config);

    let message = A2AMessage::new(
        "summariser",
        "linker",
        Priority::Medium,
        60,
        TraceContext::new_root(),
        MessagePayload::TaskDelegation {
            task: "map_entities".to_string(),
            parameters: HashMap::new(),
        },
        1_000.0,
    );

    let result = bus.publish(message, 1_000.0).await;
    assert!(matches!(result, Err(NavigatorError::Unauthorised { .. })));

    let received = bus.receive("linker", None, 1_000.0).await.unwrap();
    assert!(received.is_empty());
    let stats = bus.stats().await;
    assert_eq!(stats.total, 0, "a rejected publish must never be counted as delivered");
}
