//! Pending timeout enforcement with a paused tokio clock.

use std::time::Duration;

use bridge_core::config::BridgeConfig;
use bridge_core::constants::{methods, result_codes};
use bridge_core::execution::{CommandArguments, Delivery, DiscardReason};
use bridge_core::test_helpers::{ReplyCollector, TestHost};
use bridge_core::BridgeError;

fn host(timeout_ms: u64, deadline_tasks: bool) -> TestHost {
    TestHost::with_config(
        BridgeConfig::default()
            .with_pending_timeout(Duration::from_millis(timeout_ms))
            .with_deadline_tasks(deadline_tasks),
    )
    .expect("valid test configuration")
}

fn pick(host: &TestHost) -> ReplyCollector {
    let replies = ReplyCollector::new();
    host.bridge
        .invoke(methods::PICK_IMAGE, CommandArguments::new(), replies.callback());
    replies
}

#[tokio::test(start_paused = true)]
async fn test_deadline_task_times_out_parked_pick() {
    let host = host(100, true);
    let replies = pick(&host);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(replies.is_empty());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(replies.single().error_code(), Some("TIMEOUT"));
    assert!(host.bridge.slot().is_empty());
    assert_eq!(host.bridge.continuations().stats().timed_out, 1);

    let late = host.bridge.on_flow_result(
        1000,
        result_codes::RESULT_OK,
        Some("img://too-late".to_string()),
    );
    assert_eq!(late, Delivery::Discarded(DiscardReason::NothingPending));
    assert_eq!(replies.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stale_deadline_does_not_expire_newer_pick() {
    let host = host(100, true);

    let first = pick(&host);
    tokio::time::sleep(Duration::from_millis(60)).await;
    host.bridge.on_flow_result(1000, result_codes::RESULT_CANCELED, None);
    assert_eq!(first.single().error_code(), Some("CANCELLED"));

    // Parked at t=60; the first deadline fires at t=100 and must leave it alone
    let second = pick(&host);
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(second.is_empty());
    assert!(host.bridge.slot().is_pending(1000));

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(second.single().error_code(), Some("TIMEOUT"));
}

#[tokio::test(start_paused = true)]
async fn test_async_call_resolves_with_timeout() {
    let host = host(250, true);

    let result = host
        .bridge
        .call(methods::PICK_IMAGE, CommandArguments::new())
        .await;

    assert_eq!(result, Err(BridgeError::Timeout { after_ms: 250 }));
}

#[tokio::test(start_paused = true)]
async fn test_sweep_expires_without_deadline_tasks() {
    let host = host(100, false);
    let replies = pick(&host);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(host.bridge.expire_overdue(), 0);
    assert!(replies.is_empty());

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(replies.is_empty());
    assert_eq!(host.bridge.expire_overdue(), 1);
    assert_eq!(replies.single().error_code(), Some("TIMEOUT"));
    assert!(host.bridge.slot().is_empty());
}
