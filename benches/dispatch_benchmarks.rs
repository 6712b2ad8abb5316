use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use uuid::Uuid;

use bridge_core::config::BridgeConfig;
use bridge_core::constants::{methods, result_codes};
use bridge_core::execution::{
    CommandArguments, CompletionHandle, ContinuationRouter, PendingOperationSlot,
};
use bridge_core::test_helpers::TestHost;

fn benchmark_park_and_deliver(c: &mut Criterion) {
    let config = BridgeConfig::default().with_deadline_tasks(false);
    let router = Arc::new(ContinuationRouter::new(
        Arc::new(PendingOperationSlot::new()),
        &config,
    ));

    c.bench_function("park_and_deliver", |b| {
        b.iter(|| {
            let (handle, mut receiver) = CompletionHandle::channel("pick-image", Uuid::new_v4());
            let _ = router.park(1000, handle);
            router.on_flow_result(
                1000,
                result_codes::RESULT_OK,
                Some("content://media/1".to_string()),
            );
            black_box(receiver.try_result())
        })
    });
}

fn benchmark_sync_dispatch(c: &mut Criterion) {
    let host = TestHost::without_deadline_tasks();

    c.bench_function("socket_warning_dispatch", |b| {
        b.iter(|| {
            host.bridge.invoke(
                methods::CREATE_SOCKET_ISSUE_WARNING,
                CommandArguments::new().with("CHANNEL_ID", "socket_errors"),
                |reply| {
                    black_box(reply);
                },
            )
        })
    });
}

criterion_group!(benches, benchmark_park_and_deliver, benchmark_sync_dispatch);
criterion_main!(benches);
