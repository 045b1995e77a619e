//! Dispatch configuration tests: route table registration and mode
//! selection.

use girder_engine::{DispatchMode, RouteTable, Router};
use girder_transport::ServerConfig;

struct NoopRouter;

impl Router for NoopRouter {}

struct OtherRouter;

impl Router for OtherRouter {}

#[test]
fn registration_grows_the_table() {
    let mut table = RouteTable::new();
    assert!(table.is_empty());

    table.register(0, NoopRouter);
    table.register(1, OtherRouter);
    assert_eq!(table.len(), 2);
}

#[test]
#[should_panic(expected = "duplicate router registration for message id 5")]
fn duplicate_registration_panics() {
    let mut table = RouteTable::new();
    table.register(5, NoopRouter);
    table.register(5, NoopRouter);
}

#[test]
#[should_panic(expected = "duplicate router registration")]
fn duplicate_registration_panics_across_router_types() {
    let mut table = RouteTable::new();
    table.register(9, NoopRouter);
    table.register(9, OtherRouter);
}

#[test]
fn pool_size_zero_selects_inline_mode() {
    let config = ServerConfig {
        worker_pool_size: 0,
        ..ServerConfig::default()
    };
    assert_eq!(DispatchMode::from_config(&config), DispatchMode::Inline);
}

#[test]
fn pool_config_selects_pooled_mode() {
    let config = ServerConfig {
        worker_pool_size: 4,
        max_worker_queue_len: 16,
        ..ServerConfig::default()
    };
    assert_eq!(
        DispatchMode::from_config(&config),
        DispatchMode::Pooled {
            workers: 4,
            queue_depth: 16
        }
    );
}

#[test]
#[should_panic(expected = "worker pool started twice")]
fn starting_the_worker_pool_twice_panics() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let _guard = runtime.enter();

    let mut dispatcher = girder_engine::Dispatcher::new(RouteTable::new());
    dispatcher.start_worker_pool(2, 8);
    dispatcher.start_worker_pool(2, 8);
}
