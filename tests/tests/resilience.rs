use geosieve::{
    BackendKind, BreakerConfig, Db, EngineConfig, RetryConfig, StrategyPlan, TaskState,
};
use geosieve_driver_memory::Memory;
use tests::{assert_ids, fixtures, memory_for, DriverHandle, LoggingDriver, World};

use std::time::Duration;

fn quick_retries(retries: u32) -> RetryConfig {
    RetryConfig::new()
        .max_retries(retries)
        .base_delay(Duration::from_millis(1))
}

/// Parcels on an in-memory primary that falls back to a generic vector
/// backend holding the same data.
async fn with_fallback(config: EngineConfig) -> (Db, DriverHandle, DriverHandle) {
    let primary = Memory::new();
    let fallback = memory_for(BackendKind::GenericVector);
    fixtures::load(&primary);
    fixtures::load(&fallback);

    let primary = LoggingDriver::new(primary);
    let fallback = LoggingDriver::new(fallback);
    let (primary_handle, fallback_handle) = (primary.handle(), fallback.handle());

    let mut builder = Db::builder();
    for dataset in fixtures::datasets(BackendKind::InMemory) {
        builder.dataset(dataset);
    }
    let db = builder
        .driver(primary)
        .driver(fallback)
        .fallback(BackendKind::InMemory, BackendKind::GenericVector)
        .config(config)
        .build()
        .await
        .unwrap();

    (db, primary_handle, fallback_handle)
}

#[tokio::test]
async fn unavailable_backend_falls_back() {
    let config = EngineConfig::new()
        .retry(RetryConfig::none())
        .breaker(BreakerConfig::new().failure_threshold(1));
    let (db, primary, fallback) = with_fallback(config).await;
    primary.set_unavailable(true);

    let result = db.filter(fixtures::near_roads(100.0)).await.unwrap();
    assert_eq!(result.backend, BackendKind::GenericVector);
    assert_ids!(result, [1, 2, 8, 9, 10]);
    assert_eq!(db.breaker_state(BackendKind::InMemory), Some(geosieve::BreakerState::Open));
    assert_eq!(primary.log().failures(), 1);

    // The open breaker fails fast; the primary is not even tried.
    let id = db.submit(fixtures::near_roads(100.0)).unwrap();
    let handle = db.wait(id).await.unwrap();
    assert_eq!(handle.state, TaskState::Succeeded);
    // Fallback results are never cached.
    assert_ne!(handle.plan, Some(StrategyPlan::Cached));
    assert_eq!(handle.into_result().unwrap().backend, BackendKind::GenericVector);
    assert_eq!(primary.log().len(), 1);
    assert!(!fallback.log().is_empty());
}

#[tokio::test]
async fn transient_failures_are_retried_then_surface() {
    let config = EngineConfig::new()
        .retry(quick_retries(2))
        .breaker(BreakerConfig::new().failure_threshold(100));
    let world = World::with_config(BackendKind::InMemory, config).await;
    world.driver.set_unavailable(true);

    let id = world.db.submit(fixtures::near_roads(100.0)).unwrap();
    let handle = world.db.wait(id).await.unwrap();
    assert_eq!(handle.state, TaskState::Failed);
    let err = handle.error.unwrap();
    assert!(err.is_backend_unavailable(), "{err}");

    // One attempt plus two retries.
    assert_eq!(world.driver.log().failures(), 3);
    assert_eq!(
        world.db.breaker_state(BackendKind::InMemory),
        Some(geosieve::BreakerState::Closed)
    );

    // A recovered backend just works again.
    world.driver.set_unavailable(false);
    let result = world.db.filter(fixtures::near_roads(100.0)).await.unwrap();
    assert_ids!(result, [1, 2, 8, 9, 10]);
}

#[tokio::test]
async fn rejected_queries_are_neither_retried_nor_rerouted() {
    let config = EngineConfig::new()
        .retry(quick_retries(3))
        .breaker(BreakerConfig::new().failure_threshold(2));
    let (db, primary, fallback) = with_fallback(config).await;
    primary.reject_queries(true);

    for _ in 0..3 {
        let err = db.filter(fixtures::near_roads(100.0)).await.unwrap_err();
        assert!(err.is_driver_operation_failed(), "{err}");
        assert!(!err.is_backend_unavailable());
        assert!(!err.is_transient());
    }

    // One attempt per job, and none of them counts against the backend.
    assert_eq!(primary.log().failures(), 3);
    assert_eq!(
        db.breaker_state(BackendKind::InMemory),
        Some(geosieve::BreakerState::Closed)
    );
    assert!(fallback.log().is_empty());

    primary.reject_queries(false);
    let result = db.filter(fixtures::near_roads(100.0)).await.unwrap();
    assert_eq!(result.backend, BackendKind::InMemory);
    assert_ids!(result, [1, 2, 8, 9, 10]);
}

#[tokio::test]
async fn retry_recovers_from_a_blip() {
    let config = EngineConfig::new().retry(
        RetryConfig::new()
            .max_retries(5)
            .base_delay(Duration::from_millis(20)),
    );
    let world = World::with_config(BackendKind::InMemory, config).await;
    world.driver.set_unavailable(true);

    let id = world.db.submit(fixtures::near_roads(100.0)).unwrap();

    tokio::time::sleep(Duration::from_millis(30)).await;
    world.driver.set_unavailable(false);

    let handle = world.db.wait(id).await.unwrap();
    assert_eq!(handle.state, TaskState::Succeeded);
    assert!(world.driver.log().failures() >= 1);
}

#[tokio::test]
async fn health_check_reports_reachability() {
    let world = World::new(BackendKind::GenericVector).await;

    assert_eq!(
        world.db.health_check().await,
        vec![(BackendKind::GenericVector, true)]
    );

    world.driver.set_unavailable(true);
    assert_eq!(
        world.db.health_check().await,
        vec![(BackendKind::GenericVector, false)]
    );

    world.driver.set_unavailable(false);
    assert_eq!(
        world.db.health_check().await,
        vec![(BackendKind::GenericVector, true)]
    );
}
