use geosieve::{BackendKind, CacheConfig, EngineConfig, StrategyPlan, TaskState};
use tests::{assert_ids, fixtures, World};

#[tokio::test]
async fn small_datasets_run_directly() {
    let world = World::new(BackendKind::InMemory).await;

    let id = world.db.submit(fixtures::near_roads(100.0)).unwrap();
    let handle = world.db.wait(id).await.unwrap();
    assert_eq!(handle.plan, Some(StrategyPlan::Direct));
    assert_eq!(world.driver.log().materializations(), 0);
    assert_ids!(handle.into_result().unwrap(), [1, 2, 8, 9, 10]);
}

#[tokio::test]
async fn huge_indexed_datasets_filter_in_two_phases() {
    let config = EngineConfig::new().candidate_batch(2);
    let world = World::with_config(BackendKind::InMemory, config).await;
    world.driver.report_rows("parcels", 2_000_000);
    let log = world.driver.log();

    let id = world.db.submit(fixtures::near_roads(100.0)).unwrap();
    let handle = world.db.wait(id).await.unwrap();
    assert_eq!(handle.plan, Some(StrategyPlan::TwoPhase));
    assert_eq!(handle.progress, 100);

    // Every parcel's envelope meets the roads' envelope.
    assert_eq!(log.candidate_queries(), 5);
    assert_eq!(log.materializations(), 0);
    assert_ids!(handle.into_result().unwrap(), [1, 2, 8, 9, 10]);
}

#[tokio::test]
async fn backends_without_artifacts_scan_progressively() {
    let config = EngineConfig::new().chunk_size(3);
    let world = World::with_config(BackendKind::GenericVector, config).await;
    world.driver.report_rows("parcels", 200_000);
    let log = world.driver.log();

    let id = world.db.submit(fixtures::near_roads(100.0)).unwrap();
    let handle = world.db.wait(id).await.unwrap();
    assert_eq!(handle.state, TaskState::Succeeded);
    assert_eq!(handle.plan, Some(StrategyPlan::Progressive));

    // 3 + 3 + 3 + 1 rows; the short page ends the scan.
    assert_eq!(log.chunk_queries(), 4);
    assert_ids!(handle.into_result().unwrap(), [1, 2, 8, 9, 10]);
}

#[tokio::test]
async fn attribute_only_filters_never_materialize() {
    let world = World::new(BackendKind::InMemory).await;
    world.driver.report_rows("parcels", 200_000);

    let request = geosieve::FilterRequest::new("parcels").attribute(fixtures::pop_over(1000));
    let id = world.db.submit(request).unwrap();
    let handle = world.db.wait(id).await.unwrap();
    assert_eq!(handle.plan, Some(StrategyPlan::Direct));
    assert_ids!(handle.into_result().unwrap(), [4, 5, 6, 7, 8, 9, 10]);
}

#[tokio::test]
async fn plan_is_stable_at_the_thresholds() {
    let config = EngineConfig::new().cache(CacheConfig::disabled());
    let small = config.small_dataset_threshold;
    let large = config.two_phase_threshold;
    let world = World::with_config(BackendKind::InMemory, config).await;

    for (rows, expected) in [
        (small, StrategyPlan::Direct),
        (small + 1, StrategyPlan::Materialized),
        (large, StrategyPlan::Materialized),
        (large + 1, StrategyPlan::TwoPhase),
    ] {
        world.driver.report_rows("parcels", rows);
        world
            .db
            .notify(&"parcels".into(), geosieve::ChangeKind::Content)
            .unwrap();

        for _ in 0..5 {
            let id = world.db.submit(fixtures::near_roads(100.0)).unwrap();
            let handle = world.db.wait(id).await.unwrap();
            assert_eq!(handle.plan, Some(expected), "{rows} rows");
            assert_ids!(handle.into_result().unwrap(), [1, 2, 8, 9, 10]);
        }
    }
}
