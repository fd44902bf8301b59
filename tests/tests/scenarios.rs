use geosieve::{
    stmt::Expr, BackendKind, CombineOp, FilterRequest, GeometryRef, SpatialPredicate,
    SpatialRelation, StrategyPlan, TaskState,
};
use tests::{assert_ids, fixtures, World};

use std::time::Duration;

#[tokio::test]
async fn large_buffered_filter_materializes_once_then_hits_cache() {
    let world = World::new(BackendKind::InMemory).await;
    world.driver.report_rows("parcels", 200_000);
    let log = world.driver.log();

    let first = world.db.submit(fixtures::near_roads(100.0)).unwrap();
    let first = world.db.wait(first).await.unwrap();
    assert_eq!(first.state, TaskState::Succeeded);
    assert_eq!(first.plan, Some(StrategyPlan::Materialized));
    assert_eq!(log.materializations(), 1);

    let ops = log.len();
    let second = world.db.submit(fixtures::near_roads(100.0)).unwrap();
    let second = world.db.wait(second).await.unwrap();
    assert_eq!(second.plan, Some(StrategyPlan::Cached));
    assert_eq!(log.materializations(), 1);
    assert_eq!(log.len(), ops);

    let first = first.into_result().unwrap();
    let second = second.into_result().unwrap();
    assert_ids!(first, [1, 2, 8, 9, 10]);
    assert_eq!(first, second);
}

#[tokio::test]
async fn chained_steps_keep_the_baked_buffer() {
    let world = World::new(BackendKind::InMemory).await;
    world.driver.report_rows("parcels", 200_000);
    let log = world.driver.log();

    let step1 = world.db.filter(fixtures::near_roads(100.0)).await.unwrap();
    assert_ids!(step1, [1, 2, 8, 9, 10]);

    let state = world.db.buffer_state(&"parcels".into());
    assert!(state.baked);
    assert_eq!(state.buffer, 100.0);

    // No buffer given: the chain's buffer carries over.
    let step2 = FilterRequest::new("parcels")
        .attribute(fixtures::pop_over(1000))
        .position(1);
    let step2 = world.db.filter(step2).await.unwrap();
    assert_ids!(step2, [8, 9, 10]);

    let effective = world.db.effective_filter(&"parcels".into()).unwrap();
    let spatial = effective.spatial_nodes();
    assert_eq!(spatial.len(), 1);
    assert_eq!(spatial[0].buffer, 100.0);

    // A spatial step without a buffer inherits it as well, and binds to the
    // artifact built by step 1.
    let step3 = FilterRequest::new("parcels")
        .spatial(SpatialPredicate::new(
            SpatialRelation::Intersects,
            GeometryRef::dataset("roads"),
        ))
        .position(2);
    let step3 = world.db.filter(step3).await.unwrap();
    assert_ids!(step3, [8, 9, 10]);

    let effective = world.db.effective_filter(&"parcels".into()).unwrap();
    assert!(effective.spatial_nodes().iter().all(|node| node.buffer == 100.0));
    assert_eq!(world.db.chain_len(&"parcels".into()), 3);
    assert_eq!(log.materializations(), 1);
}

#[tokio::test]
async fn conflicting_buffer_rebuilds() {
    let world = World::new(BackendKind::InMemory).await;
    world.driver.report_rows("parcels", 200_000);
    let log = world.driver.log();

    world.db.filter(fixtures::near_roads(100.0)).await.unwrap();

    let narrower = FilterRequest::new("parcels")
        .spatial(
            SpatialPredicate::new(SpatialRelation::Intersects, GeometryRef::dataset("roads"))
                .buffer(50.0),
        )
        .combine(CombineOp::And)
        .position(1);
    let result = world.db.filter(narrower).await.unwrap();

    // Within 100 and within 50 of a road.
    assert_ids!(result, [1, 9, 10]);
    assert_eq!(log.materializations(), 2);
    assert_eq!(world.db.buffer_state(&"parcels".into()).buffer, 50.0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn serial_backend_never_interleaves_jobs() {
    let world = World::new(BackendKind::GenericVector).await;
    world.driver.set_delay(Duration::from_millis(20));
    let log = world.driver.log();

    let parcels = world.db.submit(fixtures::near_roads(100.0)).unwrap();
    let roads = world
        .db
        .submit(FilterRequest::new("roads").attribute(Expr::eq(Expr::column("kind"), "primary")))
        .unwrap();

    let parcels = world.db.wait(parcels).await.unwrap().into_result().unwrap();
    let roads = world.db.wait(roads).await.unwrap().into_result().unwrap();
    assert_ids!(parcels, [1, 2, 8, 9, 10]);
    assert_ids!(roads, [1]);

    assert_eq!(world.driver.max_in_flight(), 1);
    assert_eq!(world.db.max_connections(BackendKind::GenericVector), Some(1));

    // One job's operations all come before the other's.
    let datasets = log.datasets();
    let switches = datasets.windows(2).filter(|w| w[0] != w[1]).count();
    assert_eq!(switches, 1, "{datasets:?}");
}

#[tokio::test]
async fn eroded_reference_excludes_rows_without_failing() {
    let world = World::new(BackendKind::InMemory).await;

    let strip = GeometryRef::wkt("POLYGON((0 -20, 440 -20, 440 20, 0 20, 0 -20))", fixtures::SRID);

    // Unbuffered, the strip covers every parcel.
    let whole = FilterRequest::new("parcels")
        .spatial(SpatialPredicate::new(SpatialRelation::Intersects, strip.clone()));
    assert_eq!(world.db.filter(whole).await.unwrap().len(), 10);

    let eroded = FilterRequest::new("parcels")
        .spatial(SpatialPredicate::new(SpatialRelation::Intersects, strip).buffer(-50.0));
    let id = world.db.submit(eroded).unwrap();
    let handle = world.db.wait(id).await.unwrap();
    assert_eq!(handle.state, TaskState::Succeeded);
    assert!(handle.into_result().unwrap().is_empty());

    // The eroded step still combines with later ones.
    let either = FilterRequest::new("parcels")
        .attribute(fixtures::pop_over(2500))
        .combine(CombineOp::Or)
        .position(1);
    let result = world.db.filter(either).await.unwrap();
    assert_ids!(result, [9, 10]);
}
