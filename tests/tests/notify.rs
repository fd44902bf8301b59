use geosieve::{BackendKind, ChangeKind, FilterRequest, StrategyPlan};
use geosieve_driver_memory::{geo, Feature};
use tests::{assert_ids, fixtures, World};

#[tokio::test]
async fn content_change_drops_cached_results() {
    let world = World::new(BackendKind::InMemory).await;

    let before = world.db.filter(fixtures::near_roads(100.0)).await.unwrap();
    assert_ids!(before, [1, 2, 8, 9, 10]);

    world.memory.insert(
        "parcels",
        [Feature::new(11)
            .geometry(geo::Point::new(20.0, 0.0))
            .attr("pop", 50)],
    );

    // Until told, the engine answers from its cache.
    let id = world.db.submit(fixtures::near_roads(100.0)).unwrap();
    let stale = world.db.wait(id).await.unwrap();
    assert_eq!(stale.plan, Some(StrategyPlan::Cached));
    assert_ids!(stale.into_result().unwrap(), [1, 2, 8, 9, 10]);

    world
        .db
        .notify(&"parcels".into(), ChangeKind::Content)
        .unwrap();

    let id = world.db.submit(fixtures::near_roads(100.0)).unwrap();
    let fresh = world.db.wait(id).await.unwrap();
    assert_eq!(fresh.plan, Some(StrategyPlan::Direct));
    assert_ids!(fresh.into_result().unwrap(), [1, 2, 8, 9, 10, 11]);

    // Content changes keep the chain.
    assert_eq!(world.db.chain_len(&"parcels".into()), 1);
}

#[tokio::test]
async fn referenced_dataset_change_drops_dependent_results() {
    let world = World::new(BackendKind::InMemory).await;
    world.driver.report_rows("parcels", 200_000);

    let before = world.db.filter(fixtures::near_roads(100.0)).await.unwrap();
    assert_ids!(before, [1, 2, 8, 9, 10]);
    let baked = world.db.buffer_state(&"parcels".into());
    let old_artifact = baked.artifact.unwrap();

    world.memory.insert(
        "roads",
        [Feature::new(3)
            .wkt("LINESTRING(200 -50, 200 50)")
            .unwrap()
            .attr("kind", "service")],
    );
    world.db.notify(&"roads".into(), ChangeKind::Content).unwrap();

    let after = world.db.filter(fixtures::near_roads(100.0)).await.unwrap();
    assert_ids!(after, [1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);

    // The artifact baked from the old roads is not reused.
    assert_eq!(world.driver.log().materializations(), 2);
    assert!(!world.db.is_artifact_live(&old_artifact));
}

#[tokio::test]
async fn structure_change_resets_the_chain() {
    let world = World::new(BackendKind::GenericVector).await;

    world.db.filter(fixtures::near_roads(100.0)).await.unwrap();
    let step2 = FilterRequest::new("parcels")
        .attribute(fixtures::pop_over(1000))
        .position(1);
    world.db.filter(step2).await.unwrap();
    assert_eq!(world.db.chain_len(&"parcels".into()), 2);

    world
        .db
        .notify(&"parcels".into(), ChangeKind::Structure)
        .unwrap();
    assert_eq!(world.db.chain_len(&"parcels".into()), 0);
    assert_eq!(world.db.effective_filter(&"parcels".into()), None);

    // Position 1 needs a chain to extend.
    let step2 = FilterRequest::new("parcels")
        .attribute(fixtures::pop_over(1000))
        .position(1);
    let err = world.db.filter(step2).await.unwrap_err();
    assert!(err.is_invalid_request(), "{err}");
}

#[tokio::test]
async fn unknown_datasets_are_rejected() {
    let world = World::new(BackendKind::InMemory).await;

    let err = world
        .db
        .notify(&"rivers".into(), ChangeKind::Content)
        .unwrap_err();
    assert!(err.is_invalid_request());
}
