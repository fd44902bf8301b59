use geosieve::{
    stmt::Expr, BackendKind, CacheConfig, CombineOp, EngineConfig, FilterRequest, GeometryRef,
    ResultSet, SpatialPredicate, SpatialRelation,
};
use tests::{fixtures, tests, World};

fn chain() -> Vec<FilterRequest> {
    vec![
        fixtures::near_roads(100.0),
        FilterRequest::new("parcels")
            .attribute(fixtures::pop_over(1000))
            .position(1),
        FilterRequest::new("parcels")
            .attribute(Expr::eq(Expr::column("pop"), 600_i64))
            .combine(CombineOp::Or)
            .position(2),
        fixtures::near_primary_road(50.0),
        FilterRequest::new("parcels").spatial(SpatialPredicate::new(
            SpatialRelation::Within,
            GeometryRef::wkt("POLYGON((0 -10, 200 -10, 200 10, 0 10, 0 -10))", fixtures::SRID),
        )),
        FilterRequest::new("parcels")
            .spatial(
                SpatialPredicate::new(SpatialRelation::Intersects, GeometryRef::dataset("roads"))
                    .buffer(100.0),
            )
            .combine(CombineOp::AndNot)
            .position(1),
    ]
}

async fn run_all(world: &World, requests: Vec<FilterRequest>) -> Vec<ResultSet> {
    let mut results = vec![];
    for request in requests {
        results.push(world.db.filter(request).await.unwrap());
    }
    results
}

async fn disabling_the_cache_changes_nothing(backend: BackendKind) {
    let cached = World::new(backend).await;
    let uncached =
        World::with_config(backend, EngineConfig::new().cache(CacheConfig::disabled())).await;

    for world in [&cached, &uncached] {
        world.driver.report_rows("parcels", 200_000);
    }

    // Twice, so the second pass is answered from the cache where enabled.
    let mut requests = chain();
    requests.extend(chain());

    let with = run_all(&cached, requests.clone()).await;
    let without = run_all(&uncached, requests).await;
    pretty_assertions::assert_eq!(with, without);
}

async fn same_request_same_result(backend: BackendKind) {
    let world = World::new(backend).await;

    let first = world.db.filter(fixtures::near_roads(100.0)).await.unwrap();
    let second = world.db.filter(fixtures::near_roads(100.0)).await.unwrap();
    assert_eq!(first, second);

    world.db.clear_session();
    let third = world.db.filter(fixtures::near_roads(100.0)).await.unwrap();
    assert_eq!(first, third);
}

tests!(disabling_the_cache_changes_nothing, same_request_same_result);
