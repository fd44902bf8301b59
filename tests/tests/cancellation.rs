use geosieve::{BackendKind, Db, EngineConfig, FilterRequest, StrategyPlan, TaskId, TaskState};
use tests::{fixtures, DriverHandle, LoggingDriver, ScriptedSql, World};

use std::time::Duration;

#[tokio::test]
async fn cancelling_a_materialized_job_leaves_no_artifacts() {
    let world = World::new(BackendKind::InMemory).await;
    world.driver.report_rows("parcels", 200_000);
    world.driver.set_delay(Duration::from_millis(100));

    let id = world.db.submit(fixtures::near_roads(100.0)).unwrap();

    // Wait for the plan, so the job is past planning and about to build.
    loop {
        let handle = world.db.poll(id).unwrap();
        assert!(!handle.is_terminal(), "finished before it could be cancelled");
        if handle.plan.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    assert!(world.db.cancel(id).unwrap());

    let handle = world.db.wait(id).await.unwrap();
    assert_eq!(handle.state, TaskState::Cancelled);
    assert!(handle.result.is_none());
    assert!(handle.error.as_ref().unwrap().is_filter_cancelled());
    assert!(handle.into_result().unwrap_err().is_filter_cancelled());

    world.db.sweep_expired().await;
    assert!(world.db.artifacts().is_empty());
    assert!(world.memory.artifacts().is_empty());

    // A cancelled step does not become part of the chain.
    assert_eq!(world.db.chain_len(&"parcels".into()), 0);
    assert!(!world.db.buffer_state(&"parcels".into()).baked);
}

#[tokio::test]
async fn cancelling_a_queued_job_skips_it() {
    let config = EngineConfig::new().max_workers(1);
    let world = World::with_config(BackendKind::InMemory, config).await;
    world.driver.set_delay(Duration::from_millis(50));

    let first = world.db.submit(fixtures::near_roads(100.0)).unwrap();
    let queued = world
        .db
        .submit(FilterRequest::new("roads").attribute(geosieve::stmt::Expr::eq(
            geosieve::stmt::Expr::column("kind"),
            "service",
        )))
        .unwrap();

    assert!(world.db.cancel(queued).unwrap());
    assert_eq!(world.db.poll(queued).unwrap().state, TaskState::Cancelled);

    let handle = world.db.wait(first).await.unwrap();
    assert_eq!(handle.state, TaskState::Succeeded);

    let handle = world.db.wait(queued).await.unwrap();
    assert_eq!(handle.state, TaskState::Cancelled);
    assert!(!world.driver.log().datasets().contains(&"roads".into()));
}

#[tokio::test]
async fn cancelling_a_finished_job_is_a_no_op() {
    let world = World::new(BackendKind::InMemory).await;

    let id = world.db.submit(fixtures::near_roads(100.0)).unwrap();
    let handle = world.db.wait(id).await.unwrap();
    assert_eq!(handle.state, TaskState::Succeeded);

    assert!(!world.db.cancel(id).unwrap());
    assert_eq!(world.db.poll(id).unwrap().state, TaskState::Succeeded);
}

#[tokio::test]
async fn slow_jobs_time_out() {
    let world = World::new(BackendKind::InMemory).await;
    world.driver.set_delay(Duration::from_millis(200));

    let request = fixtures::near_roads(100.0).timeout(Duration::from_millis(50));
    let id = world.db.submit(request).unwrap();
    let handle = world.db.wait(id).await.unwrap();

    assert_eq!(handle.state, TaskState::Failed);
    let err = handle.error.unwrap();
    assert!(err.is_filter_timeout(), "{err}");
    assert_eq!(world.db.chain_len(&"parcels".into()), 0);
}

#[tokio::test]
async fn unknown_tasks_are_rejected() {
    let world = World::new(BackendKind::InMemory).await;
    let missing = geosieve::TaskId(9_999);

    assert!(world.db.poll(missing).unwrap_err().is_invalid_request());
    assert!(world.db.cancel(missing).unwrap_err().is_invalid_request());
    assert!(world.db.wait(missing).await.unwrap_err().is_invalid_request());
}

/// The fixture datasets on a scripted PostGIS backend reporting `rows`
/// parcels. Every operation takes `delay`.
async fn scripted_postgis(rows: u64, delay: Duration, config: EngineConfig) -> (Db, ScriptedSql, DriverHandle) {
    let sql = ScriptedSql::new(rows, 1..=10);
    let driver = LoggingDriver::new(sql.clone());
    let handle = driver.handle();
    handle.set_delay(delay);

    let mut builder = Db::builder();
    for dataset in fixtures::datasets(BackendKind::Postgresql) {
        builder.dataset(dataset);
    }
    let db = builder.driver(driver).config(config).build().await.unwrap();
    (db, sql, handle)
}

/// Polls until `until` holds for the running task.
async fn wait_until(db: &Db, id: TaskId, until: impl Fn(&geosieve::TaskHandle) -> bool) {
    loop {
        let handle = db.poll(id).unwrap();
        assert!(!handle.is_terminal(), "finished before it could be cancelled");
        if until(&handle) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn cancelling_a_two_phase_sql_job_stops_between_batches() {
    let config = EngineConfig::new().candidate_batch(2);
    let (db, sql, driver) = scripted_postgis(2_000_000, Duration::from_millis(20), config).await;
    let log = driver.log();

    let id = db.submit(fixtures::near_roads(100.0)).unwrap();
    // Past the bounding box phase, into the candidate batches.
    wait_until(&db, id, |handle| handle.progress >= 50).await;
    assert_eq!(db.poll(id).unwrap().plan, Some(StrategyPlan::TwoPhase));

    assert!(db.cancel(id).unwrap());
    let handle = db.wait(id).await.unwrap();
    assert_eq!(handle.state, TaskState::Cancelled);

    // The row count and the bounding boxes, then fewer than the 5 batches.
    assert!(log.sql_queries() < 2 + 5, "{:?}", log.names());
    assert_eq!(log.materializations(), 0);

    db.sweep_expired().await;
    assert!(db.artifacts().is_empty());
    assert!(sql.artifacts().is_empty());
    assert_eq!(db.chain_len(&"parcels".into()), 0);
}

#[tokio::test]
async fn cancelling_a_materialized_sql_job_drops_its_view() {
    let (db, sql, _driver) =
        scripted_postgis(200_000, Duration::from_millis(60), EngineConfig::new()).await;

    let id = db.submit(fixtures::near_roads(100.0)).unwrap();
    wait_until(&db, id, |handle| handle.plan.is_some()).await;
    assert_eq!(db.poll(id).unwrap().plan, Some(StrategyPlan::Materialized));

    assert!(db.cancel(id).unwrap());
    let handle = db.wait(id).await.unwrap();
    assert_eq!(handle.state, TaskState::Cancelled);

    db.sweep_expired().await;
    assert!(db.artifacts().is_empty());
    assert!(sql.artifacts().is_empty());
    assert!(!db.buffer_state(&"parcels".into()).baked);
}

