use geosieve::{stmt::Expr, BackendKind, FilterRequest, Scope, TaskState};
use tests::{assert_ids, fixtures, World};

use std::time::Duration;

fn parcels() -> Scope {
    Scope::Dataset("parcels".into())
}

#[tokio::test]
async fn dataset_undo_walks_back_the_chain() {
    let world = World::new(BackendKind::InMemory).await;
    world.driver.report_rows("parcels", 200_000);
    let db = &world.db;

    let step1 = db.filter(fixtures::near_roads(100.0)).await.unwrap();
    let after_step1 = db.effective_filter(&"parcels".into()).unwrap();

    let step2 = FilterRequest::new("parcels")
        .attribute(fixtures::pop_over(1000))
        .position(1);
    db.filter(step2).await.unwrap();
    assert!(db.buffer_state(&"parcels".into()).baked);

    let undone = db.undo(parcels()).await.unwrap();
    assert_eq!(undone.entries.len(), 1);
    assert_eq!(undone.entries[0].predicate, step1.predicate);
    assert_eq!(undone.entries[0].filter.as_ref(), Some(&after_step1));
    assert_eq!(db.effective_filter(&"parcels".into()), Some(after_step1.clone()));
    assert!(!db.buffer_state(&"parcels".into()).baked);

    let undone = db.undo(parcels()).await.unwrap();
    assert_eq!(undone.entries[0].filter, None);
    assert_eq!(undone.entries[0].predicate, "");
    assert_eq!(db.effective_filter(&"parcels".into()), None);
    assert_eq!(db.chain_len(&"parcels".into()), 0);

    assert!(db.undo(parcels()).await.is_none());

    let redone = db.redo(parcels()).await.unwrap();
    assert_eq!(redone.entries[0].filter.as_ref(), Some(&after_step1));
    assert_eq!(db.effective_filter(&"parcels".into()), Some(after_step1));

    // Chaining from the restored state works like from a fresh step.
    let step2 = FilterRequest::new("parcels")
        .attribute(fixtures::pop_over(2500))
        .position(1);
    let result = db.filter(step2).await.unwrap();
    assert_ids!(result, [9, 10]);

    // The new step dropped the redo tail.
    assert!(db.redo(parcels()).await.is_none());
}

#[tokio::test]
async fn global_undo_reverts_a_whole_submission() {
    let world = World::new(BackendKind::InMemory).await;
    let db = &world.db;

    let primary = FilterRequest::new("roads").attribute(Expr::eq(Expr::column("kind"), "primary"));

    let ids = db
        .submit_all([fixtures::near_roads(100.0), primary])
        .unwrap();
    for id in ids {
        assert_eq!(db.wait(id).await.unwrap().state, TaskState::Succeeded);
    }

    let pop = FilterRequest::new("parcels")
        .attribute(fixtures::pop_over(1000))
        .position(1);
    let id = db.submit(pop).unwrap();
    db.wait(id).await.unwrap();
    assert_eq!(db.chain_len(&"parcels".into()), 2);

    // Reverts only the last submission.
    let undone = db.undo(Scope::All).await.unwrap();
    assert_eq!(undone.entries.len(), 1);
    assert_eq!(db.chain_len(&"parcels".into()), 1);
    assert!(db.effective_filter(&"roads".into()).is_some());

    // Reverts both datasets of the first one.
    let undone = db.undo(Scope::All).await.unwrap();
    assert_eq!(undone.entries.len(), 2);
    assert_eq!(db.effective_filter(&"parcels".into()), None);
    assert_eq!(db.effective_filter(&"roads".into()), None);
    assert!(db.undo(Scope::All).await.is_none());

    let redone = db.redo(Scope::All).await.unwrap();
    assert_eq!(redone.entries.len(), 2);
    assert!(db.effective_filter(&"parcels".into()).is_some());
    assert!(db.effective_filter(&"roads".into()).is_some());
}

#[tokio::test]
async fn clearing_the_session_forgets_history() {
    let world = World::new(BackendKind::GenericVector).await;

    world.db.filter(fixtures::near_roads(100.0)).await.unwrap();
    world.db.clear_session();

    assert!(world.db.undo(parcels()).await.is_none());
    assert!(world.db.undo(Scope::All).await.is_none());
    assert_eq!(world.db.chain_len(&"parcels".into()), 0);
}

#[tokio::test]
async fn chaining_continues_from_an_undone_state() {
    let world = World::new(BackendKind::InMemory).await;
    let db = &world.db;

    db.filter(fixtures::near_roads(100.0)).await.unwrap();
    db.filter(
        FilterRequest::new("parcels")
            .attribute(fixtures::pop_over(1000))
            .position(1),
    )
    .await
    .unwrap();
    db.filter(
        FilterRequest::new("parcels")
            .attribute(fixtures::pop_over(2500))
            .position(2),
    )
    .await
    .unwrap();

    let undone = db.undo(parcels()).await.unwrap();
    let position = undone.entries[0].chain_len();
    assert_eq!(position, 2);
    assert_eq!(db.chain_len(&"parcels".into()), 2);

    // Near a road, over 1000 people, and under 2500.
    let result = db
        .filter(
            FilterRequest::new("parcels")
                .attribute(Expr::lt(Expr::column("pop"), 2500_i64))
                .position(position),
        )
        .await
        .unwrap();
    assert_ids!(result, [8]);
    assert_eq!(db.chain_len(&"parcels".into()), 3);
}

#[tokio::test]
async fn undo_waits_for_jobs_already_queued() {
    let world = World::new(BackendKind::InMemory).await;
    let db = &world.db;

    db.filter(fixtures::near_roads(100.0)).await.unwrap();
    let after_step1 = db.effective_filter(&"parcels".into()).unwrap();

    world.driver.set_delay(Duration::from_millis(50));
    let id = db
        .submit(
            FilterRequest::new("parcels")
                .attribute(fixtures::pop_over(1000))
                .position(1),
        )
        .unwrap();

    // Undoes the queued step once it committed, not the one before it.
    let undone = db.undo(parcels()).await.unwrap();
    assert_eq!(db.poll(id).unwrap().state, TaskState::Succeeded);
    assert_eq!(undone.entries[0].filter.as_ref(), Some(&after_step1));
    assert_eq!(db.effective_filter(&"parcels".into()), Some(after_step1));
    assert_eq!(db.chain_len(&"parcels".into()), 1);
}
