use geosieve::{BackendKind, Dataset, Db, EngineConfig, FilterRequest, PoolConfig};
use geosieve_driver_memory::Memory;
use tests::fixtures;

#[tokio::test]
async fn dataset_without_a_driver_is_rejected() {
    let err = Db::builder()
        .dataset(Dataset::new("parcels", BackendKind::Postgresql, fixtures::SRID))
        .driver(Memory::new())
        .build()
        .await
        .unwrap_err();
    assert!(err.is_invalid_request(), "{err}");
}

#[tokio::test]
async fn fallback_needs_a_driver_and_another_backend() {
    let err = Db::builder()
        .driver(Memory::new())
        .fallback(BackendKind::InMemory, BackendKind::InMemory)
        .build()
        .await
        .unwrap_err();
    assert!(err.is_invalid_request(), "{err}");

    let err = Db::builder()
        .driver(Memory::new())
        .fallback(BackendKind::InMemory, BackendKind::GenericVector)
        .build()
        .await
        .unwrap_err();
    assert!(err.is_invalid_request(), "{err}");
}

#[tokio::test]
async fn one_driver_per_backend() {
    let err = Db::builder()
        .driver(Memory::new())
        .driver(Memory::new())
        .build()
        .await
        .unwrap_err();
    assert!(err.is_invalid_request(), "{err}");
}

#[tokio::test]
async fn dataset_may_rely_on_its_fallback_alone() {
    let memory = Memory::generic_vector();
    fixtures::load(&memory);

    let mut builder = Db::builder();
    for dataset in fixtures::datasets(BackendKind::Postgresql) {
        builder.dataset(dataset);
    }
    let db = builder
        .driver(memory)
        .fallback(BackendKind::Postgresql, BackendKind::GenericVector)
        .build()
        .await
        .unwrap();

    let result = db.filter(fixtures::near_roads(100.0)).await.unwrap();
    assert_eq!(result.backend, BackendKind::GenericVector);
    assert_eq!(result.len(), 5);
}

#[tokio::test]
async fn serial_backends_get_one_connection() {
    let mut builder = Db::builder();
    builder
        .driver(Memory::new())
        .driver(Memory::generic_vector())
        .config(EngineConfig::new().pool(PoolConfig::new().max_size(8)));
    let db = builder.build().await.unwrap();

    assert_eq!(db.max_connections(BackendKind::GenericVector), Some(1));
    assert_eq!(db.max_connections(BackendKind::InMemory), Some(8));
    assert_eq!(db.max_connections(BackendKind::Postgresql), None);
}

#[tokio::test]
async fn unknown_dataset_is_rejected_at_submit() {
    let mut builder = Db::builder();
    for dataset in fixtures::datasets(BackendKind::InMemory) {
        builder.dataset(dataset);
    }
    let db = builder.driver(Memory::new()).build().await.unwrap();

    let err = db.submit(FilterRequest::new("rivers")).unwrap_err();
    assert!(err.is_invalid_request(), "{err}");

    // Nothing of the batch is queued when one request is bad.
    let err = db
        .submit_all([FilterRequest::new("parcels"), FilterRequest::new("rivers")])
        .unwrap_err();
    assert!(err.is_invalid_request(), "{err}");
}
