use crate::{fixtures, DriverHandle, LoggingDriver};

use geosieve::{BackendKind, Db, EngineConfig};
use geosieve_driver_memory::Memory;

/// An engine over the fixture city on one in-process backend.
pub struct World {
    pub db: Db,

    /// The backend's data. Shared with the engine's driver.
    pub memory: Memory,

    pub driver: DriverHandle,
}

impl World {
    pub async fn new(backend: BackendKind) -> World {
        World::with_config(backend, EngineConfig::new()).await
    }

    pub async fn with_config(backend: BackendKind, config: EngineConfig) -> World {
        let memory = memory_for(backend);
        fixtures::load(&memory);

        let driver = LoggingDriver::new(memory.clone());
        let handle = driver.handle();

        let mut builder = Db::builder();
        for dataset in fixtures::datasets(backend) {
            builder.dataset(dataset);
        }
        let db = builder.driver(driver).config(config).build().await.unwrap();

        World {
            db,
            memory,
            driver: handle,
        }
    }
}

/// A fresh in-process backend of the given kind.
pub fn memory_for(backend: BackendKind) -> Memory {
    match backend {
        BackendKind::InMemory => Memory::new(),
        BackendKind::GenericVector => Memory::generic_vector(),
        backend => panic!("{backend} needs an external service"),
    }
}
