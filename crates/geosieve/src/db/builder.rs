use super::{Db, Endpoint, Shared};
use crate::{config::EngineConfig, engine::Engine, task::Orchestrator};

use geosieve_core::{
    driver::{BackendKind, Capability, Driver, Registry},
    schema::Dataset,
    Error, Result, Schema,
};

use indexmap::IndexMap;
use std::{sync::Arc, time::Duration};
use tokio::{runtime::Handle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
pub struct Builder {
    datasets: Vec<Dataset>,

    drivers: Vec<Box<dyn Driver>>,

    /// Backend to re-run on when the key backend is unavailable
    fallbacks: IndexMap<BackendKind, BackendKind>,

    registry: Registry,

    config: EngineConfig,
}

impl Default for Builder {
    fn default() -> Self {
        Builder {
            datasets: vec![],
            drivers: vec![],
            fallbacks: IndexMap::new(),
            registry: Registry::builtin(),
            config: EngineConfig::new(),
        }
    }
}

impl Builder {
    pub fn dataset(&mut self, dataset: Dataset) -> &mut Self {
        self.datasets.push(dataset);
        self
    }

    pub fn driver(&mut self, driver: impl Driver) -> &mut Self {
        self.drivers.push(Box::new(driver));
        self
    }

    /// Re-runs jobs of `primary` datasets on `fallback` while `primary` is
    /// unavailable.
    pub fn fallback(&mut self, primary: BackendKind, fallback: BackendKind) -> &mut Self {
        self.fallbacks.insert(primary, fallback);
        self
    }

    /// Replaces the built-in capability descriptor for the backend's kind.
    pub fn register_backend(&mut self, capability: &'static Capability) -> &mut Self {
        self.registry.register(capability);
        self
    }

    pub fn config(&mut self, config: EngineConfig) -> &mut Self {
        self.config = config;
        self
    }

    /// Validates the setup, creates one pooled endpoint per driver and
    /// starts the background sweep. Must be called within a Tokio runtime.
    ///
    /// No backend is contacted: connections are opened on first use.
    pub async fn build(&mut self) -> Result<Db> {
        let mut endpoints = IndexMap::new();

        for driver in std::mem::take(&mut self.drivers) {
            let kind = driver.capability().kind;
            self.registry.capabilities_for(kind)?;

            if endpoints.contains_key(&kind) {
                return Err(Error::invalid_request(format!(
                    "more than one driver for backend {kind}"
                )));
            }

            let endpoint = Endpoint::new(
                driver,
                &self.config.pool,
                self.config.breaker,
                self.config.retry,
            )?;
            tracing::debug!(
                backend = %kind,
                max_connections = endpoint.max_connections(),
                "Backend registered"
            );
            endpoints.insert(kind, Arc::new(endpoint));
        }

        for (primary, fallback) in &self.fallbacks {
            if primary == fallback {
                return Err(Error::invalid_request(format!(
                    "backend {primary} cannot fall back to itself"
                )));
            }
            if !endpoints.contains_key(fallback) {
                return Err(Error::invalid_request(format!(
                    "fallback backend {fallback} has no driver"
                )));
            }
        }

        for dataset in &self.datasets {
            self.registry.capabilities_for(dataset.backend)?;

            if !endpoints.contains_key(&dataset.backend)
                && !self.fallbacks.contains_key(&dataset.backend)
            {
                return Err(Error::invalid_request(format!(
                    "dataset {} uses backend {}, which has no driver",
                    dataset.id, dataset.backend
                )));
            }
        }

        let schema = Arc::new(Schema::new(std::mem::take(&mut self.datasets)));
        let engine = Arc::new(Engine::new(
            schema,
            Arc::new(self.registry.clone()),
            self.config.clone(),
            endpoints,
            std::mem::take(&mut self.fallbacks),
        ));

        let runtime = Handle::current();
        let sweeper = CancellationToken::new();
        runtime.spawn(sweep(
            engine.clone(),
            self.config.sweep_interval,
            sweeper.clone(),
        ));

        Ok(Db {
            shared: Arc::new(Shared {
                orchestrator: Orchestrator::new(engine.clone(), runtime),
                engine,
                _sweeper: sweeper.drop_guard(),
            }),
        })
    }
}

/// Drops expired, stale and orphaned artifacts every `period` until
/// cancelled.
async fn sweep(engine: Arc<Engine>, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period.max(Duration::from_millis(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                engine.sweep().await;
            }
        }
    }
}
