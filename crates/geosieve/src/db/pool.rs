//! Connection pooling for backend connections.

use std::ops::{Deref, DerefMut};

pub use deadpool::managed::Timeouts;
use geosieve_core::{
    driver::{Capability, Driver},
    Connection, Error, Result,
};

/// Get the default maximum size of a pool, which is `cpu_core_count * 2`
/// including logical cores (Hyper-Threading).
fn get_default_pool_max_size() -> usize {
    deadpool::managed::PoolConfig::default().max_size
}

/// Configuration for connection pool behavior.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_size: usize,
    pub timeouts: Timeouts,
}

impl PoolConfig {
    /// Creates a new pool configuration with default settings.
    pub fn new() -> Self {
        Self {
            max_size: get_default_pool_max_size(),
            timeouts: Default::default(),
        }
    }

    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// A connection pool for one backend.
///
/// Connections are opened lazily, so building a pool never touches the
/// backend.
#[derive(Debug)]
pub(crate) struct Pool {
    inner: deadpool::managed::Pool<Manager>,
    capability: &'static Capability,
}

impl Pool {
    /// Creates a new connection pool from the given driver.
    ///
    /// The pool holds at most `config.max_size` connections, fewer when the
    /// driver has a lower limit, and exactly one when the backend does not
    /// support parallel execution.
    pub(crate) fn new(driver: Box<dyn Driver>, config: &PoolConfig) -> Result<Self> {
        let capability = driver.capability();

        let mut max_size = config.max_size.max(1);
        if let Some(max_connections) = driver.max_connections() {
            max_size = max_size.min(max_connections.max(1));
        }
        if !capability.parallel_execution {
            max_size = 1;
        }

        let inner = deadpool::managed::Pool::builder(Manager { driver })
            .runtime(deadpool::Runtime::Tokio1)
            .max_size(max_size)
            .timeouts(config.timeouts)
            .build()
            .map_err(Error::connection_pool)?;

        Ok(Self { inner, capability })
    }

    /// Retrieves a connection from the pool.
    pub(crate) async fn get(&self) -> Result<PoolConnection> {
        let connection = self.inner.get().await.map_err(Error::connection_pool)?;
        Ok(PoolConnection { inner: connection })
    }

    /// Returns the backend's capabilities.
    pub(crate) fn capability(&self) -> &'static Capability {
        self.capability
    }

    pub(crate) fn max_size(&self) -> usize {
        self.inner.status().max_size
    }
}

#[derive(Debug)]
struct Manager {
    driver: Box<dyn Driver>,
}

impl deadpool::managed::Manager for Manager {
    type Type = Box<dyn Connection>;
    type Error = Error;

    async fn create(&self) -> std::result::Result<Self::Type, Self::Error> {
        self.driver.connect().await
    }

    async fn recycle(
        &self,
        obj: &mut Self::Type,
        _metrics: &deadpool::managed::Metrics,
    ) -> deadpool::managed::RecycleResult<Self::Error> {
        obj.ping()
            .await
            .map_err(deadpool::managed::RecycleError::Backend)
    }
}

/// A connection retrieved from a pool.
///
/// When dropped, the connection is returned to the pool for reuse.
pub(crate) struct PoolConnection {
    inner: deadpool::managed::Object<Manager>,
}

impl Deref for PoolConnection {
    type Target = Box<dyn Connection>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for PoolConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}
