use geosieve::{
    driver::{Capability, DatasetStats, Driver, Operation, Response},
    DatasetId, Error, Result, Schema,
};
use geosieve_core::{async_trait, Connection};

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use crate::ExecLog;

/// A driver wrapper that logs every operation and can be told to slow
/// down, fail, or misreport dataset sizes.
#[derive(Debug)]
pub struct LoggingDriver {
    inner: Box<dyn Driver>,
    shared: Arc<Shared>,
}

/// Test-side controls of a [`LoggingDriver`], usable after the driver was
/// handed to the engine.
#[derive(Debug, Clone)]
pub struct DriverHandle {
    shared: Arc<Shared>,
}

#[derive(Debug, Default)]
struct Shared {
    /// Log of all operations executed through this driver
    ops: Arc<Mutex<Vec<DriverOp>>>,

    /// Added before every operation
    delay: Mutex<Duration>,

    /// Every operation fails with a transient error while set
    unavailable: AtomicBool,

    /// Queries fail the way a backend rejects a bad statement while set
    reject_queries: AtomicBool,

    /// Row counts reported instead of the real ones
    row_counts: Mutex<HashMap<DatasetId, u64>>,

    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

#[derive(Debug, Clone)]
pub struct DriverOp {
    pub operation: Operation,

    /// Whether the operation returned an error
    pub failed: bool,
}

impl LoggingDriver {
    pub fn new(driver: impl Driver) -> Self {
        Self {
            inner: Box::new(driver),
            shared: Arc::default(),
        }
    }

    pub fn handle(&self) -> DriverHandle {
        DriverHandle {
            shared: self.shared.clone(),
        }
    }
}

impl DriverHandle {
    pub fn log(&self) -> ExecLog {
        ExecLog::new(self.shared.ops.clone())
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.shared.delay.lock().unwrap() = delay;
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.shared.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn reject_queries(&self, reject: bool) {
        self.shared.reject_queries.store(reject, Ordering::SeqCst);
    }

    /// Makes statistics report `rows` for `dataset`, so plans for large
    /// datasets can be exercised on small fixtures.
    pub fn report_rows(&self, dataset: impl Into<DatasetId>, rows: u64) {
        self.shared
            .row_counts
            .lock()
            .unwrap()
            .insert(dataset.into(), rows);
    }

    /// Most operations that were ever executing at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.shared.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Driver for LoggingDriver {
    fn capability(&self) -> &'static Capability {
        self.inner.capability()
    }

    async fn connect(&self) -> Result<Box<dyn Connection>> {
        Ok(Box::new(LoggingConnection {
            inner: self.inner.connect().await?,
            shared: self.shared.clone(),
        }))
    }

    fn max_connections(&self) -> Option<usize> {
        self.inner.max_connections()
    }
}

#[derive(Debug)]
pub struct LoggingConnection {
    /// The underlying connection that actually executes operations
    inner: Box<dyn Connection>,
    shared: Arc<Shared>,
}

impl LoggingConnection {
    async fn exec_inner(&mut self, schema: &Arc<Schema>, operation: Operation) -> Result<Response> {
        let delay = *self.shared.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.shared.unavailable.load(Ordering::SeqCst) {
            return Err(Error::driver_connection_failed(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "backend offline",
            )));
        }

        if self.shared.reject_queries.load(Ordering::SeqCst)
            && matches!(operation, Operation::QueryFilter(_) | Operation::QuerySql(_))
        {
            return Err(Error::driver_operation_failed(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "no such column: x",
            )));
        }

        if let Operation::Stats(op) = &operation {
            if let Some(row_count) = self.shared.row_counts.lock().unwrap().get(&op.dataset) {
                return Ok(Response::stats(DatasetStats {
                    row_count: *row_count,
                }));
            }
        }

        self.inner.exec(schema, operation).await
    }
}

/// Decrements the in-flight count, including when the call is dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Connection for LoggingConnection {
    fn capability(&self) -> &'static Capability {
        self.inner.capability()
    }

    async fn exec(&mut self, schema: &Arc<Schema>, operation: Operation) -> Result<Response> {
        let shared = self.shared.clone();
        let now = shared.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        shared.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _in_flight = InFlight(&shared.in_flight);

        let res = self.exec_inner(schema, operation.clone()).await;

        shared.ops.lock().unwrap().push(DriverOp {
            operation,
            failed: res.is_err(),
        });
        res
    }

    async fn ping(&mut self) -> Result<()> {
        if self.shared.unavailable.load(Ordering::SeqCst) {
            return Err(Error::driver_connection_failed(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "backend offline",
            )));
        }
        self.inner.ping().await
    }
}
