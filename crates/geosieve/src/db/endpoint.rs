use super::{Pool, PoolConfig};
use crate::{
    config::{BreakerConfig, RetryConfig},
    resilience::{backoff, BreakerState, CircuitBreaker},
};

use geosieve_core::{
    driver::{BackendKind, Capability, Driver, Operation, Response},
    Error, Result, Schema,
};

use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One backend as the engine sees it: a connection pool behind a circuit
/// breaker, with bounded retries of transient failures.
#[derive(Debug)]
pub(crate) struct Endpoint {
    pool: Pool,
    breaker: CircuitBreaker,
    retry: RetryConfig,

    /// Held for a whole job on backends that cannot run jobs in parallel.
    job_lock: Option<Arc<Mutex<()>>>,
}

impl Endpoint {
    pub(crate) fn new(
        driver: Box<dyn Driver>,
        pool: &PoolConfig,
        breaker: BreakerConfig,
        retry: RetryConfig,
    ) -> Result<Endpoint> {
        let pool = Pool::new(driver, pool)?;
        let capability = pool.capability();

        Ok(Endpoint {
            breaker: CircuitBreaker::new(capability.kind, breaker),
            retry,
            job_lock: (!capability.parallel_execution).then(|| Arc::new(Mutex::new(()))),
            pool,
        })
    }

    pub(crate) fn capability(&self) -> &'static Capability {
        self.pool.capability()
    }

    pub(crate) fn kind(&self) -> BackendKind {
        self.capability().kind
    }

    /// Serializes jobs on backends without parallel execution. Returns `None`
    /// when jobs may run concurrently.
    pub(crate) async fn lock_job(&self) -> Option<OwnedMutexGuard<()>> {
        match &self.job_lock {
            Some(lock) => Some(lock.clone().lock_owned().await),
            None => None,
        }
    }

    pub(crate) fn breaker_state(&self) -> BreakerState {
        self.breaker.state()
    }

    /// Runs `op` on a pooled connection.
    ///
    /// Transient failures are retried with backoff. Once the retries are
    /// used up, or while the breaker is open, the backend is reported
    /// unavailable.
    pub(crate) async fn exec(&self, schema: &Arc<Schema>, op: Operation) -> Result<Response> {
        let mut attempt = 0;

        loop {
            let permit = self.breaker.permit()?;

            let res = match self.pool.get().await {
                Ok(mut conn) => conn.exec(schema, op.clone()).await,
                Err(err) => Err(err),
            };

            match res {
                Ok(response) => {
                    permit.success();
                    return Ok(response);
                }
                Err(err) if err.is_transient() => {
                    permit.failure();

                    if attempt >= self.retry.max_retries {
                        return Err(err.context(Error::backend_unavailable(
                            self.kind(),
                            format!("gave up after {} attempt(s)", attempt + 1),
                        )));
                    }

                    let delay = backoff(&self.retry, attempt);
                    tracing::debug!(
                        backend = %self.kind(),
                        op = op.name(),
                        attempt,
                        ?delay,
                        error = %err,
                        "Retrying backend call"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    // The backend answered; the request itself was bad.
                    permit.success();
                    return Err(err);
                }
            }
        }
    }

    /// Pings the backend on a pooled connection.
    pub(crate) async fn health_check(&self) -> bool {
        let Ok(mut conn) = self.pool.get().await else {
            return false;
        };
        conn.ping().await.is_ok()
    }

    pub(crate) fn max_connections(&self) -> usize {
        self.pool.max_size()
    }
}
