mod capability;
pub use capability::{
    ArtifactKind, BackendKind, CanonicalFn, Capability, CastSyntax, Dialect, NativeFn, Registry,
    SpatialIndex, TypeNames,
};

mod response;
pub use response::{DatasetStats, Response, Rows};

pub mod operation;
pub use operation::Operation;

use crate::{async_trait, schema::Schema, Result};

use std::{fmt::Debug, sync::Arc};

/// Entry point for a backend. Produces connections on demand.
#[async_trait]
pub trait Driver: Debug + Send + Sync + 'static {
    /// Describes what the backend can do, which informs strategy selection
    /// and translation.
    fn capability(&self) -> &'static Capability;

    /// Open a new connection to the backend.
    async fn connect(&self) -> Result<Box<dyn Connection>>;

    /// Upper bound on simultaneous connections, if the backend has one.
    fn max_connections(&self) -> Option<usize> {
        None
    }
}

/// A single connection to a backend. All native work goes through here.
#[async_trait]
pub trait Connection: Debug + Send + 'static {
    fn capability(&self) -> &'static Capability;

    /// Execute a backend operation.
    async fn exec(&mut self, schema: &Arc<Schema>, op: Operation) -> Result<Response>;

    /// Cheap round trip used by the pool's health check.
    async fn ping(&mut self) -> Result<()>;
}
