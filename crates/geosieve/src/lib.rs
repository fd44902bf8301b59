mod artifact;
pub use artifact::Artifact;

mod buffer;
pub use buffer::BufferState;

mod cache;

mod chain;

pub mod config;
pub use config::{BreakerConfig, CacheConfig, EngineConfig, RetryConfig, TierConfig};

pub mod db;
pub use db::{BreakerState, Db, PoolConfig};

mod engine;

mod geometry;

mod history;
pub use history::{HistoryEntry, HistorySnapshot, Scope};

mod resilience;

mod result;
pub use result::{ResultSet, StrategyPlan};

mod task;
pub use task::{TaskHandle, TaskId, TaskState};

pub use geosieve_core::{
    driver::{self, BackendKind, Capability, Driver},
    schema::{self, Dataset, DatasetId, Schema},
    stmt::{self, CombineOp, FilterRequest, GeometryRef, SpatialPredicate, SpatialRelation},
    Error, Result,
};

/// What changed about a dataset, as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Features were added, removed or edited
    Content,

    /// Columns, CRS or the table itself changed
    Structure,
}
