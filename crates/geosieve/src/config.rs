//! Engine tuning knobs.
//!
//! Every struct here has public fields, a `new()` returning the defaults and
//! chained setters for the fields callers usually change.

use crate::db::PoolConfig;

use std::time::Duration;

/// Configuration of the filter engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Datasets with at most this many rows are always filtered with a single
    /// direct query.
    pub small_dataset_threshold: u64,

    /// Datasets above this many rows are filtered in two phases (bounding box
    /// candidates, then the exact test) when the predicate allows it.
    pub two_phase_threshold: u64,

    /// Rows per page of a progressive scan.
    pub chunk_size: usize,

    /// Candidate ids per exact query in the second phase of a two-phase
    /// filter.
    pub candidate_batch: usize,

    /// Jobs running at once, across all datasets.
    pub max_workers: usize,

    /// Deadline of a job without its own timeout.
    pub default_timeout: Duration,

    /// How long an unused artifact stays live.
    pub artifact_ttl: Duration,

    /// Period of the background artifact sweep.
    pub sweep_interval: Duration,

    /// Snapshots kept per history ring.
    pub history_depth: usize,

    pub cache: CacheConfig,

    pub breaker: BreakerConfig,

    pub retry: RetryConfig,

    pub pool: PoolConfig,
}

/// Capacity and lifetime of the three cache tiers.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Filter AST to native predicate text
    pub expressions: TierConfig,

    /// Reference WKT to normalized WKT
    pub geometries: TierConfig,

    /// Filter request to matching ids
    pub queries: TierConfig,
}

#[derive(Debug, Clone, Copy)]
pub struct TierConfig {
    /// Maximum entries. Zero disables the tier.
    pub capacity: usize,

    pub ttl: Duration,
}

/// Circuit breaker policy, applied per backend endpoint.
#[derive(Debug, Clone, Copy)]
pub struct BreakerConfig {
    /// Consecutive failures that open the breaker.
    pub failure_threshold: u32,

    /// Failures further apart than this do not count as consecutive.
    pub failure_window: Duration,

    /// Time the breaker stays open before letting a trial call through.
    pub cooldown: Duration,
}

/// Retry policy for transient backend failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_retries: u32,

    /// Delay before the first retry. Doubles on every further attempt.
    pub base_delay: Duration,

    pub max_delay: Duration,
}

impl EngineConfig {
    pub fn new() -> EngineConfig {
        EngineConfig {
            small_dataset_threshold: 10_000,
            two_phase_threshold: 1_000_000,
            chunk_size: 5_000,
            candidate_batch: 1_000,
            max_workers: 4,
            default_timeout: Duration::from_secs(60),
            artifact_ttl: Duration::from_secs(600),
            sweep_interval: Duration::from_secs(30),
            history_depth: 100,
            cache: CacheConfig::new(),
            breaker: BreakerConfig::new(),
            retry: RetryConfig::new(),
            pool: PoolConfig::new(),
        }
    }

    pub fn small_dataset_threshold(mut self, rows: u64) -> Self {
        self.small_dataset_threshold = rows;
        self
    }

    pub fn two_phase_threshold(mut self, rows: u64) -> Self {
        self.two_phase_threshold = rows;
        self
    }

    pub fn chunk_size(mut self, rows: usize) -> Self {
        self.chunk_size = rows;
        self
    }

    pub fn candidate_batch(mut self, ids: usize) -> Self {
        self.candidate_batch = ids;
        self
    }

    pub fn max_workers(mut self, workers: usize) -> Self {
        self.max_workers = workers;
        self
    }

    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn artifact_ttl(mut self, ttl: Duration) -> Self {
        self.artifact_ttl = ttl;
        self
    }

    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn history_depth(mut self, depth: usize) -> Self {
        self.history_depth = depth;
        self
    }

    pub fn cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn breaker(mut self, breaker: BreakerConfig) -> Self {
        self.breaker = breaker;
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheConfig {
    pub fn new() -> CacheConfig {
        CacheConfig {
            expressions: TierConfig::new(512, Duration::from_secs(600)),
            geometries: TierConfig::new(256, Duration::from_secs(600)),
            queries: TierConfig::new(128, Duration::from_secs(300)),
        }
    }

    /// Every tier off. Results are unchanged, only slower.
    pub fn disabled() -> CacheConfig {
        let off = TierConfig::new(0, Duration::ZERO);
        CacheConfig {
            expressions: off,
            geometries: off,
            queries: off,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TierConfig {
    pub fn new(capacity: usize, ttl: Duration) -> TierConfig {
        TierConfig { capacity, ttl }
    }
}

impl BreakerConfig {
    pub fn new() -> BreakerConfig {
        BreakerConfig {
            failure_threshold: 5,
            failure_window: Duration::from_secs(30),
            cooldown: Duration::from_secs(10),
        }
    }

    pub fn failure_threshold(mut self, failures: u32) -> Self {
        self.failure_threshold = failures;
        self
    }

    pub fn cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryConfig {
    pub fn new() -> RetryConfig {
        RetryConfig {
            max_retries: 3,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(2),
        }
    }

    /// No retries: the first transient failure surfaces.
    pub fn none() -> RetryConfig {
        RetryConfig {
            max_retries: 0,
            ..RetryConfig::new()
        }
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new()
    }
}
