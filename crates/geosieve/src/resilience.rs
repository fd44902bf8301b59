mod breaker;
pub use breaker::BreakerState;
pub(crate) use breaker::CircuitBreaker;

mod retry;
pub(crate) use retry::backoff;
