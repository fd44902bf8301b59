use crate::config::BreakerConfig;

use geosieve_core::{driver::BackendKind, Error, Result};

use std::{
    sync::{Mutex, PoisonError},
    time::Instant,
};

/// Stops calls to a failing backend.
///
/// Closed, every call goes through. After `failure_threshold` consecutive
/// failures within `failure_window` the breaker opens and calls fail fast
/// with a backend unavailable error. Once `cooldown` elapses, a single trial
/// call is let through; its outcome closes or re-opens the breaker.
#[derive(Debug)]
pub(crate) struct CircuitBreaker {
    backend: BackendKind,
    config: BreakerConfig,
    state: Mutex<State>,
}

/// Observable state of a backend's circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
enum State {
    Closed {
        failures: u32,
        first_failure: Option<Instant>,
    },
    Open {
        until: Instant,
    },
    HalfOpen {
        /// A trial call is in flight
        probing: bool,
    },
}

/// Permission to make one call. Report the outcome with
/// [`success`](Permit::success) or [`failure`](Permit::failure); dropping the
/// permit unreported counts as neither.
#[derive(Debug)]
pub(crate) struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    probe: bool,
    reported: bool,
}

impl CircuitBreaker {
    pub(crate) fn new(backend: BackendKind, config: BreakerConfig) -> CircuitBreaker {
        CircuitBreaker {
            backend,
            config,
            state: Mutex::new(State::Closed {
                failures: 0,
                first_failure: None,
            }),
        }
    }

    pub(crate) fn state(&self) -> BreakerState {
        match &*self.lock() {
            State::Closed { .. } => BreakerState::Closed,
            State::Open { until } if Instant::now() < *until => BreakerState::Open,
            State::Open { .. } | State::HalfOpen { .. } => BreakerState::HalfOpen,
        }
    }

    pub(crate) fn permit(&self) -> Result<Permit<'_>> {
        let mut state = self.lock();
        let probe = match &mut *state {
            State::Closed { .. } => false,
            State::Open { until } => {
                if Instant::now() < *until {
                    return Err(Error::backend_unavailable(self.backend, "circuit open"));
                }
                tracing::info!(backend = %self.backend, "Circuit half-open, sending trial call");
                *state = State::HalfOpen { probing: true };
                true
            }
            State::HalfOpen { probing } => {
                if *probing {
                    return Err(Error::backend_unavailable(
                        self.backend,
                        "circuit half-open, trial call in flight",
                    ));
                }
                *probing = true;
                true
            }
        };

        Ok(Permit {
            breaker: self,
            probe,
            reported: false,
        })
    }

    fn on_success(&self, probe: bool) {
        let mut state = self.lock();
        if probe {
            tracing::info!(backend = %self.backend, "Circuit closed");
        }
        *state = State::Closed {
            failures: 0,
            first_failure: None,
        };
    }

    fn on_failure(&self, probe: bool) {
        let mut state = self.lock();
        let now = Instant::now();

        match &mut *state {
            State::Closed {
                failures,
                first_failure,
            } if !probe => {
                match first_failure {
                    Some(first) if now.duration_since(*first) <= self.config.failure_window => {
                        *failures += 1;
                    }
                    _ => {
                        *failures = 1;
                        *first_failure = Some(now);
                    }
                }

                if *failures >= self.config.failure_threshold {
                    tracing::warn!(
                        backend = %self.backend,
                        failures = *failures,
                        cooldown = ?self.config.cooldown,
                        "Circuit opened"
                    );
                    *state = State::Open {
                        until: now + self.config.cooldown,
                    };
                }
            }
            State::HalfOpen { .. } if probe => {
                tracing::warn!(backend = %self.backend, "Trial call failed, circuit re-opened");
                *state = State::Open {
                    until: now + self.config.cooldown,
                };
            }
            // A call admitted before the breaker changed state
            _ => {}
        }
    }

    fn on_abandoned(&self, probe: bool) {
        if !probe {
            return;
        }
        if let State::HalfOpen { probing } = &mut *self.lock() {
            *probing = false;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Permit<'_> {
    pub(crate) fn success(mut self) {
        self.reported = true;
        self.breaker.on_success(self.probe);
    }

    pub(crate) fn failure(mut self) {
        self.reported = true;
        self.breaker.on_failure(self.probe);
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if !self.reported {
            self.breaker.on_abandoned(self.probe);
        }
    }
}
