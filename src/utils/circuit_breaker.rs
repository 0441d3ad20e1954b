use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::metrics::Metrics;

// ============================================================================
// Circuit Breaker Pattern Implementation
// ============================================================================
//
// Prevents cascading failures by tracking the outcome of recent calls and
// temporarily blocking requests when a dependency is unhealthy.
//
// States:
// - Closed: Normal operation, outcomes recorded in a sliding window
// - Open: Failure rate crossed the threshold, requests blocked immediately
// - HalfOpen: Cool-down elapsed, a limited number of trial calls allowed
//
// Time comes from an injectable `Clock` so the state machine can be driven
// deterministically in tests.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,     // Normal operation
    Open,       // Blocking requests
    HalfOpen,   // Testing recovery
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "Closed",
            CircuitState::Open => "Open",
            CircuitState::HalfOpen => "HalfOpen",
        }
    }

    /// Gauge encoding used by the metrics registry
    pub fn as_gauge(&self) -> i64 {
        match self {
            CircuitState::Closed => 0,
            CircuitState::Open => 1,
            CircuitState::HalfOpen => 2,
        }
    }
}

/// Source of monotonic time for the breaker
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Clone, Debug)]
pub struct CircuitBreakerConfig {
    /// Failure rate (0.0..=1.0) at or above which the circuit opens
    pub failure_rate_threshold: f64,
    /// Number of most recent outcomes kept in the sliding window
    pub window_size: usize,
    /// Outcomes required in the window before the rate is evaluated
    pub minimum_calls: usize,
    /// Time to wait in Open before attempting recovery
    pub timeout: Duration,
    /// Successful trial calls needed to close from half-open; also caps
    /// concurrent trial calls
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_rate_threshold: 0.5,
            window_size: 10,
            minimum_calls: 5,
            timeout: Duration::from_secs(30),
            success_threshold: 1,
        }
    }
}

#[derive(Clone)]
pub struct CircuitBreaker {
    name: Arc<str>,
    state: Arc<Mutex<CircuitBreakerState>>,
    /// Half-open trial calls admitted and not yet finished. Released by
    /// `TrialSlot::drop`, so a cancelled call still frees its slot.
    trials_in_flight: Arc<AtomicU32>,
    config: CircuitBreakerConfig,
    clock: Arc<dyn Clock>,
    metrics: Option<Arc<Metrics>>,
}

struct CircuitBreakerState {
    state: CircuitState,
    /// `true` marks a failure
    outcomes: VecDeque<bool>,
    success_count: u32,
    opened_at: Option<Instant>,
}

impl CircuitBreakerState {
    fn failure_count(&self) -> u32 {
        self.outcomes.iter().filter(|failed| **failed).count() as u32
    }
}

/// Which admission a call was granted; outcomes only count against the
/// state they were admitted under.
enum Permit {
    Normal,
    Trial(TrialSlot),
}

/// Holds one half-open trial slot until dropped
struct TrialSlot(Arc<AtomicU32>);

impl Drop for TrialSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl CircuitBreaker {
    pub fn new(name: impl Into<Arc<str>>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(CircuitBreakerState {
                state: CircuitState::Closed,
                outcomes: VecDeque::with_capacity(config.window_size),
                success_count: 0,
                opened_at: None,
            })),
            trials_in_flight: Arc::new(AtomicU32::new(0)),
            config,
            clock: Arc::new(SystemClock),
            metrics: None,
        }
    }

    #[cfg(test)]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_metrics(self, metrics: Arc<Metrics>) -> Self {
        metrics.update_circuit_breaker_state(&self.name, CircuitState::Closed.as_gauge());
        Self {
            metrics: Some(metrics),
            ..self
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Execute an operation with circuit breaker protection.
    /// Every error counts as a failure.
    #[cfg(test)]
    pub async fn call<F, T, E>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: std::future::Future<Output = Result<T, E>>,
    {
        self.call_filtered(operation, |_| true).await
    }

    /// Execute an operation with circuit breaker protection, recording an
    /// error as a failure only when `is_failure` says so. Errors that are not
    /// failures are still returned to the caller but count as a healthy call.
    pub async fn call_filtered<F, T, E, P>(
        &self,
        operation: F,
        is_failure: P,
    ) -> Result<T, CircuitBreakerError<E>>
    where
        F: std::future::Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
    {
        let permit = self.acquire().await.ok_or(CircuitBreakerError::CircuitOpen)?;

        match operation.await {
            Ok(result) => {
                self.record(permit, false).await;
                Ok(result)
            }
            Err(err) => {
                self.record(permit, is_failure(&err)).await;
                Err(CircuitBreakerError::OperationFailed(err))
            }
        }
    }

    /// Admission check; `None` means the call is short-circuited
    async fn acquire(&self) -> Option<Permit> {
        let mut state = self.state.lock().await;

        if state.state == CircuitState::Open {
            let elapsed = state
                .opened_at
                .map(|opened| self.clock.now().saturating_duration_since(opened))
                .unwrap_or_default();

            if elapsed < self.config.timeout {
                return None;
            }

            self.transition(&mut state, CircuitState::HalfOpen);
        }

        match state.state {
            CircuitState::Closed => Some(Permit::Normal),
            CircuitState::HalfOpen => {
                // Admission is serialized by the state lock
                if self.trials_in_flight.load(Ordering::SeqCst) >= self.config.success_threshold.max(1) {
                    return None;
                }
                self.trials_in_flight.fetch_add(1, Ordering::SeqCst);
                Some(Permit::Trial(TrialSlot(self.trials_in_flight.clone())))
            }
            CircuitState::Open => None,
        }
    }

    async fn record(&self, permit: Permit, failed: bool) {
        let mut state = self.state.lock().await;

        match (state.state, &permit) {
            (CircuitState::Closed, Permit::Normal) => {
                state.outcomes.push_back(failed);
                while state.outcomes.len() > self.config.window_size {
                    state.outcomes.pop_front();
                }

                let recorded = state.outcomes.len();
                if failed && recorded >= self.config.minimum_calls {
                    let failure_rate = state.failure_count() as f64 / recorded as f64;
                    if failure_rate >= self.config.failure_rate_threshold {
                        tracing::warn!(
                            breaker = %self.name,
                            failures = state.failure_count(),
                            window = recorded,
                            "Circuit breaker opening, failure rate {:.0}%",
                            failure_rate * 100.0
                        );
                        self.transition(&mut state, CircuitState::Open);
                    }
                }
            }
            (CircuitState::HalfOpen, Permit::Trial(_)) => {
                if failed {
                    tracing::warn!(breaker = %self.name, "Failure during half-open, reopening circuit");
                    self.transition(&mut state, CircuitState::Open);
                } else {
                    state.success_count += 1;
                    if state.success_count >= self.config.success_threshold {
                        tracing::info!(
                            breaker = %self.name,
                            "Circuit breaker closing after {} successful trial calls",
                            state.success_count
                        );
                        self.transition(&mut state, CircuitState::Closed);
                    }
                }
            }
            _ => {
                // Outcome of a call admitted under a state that has since changed
                tracing::debug!(breaker = %self.name, "Ignoring stale call outcome");
            }
        }
    }

    fn transition(&self, state: &mut CircuitBreakerState, to: CircuitState) {
        let from = state.state;
        if from == to {
            return;
        }

        match to {
            CircuitState::Open => {
                state.opened_at = Some(self.clock.now());
                state.success_count = 0;
            }
            CircuitState::HalfOpen => {
                tracing::info!(breaker = %self.name, "Circuit breaker transitioning to HalfOpen");
                state.success_count = 0;
            }
            CircuitState::Closed => {
                state.outcomes.clear();
                state.success_count = 0;
                state.opened_at = None;
            }
        }
        state.state = to;

        if let Some(metrics) = &self.metrics {
            metrics.record_circuit_breaker_transition(&self.name, from.as_str(), to.as_str());
            metrics.update_circuit_breaker_state(&self.name, to.as_gauge());
        }
    }

    pub async fn get_state(&self) -> CircuitState {
        let state = self.state.lock().await;
        state.state
    }

    /// Failures currently in the sliding window
    pub async fn get_failure_count(&self) -> u32 {
        let state = self.state.lock().await;
        state.failure_count()
    }
}

#[derive(Debug)]
pub enum CircuitBreakerError<E> {
    CircuitOpen,
    OperationFailed(E),
}

impl<E: std::fmt::Display> std::fmt::Display for CircuitBreakerError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitBreakerError::CircuitOpen => write!(f, "Circuit breaker is open"),
            CircuitBreakerError::OperationFailed(e) => write!(f, "Operation failed: {}", e),
        }
    }
}

impl<E: std::error::Error> std::error::Error for CircuitBreakerError<E> {}

/// Clock that only moves when told to
#[cfg(test)]
#[derive(Clone)]
pub struct ManualClock {
    origin: Instant,
    offset: Arc<std::sync::Mutex<Duration>>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Arc::new(std::sync::Mutex::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock().unwrap() += by;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.offset.lock().unwrap()
    }
}
