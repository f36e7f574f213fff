// ABOUTME: Circuit breaker guarding every food source call
// ABOUTME: Fails fast while a source is down instead of spending the batch deadline on it
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::future::Future;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use nutrition_core::constants::limits::{BREAKER_FAILURE_THRESHOLD, BREAKER_RECOVERY_SECS};
use nutrition_core::errors::SourceError;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Calls pass through; consecutive failures are counted
    Closed,
    /// Calls fail immediately without I/O
    Open,
    /// One probe call is in flight after the cool-down
    HalfOpen,
}

impl CircuitState {
    const fn from_u32(value: u32) -> Self {
        match value {
            0 => Self::Closed,
            1 => Self::Open,
            _ => Self::HalfOpen,
        }
    }

    const fn to_u32(self) -> u32 {
        match self {
            Self::Closed => 0,
            Self::Open => 1,
            Self::HalfOpen => 2,
        }
    }
}

/// Thresholds and cool-down for a breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive retryable failures before opening
    pub failure_threshold: u32,
    /// Time spent open before a half-open probe is allowed
    pub recovery_timeout: Duration,
    /// Successful probes required to close again
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: BREAKER_FAILURE_THRESHOLD,
            recovery_timeout: Duration::from_secs(BREAKER_RECOVERY_SECS),
            success_threshold: 1,
        }
    }
}

impl CircuitBreakerConfig {
    /// Create a breaker configuration
    #[must_use]
    pub const fn new(
        failure_threshold: u32,
        recovery_timeout: Duration,
        success_threshold: u32,
    ) -> Self {
        Self {
            failure_threshold,
            recovery_timeout,
            success_threshold,
        }
    }
}

/// Point-in-time view of a breaker for health reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BreakerSnapshot {
    /// Current state
    pub state: CircuitState,
    /// Consecutive failures counted while closed
    pub failure_count: u32,
    /// Seconds until a probe is allowed, zero unless open
    pub retry_after_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    Normal,
    Probe,
}

/// Reopens the circuit when a half-open probe is cancelled before it finishes
struct ProbeGuard<'a> {
    breaker: &'a CircuitBreaker,
    armed: bool,
}

impl Drop for ProbeGuard<'_> {
    fn drop(&mut self) {
        if self.armed && self.breaker.state() == CircuitState::HalfOpen {
            self.breaker.open();
            warn!(source = %self.breaker.source_name, "circuit re-opened, probe cancelled");
        }
    }
}

/// Lock-free circuit breaker for one food source
///
/// CLOSED opens after `failure_threshold` consecutive retryable failures.
/// OPEN rejects calls with [`SourceError::CircuitOpen`] until the recovery
/// timeout elapses, then admits a single HALF_OPEN probe. A successful probe
/// closes the circuit; a failed one reopens it.
#[derive(Debug)]
pub struct CircuitBreaker {
    source_name: String,
    state: AtomicU32,
    failure_count: AtomicU32,
    success_count: AtomicU32,
    opened_at_ms: AtomicU64,
    config: CircuitBreakerConfig,
    start_instant: Instant,
}

impl CircuitBreaker {
    /// Create a breaker with the default thresholds
    #[must_use]
    pub fn new(source_name: &str) -> Self {
        Self::with_config(source_name, CircuitBreakerConfig::default())
    }

    /// Create a breaker with explicit thresholds
    #[must_use]
    pub fn with_config(source_name: &str, config: CircuitBreakerConfig) -> Self {
        Self {
            source_name: source_name.to_owned(),
            state: AtomicU32::new(CircuitState::Closed.to_u32()),
            failure_count: AtomicU32::new(0),
            success_count: AtomicU32::new(0),
            opened_at_ms: AtomicU64::new(0),
            config,
            start_instant: Instant::now(),
        }
    }

    /// Name of the guarded source
    #[must_use]
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> CircuitState {
        CircuitState::from_u32(self.state.load(Ordering::SeqCst))
    }

    /// Consecutive failures counted while closed
    #[must_use]
    pub fn failure_count(&self) -> u32 {
        self.failure_count.load(Ordering::SeqCst)
    }

    /// Snapshot for health reporting
    #[must_use]
    pub fn snapshot(&self) -> BreakerSnapshot {
        let state = self.state();
        BreakerSnapshot {
            state,
            failure_count: self.failure_count(),
            retry_after_secs: if state == CircuitState::Open {
                self.time_until_recovery()
            } else {
                0
            },
        }
    }

    /// Whether a call may proceed now
    ///
    /// An open circuit whose cool-down has elapsed moves to half-open and
    /// admits exactly the caller that performed the transition.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        self.admit().is_some()
    }

    fn admit(&self) -> Option<Admission> {
        match self.state() {
            CircuitState::Closed => Some(Admission::Normal),
            CircuitState::Open => self.try_half_open().then_some(Admission::Probe),
            CircuitState::HalfOpen => None,
        }
    }

    fn try_half_open(&self) -> bool {
        let since_open = self
            .elapsed_millis()
            .saturating_sub(self.opened_at_ms.load(Ordering::SeqCst));
        if since_open < self.recovery_millis() {
            return false;
        }
        let transitioned = self
            .state
            .compare_exchange(
                CircuitState::Open.to_u32(),
                CircuitState::HalfOpen.to_u32(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok();
        if transitioned {
            info!(source = %self.source_name, "circuit half-open, probing source");
        }
        transitioned
    }

    fn elapsed_millis(&self) -> u64 {
        u64::try_from(self.start_instant.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn recovery_millis(&self) -> u64 {
        u64::try_from(self.config.recovery_timeout.as_millis()).unwrap_or(u64::MAX)
    }

    /// Record a successful call
    pub fn record_success(&self) {
        match self.state() {
            CircuitState::Closed => self.failure_count.store(0, Ordering::SeqCst),
            CircuitState::HalfOpen => {
                let successes = self.success_count.fetch_add(1, Ordering::SeqCst) + 1;
                if successes >= self.config.success_threshold {
                    self.close();
                    info!(source = %self.source_name, "circuit closed, source recovered");
                }
            }
            CircuitState::Open => {}
        }
    }

    /// Record a failed call
    pub fn record_failure(&self) {
        match self.state() {
            CircuitState::Closed => {
                let failures = self.failure_count.fetch_add(1, Ordering::SeqCst) + 1;
                if failures >= self.config.failure_threshold {
                    self.open();
                    warn!(
                        source = %self.source_name,
                        failures,
                        threshold = self.config.failure_threshold,
                        recovery_secs = self.config.recovery_timeout.as_secs(),
                        "circuit opened"
                    );
                }
            }
            CircuitState::HalfOpen => {
                self.open();
                warn!(source = %self.source_name, "circuit re-opened, probe failed");
            }
            CircuitState::Open => {
                self.opened_at_ms
                    .store(self.elapsed_millis(), Ordering::SeqCst);
            }
        }
    }

    fn open(&self) {
        self.state
            .store(CircuitState::Open.to_u32(), Ordering::SeqCst);
        self.opened_at_ms
            .store(self.elapsed_millis(), Ordering::SeqCst);
        self.success_count.store(0, Ordering::SeqCst);
    }

    fn close(&self) {
        self.state
            .store(CircuitState::Closed.to_u32(), Ordering::SeqCst);
        self.failure_count.store(0, Ordering::SeqCst);
        self.success_count.store(0, Ordering::SeqCst);
    }

    /// Run `operation` under breaker protection
    ///
    /// Only retryable failures count toward opening the circuit; a 404 or a
    /// decode error says nothing about source health.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::CircuitOpen`] without polling `operation` when
    /// the circuit rejects the call, otherwise the operation's own error.
    pub async fn call<F, T>(&self, operation: F) -> Result<T, SourceError>
    where
        F: Future<Output = Result<T, SourceError>>,
    {
        let Some(admission) = self.admit() else {
            debug!(source = %self.source_name, "circuit open, short-circuiting call");
            return Err(SourceError::CircuitOpen {
                source_name: self.source_name.clone(),
                retry_after_secs: self.time_until_recovery(),
            });
        };

        let mut probe = ProbeGuard {
            breaker: self,
            armed: admission == Admission::Probe,
        };
        let outcome = operation.await;
        probe.armed = false;

        match outcome {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(error) => {
                if error.is_retryable() {
                    self.record_failure();
                } else if self.state() == CircuitState::HalfOpen {
                    // the source answered, so it is reachable
                    self.record_success();
                }
                Err(error)
            }
        }
    }

    /// Seconds until a probe is allowed, rounded up
    fn time_until_recovery(&self) -> u64 {
        let since_open = self
            .elapsed_millis()
            .saturating_sub(self.opened_at_ms.load(Ordering::SeqCst));
        self.recovery_millis()
            .saturating_sub(since_open)
            .saturating_add(999)
            / 1000
    }

    /// Force the circuit closed
    pub fn reset(&self) {
        self.close();
        info!(source = %self.source_name, "circuit manually reset");
    }
}
