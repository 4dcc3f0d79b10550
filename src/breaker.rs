//! Circuit breaker - per-target failure tracking and availability gating.
//!
//! Each target endpoint has its own three-state machine:
//!
//! - **Closed** (initial): requests flow; consecutive failures are counted
//!   and reaching the threshold opens the circuit.
//! - **Open**: requests are refused until the recovery window elapses, at
//!   which point the next availability check moves the target to half-open
//!   and lets the caller through as a probe.
//! - **HalfOpen**: requests flow; a success closes the circuit and resets
//!   the counter, a failure re-opens it and re-stamps the transition time.
//!
//! Probing in half-open is best-effort, not single-flight: concurrent
//! callers that observe half-open are all allowed through.
//!
//! The threshold and recovery window are process-wide; every counter and
//! state is per-target, so one failing endpoint never poisons another.
//! State lives in a sharded map and each mutation happens under the shard
//! guard, so transitions are linearizable per target and failure counts are
//! never lost under concurrent recording.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::error::{Result, RpcError};

/// Availability state of a single target endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation, requests flow.
    Closed,
    /// Target is shorted out; requests are refused.
    Open,
    /// Recovery probe window; requests flow tentatively.
    HalfOpen,
}

#[derive(Debug)]
struct TargetState {
    state: CircuitState,
    consecutive_failures: u32,
    last_transition: Instant,
}

impl TargetState {
    fn closed() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            last_transition: Instant::now(),
        }
    }
}

/// Per-target circuit breaker with process-wide thresholds.
#[derive(Debug)]
pub struct CircuitBreaker {
    targets: DashMap<String, TargetState>,
    failure_threshold: u32,
    recovery_window: Duration,
}

impl CircuitBreaker {
    /// Create a breaker with the given threshold and recovery window.
    pub fn new(failure_threshold: u32, recovery_window: Duration) -> Self {
        Self {
            targets: DashMap::new(),
            failure_threshold,
            recovery_window,
        }
    }

    /// Whether requests to the target are currently allowed.
    ///
    /// An open circuit whose recovery window has elapsed transitions to
    /// half-open here and returns `true`, letting the caller through as a
    /// probe.
    pub fn is_available(&self, target: &str) -> bool {
        let mut entry = self
            .targets
            .entry(target.to_string())
            .or_insert_with(TargetState::closed);

        match entry.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => true,
            CircuitState::Open => {
                if entry.last_transition.elapsed() > self.recovery_window {
                    entry.state = CircuitState::HalfOpen;
                    entry.last_transition = Instant::now();
                    tracing::info!(endpoint = target, "circuit half-open, probing for recovery");
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Typed form of [`is_available`](Self::is_available): a gated target
    /// yields [`RpcError::CircuitOpen`], for callers converting the refusal
    /// into a fallback rather than branching on a bare bool.
    pub fn check_available(&self, target: &str) -> Result<()> {
        if self.is_available(target) {
            Ok(())
        } else {
            Err(RpcError::CircuitOpen(target.to_string()))
        }
    }

    /// Record a successful call to the target.
    ///
    /// Closes a half-open circuit; resets the failure counter in closed.
    pub fn record_success(&self, target: &str) {
        let Some(mut entry) = self.targets.get_mut(target) else {
            return;
        };
        match entry.state {
            CircuitState::HalfOpen => {
                entry.state = CircuitState::Closed;
                entry.consecutive_failures = 0;
                entry.last_transition = Instant::now();
                tracing::info!(endpoint = target, "circuit closed, target recovered");
            }
            CircuitState::Closed => {
                entry.consecutive_failures = 0;
            }
            CircuitState::Open => {}
        }
    }

    /// Record a failed call to the target.
    ///
    /// Re-opens a half-open circuit; in closed, opens once the consecutive
    /// failure count reaches the threshold.
    pub fn record_failure(&self, target: &str) {
        let mut entry = self
            .targets
            .entry(target.to_string())
            .or_insert_with(TargetState::closed);

        match entry.state {
            CircuitState::HalfOpen => {
                entry.state = CircuitState::Open;
                entry.last_transition = Instant::now();
                tracing::warn!(endpoint = target, "recovery probe failed, circuit re-opened");
            }
            CircuitState::Closed => {
                entry.consecutive_failures += 1;
                if entry.consecutive_failures >= self.failure_threshold {
                    entry.state = CircuitState::Open;
                    entry.last_transition = Instant::now();
                    tracing::warn!(
                        endpoint = target,
                        failures = entry.consecutive_failures,
                        "failure threshold reached, circuit opened"
                    );
                }
            }
            CircuitState::Open => {}
        }
    }

    /// Current state of a target. Unknown targets report closed.
    pub fn state_of(&self, target: &str) -> CircuitState {
        self.targets
            .get(target)
            .map(|entry| entry.state)
            .unwrap_or(CircuitState::Closed)
    }

    /// Drop all per-target state. Administrative/test use.
    pub fn reset(&self) {
        self.targets.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGET: &str = "http://host:80";

    fn breaker() -> CircuitBreaker {
        CircuitBreaker::new(3, Duration::from_millis(40))
    }

    #[test]
    fn test_unknown_target_is_closed_and_available() {
        let breaker = breaker();
        assert!(breaker.is_available(TARGET));
        assert_eq!(breaker.state_of(TARGET), CircuitState::Closed);
    }

    #[test]
    fn test_opens_at_threshold() {
        let breaker = breaker();
        breaker.record_failure(TARGET);
        breaker.record_failure(TARGET);
        assert_eq!(breaker.state_of(TARGET), CircuitState::Closed);

        breaker.record_failure(TARGET);
        assert_eq!(breaker.state_of(TARGET), CircuitState::Open);
        assert!(!breaker.is_available(TARGET));
    }

    #[test]
    fn test_check_available_yields_circuit_open() {
        let breaker = breaker();
        assert!(breaker.check_available(TARGET).is_ok());

        for _ in 0..3 {
            breaker.record_failure(TARGET);
        }
        match breaker.check_available(TARGET) {
            Err(RpcError::CircuitOpen(target)) => assert_eq!(target, TARGET),
            other => panic!("expected CircuitOpen, got {other:?}"),
        }
    }

    #[test]
    fn test_success_resets_failure_count_in_closed() {
        let breaker = breaker();
        breaker.record_failure(TARGET);
        breaker.record_failure(TARGET);
        breaker.record_success(TARGET);

        // Counter restarted: two more failures are not enough to open.
        breaker.record_failure(TARGET);
        breaker.record_failure(TARGET);
        assert_eq!(breaker.state_of(TARGET), CircuitState::Closed);
    }

    #[test]
    fn test_recovery_window_moves_open_to_half_open() {
        let breaker = breaker();
        for _ in 0..3 {
            breaker.record_failure(TARGET);
        }
        assert!(!breaker.is_available(TARGET));

        std::thread::sleep(Duration::from_millis(50));
        assert!(breaker.is_available(TARGET));
        assert_eq!(breaker.state_of(TARGET), CircuitState::HalfOpen);
    }

    #[test]
    fn test_half_open_success_closes_and_resets() {
        let breaker = breaker();
        for _ in 0..3 {
            breaker.record_failure(TARGET);
        }
        std::thread::sleep(Duration::from_millis(50));
        assert!(breaker.is_available(TARGET));

        breaker.record_success(TARGET);
        assert_eq!(breaker.state_of(TARGET), CircuitState::Closed);

        // Counter was reset to 0: threshold applies afresh.
        breaker.record_failure(TARGET);
        breaker.record_failure(TARGET);
        assert_eq!(breaker.state_of(TARGET), CircuitState::Closed);
    }

    #[test]
    fn test_half_open_failure_reopens() {
        let breaker = breaker();
        for _ in 0..3 {
            breaker.record_failure(TARGET);
        }
        std::thread::sleep(Duration::from_millis(50));
        assert!(breaker.is_available(TARGET));

        breaker.record_failure(TARGET);
        assert_eq!(breaker.state_of(TARGET), CircuitState::Open);
        assert!(!breaker.is_available(TARGET));
    }

    #[test]
    fn test_targets_are_isolated() {
        let breaker = breaker();
        for _ in 0..3 {
            breaker.record_failure("http://bad:1");
        }
        assert!(!breaker.is_available("http://bad:1"));
        assert!(breaker.is_available("http://good:2"));
    }

    #[test]
    fn test_concurrent_failures_are_not_lost() {
        use std::sync::Arc;

        let breaker = Arc::new(CircuitBreaker::new(64, Duration::from_millis(40)));
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let breaker = breaker.clone();
                std::thread::spawn(move || {
                    for _ in 0..8 {
                        breaker.record_failure(TARGET);
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        // 64 recorded failures reach the threshold of 64 exactly.
        assert_eq!(breaker.state_of(TARGET), CircuitState::Open);
    }
}
