//! Bounded concurrency gate and process-wide shutdown signal.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::timeout;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use crate::error::{ProbeError, ProbeResult};

/// Default number of simultaneous probe operations admitted by the gate.
pub const DEFAULT_GATE_CAPACITY: usize = 5;

/// Default time an acquire waits for a permit before giving up.
pub const DEFAULT_GATE_WAIT: Duration = Duration::from_secs(5);

/// Broadcast cancellation signal shared across the probe engine.
///
/// Triggering is idempotent and non-blocking. Once triggered, new gate
/// acquisitions fail immediately and in-flight cancellable sub-operations
/// observe the signal cooperatively.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    token: CancellationToken,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal shutdown. Safe to call repeatedly from any task.
    pub fn trigger(&self) {
        self.token.cancel();
    }

    /// Whether shutdown has been signalled.
    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Future that resolves once shutdown is signalled; for use in
    /// `tokio::select!` races.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }
}

/// RAII permit for one admitted operation.
///
/// Dropping the permit releases the gate slot; every exit path of the
/// holding scope releases exactly once.
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
}

/// Bounded permit pool with timed acquisition.
///
/// Capacity is fixed at construction and never exceeded. Fairness among
/// waiters is not guaranteed.
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    permits: Arc<Semaphore>,
    capacity: usize,
    wait_timeout: Duration,
}

impl ConcurrencyGate {
    pub fn new(capacity: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
            wait_timeout: DEFAULT_GATE_WAIT,
        }
    }

    /// Override the acquire wait timeout (used by tests with short waits).
    pub fn with_wait_timeout(mut self, wait_timeout: Duration) -> Self {
        self.wait_timeout = wait_timeout;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots currently free.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Wait up to the configured timeout for a permit, racing against
    /// shutdown.
    ///
    /// A triggered shutdown fails pending and future acquires with
    /// [`ProbeError::Cancelled`]; an expired wait fails with
    /// [`ProbeError::ResourceExhausted`]. The two are distinct in kind.
    pub async fn acquire(&self, shutdown: &ShutdownSignal) -> ProbeResult<GatePermit> {
        if shutdown.is_triggered() {
            return Err(ProbeError::Cancelled(
                "service is shutting down".to_string(),
            ));
        }

        tokio::select! {
            () = shutdown.cancelled() => Err(ProbeError::Cancelled(
                "service is shutting down".to_string(),
            )),
            acquired = timeout(self.wait_timeout, Arc::clone(&self.permits).acquire_owned()) => {
                match acquired {
                    Ok(Ok(permit)) => Ok(GatePermit { _permit: permit }),
                    // The semaphore is never closed while the gate is alive.
                    Ok(Err(_)) => Err(ProbeError::Cancelled(
                        "service is shutting down".to_string(),
                    )),
                    Err(_) => Err(ProbeError::ResourceExhausted(format!(
                        "too many concurrent operations (waited {:?})",
                        self.wait_timeout
                    ))),
                }
            }
        }
    }
}

impl Default for ConcurrencyGate {
    fn default() -> Self {
        Self::new(DEFAULT_GATE_CAPACITY)
    }
}
