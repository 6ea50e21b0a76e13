//! # Hybrid Logical Clock
//!
//! Process-wide monotonic causal timestamp source. The `(physical, logical)`
//! update must be atomic to preserve monotonicity under concurrent callers,
//! so the state has a single serializing owner: a tokio actor serving
//! `now`/`merge` requests over a channel. The critical section is a compare
//! plus a maybe-increment, kept deliberately short.
//!
//! Callers on the publish path use `ClockHandle::now_or_fallback`, which
//! retries with exponential backoff and then degrades to a plain wall-clock
//! stamp; publishing never blocks indefinitely on clock unavailability.

use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};
use vsm_types::{ClockError, HlcTimestamp, FALLBACK_NODE_ID};

/// Base delay for retries when the clock actor is unreachable.
const RETRY_BASE_MS: u64 = 50;

/// Retry attempts before degrading to a wall-clock stamp.
const MAX_RETRIES: u32 = 3;

/// Command queue depth for the clock actor.
const CLOCK_QUEUE_CAPACITY: usize = 256;

/// Current wall-clock time in milliseconds since the Unix epoch.
#[must_use]
pub fn wall_clock_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Process-local clock state: single writer, mutated on every `now` or
/// `merge`, alive for the process lifetime.
#[derive(Debug)]
pub struct ClockState {
    physical: u64,
    logical: u64,
    node_id: String,
    drift_tolerance_ms: u64,
}

impl ClockState {
    /// Create clock state for a node.
    #[must_use]
    pub fn new(node_id: impl Into<String>, drift_tolerance_ms: u64) -> Self {
        Self {
            physical: 0,
            logical: 0,
            node_id: node_id.into(),
            drift_tolerance_ms,
        }
    }

    /// Produce the next local timestamp.
    ///
    /// If the wall clock advanced past the stored physical time, adopt it
    /// and reset the counter; otherwise (stalled or backward clock) keep the
    /// physical component and increment the counter. Successive stamps are
    /// strictly increasing either way.
    pub fn now(&mut self) -> HlcTimestamp {
        self.now_at(wall_clock_ms())
    }

    /// `now` against an explicit wall-clock reading. Seam for tests that
    /// simulate stalled or backward clocks.
    pub fn now_at(&mut self, wall_ms: u64) -> HlcTimestamp {
        if wall_ms > self.physical {
            self.physical = wall_ms;
            self.logical = 0;
        } else {
            self.logical += 1;
        }
        self.stamp()
    }

    /// Merge a remote timestamp into local state.
    ///
    /// The result is an upper bound of the local state, the remote stamp,
    /// and the current wall clock. Remote stamps further in the future than
    /// the drift tolerance are rejected untouched; one desynchronized node
    /// must not poison the whole ordering.
    ///
    /// # Errors
    ///
    /// `ClockError::DriftExceeded` when the remote physical time is past
    /// `wall_clock + drift_tolerance_ms`; local state is left unchanged.
    pub fn merge(&mut self, remote: &HlcTimestamp) -> Result<HlcTimestamp, ClockError> {
        self.merge_at(wall_clock_ms(), remote)
    }

    /// `merge` against an explicit wall-clock reading.
    ///
    /// # Errors
    ///
    /// See [`ClockState::merge`].
    pub fn merge_at(
        &mut self,
        wall_ms: u64,
        remote: &HlcTimestamp,
    ) -> Result<HlcTimestamp, ClockError> {
        if !remote.is_within_drift(wall_ms, self.drift_tolerance_ms) {
            return Err(ClockError::DriftExceeded {
                remote_physical: remote.physical,
                local_now: wall_ms,
                tolerance_ms: self.drift_tolerance_ms,
            });
        }

        let new_physical = self.physical.max(remote.physical).max(wall_ms);

        self.logical = if new_physical == self.physical && new_physical == remote.physical {
            self.logical.max(remote.logical) + 1
        } else if new_physical == self.physical {
            self.logical + 1
        } else if new_physical == remote.physical {
            remote.logical + 1
        } else {
            // Wall clock strictly exceeds both sides.
            0
        };
        self.physical = new_physical;

        Ok(self.stamp())
    }

    /// The last issued timestamp without advancing the clock.
    #[must_use]
    pub fn last(&self) -> HlcTimestamp {
        self.stamp()
    }

    fn stamp(&self) -> HlcTimestamp {
        HlcTimestamp::new(self.physical, self.logical, self.node_id.clone())
    }
}

/// Requests served by the clock actor.
enum ClockRequest {
    Now {
        reply: oneshot::Sender<HlcTimestamp>,
    },
    Merge {
        remote: HlcTimestamp,
        reply: oneshot::Sender<Result<HlcTimestamp, ClockError>>,
    },
    Shutdown,
}

/// Cloneable handle to the clock actor.
#[derive(Debug, Clone)]
pub struct ClockHandle {
    tx: mpsc::Sender<ClockRequest>,
}

impl ClockHandle {
    /// Next local timestamp.
    ///
    /// # Errors
    ///
    /// `ClockError::Unavailable` when the actor is gone or its queue is at
    /// capacity.
    pub async fn now(&self) -> Result<HlcTimestamp, ClockError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .try_send(ClockRequest::Now { reply })
            .map_err(|_| ClockError::Unavailable)?;
        rx.await.map_err(|_| ClockError::Unavailable)
    }

    /// Merge a remote timestamp into the local clock.
    ///
    /// # Errors
    ///
    /// - `ClockError::Unavailable` - the actor is gone
    /// - `ClockError::DriftExceeded` - the remote stamp failed the drift check
    pub async fn merge(&self, remote: HlcTimestamp) -> Result<HlcTimestamp, ClockError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .try_send(ClockRequest::Merge { remote, reply })
            .map_err(|_| ClockError::Unavailable)?;
        rx.await.map_err(|_| ClockError::Unavailable)?
    }

    /// `now` with retry-then-degrade semantics for the publish path.
    ///
    /// Retries with exponential backoff (50ms base, 3 retries) while the
    /// actor is unreachable, then returns a wall-clock stamp tagged with the
    /// fallback node id. Total by construction.
    pub async fn now_or_fallback(&self) -> HlcTimestamp {
        let mut delay = Duration::from_millis(RETRY_BASE_MS);
        for attempt in 0..=MAX_RETRIES {
            match self.now().await {
                Ok(ts) => return ts,
                Err(ClockError::Unavailable) if attempt < MAX_RETRIES => {
                    debug!(attempt, delay_ms = delay.as_millis() as u64, "Clock unavailable, retrying");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(_) => break,
            }
        }

        warn!("Clock service unavailable after retries, degrading to wall-clock stamp");
        HlcTimestamp::new(wall_clock_ms(), 0, FALLBACK_NODE_ID)
    }

    /// Stop the clock actor. Pending requests already queued are served
    /// first; later calls degrade via `now_or_fallback`.
    pub async fn shutdown(&self) {
        let _ = self.tx.send(ClockRequest::Shutdown).await;
    }
}

/// Spawn the clock actor and return its handle.
#[must_use]
pub fn spawn_clock(node_id: impl Into<String>, drift_tolerance_ms: u64) -> ClockHandle {
    let mut state = ClockState::new(node_id, drift_tolerance_ms);
    let (tx, mut rx) = mpsc::channel(CLOCK_QUEUE_CAPACITY);

    tokio::spawn(async move {
        while let Some(request) = rx.recv().await {
            match request {
                ClockRequest::Now { reply } => {
                    let _ = reply.send(state.now());
                }
                ClockRequest::Merge { remote, reply } => {
                    let result = state.merge(&remote);
                    if let Err(ref err) = result {
                        warn!(error = %err, "Rejected remote timestamp on merge");
                    }
                    let _ = reply.send(result);
                }
                ClockRequest::Shutdown => break,
            }
        }
        debug!("Clock actor stopped");
    });

    ClockHandle { tx }
}
