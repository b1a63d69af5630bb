//! The pool governor: slot semaphore, optional writer-priority turnstile,
//! and drain signalling.
//!
//! ## Fairness
//!
//! A *writer* governor (`hold_turnstile = true`) acquires the turnstile and
//! holds it for the lifetime of the permit, starving out later readers
//! until release. A *reader* governor touches the turnstile (acquire, then
//! release immediately) before competing for a slot, so readers never block
//! one another but queue behind any writer currently holding it.
//!
//! ## Drain signal
//!
//! `release` decrements `in_use` and publishes the drain flag under the
//! same lock, *before* the freed slot is returned to the semaphore; a
//! successful acquire clears the flag under that lock too. A pending
//! drain waiter therefore completes only for states where `in_use` was
//! genuinely zero and no acquirer had yet observed the freed permit.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, watch};
use tokio_util::sync::CancellationToken;

use crate::error::{PoolError, Result};

static NEXT_GOVERNOR_ID: AtomicU64 = AtomicU64::new(1);

/// Construction parameters for a [`PoolGovernor`].
#[derive(Clone)]
pub struct PoolGovernorConfig {
    /// Number of slot permits. Must be at least 1.
    pub max_permits: usize,
    /// How long an acquire may wait before reporting saturation.
    pub acquire_timeout: Duration,
    /// Slot semaphore shared with other governors, when several governors
    /// meter one resource. A private semaphore is created otherwise.
    pub shared_slots: Option<Arc<Semaphore>>,
    /// Turnstile shared with sibling governors.
    pub turnstile: Option<Arc<Semaphore>>,
    /// Whether permits hold the turnstile for their lifetime (writer
    /// behaviour) or only touch it (reader behaviour).
    pub hold_turnstile: bool,
}

impl Default for PoolGovernorConfig {
    fn default() -> Self {
        Self {
            max_permits: 1,
            acquire_timeout: Duration::from_secs(30),
            shared_slots: None,
            turnstile: None,
            hold_turnstile: false,
        }
    }
}

impl PoolGovernorConfig {
    /// Start from defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the slot permit count.
    #[must_use]
    pub fn max_permits(mut self, count: usize) -> Self {
        self.max_permits = count;
        self
    }

    /// Set the acquire timeout.
    #[must_use]
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Share a slot semaphore with sibling governors.
    #[must_use]
    pub fn shared_slots(mut self, slots: Arc<Semaphore>) -> Self {
        self.shared_slots = Some(slots);
        self
    }

    /// Attach a borrowed turnstile.
    #[must_use]
    pub fn turnstile(mut self, turnstile: Arc<Semaphore>, hold: bool) -> Self {
        self.turnstile = Some(turnstile);
        self.hold_turnstile = hold;
        self
    }
}

#[derive(Debug, Default)]
struct Counters {
    in_use: usize,
    total_acquired: u64,
    total_timeouts: u64,
}

#[derive(Debug)]
struct GovernorInner {
    slots: Arc<Semaphore>,
    turnstile: Option<Arc<Semaphore>>,
    owns_turnstile: bool,
    hold_turnstile: bool,
    acquire_timeout: Duration,
    counters: Mutex<Counters>,
    drained_tx: watch::Sender<bool>,
    pool_hash: u64,
}

impl Drop for GovernorInner {
    fn drop(&mut self) {
        // Owned turnstiles are torn down with the governor; borrowed
        // turnstiles belong to whoever shared them.
        if self.owns_turnstile {
            if let Some(turnstile) = &self.turnstile {
                turnstile.close();
            }
        }
    }
}

/// Fair admission control in front of a pooled resource.
pub struct PoolGovernor {
    inner: Arc<GovernorInner>,
}

impl PoolGovernor {
    /// Build a governor.
    ///
    /// # Errors
    ///
    /// Fails when `max_permits` is zero.
    pub fn new(config: PoolGovernorConfig) -> Result<Self> {
        Self::build(config, false)
    }

    /// Build a governor that creates and owns its turnstile. The turnstile
    /// is closed when the governor drops.
    ///
    /// # Errors
    ///
    /// Fails when `max_permits` is zero.
    pub fn with_owned_turnstile(config: PoolGovernorConfig, hold: bool) -> Result<Self> {
        Self::build(
            PoolGovernorConfig {
                turnstile: Some(Arc::new(Semaphore::new(1))),
                hold_turnstile: hold,
                ..config
            },
            true,
        )
    }

    fn build(config: PoolGovernorConfig, owns_turnstile: bool) -> Result<Self> {
        if config.max_permits == 0 {
            return Err(PoolError::InvalidConfig(
                "max_permits must be at least 1".into(),
            ));
        }
        let slots = config
            .shared_slots
            .unwrap_or_else(|| Arc::new(Semaphore::new(config.max_permits)));
        let (drained_tx, _) = watch::channel(true);
        Ok(Self {
            inner: Arc::new(GovernorInner {
                slots,
                turnstile: config.turnstile,
                owns_turnstile,
                hold_turnstile: config.hold_turnstile,
                acquire_timeout: config.acquire_timeout,
                counters: Mutex::new(Counters::default()),
                drained_tx,
                pool_hash: hash_identity(NEXT_GOVERNOR_ID.fetch_add(1, Ordering::Relaxed)),
            }),
        })
    }

    /// The governor's opaque identity hash, carried by saturation errors.
    #[must_use]
    pub fn pool_hash(&self) -> u64 {
        self.inner.pool_hash
    }

    /// Permits currently held.
    #[must_use]
    pub fn in_use(&self) -> usize {
        self.inner.counters.lock().in_use
    }

    /// Successful acquires over the governor's lifetime.
    #[must_use]
    pub fn total_acquired(&self) -> u64 {
        self.inner.counters.lock().total_acquired
    }

    /// Acquire timeouts over the governor's lifetime. `try_acquire`
    /// failures do not count.
    #[must_use]
    pub fn total_timeouts(&self) -> u64 {
        self.inner.counters.lock().total_timeouts
    }

    /// Slot permits currently free.
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.inner.slots.available_permits()
    }

    /// Acquire a permit, waiting up to the configured timeout.
    ///
    /// # Errors
    ///
    /// [`PoolError::Saturated`] on timeout (carrying the pool hash),
    /// [`PoolError::Cancelled`] when the token fires (including a
    /// pre-cancelled token), [`PoolError::Closed`] when the semaphore was
    /// closed.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<PoolPermit> {
        if cancel.is_cancelled() {
            return Err(PoolError::Cancelled);
        }
        let work = self.acquire_inner();
        tokio::select! {
            () = cancel.cancelled() => Err(PoolError::Cancelled),
            outcome = tokio::time::timeout(self.inner.acquire_timeout, work) => match outcome {
                Ok(result) => result,
                Err(_) => {
                    self.inner.counters.lock().total_timeouts += 1;
                    tracing::warn!(pool = self.inner.pool_hash, "pool saturated");
                    Err(PoolError::Saturated {
                        pool_hash: self.inner.pool_hash,
                    })
                }
            },
        }
    }

    async fn acquire_inner(&self) -> Result<PoolPermit> {
        let held_turnstile = match (&self.inner.turnstile, self.inner.hold_turnstile) {
            (Some(turnstile), true) => Some(
                Arc::clone(turnstile)
                    .acquire_owned()
                    .await
                    .map_err(|_| PoolError::Closed)?,
            ),
            (Some(turnstile), false) => {
                // Touch: wait behind any writer, then release immediately.
                drop(
                    Arc::clone(turnstile)
                        .acquire_owned()
                        .await
                        .map_err(|_| PoolError::Closed)?,
                );
                None
            }
            (None, _) => None,
        };
        let slot = Arc::clone(&self.inner.slots)
            .acquire_owned()
            .await
            .map_err(|_| PoolError::Closed)?;
        Ok(self.admit(slot, held_turnstile))
    }

    /// Acquire without waiting. Returns `None` when no permit is free;
    /// timeout counters are untouched.
    #[must_use]
    pub fn try_acquire(&self) -> Option<PoolPermit> {
        let held_turnstile = match (&self.inner.turnstile, self.inner.hold_turnstile) {
            (Some(turnstile), true) => Some(Arc::clone(turnstile).try_acquire_owned().ok()?),
            (Some(turnstile), false) => {
                drop(Arc::clone(turnstile).try_acquire_owned().ok()?);
                None
            }
            (None, _) => None,
        };
        let slot = Arc::clone(&self.inner.slots).try_acquire_owned().ok()?;
        Some(self.admit(slot, held_turnstile))
    }

    fn admit(
        &self,
        slot: OwnedSemaphorePermit,
        turnstile: Option<OwnedSemaphorePermit>,
    ) -> PoolPermit {
        let mut counters = self.inner.counters.lock();
        counters.in_use += 1;
        counters.total_acquired += 1;
        // The acquirer observed a free permit: clear the drain flag under
        // the same lock releases publish under. send_replace stores even
        // with no subscribed waiters.
        self.inner.drained_tx.send_replace(false);
        drop(counters);
        PoolPermit {
            inner: Arc::clone(&self.inner),
            slot: Some(slot),
            turnstile,
        }
    }

    /// Wait until `in_use` reaches zero.
    ///
    /// # Errors
    ///
    /// A pre-cancelled token fails immediately with
    /// [`PoolError::Cancelled`]; an elapsed timeout fails with
    /// [`PoolError::DrainTimedOut`].
    pub async fn wait_for_drain_async(
        &self,
        timeout: Option<Duration>,
        cancel: Option<&CancellationToken>,
    ) -> Result<()> {
        if let Some(token) = cancel {
            if token.is_cancelled() {
                return Err(PoolError::Cancelled);
            }
        }
        let mut rx = self.inner.drained_tx.subscribe();
        let wait = async move {
            loop {
                if *rx.borrow_and_update() {
                    return Ok(());
                }
                if rx.changed().await.is_err() {
                    return Err(PoolError::Closed);
                }
            }
        };
        let wait_with_cancel = async {
            match cancel {
                Some(token) => tokio::select! {
                    () = token.cancelled() => Err(PoolError::Cancelled),
                    out = wait => out,
                },
                None => wait.await,
            }
        };
        match timeout {
            Some(limit) => tokio::time::timeout(limit, wait_with_cancel)
                .await
                .map_err(|_| PoolError::DrainTimedOut)?,
            None => wait_with_cancel.await,
        }
    }
}

impl std::fmt::Debug for PoolGovernor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolGovernor")
            .field("pool_hash", &self.inner.pool_hash)
            .field("in_use", &self.in_use())
            .field("available", &self.available_permits())
            .finish()
    }
}

/// A held permit. Dropping it releases the slot (and any held turnstile)
/// exactly once; calling [`PoolPermit::release`] first makes the drop a
/// no-op.
#[derive(Debug)]
pub struct PoolPermit {
    inner: Arc<GovernorInner>,
    slot: Option<OwnedSemaphorePermit>,
    turnstile: Option<OwnedSemaphorePermit>,
}

impl PoolPermit {
    /// Release the permit now. Idempotent.
    pub fn release(&mut self) {
        let Some(slot) = self.slot.take() else {
            return;
        };
        {
            let mut counters = self.inner.counters.lock();
            counters.in_use = counters.in_use.saturating_sub(1);
            if counters.in_use == 0 {
                // Published before the slot returns to the semaphore, so
                // no acquirer can have observed the freed permit yet.
                self.inner.drained_tx.send_replace(true);
            }
        }
        drop(slot);
        if let Some(turnstile) = self.turnstile.take() {
            drop(turnstile);
        }
    }
}

impl Drop for PoolPermit {
    fn drop(&mut self) {
        self.release();
    }
}

fn hash_identity(id: u64) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    id.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn quick(max: usize) -> PoolGovernor {
        PoolGovernor::new(
            PoolGovernorConfig::new()
                .max_permits(max)
                .acquire_timeout(Duration::from_millis(50)),
        )
        .unwrap()
    }

    #[test]
    fn test_zero_permits_rejected() {
        assert!(matches!(
            PoolGovernor::new(PoolGovernorConfig::new().max_permits(0)),
            Err(PoolError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_balanced_acquire_release() {
        let governor = quick(3);
        let cancel = CancellationToken::new();
        for _ in 0..5 {
            let mut permits = Vec::new();
            for _ in 0..3 {
                permits.push(governor.acquire(&cancel).await.unwrap());
            }
            assert_eq!(governor.in_use(), 3);
            permits.clear();
            assert_eq!(governor.in_use(), 0);
        }
        assert_eq!(governor.total_acquired(), 15);
    }

    #[tokio::test]
    async fn test_saturation_carries_pool_hash() {
        let governor = quick(1);
        let cancel = CancellationToken::new();
        let _held = governor.acquire(&cancel).await.unwrap();
        match governor.acquire(&cancel).await {
            Err(PoolError::Saturated { pool_hash }) => {
                assert_eq!(pool_hash, governor.pool_hash());
            }
            other => panic!("expected saturation, got {other:?}"),
        }
        assert_eq!(governor.total_timeouts(), 1);
    }

    #[tokio::test]
    async fn test_try_acquire_does_not_count_timeouts() {
        let governor = quick(1);
        let held = governor.try_acquire().unwrap();
        assert!(governor.try_acquire().is_none());
        assert_eq!(governor.total_timeouts(), 0);
        drop(held);
        assert!(governor.try_acquire().is_some());
    }

    #[tokio::test]
    async fn test_writer_turnstile_starves_reader() {
        let turnstile = Arc::new(Semaphore::new(1));
        let writer = PoolGovernor::new(
            PoolGovernorConfig::new()
                .max_permits(1)
                .acquire_timeout(Duration::from_millis(50))
                .turnstile(Arc::clone(&turnstile), true),
        )
        .unwrap();
        let reader = PoolGovernor::new(
            PoolGovernorConfig::new()
                .max_permits(1)
                .acquire_timeout(Duration::from_millis(50))
                .turnstile(Arc::clone(&turnstile), false),
        )
        .unwrap();
        let cancel = CancellationToken::new();

        let write_permit = writer.acquire(&cancel).await.unwrap();
        // The writer holds the turnstile; the reader times out behind it.
        assert!(matches!(
            reader.acquire(&cancel).await,
            Err(PoolError::Saturated { .. })
        ));
        assert_eq!(reader.total_timeouts(), 1);

        drop(write_permit);
        let _read_permit = reader.acquire(&cancel).await.unwrap();
    }

    #[tokio::test]
    async fn test_readers_do_not_block_readers() {
        let turnstile = Arc::new(Semaphore::new(1));
        let reader = PoolGovernor::new(
            PoolGovernorConfig::new()
                .max_permits(2)
                .acquire_timeout(Duration::from_millis(50))
                .turnstile(turnstile, false),
        )
        .unwrap();
        let cancel = CancellationToken::new();
        let first = reader.acquire(&cancel).await.unwrap();
        let second = reader.acquire(&cancel).await.unwrap();
        assert_eq!(reader.in_use(), 2);
        drop((first, second));
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let governor = quick(1);
        let cancel = CancellationToken::new();
        let mut permit = governor.acquire(&cancel).await.unwrap();
        permit.release();
        permit.release();
        drop(permit);
        assert_eq!(governor.available_permits(), 1);
        assert_eq!(governor.in_use(), 0);
        // The slot can be re-acquired exactly once.
        let _a = governor.try_acquire().unwrap();
        assert!(governor.try_acquire().is_none());
    }

    #[tokio::test]
    async fn test_pre_cancelled_acquire_fails_fast() {
        let governor = quick(1);
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(
            governor.acquire(&cancel).await.unwrap_err(),
            PoolError::Cancelled
        );
        assert_eq!(governor.total_timeouts(), 0);
    }

    #[tokio::test]
    async fn test_drain_pre_cancelled_token_throws() {
        let governor = quick(1);
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(
            governor
                .wait_for_drain_async(None, Some(&cancel))
                .await
                .unwrap_err(),
            PoolError::Cancelled
        );
    }

    #[tokio::test]
    async fn test_drain_completes_when_idle() {
        let governor = quick(1);
        governor
            .wait_for_drain_async(Some(Duration::from_millis(10)), None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_drain_waits_for_release() {
        let governor = Arc::new(quick(1));
        let cancel = CancellationToken::new();
        let permit = governor.acquire(&cancel).await.unwrap();

        let waiter = {
            let governor = Arc::clone(&governor);
            tokio::spawn(async move {
                governor
                    .wait_for_drain_async(Some(Duration::from_secs(1)), None)
                    .await
            })
        };
        tokio::task::yield_now().await;
        drop(permit);
        waiter.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_drain_not_fooled_by_immediate_reacquire() {
        let governor = Arc::new(quick(1));
        let cancel = CancellationToken::new();

        // Cycle acquire/release while a waiter is parked; after the final
        // release the waiter must complete with in_use at zero.
        let waiter = {
            let governor = Arc::clone(&governor);
            tokio::spawn(async move {
                governor
                    .wait_for_drain_async(Some(Duration::from_secs(1)), None)
                    .await
            })
        };
        for _ in 0..10 {
            let permit = governor.acquire(&cancel).await.unwrap();
            drop(permit);
        }
        waiter.await.unwrap().unwrap();
        assert_eq!(governor.in_use(), 0);
    }

    #[tokio::test]
    async fn test_drain_timeout() {
        let governor = quick(1);
        let cancel = CancellationToken::new();
        let _held = governor.acquire(&cancel).await.unwrap();
        assert_eq!(
            governor
                .wait_for_drain_async(Some(Duration::from_millis(20)), None)
                .await
                .unwrap_err(),
            PoolError::DrainTimedOut
        );
    }

    #[tokio::test]
    async fn test_shared_slots_meter_across_governors() {
        let slots = Arc::new(Semaphore::new(1));
        let a = PoolGovernor::new(
            PoolGovernorConfig::new()
                .max_permits(1)
                .acquire_timeout(Duration::from_millis(50))
                .shared_slots(Arc::clone(&slots)),
        )
        .unwrap();
        let b = PoolGovernor::new(
            PoolGovernorConfig::new()
                .max_permits(1)
                .acquire_timeout(Duration::from_millis(50))
                .shared_slots(slots),
        )
        .unwrap();
        let held = a.try_acquire().unwrap();
        assert!(b.try_acquire().is_none());
        drop(held);
        assert!(b.try_acquire().is_some());
    }
}
