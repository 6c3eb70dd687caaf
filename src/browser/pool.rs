//! Bounded pool of browser processes.
//!
//! At most `capacity` browsers exist at once, counting those being launched.
//! Idle browsers are reused most-recently-released first. When the pool is
//! exhausted callers queue, and each release hands its browser straight to
//! the oldest waiter.
//!
//! All bookkeeping sits in one [`PoolState`] behind a mutex that is never held
//! across an `.await`, so `release` is synchronous and safe to call from `Drop`.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::oneshot;

use crate::browser::launcher::{BrowserLauncher, BrowserSession};
use crate::error::{Error, Result};

/// A browser checked out of (or parked in) the pool.
#[derive(Debug)]
pub struct PoolEntry<B> {
    id: u64,
    browser: B,
    alive: bool,
}

impl<B: BrowserSession> PoolEntry<B> {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn browser(&self) -> &B {
        &self.browser
    }

    /// Flag the browser as broken so release discards it instead of reusing it.
    pub fn mark_dead(&mut self) {
        self.alive = false;
    }

    fn is_alive(&self) -> bool {
        self.alive && self.browser.is_alive()
    }
}

/// What a queued caller receives.
enum Grant<B> {
    /// A released browser, already counted as checked out.
    Entry(PoolEntry<B>),
    /// Permission to launch a new browser, already counted as constructing.
    Slot,
}

struct PoolState<B> {
    idle: Vec<PoolEntry<B>>,
    checked_out: HashSet<u64>,
    constructing: usize,
    waiters: VecDeque<oneshot::Sender<Grant<B>>>,
    closed: bool,
}

impl<B> PoolState<B> {
    fn total(&self) -> usize {
        self.idle.len() + self.checked_out.len() + self.constructing
    }

    /// Give a grant to the oldest waiter still listening.
    ///
    /// Returns the grant if nobody took it.
    fn hand_to_waiter(&mut self, mut grant: Grant<B>) -> Option<Grant<B>> {
        while let Some(waiter) = self.waiters.pop_front() {
            match waiter.send(grant) {
                Ok(()) => return None,
                // receiver gave up waiting; try the next one
                Err(returned) => grant = returned,
            }
        }
        Some(grant)
    }

    /// Offer a freed construction slot to the queue.
    fn offer_slot(&mut self) {
        if self.closed {
            return;
        }
        self.constructing += 1;
        if self.hand_to_waiter(Grant::Slot).is_some() {
            self.constructing -= 1;
        }
    }
}

/// Point-in-time view of the pool counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    pub capacity: usize,
    pub idle: usize,
    pub checked_out: usize,
    pub constructing: usize,
    pub waiting: usize,
}

struct PoolInner<L: BrowserLauncher> {
    launcher: L,
    capacity: usize,
    next_id: AtomicU64,
    state: Mutex<PoolState<L::Browser>>,
}

impl<L: BrowserLauncher> PoolInner<L> {
    fn lock(&self) -> MutexGuard<'_, PoolState<L::Browser>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Shared handle to the pool. Cloning is cheap.
pub struct BrowserPool<L: BrowserLauncher> {
    inner: Arc<PoolInner<L>>,
}

impl<L: BrowserLauncher> Clone for BrowserPool<L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<L: BrowserLauncher> BrowserPool<L> {
    pub fn new(launcher: L, capacity: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                launcher,
                capacity: capacity.max(1),
                next_id: AtomicU64::new(1),
                state: Mutex::new(PoolState {
                    idle: Vec::new(),
                    checked_out: HashSet::new(),
                    constructing: 0,
                    waiters: VecDeque::new(),
                    closed: false,
                }),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn status(&self) -> PoolStatus {
        let state = self.inner.lock();
        PoolStatus {
            capacity: self.inner.capacity,
            idle: state.idle.len(),
            checked_out: state.checked_out.len(),
            constructing: state.constructing,
            waiting: state.waiters.len(),
        }
    }

    /// Check out a browser, launching one if under capacity, otherwise queueing.
    pub async fn acquire(&self) -> Result<PoolEntry<L::Browser>> {
        let waiter = {
            let mut state = self.inner.lock();
            if state.closed {
                return Err(Error::PoolClosed);
            }

            if let Some(entry) = state.idle.pop() {
                state.checked_out.insert(entry.id);
                tracing::trace!("Reusing idle browser #{}", entry.id);
                return Ok(entry);
            }

            if state.total() < self.inner.capacity {
                state.constructing += 1;
                None
            } else {
                let (tx, rx) = oneshot::channel();
                state.waiters.push_back(tx);
                tracing::debug!("Browser pool exhausted, {} waiting", state.waiters.len());
                Some(rx)
            }
        };

        let Some(rx) = waiter else {
            return self.construct().await;
        };

        let mut pending = PendingGrant {
            pool: self,
            rx,
            received: false,
        };
        match pending.recv().await {
            Ok(Grant::Entry(entry)) => {
                tracing::trace!("Received browser #{} from release", entry.id);
                Ok(entry)
            }
            Ok(Grant::Slot) => self.construct().await,
            // sender dropped: the pool was drained while we waited
            Err(_) => Err(Error::PoolClosed),
        }
    }

    /// Check out a browser wrapped in a guard that returns it on drop.
    pub async fn lease(&self) -> Result<PoolLease<L>> {
        let entry = self.acquire().await?;
        Ok(PoolLease {
            pool: self.clone(),
            entry: Some(entry),
        })
    }

    /// Launch a browser into a slot already counted in `constructing`.
    async fn construct(&self) -> Result<PoolEntry<L::Browser>> {
        let slot = SlotGuard {
            inner: self.inner.as_ref(),
            armed: true,
        };

        let browser = self.inner.launcher.launch().await?;
        slot.disarm();

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let mut state = self.inner.lock();
        state.constructing -= 1;

        if state.closed {
            drop(state);
            self.close_in_background(browser);
            return Err(Error::PoolClosed);
        }

        state.checked_out.insert(id);
        tracing::debug!(
            "Launched browser #{} ({}/{} in use)",
            id,
            state.total(),
            self.inner.capacity
        );

        Ok(PoolEntry {
            id,
            browser,
            alive: true,
        })
    }

    /// Return a checked-out browser.
    ///
    /// The oldest waiter gets it directly; with no waiters it goes idle. A dead
    /// browser is closed and its slot offered to the queue instead. Releasing an
    /// entry that is not checked out is an invariant violation.
    pub fn release(&self, entry: PoolEntry<L::Browser>) -> Result<()> {
        let mut state = self.inner.lock();

        if !state.checked_out.remove(&entry.id) {
            tracing::error!("Browser #{} released but not checked out", entry.id);
            return Err(Error::PoolInvariant(format!(
                "browser #{} released twice or not issued by this pool",
                entry.id
            )));
        }

        if state.closed {
            drop(state);
            self.close_in_background(entry.browser);
            return Ok(());
        }

        if !entry.is_alive() {
            tracing::warn!("Discarding dead browser #{}", entry.id);
            state.offer_slot();
            drop(state);
            self.close_in_background(entry.browser);
            return Ok(());
        }

        let id = entry.id;
        state.checked_out.insert(id);
        match state.hand_to_waiter(Grant::Entry(entry)) {
            None => tracing::trace!("Handed browser #{} to next waiter", id),
            Some(leftover) => {
                state.checked_out.remove(&id);
                if let Grant::Entry(entry) = leftover {
                    state.idle.push(entry);
                }
            }
        }

        Ok(())
    }

    /// Close every idle browser and refuse further acquisitions.
    ///
    /// Checked-out browsers are closed as their holders release them.
    pub async fn drain_and_close_all(&self) {
        let idle = {
            let mut state = self.inner.lock();
            state.closed = true;
            state.waiters.clear();
            if !state.checked_out.is_empty() {
                tracing::warn!(
                    "Draining pool with {} browser(s) still checked out",
                    state.checked_out.len()
                );
            }
            std::mem::take(&mut state.idle)
        };

        tracing::info!("Closing {} idle browser(s)", idle.len());
        for entry in idle {
            self.inner.launcher.close(entry.browser).await;
        }
    }

    fn close_in_background(&self, browser: L::Browser) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let inner = Arc::clone(&self.inner);
                handle.spawn(async move {
                    inner.launcher.close(browser).await;
                });
            }
            Err(_) => drop(browser),
        }
    }
}

/// Frees a construction slot if launching fails or is abandoned.
struct SlotGuard<'a, L: BrowserLauncher> {
    inner: &'a PoolInner<L>,
    armed: bool,
}

impl<L: BrowserLauncher> SlotGuard<'_, L> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl<L: BrowserLauncher> Drop for SlotGuard<'_, L> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.inner.lock();
        state.constructing -= 1;
        state.offer_slot();
    }
}

/// A queued acquisition. If the caller goes away after a grant was sent but
/// before it was read, the grant is handed back to the pool on drop.
struct PendingGrant<'a, L: BrowserLauncher> {
    pool: &'a BrowserPool<L>,
    rx: oneshot::Receiver<Grant<L::Browser>>,
    received: bool,
}

impl<L: BrowserLauncher> PendingGrant<'_, L> {
    async fn recv(&mut self) -> std::result::Result<Grant<L::Browser>, oneshot::error::RecvError> {
        let result = (&mut self.rx).await;
        self.received = true;
        result
    }
}

impl<L: BrowserLauncher> Drop for PendingGrant<'_, L> {
    fn drop(&mut self) {
        if self.received {
            return;
        }
        // no send can land after close, so try_recv sees the final state
        self.rx.close();
        match self.rx.try_recv() {
            Ok(Grant::Entry(entry)) => {
                tracing::debug!("Waiter left before taking browser #{}", entry.id);
                if let Err(e) = self.pool.release(entry) {
                    tracing::error!("Returning unclaimed browser failed: {}", e);
                }
            }
            Ok(Grant::Slot) => {
                let mut state = self.pool.inner.lock();
                state.constructing -= 1;
                state.offer_slot();
            }
            Err(_) => {}
        }
    }
}

/// A checked-out browser that goes back to the pool when dropped.
pub struct PoolLease<L: BrowserLauncher> {
    pool: BrowserPool<L>,
    entry: Option<PoolEntry<L::Browser>>,
}

impl<L: BrowserLauncher> PoolLease<L> {
    /// The leased browser, or `None` once released.
    pub fn browser(&self) -> Option<&L::Browser> {
        self.entry.as_ref().map(PoolEntry::browser)
    }

    pub fn mark_dead(&mut self) {
        if let Some(entry) = self.entry.as_mut() {
            entry.mark_dead();
        }
    }

    /// Give the browser back now instead of at drop.
    pub fn release(mut self) -> Result<()> {
        match self.entry.take() {
            Some(entry) => self.pool.release(entry),
            None => Ok(()),
        }
    }
}

impl<L: BrowserLauncher> Drop for PoolLease<L> {
    fn drop(&mut self) {
        if let Some(entry) = self.entry.take() {
            if let Err(e) = self.pool.release(entry) {
                tracing::error!("Releasing leased browser failed: {}", e);
            }
        }
    }
}
