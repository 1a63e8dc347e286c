//! Wall clock, server clock offset, and monotonic nonces

use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of wall-clock time in Unix milliseconds
pub trait Clock: Send + Sync + fmt::Debug {
    fn now_millis(&self) -> i64;
}

/// The system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default()
    }
}

/// Manually driven clock for tests
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Default)]
pub struct FixedClock {
    now: AtomicI64,
}

#[cfg(any(test, feature = "test-utils"))]
impl FixedClock {
    pub fn new(now_millis: i64) -> Self {
        Self {
            now: AtomicI64::new(now_millis),
        }
    }

    pub fn set(&self, now_millis: i64) {
        self.now.store(now_millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Local clock corrected by the venue's server time
///
/// The offset is measured once when an adapter is built and applied to every
/// timestamp and nonce after that.
#[derive(Debug)]
pub struct VenueClock {
    inner: Arc<dyn Clock>,
    offset_ms: AtomicI64,
}

impl VenueClock {
    pub fn new(inner: Arc<dyn Clock>) -> Self {
        Self {
            inner,
            offset_ms: AtomicI64::new(0),
        }
    }

    /// Record `server - local` from a server-time reading
    pub fn sync_to_server(&self, server_millis: i64) -> i64 {
        let offset = server_millis - self.inner.now_millis();
        self.offset_ms.store(offset, Ordering::SeqCst);
        offset
    }

    pub fn offset_millis(&self) -> i64 {
        self.offset_ms.load(Ordering::SeqCst)
    }

    /// Uncorrected local time
    pub fn local_millis(&self) -> i64 {
        self.inner.now_millis()
    }

    /// Local time shifted onto the server's clock
    pub fn now_millis(&self) -> i64 {
        self.inner.now_millis() + self.offset_millis()
    }
}

/// Strictly increasing nonce source
///
/// Each value is at least the corrected wall clock in milliseconds and always
/// greater than the previous one, even when calls land in the same
/// millisecond or the clock steps backwards.
#[derive(Debug, Default)]
pub struct NonceGenerator {
    last: AtomicU64,
}

impl NonceGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next nonce not below `now`
    pub fn next_after(&self, now: u64) -> u64 {
        let mut prev = self.last.load(Ordering::SeqCst);
        loop {
            let candidate = now.max(prev + 1);
            match self
                .last
                .compare_exchange(prev, candidate, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return candidate,
                Err(actual) => prev = actual,
            }
        }
    }

    /// Millisecond nonce from a venue clock
    pub fn next_millis(&self, clock: &VenueClock) -> u64 {
        self.next_after(clock.now_millis().max(0) as u64)
    }
}
