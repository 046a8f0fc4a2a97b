//! The bundle of host-injected services every Universe is constructed with.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use uuid::Uuid;

/// A monotonic wall-clock source, in seconds since an arbitrary epoch.
pub trait Clock: Send + Sync {
    fn now(&self) -> f64;
}

/// The system wall clock, via `SystemTime`.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64()
    }
}

/// A deterministic clock for tests, advanced explicitly.
#[derive(Debug, Default)]
pub struct FakeClock {
    seconds: AtomicU64,
}

impl FakeClock {
    pub fn new(start: f64) -> Self {
        FakeClock {
            seconds: AtomicU64::new(start.to_bits()),
        }
    }

    pub fn advance(&self, delta: f64) {
        let current = f64::from_bits(self.seconds.load(Ordering::SeqCst));
        self.seconds
            .store((current + delta).to_bits(), Ordering::SeqCst);
    }
}

impl Clock for FakeClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.seconds.load(Ordering::SeqCst))
    }
}

/// Source of randomness, returning an unsigned integer plus its declared
/// maximum (`max + 1` must not overflow, so `[0, 1)` scaling stays
/// well-defined for callers that need a float in that range).
pub trait Rng: Send + Sync {
    fn next_u64(&self) -> u64;
    fn max(&self) -> u64;

    /// Scales the next random value into `[0, 1)`.
    fn next_unit(&self) -> f64 {
        (self.next_u64() as f64) / ((self.max() as f64) + 1.0)
    }

    /// Generates a fresh v4 UUID using this source for all random bits.
    fn next_uuid(&self) -> Uuid {
        let mut bytes = [0u8; 16];
        for chunk in bytes.chunks_mut(8) {
            let v = self.next_u64().to_le_bytes();
            chunk.copy_from_slice(&v[..chunk.len()]);
        }
        bytes[6] = (bytes[6] & 0x0F) | 0x40;
        bytes[8] = (bytes[8] & 0x3F) | 0x80;
        Uuid::from_bytes(bytes)
    }
}

/// Default RNG, backed by `ChaCha20Rng` seeded from the OS at construction.
pub struct DefaultRng {
    inner: Mutex<ChaCha20Rng>,
}

impl DefaultRng {
    pub fn new() -> Self {
        DefaultRng {
            inner: Mutex::new(ChaCha20Rng::from_entropy()),
        }
    }

    pub fn from_seed(seed: u64) -> Self {
        DefaultRng {
            inner: Mutex::new(ChaCha20Rng::seed_from_u64(seed)),
        }
    }
}

impl Default for DefaultRng {
    fn default() -> Self {
        DefaultRng::new()
    }
}

impl Rng for DefaultRng {
    fn next_u64(&self) -> u64 {
        self.inner.lock().next_u64()
    }

    fn max(&self) -> u64 {
        u64::MAX
    }
}

/// Opaque lock handle obtained from a `LockFactory`. Dropping it releases
/// any lock it currently holds.
pub trait Lock: Send + Sync {
    fn lock(&self);
    fn unlock(&self);
}

/// Creates device-level mutexes. Models SPEC_FULL.md §9's
/// "mutex injection with no-op fallback" as two concrete implementations
/// rather than a `{CREATE,DESTROY,LOCK,UNLOCK}` dispatch enum: a real
/// `parking_lot`-backed lock, and a pure no-op for hosts that forbid
/// threads.
pub trait LockFactory: Send + Sync {
    fn create(&self) -> Box<dyn Lock>;
}

struct ThreadedLock {
    mutex: Mutex<()>,
}

impl Lock for ThreadedLock {
    fn lock(&self) {
        std::mem::forget(self.mutex.lock());
    }

    fn unlock(&self) {
        // SAFETY-free by construction: parking_lot's raw mutex exposes
        // unlock without requiring the guard, which a single-threaded or
        // cooperatively-scheduled caller can pair with `lock` above.
        unsafe {
            self.mutex.force_unlock();
        }
    }
}

/// Default lock factory: every `create()` returns an independent
/// `parking_lot` mutex.
#[derive(Debug, Default)]
pub struct ThreadedLockFactory;

impl LockFactory for ThreadedLockFactory {
    fn create(&self) -> Box<dyn Lock> {
        Box::new(ThreadedLock {
            mutex: Mutex::new(()),
        })
    }
}

struct NoOpLock;

impl Lock for NoOpLock {
    fn lock(&self) {}
    fn unlock(&self) {}
}

/// No-op lock factory for single-threaded hosts.
#[derive(Debug, Default)]
pub struct NoOpLockFactory;

impl LockFactory for NoOpLockFactory {
    fn create(&self) -> Box<dyn Lock> {
        Box::new(NoOpLock)
    }
}

/// The bundle injected at Universe construction and copied by value into
/// every child. It has no lifecycle of its own: it is just shared
/// references to the clock, RNG, and lock factory a host wants to use.
#[derive(Clone)]
pub struct Context {
    pub clock: Arc<dyn Clock>,
    pub rng: Arc<dyn Rng>,
    pub locks: Arc<dyn LockFactory>,
}

impl Context {
    pub fn new(clock: Arc<dyn Clock>, rng: Arc<dyn Rng>, locks: Arc<dyn LockFactory>) -> Self {
        Context { clock, rng, locks }
    }

    /// A context with real system time, real randomness, and real mutexes.
    pub fn threaded() -> Self {
        Context {
            clock: Arc::new(SystemClock),
            rng: Arc::new(DefaultRng::new()),
            locks: Arc::new(ThreadedLockFactory),
        }
    }

    /// A context suited to single-threaded embedding: still uses real time
    /// and randomness, but locks are pure no-ops.
    pub fn single_threaded() -> Self {
        Context {
            clock: Arc::new(SystemClock),
            rng: Arc::new(DefaultRng::new()),
            locks: Arc::new(NoOpLockFactory),
        }
    }

    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    pub fn new_address(&self) -> String {
        self.rng.next_uuid().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_clock_advances() {
        let clock = FakeClock::new(10.0);
        assert_eq!(clock.now(), 10.0);
        clock.advance(5.0);
        assert_eq!(clock.now(), 15.0);
    }

    #[test]
    fn rng_unit_stays_in_bounds() {
        let rng = DefaultRng::from_seed(42);
        for _ in 0..100 {
            let v = rng.next_unit();
            assert!(v >= 0.0 && v < 1.0);
        }
    }

    #[test]
    fn generated_addresses_are_unique() {
        let rng = DefaultRng::from_seed(7);
        let a = rng.next_uuid();
        let b = rng.next_uuid();
        assert_ne!(a, b);
    }
}
