//! Injected time and randomness.
//!
//! Core logic never reads the wall clock or a thread-local RNG directly, so
//! generation and lifecycle checks are reproducible in tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock with millisecond resolution
#[derive(Debug)]
pub struct FixedClock {
    millis: AtomicI64,
}

impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            millis: AtomicI64::new(at.timestamp_millis()),
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        self.millis.store(at.timestamp_millis(), Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.millis
            .fetch_add(by.num_milliseconds(), Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        let millis = self.millis.load(Ordering::SeqCst);
        DateTime::from_timestamp_millis(millis).unwrap_or_default()
    }
}

/// Shared random source for question sampling
#[derive(Debug)]
pub struct Sampler {
    rng: Mutex<StdRng>,
}

impl Sampler {
    /// Seeded from OS entropy
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic sequence for tests and replays
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn with_rng<R>(&self, f: impl FnOnce(&mut StdRng) -> R) -> R {
        let mut guard = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }

    /// Uniform in-place shuffle
    pub fn shuffle<T>(&self, items: &mut [T]) {
        self.with_rng(|rng| items.shuffle(rng));
    }

    /// Order items by weighted random keys (Efraimidis-Spirakis).
    ///
    /// An item of weight `w` gets key `u^(1/w)`; sorting by descending key is
    /// a weighted sample without replacement. Non-positive weights sort last.
    pub fn weighted_order<T>(&self, items: Vec<(T, f64)>) -> Vec<T> {
        let mut keyed: Vec<(f64, T)> = self.with_rng(|rng| {
            items
                .into_iter()
                .map(|(item, weight)| {
                    let key = if weight > 0.0 {
                        let u: f64 = rng.gen_range(f64::EPSILON..1.0);
                        u.powf(1.0 / weight)
                    } else {
                        -1.0
                    };
                    (key, item)
                })
                .collect()
        });
        keyed.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        keyed.into_iter().map(|(_, item)| item).collect()
    }
}

impl Default for Sampler {
    fn default() -> Self {
        Self::from_entropy()
    }
}
