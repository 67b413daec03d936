use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex, PoisonError,
};

/// Injected source of randomness for simulated outcomes and latencies.
///
pub trait RandomSource: Send + Sync {
    /// Uniform draw in `[0, 1)`.
    fn next_f64(&self) -> f64;

    /// `true` with the given probability.
    fn chance(&self, probability: f64) -> bool {
        self.next_f64() < probability
    }

    /// Uniform draw in `[min, max)`.
    fn between(&self, min: f64, max: f64) -> f64 {
        min + (max - min) * self.next_f64()
    }
}

/// Per-thread OS-seeded generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_f64(&self) -> f64 {
        rand::rng().random::<f64>()
    }
}

/// Reproducible generator for demos and statistical tests.
#[derive(Debug)]
pub struct SeededRandom(Mutex<StdRng>);

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self(Mutex::new(StdRng::seed_from_u64(seed)))
    }
}

impl RandomSource for SeededRandom {
    fn next_f64(&self) -> f64 {
        let mut rng = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        rng.random::<f64>()
    }
}

/// Replays a fixed sequence of draws, wrapping around at the end.
///
/// Lets tests pick exactly which branch every simulated decision takes.
///
#[derive(Debug)]
pub struct ScriptedRandom {
    draws: Vec<f64>,
    cursor: AtomicUsize,
}

impl ScriptedRandom {
    /// # Panics
    ///
    /// Panics if `draws` is empty.
    pub fn new(draws: impl Into<Vec<f64>>) -> Self {
        let draws = draws.into();
        assert!(!draws.is_empty(), "scripted random needs at least one draw");
        Self {
            draws,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Number of draws consumed so far.
    pub fn consumed(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }
}

impl RandomSource for ScriptedRandom {
    fn next_f64(&self) -> f64 {
        let i = self.cursor.fetch_add(1, Ordering::SeqCst);
        self.draws[i % self.draws.len()]
    }
}

/// Seeded generator when a seed is configured, thread generator otherwise.
pub fn from_seed(seed: Option<u64>) -> Arc<dyn RandomSource> {
    match seed {
        Some(seed) => Arc::new(SeededRandom::new(seed)),
        None => Arc::new(ThreadRandom),
    }
}
