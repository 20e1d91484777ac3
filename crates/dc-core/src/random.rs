//! Random sources for symbol draws and step jitter
//!
//! The engine only ever needs uniform integers below a bound and uniform
//! doubles in `[0, 1)`. Keeping that behind a trait lets tests script exact
//! draw sequences.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// Uniform random source
pub trait RandomSource: Send {
    /// Uniform integer in `[0, bound)`. Returns 0 when `bound` is 0.
    fn next_int(&mut self, bound: usize) -> usize;

    /// Uniform double in `[0, 1)`
    fn next_double(&mut self) -> f64;
}

/// OS-seeded standard generator
pub struct DefaultRandomSource {
    rng: StdRng,
}

impl DefaultRandomSource {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }
}

impl Default for DefaultRandomSource {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for DefaultRandomSource {
    fn next_int(&mut self, bound: usize) -> usize {
        if bound == 0 {
            return 0;
        }
        self.rng.random_range(0..bound)
    }

    fn next_double(&mut self) -> f64 {
        self.rng.random::<f64>()
    }
}

/// Reproducible generator for replays (`--seed`)
pub struct SeededRandomSource {
    rng: ChaCha8Rng,
    seed: u64,
}

impl SeededRandomSource {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl RandomSource for SeededRandomSource {
    fn next_int(&mut self, bound: usize) -> usize {
        if bound == 0 {
            return 0;
        }
        self.rng.random_range(0..bound)
    }

    fn next_double(&mut self) -> f64 {
        self.rng.random::<f64>()
    }
}

/// Replays a fixed list of integers, cycling when exhausted.
///
/// Each value is reduced modulo the requested bound so a script never yields
/// an out-of-range index.
#[derive(Debug, Clone)]
pub struct ScriptedRandomSource {
    values: Vec<usize>,
    cursor: usize,
}

impl ScriptedRandomSource {
    pub fn new(values: impl Into<Vec<usize>>) -> Self {
        Self {
            values: values.into(),
            cursor: 0,
        }
    }

    /// Source that always yields the same value
    pub fn constant(value: usize) -> Self {
        Self::new(vec![value])
    }

    /// How many draws have been taken
    pub fn draws(&self) -> usize {
        self.cursor
    }

    fn next_raw(&mut self) -> usize {
        if self.values.is_empty() {
            return 0;
        }
        let value = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        value
    }
}

impl RandomSource for ScriptedRandomSource {
    fn next_int(&mut self, bound: usize) -> usize {
        if bound == 0 {
            return 0;
        }
        self.next_raw() % bound
    }

    fn next_double(&mut self) -> f64 {
        // Scripted doubles are only used for jitter; keep them deterministic
        let raw = self.next_raw();
        (raw % 1000) as f64 / 1000.0
    }
}

impl<R: RandomSource + ?Sized> RandomSource for Box<R> {
    fn next_int(&mut self, bound: usize) -> usize {
        (**self).next_int(bound)
    }

    fn next_double(&mut self) -> f64 {
        (**self).next_double()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_source_in_range() {
        let mut source = DefaultRandomSource::new();
        for _ in 0..1000 {
            assert!(source.next_int(6) < 6);
            let d = source.next_double();
            assert!((0.0..1.0).contains(&d));
        }
        assert_eq!(source.next_int(0), 0);
    }

    #[test]
    fn test_seeded_determinism() {
        let mut a = SeededRandomSource::new(42);
        let mut b = SeededRandomSource::new(42);
        let xs: Vec<usize> = (0..32).map(|_| a.next_int(8)).collect();
        let ys: Vec<usize> = (0..32).map(|_| b.next_int(8)).collect();
        assert_eq!(xs, ys);
        assert_eq!(a.seed(), 42);
    }

    #[test]
    fn test_scripted_cycles_and_wraps() {
        let mut source = ScriptedRandomSource::new(vec![1, 5, 9]);
        assert_eq!(source.next_int(4), 1);
        assert_eq!(source.next_int(4), 1); // 5 % 4
        assert_eq!(source.next_int(10), 9);
        assert_eq!(source.next_int(10), 1); // cycles
        assert_eq!(source.draws(), 4);
    }

    #[test]
    fn test_scripted_empty_script() {
        let mut source = ScriptedRandomSource::new(Vec::new());
        assert_eq!(source.next_int(3), 0);
        assert_eq!(source.next_double(), 0.0);
    }
}
