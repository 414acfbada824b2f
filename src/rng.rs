//! Random number source.
//!
//! The simulator never touches a concrete PRNG directly; it draws from a
//! [`RandomSource`] trait object instead, so that production code can plug in
//! a seeded [`rand`] generator and tests can plug in a fixed, fully
//! deterministic stream of uniform variates.

use rand::Rng;
use rand_distr::{Distribution, Poisson};

/// A replaceable stream of `Uniform(0, 1)` variates.
pub trait RandomSource {
    /// A uniform draw in `[0, 1)`.
    fn next_uniform(&mut self) -> f64;

    /// A uniform integer draw in `[1, n]`.
    fn next_uniform_index(&mut self, n: u64) -> u64 {
        debug_assert!(n > 0);
        (self.next_uniform() * n as f64).floor() as u64 + 1
    }

    /// A standard (rate-1) exponential draw.
    fn next_exponential(&mut self) -> f64 {
        -(1.0 - self.next_uniform()).ln()
    }

    /// A Poisson draw with mean `lambda >= 0`.
    fn next_poisson(&mut self, lambda: f64) -> u64;
}

/// Production [`RandomSource`] backed by any [`rand::RngCore`] implementation.
pub struct RngSource<R> {
    rng: R,
}

impl<R: Rng> RngSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> RandomSource for RngSource<R> {
    fn next_uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    fn next_poisson(&mut self, lambda: f64) -> u64 {
        if lambda <= 0.0 {
            return 0;
        }
        let dist = Poisson::new(lambda).expect("lambda must be finite and positive");
        dist.sample(&mut self.rng) as u64
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::RandomSource;

    /// A deterministic, replayable stream of uniform variates for tests.
    pub struct MockRng {
        values: Vec<f64>,
        pos: usize,
    }

    impl MockRng {
        pub fn new(values: Vec<f64>) -> Self {
            Self { values, pos: 0 }
        }
    }

    impl RandomSource for MockRng {
        fn next_uniform(&mut self) -> f64 {
            let v = self.values[self.pos % self.values.len()];
            self.pos += 1;
            v
        }

        fn next_poisson(&mut self, lambda: f64) -> u64 {
            lambda.round() as u64
        }
    }
}

#[cfg(test)]
mod test {
    use super::mock::MockRng;
    use super::*;

    #[test]
    fn mock_replays_in_order() {
        let mut m = MockRng::new(vec![0.0, 0.5, 0.99]);
        assert_eq!(m.next_uniform(), 0.0);
        assert_eq!(m.next_uniform(), 0.5);
        assert_eq!(m.next_uniform(), 0.99);
        assert_eq!(m.next_uniform(), 0.0);
    }

    #[test]
    fn uniform_index_is_in_range() {
        let mut m = MockRng::new(vec![0.0, 0.999]);
        assert_eq!(m.next_uniform_index(5), 1);
        assert_eq!(m.next_uniform_index(5), 5);
    }
}
