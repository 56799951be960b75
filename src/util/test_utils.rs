// External imports
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// Internal imports
use crate::lstm::step_1_tensor_preparation::StateVector;

/// `[(i, 2i)]` for `i` in `0..len`
pub fn linear_trajectory(len: usize) -> Vec<StateVector> {
    (0..len).map(|i| [i as f64, 2.0 * i as f64]).collect()
}

/// Phase-shifted closed-form oscillation around (1, 1), shaped like a
/// predator-prey cycle
pub fn oscillating_trajectory(len: usize) -> Vec<StateVector> {
    (0..len)
        .map(|i| {
            let t = i as f64 * 0.1;
            [1.0 + 0.5 * t.sin(), 1.0 + 0.5 * (t + 1.0).cos()]
        })
        .collect()
}

/// Non-negative random states from a seeded generator
pub fn random_trajectory(len: usize, seed: u64) -> Vec<StateVector> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len)
        .map(|_| [rng.random_range(0.0..10.0), rng.random_range(0.0..10.0)])
        .collect()
}
