//! Simulator adapters: the expensive models surrogates are trained against.
//!
//! The core only depends on the [`Simulator`] trait (one scalar response per design
//! point) and on [`connector::run_single`] for one-off stateful runs.

#![allow(missing_docs)]

pub mod batch;
pub mod connector;
pub mod islands;
pub mod life;
pub mod synthetic;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::core::errors::Result;
use crate::core::space::DesignPoint;

/// A model mapping one design point to one scalar response.
pub trait Simulator: Sync {
    /// Human-readable model name for logs and errors.
    fn name(&self) -> &str;

    /// Number of coordinates each design point must carry.
    fn dimensions(&self) -> usize;

    /// Run the model once at `point`.
    fn evaluate(&self, point: &[f64]) -> Result<f64>;

    /// Evaluate a batch sequentially, preserving input order.
    fn evaluate_batch(&self, points: &[DesignPoint]) -> Result<Vec<f64>> {
        batch::BatchEvaluator::sequential("batch").run(self, points)
    }
}

/// Per-point RNG: a fixed base seed combined with the point's coordinates, so a
/// point's run does not depend on batch order or worker scheduling.
pub(crate) fn point_rng(base_seed: Option<u64>, point: &[f64]) -> StdRng {
    let Some(base) = base_seed else {
        return StdRng::from_rng(&mut rand::rng());
    };
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325 ^ base;
    for value in point {
        for byte in value.to_bits().to_le_bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
    }
    StdRng::seed_from_u64(hash)
}
