//! Training designs and out-of-sample candidate pools.
//!
//! Both samplers draw in `[0, 1)^D` and map each coordinate affinely into the
//! parameter space, so every returned point lies inside the hyper-rectangle.

#![allow(missing_docs)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::core::errors::Result;
use crate::core::space::{DesignPoint, ParameterSpace};
use crate::sampling::sobol::SobolSequence;

/// Quasi-random training design of `count` points.
///
/// `skip` discards that many Sobol points after the origin before sampling.
pub fn generate_design(space: &ParameterSpace, count: usize, skip: u32) -> Result<Vec<DesignPoint>> {
    let mut sequence = SobolSequence::new(space.dimensions())?;
    sequence.skip_points(skip);
    sequence
        .take(count)
        .map(|raw| space.scale(&raw))
        .collect()
}

/// Uniform random candidate pool of `count` points.
pub fn generate_candidate_pool<R: Rng + ?Sized>(
    space: &ParameterSpace,
    count: usize,
    rng: &mut R,
) -> Vec<DesignPoint> {
    candidate_stream(space, rng).take(count).collect()
}

/// Unbounded stream of uniform candidates; draws happen only as points are pulled.
pub fn candidate_stream<'a, R: Rng + ?Sized>(
    space: &'a ParameterSpace,
    rng: &'a mut R,
) -> impl Iterator<Item = DesignPoint> + 'a {
    std::iter::repeat_with(move || {
        space
            .parameters()
            .iter()
            .map(|p| p.bounds.scale(rng.random::<f64>()))
            .collect()
    })
}

/// Randomness source for the candidate pool: seeded when the caller asks for it.
#[must_use]
pub fn sampler_rng(seed: Option<u64>) -> StdRng {
    seed.map_or_else(
        || StdRng::from_rng(&mut rand::rng()),
        StdRng::seed_from_u64,
    )
}
