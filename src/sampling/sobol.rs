//! Sobol low-discrepancy sequence in `[0, 1)^d`.
//!
//! Gray-code construction (Antonov–Saleev): each step flips one direction number
//! per dimension, chosen by the lowest zero bit of the step counter. Direction
//! numbers follow Joe & Kuo (2008) for dimensions 2..=16; dimension 1 is the
//! base-2 Van der Corput sequence.
//!
//! The origin is never emitted. The first point is `(0.5, ..., 0.5)`, the same
//! first row produced by the customary `skip = 1` Sobol generators.

#![allow(missing_docs)]
#![allow(clippy::cast_possible_truncation)]

use crate::core::errors::{AsbError, Result};

/// Maximum supported dimensions.
pub const MAX_DIM: usize = 16;

const BITS: usize = 32;

/// `2^32` as `f64`, the denominator for the fixed-point coordinates.
const SCALE: f64 = 4_294_967_296.0;

/// `DIRECTIONS[dim][bit]` is the direction number for `dim` at bit position `bit`.
static DIRECTIONS: [[u32; BITS]; MAX_DIM] = compute_all_directions();

const fn van_der_corput() -> [u32; BITS] {
    let mut v = [0u32; BITS];
    let mut c = 0usize;
    while c < BITS {
        v[c] = 1u32 << (31 - c as u32);
        c += 1;
    }
    v
}

/// Direction numbers for one dimension from its primitive polynomial.
///
/// `s` is the polynomial degree, `a` encodes the interior coefficients and `m`
/// holds the initial odd integers `m_1..m_s` (zero-padded).
const fn joe_kuo_directions(s: usize, a: u32, m: [u32; 6]) -> [u32; BITS] {
    let mut v = [0u32; BITS];

    let mut c = 0usize;
    while c < s && c < BITS {
        v[c] = m[c] << (31 - c as u32);
        c += 1;
    }

    while c < BITS {
        let mut val = v[c - s] ^ (v[c - s] >> s as u32);
        let mut k = 1usize;
        while k < s {
            if (a >> (s - 1 - k) as u32) & 1 == 1 {
                val ^= v[c - k];
            }
            k += 1;
        }
        v[c] = val;
        c += 1;
    }

    v
}

const fn compute_all_directions() -> [[u32; BITS]; MAX_DIM] {
    let mut dirs = [[0u32; BITS]; MAX_DIM];
    dirs[0] = van_der_corput();
    dirs[1] = joe_kuo_directions(1, 0, [1, 0, 0, 0, 0, 0]);
    dirs[2] = joe_kuo_directions(2, 1, [1, 3, 0, 0, 0, 0]);
    dirs[3] = joe_kuo_directions(3, 1, [1, 3, 1, 0, 0, 0]);
    dirs[4] = joe_kuo_directions(3, 2, [1, 1, 1, 0, 0, 0]);
    dirs[5] = joe_kuo_directions(4, 1, [1, 1, 3, 3, 0, 0]);
    dirs[6] = joe_kuo_directions(4, 4, [1, 3, 5, 13, 0, 0]);
    dirs[7] = joe_kuo_directions(5, 2, [1, 1, 5, 5, 17, 0]);
    dirs[8] = joe_kuo_directions(5, 4, [1, 1, 5, 5, 5, 0]);
    dirs[9] = joe_kuo_directions(5, 7, [1, 1, 7, 11, 19, 0]);
    dirs[10] = joe_kuo_directions(5, 11, [1, 1, 5, 1, 1, 0]);
    dirs[11] = joe_kuo_directions(5, 13, [1, 1, 1, 3, 11, 0]);
    dirs[12] = joe_kuo_directions(5, 14, [1, 3, 5, 5, 31, 0]);
    dirs[13] = joe_kuo_directions(6, 1, [1, 3, 3, 9, 7, 49]);
    dirs[14] = joe_kuo_directions(6, 13, [1, 1, 1, 15, 21, 21]);
    dirs[15] = joe_kuo_directions(6, 16, [1, 3, 1, 13, 27, 49]);
    dirs
}

/// Sobol sequence state for a fixed number of dimensions.
#[derive(Debug, Clone)]
pub struct SobolSequence {
    dim: usize,
    index: u32,
    x: [u32; MAX_DIM],
}

impl SobolSequence {
    pub fn new(dim: usize) -> Result<Self> {
        if !(1..=MAX_DIM).contains(&dim) {
            return Err(AsbError::InvalidConfig {
                details: format!("Sobol design supports 1..={MAX_DIM} dimensions, got {dim}"),
            });
        }
        Ok(Self {
            dim,
            index: 0,
            x: [0u32; MAX_DIM],
        })
    }

    #[must_use]
    pub const fn dim(&self) -> usize {
        self.dim
    }

    /// Points emitted so far.
    #[must_use]
    pub const fn index(&self) -> u32 {
        self.index
    }

    fn advance(&mut self) {
        let c = ((!self.index).trailing_zeros() as usize).min(BITS - 1);
        for (xj, dj) in self.x[..self.dim].iter_mut().zip(&DIRECTIONS) {
            *xj ^= dj[c];
        }
        self.index = self.index.wrapping_add(1);
    }

    /// Advance and return the next point as `f64` coordinates in `[0, 1)`.
    pub fn next_point(&mut self) -> Vec<f64> {
        self.advance();
        self.x[..self.dim]
            .iter()
            .map(|&xj| f64::from(xj) / SCALE)
            .collect()
    }

    /// Discard the next `n` points.
    pub fn skip_points(&mut self, n: u32) {
        for _ in 0..n {
            self.advance();
        }
    }
}

impl Iterator for SobolSequence {
    type Item = Vec<f64>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_point())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn van_der_corput_directions_correct() {
        for (c, dir) in DIRECTIONS[0].iter().enumerate() {
            assert_eq!(*dir, 1u32 << (31 - c as u32));
        }
    }

    #[test]
    fn all_initial_direction_numbers_are_odd_multiples() {
        // v[0] = m_1 << 31 with m_1 = 1 for every dimension.
        for dirs in &DIRECTIONS {
            assert_eq!(dirs[0], 0x8000_0000);
        }
    }

    #[test]
    fn first_point_is_centre() {
        let mut seq = SobolSequence::new(5).unwrap();
        assert_eq!(seq.next_point(), vec![0.5; 5]);
    }

    #[test]
    fn first_seven_points_stratify_each_axis() {
        // After 2^k - 1 points every coordinate projection is {j/8 : j=1..7}.
        let mut seq = SobolSequence::new(MAX_DIM).unwrap();
        let points: Vec<Vec<f64>> = (0..7).map(|_| seq.next_point()).collect();
        for d in 0..MAX_DIM {
            let mut axis: Vec<f64> = points.iter().map(|p| p[d]).collect();
            axis.sort_by(f64::total_cmp);
            for (i, &val) in axis.iter().enumerate() {
                let expected = (i as f64 + 1.0) / 8.0;
                assert!(
                    (val - expected).abs() < 1e-12,
                    "dim {d} point {i}: got {val}, expected {expected}"
                );
            }
        }
    }

    #[test]
    fn points_stay_in_unit_cube() {
        let seq = SobolSequence::new(MAX_DIM).unwrap();
        for p in seq.take(4096) {
            assert!(p.iter().all(|&v| (0.0..1.0).contains(&v)), "{p:?}");
        }
    }

    #[test]
    fn first_points_are_distinct() {
        let seq = SobolSequence::new(5).unwrap();
        let points: Vec<Vec<f64>> = seq.take(512).collect();
        for i in 0..points.len() {
            for j in (i + 1)..points.len() {
                assert_ne!(points[i], points[j], "duplicate at {i},{j}");
            }
        }
    }

    #[test]
    fn skip_matches_manual_advance() {
        let mut skipped = SobolSequence::new(3).unwrap();
        skipped.skip_points(10);
        let mut manual = SobolSequence::new(3).unwrap();
        for _ in 0..10 {
            manual.next_point();
        }
        assert_eq!(skipped.index(), 10);
        assert_eq!(skipped.next_point(), manual.next_point());
    }

    #[test]
    fn deterministic_across_instances() {
        let a: Vec<Vec<f64>> = SobolSequence::new(4).unwrap().take(64).collect();
        let b: Vec<Vec<f64>> = SobolSequence::new(4).unwrap().take(64).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn unsupported_dimensions_rejected() {
        assert!(SobolSequence::new(0).is_err());
        assert!(SobolSequence::new(MAX_DIM + 1).is_err());
    }
}
