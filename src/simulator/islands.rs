//! Islands model of endogenous growth with locally interacting agents.
//!
//! Agents live on a 2-D lattice "sea" dotted with islands of technological
//! opportunity. Each period:
//! 1. miners on island `j` jointly produce `s_j * m_j^alpha`;
//! 2. a miner leaves to explore with probability `eps`, otherwise it samples a peer
//!    and, if the peer's island yields more per capita, sails there with
//!    probability `exp(-rho * distance)`;
//! 3. explorers random-walk; stepping onto a known island they mine it, onto an
//!    empty cell they discover a new island with probability `pi`, whose
//!    productivity is `(1 + W) * (|x| + |y|) + phi * s_origin`, `W ~ Poisson(lambda)`;
//! 4. imitators arrive after travelling the Manhattan distance.
//!
//! The response is the average log growth rate of GDP over the horizon.

#![allow(missing_docs)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]

use std::collections::HashMap;

use rand::Rng;
use rand_distr::{Distribution, Poisson};
use serde::Serialize;

use crate::core::config::IslandsConfig;
use crate::core::errors::{AsbError, Result};
use crate::simulator::{Simulator, point_rng};

/// The five calibrated behavioural parameters, in design-point order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IslandsParams {
    /// Locality of imitation signals.
    pub rho: f64,
    /// Returns to agglomeration on an island.
    pub alpha: f64,
    /// Knowledge carried from the origin island to a new discovery.
    pub phi: f64,
    /// Probability an explorer discovers an island on an empty cell.
    pub pi: f64,
    /// Per-period propensity of a miner to explore.
    pub eps: f64,
}

impl IslandsParams {
    pub fn from_point(point: &[f64]) -> Result<Self> {
        let &[rho, alpha, phi, pi, eps] = point else {
            return Err(AsbError::DimensionMismatch {
                context: "islands parameters",
                expected: 5,
                actual: point.len(),
                index: 0,
            });
        };
        if point.iter().any(|v| !v.is_finite()) {
            return Err(AsbError::InvalidInput {
                details: format!("islands parameters must be finite, got {point:?}"),
            });
        }
        Ok(Self {
            rho,
            alpha,
            phi,
            pi,
            eps,
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct Island {
    x: i64,
    y: i64,
    productivity: f64,
}

#[derive(Debug, Clone, Copy)]
enum Agent {
    Miner { island: usize },
    Explorer { x: i64, y: i64, origin_productivity: f64 },
    Imitator { island: usize, remaining: i64 },
}

/// Terminal state of one islands run.
#[derive(Debug, Clone, Serialize)]
pub struct IslandsOutcome {
    /// GDP per period.
    pub gdp: Vec<f64>,
    pub islands_discovered: usize,
    pub miners: usize,
    pub explorers: usize,
}

impl IslandsOutcome {
    /// Average per-period growth of `ln(1 + GDP)`.
    #[must_use]
    pub fn growth_rate(&self) -> f64 {
        match (self.gdp.first(), self.gdp.last()) {
            (Some(first), Some(last)) if self.gdp.len() > 1 => {
                (last.ln_1p() - first.ln_1p()) / (self.gdp.len() - 1) as f64
            }
            _ => 0.0,
        }
    }
}

/// Simulator adapter for the islands model.
#[derive(Debug, Clone)]
pub struct IslandsModel {
    config: IslandsConfig,
}

impl IslandsModel {
    #[must_use]
    pub const fn new(config: IslandsConfig) -> Self {
        Self { config }
    }

    /// Run the model for `periods` steps.
    pub fn simulate<R: Rng + ?Sized>(
        &self,
        params: &IslandsParams,
        periods: usize,
        rng: &mut R,
    ) -> IslandsOutcome {
        let jump = Poisson::new(self.config.lambda).ok();
        let mut islands = vec![Island {
            x: 0,
            y: 0,
            productivity: 1.0,
        }];
        let mut lattice: HashMap<(i64, i64), usize> = HashMap::from([((0, 0), 0)]);
        let mut agents = vec![Agent::Miner { island: 0 }; self.config.agents];
        let mut gdp = Vec::with_capacity(periods);

        for _ in 0..periods {
            let mut miners = vec![0usize; islands.len()];
            for agent in &agents {
                if let Agent::Miner { island } = agent {
                    miners[*island] += 1;
                }
            }
            let per_capita: Vec<f64> = islands
                .iter()
                .zip(&miners)
                .map(|(isl, &m)| {
                    if m == 0 {
                        0.0
                    } else {
                        isl.productivity * (m as f64).powf(params.alpha - 1.0)
                    }
                })
                .collect();
            gdp.push(
                per_capita
                    .iter()
                    .zip(&miners)
                    .map(|(&q, &m)| q * m as f64)
                    .sum(),
            );

            let peers: Vec<usize> = agents
                .iter()
                .filter_map(|a| match a {
                    Agent::Miner { island } => Some(*island),
                    _ => None,
                })
                .collect();

            for agent in &mut agents {
                *agent = match *agent {
                    Agent::Miner { island } => {
                        let home = islands[island];
                        if rng.random::<f64>() < params.eps {
                            Agent::Explorer {
                                x: home.x,
                                y: home.y,
                                origin_productivity: home.productivity,
                            }
                        } else {
                            let peer = peers[rng.random_range(0..peers.len())];
                            let distance = manhattan(&home, &islands[peer]);
                            if per_capita[peer] > per_capita[island]
                                && rng.random::<f64>() < (-params.rho * distance as f64).exp()
                            {
                                Agent::Imitator {
                                    island: peer,
                                    remaining: distance,
                                }
                            } else {
                                Agent::Miner { island }
                            }
                        }
                    }
                    Agent::Explorer {
                        x,
                        y,
                        origin_productivity,
                    } => {
                        let (nx, ny) = random_step(x, y, rng);
                        if let Some(&island) = lattice.get(&(nx, ny)) {
                            Agent::Miner { island }
                        } else if rng.random::<f64>() < params.pi {
                            let w = jump.as_ref().map_or(0.0, |p| p.sample(rng));
                            let productivity =
                                (1.0 + w) * (nx.abs() + ny.abs()) as f64 + params.phi * origin_productivity;
                            islands.push(Island {
                                x: nx,
                                y: ny,
                                productivity,
                            });
                            lattice.insert((nx, ny), islands.len() - 1);
                            Agent::Miner {
                                island: islands.len() - 1,
                            }
                        } else {
                            Agent::Explorer {
                                x: nx,
                                y: ny,
                                origin_productivity,
                            }
                        }
                    }
                    Agent::Imitator { island, remaining } => {
                        if remaining <= 1 {
                            Agent::Miner { island }
                        } else {
                            Agent::Imitator {
                                island,
                                remaining: remaining - 1,
                            }
                        }
                    }
                };
            }
        }

        IslandsOutcome {
            gdp,
            islands_discovered: islands.len() - 1,
            miners: agents
                .iter()
                .filter(|a| matches!(a, Agent::Miner { .. }))
                .count(),
            explorers: agents
                .iter()
                .filter(|a| matches!(a, Agent::Explorer { .. }))
                .count(),
        }
    }
}

impl Simulator for IslandsModel {
    fn name(&self) -> &str {
        "islands"
    }

    fn dimensions(&self) -> usize {
        5
    }

    fn evaluate(&self, point: &[f64]) -> Result<f64> {
        let params = IslandsParams::from_point(point)?;
        let mut rng = point_rng(self.config.seed, point);
        Ok(self
            .simulate(&params, self.config.periods, &mut rng)
            .growth_rate())
    }
}

fn manhattan(a: &Island, b: &Island) -> i64 {
    (a.x - b.x).abs() + (a.y - b.y).abs()
}

fn random_step<R: Rng + ?Sized>(x: i64, y: i64, rng: &mut R) -> (i64, i64) {
    match rng.random_range(0..4u8) {
        0 => (x + 1, y),
        1 => (x - 1, y),
        2 => (x, y + 1),
        _ => (x, y - 1),
    }
}
