//! One-off named model runs that report the terminal state.

#![allow(missing_docs)]
#![allow(clippy::cast_precision_loss)]

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::config::SimulatorConfig;
use crate::core::errors::{AsbError, Result};
use crate::simulator::islands::{IslandsModel, IslandsParams};
use crate::simulator::life::{GameOfLife, cells_from};
use crate::simulator::point_rng;

/// Terminal-state metrics of a single named run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub model: String,
    pub horizon: usize,
    pub metrics: BTreeMap<String, f64>,
}

impl RunSummary {
    #[must_use]
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }
}

/// Models reachable by display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NamedModel {
    GameOfLife,
    Islands,
}

impl NamedModel {
    fn resolve(name: &str) -> Option<Self> {
        let folded: String = name
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();
        match folded.as_str() {
            "gameoflife" => Some(Self::GameOfLife),
            "islands" => Some(Self::Islands),
            _ => None,
        }
    }
}

/// Runs models by name with the fixed knobs of a [`SimulatorConfig`].
#[derive(Debug, Clone)]
pub struct Connector {
    config: SimulatorConfig,
}

impl Connector {
    #[must_use]
    pub const fn new(config: SimulatorConfig) -> Self {
        Self { config }
    }

    /// Run `model_name` for `horizon` periods and summarise its last period.
    pub fn run_single(
        &self,
        model_name: &str,
        horizon: usize,
        parameters: &BTreeMap<String, f64>,
    ) -> Result<RunSummary> {
        let model = NamedModel::resolve(model_name).ok_or_else(|| AsbError::UnknownModel {
            name: model_name.to_string(),
        })?;
        let seed_key: Vec<f64> = parameters.values().copied().collect();

        let metrics = match model {
            NamedModel::GameOfLife => {
                let size = cells_from(required(parameters, "gridSize")?, "gridSize")?;
                let mut life = self.config.life.clone();
                if let Some(&pct) = parameters.get("x") {
                    if !(0.0..=100.0).contains(&pct) {
                        return Err(AsbError::InvalidInput {
                            details: format!("x must be a live-cell percentage in [0, 100], got {pct}"),
                        });
                    }
                    life.initial_density_pct = pct;
                }
                let mut rng = point_rng(life.seed, &seed_key);
                let summary = GameOfLife::new(life).run(size, size, horizon, &mut rng);
                BTreeMap::from([
                    ("grid_size".to_string(), summary.grid_size as f64),
                    ("initial_alive".to_string(), summary.initial_alive as f64),
                    ("alive".to_string(), summary.final_alive as f64),
                    ("peak_alive".to_string(), summary.peak_alive as f64),
                    ("density".to_string(), summary.final_density),
                ])
            }
            NamedModel::Islands => {
                let point = ["rho", "alpha", "phi", "pi", "eps"]
                    .iter()
                    .map(|name| required(parameters, name))
                    .collect::<Result<Vec<f64>>>()?;
                let params = IslandsParams::from_point(&point)?;
                let mut rng = point_rng(self.config.islands.seed, &seed_key);
                let outcome =
                    IslandsModel::new(self.config.islands.clone()).simulate(&params, horizon, &mut rng);
                BTreeMap::from([
                    ("gdp".to_string(), outcome.gdp.last().copied().unwrap_or(0.0)),
                    ("growth_rate".to_string(), outcome.growth_rate()),
                    ("islands_discovered".to_string(), outcome.islands_discovered as f64),
                    ("miners".to_string(), outcome.miners as f64),
                    ("explorers".to_string(), outcome.explorers as f64),
                ])
            }
        };

        Ok(RunSummary {
            model: model_name.to_string(),
            horizon,
            metrics,
        })
    }
}

/// Run a named model with default simulator knobs.
pub fn run_single(
    model_name: &str,
    horizon: usize,
    parameters: &BTreeMap<String, f64>,
) -> Result<RunSummary> {
    Connector::new(SimulatorConfig::default()).run_single(model_name, horizon, parameters)
}

fn required(parameters: &BTreeMap<String, f64>, name: &str) -> Result<f64> {
    parameters
        .get(name)
        .copied()
        .ok_or_else(|| AsbError::InvalidInput {
            details: format!("missing model parameter {name:?}"),
        })
}
