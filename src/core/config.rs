//! Configuration system: TOML file + env var overrides + experiment defaults.

#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{AsbError, Result};
use crate::core::space::ParameterSpace;
use crate::sampling::sobol::MAX_DIM;

/// Full benchmark configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub experiment: ExperimentConfig,
    pub simulator: SimulatorConfig,
    pub surrogates: SurrogatesConfig,
    pub secondary: SecondaryRunConfig,
    pub data: DataConfig,
    pub report: ReportConfig,
}

/// Which simulator the benchmark trains surrogates against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Islands,
    GameOfLife,
    Synthetic,
}

impl ModelKind {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Islands => "islands",
            Self::GameOfLife => "game_of_life",
            Self::Synthetic => "synthetic",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "islands" => Some(Self::Islands),
            "game_of_life" | "life" | "gol" => Some(Self::GameOfLife),
            "synthetic" | "linear" => Some(Self::Synthetic),
            _ => None,
        }
    }
}

/// Budget, test-set and Monte Carlo sizing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Number of true simulator evaluations in the training design.
    pub budget: usize,
    /// Points per Monte Carlo trial.
    pub test_size: usize,
    /// Number of Monte Carlo trials.
    pub monte_carlos: usize,
    /// Candidate pool size is `final_test_size * pool_multiplier`; defaults to the budget.
    pub pool_multiplier: Option<usize>,
    /// Seed for the uniform candidate pool. `None` draws from the OS.
    pub seed: Option<u64>,
    /// Extra Sobol points to skip after the origin.
    pub sobol_skip: u32,
    pub model: ModelKind,
    /// Explicit parameter bounds; `None` uses the model's built-in support.
    pub bounds: Option<ParameterSpace>,
}

/// Simulator knobs that are fixed for the whole experiment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Worker threads for batch evaluation (1 = sequential).
    pub parallelism: usize,
    pub islands: IslandsConfig,
    pub life: LifeConfig,
    /// Dimension of the synthetic linear response.
    pub synthetic_dimensions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IslandsConfig {
    pub agents: usize,
    pub periods: usize,
    /// Mean of the Poisson productivity jump on newly discovered islands.
    pub lambda: f64,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LifeConfig {
    pub periods: usize,
    /// Share of live cells in the initial soup, in percent.
    pub initial_density_pct: f64,
    pub seed: Option<u64>,
}

/// Surrogate hyperparameters. These are fixed, not tuned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct SurrogatesConfig {
    pub kriging: KrigingConfig,
    pub boosting: BoostingConfig,
    /// Also benchmark an ordinary-least-squares linear surrogate.
    pub include_linear: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct KrigingConfig {
    /// Smallest length-scale (in unit-scaled input space) on the likelihood grid.
    pub length_scale_min: f64,
    pub length_scale_max: f64,
    pub grid_points: usize,
    /// Diagonal jitter added to the correlation matrix.
    pub nugget: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BoostingConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_child_weight: f64,
    /// L2 penalty on leaf weights.
    pub lambda: f64,
    /// Minimum gain required to split.
    pub gamma: f64,
    /// Row subsampling ratio per tree.
    pub subsample: f64,
    pub seed: u64,
}

/// The one-off single run of a secondary model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SecondaryRunConfig {
    pub enabled: bool,
    pub model: String,
    pub horizon: usize,
    pub parameters: BTreeMap<String, f64>,
}

/// Whether datasets are produced fresh or read back from a previous run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataMode {
    Generate,
    Cached,
}

impl DataMode {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Generate => "generate",
            Self::Cached => "cached",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DataConfig {
    pub mode: DataMode,
    /// Directory read in cached mode.
    pub input_dir: PathBuf,
    /// Directory the four datasets are written to after generation.
    pub output_dir: PathBuf,
    pub persist: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReportConfig {
    pub output_dir: PathBuf,
    pub plot: bool,
    pub activity_log: PathBuf,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            budget: 500,
            test_size: 100,
            monte_carlos: 100,
            pool_multiplier: None,
            seed: None,
            sobol_skip: 0,
            model: ModelKind::Islands,
            bounds: None,
        }
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            parallelism: std::thread::available_parallelism().map_or(1, |n| n.get()),
            islands: IslandsConfig::default(),
            life: LifeConfig::default(),
            synthetic_dimensions: 5,
        }
    }
}

impl Default for IslandsConfig {
    fn default() -> Self {
        Self {
            agents: 50,
            periods: 100,
            lambda: 1.0,
            seed: None,
        }
    }
}

impl Default for LifeConfig {
    fn default() -> Self {
        Self {
            periods: 100,
            initial_density_pct: 35.0,
            seed: None,
        }
    }
}

impl Default for KrigingConfig {
    fn default() -> Self {
        Self {
            length_scale_min: 0.01,
            length_scale_max: 10.0,
            grid_points: 25,
            nugget: 1e-10,
        }
    }
}

impl Default for BoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.3,
            max_depth: 6,
            min_child_weight: 1.0,
            lambda: 1.0,
            gamma: 0.0,
            subsample: 1.0,
            seed: 0,
        }
    }
}

impl Default for SecondaryRunConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: "Game of Life".to_string(),
            horizon: 100,
            parameters: BTreeMap::from([("gridSize".to_string(), 300.0), ("x".to_string(), 100.0)]),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            mode: DataMode::Generate,
            input_dir: PathBuf::from("asb-data").join("input"),
            output_dir: PathBuf::from("asb-data").join("output"),
            persist: true,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("asb-data").join("plots"),
            plot: true,
            activity_log: PathBuf::from("asb-data").join("activity.jsonl"),
        }
    }
}

impl ExperimentConfig {
    /// Total out-of-sample points: `test_size * monte_carlos`.
    pub fn final_test_size(&self) -> Result<usize> {
        self.test_size
            .checked_mul(self.monte_carlos)
            .ok_or_else(|| AsbError::InvalidConfig {
                details: "experiment.test_size * monte_carlos overflows".to_string(),
            })
    }

    /// Number of uniform candidates drawn before deduplication.
    pub fn pool_size(&self) -> Result<usize> {
        let multiplier = self.pool_multiplier.unwrap_or(self.budget);
        self.final_test_size()?
            .checked_mul(multiplier)
            .ok_or_else(|| AsbError::InvalidConfig {
                details: format!(
                    "candidate pool size overflows (final_test_size * {multiplier})"
                ),
            })
    }
}

impl Config {
    /// Default configuration path (`./asb.toml`).
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathBuf::from("asb.toml")
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| AsbError::io(&path_buf, source))?;
            toml::from_str::<Self>(&raw)?
        } else if path.is_some() {
            return Err(AsbError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.apply_env_overrides_from(env_var)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parameter space for the configured model, honoring explicit bounds.
    pub fn space(&self) -> Result<ParameterSpace> {
        if let Some(bounds) = &self.experiment.bounds {
            return Ok(bounds.clone());
        }
        match self.experiment.model {
            ModelKind::Islands => Ok(ParameterSpace::islands()),
            ModelKind::GameOfLife => Ok(ParameterSpace::game_of_life()),
            ModelKind::Synthetic => ParameterSpace::unit_cube(self.simulator.synthetic_dimensions),
        }
    }

    /// Deterministic hash of the effective config for the activity log.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        // experiment
        if let Some(raw) = lookup("ASB_EXPERIMENT_BUDGET") {
            self.experiment.budget = parse_env("ASB_EXPERIMENT_BUDGET", &raw)?;
        }
        if let Some(raw) = lookup("ASB_EXPERIMENT_TEST_SIZE") {
            self.experiment.test_size = parse_env("ASB_EXPERIMENT_TEST_SIZE", &raw)?;
        }
        if let Some(raw) = lookup("ASB_EXPERIMENT_MONTE_CARLOS") {
            self.experiment.monte_carlos = parse_env("ASB_EXPERIMENT_MONTE_CARLOS", &raw)?;
        }
        if let Some(raw) = lookup("ASB_EXPERIMENT_POOL_MULTIPLIER") {
            self.experiment.pool_multiplier = Some(parse_env("ASB_EXPERIMENT_POOL_MULTIPLIER", &raw)?);
        }
        if let Some(raw) = lookup("ASB_EXPERIMENT_SEED") {
            self.experiment.seed = Some(parse_env("ASB_EXPERIMENT_SEED", &raw)?);
        }
        if let Some(raw) = lookup("ASB_EXPERIMENT_MODEL") {
            self.experiment.model =
                ModelKind::parse(&raw).ok_or_else(|| AsbError::ConfigParse {
                    context: "env",
                    details: format!("ASB_EXPERIMENT_MODEL={raw:?}: expected islands, game_of_life or synthetic"),
                })?;
        }

        // simulator
        if let Some(raw) = lookup("ASB_SIMULATOR_PARALLELISM") {
            self.simulator.parallelism = parse_env("ASB_SIMULATOR_PARALLELISM", &raw)?;
        }
        if let Some(raw) = lookup("ASB_SIMULATOR_SEED") {
            let seed = parse_env("ASB_SIMULATOR_SEED", &raw)?;
            self.simulator.islands.seed = Some(seed);
            self.simulator.life.seed = Some(seed);
        }

        // data
        if let Some(raw) = lookup("ASB_DATA_MODE") {
            self.data.mode = match raw.trim().to_ascii_lowercase().as_str() {
                "generate" => DataMode::Generate,
                "cached" => DataMode::Cached,
                _ => {
                    return Err(AsbError::ConfigParse {
                        context: "env",
                        details: format!("ASB_DATA_MODE={raw:?}: expected generate or cached"),
                    });
                }
            };
        }
        if let Some(raw) = lookup("ASB_DATA_INPUT_DIR") {
            self.data.input_dir = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("ASB_DATA_OUTPUT_DIR") {
            self.data.output_dir = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("ASB_DATA_PERSIST") {
            self.data.persist = parse_env("ASB_DATA_PERSIST", &raw)?;
        }

        // report
        if let Some(raw) = lookup("ASB_REPORT_OUTPUT_DIR") {
            self.report.output_dir = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("ASB_REPORT_PLOT") {
            self.report.plot = parse_env("ASB_REPORT_PLOT", &raw)?;
        }
        if let Some(raw) = lookup("ASB_REPORT_ACTIVITY_LOG") {
            self.report.activity_log = PathBuf::from(raw);
        }

        Ok(())
    }

    #[allow(clippy::too_many_lines)]
    pub fn validate(&self) -> Result<()> {
        let exp = &self.experiment;
        for (name, val) in [
            ("budget", exp.budget),
            ("test_size", exp.test_size),
            ("monte_carlos", exp.monte_carlos),
        ] {
            if val == 0 {
                return Err(AsbError::InvalidConfig {
                    details: format!("experiment.{name} must be >= 1"),
                });
            }
        }
        if exp.pool_multiplier == Some(0) {
            return Err(AsbError::InvalidConfig {
                details: "experiment.pool_multiplier must be >= 1".to_string(),
            });
        }
        exp.pool_size()?;

        let space = self.space()?;
        let expected_dims = match exp.model {
            ModelKind::Islands => 5,
            ModelKind::GameOfLife => 1,
            ModelKind::Synthetic => self.simulator.synthetic_dimensions,
        };
        if space.dimensions() != expected_dims {
            return Err(AsbError::InvalidConfig {
                details: format!(
                    "experiment.bounds has {} dimensions but model {} takes {expected_dims}",
                    space.dimensions(),
                    exp.model.label()
                ),
            });
        }
        if space.dimensions() > MAX_DIM {
            return Err(AsbError::InvalidConfig {
                details: format!(
                    "Sobol design supports at most {MAX_DIM} dimensions, got {}",
                    space.dimensions()
                ),
            });
        }

        let sim = &self.simulator;
        if sim.parallelism == 0 {
            return Err(AsbError::InvalidConfig {
                details: "simulator.parallelism must be >= 1".to_string(),
            });
        }
        if sim.synthetic_dimensions == 0 {
            return Err(AsbError::InvalidConfig {
                details: "simulator.synthetic_dimensions must be >= 1".to_string(),
            });
        }
        if sim.islands.agents == 0 || sim.islands.periods < 2 {
            return Err(AsbError::InvalidConfig {
                details: "simulator.islands needs agents >= 1 and periods >= 2".to_string(),
            });
        }
        if !(sim.islands.lambda.is_finite() && sim.islands.lambda >= 0.0) {
            return Err(AsbError::InvalidConfig {
                details: format!("simulator.islands.lambda must be >= 0, got {}", sim.islands.lambda),
            });
        }
        if sim.life.periods == 0 {
            return Err(AsbError::InvalidConfig {
                details: "simulator.life.periods must be >= 1".to_string(),
            });
        }
        if !(0.0..=100.0).contains(&sim.life.initial_density_pct) {
            return Err(AsbError::InvalidConfig {
                details: format!(
                    "simulator.life.initial_density_pct must be in [0, 100], got {}",
                    sim.life.initial_density_pct
                ),
            });
        }

        let kriging = &self.surrogates.kriging;
        if !(kriging.length_scale_min > 0.0 && kriging.length_scale_min < kriging.length_scale_max)
            || !kriging.length_scale_max.is_finite()
        {
            return Err(AsbError::InvalidConfig {
                details: "surrogates.kriging length scales must satisfy 0 < min < max".to_string(),
            });
        }
        if kriging.grid_points < 2 {
            return Err(AsbError::InvalidConfig {
                details: "surrogates.kriging.grid_points must be >= 2".to_string(),
            });
        }
        if !(kriging.nugget.is_finite() && kriging.nugget >= 0.0) {
            return Err(AsbError::InvalidConfig {
                details: "surrogates.kriging.nugget must be >= 0".to_string(),
            });
        }

        let boost = &self.surrogates.boosting;
        if boost.n_estimators == 0 || boost.max_depth == 0 {
            return Err(AsbError::InvalidConfig {
                details: "surrogates.boosting.n_estimators and max_depth must be >= 1".to_string(),
            });
        }
        for (name, val) in [
            ("learning_rate", boost.learning_rate),
            ("subsample", boost.subsample),
        ] {
            if !(val > 0.0 && val <= 1.0) {
                return Err(AsbError::InvalidConfig {
                    details: format!("surrogates.boosting.{name} must be in (0, 1], got {val}"),
                });
            }
        }
        for (name, val) in [
            ("lambda", boost.lambda),
            ("gamma", boost.gamma),
            ("min_child_weight", boost.min_child_weight),
        ] {
            if !(val.is_finite() && val >= 0.0) {
                return Err(AsbError::InvalidConfig {
                    details: format!("surrogates.boosting.{name} must be >= 0, got {val}"),
                });
            }
        }

        if self.secondary.enabled {
            if self.secondary.model.trim().is_empty() {
                return Err(AsbError::InvalidConfig {
                    details: "secondary.model must not be empty".to_string(),
                });
            }
            if self.secondary.horizon == 0 {
                return Err(AsbError::InvalidConfig {
                    details: "secondary.horizon must be >= 1".to_string(),
                });
            }
        }

        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env<T>(name: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|error| AsbError::ConfigParse {
        context: "env",
        details: format!("{name}={raw:?}: {error}"),
    })
}
