//! Sequential benchmark pipeline driven by one validated [`Config`].
//!
//! Stage order: setup, training design, training evaluation, secondary run,
//! out-of-sample selection, out-of-sample evaluation, surrogate fit,
//! prediction, Monte Carlo evaluation, report. Artifact writes run as their own
//! `persist_*` stages. Each stage consumes the previous stage's owned output;
//! any error aborts the run after a `stage_failed` event.

#![allow(missing_docs)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;

use serde::Serialize;

use crate::core::config::{Config, DataMode, ModelKind};
use crate::core::errors::Result;
use crate::core::space::{DesignPoint, ParameterSpace};
use crate::evaluation::{ErrorMatrix, ErrorSummary, evaluate};
use crate::logger::jsonl::{EventType, JsonlWriter, LogEntry, Severity};
use crate::persistence::{Artifact, ArtifactStore, CachedData};
use crate::sampling::dedup::filter_disjoint;
use crate::sampling::design::{candidate_stream, generate_design, sampler_rng};
use crate::simulator::Simulator;
use crate::simulator::batch::BatchEvaluator;
use crate::simulator::connector::{Connector, RunSummary};
use crate::simulator::islands::IslandsModel;
use crate::simulator::life::GameOfLife;
use crate::simulator::synthetic::LinearResponse;
use crate::surrogate::{GradientBoosting, Kriging, LinearRegression, Surrogate, TrainingSet};

pub const STAGE_SETUP: &str = "setup";
pub const STAGE_TRAINING_DESIGN: &str = "training_design";
pub const STAGE_TRAINING_EVALUATION: &str = "training_evaluation";
pub const STAGE_SECONDARY_RUN: &str = "secondary_run";
pub const STAGE_OOS_SELECTION: &str = "oos_selection";
pub const STAGE_OOS_EVALUATION: &str = "oos_evaluation";
pub const STAGE_PERSIST_TRAINING: &str = "persist_training";
pub const STAGE_PERSIST_OOS: &str = "persist_oos";
pub const STAGE_PERSIST_ERRORS: &str = "persist_errors";
pub const STAGE_LOAD_CACHED: &str = "load_cached";
pub const STAGE_SURROGATE_FIT: &str = "surrogate_fit";
pub const STAGE_PREDICTION: &str = "prediction";
pub const STAGE_MONTE_CARLO: &str = "monte_carlo";
pub const STAGE_REPORT: &str = "report";

/// Simulator for the configured model.
pub fn build_simulator(config: &Config) -> Box<dyn Simulator> {
    match config.experiment.model {
        ModelKind::Islands => Box::new(IslandsModel::new(config.simulator.islands.clone())),
        ModelKind::GameOfLife => Box::new(GameOfLife::new(config.simulator.life.clone())),
        ModelKind::Synthetic => Box::new(LinearResponse::new(config.simulator.synthetic_dimensions)),
    }
}

/// Surrogates compared by the benchmark, in error-matrix row order.
pub fn build_surrogates(config: &Config) -> Vec<Box<dyn Surrogate>> {
    let mut surrogates: Vec<Box<dyn Surrogate>> = vec![
        Box::new(Kriging::new(config.surrogates.kriging.clone())),
        Box::new(GradientBoosting::new(config.surrogates.boosting.clone())),
    ];
    if config.surrogates.include_linear {
        surrogates.push(Box::new(LinearRegression));
    }
    surrogates
}

/// Training and held-out datasets, paired by construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Datasets {
    pub training: TrainingSet,
    pub x_oos: Vec<DesignPoint>,
    pub y_oos: Vec<f64>,
}

/// Everything a run produced, for human and JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkReport {
    pub model: String,
    pub data_mode: &'static str,
    pub budget: usize,
    pub test_size: usize,
    pub monte_carlos: usize,
    pub config_hash: String,
    /// Wall-clock seconds spent sampling and simulating; absent in cached mode.
    pub data_generation_secs: Option<f64>,
    pub summaries: Vec<ErrorSummary>,
    pub error_matrix: ErrorMatrix,
    pub secondary: Option<RunSummary>,
    pub artifacts: Vec<PathBuf>,
    pub plot: Option<PathBuf>,
}

impl BenchmarkReport {
    /// Legend-style labels, one per surrogate.
    #[must_use]
    pub fn labels(&self) -> Vec<String> {
        self.summaries.iter().map(ErrorSummary::label).collect()
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Orchestrates one benchmark run.
pub struct Pipeline<'a> {
    config: &'a Config,
    log: &'a mut JsonlWriter,
    verbose: bool,
    artifacts: Vec<PathBuf>,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a Config, log: &'a mut JsonlWriter) -> Self {
        Self {
            config,
            log,
            verbose: false,
            artifacts: Vec::new(),
        }
    }

    /// Print `[ASB-STAGE]` progress lines on stderr.
    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn stage<T>(
        &mut self,
        name: &'static str,
        count: impl FnOnce(&T) -> usize,
        work: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        let start = Instant::now();
        match work() {
            Ok(value) => {
                let n = count(&value);
                let ms = elapsed_ms(start);
                self.log.write_entry(&LogEntry::stage_complete(name, n, ms));
                if self.verbose {
                    let _ = writeln!(io::stderr(), "[ASB-STAGE] {name}: {n} in {ms} ms");
                }
                Ok(value)
            }
            Err(err) => {
                self.log.write_entry(&LogEntry::stage_failed(name, &err));
                self.log.flush();
                Err(err)
            }
        }
    }

    /// Write artifacts as a stage of their own; a no-op when persistence is off.
    fn persist(
        &mut self,
        name: &'static str,
        write: impl FnOnce(&ArtifactStore) -> Result<Vec<PathBuf>>,
    ) -> Result<()> {
        let config = self.config;
        if !config.data.persist {
            return Ok(());
        }
        let store = ArtifactStore::new(&config.data.output_dir);
        let paths = self.stage(name, Vec::len, || write(&store))?;
        self.artifacts.extend(paths);
        Ok(())
    }

    /// Run every stage and return the report.
    pub fn run(mut self) -> Result<BenchmarkReport> {
        let config = self.config;
        let exp = &config.experiment;
        let config_hash = config.stable_hash()?;

        let mut start = LogEntry::new(EventType::RunStart, Severity::Info);
        start.model = Some(exp.model.label().to_string());
        start.budget = Some(exp.budget);
        start.config_hash = Some(config_hash.clone());
        start.details = Some(format!("data mode {}", config.data.mode.label()));
        self.log.write_entry(&start);

        let (datasets, data_generation_secs, secondary) = match config.data.mode {
            DataMode::Generate => {
                let clock = Instant::now();
                let (datasets, secondary) = self.generate()?;
                (datasets, Some(clock.elapsed().as_secs_f64()), secondary)
            }
            DataMode::Cached => (self.load_cached()?, None, None),
        };

        let trial_size = exp.test_size;
        let monte_carlos = datasets.y_oos.len() / trial_size.max(1);
        let error_matrix = self.benchmark(&datasets, trial_size)?;
        let summaries = error_matrix.summaries();

        for summary in &summaries {
            let mut entry = LogEntry::new(EventType::SurrogateSummary, Severity::Info);
            entry.surrogate = Some(summary.surrogate.clone());
            entry.count = Some(summary.trials);
            entry.mean = Some(summary.mean);
            entry.variance = Some(summary.variance);
            self.log.write_entry(&entry);
        }

        let budget = datasets.training.len();
        let plot = self.report(&error_matrix, budget)?;

        let mut done = LogEntry::new(EventType::RunComplete, Severity::Info);
        done.ok = Some(true);
        done.count = Some(monte_carlos);
        done.duration_ms = data_generation_secs.map(|s| (s * 1000.0).round() as u64);
        self.log.write_entry(&done);
        self.log.flush();

        Ok(BenchmarkReport {
            model: exp.model.label().to_string(),
            data_mode: config.data.mode.label(),
            budget,
            test_size: trial_size,
            monte_carlos,
            config_hash,
            data_generation_secs,
            summaries,
            error_matrix,
            secondary,
            artifacts: self.artifacts,
            plot,
        })
    }

    /// Sample, simulate and persist fresh training and held-out data.
    pub fn generate(&mut self) -> Result<(Datasets, Option<RunSummary>)> {
        let config = self.config;
        let exp = &config.experiment;
        let (space, final_test_size, pool_size) = self.stage(
            STAGE_SETUP,
            |(space, _, _): &(ParameterSpace, usize, usize)| space.dimensions(),
            || Ok((config.space()?, exp.final_test_size()?, exp.pool_size()?)),
        )?;
        let simulator = build_simulator(config);

        let x = self.stage(STAGE_TRAINING_DESIGN, Vec::len, || {
            generate_design(&space, exp.budget, exp.sobol_skip)
        })?;
        let training = self.stage(STAGE_TRAINING_EVALUATION, TrainingSet::len, || {
            let y = BatchEvaluator::new(STAGE_TRAINING_EVALUATION, config.simulator.parallelism)
                .run(simulator.as_ref(), &x)?;
            TrainingSet::new(x, y)
        })?;
        self.persist(STAGE_PERSIST_TRAINING, |s| {
            s.save_training(training.inputs(), training.targets())?;
            Ok(vec![
                s.path(Artifact::TrainingInputs),
                s.path(Artifact::TrainingResponses),
            ])
        })?;

        let secondary = if config.secondary.enabled {
            let connector = Connector::new(config.simulator.clone());
            let summary = self.stage(STAGE_SECONDARY_RUN, |s: &RunSummary| s.metrics.len(), || {
                connector.run_single(
                    &config.secondary.model,
                    config.secondary.horizon,
                    &config.secondary.parameters,
                )
            })?;
            let mut entry = LogEntry::new(EventType::SecondaryRun, Severity::Info);
            entry.model = Some(summary.model.clone());
            entry.count = Some(summary.horizon);
            entry.details = serde_json::to_string(&summary.metrics).ok();
            self.log.write_entry(&entry);
            Some(summary)
        } else {
            None
        };

        let x_oos = self.stage(STAGE_OOS_SELECTION, Vec::len, || {
            let mut rng = sampler_rng(exp.seed);
            filter_disjoint(
                candidate_stream(&space, &mut rng).take(pool_size),
                training.inputs(),
                final_test_size,
            )
        })?;
        let y_oos = self.stage(STAGE_OOS_EVALUATION, Vec::len, || {
            BatchEvaluator::new(STAGE_OOS_EVALUATION, config.simulator.parallelism)
                .run(simulator.as_ref(), &x_oos)
        })?;
        self.persist(STAGE_PERSIST_OOS, |s| {
            s.save_out_of_sample(&x_oos, &y_oos)?;
            Ok(vec![
                s.path(Artifact::TestInputs),
                s.path(Artifact::TestResponses),
            ])
        })?;

        Ok((
            Datasets {
                training,
                x_oos,
                y_oos,
            },
            secondary,
        ))
    }

    /// Read the four persisted datasets instead of simulating.
    pub fn load_cached(&mut self) -> Result<Datasets> {
        let store = ArtifactStore::new(&self.config.data.input_dir);
        self.stage(
            STAGE_LOAD_CACHED,
            |d: &Datasets| d.training.len() + d.y_oos.len(),
            || {
                let CachedData { x, y, x_oos, y_oos } = store.load_data()?;
                Ok(Datasets {
                    training: TrainingSet::new(x, y)?,
                    x_oos,
                    y_oos,
                })
            },
        )
    }

    /// Fit every surrogate on the same training set and build the error matrix.
    pub fn benchmark(&mut self, datasets: &Datasets, trial_size: usize) -> Result<ErrorMatrix> {
        let surrogates = build_surrogates(self.config);
        let fitted = self.stage(STAGE_SURROGATE_FIT, Vec::len, || {
            surrogates
                .iter()
                .map(|s| s.fit(&datasets.training))
                .collect::<Result<Vec<_>>>()
        })?;
        let predictions = self.stage(STAGE_PREDICTION, Vec::len, || {
            fitted
                .iter()
                .map(|model| Ok((model.name().to_string(), model.predict(&datasets.x_oos)?)))
                .collect::<Result<Vec<(String, Vec<f64>)>>>()
        })?;
        let matrix = self.stage(STAGE_MONTE_CARLO, |m: &ErrorMatrix| m.shape().1, || {
            evaluate(&datasets.y_oos, &predictions, trial_size)
        })?;
        self.persist(STAGE_PERSIST_ERRORS, |s| Ok(vec![s.write_error_matrix(&matrix)?]))?;
        Ok(matrix)
    }

    #[cfg(feature = "plot")]
    fn report(&mut self, matrix: &ErrorMatrix, budget: usize) -> Result<Option<PathBuf>> {
        if !self.config.report.plot {
            return Ok(None);
        }
        let path = self
            .config
            .report
            .output_dir
            .join(crate::report::plot_file_name(budget));
        self.stage(STAGE_REPORT, |_| 1, || {
            crate::report::plot::render_comparison(matrix, &path)
        })?;
        Ok(Some(path))
    }

    #[cfg(not(feature = "plot"))]
    fn report(&mut self, _matrix: &ErrorMatrix, _budget: usize) -> Result<Option<PathBuf>> {
        if self.config.report.plot && self.verbose {
            let _ = writeln!(io::stderr(), "[ASB-STAGE] report: plot support not compiled in");
        }
        Ok(None)
    }
}
