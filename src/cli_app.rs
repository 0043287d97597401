//! Top-level CLI definition and dispatch.

use std::collections::BTreeMap;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use abm_surrogate_bench::core::config::{Config, DataMode, ModelKind};
use abm_surrogate_bench::core::errors::AsbError;
use abm_surrogate_bench::core::space::{DesignPoint, ParameterSpace};
use abm_surrogate_bench::logger::jsonl::{JsonlConfig, JsonlWriter};
use abm_surrogate_bench::persistence::{Artifact, ArtifactStore};
use abm_surrogate_bench::pipeline::{BenchmarkReport, Pipeline};
use abm_surrogate_bench::report::render_summary_table;
use abm_surrogate_bench::sampling::dedup::filter_disjoint;
use abm_surrogate_bench::sampling::design::{candidate_stream, generate_design, sampler_rng};
use abm_surrogate_bench::simulator::connector::{Connector, RunSummary};

/// ABM surrogate bench: compares surrogate models of agent-based simulators.
#[derive(Debug, Parser)]
#[command(
    name = "asb",
    author,
    version,
    about = "ABM Surrogate Bench - Kriging vs. boosted trees on agent-based models",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Print per-stage progress on stderr.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
    /// Quiet mode (errors only).
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Run the full benchmark: design, simulate, fit, evaluate, report.
    Run(RunArgs),
    /// Draw a training design or a disjoint out-of-sample set without simulating.
    Sample(SampleArgs),
    /// Run one simulator once with named parameters.
    Simulate(SimulateArgs),
    /// View configuration state.
    Config(ConfigArgs),
    /// Print version information.
    Version(VersionArgs),
    /// Generate shell completion scripts.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModelArg {
    Islands,
    GameOfLife,
    Synthetic,
}

impl From<ModelArg> for ModelKind {
    fn from(arg: ModelArg) -> Self {
        match arg {
            ModelArg::Islands => Self::Islands,
            ModelArg::GameOfLife => Self::GameOfLife,
            ModelArg::Synthetic => Self::Synthetic,
        }
    }
}

#[derive(Debug, Clone, Args, Default)]
struct RunArgs {
    /// Simulator to benchmark against.
    #[arg(long, value_enum)]
    model: Option<ModelArg>,
    /// Training budget (number of Sobol design points).
    #[arg(long, value_name = "N")]
    budget: Option<usize>,
    /// Held-out points per Monte Carlo trial.
    #[arg(long, value_name = "T")]
    test_size: Option<usize>,
    /// Number of Monte Carlo trials.
    #[arg(long, value_name = "MC")]
    monte_carlos: Option<usize>,
    /// Seed for the out-of-sample candidate stream.
    #[arg(long)]
    seed: Option<u64>,
    /// Read persisted datasets instead of simulating.
    #[arg(long)]
    cached: bool,
    /// Directory cached datasets are read from.
    #[arg(long, value_name = "DIR")]
    input_dir: Option<PathBuf>,
    /// Directory generated datasets and the error matrix are written to.
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,
    /// Skip the comparison plot.
    #[arg(long)]
    no_plot: bool,
    /// Skip the secondary single simulator run.
    #[arg(long)]
    no_secondary: bool,
    /// Also benchmark an ordinary least-squares baseline.
    #[arg(long)]
    linear: bool,
}

#[derive(Debug, Clone, Args)]
struct SampleArgs {
    /// Which set of points to draw.
    #[command(subcommand)]
    command: SampleCommand,
}

#[derive(Debug, Clone, Subcommand)]
enum SampleCommand {
    /// Sobol training design over the configured parameter space.
    Design(DesignArgs),
    /// Uniform held-out points disjoint from the training design.
    Oos(OosArgs),
}

#[derive(Debug, Clone, Args, Default)]
struct DesignArgs {
    /// Number of points (defaults to the configured budget).
    #[arg(long, value_name = "N")]
    count: Option<usize>,
    /// Write `X.csv` into this directory instead of printing the points.
    #[arg(long, value_name = "DIR")]
    out_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Args, Default)]
struct OosArgs {
    /// Number of points to keep (defaults to test_size * monte_carlos).
    #[arg(long, value_name = "K")]
    count: Option<usize>,
    /// Candidate stream seed (defaults to the configured seed).
    #[arg(long)]
    seed: Option<u64>,
    /// Write `X_oos.csv` into this directory instead of printing the points.
    #[arg(long, value_name = "DIR")]
    out_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Args, Default)]
struct SimulateArgs {
    /// Model name, e.g. "Game of Life" or "islands" (defaults to the secondary run model).
    #[arg(long)]
    model: Option<String>,
    /// Number of periods to run.
    #[arg(long, value_name = "PERIODS")]
    horizon: Option<usize>,
    /// Model parameter; repeat for several (defaults to the secondary run parameters).
    #[arg(short, long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
    params: Vec<(String, f64)>,
}

#[derive(Debug, Clone, Args, Default)]
struct ConfigArgs {
    /// Config operation to run.
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Debug, Clone, Subcommand)]
enum ConfigCommand {
    /// Print resolved config file path.
    Path,
    /// Print effective merged configuration.
    Show,
    /// Validate configuration and exit.
    Validate,
}

#[derive(Debug, Clone, Args, Default)]
struct VersionArgs {
    /// Include build metadata fields.
    #[arg(long)]
    build: bool,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input at runtime.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Json(_) => 3,
        }
    }
}

impl From<AsbError> for CliError {
    fn from(err: AsbError) -> Self {
        if err.is_user_error() {
            Self::User(err.to_string())
        } else {
            Self::Runtime(err.to_string())
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Run(args) => run_benchmark(cli, args),
        Command::Sample(args) => run_sample(cli, args),
        Command::Simulate(args) => run_simulate(cli, args),
        Command::Config(args) => run_config(cli, args),
        Command::Version(args) => emit_version(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

fn apply_run_overrides(config: &mut Config, args: &RunArgs) {
    if let Some(model) = args.model {
        config.experiment.model = model.into();
    }
    if let Some(budget) = args.budget {
        config.experiment.budget = budget;
    }
    if let Some(test_size) = args.test_size {
        config.experiment.test_size = test_size;
    }
    if let Some(monte_carlos) = args.monte_carlos {
        config.experiment.monte_carlos = monte_carlos;
    }
    if args.seed.is_some() {
        config.experiment.seed = args.seed;
    }
    if args.cached {
        config.data.mode = DataMode::Cached;
    }
    if let Some(dir) = &args.input_dir {
        config.data.input_dir.clone_from(dir);
    }
    if let Some(dir) = &args.output_dir {
        config.data.output_dir.clone_from(dir);
    }
    if args.no_plot {
        config.report.plot = false;
    }
    if args.no_secondary {
        config.secondary.enabled = false;
    }
    if args.linear {
        config.surrogates.include_linear = true;
    }
}

fn run_benchmark(cli: &Cli, args: &RunArgs) -> Result<(), CliError> {
    let mut config = Config::load(cli.config.as_deref())?;
    apply_run_overrides(&mut config, args);
    config.validate()?;

    let mut log = JsonlWriter::open(JsonlConfig::at(&config.report.activity_log));
    let report = Pipeline::new(&config, &mut log)
        .verbose(cli.verbose)
        .run()?;

    match output_mode(cli) {
        OutputMode::Human => {
            if !cli.quiet {
                print_report(&report);
            }
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "run",
                "report": serde_json::to_value(&report)?,
                "activity_log": config.report.activity_log.to_string_lossy(),
                "activity_log_state": log.state(),
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn print_report(report: &BenchmarkReport) {
    println!(
        "{} {} ({} data, budget {}, {} trials of {} points)",
        "Benchmark:".bold(),
        report.model,
        report.data_mode,
        report.budget,
        report.monte_carlos,
        report.test_size,
    );
    println!("  Config hash: {}", report.config_hash);
    if let Some(secs) = report.data_generation_secs {
        println!("  Data generation: {secs:.2}s");
    }
    if let Some(secondary) = &report.secondary {
        print_run_summary("Secondary run", secondary);
    }
    println!();
    print!("{}", render_summary_table(&report.summaries));
    println!();
    for label in report.labels() {
        println!("  {}", label.green());
    }
    if !report.artifacts.is_empty() {
        println!();
        println!("{}", "Artifacts:".bold());
        for path in &report.artifacts {
            println!("  {}", path.display());
        }
    }
    if let Some(plot) = &report.plot {
        println!("  {}", plot.display());
    }
}

fn print_run_summary(title: &str, summary: &RunSummary) {
    println!("  {title}: {} for {} periods", summary.model, summary.horizon);
    for (name, value) in &summary.metrics {
        println!("    {name:<20} {value}");
    }
}

fn run_sample(cli: &Cli, args: &SampleArgs) -> Result<(), CliError> {
    let config = Config::load(cli.config.as_deref())?;
    let space = config.space()?;
    let exp = &config.experiment;

    match &args.command {
        SampleCommand::Design(design) => {
            let count = design.count.unwrap_or(exp.budget);
            let points = generate_design(&space, count, exp.sobol_skip)?;
            let path = match &design.out_dir {
                Some(dir) => Some(ArtifactStore::new(dir).write_points(Artifact::TrainingInputs, &points)?),
                None => None,
            };
            emit_points(cli, "sample design", &space, &points, path.as_deref())
        }
        SampleCommand::Oos(oos) => {
            let keep = match oos.count {
                Some(count) => count,
                None => exp.final_test_size()?,
            };
            let mut sizing = exp.clone();
            sizing.test_size = keep;
            sizing.monte_carlos = 1;
            let pool_size = sizing.pool_size()?;

            let training = generate_design(&space, exp.budget, exp.sobol_skip)?;
            let mut rng = sampler_rng(oos.seed.or(exp.seed));
            let points = filter_disjoint(
                candidate_stream(&space, &mut rng).take(pool_size),
                &training,
                keep,
            )?;
            let path = match &oos.out_dir {
                Some(dir) => Some(ArtifactStore::new(dir).write_points(Artifact::TestInputs, &points)?),
                None => None,
            };
            emit_points(cli, "sample oos", &space, &points, path.as_deref())
        }
    }
}

fn emit_points(
    cli: &Cli,
    command: &str,
    space: &ParameterSpace,
    points: &[DesignPoint],
    path: Option<&Path>,
) -> Result<(), CliError> {
    match output_mode(cli) {
        OutputMode::Human => {
            if cli.quiet {
                return Ok(());
            }
            if let Some(path) = path {
                println!("Wrote {} points to {}", points.len(), path.display());
                return Ok(());
            }
            let header: Vec<&str> = space.names().collect();
            println!("{}", header.join("\t").bold());
            for point in points {
                let row: Vec<String> = point.iter().map(|v| format!("{v:.6}")).collect();
                println!("{}", row.join("\t"));
            }
        }
        OutputMode::Json => {
            let payload = json!({
                "command": command,
                "count": points.len(),
                "dimensions": space.dimensions(),
                "names": space.names().collect::<Vec<_>>(),
                "path": path.map(|p| p.to_string_lossy().into_owned()),
                "points": points,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn run_simulate(cli: &Cli, args: &SimulateArgs) -> Result<(), CliError> {
    let config = Config::load(cli.config.as_deref())?;
    let model = args.model.as_deref().unwrap_or(&config.secondary.model);
    let horizon = args.horizon.unwrap_or(config.secondary.horizon);
    let parameters: BTreeMap<String, f64> = if args.params.is_empty() {
        config.secondary.parameters.clone()
    } else {
        args.params.iter().cloned().collect()
    };

    let summary = Connector::new(config.simulator.clone()).run_single(model, horizon, &parameters)?;

    match output_mode(cli) {
        OutputMode::Human => {
            if !cli.quiet {
                print_run_summary("Run", &summary);
            }
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "simulate",
                "parameters": parameters,
                "summary": serde_json::to_value(&summary)?,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn parse_param(raw: &str) -> Result<(String, f64), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {raw:?}"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty parameter name in {raw:?}"));
    }
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("{key}: {e}"))?;
    Ok((key.to_string(), value))
}

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    let path = cli.config.clone().unwrap_or_else(Config::default_path);

    match &args.command {
        None | Some(ConfigCommand::Path) => {
            let exists = path.exists();

            match output_mode(cli) {
                OutputMode::Human => {
                    println!("{}", path.display());
                    if !exists {
                        println!("  (file does not exist; defaults will be used)");
                    }
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config path",
                        "path": path.to_string_lossy(),
                        "exists": exists,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Show) => {
            let config = Config::load(cli.config.as_deref())?;

            match output_mode(cli) {
                OutputMode::Human => {
                    println!("{}", config.to_toml()?);
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config show",
                        "config": serde_json::to_value(&config)?,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Validate) => match Config::load(cli.config.as_deref()) {
            Ok(config) => {
                let hash = config.stable_hash()?;

                match output_mode(cli) {
                    OutputMode::Human => {
                        println!("{}", "Configuration is valid.".green());
                        println!("  Source: {}", path.display());
                        println!("  Hash: {hash}");
                    }
                    OutputMode::Json => {
                        let payload = json!({
                            "command": "config validate",
                            "valid": true,
                            "path": path.to_string_lossy(),
                            "hash": hash,
                        });
                        write_json_line(&payload)?;
                    }
                }
                Ok(())
            }
            Err(e) => {
                match output_mode(cli) {
                    OutputMode::Human => {
                        eprintln!("{} {e}", "Configuration is INVALID:".red());
                    }
                    OutputMode::Json => {
                        let payload = json!({
                            "command": "config validate",
                            "valid": false,
                            "code": e.code(),
                            "error": e.to_string(),
                        });
                        write_json_line(&payload)?;
                    }
                }
                Err(CliError::User(format!("invalid config: {e}")))
            }
        },
    }
}

fn emit_version(cli: &Cli, args: &VersionArgs) -> Result<(), CliError> {
    let version = env!("CARGO_PKG_VERSION");
    let package = env!("CARGO_PKG_NAME");
    let target = option_env!("TARGET").unwrap_or("unknown");
    let profile = option_env!("PROFILE").unwrap_or("unknown");
    let git_sha = option_env!("GIT_SHA").unwrap_or("unknown");
    let plot = cfg!(feature = "plot");

    match output_mode(cli) {
        OutputMode::Human => {
            println!("asb {version}");
            if args.build {
                println!("package: {package}");
                println!("target: {target}");
                println!("profile: {profile}");
                println!("git_sha: {git_sha}");
                println!("plot: {plot}");
            }
        }
        OutputMode::Json => {
            let payload = json!({
                "binary": "asb",
                "version": version,
                "package": package,
                "build": {
                    "target": target,
                    "profile": profile,
                    "git_sha": git_sha,
                    "plot": plot,
                }
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("ASB_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        Some("auto") | None => fallback,
        Some(_) => fallback,
    }
}
