//! Integration tests: CLI smoke tests and end-to-end benchmark scenarios.

mod common;

use std::fs;
use std::path::{Path, PathBuf};

use abm_surrogate_bench::core::config::{Config, DataMode};
use abm_surrogate_bench::core::errors::{AsbError, Result};
use abm_surrogate_bench::core::space::ParameterSpace;
use abm_surrogate_bench::evaluation::evaluate;
use abm_surrogate_bench::logger::jsonl::{JsonlConfig, JsonlWriter};
use abm_surrogate_bench::persistence::{Artifact, ArtifactStore};
use abm_surrogate_bench::pipeline::{BenchmarkReport, Pipeline};
use abm_surrogate_bench::sampling::dedup::filter_disjoint;
use abm_surrogate_bench::sampling::design::generate_design;
use serde_json::Value;

fn run_pipeline(config: &Config) -> Result<BenchmarkReport> {
    let mut log = JsonlWriter::open(JsonlConfig::at(&config.report.activity_log));
    Pipeline::new(config, &mut log).run()
}

fn log_events(config: &Config) -> Vec<Value> {
    fs::read_to_string(&config.report.activity_log)
        .unwrap_or_default()
        .lines()
        .map(|line| serde_json::from_str(line).expect("activity log line is JSON"))
        .collect()
}

fn write_toml(dir: &Path, config: &Config) -> PathBuf {
    let path = dir.join("asb.toml");
    fs::write(&path, config.to_toml().unwrap()).unwrap();
    path
}

// ──────────────────────────── CLI smoke tests ────────────────────────────

#[test]
fn help_command_prints_usage() {
    let result = common::run_cli_case("help_command_prints_usage", &["--help"]);
    assert!(
        result.status.success(),
        "expected success; log: {}",
        result.log_path.display()
    );
    assert!(
        result.stdout.contains("Usage: asb [OPTIONS] <COMMAND>"),
        "missing help banner; log: {}",
        result.log_path.display()
    );
}

#[test]
fn version_command_prints_version() {
    let result = common::run_cli_case("version_command_prints_version", &["version", "--json"]);
    assert!(
        result.status.success(),
        "expected success; log: {}",
        result.log_path.display()
    );
    let payload: Value = serde_json::from_str(result.stdout.trim()).expect("version json");
    assert_eq!(payload["binary"], "asb");
    assert_eq!(payload["version"], env!("CARGO_PKG_VERSION"));
}

#[test]
fn subcommand_help_flags_work() {
    for subcmd in ["run", "sample", "simulate", "config", "version", "completions"] {
        let case_name = format!("subcommand_{subcmd}_help");
        let result = common::run_cli_case(&case_name, &[subcmd, "--help"]);
        assert!(
            result.status.success(),
            "subcommand '{subcmd} --help' failed; log: {}",
            result.log_path.display()
        );
        assert!(
            result.stdout.contains("Usage"),
            "subcommand '{subcmd} --help' missing usage info; log: {}",
            result.log_path.display()
        );
    }
}

#[test]
fn completions_command_generates_shell_script() {
    let result = common::run_cli_case(
        "completions_command_generates_shell_script",
        &["completions", "bash"],
    );
    assert!(
        result.status.success(),
        "expected success; log: {}",
        result.log_path.display()
    );
    assert!(
        result.stdout.contains("asb"),
        "expected completion script contents; log: {}",
        result.log_path.display()
    );
}

#[test]
fn config_show_reports_file_values_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::synthetic_config(dir.path());
    let path = write_toml(dir.path(), &config);
    let path_arg = path.to_string_lossy().into_owned();

    let result = common::run_cli_case("config_show_json", &["--config", &path_arg, "config", "show", "--json"]);
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let payload: Value = serde_json::from_str(result.stdout.trim()).unwrap();
    assert_eq!(payload["command"], "config show");
    assert_eq!(payload["config"]["experiment"]["budget"], 8);
    assert_eq!(payload["config"]["experiment"]["model"], "synthetic");
}

#[test]
fn config_validate_rejects_zero_budget_with_user_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[experiment]\nbudget = 0\n").unwrap();
    let path_arg = path.to_string_lossy().into_owned();

    let result = common::run_cli_case("config_validate_bad", &["--config", &path_arg, "--json", "config", "validate"]);
    assert_eq!(result.status.code(), Some(1), "log: {}", result.log_path.display());
    let payload: Value = serde_json::from_str(result.stdout.trim()).unwrap();
    assert_eq!(payload["valid"], false);
    assert_eq!(payload["code"], "ASB-1001");
}

#[test]
fn missing_explicit_config_is_a_user_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    let path_arg = path.to_string_lossy().into_owned();
    let result = common::run_cli_case("missing_config", &["--config", &path_arg, "config", "show"]);
    assert_eq!(result.status.code(), Some(1), "log: {}", result.log_path.display());
    assert!(result.stderr.contains("ASB-1002"), "log: {}", result.log_path.display());
}

#[test]
fn simulate_game_of_life_emits_metrics() {
    let dir = tempfile::tempdir().unwrap();
    let result = common::run_cli_case_in(
        "simulate_gol",
        &[
            "--json", "simulate", "--model", "Game of Life", "--horizon", "5", "-p", "gridSize=20", "-p", "x=50",
        ],
        Some(dir.path()),
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let payload: Value = serde_json::from_str(result.stdout.trim()).unwrap();
    let summary = &payload["summary"];
    assert_eq!(summary["model"], "Game of Life");
    assert_eq!(summary["horizon"], 5);
    assert_eq!(summary["metrics"]["grid_size"], 20.0);
    let density = summary["metrics"]["density"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&density));
}

#[test]
fn simulate_unknown_model_fails_as_user_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = common::run_cli_case_in(
        "simulate_unknown",
        &["simulate", "--model", "Sugarscape", "-p", "gridSize=10"],
        Some(dir.path()),
    );
    assert_eq!(result.status.code(), Some(1), "log: {}", result.log_path.display());
    assert!(result.stderr.contains("ASB-3002"), "log: {}", result.log_path.display());
}

#[test]
fn sample_design_and_oos_are_disjoint() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::synthetic_config(dir.path());
    let path = write_toml(dir.path(), &config);
    let path_arg = path.to_string_lossy().into_owned();

    let design = common::run_cli_case("sample_design", &["--config", &path_arg, "--json", "sample", "design"]);
    assert!(design.status.success(), "log: {}", design.log_path.display());
    let design: Value = serde_json::from_str(design.stdout.trim()).unwrap();
    assert_eq!(design["count"], 8);
    assert_eq!(design["dimensions"], 5);

    let oos = common::run_cli_case("sample_oos", &["--config", &path_arg, "--json", "sample", "oos"]);
    assert!(oos.status.success(), "log: {}", oos.log_path.display());
    let oos: Value = serde_json::from_str(oos.stdout.trim()).unwrap();
    assert_eq!(oos["count"], 4);

    let train = design["points"].as_array().unwrap();
    for point in oos["points"].as_array().unwrap() {
        assert!(!train.contains(point), "held-out point {point} is in the design");
    }
}

#[test]
fn cli_run_writes_artifacts_and_json_report() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::synthetic_config(dir.path());
    let path = write_toml(dir.path(), &config);
    let path_arg = path.to_string_lossy().into_owned();

    let result = common::run_cli_case_in(
        "cli_run",
        &["--config", &path_arg, "--json", "run", "--no-plot"],
        Some(dir.path()),
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let payload: Value = serde_json::from_str(result.stdout.trim()).unwrap();
    let report = &payload["report"];
    assert_eq!(report["model"], "synthetic");
    assert_eq!(report["monte_carlos"], 2);
    assert_eq!(report["summaries"].as_array().unwrap().len(), 3);
    for artifact in ["X.csv", "y.csv", "X_oos.csv", "y_oos.csv", "mse_perf.csv"] {
        assert!(dir.path().join("data").join(artifact).exists(), "missing {artifact}");
    }
}

#[test]
fn cli_run_partition_failure_exits_with_runtime_code() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = common::synthetic_config(dir.path());
    config.data.mode = DataMode::Cached;
    let store = ArtifactStore::new(&config.data.input_dir);
    let x = generate_design(&ParameterSpace::unit_cube(5).unwrap(), 8, 0).unwrap();
    let y: Vec<f64> = x.iter().map(|p| p.iter().sum()).collect();
    store.save_training(&x, &y).unwrap();
    store.save_out_of_sample(&x[..5], &y[..5]).unwrap();
    let path = write_toml(dir.path(), &config);
    let path_arg = path.to_string_lossy().into_owned();

    let result = common::run_cli_case_in("cli_partition", &["--config", &path_arg, "run"], Some(dir.path()));
    assert_eq!(result.status.code(), Some(2), "log: {}", result.log_path.display());
    assert!(result.stderr.contains("ASB-2002"), "log: {}", result.log_path.display());
}

// ─────────────────────────── Pipeline scenarios ───────────────────────────

#[test]
fn synthetic_linear_benchmark_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::synthetic_config(dir.path());
    let report = run_pipeline(&config).expect("pipeline run");

    assert_eq!(report.budget, 8);
    assert_eq!(report.test_size, 2);
    assert_eq!(report.monte_carlos, 2);
    assert!(report.data_generation_secs.is_some());
    assert!(report.secondary.is_none());
    assert_eq!(report.error_matrix.shape(), (3, 2));
    assert_eq!(
        report.error_matrix.labels(),
        ["Kriging", "XGBoost (Batch)", "Linear"]
    );

    let linear = report.error_matrix.row("Linear").unwrap();
    assert!(linear.iter().all(|mse| *mse < 1e-10), "linear mse {linear:?}");
    for row in report.error_matrix.rows() {
        assert!(row.iter().all(|mse| mse.is_finite() && *mse >= 0.0));
    }

    let store = ArtifactStore::new(&config.data.output_dir);
    let x = store.read_points(Artifact::TrainingInputs).unwrap();
    let x_oos = store.read_points(Artifact::TestInputs).unwrap();
    assert_eq!(x.len(), 8);
    assert_eq!(x_oos.len(), 4);
    assert!(x_oos.iter().all(|p| !x.contains(p)));
    let y_oos = store.read_values(Artifact::TestResponses).unwrap();
    for (point, y) in x_oos.iter().zip(&y_oos) {
        assert!((point.iter().sum::<f64>() - y).abs() < 1e-12);
    }

    let labels = report.labels();
    assert!(labels[2].starts_with("Linear: Mean 0.00000, Variance 0.00000"), "{labels:?}");

    #[cfg(feature = "plot")]
    {
        let plot = report.plot.as_ref().expect("plot path");
        assert!(plot.ends_with("xgboost_kriging_ba_comparison_8.svg"));
        assert!(plot.exists());
    }
}

#[test]
fn activity_log_records_run_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = common::synthetic_config(dir.path());
    config.report.plot = false;
    run_pipeline(&config).unwrap();

    let events = log_events(&config);
    let kinds: Vec<&str> = events.iter().filter_map(|e| e["event"].as_str()).collect();
    assert_eq!(kinds.first(), Some(&"run_start"));
    assert_eq!(kinds.last(), Some(&"run_complete"));
    assert_eq!(kinds.iter().filter(|k| **k == "surrogate_summary").count(), 3);
    let stages: Vec<&str> = events
        .iter()
        .filter(|e| e["event"] == "stage_complete")
        .filter_map(|e| e["stage"].as_str())
        .collect();
    assert_eq!(
        stages,
        [
            "setup",
            "training_design",
            "training_evaluation",
            "persist_training",
            "oos_selection",
            "oos_evaluation",
            "persist_oos",
            "surrogate_fit",
            "prediction",
            "monte_carlo",
            "persist_errors",
        ]
    );
}

#[test]
fn secondary_run_is_reported_in_generate_mode() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = common::synthetic_config(dir.path());
    config.report.plot = false;
    config.secondary.enabled = true;
    config.secondary.horizon = 3;
    config
        .secondary
        .parameters
        .insert("gridSize".to_string(), 16.0);
    let report = run_pipeline(&config).unwrap();
    let secondary = report.secondary.expect("secondary run summary");
    assert_eq!(secondary.horizon, 3);
    assert_eq!(secondary.metric("grid_size"), Some(16.0));
}

#[test]
fn cached_mode_reproduces_generated_error_matrix() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = common::synthetic_config(dir.path());
    config.report.plot = false;
    let generated = run_pipeline(&config).unwrap();

    config.data.mode = DataMode::Cached;
    let cached = run_pipeline(&config).unwrap();

    assert_eq!(cached.data_mode, "cached");
    assert!(cached.data_generation_secs.is_none());
    assert_eq!(cached.error_matrix.labels(), generated.error_matrix.labels());
    for (a, b) in cached.error_matrix.rows().iter().zip(generated.error_matrix.rows()) {
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() <= 1e-12 * y.abs().max(1.0), "{x} vs {y}");
        }
    }
}

#[test]
fn out_of_sample_length_not_divisible_by_trial_size_is_rejected() {
    let truth = [1.0, 2.0, 3.0, 4.0, 5.0];
    let preds = vec![("Kriging".to_string(), truth.to_vec())];
    let err = evaluate(&truth, &preds, 2).unwrap_err();
    assert!(matches!(err, AsbError::Partition { len: 5, trial_size: 2 }));
    assert_eq!(err.code(), "ASB-2002");
}

#[test]
fn cached_partition_failure_is_logged_as_stage_failure() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = common::synthetic_config(dir.path());
    config.data.mode = DataMode::Cached;
    let store = ArtifactStore::new(&config.data.input_dir);
    let x = generate_design(&ParameterSpace::unit_cube(5).unwrap(), 8, 0).unwrap();
    let y: Vec<f64> = x.iter().map(|p| p.iter().sum()).collect();
    store.save_training(&x, &y).unwrap();
    store.save_out_of_sample(&x[..5], &y[..5]).unwrap();

    let err = run_pipeline(&config).unwrap_err();
    assert!(matches!(err, AsbError::Partition { len: 5, trial_size: 2 }));

    let failed: Vec<Value> = log_events(&config)
        .into_iter()
        .filter(|e| e["event"] == "stage_failed")
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0]["stage"], "monte_carlo");
    assert_eq!(failed[0]["error_code"], "ASB-2002");
}

#[test]
fn too_small_candidate_pool_is_insufficient() {
    let space = ParameterSpace::unit_cube(5).unwrap();
    let training = generate_design(&space, 8, 0).unwrap();
    let mut pool = training.clone();
    pool.push(vec![0.01; 5]);
    pool.push(vec![0.02; 5]);

    let err = filter_disjoint(pool, &training, 4).unwrap_err();
    match err {
        AsbError::InsufficientPool {
            required,
            available,
            shortfall,
        } => {
            assert_eq!((required, available, shortfall), (4, 2, 2));
        }
        other => panic!("expected InsufficientPool, got {other}"),
    }
}

#[test]
fn degenerate_bounds_exhaust_the_pipeline_candidate_pool() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = common::synthetic_config(dir.path());
    config.experiment.bounds =
        Some(ParameterSpace::from_bounds((0..5).map(|i| (format!("p{i}"), 0.5, 0.5))).unwrap());

    let err = run_pipeline(&config).unwrap_err();
    match err {
        AsbError::InsufficientPool {
            required,
            available,
            shortfall,
        } => assert_eq!((required, available, shortfall), (4, 0, 4)),
        other => panic!("expected InsufficientPool, got {other}"),
    }

    let failed: Vec<Value> = log_events(&config)
        .into_iter()
        .filter(|e| e["event"] == "stage_failed")
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0]["stage"], "oos_selection");
    assert_eq!(failed[0]["error_code"], "ASB-2001");
}

#[test]
fn unwritable_output_dir_is_logged_as_persist_failure() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = common::synthetic_config(dir.path());
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "not a directory").unwrap();
    config.data.output_dir = blocker.join("data");

    let err = run_pipeline(&config).unwrap_err();
    assert_eq!(err.code(), "ASB-4003", "{err}");

    let events = log_events(&config);
    let failed: Vec<&Value> = events.iter().filter(|e| e["event"] == "stage_failed").collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0]["stage"], "persist_training");
    assert_eq!(failed[0]["error_code"], "ASB-4003");
    assert!(!events.iter().any(|e| e["event"] == "run_complete"));
}

#[test]
fn overflowing_test_size_fails_in_setup_stage() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = common::synthetic_config(dir.path());
    config.experiment.monte_carlos = usize::MAX;

    let err = run_pipeline(&config).unwrap_err();
    assert!(matches!(err, AsbError::InvalidConfig { .. }), "{err}");
    let stages: Vec<String> = log_events(&config)
        .iter()
        .filter_map(|e| e["stage"].as_str().map(str::to_string))
        .collect();
    assert_eq!(stages, ["setup"]);
}

#[test]
fn cached_report_uses_loaded_training_size() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = common::synthetic_config(dir.path());
    run_pipeline(&config).unwrap();

    config.data.mode = DataMode::Cached;
    config.experiment.budget = 16;
    let cached = run_pipeline(&config).unwrap();
    assert_eq!(cached.budget, 8);

    #[cfg(feature = "plot")]
    {
        let plot = cached.plot.as_ref().expect("plot path");
        assert!(plot.ends_with("xgboost_kriging_ba_comparison_8.svg"), "{}", plot.display());
    }
}

#[test]
fn missing_cached_inputs_fail_before_fitting() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = common::synthetic_config(dir.path());
    config.data.mode = DataMode::Cached;
    let err = run_pipeline(&config).unwrap_err();
    assert_eq!(err.code(), "ASB-4002");
    let stages: Vec<String> = log_events(&config)
        .iter()
        .filter_map(|e| e["stage"].as_str().map(str::to_string))
        .collect();
    assert_eq!(stages, ["load_cached"]);
}
