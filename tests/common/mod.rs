#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::time::{SystemTime, UNIX_EPOCH};

use abm_surrogate_bench::core::config::{Config, ModelKind};

pub struct CmdResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn resolve_bin_path() -> PathBuf {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_asb") {
        return PathBuf::from(path);
    }

    let exe_name = if cfg!(windows) { "asb.exe" } else { "asb" };
    let fallback = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .and_then(|deps| deps.parent().map(PathBuf::from))
        .map(|debug_dir| debug_dir.join(exe_name));

    match fallback {
        Some(path) if path.exists() => path,
        _ => panic!("unable to resolve asb binary path for integration test"),
    }
}

pub fn run_cli_case(case_name: &str, args: &[&str]) -> CmdResult {
    run_cli_case_in(case_name, args, None)
}

/// Run the binary with `cwd` as working directory so relative artifact paths
/// land in a scratch directory.
pub fn run_cli_case_in(case_name: &str, args: &[&str], cwd: Option<&Path>) -> CmdResult {
    let root = std::env::temp_dir().join("asb-test-logs");
    fs::create_dir_all(&root).expect("create temp test log dir");

    let log_path = root.join(format!("{}-{}.log", sanitize(case_name), now_millis()));
    let bin_path = resolve_bin_path();

    let mut command = Command::new(&bin_path);
    command
        .args(args)
        .env("RUST_BACKTRACE", "1")
        .env_remove("ASB_OUTPUT_FORMAT");
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }
    let output = command.output().expect("execute asb command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let mut log_content = String::new();
    log_content.push_str(&format!("case={case_name}\n"));
    log_content.push_str(&format!("bin={}\n", bin_path.display()));
    log_content.push_str(&format!("args={args:?}\n"));
    log_content.push_str(&format!("status={}\n", output.status));
    log_content.push_str("----- stdout -----\n");
    log_content.push_str(&stdout);
    log_content.push('\n');
    log_content.push_str("----- stderr -----\n");
    log_content.push_str(&stderr);
    log_content.push('\n');
    fs::write(&log_path, log_content).expect("write test log");

    CmdResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}

/// Small synthetic experiment (`y = sum(x)` over `[0, 1)^5`) rooted in `dir`.
pub fn synthetic_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.experiment.model = ModelKind::Synthetic;
    config.experiment.budget = 8;
    config.experiment.test_size = 2;
    config.experiment.monte_carlos = 2;
    config.experiment.seed = Some(7);
    config.simulator.synthetic_dimensions = 5;
    config.simulator.parallelism = 2;
    config.surrogates.include_linear = true;
    config.surrogates.boosting.n_estimators = 20;
    config.secondary.enabled = false;
    config.data.input_dir = dir.join("data");
    config.data.output_dir = dir.join("data");
    config.report.output_dir = dir.join("plots");
    config.report.activity_log = dir.join("activity.jsonl");
    config
}
