//! Activity log: one self-contained JSON object per line, appended per event.
//!
//! Lines are serialised in full before a single `write_all`, so a tailing
//! reader never observes half an event. Failures degrade instead of aborting a
//! benchmark run:
//! 1. primary path
//! 2. optional fallback path
//! 3. stderr with an `[ASB-JSONL]` prefix
//! 4. silent discard

#![allow(missing_docs)]

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{AsbError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Benchmark lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    RunStart,
    StageComplete,
    StageFailed,
    SecondaryRun,
    SurrogateSummary,
    RunComplete,
}

/// A single activity record. Only `ts`, `event` and `severity` are always present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// RFC 3339 UTC timestamp, millisecond precision.
    pub ts: String,
    pub event: EventType,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    /// Points, rows or trials produced by the stage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surrogate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ok: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl LogEntry {
    pub fn new(event: EventType, severity: Severity) -> Self {
        Self {
            ts: format_utc_now(),
            event,
            severity,
            stage: None,
            count: None,
            duration_ms: None,
            model: None,
            budget: None,
            config_hash: None,
            surrogate: None,
            mean: None,
            variance: None,
            ok: None,
            error_code: None,
            error_message: None,
            details: None,
        }
    }

    /// A stage finished and produced `count` items.
    pub fn stage_complete(stage: &str, count: usize, duration_ms: u64) -> Self {
        let mut entry = Self::new(EventType::StageComplete, Severity::Info);
        entry.stage = Some(stage.to_string());
        entry.count = Some(count);
        entry.duration_ms = Some(duration_ms);
        entry.ok = Some(true);
        entry
    }

    /// A stage aborted the run.
    pub fn stage_failed(stage: &str, err: &AsbError) -> Self {
        let mut entry = Self::new(EventType::StageFailed, Severity::Error);
        entry.stage = Some(stage.to_string());
        entry.ok = Some(false);
        entry.error_code = Some(err.code().to_string());
        entry.error_message = Some(err.to_string());
        entry
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Primary,
    Fallback,
    Stderr,
    Discard,
}

#[derive(Debug, Clone)]
pub struct JsonlConfig {
    pub path: PathBuf,
    pub fallback_path: Option<PathBuf>,
    /// Size at which the current file is rotated to `<path>.1`.
    pub max_size_bytes: u64,
    pub max_rotated_files: u32,
}

impl JsonlConfig {
    /// Primary path only, with default rotation limits.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

impl Default for JsonlConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("asb-data").join("activity.jsonl"),
            fallback_path: None,
            max_size_bytes: 16 * 1024 * 1024,
            max_rotated_files: 3,
        }
    }
}

/// Append-only activity writer with size rotation and degradation chain.
pub struct JsonlWriter {
    config: JsonlConfig,
    writer: Option<BufWriter<File>>,
    state: WriterState,
    bytes_written: u64,
}

impl JsonlWriter {
    pub fn open(config: JsonlConfig) -> Self {
        let mut w = Self {
            config,
            writer: None,
            state: WriterState::Discard,
            bytes_written: 0,
        };
        match open_append(&w.config.path) {
            Ok((file, size)) => w.attach(file, size, WriterState::Primary),
            Err(_) => w.open_fallback(),
        }
        w
    }

    /// A writer that drops every entry, for runs with logging disabled.
    pub fn discard() -> Self {
        Self {
            config: JsonlConfig::default(),
            writer: None,
            state: WriterState::Discard,
            bytes_written: 0,
        }
    }

    pub fn write_entry(&mut self, entry: &LogEntry) {
        match serde_json::to_string(entry) {
            Ok(json) => self.write_line(&format!("{json}\n")),
            Err(e) => {
                let _ = writeln!(io::stderr(), "[ASB-JSONL] serialize error: {e}");
            }
        }
    }

    pub fn flush(&mut self) {
        if let Some(w) = self.writer.as_mut() {
            let _ = w.flush();
        }
    }

    pub fn state(&self) -> &'static str {
        match self.state {
            WriterState::Primary => "normal",
            WriterState::Fallback => "fallback",
            WriterState::Stderr => "stderr",
            WriterState::Discard => "discard",
        }
    }

    fn attach(&mut self, file: File, size: u64, state: WriterState) {
        self.writer = Some(BufWriter::new(file));
        self.state = state;
        self.bytes_written = size;
    }

    fn open_fallback(&mut self) {
        let opened = self
            .config
            .fallback_path
            .clone()
            .and_then(|fb| open_append(&fb).ok().map(|(file, size)| (fb, file, size)));
        if let Some((fb, file, size)) = opened {
            let _ = writeln!(
                io::stderr(),
                "[ASB-JSONL] primary log path failed, using fallback: {}",
                fb.display()
            );
            self.attach(file, size, WriterState::Fallback);
        } else {
            self.writer = None;
            self.state = WriterState::Stderr;
            let _ = writeln!(io::stderr(), "[ASB-JSONL] no writable log path, using stderr");
        }
    }

    fn degrade(&mut self) {
        self.writer = None;
        match self.state {
            WriterState::Primary => self.open_fallback(),
            WriterState::Fallback => self.state = WriterState::Stderr,
            WriterState::Stderr | WriterState::Discard => self.state = WriterState::Discard,
        }
    }

    fn write_line(&mut self, line: &str) {
        if self.writer.is_some() && self.bytes_written + line.len() as u64 > self.config.max_size_bytes {
            self.rotate();
        }
        match self.state {
            WriterState::Primary | WriterState::Fallback => {
                let written = self
                    .writer
                    .as_mut()
                    .is_some_and(|w| w.write_all(line.as_bytes()).is_ok());
                if written {
                    self.bytes_written += line.len() as u64;
                } else {
                    self.degrade();
                    self.write_line(line);
                }
            }
            WriterState::Stderr => {
                if write!(io::stderr(), "[ASB-JSONL] {line}").is_err() {
                    self.state = WriterState::Discard;
                }
            }
            WriterState::Discard => {}
        }
    }

    fn rotate(&mut self) {
        self.flush();
        self.writer = None;
        let base = match self.state {
            WriterState::Primary => self.config.path.clone(),
            WriterState::Fallback => match &self.config.fallback_path {
                Some(p) => p.clone(),
                None => return,
            },
            WriterState::Stderr | WriterState::Discard => return,
        };
        for i in (1..self.config.max_rotated_files).rev() {
            let _ = fs::rename(rotated_name(&base, i), rotated_name(&base, i + 1));
        }
        let _ = fs::rename(&base, rotated_name(&base, 1));
        match open_append(&base) {
            Ok((file, _)) => {
                let state = self.state;
                self.attach(file, 0, state);
            }
            Err(_) => self.degrade(),
        }
    }
}

impl Drop for JsonlWriter {
    fn drop(&mut self) {
        self.flush();
    }
}

fn open_append(path: &Path) -> Result<(File, u64)> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| AsbError::io(parent, source))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| AsbError::io(path, source))?;
    let size = file.metadata().map_or(0, |m| m.len());
    Ok((file, size))
}

/// `activity.jsonl` → `activity.jsonl.2`.
fn rotated_name(base: &Path, index: u32) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(format!(".{index}"));
    PathBuf::from(name)
}

fn format_utc_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_lines(path: &Path) -> Vec<serde_json::Value> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn stage_events_serialise_as_snake_case() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activity.jsonl");
        let mut writer = JsonlWriter::open(JsonlConfig::at(&path));
        writer.write_entry(&LogEntry::new(EventType::RunStart, Severity::Info));
        writer.write_entry(&LogEntry::stage_complete("training_design", 8, 3));
        writer.flush();

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "run_start");
        assert_eq!(lines[1]["event"], "stage_complete");
        assert_eq!(lines[1]["stage"], "training_design");
        assert_eq!(lines[1]["count"], 8);
        assert!(lines[1]["ts"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn failure_entries_carry_error_code() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fail.jsonl");
        let mut writer = JsonlWriter::open(JsonlConfig::at(&path));
        let err = AsbError::Partition {
            len: 5,
            trial_size: 2,
        };
        writer.write_entry(&LogEntry::stage_failed("monte_carlo", &err));
        writer.flush();
        let lines = read_lines(&path);
        assert_eq!(lines[0]["severity"], "error");
        assert_eq!(lines[0]["error_code"], "ASB-2002");
        assert_eq!(lines[0]["ok"], false);
    }

    #[test]
    fn unset_fields_are_omitted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sparse.jsonl");
        let mut writer = JsonlWriter::open(JsonlConfig::at(&path));
        writer.write_entry(&LogEntry::new(EventType::RunComplete, Severity::Info));
        writer.flush();
        let text = fs::read_to_string(&path).unwrap();
        assert!(!text.contains("\"stage\""));
        assert!(!text.contains("\"mean\""));
    }

    #[test]
    fn appends_across_writers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("append.jsonl");
        for _ in 0..2 {
            let mut writer = JsonlWriter::open(JsonlConfig::at(&path));
            writer.write_entry(&LogEntry::new(EventType::RunStart, Severity::Info));
        }
        assert_eq!(read_lines(&path).len(), 2);
    }

    #[test]
    fn rotation_moves_full_file_aside() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rot.jsonl");
        let mut writer = JsonlWriter::open(JsonlConfig {
            max_size_bytes: 120,
            ..JsonlConfig::at(&path)
        });
        for _ in 0..8 {
            writer.write_entry(&LogEntry::stage_complete("oos_evaluation", 100, 1));
        }
        writer.flush();
        assert!(path.exists());
        assert!(rotated_name(&path, 1).exists());
        assert!(!rotated_name(&path, 4).exists());
    }

    #[test]
    fn falls_back_when_primary_is_unwritable() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "file").unwrap();
        let fallback = dir.path().join("fallback.jsonl");
        let mut writer = JsonlWriter::open(JsonlConfig {
            fallback_path: Some(fallback.clone()),
            ..JsonlConfig::at(blocker.join("activity.jsonl"))
        });
        assert_eq!(writer.state(), "fallback");
        writer.write_entry(&LogEntry::new(EventType::RunStart, Severity::Warning));
        writer.flush();
        assert_eq!(read_lines(&fallback).len(), 1);
    }

    #[test]
    fn discard_writer_accepts_entries() {
        let mut writer = JsonlWriter::discard();
        writer.write_entry(&LogEntry::new(EventType::RunStart, Severity::Info));
        assert_eq!(writer.state(), "discard");
    }
}
