//! Dataframe-style CSV files: a header row of column indices and a leading
//! row-index column, so the files stay interchangeable with pandas tooling.

#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::errors::{AsbError, Result};
use crate::core::space::DesignPoint;
use crate::evaluation::ErrorMatrix;

/// Files the pipeline persists between stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    TrainingInputs,
    TrainingResponses,
    TestInputs,
    TestResponses,
    ErrorMatrix,
}

impl Artifact {
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::TrainingInputs => "X.csv",
            Self::TrainingResponses => "y.csv",
            Self::TestInputs => "X_oos.csv",
            Self::TestResponses => "y_oos.csv",
            Self::ErrorMatrix => "mse_perf.csv",
        }
    }
}

/// Training and held-out data read back from a previous run.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedData {
    pub x: Vec<DesignPoint>,
    pub y: Vec<f64>,
    pub x_oos: Vec<DesignPoint>,
    pub y_oos: Vec<f64>,
}

/// A directory of CSV artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn path(&self, artifact: Artifact) -> PathBuf {
        self.root.join(artifact.file_name())
    }

    fn writer(&self, artifact: Artifact) -> Result<(csv::Writer<fs::File>, PathBuf)> {
        fs::create_dir_all(&self.root).map_err(|source| AsbError::io(&self.root, source))?;
        let path = self.path(artifact);
        let writer = csv::Writer::from_path(&path).map_err(|err| artifact_error(&path, &err))?;
        Ok((writer, path))
    }

    /// Write rows of design points under headers `0..D`.
    pub fn write_points(&self, artifact: Artifact, points: &[DesignPoint]) -> Result<PathBuf> {
        let (mut writer, path) = self.writer(artifact)?;
        let width = points.first().map_or(0, Vec::len);
        write_header(&mut writer, width, &path)?;
        for (index, point) in points.iter().enumerate() {
            write_row(&mut writer, &index.to_string(), point, &path)?;
        }
        finish(writer, &path)?;
        Ok(path)
    }

    /// Write a single response column under header `0`.
    pub fn write_values(&self, artifact: Artifact, values: &[f64]) -> Result<PathBuf> {
        let (mut writer, path) = self.writer(artifact)?;
        write_header(&mut writer, 1, &path)?;
        for (index, value) in values.iter().enumerate() {
            write_row(&mut writer, &index.to_string(), &[*value], &path)?;
        }
        finish(writer, &path)?;
        Ok(path)
    }

    /// Write the error matrix: one row per surrogate label, one column per trial.
    pub fn write_error_matrix(&self, matrix: &ErrorMatrix) -> Result<PathBuf> {
        let (mut writer, path) = self.writer(Artifact::ErrorMatrix)?;
        write_header(&mut writer, matrix.shape().1, &path)?;
        for (label, row) in matrix.labels().iter().zip(matrix.rows()) {
            write_row(&mut writer, label, row, &path)?;
        }
        finish(writer, &path)?;
        Ok(path)
    }

    pub fn read_points(&self, artifact: Artifact) -> Result<Vec<DesignPoint>> {
        let path = self.path(artifact);
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(&path)
            .map_err(|err| artifact_error(&path, &err))?;
        let mut rows = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record.map_err(|err| artifact_error(&path, &err))?;
            let row = record
                .iter()
                .skip(1)
                .map(|field| {
                    field.trim().parse::<f64>().map_err(|err| AsbError::Artifact {
                        path: path.clone(),
                        details: format!("row {line}: {field:?} is not a number ({err})"),
                    })
                })
                .collect::<Result<DesignPoint>>()?;
            rows.push(row);
        }
        Ok(rows)
    }

    pub fn read_values(&self, artifact: Artifact) -> Result<Vec<f64>> {
        let path = self.path(artifact);
        self.read_points(artifact)?
            .into_iter()
            .enumerate()
            .map(|(line, row)| match row.as_slice() {
                [value] => Ok(*value),
                _ => Err(AsbError::Artifact {
                    path: path.clone(),
                    details: format!("row {line}: expected one value column, found {}", row.len()),
                }),
            })
            .collect()
    }

    pub fn save_training(&self, x: &[DesignPoint], y: &[f64]) -> Result<()> {
        self.write_points(Artifact::TrainingInputs, x)?;
        self.write_values(Artifact::TrainingResponses, y)?;
        Ok(())
    }

    pub fn save_out_of_sample(&self, x_oos: &[DesignPoint], y_oos: &[f64]) -> Result<()> {
        self.write_points(Artifact::TestInputs, x_oos)?;
        self.write_values(Artifact::TestResponses, y_oos)?;
        Ok(())
    }

    /// Read all four datasets and check each inputs/responses pair lines up.
    pub fn load_data(&self) -> Result<CachedData> {
        let data = CachedData {
            x: self.read_points(Artifact::TrainingInputs)?,
            y: self.read_values(Artifact::TrainingResponses)?,
            x_oos: self.read_points(Artifact::TestInputs)?,
            y_oos: self.read_values(Artifact::TestResponses)?,
        };
        for (inputs, responses, artifact) in [
            (data.x.len(), data.y.len(), Artifact::TrainingResponses),
            (data.x_oos.len(), data.y_oos.len(), Artifact::TestResponses),
        ] {
            if inputs != responses {
                return Err(AsbError::Artifact {
                    path: self.path(artifact),
                    details: format!("{responses} responses for {inputs} input rows"),
                });
            }
        }
        Ok(data)
    }
}

fn artifact_error(path: &Path, err: &csv::Error) -> AsbError {
    AsbError::Artifact {
        path: path.to_path_buf(),
        details: err.to_string(),
    }
}

fn write_header(writer: &mut csv::Writer<fs::File>, width: usize, path: &Path) -> Result<()> {
    let header = std::iter::once(String::new()).chain((0..width).map(|c| c.to_string()));
    writer
        .write_record(header)
        .map_err(|err| artifact_error(path, &err))
}

fn write_row(writer: &mut csv::Writer<fs::File>, index: &str, values: &[f64], path: &Path) -> Result<()> {
    let record = std::iter::once(index.to_string()).chain(values.iter().map(f64::to_string));
    writer
        .write_record(record)
        .map_err(|err| artifact_error(path, &err))
}

fn finish(mut writer: csv::Writer<fs::File>, path: &Path) -> Result<()> {
    writer.flush().map_err(|source| AsbError::io(path, source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::evaluate;

    #[test]
    fn points_round_trip_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let points = vec![vec![0.1, 1.0 / 3.0, -2.5e-9], vec![5.0, 0.0, 1e300]];
        store.write_points(Artifact::TrainingInputs, &points).unwrap();
        assert_eq!(store.read_points(Artifact::TrainingInputs).unwrap(), points);
    }

    #[test]
    fn layout_has_index_column_and_numeric_header() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let path = store.write_values(Artifact::TestResponses, &[1.5, 2.0]).unwrap();
        let text = fs::read_to_string(path).unwrap();
        assert_eq!(text, ",0\n0,1.5\n1,2\n");
    }

    #[test]
    fn error_matrix_rows_are_labelled() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let preds = vec![
            ("Kriging".to_string(), vec![1.0, 1.0]),
            ("XGBoost (Batch)".to_string(), vec![0.0, 2.0]),
        ];
        let matrix = evaluate(&[0.0, 0.0], &preds, 1).unwrap();
        let path = store.write_error_matrix(&matrix).unwrap();
        let text = fs::read_to_string(path).unwrap();
        assert_eq!(text, ",0,1\nKriging,1,1\nXGBoost (Batch),0,4\n");
    }

    #[test]
    fn load_data_reads_all_four_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("nested"));
        store.save_training(&[vec![0.5, 0.5]], &[1.0]).unwrap();
        store
            .save_out_of_sample(&[vec![0.1, 0.2], vec![0.3, 0.4]], &[0.3, 0.7])
            .unwrap();
        let data = store.load_data().unwrap();
        assert_eq!(data.x, vec![vec![0.5, 0.5]]);
        assert_eq!(data.y_oos, vec![0.3, 0.7]);
    }

    #[test]
    fn missing_file_is_an_artifact_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ArtifactStore::new(dir.path()).load_data().unwrap_err();
        assert_eq!(err.code(), "ASB-4002");
    }

    #[test]
    fn mismatched_pair_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.save_training(&[vec![0.5], vec![0.6]], &[1.0]).unwrap();
        store.save_out_of_sample(&[vec![0.1]], &[0.3]).unwrap();
        assert!(matches!(
            store.load_data().unwrap_err(),
            AsbError::Artifact { .. }
        ));
    }

    #[test]
    fn non_numeric_cell_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("y.csv"), ",0\n0,abc\n").unwrap();
        let err = ArtifactStore::new(dir.path())
            .read_values(Artifact::TrainingResponses)
            .unwrap_err();
        assert!(err.to_string().contains("abc"), "{err}");
    }
}
