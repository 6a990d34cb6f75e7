/////////////////////////////////////////////////////////////////////////////////////////////
//
// Computes timing and round-trip accuracy metrics and appends them to metrics tables.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Timing and accuracy metrics.
//!
//! Accuracy compares an original table with its forward-then-inverse
//! reconstruction cell by cell:
//!
//! - `r2`: coefficient of determination per column, averaged over columns.
//!   A constant column scores `1.0` when reproduced exactly and `0.0`
//!   otherwise. Undefined (`NaN`) for fewer than two records, where every
//!   column is constant.
//! - `mae`: mean absolute error over all cells.
//! - `mape`: mean of `|y - y_hat| / max(|y|, f64::EPSILON)` over all cells,
//!   as a fraction.
use crate::{interpolant_config::RBFKernelType, transform::InterpolationJob};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use faer::{Mat, MatRef};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};
use thiserror::Error;
use tracing::warn;

/// Errors raised while computing or recording metrics.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("opening {}: {source}", path.display())]
    Open { path: PathBuf, source: csv::Error },

    #[error("reading record {row} of {}: {source}", path.display())]
    Read {
        path: PathBuf,
        row: usize,
        source: csv::Error,
    },

    #[error("{}, record {row}, column {column}: cannot parse {value:?} as a number", path.display())]
    Parse {
        path: PathBuf,
        row: usize,
        column: usize,
        value: String,
    },

    #[error("{}: record {row} has {found} values, expected {expected}", path.display())]
    RaggedRow {
        path: PathBuf,
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("tables differ in shape: original is {original:?}, reconstruction is {reconstructed:?}")]
    ShapeMismatch {
        original: (usize, usize),
        reconstructed: (usize, usize),
    },

    #[error("cannot score an empty table")]
    EmptyTable,

    #[error("writing {}: {source}", path.display())]
    Write { path: PathBuf, source: csv::Error },

    #[error("removing {}: {source}", path.display())]
    Remove { path: PathBuf, source: io::Error },
}

/// Wall-clock duration of one forward job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingRecord {
    pub grid: usize,
    pub method: RBFKernelType,
    pub file: String,
    /// Seconds.
    pub interpolation_duration: f64,
}

/// Round-trip accuracy of one inverse job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyRecord {
    pub grid: usize,
    pub method: RBFKernelType,
    pub r2: f64,
    pub mae: f64,
    pub mape: f64,
}

/// A row of one of the metrics tables, as collected by a sweep.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricsRecord {
    Timing(TimingRecord),
    Accuracy(AccuracyRecord),
}

/// Accuracy statistics of a reconstruction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccuracyMetrics {
    pub r2: f64,
    pub mae: f64,
    pub mape: f64,
}

/// Coefficient of determination, averaged uniformly over columns.
///
/// Returns `NaN` with fewer than two rows.
pub fn r2_score(y_true: MatRef<f64>, y_pred: MatRef<f64>) -> f64 {
    let (nrows, ncols) = y_true.shape();
    if nrows < 2 {
        warn!(records = nrows, "R-squared is not well-defined with less than two records");
        return f64::NAN;
    }
    let mut total = 0.0;

    for j in 0..ncols {
        let mean = (0..nrows).map(|i| y_true[(i, j)]).sum::<f64>() / nrows as f64;

        let (mut ss_res, mut ss_tot) = (0.0, 0.0);
        for i in 0..nrows {
            ss_res += (y_true[(i, j)] - y_pred[(i, j)]).powi(2);
            ss_tot += (y_true[(i, j)] - mean).powi(2);
        }

        total += match (ss_tot == 0.0, ss_res == 0.0) {
            (false, _) => 1.0 - ss_res / ss_tot,
            (true, true) => 1.0,
            (true, false) => 0.0,
        };
    }

    total / ncols as f64
}

/// Mean absolute error over all cells.
pub fn mean_absolute_error(y_true: MatRef<f64>, y_pred: MatRef<f64>) -> f64 {
    mean_over_cells(y_true, y_pred, |t, p| (t - p).abs())
}

/// Mean absolute percentage error over all cells, as a fraction.
pub fn mean_absolute_percentage_error(y_true: MatRef<f64>, y_pred: MatRef<f64>) -> f64 {
    mean_over_cells(y_true, y_pred, |t, p| (t - p).abs() / t.abs().max(f64::EPSILON))
}

fn mean_over_cells(y_true: MatRef<f64>, y_pred: MatRef<f64>, f: impl Fn(f64, f64) -> f64) -> f64 {
    let (nrows, ncols) = y_true.shape();
    let mut sum = 0.0;
    for j in 0..ncols {
        for i in 0..nrows {
            sum += f(y_true[(i, j)], y_pred[(i, j)]);
        }
    }
    sum / (nrows * ncols) as f64
}

/// Scores `reconstructed` against `original`, aligned by position.
pub fn compare_tables(original: &Mat<f64>, reconstructed: &Mat<f64>) -> Result<AccuracyMetrics, MetricsError> {
    if original.shape() != reconstructed.shape() {
        return Err(MetricsError::ShapeMismatch {
            original: original.shape(),
            reconstructed: reconstructed.shape(),
        });
    }
    if original.nrows() == 0 || original.ncols() == 0 {
        return Err(MetricsError::EmptyTable);
    }

    let (y_true, y_pred) = (original.as_ref(), reconstructed.as_ref());
    Ok(AccuracyMetrics {
        r2: r2_score(y_true, y_pred),
        mae: mean_absolute_error(y_true, y_pred),
        mape: mean_absolute_percentage_error(y_true, y_pred),
    })
}

/// Loads a whole numeric table with a header row into a `(records x columns)` matrix.
pub fn read_table(path: &Path) -> Result<Mat<f64>, MetricsError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|source| MetricsError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    let mut data = Vec::new();
    let mut width = None;
    let mut record = StringRecord::new();
    let mut row = 0;

    while reader
        .read_record(&mut record)
        .map_err(|source| MetricsError::Read {
            path: path.to_path_buf(),
            row: row + 1,
            source,
        })?
    {
        row += 1;
        let expected = *width.get_or_insert(record.len());
        if record.len() != expected {
            return Err(MetricsError::RaggedRow {
                path: path.to_path_buf(),
                row,
                expected,
                found: record.len(),
            });
        }

        for (column, value) in record.iter().enumerate() {
            let parsed = value.trim().parse::<f64>().map_err(|_| MetricsError::Parse {
                path: path.to_path_buf(),
                row,
                column,
                value: value.to_string(),
            })?;
            data.push(parsed);
        }
    }

    let ncols = width.unwrap_or(0);
    Ok(MatRef::from_row_major_slice(data.as_slice(), row, ncols).to_owned())
}

/// An append-only CSV metrics table.
///
/// Each append writes the header first if and only if the file does not
/// exist yet.
#[derive(Debug, Clone)]
pub struct MetricsTable {
    path: PathBuf,
}

impl MetricsTable {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Deletes the table if it exists.
    pub fn reset(&self) -> Result<(), MetricsError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(MetricsError::Remove {
                path: self.path.clone(),
                source,
            }),
        }
    }

    pub fn append<R: Serialize>(&self, record: &R) -> Result<(), MetricsError> {
        let write_err = |source| MetricsError::Write {
            path: self.path.clone(),
            source,
        };

        let write_header = !self.path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| write_err(e.into()))?;

        let mut wtr = WriterBuilder::new()
            .has_headers(write_header)
            .from_writer(file);
        wtr.serialize(record).map_err(write_err)?;
        wtr.flush().map_err(|e| write_err(e.into()))?;
        Ok(())
    }
}

/// Start time of a job.
#[derive(Debug, Clone, Copy)]
pub struct JobClock(Instant);

impl JobClock {
    pub fn elapsed(&self) -> Duration {
        self.0.elapsed()
    }
}

/// Produces and records the metrics of completed jobs.
#[derive(Debug, Clone)]
pub struct MetricsAccumulator {
    forward: MetricsTable,
    inverse: MetricsTable,
}

impl MetricsAccumulator {
    pub fn new(forward: impl Into<PathBuf>, inverse: impl Into<PathBuf>) -> Self {
        Self {
            forward: MetricsTable::new(forward),
            inverse: MetricsTable::new(inverse),
        }
    }

    pub fn forward_table(&self) -> &MetricsTable {
        &self.forward
    }

    pub fn inverse_table(&self) -> &MetricsTable {
        &self.inverse
    }

    pub fn start_job() -> JobClock {
        JobClock(Instant::now())
    }

    /// Builds the timing record of a forward job and appends it to the forward table.
    pub fn record_timing(&self, job: &InterpolationJob, elapsed: Duration) -> Result<TimingRecord, MetricsError> {
        let record = TimingRecord {
            grid: job.grid,
            method: job.method,
            file: job.input_stem(),
            interpolation_duration: elapsed.as_secs_f64(),
        };
        self.forward.append(&record)?;
        Ok(record)
    }

    /// Scores the reconstruction at `reconstructed` against the table at
    /// `original` and appends the result to the inverse table.
    pub fn record_accuracy(
        &self,
        job: &InterpolationJob,
        original: &Path,
        reconstructed: &Path,
    ) -> Result<AccuracyRecord, MetricsError> {
        let metrics = compare_tables(&read_table(original)?, &read_table(reconstructed)?)?;
        let record = AccuracyRecord {
            grid: job.grid,
            method: job.method,
            r2: metrics.r2,
            mae: metrics.mae,
            mape: metrics.mape,
        };
        self.inverse.append(&record)?;
        Ok(record)
    }
}

impl From<TimingRecord> for MetricsRecord {
    fn from(value: TimingRecord) -> Self {
        MetricsRecord::Timing(value)
    }
}

impl From<AccuracyRecord> for MetricsRecord {
    fn from(value: AccuracyRecord) -> Self {
        MetricsRecord::Accuracy(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faer::mat;
    use tempfile::tempdir;

    #[test]
    fn perfect_reconstruction_scores_perfectly() {
        let y = mat![[1.0, 2.0], [3.0, 5.0], [4.0, 9.0f64]];
        let m = compare_tables(&y, &y).unwrap();
        assert_eq!(m, AccuracyMetrics { r2: 1.0, mae: 0.0, mape: 0.0 });
    }

    #[test]
    fn hand_computed_scores() {
        let y_true = mat![[1.0, 10.0], [2.0, 10.0], [3.0, 10.0f64]];
        let y_pred = mat![[1.0, 10.0], [2.0, 11.0], [5.0, 10.0f64]];
        let m = compare_tables(&y_true, &y_pred).unwrap();

        // Column 0: ss_res = 4, ss_tot = 2, r2 = -1. Column 1 is constant but missed: 0.
        assert_eq!(m.r2, -0.5);
        assert_eq!(m.mae, 0.5);
        // |2| / 3 and |1| / 10 over six cells.
        assert!((m.mape - (2.0 / 3.0 + 0.1) / 6.0).abs() < 1e-15);
    }

    #[test]
    fn single_record_has_undefined_r2() {
        let y_true = mat![[1.0, 2.0, 3.0f64]];
        let y_pred = mat![[1.0, 2.5, 3.0f64]];
        let m = compare_tables(&y_true, &y_pred).unwrap();

        assert!(m.r2.is_nan());
        assert!((m.mae - 0.5 / 3.0).abs() < 1e-15);
        assert!((m.mape - 0.25 / 3.0).abs() < 1e-15);
    }

    #[test]
    fn zero_truth_uses_epsilon_floor() {
        let y_true = mat![[0.0], [1.0f64]];
        let y_pred = mat![[1e-16], [1.0f64]];
        let mape = mean_absolute_percentage_error(y_true.as_ref(), y_pred.as_ref());
        assert!((mape - 1e-16 / f64::EPSILON / 2.0).abs() < 1e-12);
    }

    #[test]
    fn degradation_is_non_negative() {
        let y_true = mat![[1.0, -2.0], [0.5, 4.0], [-3.0, 0.25f64]];
        let y_pred = mat![[0.9, -2.5], [0.7, 3.0], [-2.0, 0.0f64]];
        let m = compare_tables(&y_true, &y_pred).unwrap();
        assert!(m.r2 <= 1.0);
        assert!(m.mae >= 0.0);
        assert!(m.mape >= 0.0);
    }

    #[test]
    fn shapes_must_agree() {
        let a = mat![[1.0, 2.0f64]];
        let b = mat![[1.0], [2.0f64]];
        assert!(matches!(compare_tables(&a, &b), Err(MetricsError::ShapeMismatch { .. })));
        assert!(matches!(
            compare_tables(&Mat::<f64>::zeros(0, 3), &Mat::<f64>::zeros(0, 3)),
            Err(MetricsError::EmptyTable)
        ));
    }

    #[test]
    fn table_reading_skips_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.csv");
        fs::write(&path, "0,1,2\n1.5,2,3\n4,5e-1,-6\n").unwrap();
        assert_eq!(read_table(&path).unwrap(), mat![[1.5, 2.0, 3.0], [4.0, 0.5, -6.0f64]]);
    }

    #[test]
    fn metrics_table_writes_header_once() {
        let dir = tempdir().unwrap();
        let table = MetricsTable::new(dir.path().join("metrics.csv"));
        table.reset().unwrap();

        for grid in [20, 30, 40] {
            table
                .append(&AccuracyRecord {
                    grid,
                    method: RBFKernelType::Cubic,
                    r2: 0.5,
                    mae: 0.25,
                    mape: 1.0,
                })
                .unwrap();
        }

        let text = fs::read_to_string(table.path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec![
            "grid,method,r2,mae,mape",
            "20,cubic,0.5,0.25,1.0",
            "30,cubic,0.5,0.25,1.0",
            "40,cubic,0.5,0.25,1.0",
        ]);

        table.reset().unwrap();
        assert!(!table.path().exists());
    }

    #[test]
    fn timing_header_matches_forward_columns() {
        let dir = tempdir().unwrap();
        let table = MetricsTable::new(dir.path().join("forward.csv"));
        table
            .append(&TimingRecord {
                grid: 30,
                method: RBFKernelType::Multiquadric,
                file: "x_test".into(),
                interpolation_duration: 1.25,
            })
            .unwrap();

        let text = fs::read_to_string(table.path()).unwrap();
        assert_eq!(
            text,
            "grid,method,file,interpolation_duration\n30,multiquadric,x_test,1.25\n"
        );
    }
}
