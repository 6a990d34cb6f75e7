/////////////////////////////////////////////////////////////////////////////////////////////
//
// Defines shared helpers for lattices, random point generation, and point CSV I/O.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use csv::{ReaderBuilder, Writer};
use faer::{Mat, MatRef};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while reading or writing point files.
#[derive(Debug, Error)]
pub enum PointFileError {
    #[error("reading points from {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },

    #[error("{path}, line {line}: expected at least {expected} columns, found {found}")]
    MissingColumns {
        path: PathBuf,
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("{path}, line {line}, column {column}: cannot parse {value:?} as a number")]
    Parse {
        path: PathBuf,
        line: usize,
        column: usize,
        value: String,
    },

    #[error("{path}, line {line}, column {column}: coordinate {value:?} is not finite")]
    NonFinite {
        path: PathBuf,
        line: usize,
        column: usize,
        value: String,
    },

    #[error("{path} contains no points")]
    Empty { path: PathBuf },
}

/// `n` evenly spaced samples over the closed interval `[start, end]`.
///
/// The last sample is exactly `end`, so inclusive boundary tests on the
/// upper edge of a domain see the true boundary value.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n as f64 - 1.0);
            let mut samples: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
            samples[n - 1] = end;
            samples
        }
    }
}

/// Create a regular evaluation grid from per-dimension ranges and sample counts.
///
/// The first dimension varies fastest, so a 2D grid is a row-major scan:
/// every `x` of the first `y` row, then every `x` of the second, and so on.
///
/// # Arguments
/// * `ranges` - Inclusive `(min, max)` range for each dimension.
/// * `counts` - Number of grid samples per range; must match `ranges.len()`.
///
/// # Returns
/// A `Mat<f64>` with one row per grid point and one column per dimension.
pub fn create_evaluation_grid(ranges: &[(f64, f64)], counts: &[usize]) -> Mat<f64> {
    assert_eq!(ranges.len(), counts.len());

    let axes: Vec<Vec<f64>> = ranges
        .iter()
        .zip(counts.iter())
        .map(|((start, end), n)| linspace(*start, *end, *n))
        .collect();

    let total_points: usize = counts.iter().product();
    let num_dimensions = ranges.len();

    Mat::from_fn(total_points, num_dimensions, |row_idx, col_idx| {
        let stride = match col_idx == 0 {
            true => 1,
            false => counts[..col_idx].iter().product::<usize>(),
        };

        let index_in_dim = (row_idx / stride) % counts[col_idx];
        axes[col_idx][index_in_dim]
    })
}

/// Generate a matrix of random points in the axis-aligned box `[lo, hi)^d`.
///
/// # Parameters
/// - `n`: Number of points to generate (rows in the output matrix).
/// - `d`: Number of spatial dimensions per point (columns in the output matrix).
/// - `seed`: Optional random seed. `Some(seed)` gives the same points on every
///   run, `None` seeds from the operating system.
pub fn generate_random_points(n: usize, d: usize, lo: f64, hi: f64, seed: Option<u64>) -> Mat<f64> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    Mat::from_fn(n, d, |_, _| rng.random_range(lo..hi))
}

/// Load point coordinates from a header-less CSV file.
///
/// Each row holds one point; the first `dims` columns are its coordinates
/// and any further columns are ignored. `NaN` and infinite coordinates are
/// rejected.
///
/// # Returns
/// A `(n_rows x dims)` matrix.
pub fn csv_to_point_array(file_path: &Path, dims: usize) -> Result<Mat<f64>, PointFileError> {
    let csv_err = |source| PointFileError::Csv {
        path: file_path.to_path_buf(),
        source,
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(file_path)
        .map_err(csv_err)?;

    let mut data = Vec::new();
    let mut num_rows = 0;

    for (row_idx, result) in reader.records().enumerate() {
        let record = result.map_err(csv_err)?;
        let line = row_idx + 1;

        if record.len() < dims {
            return Err(PointFileError::MissingColumns {
                path: file_path.to_path_buf(),
                line,
                expected: dims,
                found: record.len(),
            });
        }

        for (column, value) in record.iter().take(dims).enumerate() {
            let parsed: f64 = value.trim().parse().map_err(|_| PointFileError::Parse {
                path: file_path.to_path_buf(),
                line,
                column,
                value: value.to_string(),
            })?;
            if !parsed.is_finite() {
                return Err(PointFileError::NonFinite {
                    path: file_path.to_path_buf(),
                    line,
                    column,
                    value: value.to_string(),
                });
            }
            data.push(parsed);
        }

        num_rows += 1;
    }

    if num_rows == 0 {
        return Err(PointFileError::Empty {
            path: file_path.to_path_buf(),
        });
    }

    Ok(MatRef::from_row_major_slice(data.as_slice(), num_rows, dims).to_owned())
}

/// Write point coordinates to a CSV file, one point per row.
///
/// With `headers` set to `Some(names)` a header row is written first;
/// `None` gives a header-less file that [`csv_to_point_array`] reads back.
pub fn point_array_to_csv(
    points: &Mat<f64>,
    headers: Option<&[&str]>,
    file_path: &Path,
) -> Result<(), PointFileError> {
    let csv_err = |source| PointFileError::Csv {
        path: file_path.to_path_buf(),
        source,
    };

    let mut wtr = Writer::from_path(file_path).map_err(csv_err)?;

    if let Some(headers) = headers {
        wtr.write_record(headers).map_err(csv_err)?;
    }

    for row in points.row_iter() {
        let record: Vec<String> = row.iter().map(|c| format_value(*c)).collect();
        wtr.write_record(&record).map_err(csv_err)?;
    }

    wtr.flush().map_err(|e| csv_err(e.into()))?;
    Ok(())
}

/// Shortest text form of `value` that parses back to the same `f64`.
#[inline]
pub fn format_value(value: f64) -> String {
    format!("{:?}", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn linspace_hits_both_ends_exactly() {
        let xs = linspace(0.0, 30.0, 30);
        assert_eq!(xs.len(), 30);
        assert_eq!(xs[0], 0.0);
        assert_eq!(xs[29], 30.0);
        assert_eq!(linspace(0.0, 30.0, 1), vec![0.0]);
        assert!(linspace(0.0, 30.0, 0).is_empty());
    }

    #[test]
    fn grid_is_row_major_with_x_fastest() {
        let grid = create_evaluation_grid(&[(0.0, 2.0), (0.0, 10.0)], &[3, 2]);
        assert_eq!(grid.nrows(), 6);
        let rows: Vec<(f64, f64)> = (0..6).map(|i| (grid[(i, 0)], grid[(i, 1)])).collect();
        assert_eq!(
            rows,
            vec![(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (0.0, 10.0), (1.0, 10.0), (2.0, 10.0)]
        );
    }

    #[test]
    fn seeded_random_points_are_reproducible_and_bounded() {
        let a = generate_random_points(50, 2, 0.0, 30.0, Some(7));
        let b = generate_random_points(50, 2, 0.0, 30.0, Some(7));
        assert_eq!(a, b);
        assert!(a.col(0).iter().chain(a.col(1).iter()).all(|v| (0.0..30.0).contains(v)));
    }

    #[test]
    fn point_csv_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("centroids.csv");
        let points = faer::mat![[0.1, 2.5], [29.75, 1e-7], [15.0, 30.0f64]];

        point_array_to_csv(&points, None, &path).unwrap();
        let back = csv_to_point_array(&path, 2).unwrap();

        assert_eq!(back, points);
    }

    #[test]
    fn unparseable_coordinate_reports_its_position() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "1.0,2.0\n3.0,oops\n").unwrap();

        match csv_to_point_array(&path, 2).unwrap_err() {
            PointFileError::Parse { line, column, value, .. } => {
                assert_eq!((line, column, value.as_str()), (2, 1, "oops"));
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn non_finite_coordinates_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("centroids.csv");

        for (text, bad) in [("NaN,1.0\n2.0,3.0\n", (1, 0, "NaN")), ("1.0,2.0\n3.0,-inf\n", (2, 1, "-inf"))] {
            std::fs::write(&path, text).unwrap();
            match csv_to_point_array(&path, 2).unwrap_err() {
                PointFileError::NonFinite { line, column, value, .. } => {
                    assert_eq!((line, column, value.as_str()), bad);
                }
                other => panic!("unexpected error {other}"),
            }
        }
    }

    #[test]
    fn empty_point_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        std::fs::write(&path, "").unwrap();
        assert!(matches!(csv_to_point_array(&path, 2), Err(PointFileError::Empty { .. })));
    }
}
