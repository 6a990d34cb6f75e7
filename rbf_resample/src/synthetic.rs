/////////////////////////////////////////////////////////////////////////////////////////////
//
// Generates synthetic centroid files and simulation tables for demonstrations and tests.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Synthetic datasets.
//!
//! Centroids are random points of the cruciform domain. The deformation
//! fields of a run are three smooth analytic functions scaled by a load that
//! grows over the timesteps, so interpolation quality can be judged against
//! a known smooth truth.
use crate::{
    common::{PointFileError, format_value, generate_random_points, point_array_to_csv},
    geometry::{CruciformDomain, DomainPoint, PointSet},
    layout::RecordLayout,
    rbf_test_functions::FieldTestFunctions,
};
use csv::Writer;
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SynthError {
    #[error(transparent)]
    Points(#[from] PointFileError),

    #[error("writing {}: {source}", path.display())]
    Write { path: PathBuf, source: csv::Error },
}

/// Draws `n` uniformly distributed points of the domain.
pub fn random_domain_points(n: usize, seed: Option<u64>) -> PointSet {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let mut points = Vec::with_capacity(n);
    while points.len() < n {
        let candidates = generate_random_points(n, 2, 0.0, CruciformDomain::SIZE, Some(rng.random()));
        points.extend(
            (0..candidates.nrows())
                .map(|i| DomainPoint::new(candidates[(i, 0)], candidates[(i, 1)]))
                .filter(CruciformDomain::contains_point),
        );
    }
    points.truncate(n);
    PointSet::from_points(points)
}

/// One synthetic record over `points`.
fn synthetic_record(points: &PointSet, timesteps: usize, run_scale: f64) -> Vec<String> {
    let layout = RecordLayout::new(timesteps, points.len());
    let mut record = Vec::with_capacity(layout.record_width());

    for t in 0..timesteps {
        let load = run_scale * (t + 1) as f64 / timesteps as f64;
        record.push(format_value(100.0 * load));
        record.push(format_value(-40.0 * load));

        for p in points.iter() {
            record.push(format_value(load * FieldTestFunctions::franke(p.x / CruciformDomain::SIZE, p.y / CruciformDomain::SIZE)));
            record.push(format_value(load * FieldTestFunctions::saddle(p.x, p.y)));
            record.push(format_value(0.1 * load * FieldTestFunctions::swirl(p.x, p.y)));
        }
    }

    record
}

/// Writes a simulation table with `runs` records over `points`.
pub fn write_synthetic_table(
    path: &Path,
    points: &PointSet,
    runs: usize,
    timesteps: usize,
    seed: Option<u64>,
) -> Result<(), SynthError> {
    let write_err = |source| SynthError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let mut wtr = Writer::from_path(path).map_err(write_err)?;
    wtr.write_record(RecordLayout::new(timesteps, points.len()).header())
        .map_err(write_err)?;

    for _ in 0..runs {
        let run_scale = rng.random_range(0.5..1.5);
        wtr.write_record(synthetic_record(points, timesteps, run_scale))
            .map_err(write_err)?;
    }

    wtr.flush().map_err(|e| write_err(e.into()))?;
    debug!(runs, points = points.len(), "wrote {}", path.display());
    Ok(())
}

/// Writes a centroid file of `points` random domain points and a table of
/// `runs` records over them. Returns the centroids.
pub fn write_synthetic_dataset(
    centroids: &Path,
    table: &Path,
    points: usize,
    runs: usize,
    timesteps: usize,
    seed: Option<u64>,
) -> Result<PointSet, SynthError> {
    let centroid_set = random_domain_points(points, seed);
    point_array_to_csv(&centroid_set.to_matrix(), None, centroids)?;
    write_synthetic_table(table, &centroid_set, runs, timesteps, seed.map(|s| s.wrapping_add(1)))?;
    Ok(centroid_set)
}
