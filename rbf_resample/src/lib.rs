/////////////////////////////////////////////////////////////////////////////////////////////
//
// Exposes the public API and high-level documentation for RBF resampling of simulation fields.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # Radial Basis Function (RBF) resampling of simulation fields.
//!
//! Simulation results of a cruciform specimen are stored per element
//! centroid: for every run, twenty timesteps of a force pair and a
//! `(def_x, def_y, def_xy)` deformation triple per element. This crate
//! moves those fields between the irregular centroids and regular grids
//! clipped to the same cruciform domain, and measures what a round trip
//! loses.
//!
//! - [`generate_mesh`] builds the grid point sets.
//! - [`RBFInterpolator`] and [`FieldResampler`] fit and evaluate RBF
//!   interpolants. A resampler factors its system once and reuses it for
//!   every field it is handed.
//! - [`StreamingRecordTransformer`] streams a table through a resampler in
//!   bounded batches.
//! - [`MetricsAccumulator`] records job timings and round-trip R², MAE
//!   and MAPE.
//! - [`PipelineDriver`] sweeps grids, methods and tables.
//!
//! # Examples
//!
//! ```
//! use rbf_resample::{
//!     FieldResampler, FieldTestFunctions, generate_mesh,
//!     interpolant_config::RBFKernelType,
//!     synthetic::random_domain_points,
//! };
//!
//! // 300 scattered centroids and the 20 x 20 grid of the domain.
//! let centroids = random_domain_points(300, Some(42));
//! let grid = generate_mesh(20).unwrap();
//! assert_eq!(grid.len(), 253);
//!
//! // A smooth field at the centroids.
//! let values = FieldTestFunctions::franke_domain(&centroids.to_matrix());
//!
//! // Forward onto the grid, then back onto the centroids.
//! let forward = FieldResampler::between(&centroids, &grid, RBFKernelType::Cubic, 0.0).unwrap();
//! let inverse = FieldResampler::between(&grid, &centroids, RBFKernelType::Cubic, 0.0).unwrap();
//!
//! let on_grid = forward.resample(&values).unwrap();
//! let back = inverse.resample(&on_grid).unwrap();
//!
//! let max_diff = back
//!     .col(0)
//!     .iter()
//!     .zip(values.col(0).iter())
//!     .fold(0.0f64, |acc, (a, b)| acc.max((a - b).abs()));
//!
//! assert!(max_diff.is_finite());
//! ```
pub mod interpolant_config;

pub mod common;

pub mod geometry;

mod rbf;

pub mod layout;

pub mod transform;

pub mod metrics;

pub mod pipeline;

pub mod progress;

pub mod config;

pub mod synthetic;

mod rbf_test_functions;

pub use {
    common::{create_evaluation_grid, csv_to_point_array, generate_random_points, linspace, point_array_to_csv},
    config::{ConfigError, ExternalStage, PipelineConfig},
    geometry::{CruciformDomain, DomainPoint, MeshError, PointSet, generate_mesh},
    layout::{LayoutError, LayoutManifest, ManifestError, RecordLayout},
    metrics::{
        AccuracyMetrics, AccuracyRecord, MetricsAccumulator, MetricsError, MetricsRecord,
        MetricsTable, TimingRecord, compare_tables,
    },
    pipeline::{PipelineDriver, PipelineError, PipelineReport, SweepReport},
    rbf::{
        FieldResampler, InterpolationError, RBFInterpolator, RBFInterpolatorBuilder,
        interpolate_field, sanitize_non_finite,
    },
    rbf_test_functions::FieldTestFunctions,
    transform::{InterpolationJob, StreamingRecordTransformer, TransformError, TransformSummary},
};
