/////////////////////////////////////////////////////////////////////////////////////////////
//
// Implements the RBF field interpolator and the factor-once resampler used by the streaming jobs.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use crate::{
    geometry::PointSet,
    interpolant_config::{InterpolantSettings, RBFKernelType},
};

use faer::{
    Mat,
    linalg::solvers::{PartialPivLu, Solve},
};
use rbf_resample_utils::{self, KernelParams, KernelParamsError};
use thiserror::Error;
use tracing::debug;

/// Errors raised while building or evaluating an interpolant.
#[derive(Debug, Error)]
pub enum InterpolationError {
    /// No source points were supplied.
    #[error("cannot build an interpolant from an empty source point set")]
    EmptySource,

    /// The value matrix does not have one row per source point.
    #[error("{values} value rows supplied for {points} source points")]
    ValueCountMismatch { points: usize, values: usize },

    /// Source and target points live in different dimensions.
    #[error("source points are {source_dims}D but target points are {target_dims}D")]
    DimensionMismatch { source_dims: usize, target_dims: usize },

    /// A coordinate is NaN or infinite.
    #[error("{role} point {row} has a non-finite coordinate")]
    NonFinitePoint { role: &'static str, row: usize },

    #[error(transparent)]
    Kernel(#[from] KernelParamsError),
}

/// Replaces every non-finite entry of `values` with exactly `0.0`.
///
/// Degenerate source configurations (e.g. duplicate points) make the
/// interpolation matrix singular and the solve produces NaN or infinite
/// values. Those are zeroed rather than reported. Returns the number of
/// entries replaced.
pub fn sanitize_non_finite(values: &mut Mat<f64>) -> usize {
    let mut replaced = 0;
    for j in 0..values.ncols() {
        for i in 0..values.nrows() {
            let v = &mut values[(i, j)];
            if !v.is_finite() {
                *v = 0.0;
                replaced += 1;
            }
        }
    }
    replaced
}

fn check_finite(points: &Mat<f64>, role: &'static str) -> Result<(), InterpolationError> {
    match (0..points.nrows()).find(|&i| points.row(i).iter().any(|c| !c.is_finite())) {
        Some(row) => Err(InterpolationError::NonFinitePoint { role, row }),
        None => Ok(()),
    }
}

fn check_inputs(points: &Mat<f64>, values_nrows: usize) -> Result<(), InterpolationError> {
    if points.nrows() == 0 {
        return Err(InterpolationError::EmptySource);
    }
    if points.nrows() != values_nrows {
        return Err(InterpolationError::ValueCountMismatch {
            points: points.nrows(),
            values: values_nrows,
        });
    }
    check_finite(points, "source")
}

fn check_targets(source: &Mat<f64>, target: &Mat<f64>) -> Result<(), InterpolationError> {
    if source.ncols() != target.ncols() {
        return Err(InterpolationError::DimensionMismatch {
            source_dims: source.ncols(),
            target_dims: target.ncols(),
        });
    }
    check_finite(target, "target")
}

/// Convenience builder for constructing an [`RBFInterpolator`].
///
/// The builder should be called via the [`RBFInterpolator::builder`] method.
pub struct RBFInterpolatorBuilder {
    points: Mat<f64>,
    point_values: Mat<f64>,
    interpolant_settings: InterpolantSettings,
}

impl RBFInterpolatorBuilder {
    fn new(
        points: Mat<f64>,
        point_values: Mat<f64>,
        interpolant_settings: InterpolantSettings,
    ) -> Self {
        Self {
            points,
            point_values,
            interpolant_settings,
        }
    }

    /// Solves the RBF system and returns the fitted [`RBFInterpolator`].
    pub fn build(self) -> Result<RBFInterpolator, InterpolationError> {
        RBFInterpolator::new(self.points, self.point_values, self.interpolant_settings)
    }
}

/// A scattered-data RBF interpolant fitted to one or more value columns.
///
/// The interpolant is `f(q) = sum_j w_j phi(|q - p_j|)` with the weights
/// solved from `(A - nugget I) w = d`, where `A_ij = phi(|p_i - p_j|)`.
/// There is no polynomial tail. Each column of `point_values` is an
/// independent field sharing the same factorisation.
#[derive(Debug)]
pub struct RBFInterpolator {
    /// Coordinates of the input data points.
    pub points: Mat<f64>,

    /// Values at each input point, one column per field.
    pub point_values: Mat<f64>,

    /// Solved weights, same shape as `point_values`.
    pub coefficients: Mat<f64>,

    /// Kernel parameters resolved against the source points.
    kernel_params: KernelParams,
}

impl RBFInterpolator {
    /// Creates a new [`RBFInterpolatorBuilder`] for the given points,
    /// values, and kernel settings.
    pub fn builder(
        points: Mat<f64>,
        point_values: Mat<f64>,
        interpolant_settings: InterpolantSettings,
    ) -> RBFInterpolatorBuilder {
        RBFInterpolatorBuilder::new(points, point_values, interpolant_settings)
    }

    fn new(
        points: Mat<f64>,
        point_values: Mat<f64>,
        interpolant_settings: InterpolantSettings,
    ) -> Result<Self, InterpolationError> {
        check_inputs(&points, point_values.nrows())?;

        let kernel_params = interpolant_settings.kernel_params(&points)?;
        let a_matrix = rbf_resample_utils::get_a_matrix_symmetric(
            &points,
            &kernel_params,
            &interpolant_settings.nugget,
        );

        let lu = a_matrix.partial_piv_lu();
        let coefficients = lu.solve(&point_values);

        Ok(Self {
            points,
            point_values,
            coefficients,
            kernel_params,
        })
    }

    /// Evaluate the interpolant at `target_points`.
    ///
    /// Returns a `(n_targets x n_fields)` matrix. Non-finite results are
    /// replaced with zero, see [`sanitize_non_finite`].
    pub fn evaluate(&self, target_points: &Mat<f64>) -> Result<Mat<f64>, InterpolationError> {
        check_targets(&self.points, target_points)?;

        let evaluation =
            rbf_resample_utils::get_a_matrix(target_points, &self.points, &self.kernel_params);
        let mut values = &evaluation * &self.coefficients;

        let replaced = sanitize_non_finite(&mut values);
        if replaced > 0 {
            debug!(replaced, "zeroed non-finite interpolated values");
        }

        Ok(values)
    }

    /// Evaluate the interpolant at the original source points.
    ///
    /// With a zero nugget this reproduces `point_values` up to the
    /// conditioning of the system, which makes it a cheap fit check.
    pub fn evaluate_at_source(&self) -> Result<Mat<f64>, InterpolationError> {
        self.evaluate(&self.points)
    }
}

/// An RBF transfer operator between a fixed source and destination point set.
///
/// The interpolation matrix of the source points only depends on the points
/// and the kernel, so it is assembled and LU factorised once. Every call to
/// [`FieldResampler::resample`] then costs one multi-column solve and one
/// matrix product, whatever the number of fields. Results equal building
/// an [`RBFInterpolator`] per field up to floating-point rounding.
pub struct FieldResampler {
    source_len: usize,
    factor: PartialPivLu<f64>,
    evaluation: Mat<f64>,
}

impl FieldResampler {
    /// Assembles and factors the system for `source_points`, and the
    /// evaluation matrix at `destination_points`.
    pub fn new(
        source_points: &Mat<f64>,
        destination_points: &Mat<f64>,
        interpolant_settings: &InterpolantSettings,
    ) -> Result<Self, InterpolationError> {
        check_inputs(source_points, source_points.nrows())?;
        check_targets(source_points, destination_points)?;

        let kernel_params = interpolant_settings.kernel_params(source_points)?;
        let a_matrix = rbf_resample_utils::get_a_matrix_symmetric(
            source_points,
            &kernel_params,
            &interpolant_settings.nugget,
        );
        let evaluation =
            rbf_resample_utils::get_a_matrix(destination_points, source_points, &kernel_params);

        Ok(Self {
            source_len: source_points.nrows(),
            factor: a_matrix.partial_piv_lu(),
            evaluation,
        })
    }

    /// Builds the resampler between two point sets.
    pub fn between(
        source: &PointSet,
        destination: &PointSet,
        kernel_type: RBFKernelType,
        nugget: f64,
    ) -> Result<Self, InterpolationError> {
        let settings = InterpolantSettings::builder(kernel_type).nugget(nugget).build();
        Self::new(&source.to_matrix(), &destination.to_matrix(), &settings)
    }

    /// Resamples every column of `values` (`n_sources x n_fields`) onto the
    /// destination points, returning a `n_destinations x n_fields` matrix
    /// with non-finite entries zeroed.
    pub fn resample(&self, values: &Mat<f64>) -> Result<Mat<f64>, InterpolationError> {
        if values.nrows() != self.source_len {
            return Err(InterpolationError::ValueCountMismatch {
                points: self.source_len,
                values: values.nrows(),
            });
        }

        let weights = self.factor.solve(values);
        let mut resampled = &self.evaluation * &weights;

        let replaced = sanitize_non_finite(&mut resampled);
        if replaced > 0 {
            debug!(replaced, "zeroed non-finite interpolated values");
        }

        Ok(resampled)
    }

    /// Resamples a single field.
    pub fn resample_field(&self, values: &[f64]) -> Result<Vec<f64>, InterpolationError> {
        let column = Mat::from_fn(values.len(), 1, |i, _| values[i]);
        let resampled = self.resample(&column)?;
        Ok(resampled.col(0).iter().copied().collect())
    }
}

/// Interpolates one scalar field known at `source` onto `destination`.
///
/// Builds a fresh interpolant on every call. Streaming jobs use a
/// [`FieldResampler`] instead so the factorisation is shared.
pub fn interpolate_field(
    source: &PointSet,
    values: &[f64],
    kernel_type: RBFKernelType,
    destination: &PointSet,
) -> Result<Vec<f64>, InterpolationError> {
    let point_values = Mat::from_fn(values.len(), 1, |i, _| values[i]);
    let settings = InterpolantSettings::builder(kernel_type).build();
    let rbfi = RBFInterpolator::builder(source.to_matrix(), point_values, settings).build()?;
    let interpolated = rbfi.evaluate(&destination.to_matrix())?;
    Ok(interpolated.col(0).iter().copied().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{geometry::DomainPoint, rbf_test_functions::FieldTestFunctions};
    use faer::utils::approx::*;

    fn scattered_points() -> Mat<f64> {
        // A jittered 6 x 6 lattice over the 30 x 30 square.
        Mat::from_fn(36, 2, |i, j| {
            let (ix, iy) = (i % 6, i / 6);
            let jitter = (((i * 7 + j * 3) % 5) as f64 - 2.0) * 0.4;
            match j {
                0 => ix as f64 * 6.0 + 1.5 + jitter,
                _ => iy as f64 * 6.0 + 1.5 - jitter,
            }
        })
    }

    #[test]
    fn interpolant_reproduces_source_values() {
        let points = scattered_points();
        let values = FieldTestFunctions::franke_domain(&points);

        for kernel in RBFKernelType::DEFAULT_SWEEP {
            let settings = InterpolantSettings::builder(kernel).build();
            let rbfi = RBFInterpolator::builder(points.clone(), values.clone(), settings)
                .build()
                .unwrap();
            let fitted = rbfi.evaluate_at_source().unwrap();

            let max_diff = fitted
                .col(0)
                .iter()
                .zip(values.col(0).iter())
                .fold(0.0f64, |acc, (a, b)| acc.max((a - b).abs()));
            assert!(max_diff < 1e-6, "{kernel}: max diff {max_diff}");
        }
    }

    #[test]
    fn duplicate_sources_never_yield_non_finite_values() {
        let points = faer::mat![[0.0, 0.0], [0.0, 0.0], [10.0, 0.0], [0.0, 10.0f64]];
        let values = faer::mat![[1.0], [2.0], [3.0], [4.0f64]];
        let targets = faer::mat![[5.0, 5.0], [1.0, 2.0], [0.0, 0.0f64]];

        for kernel in RBFKernelType::DEFAULT_SWEEP {
            let settings = InterpolantSettings::builder(kernel).build();
            let rbfi = RBFInterpolator::builder(points.clone(), values.clone(), settings)
                .build()
                .unwrap();
            let out = rbfi.evaluate(&targets).unwrap();
            assert!(out.col(0).iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn sanitize_zeroes_exactly_the_non_finite_entries() {
        let mut values = faer::mat![[1.0, f64::NAN], [f64::INFINITY, -2.5], [f64::NEG_INFINITY, 0.0f64]];
        let replaced = sanitize_non_finite(&mut values);

        assert_eq!(replaced, 3);
        assert_eq!(values, faer::mat![[1.0, 0.0], [0.0, -2.5], [0.0, 0.0f64]]);
    }

    #[test]
    fn resampler_matches_per_field_interpolants() {
        let source = scattered_points();
        let destination = Mat::from_fn(25, 2, |i, j| match j {
            0 => (i % 5) as f64 * 7.0 + 0.5,
            _ => (i / 5) as f64 * 7.0 + 0.5,
        });

        // Three fields that differ in scale and shape.
        let base = FieldTestFunctions::franke_domain(&source);
        let fields = Mat::from_fn(source.nrows(), 3, |i, j| match j {
            0 => base[(i, 0)],
            1 => -4.0 * base[(i, 0)] + 0.1 * source[(i, 0)],
            _ => 1e-3 * source[(i, 1)],
        });

        for kernel in RBFKernelType::DEFAULT_SWEEP {
            let settings = InterpolantSettings::builder(kernel).build();
            let resampler = FieldResampler::new(&source, &destination, &settings).unwrap();
            let batched = resampler.resample(&fields).unwrap();

            let mut one_at_a_time = Mat::<f64>::zeros(destination.nrows(), 3);
            for j in 0..3 {
                let column = Mat::from_fn(source.nrows(), 1, |i, _| fields[(i, j)]);
                let rbfi = RBFInterpolator::builder(source.clone(), column, settings)
                    .build()
                    .unwrap();
                one_at_a_time
                    .col_mut(j)
                    .copy_from(rbfi.evaluate(&destination).unwrap().col(0));
            }

            let approx_eq = CwiseMat(ApproxEq::eps() * 1.0e6);
            equator::assert!(&batched ~ &one_at_a_time);
        }
    }

    #[test]
    fn non_finite_coordinates_are_errors_not_zeros() {
        let mut source = scattered_points();
        source[(7, 1)] = f64::NAN;
        let destination = scattered_points();
        let settings = InterpolantSettings::builder(RBFKernelType::Cubic).build();

        assert!(matches!(
            FieldResampler::new(&source, &destination, &settings),
            Err(InterpolationError::NonFinitePoint { role: "source", row: 7 })
        ));

        let mut targets = scattered_points();
        targets[(3, 0)] = f64::INFINITY;
        assert!(matches!(
            FieldResampler::new(&destination, &targets, &settings),
            Err(InterpolationError::NonFinitePoint { role: "target", row: 3 })
        ));

        let values = FieldTestFunctions::franke_domain(&destination);
        assert!(matches!(
            RBFInterpolator::builder(source, values, settings).build(),
            Err(InterpolationError::NonFinitePoint { role: "source", row: 7 })
        ));
    }

    #[test]
    fn resampler_rejects_wrong_value_count() {
        let source = scattered_points();
        let settings = InterpolantSettings::builder(RBFKernelType::Linear).build();
        let resampler = FieldResampler::new(&source, &source, &settings).unwrap();

        let err = resampler.resample_field(&[1.0, 2.0]).unwrap_err();
        assert!(matches!(
            err,
            InterpolationError::ValueCountMismatch { points: 36, values: 2 }
        ));
    }

    #[test]
    fn interpolate_field_returns_one_value_per_destination() {
        let source = PointSet::from_points(vec![
            DomainPoint::new(0.0, 0.0),
            DomainPoint::new(10.0, 0.0),
            DomainPoint::new(0.0, 10.0),
            DomainPoint::new(10.0, 10.0),
        ]);
        let destination = PointSet::from_points(vec![
            DomainPoint::new(5.0, 5.0),
            DomainPoint::new(0.0, 0.0),
        ]);

        let out = interpolate_field(&source, &[1.0, 1.0, 1.0, 1.0], RBFKernelType::Linear, &destination)
            .unwrap();
        assert_eq!(out.len(), 2);
        assert!((out[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn empty_source_is_an_error() {
        let err = interpolate_field(
            &PointSet::from_points(vec![]),
            &[],
            RBFKernelType::Cubic,
            &PointSet::from_points(vec![DomainPoint::new(1.0, 1.0)]),
        )
        .unwrap_err();
        assert!(matches!(err, InterpolationError::EmptySource));
    }
}
