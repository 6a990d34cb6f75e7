/////////////////////////////////////////////////////////////////////////////////////////////
//
// Supplies general-purpose utilities for matrices, distances, and the kernel registry.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use crate::{KernelFromParams, KernelFunction, KernelParams};
use faer::{Mat, RowRef};
use serde::{Deserialize, Serialize};

/// Computes the axis aligned bounding box (AABB) extents of a matrix of points.
///
/// Returns a flat vector containing the minimum and maximum values along each column (dimension)
/// of the input matrix. The result is arranged as:
///
/// `[min_0, min_1, ..., min_n, max_0, max_1, ..., max_n]`
///
/// where `n` is the number of columns in the matrix.
///
/// # Examples
///
/// ```
/// use faer::mat;
/// use rbf_resample_utils::get_pointarray_extents;
///
/// let points = mat![
///     [1.0, 2.0],
///     [3.0, -1.0],
///     [0.5, 4.0f64]
/// ];
/// let extents = get_pointarray_extents(&points);
/// assert_eq!(extents, vec![0.5, -1.0, 3.0, 4.0]);
/// ```
#[inline(always)]
pub fn get_pointarray_extents<T>(points: &Mat<T>) -> Vec<T>
where
    T: PartialOrd + Clone,
{
    let ncols = points.shape().1;

    // The first half of the vector stores mins, the second half stores maxs.
    let mut extents: Vec<T> = vec![points.get(0, 0).clone(); 2 * ncols];

    for col in 0..ncols {
        extents[col] = points.get(0, col).clone();
        extents[col + ncols] = points.get(0, col).clone();
    }

    for row in points.row_iter() {
        for (col, item) in row.iter().enumerate() {
            if item < &extents[col] {
                extents[col] = item.clone();
            }
            if item > &extents[col + ncols] {
                extents[col + ncols] = item.clone();
            }
        }
    }

    extents
}

/// Calculates the euclidean distance between two points.
///
/// # Examples
///
/// ```
/// use faer::mat;
/// use rbf_resample_utils::get_distance;
///
/// let points = mat![
///     [1.0, 2.0],
///     [4.0, 6.0],
/// ];
///
/// let dist = get_distance(points.row(0), points.row(1));
///
/// assert_eq!(dist, 5.0);
/// ```
#[inline(always)]
pub fn get_distance(target: RowRef<f64>, source: RowRef<f64>) -> f64 {
    let mut dist = 0.0;
    for (t, s) in target.iter().zip(source.iter()) {
        let diff = t - s;
        dist += diff * diff;
    }
    dist.sqrt()
}

/// Default shape parameter for a set of source points: the average
/// spacing of `n` points spread over their bounding box.
///
/// Computed as `(prod(edges) / n)^(1 / edges.len())` over the non-zero
/// bounding box edge lengths. Returns `1.0` for an empty matrix or when
/// every edge is degenerate.
///
/// # Examples
///
/// ```
/// use faer::mat;
/// use rbf_resample_utils::average_spacing;
///
/// // 4 points spanning a 2 x 2 square: sqrt(4 / 4) = 1
/// let points = mat![[0.0, 0.0], [2.0, 0.0], [0.0, 2.0], [2.0, 2.0f64]];
/// assert_eq!(average_spacing(&points), 1.0);
/// ```
pub fn average_spacing(points: &Mat<f64>) -> f64 {
    let (n, dims) = points.shape();
    if n == 0 || dims == 0 {
        return 1.0;
    }

    let extents = get_pointarray_extents(points);
    let edges: Vec<f64> = (0..dims)
        .map(|d| extents[d + dims] - extents[d])
        .filter(|edge| *edge != 0.0)
        .collect();

    if edges.is_empty() {
        return 1.0;
    }

    let volume: f64 = edges.iter().product();
    (volume / n as f64).powf(1.0 / edges.len() as f64)
}

/// Builds a dense kernel matrix using a typed kernel function.
#[inline(always)]
pub fn get_a_matrix_typed<K>(
    target_points: &Mat<f64>,
    source_points: &Mat<f64>,
    kernel_function: &K,
) -> Mat<f64>
where
    K: KernelFunction,
{
    let m = target_points.shape().0;
    let n = source_points.shape().0;

    let mut a_matrix = Mat::<f64>::zeros(m, n);

    for j in 0..n {
        let source = source_points.row(j);

        for i in 0..m {
            let target = target_points.row(i);

            a_matrix[(i, j)] = kernel_function.evaluate(target, source);
        }
    }

    a_matrix
}

/// Builds a symmetric kernel matrix using a typed kernel function, subtracting a nugget from the diagonal.
#[inline(always)]
pub fn get_a_matrix_symmetric_typed<K>(
    points: &Mat<f64>,
    kernel_function: &K,
    nugget: &f64,
) -> Mat<f64>
where
    K: KernelFunction,
{
    let n = points.nrows();

    let mut a_matrix = Mat::<f64>::zeros(n, n);

    for j in 0..n {
        let source_row = points.row(j);

        for i in j..n {
            let target_row = points.row(i);
            let mut k_val = kernel_function.evaluate(target_row, source_row);

            if i == j {
                k_val -= nugget;
            }

            a_matrix[(i, j)] = k_val;
            a_matrix[(j, i)] = k_val;
        }
    }

    a_matrix
}

// K-free dispatcher generated from the kernel registry below.
// Assumes each kernel type implements `KernelFromParams::from_params(&KernelParams) -> K`.
macro_rules! for_each_kernel {
    ( registry = [ $( ($V:ident, $Kty:path) ),* $(,)? ] ) => {

        /// Runtime kernel selector built from the kernel registry
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum KernelType {
            $( $V, )*
        }

        /// Builds a dense `(targets x sources)` kernel matrix for the selected [`KernelType`].
        #[inline(always)]
        pub fn get_a_matrix(
            target_points: &Mat<f64>,
            source_points: &Mat<f64>,
            params: &KernelParams,
        ) -> Mat<f64> {
            match params.kernel_type {
                $(
                    KernelType::$V => {
                        let k = <$Kty as KernelFromParams>::from_params(params);
                        get_a_matrix_typed(target_points, source_points, &k)
                    }
                ),*
            }
        }

        /// Builds the symmetric interpolation matrix `A - nugget I` of `points`.
        #[inline(always)]
        pub fn get_a_matrix_symmetric(
            points: &Mat<f64>,
            params: &KernelParams,
            nugget: &f64,
        ) -> Mat<f64> {
            match params.kernel_type {
                $(
                    KernelType::$V => {
                        let k = <$Kty as KernelFromParams>::from_params(params);
                        get_a_matrix_symmetric_typed(points, &k, nugget)
                    }
                ),*
            }
        }
    };
}

for_each_kernel! {
    registry = [
        (LinearRbf,              crate::kernels::LinearRbfKernel),
        (CubicRbf,               crate::kernels::CubicRbfKernel),
        (QuinticRbf,             crate::kernels::QuinticRbfKernel),
        (ThinPlateSplineRbf,     crate::kernels::ThinPlateSplineRbfKernel),
        (MultiquadricRbf,        crate::kernels::MultiquadricRbfKernel),
        (InverseMultiquadricRbf, crate::kernels::InverseMultiquadricRbfKernel),
        (GaussianRbf,            crate::kernels::GaussianRbfKernel),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use equator::assert;
    use faer::{mat, utils::approx::*};

    #[test]
    fn average_spacing_ignores_degenerate_edges() {
        // All points on the line y = 1, so only the x edge counts.
        let points = mat![[0.0, 1.0], [3.0, 1.0], [6.0, 1.0f64]];
        assert_eq!(average_spacing(&points), 2.0);

        let single = mat![[4.0, 4.0f64]];
        assert_eq!(average_spacing(&single), 1.0);
    }

    #[test]
    fn symmetric_matrix_matches_general_matrix() {
        let points = mat![[0.0, 0.0], [1.0, 0.0], [0.0, 2.0], [3.0, 1.0f64]];
        let params = KernelParams::builder(KernelType::MultiquadricRbf)
            .epsilon(1.5)
            .build()
            .unwrap();

        let general = get_a_matrix(&points, &points, &params);
        let symmetric = get_a_matrix_symmetric(&points, &params, &0.0);

        let approx_eq = CwiseMat(ApproxEq::eps() * 8.0);
        assert!(&general ~ &symmetric);
        for i in 0..points.nrows() {
            assert_eq!(symmetric[(i, i)], 1.0);
        }
    }

    #[test]
    fn nugget_is_subtracted_from_the_diagonal_only() {
        let points = mat![[0.0, 0.0], [1.0, 0.0f64]];
        let params = KernelParams::builder(KernelType::LinearRbf).build().unwrap();
        let a = get_a_matrix_symmetric(&points, &params, &0.5);

        assert_eq!(a[(0, 0)], -0.5);
        assert_eq!(a[(1, 1)], -0.5);
        assert_eq!(a[(0, 1)], 1.0);
        assert_eq!(a[(1, 0)], 1.0);
    }
}
