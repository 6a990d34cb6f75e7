/////////////////////////////////////////////////////////////////////////////////////////////
//
// Provides smooth analytic fields for validating interpolation and generating synthetic tables.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Analytic test fields over the `30 x 30` domain.
//!
//! # References
//! 1. Franke, R. (1979). A critical comparison of some methods for interpolation
//!    of scattered data. Naval Postgraduate School, NPS-53-79-003.
use crate::geometry::CruciformDomain;
use faer::Mat;

/// Analytic scalar fields used to exercise the interpolators.
pub struct FieldTestFunctions;

impl FieldTestFunctions {
    /// Franke's two-dimensional test function on the unit square:
    /// <div>
    /// $$
    /// \begin{aligned}
    /// F(x,y) &=
    /// \tfrac{3}{4}\exp\!\left[
    ///     -\frac{(9x-2)^2 + (9y-2)^2}{4}
    /// \right] \\[6pt]
    /// &\quad+ \tfrac{3}{4}\exp\!\left[
    ///     -\frac{(9x+1)^2}{49}
    ///     -\frac{(9y+1)^2}{10}
    /// \right] \\[6pt]
    /// &\quad+ \tfrac{1}{2}\exp\!\left[
    ///     -\frac{(9x-7)^2 + (9y-3)^2}{4}
    /// \right] \\[6pt]
    /// &\quad- \tfrac{1}{5}\exp\!\left[
    ///     -(9x-4)^2 - (9y-7)^2
    /// \right]
    /// \end{aligned}
    /// $$
    /// </div>
    #[inline]
    pub fn franke(x: f64, y: f64) -> f64 {
        let nx = 9.0 * x;
        let ny = 9.0 * y;

        let term1 = 0.75 * (-((nx - 2.0).powi(2) + (ny - 2.0).powi(2)) / 4.0).exp();
        let term2 = 0.75 * (-(nx + 1.0).powi(2) / 49.0 - (ny + 1.0).powi(2) / 10.0).exp();
        let term3 = 0.5 * (-((nx - 7.0).powi(2) + (ny - 3.0).powi(2)) / 4.0).exp();
        let term4 = -0.2 * (-(nx - 4.0).powi(2) - (ny - 7.0).powi(2)).exp();

        term1 + term2 + term3 + term4
    }

    /// Franke's function evaluated at `(n x 2)` unit-square points.
    pub fn franke_2d(points: &Mat<f64>) -> Mat<f64> {
        assert_eq!(points.ncols(), 2);
        Mat::from_fn(points.nrows(), 1, |i, _| {
            Self::franke(points[(i, 0)], points[(i, 1)])
        })
    }

    /// Franke's function stretched over the `30 x 30` domain.
    pub fn franke_domain(points: &Mat<f64>) -> Mat<f64> {
        let scale = 1.0 / CruciformDomain::SIZE;
        Self::franke_2d(&Mat::from_fn(points.nrows(), points.ncols(), |i, j| points[(i, j)] * scale))
    }

    /// A gentle saddle over the domain, zero along the two centre lines.
    #[inline]
    pub fn saddle(x: f64, y: f64) -> f64 {
        let half = 0.5 * CruciformDomain::SIZE;
        (x - half) * (y - half) / (half * half)
    }

    /// A smooth swirl, `sin(x) cos(y)` at one period over the domain.
    #[inline]
    pub fn swirl(x: f64, y: f64) -> f64 {
        let k = std::f64::consts::TAU / CruciformDomain::SIZE;
        (k * x).sin() * (k * y).cos()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn franke_domain_matches_unit_square_version() {
        let domain = faer::mat![[0.0, 0.0], [15.0, 7.5], [30.0, 30.0f64]];
        let unit = faer::mat![[0.0, 0.0], [0.5, 0.25], [1.0, 1.0f64]];
        let a = FieldTestFunctions::franke_domain(&domain);
        let b = FieldTestFunctions::franke_2d(&unit);
        for i in 0..3 {
            assert!((a[(i, 0)] - b[(i, 0)]).abs() < 1e-15);
        }
    }

    #[test]
    fn auxiliary_fields_vanish_where_expected() {
        assert_eq!(FieldTestFunctions::saddle(15.0, 3.0), 0.0);
        assert_eq!(FieldTestFunctions::saddle(30.0, 30.0), 1.0);
        assert!(FieldTestFunctions::swirl(0.0, 12.0).abs() < 1e-15);
    }
}
