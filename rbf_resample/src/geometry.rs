/////////////////////////////////////////////////////////////////////////////////////////////
//
// Describes the cruciform simulation domain and generates the filtered point sets used as grids.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Cruciform domain geometry and grid generation.
//!
//! The domain is the `30 x 30` square with the top-right quadrant and a
//! central disk of radius 7 removed. The two re-entrant corners where the
//! disk meets the quadrant are rounded by fillets of radius 2.5.
use crate::common::create_evaluation_grid;
use faer::Mat;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while generating a grid point set.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MeshError {
    /// A lattice needs at least two samples per axis to span the domain.
    #[error("grid resolution must be at least 2, got {0}")]
    InvalidResolution(usize),

    /// No lattice point fell inside the domain.
    #[error("no points of the {0} x {0} lattice lie inside the domain")]
    Empty(usize),
}

/// A point of the cruciform domain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DomainPoint {
    pub x: f64,
    pub y: f64,
}

impl DomainPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An ordered set of domain points.
///
/// The order is significant: value arrays are aligned with the set by
/// position, so the `i`-th value of a field belongs to the `i`-th point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointSet {
    points: Vec<DomainPoint>,
}

impl PointSet {
    pub fn from_points(points: Vec<DomainPoint>) -> Self {
        Self { points }
    }

    /// Builds a point set from the first two columns of an `(n x d)` matrix.
    pub fn from_matrix(points: &Mat<f64>) -> Self {
        assert!(points.ncols() >= 2, "point matrix needs x and y columns");
        Self {
            points: (0..points.nrows())
                .map(|i| DomainPoint::new(points[(i, 0)], points[(i, 1)]))
                .collect(),
        }
    }

    /// Coordinates as an `(n x 2)` matrix, the form the interpolators consume.
    pub fn to_matrix(&self) -> Mat<f64> {
        Mat::from_fn(self.points.len(), 2, |i, j| match j {
            0 => self.points[i].x,
            _ => self.points[i].y,
        })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DomainPoint> {
        self.points.iter()
    }

    pub fn points(&self) -> &[DomainPoint] {
        &self.points
    }
}

impl FromIterator<DomainPoint> for PointSet {
    fn from_iter<I: IntoIterator<Item = DomainPoint>>(iter: I) -> Self {
        Self::from_points(iter.into_iter().collect())
    }
}

/// The fixed cruciform geometry.
///
/// Built from a main square minus the top-right square and a central disk.
/// Two small rectangles next to the fillet centres are cut out and then
/// partially restored by the fillet disks.
#[derive(Debug, Clone, Copy)]
pub struct CruciformDomain;

impl CruciformDomain {
    pub const SIZE: f64 = 30.0;
    const HALF: f64 = 15.0;
    const HOLE_RADIUS_SQ: f64 = 49.0;
    const FILLET_RADIUS_SQ: f64 = 6.25;
    const FILLET_NEAR: f64 = 12.5;
    const FILLET_FAR: f64 = 24.17;
    const CUT_LO: f64 = 13.16;
    const CUT_EDGE: f64 = 21.75;

    /// Whether `(x, y)` belongs to the domain.
    pub fn contains(x: f64, y: f64) -> bool {
        let in_square = (0.0..=Self::SIZE).contains(&x) && (0.0..=Self::SIZE).contains(&y);
        let in_removed_quadrant =
            x > Self::HALF && x <= Self::SIZE && y > Self::HALF && y <= Self::SIZE;
        let outside_hole =
            (x - Self::HALF).powi(2) + (y - Self::HALF).powi(2) >= Self::HOLE_RADIUS_SQ;

        let in_fillet_1 = (x - Self::FILLET_NEAR).powi(2) + (y - Self::FILLET_FAR).powi(2)
            <= Self::FILLET_RADIUS_SQ;
        let in_fillet_2 = (x - Self::FILLET_FAR).powi(2) + (y - Self::FILLET_NEAR).powi(2)
            <= Self::FILLET_RADIUS_SQ;

        let in_cut_1 = Self::CUT_LO < x
            && x < Self::HALF
            && Self::CUT_EDGE < y
            && y < Self::FILLET_FAR;
        let in_cut_2 = Self::CUT_EDGE < x
            && x < Self::FILLET_FAR
            && Self::CUT_LO < y
            && y < Self::HALF;

        (in_square && !in_removed_quadrant && outside_hole && !in_cut_1 && !in_cut_2)
            || (in_cut_1 && in_fillet_1)
            || (in_cut_2 && in_fillet_2)
    }

    pub fn contains_point(point: &DomainPoint) -> bool {
        Self::contains(point.x, point.y)
    }
}

/// Generates the grid point set of resolution `n`.
///
/// An `n x n` lattice over `[0, 30] x [0, 30]` is scanned row by row
/// (`x` fastest) and the points inside [`CruciformDomain`] are kept in scan
/// order. The same `n` always gives the same, identically ordered set.
pub fn generate_mesh(n: usize) -> Result<PointSet, MeshError> {
    if n < 2 {
        return Err(MeshError::InvalidResolution(n));
    }

    let size = CruciformDomain::SIZE;
    let lattice = create_evaluation_grid(&[(0.0, size), (0.0, size)], &[n, n]);

    let points: PointSet = (0..lattice.nrows())
        .map(|i| DomainPoint::new(lattice[(i, 0)], lattice[(i, 1)]))
        .filter(CruciformDomain::contains_point)
        .collect();

    match points.is_empty() {
        true => Err(MeshError::Empty(n)),
        false => Ok(points),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicate_cases() {
        assert!(CruciformDomain::contains(5.0, 5.0));
        assert!(!CruciformDomain::contains(20.0, 20.0));
        assert!(!CruciformDomain::contains(15.0, 15.0));

        // Fillet centre, and a point of cut-out 1 restored by fillet 1.
        assert!(CruciformDomain::contains(12.5, 24.17));
        assert!(CruciformDomain::contains(14.0, 23.0));
        assert!(CruciformDomain::contains(24.17, 12.5));
        assert!(CruciformDomain::contains(23.0, 14.0));

        // Inside the cut-outs but beyond reach of the fillets.
        assert!(!CruciformDomain::contains(14.95, 22.0));
        assert!(!CruciformDomain::contains(22.0, 14.95));

        // Boundary is inclusive, except the removed quadrant owns x, y > 15.
        assert!(CruciformDomain::contains(0.0, 30.0));
        assert!(CruciformDomain::contains(30.0, 0.0));
        assert!(CruciformDomain::contains(15.0, 30.0));
        assert!(!CruciformDomain::contains(15.01, 30.0));
        assert!(!CruciformDomain::contains(30.0, 30.0));
        assert!(!CruciformDomain::contains(-0.1, 5.0));
    }

    #[test]
    fn mesh_sizes_for_the_swept_resolutions() {
        assert_eq!(generate_mesh(20).unwrap().len(), 253);
        assert_eq!(generate_mesh(30).unwrap().len(), 564);
        assert_eq!(generate_mesh(40).unwrap().len(), 1006);
        assert_eq!(generate_mesh(2).unwrap().len(), 3);
    }

    #[test]
    fn mesh_points_satisfy_the_predicate() {
        for n in [2, 5, 17, 20, 30, 40] {
            let mesh = generate_mesh(n).unwrap();
            assert!(mesh.iter().all(CruciformDomain::contains_point), "n = {n}");
        }
    }

    #[test]
    fn mesh_is_deterministic_and_row_major() {
        let a = generate_mesh(30).unwrap();
        let b = generate_mesh(30).unwrap();
        assert_eq!(a, b);

        let first = a.points()[0];
        let second = a.points()[1];
        assert_eq!(first, DomainPoint::new(0.0, 0.0));
        assert_eq!(second.y, 0.0);
        assert!(second.x > first.x);

        // y never decreases along the scan.
        assert!(a.points().windows(2).all(|w| w[1].y >= w[0].y));
    }

    #[test]
    fn too_coarse_resolution_is_an_error() {
        assert_eq!(generate_mesh(0), Err(MeshError::InvalidResolution(0)));
        assert_eq!(generate_mesh(1), Err(MeshError::InvalidResolution(1)));
    }

    #[test]
    fn matrix_conversion_keeps_order() {
        let set = PointSet::from_points(vec![DomainPoint::new(1.0, 2.0), DomainPoint::new(3.0, 4.0)]);
        let m = set.to_matrix();
        assert_eq!(m, faer::mat![[1.0, 2.0], [3.0, 4.0f64]]);
        assert_eq!(PointSet::from_matrix(&m), set);
    }
}
