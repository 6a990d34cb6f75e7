/////////////////////////////////////////////////////////////////////////////////////////////
//
// Implements the concrete RBF kernel functions and their faer-compatible evaluations.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use crate::{KernelFromParams, KernelFunction, KernelParams};
use faer::RowRef;

/// Linear RBF kernel with `phi(r) = r`.
#[derive(Clone, Debug, Copy)]
pub struct LinearRbfKernel;

impl LinearRbfKernel {
    #[inline(always)]
    pub fn phi(&self, r: f64) -> f64 {
        r
    }
}

impl KernelFunction for LinearRbfKernel {
    #[inline(always)]
    fn evaluate(&self, target: RowRef<f64>, source: RowRef<f64>) -> f64 {
        let r = crate::get_distance(target, source);
        self.phi(r)
    }
}

impl KernelFromParams for LinearRbfKernel {
    #[inline(always)]
    fn from_params(_: &KernelParams) -> Self {
        LinearRbfKernel
    }
}

/// Cubic RBF kernel with `phi(r) = r^3`.
#[derive(Clone, Debug, Copy)]
pub struct CubicRbfKernel;

impl CubicRbfKernel {
    #[inline(always)]
    pub fn phi(&self, r: f64) -> f64 {
        r.powi(3)
    }
}

impl KernelFunction for CubicRbfKernel {
    #[inline(always)]
    fn evaluate(&self, target: RowRef<f64>, source: RowRef<f64>) -> f64 {
        let r = crate::get_distance(target, source);
        self.phi(r)
    }
}

impl KernelFromParams for CubicRbfKernel {
    #[inline(always)]
    fn from_params(_: &KernelParams) -> Self {
        CubicRbfKernel
    }
}

/// Quintic RBF kernel with `phi(r) = r^5`.
#[derive(Clone, Debug, Copy)]
pub struct QuinticRbfKernel;

impl QuinticRbfKernel {
    #[inline(always)]
    pub fn phi(&self, r: f64) -> f64 {
        r.powi(5)
    }
}

impl KernelFunction for QuinticRbfKernel {
    #[inline(always)]
    fn evaluate(&self, target: RowRef<f64>, source: RowRef<f64>) -> f64 {
        let r = crate::get_distance(target, source);
        self.phi(r)
    }
}

impl KernelFromParams for QuinticRbfKernel {
    #[inline(always)]
    fn from_params(_: &KernelParams) -> Self {
        QuinticRbfKernel
    }
}

/// Thin plate spline RBF kernel with `phi(r) = r^2 log r`.
#[derive(Clone, Debug, Copy)]
pub struct ThinPlateSplineRbfKernel;

impl ThinPlateSplineRbfKernel {
    #[inline(always)]
    pub fn phi(&self, r: f64) -> f64 {
        match r.abs() < f64::EPSILON {
            true => 0.0,
            false => r.powi(2) * r.ln(),
        }
    }
}

impl KernelFunction for ThinPlateSplineRbfKernel {
    #[inline(always)]
    fn evaluate(&self, target: RowRef<f64>, source: RowRef<f64>) -> f64 {
        let r = crate::get_distance(target, source);
        self.phi(r)
    }
}

impl KernelFromParams for ThinPlateSplineRbfKernel {
    #[inline(always)]
    fn from_params(_: &KernelParams) -> Self {
        ThinPlateSplineRbfKernel
    }
}

/// Multiquadric RBF kernel with `phi(r) = sqrt((r / epsilon)^2 + 1)`.
#[derive(Clone, Debug, Copy)]
pub struct MultiquadricRbfKernel {
    pub epsilon: f64,

    // derived (computed once)
    inv_eps2: f64,
}

impl MultiquadricRbfKernel {
    #[inline(always)]
    pub fn new(epsilon: f64) -> Self {
        Self {
            epsilon,
            inv_eps2: 1.0 / (epsilon * epsilon),
        }
    }

    #[inline(always)]
    pub fn eval_r2(&self, r2: f64) -> f64 {
        (r2 * self.inv_eps2 + 1.0).sqrt()
    }

    #[inline(always)]
    pub fn phi(&self, r: f64) -> f64 {
        self.eval_r2(r * r)
    }
}

impl KernelFunction for MultiquadricRbfKernel {
    #[inline(always)]
    fn evaluate(&self, target: RowRef<f64>, source: RowRef<f64>) -> f64 {
        let r2 = get_distance_sq(target, source);
        self.eval_r2(r2)
    }
}

impl KernelFromParams for MultiquadricRbfKernel {
    #[inline(always)]
    fn from_params(p: &KernelParams) -> Self {
        Self::new(p.epsilon)
    }
}

/// Inverse multiquadric RBF kernel with `phi(r) = 1 / sqrt((r / epsilon)^2 + 1)`.
#[derive(Clone, Debug, Copy)]
pub struct InverseMultiquadricRbfKernel {
    pub epsilon: f64,
    inv_eps2: f64,
}

impl InverseMultiquadricRbfKernel {
    #[inline(always)]
    pub fn new(epsilon: f64) -> Self {
        Self {
            epsilon,
            inv_eps2: 1.0 / (epsilon * epsilon),
        }
    }

    #[inline(always)]
    pub fn eval_r2(&self, r2: f64) -> f64 {
        1.0 / (r2 * self.inv_eps2 + 1.0).sqrt()
    }

    #[inline(always)]
    pub fn phi(&self, r: f64) -> f64 {
        self.eval_r2(r * r)
    }
}

impl KernelFunction for InverseMultiquadricRbfKernel {
    #[inline(always)]
    fn evaluate(&self, target: RowRef<f64>, source: RowRef<f64>) -> f64 {
        let r2 = get_distance_sq(target, source);
        self.eval_r2(r2)
    }
}

impl KernelFromParams for InverseMultiquadricRbfKernel {
    #[inline(always)]
    fn from_params(p: &KernelParams) -> Self {
        Self::new(p.epsilon)
    }
}

/// Gaussian RBF kernel with `phi(r) = exp(-(r / epsilon)^2)`.
#[derive(Clone, Debug, Copy)]
pub struct GaussianRbfKernel {
    pub epsilon: f64,
    inv_eps2: f64,
}

impl GaussianRbfKernel {
    #[inline(always)]
    pub fn new(epsilon: f64) -> Self {
        Self {
            epsilon,
            inv_eps2: 1.0 / (epsilon * epsilon),
        }
    }

    #[inline(always)]
    pub fn eval_r2(&self, r2: f64) -> f64 {
        (-r2 * self.inv_eps2).exp()
    }

    #[inline(always)]
    pub fn phi(&self, r: f64) -> f64 {
        self.eval_r2(r * r)
    }
}

impl KernelFunction for GaussianRbfKernel {
    #[inline(always)]
    fn evaluate(&self, target: RowRef<f64>, source: RowRef<f64>) -> f64 {
        let r2 = get_distance_sq(target, source);
        self.eval_r2(r2)
    }
}

impl KernelFromParams for GaussianRbfKernel {
    #[inline(always)]
    fn from_params(p: &KernelParams) -> Self {
        Self::new(p.epsilon)
    }
}

/// Returns the squared Euclidean distance between two points.
#[inline(always)]
pub fn get_distance_sq(target: RowRef<f64>, source: RowRef<f64>) -> f64 {
    let mut dist = 0.0;
    for (t, s) in target.iter().zip(source.iter()) {
        let diff = t - s;
        dist += diff * diff;
    }
    dist
}

#[cfg(test)]
mod tests {
    use super::*;
    use faer::mat;

    #[test]
    fn polyharmonic_kernels_follow_their_powers() {
        assert_eq!(LinearRbfKernel.phi(2.0), 2.0);
        assert_eq!(CubicRbfKernel.phi(2.0), 8.0);
        assert_eq!(QuinticRbfKernel.phi(2.0), 32.0);
        assert_eq!(ThinPlateSplineRbfKernel.phi(0.0), 0.0);
        assert!((ThinPlateSplineRbfKernel.phi(2.0) - 4.0 * 2.0f64.ln()).abs() < 1e-15);
    }

    #[test]
    fn shape_parameter_kernels_at_zero_and_epsilon() {
        let mq = MultiquadricRbfKernel::new(2.0);
        assert_eq!(mq.phi(0.0), 1.0);
        assert!((mq.phi(2.0) - 2.0f64.sqrt()).abs() < 1e-15);

        let imq = InverseMultiquadricRbfKernel::new(2.0);
        assert_eq!(imq.phi(0.0), 1.0);
        assert!((imq.phi(2.0) - 1.0 / 2.0f64.sqrt()).abs() < 1e-15);

        let gauss = GaussianRbfKernel::new(2.0);
        assert_eq!(gauss.phi(0.0), 1.0);
        assert!((gauss.phi(2.0) - (-1.0f64).exp()).abs() < 1e-15);
    }

    #[test]
    fn evaluate_uses_euclidean_distance() {
        let points = mat![[1.0, 2.0], [4.0, 6.0]];
        let k = MultiquadricRbfKernel::new(5.0);
        // r = 5, so (r / eps)^2 + 1 = 2
        let v = k.evaluate(points.row(0), points.row(1));
        assert!((v - 2.0f64.sqrt()).abs() < 1e-15);
        assert_eq!(CubicRbfKernel.evaluate(points.row(0), points.row(1)), 125.0);
    }
}
