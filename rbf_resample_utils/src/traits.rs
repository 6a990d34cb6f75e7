/////////////////////////////////////////////////////////////////////////////////////////////
//
// Declares the kernel evaluation and kernel construction traits shared by the resampling crates.
//
// Created on: 15 Nov 2025     Author: Daniel Owen 
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License. 
//
/////////////////////////////////////////////////////////////////////////////////////////////

use crate::kernel_helpers::KernelParams;
use faer::RowRef;

/// Evaluates a radial kernel between a target and source point.
///
/// Both arguments are rows of a point matrix, so the same kernel serves
/// 1D, 2D and 3D inputs without separate traits.
pub trait KernelFunction {
    fn evaluate(&self, target: RowRef<f64>, source: RowRef<f64>) -> f64;
}

/// Converts a shared [`KernelParams`] configuration into a concrete kernel type.
pub trait KernelFromParams: Sized {
    /// Constructs `Self` from a set of uniform kernel parameters.
    fn from_params(p: &KernelParams) -> Self;
}
