/////////////////////////////////////////////////////////////////////////////////////////////
//
// Re-exports kernel utilities and helper functions used across the rbf_resample crates.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # Utilities for the [`rbf_resample`] crate
//!
//! Holds the radial kernels, the runtime kernel registry ([`KernelType`]) and
//! the dense kernel matrix builders used by the interpolation engine.
mod rbf_kernels;
mod traits;
mod utils;
mod kernel_helpers;

/// Implemented Kernels for use in the [`rbf_resample`] crate.
pub mod kernels {
    pub use super::rbf_kernels::*;
}

pub use {
    kernel_helpers::{KernelParams, KernelParamsBuilder, KernelParamsError},
    utils::{
        KernelType, average_spacing, get_a_matrix, get_a_matrix_symmetric,
        get_a_matrix_symmetric_typed, get_a_matrix_typed, get_distance,
        get_pointarray_extents,
    },
    traits::{KernelFromParams, KernelFunction},
};
