/////////////////////////////////////////////////////////////////////////////////////////////
//
// Provides parameter and builder types for configuring RBF kernels.
//
// Created on: 15 Nov 2025     Author: Daniel Owen 
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License. 
//
/////////////////////////////////////////////////////////////////////////////////////////////

use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::utils::KernelType;

/// Rejected kernel parameters.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum KernelParamsError {
    /// The shape parameter is zero, negative or not finite.
    #[error("epsilon must be positive and finite, got {0}")]
    InvalidEpsilon(f64),
}

/// Defines the [`KernelType`] to use, along with the shape parameter
/// used by the multiquadric family and the gaussian kernel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KernelParams {
    /// KernelType enum variant to use.
    pub kernel_type: KernelType,

    /// Shape parameter. Distances are divided by `epsilon` before the
    /// kernel is applied, so larger values give flatter, broader kernels.
    ///
    /// Typically set to the average spacing of the source points, see
    /// [`crate::average_spacing`]. Ignored by the polyharmonic kernels
    /// (linear, cubic, quintic, thin plate).
    pub epsilon: f64,
}

impl KernelParams {
    /// Begins building a [`KernelParams`] instance for the given kernel type.
    pub fn builder(kernel_type: KernelType) -> KernelParamsBuilder {
        KernelParamsBuilder {
            kernel_type,
            epsilon: 1.0,
        }
    }
}

/// Builder for [`KernelParams`] that provides sensible defaults.
#[derive(Debug, Clone, Copy)]
pub struct KernelParamsBuilder {
    kernel_type: KernelType,
    epsilon: f64,
}

impl KernelParamsBuilder {
    /// Sets the `epsilon` shape parameter on the builder.
    pub fn epsilon(mut self, v: f64) -> Self {
        self.epsilon = v;
        self
    }

    /// Finalises the builder into a [`KernelParams`] value.
    ///
    /// Fails if `epsilon` is not a positive finite number, which is what a
    /// shape parameter derived from non-finite coordinates looks like.
    pub fn build(self) -> Result<KernelParams, KernelParamsError> {
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(KernelParamsError::InvalidEpsilon(self.epsilon));
        }
        Ok(KernelParams {
            kernel_type: self.kernel_type,
            epsilon: self.epsilon,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epsilon_must_be_positive_and_finite() {
        let builder = KernelParams::builder(KernelType::MultiquadricRbf);
        assert_eq!(builder.build().map(|p| p.epsilon), Ok(1.0));
        assert_eq!(builder.epsilon(2.5).build().map(|p| p.epsilon), Ok(2.5));

        for bad in [0.0, -1.0, f64::INFINITY] {
            assert_eq!(builder.epsilon(bad).build(), Err(KernelParamsError::InvalidEpsilon(bad)));
        }
        assert!(matches!(
            builder.epsilon(f64::NAN).build(),
            Err(KernelParamsError::InvalidEpsilon(e)) if e.is_nan()
        ));
    }
}
