/////////////////////////////////////////////////////////////////////////////////////////////
//
// Specifies kernel, shape parameter, and smoothing options for configuring RBF interpolants.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Specifies kernel, shape parameter, and smoothing options for configuring RBF interpolants.
use rbf_resample_utils::{KernelParams, KernelParamsError, KernelType};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The radial basis functions available to the resampler.
///
/// The names used in configuration files, output file names and the
/// metrics tables are the lowercase forms returned by [`RBFKernelType::name`]:
/// `linear`, `cubic`, `quintic`, `thin_plate`, `multiquadric`,
/// `inverse_multiquadric` and `gaussian`.
#[derive(Clone, Debug, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RBFKernelType {
    Linear,
    Cubic,
    Quintic,
    ThinPlate,
    Multiquadric,
    InverseMultiquadric,
    Gaussian,
}

impl RBFKernelType {
    /// The kernels swept by default.
    pub const DEFAULT_SWEEP: [RBFKernelType; 3] = [
        RBFKernelType::Linear,
        RBFKernelType::Cubic,
        RBFKernelType::Multiquadric,
    ];

    /// Lowercase name of the kernel.
    pub fn name(&self) -> &'static str {
        match self {
            RBFKernelType::Linear => "linear",
            RBFKernelType::Cubic => "cubic",
            RBFKernelType::Quintic => "quintic",
            RBFKernelType::ThinPlate => "thin_plate",
            RBFKernelType::Multiquadric => "multiquadric",
            RBFKernelType::InverseMultiquadric => "inverse_multiquadric",
            RBFKernelType::Gaussian => "gaussian",
        }
    }

    /// Whether the kernel depends on the `epsilon` shape parameter.
    pub fn uses_shape_parameter(&self) -> bool {
        matches!(
            self,
            RBFKernelType::Multiquadric
                | RBFKernelType::InverseMultiquadric
                | RBFKernelType::Gaussian
        )
    }
}

impl fmt::Display for RBFKernelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown kernel name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown interpolation method {0:?}")]
pub struct UnknownKernelError(pub String);

impl FromStr for RBFKernelType {
    type Err = UnknownKernelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(RBFKernelType::Linear),
            "cubic" => Ok(RBFKernelType::Cubic),
            "quintic" => Ok(RBFKernelType::Quintic),
            "thin_plate" | "thin-plate" => Ok(RBFKernelType::ThinPlate),
            "multiquadric" => Ok(RBFKernelType::Multiquadric),
            "inverse" | "inverse_multiquadric" => Ok(RBFKernelType::InverseMultiquadric),
            "gaussian" => Ok(RBFKernelType::Gaussian),
            _ => Err(UnknownKernelError(s.to_string())),
        }
    }
}

impl From<RBFKernelType> for KernelType {
    fn from(value: RBFKernelType) -> KernelType {
        match value {
            RBFKernelType::Linear => KernelType::LinearRbf,
            RBFKernelType::Cubic => KernelType::CubicRbf,
            RBFKernelType::Quintic => KernelType::QuinticRbf,
            RBFKernelType::ThinPlate => KernelType::ThinPlateSplineRbf,
            RBFKernelType::Multiquadric => KernelType::MultiquadricRbf,
            RBFKernelType::InverseMultiquadric => KernelType::InverseMultiquadricRbf,
            RBFKernelType::Gaussian => KernelType::GaussianRbf,
        }
    }
}

/// A convenience builder for constructing a [`InterpolantSettings`] instance.
///
/// The builder should be called via the [`InterpolantSettings::builder`] method.
///
/// See [`InterpolantSettings`] for details on each field.
#[derive(Debug, Clone, Copy)]
pub struct InterpolantSettingsBuilder {
    pub kernel_type: RBFKernelType,
    pub epsilon: Option<f64>,
    pub nugget: f64,
}

impl InterpolantSettingsBuilder {
    /// Creates a new instance of the [`InterpolantSettingsBuilder`].
    fn new(kernel_type: RBFKernelType) -> Self {
        Self {
            kernel_type,
            epsilon: None,
            nugget: 0.0,
        }
    }

    /// Fixes the shape parameter instead of deriving it from the source points.
    pub fn epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = Some(epsilon);
        self
    }

    /// Sets the nugget (smoothing) value.
    pub fn nugget(mut self, nugget: f64) -> Self {
        self.nugget = nugget;
        self
    }

    /// Builds and returns an instance of [`InterpolantSettings`] from the values
    /// defined in the builder.
    pub fn build(self) -> InterpolantSettings {
        InterpolantSettings {
            kernel_type: self.kernel_type,
            epsilon: self.epsilon,
            nugget: self.nugget,
        }
    }
}

/// Kernel configuration of an RBF interpolant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct InterpolantSettings {
    /// The RBF kernel to use for interpolation.
    pub kernel_type: RBFKernelType,

    /// Shape parameter for the multiquadric family and the gaussian kernel.
    /// `None` (default) derives it from the source points with
    /// [`rbf_resample_utils::average_spacing`].
    pub epsilon: Option<f64>,

    /// Optional smoothing parameter, subtracted from the diagonal of the
    /// interpolation matrix. A value of `0.0` (default) enforces an exact
    /// fit to all input data.
    pub nugget: f64,
}

impl InterpolantSettings {
    /// Returns a new [`InterpolantSettingsBuilder`] for the given kernel type.
    pub fn builder(kernel_type: RBFKernelType) -> InterpolantSettingsBuilder {
        InterpolantSettingsBuilder::new(kernel_type)
    }

    /// Resolves the settings into concrete [`KernelParams`] for a source point set.
    ///
    /// Fails when the shape parameter, given or derived, is not a positive
    /// finite number.
    pub fn kernel_params(&self, source_points: &faer::Mat<f64>) -> Result<KernelParams, KernelParamsError> {
        let epsilon = self
            .epsilon
            .unwrap_or_else(|| rbf_resample_utils::average_spacing(source_points));

        KernelParams::builder(self.kernel_type.into())
            .epsilon(epsilon)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faer::mat;

    #[test]
    fn names_round_trip_through_from_str() {
        for kernel in [
            RBFKernelType::Linear,
            RBFKernelType::Cubic,
            RBFKernelType::Quintic,
            RBFKernelType::ThinPlate,
            RBFKernelType::Multiquadric,
            RBFKernelType::InverseMultiquadric,
            RBFKernelType::Gaussian,
        ] {
            assert_eq!(kernel.name().parse::<RBFKernelType>(), Ok(kernel));
        }
        assert_eq!("Cubic ".parse::<RBFKernelType>(), Ok(RBFKernelType::Cubic));
        assert!("spline".parse::<RBFKernelType>().is_err());
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&RBFKernelType::Multiquadric).unwrap();
        assert_eq!(json, "\"multiquadric\"");
        let back: RBFKernelType = serde_json::from_str("\"thin_plate\"").unwrap();
        assert_eq!(back, RBFKernelType::ThinPlate);
    }

    #[test]
    fn epsilon_defaults_to_average_spacing() {
        let points = mat![[0.0, 0.0], [2.0, 0.0], [0.0, 2.0], [2.0, 2.0f64]];
        let derived = InterpolantSettings::builder(RBFKernelType::Multiquadric)
            .build()
            .kernel_params(&points)
            .unwrap();
        assert_eq!(derived.epsilon, 1.0);
        assert_eq!(derived.kernel_type, KernelType::MultiquadricRbf);

        let fixed = InterpolantSettings::builder(RBFKernelType::Multiquadric)
            .epsilon(4.0)
            .build()
            .kernel_params(&points)
            .unwrap();
        assert_eq!(fixed.epsilon, 4.0);
    }

    #[test]
    fn non_finite_source_extent_is_rejected() {
        let points = mat![[f64::NAN, 0.0], [0.0, 2.0], [2.0, 2.0f64]];
        let settings = InterpolantSettings::builder(RBFKernelType::Multiquadric).build();
        assert!(matches!(
            settings.kernel_params(&points),
            Err(KernelParamsError::InvalidEpsilon(_))
        ));
    }
}
