/////////////////////////////////////////////////////////////////////////////////////////////
//
// Declares the pipeline configuration: file locations, sweep parameters, and external stages.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Declares the pipeline configuration: file locations, sweep parameters, and external stages.
use crate::{
    interpolant_config::RBFKernelType,
    transform::{DEFAULT_BATCH_SIZE, DEFAULT_TIMESTEPS},
};
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Grid resolutions swept by default.
pub const DEFAULT_GRIDS: [usize; 3] = [20, 30, 40];

/// Errors raised while loading or validating a [`PipelineConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("parsing {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("no grid resolutions to sweep")]
    NoGrids,

    #[error("no interpolation methods to sweep")]
    NoMethods,

    #[error("grid resolution {0} is too coarse, at least 2 is needed")]
    GridTooCoarse(usize),

    #[error("batch size must be positive")]
    ZeroBatchSize,

    #[error("records need at least one timestep")]
    ZeroTimesteps,

    #[error("smoothing must be finite and non-negative, got {0}")]
    InvalidSmoothing(f64),
}

/// An external command run after the interpolation sweeps,
/// e.g. the training and testing of a surrogate model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalStage {
    pub name: String,
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Configuration of a pipeline run.
///
/// ### Default Values
/// - `grids`: `[20, 30, 40]`
/// - `methods`: `["linear", "cubic", "multiquadric"]`
/// - `batch_size`: `100`
/// - `timesteps`: `20`
/// - `smoothing`: `0.0`
/// - `forward_metrics`: `<data_dir>/interp_metrics.csv`
/// - `inverse_metrics`: `<data_dir>/rev_interp_metrics.csv`
///
/// A TOML file needs at least the three paths:
///
/// ```toml
/// data_dir = "data/cleaned"
/// centroids = "data/centroids.csv"
/// train_table = "data/cleaned/x_train.csv"
/// test_table = "data/cleaned/x_test.csv"
/// grids = [20, 30]
/// methods = ["linear", "multiquadric"]
///
/// [[external_stages]]
/// name = "train"
/// program = "python"
/// args = ["train.py"]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory receiving the interpolated tables.
    pub data_dir: PathBuf,

    /// Header-less `x,y` table of the element centroids.
    pub centroids: PathBuf,

    /// Training table; transformed forward and inverted.
    pub train_table: PathBuf,

    /// Test table; transformed forward only.
    #[serde(default)]
    pub test_table: Option<PathBuf>,

    #[serde(default)]
    pub forward_metrics: Option<PathBuf>,

    #[serde(default)]
    pub inverse_metrics: Option<PathBuf>,

    #[serde(default = "default_grids")]
    pub grids: Vec<usize>,

    #[serde(default = "default_methods")]
    pub methods: Vec<RBFKernelType>,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_timesteps")]
    pub timesteps: usize,

    /// Smoothing subtracted from the diagonal of every RBF system, `A - s I`,
    /// the sign convention of the legacy scattered-data `Rbf`.
    #[serde(default)]
    pub smoothing: f64,

    #[serde(default)]
    pub external_stages: Vec<ExternalStage>,
}

fn default_grids() -> Vec<usize> {
    DEFAULT_GRIDS.to_vec()
}

fn default_methods() -> Vec<RBFKernelType> {
    RBFKernelType::DEFAULT_SWEEP.to_vec()
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_timesteps() -> usize {
    DEFAULT_TIMESTEPS
}

impl PipelineConfig {
    /// Returns a new [`PipelineConfigBuilder`] with the default sweep.
    pub fn builder(
        data_dir: impl Into<PathBuf>,
        centroids: impl Into<PathBuf>,
        train_table: impl Into<PathBuf>,
    ) -> PipelineConfigBuilder {
        PipelineConfigBuilder::new(data_dir.into(), centroids.into(), train_table.into())
    }

    /// Loads and validates a TOML configuration file.
    ///
    /// Relative paths in the file are taken relative to the directory
    /// containing it.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: PipelineConfig = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }

        config.validate()?;
        Ok(config)
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };

        resolve(&mut self.data_dir);
        resolve(&mut self.centroids);
        resolve(&mut self.train_table);
        for p in [&mut self.test_table, &mut self.forward_metrics, &mut self.inverse_metrics]
            .into_iter()
            .flatten()
        {
            resolve(p);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grids.is_empty() {
            return Err(ConfigError::NoGrids);
        }
        if let Some(grid) = self.grids.iter().find(|g| **g < 2) {
            return Err(ConfigError::GridTooCoarse(*grid));
        }
        if self.methods.is_empty() {
            return Err(ConfigError::NoMethods);
        }
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.timesteps == 0 {
            return Err(ConfigError::ZeroTimesteps);
        }
        if !(self.smoothing.is_finite() && self.smoothing >= 0.0) {
            return Err(ConfigError::InvalidSmoothing(self.smoothing));
        }
        Ok(())
    }

    /// Input tables of the forward sweep, training table first.
    pub fn forward_inputs(&self) -> Vec<PathBuf> {
        std::iter::once(self.train_table.clone())
            .chain(self.test_table.clone())
            .collect()
    }

    pub fn forward_metrics_path(&self) -> PathBuf {
        self.forward_metrics
            .clone()
            .unwrap_or_else(|| self.data_dir.join("interp_metrics.csv"))
    }

    pub fn inverse_metrics_path(&self) -> PathBuf {
        self.inverse_metrics
            .clone()
            .unwrap_or_else(|| self.data_dir.join("rev_interp_metrics.csv"))
    }
}

/// A convenience builder for constructing a [`PipelineConfig`] instance.
///
/// The builder should be called via the [`PipelineConfig::builder`] method.
#[derive(Debug, Clone)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    fn new(data_dir: PathBuf, centroids: PathBuf, train_table: PathBuf) -> Self {
        Self {
            config: PipelineConfig {
                data_dir,
                centroids,
                train_table,
                test_table: None,
                forward_metrics: None,
                inverse_metrics: None,
                grids: default_grids(),
                methods: default_methods(),
                batch_size: DEFAULT_BATCH_SIZE,
                timesteps: DEFAULT_TIMESTEPS,
                smoothing: 0.0,
                external_stages: Vec::new(),
            },
        }
    }

    pub fn test_table(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.test_table = Some(path.into());
        self
    }

    pub fn forward_metrics(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.forward_metrics = Some(path.into());
        self
    }

    pub fn inverse_metrics(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.inverse_metrics = Some(path.into());
        self
    }

    pub fn grids(mut self, grids: impl Into<Vec<usize>>) -> Self {
        self.config.grids = grids.into();
        self
    }

    pub fn methods(mut self, methods: impl Into<Vec<RBFKernelType>>) -> Self {
        self.config.methods = methods.into();
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.config.batch_size = batch_size;
        self
    }

    pub fn timesteps(mut self, timesteps: usize) -> Self {
        self.config.timesteps = timesteps;
        self
    }

    pub fn smoothing(mut self, smoothing: f64) -> Self {
        self.config.smoothing = smoothing;
        self
    }

    pub fn external_stage(mut self, stage: ExternalStage) -> Self {
        self.config.external_stages.push(stage);
        self
    }

    /// Validates and returns the configuration.
    pub fn build(self) -> Result<PipelineConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
