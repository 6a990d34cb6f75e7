/////////////////////////////////////////////////////////////////////////////////////////////
//
// Drives the forward and inverse interpolation sweeps and the downstream external stages.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Pipeline driver.
//!
//! The forward sweep resamples the training and test tables from the
//! centroids onto every grid with every method. The inverse sweep takes each
//! forward-resampled training table back onto the centroids and scores the
//! reconstruction against the original. Jobs run one after another.
use crate::{
    common::{PointFileError, csv_to_point_array},
    config::{ConfigError, ExternalStage, PipelineConfig},
    geometry::{MeshError, PointSet, generate_mesh},
    interpolant_config::RBFKernelType,
    layout::{LayoutManifest, ManifestError},
    metrics::{AccuracyRecord, MetricsAccumulator, MetricsError, MetricsRecord, TimingRecord},
    progress::{ProgressMsg, ProgressSink, Stage, format_minutes, report},
    transform::{InterpolationJob, StreamingRecordTransformer, TransformError, file_stem, remove_stale},
};
use std::{
    fs, io,
    path::{Path, PathBuf},
    process::Command,
    sync::Arc,
    time::{Duration, Instant},
};
use thiserror::Error;
use tracing::{info, warn};

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("loading centroids: {0}")]
    Centroids(#[from] PointFileError),

    #[error(transparent)]
    Mesh(#[from] MeshError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Metrics(#[from] MetricsError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("creating data directory {}: {source}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },

    #[error(
        "{} was written for grid {found_grid} with {found_method}, expected grid {grid} with {method}",
        path.display()
    )]
    ManifestForOtherJob {
        path: PathBuf,
        grid: usize,
        method: RBFKernelType,
        found_grid: usize,
        found_method: RBFKernelType,
    },
}

/// Path of the forward output of `input`: `<data_dir>/<stem>_<grid>_<method>.csv`.
pub fn forward_output_path(data_dir: &Path, input: &Path, grid: usize, method: RBFKernelType) -> PathBuf {
    data_dir.join(format!("{}_{grid}_{method}.csv", file_stem(input)))
}

/// Path of the inverse output of `input`: `<data_dir>/<stem>_<grid>_<method>_inv.csv`.
pub fn inverse_output_path(data_dir: &Path, input: &Path, grid: usize, method: RBFKernelType) -> PathBuf {
    data_dir.join(format!("{}_{grid}_{method}_inv.csv", file_stem(input)))
}

/// Loads the header-less `x,y` centroid table.
pub fn load_centroids(path: &Path) -> Result<PointSet, PointFileError> {
    Ok(PointSet::from_matrix(&csv_to_point_array(path, 2)?))
}

/// What a sweep produced.
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    /// One record per job that ran, in sweep order.
    pub records: Vec<MetricsRecord>,
    /// Input tables of jobs that were skipped.
    pub skipped: Vec<PathBuf>,
    pub elapsed: Duration,
}

impl SweepReport {
    pub fn timings(&self) -> impl Iterator<Item = &TimingRecord> {
        self.records.iter().filter_map(|record| match record {
            MetricsRecord::Timing(timing) => Some(timing),
            MetricsRecord::Accuracy(_) => None,
        })
    }

    pub fn accuracy(&self) -> impl Iterator<Item = &AccuracyRecord> {
        self.records.iter().filter_map(|record| match record {
            MetricsRecord::Accuracy(accuracy) => Some(accuracy),
            MetricsRecord::Timing(_) => None,
        })
    }
}

/// Exit state of an external stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOutcome {
    pub name: String,
    /// Exit code, `None` if the process could not be started or was killed.
    pub code: Option<i32>,
    pub success: bool,
}

/// What a full run produced.
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub forward: SweepReport,
    pub inverse: SweepReport,
    pub external: Vec<StageOutcome>,
}

/// Runs the sweeps described by a [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineDriver {
    config: PipelineConfig,
    transformer: StreamingRecordTransformer,
    metrics: MetricsAccumulator,
    progress: Option<Arc<dyn ProgressSink>>,
}

impl PipelineDriver {
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;

        let transformer = Self::make_transformer(&config, None);
        let metrics = MetricsAccumulator::new(config.forward_metrics_path(), config.inverse_metrics_path());

        Ok(Self {
            config,
            transformer,
            metrics,
            progress: None,
        })
    }

    /// Installs a progress sink for the driver and its jobs.
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.transformer = Self::make_transformer(&self.config, Some(Arc::clone(&progress)));
        self.progress = Some(progress);
        self
    }

    fn make_transformer(
        config: &PipelineConfig,
        progress: Option<Arc<dyn ProgressSink>>,
    ) -> StreamingRecordTransformer {
        StreamingRecordTransformer::builder()
            .batch_size(config.batch_size)
            .timesteps(config.timesteps)
            .smoothing(config.smoothing)
            .progress(progress)
            .build()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Forward sweep, inverse sweep, then the external stages.
    pub fn run(&self) -> Result<PipelineReport, PipelineError> {
        let forward = self.run_forward()?;
        let inverse = self.run_inverse()?;
        let external = self.run_external_stages();
        Ok(PipelineReport {
            forward,
            inverse,
            external,
        })
    }

    fn prepare(&self) -> Result<Arc<PointSet>, PipelineError> {
        fs::create_dir_all(&self.config.data_dir).map_err(|source| PipelineError::CreateDir {
            path: self.config.data_dir.clone(),
            source,
        })?;
        let centroids = load_centroids(&self.config.centroids)?;
        info!(points = centroids.len(), "Loaded centroids from {}", self.config.centroids.display());
        Ok(Arc::new(centroids))
    }

    fn finish_stage(&self, stage: Stage, start: Instant) -> Duration {
        let elapsed = start.elapsed();
        info!("Total elapsed time: {} minutes.", format_minutes(elapsed));
        report(self.progress.as_ref(), || ProgressMsg::StageFinished { stage, elapsed });
        elapsed
    }

    /// Resamples every forward input onto every grid with every method.
    ///
    /// The forward metrics table is recreated and receives one timing row per job.
    pub fn run_forward(&self) -> Result<SweepReport, PipelineError> {
        let start = Instant::now();
        report(self.progress.as_ref(), || ProgressMsg::StageStarted { stage: Stage::Forward });

        self.metrics.forward_table().reset()?;
        let centroids = self.prepare()?;
        let mut sweep = SweepReport::default();

        for &grid in &self.config.grids {
            let mesh = Arc::new(generate_mesh(grid)?);
            for &method in &self.config.methods {
                for input in self.config.forward_inputs() {
                    let job = InterpolationJob {
                        output: forward_output_path(&self.config.data_dir, &input, grid, method),
                        input,
                        grid,
                        method,
                        source: Arc::clone(&centroids),
                        destination: Arc::clone(&mesh),
                        expected_layout: None,
                    };
                    sweep.records.push(self.run_forward_job(&job)?.into());
                }
            }
        }

        sweep.elapsed = self.finish_stage(Stage::Forward, start);
        Ok(sweep)
    }

    /// Runs one forward job and records its duration.
    pub fn run_forward_job(&self, job: &InterpolationJob) -> Result<TimingRecord, PipelineError> {
        let clock = MetricsAccumulator::start_job();
        self.job_started(job);

        let summary = self.transformer.run(job)?;
        let elapsed = clock.elapsed();
        info!(records = summary.records, "Finished processing {} in {} minutes.", job.output_name(), format_minutes(elapsed));

        let record = self.metrics.record_timing(job, elapsed)?;
        info!("Metrics saved to {}", self.metrics.forward_table().path().display());

        self.job_finished(job, elapsed);
        Ok(record)
    }

    /// Resamples every forward-resampled training table back onto the
    /// centroids and scores it against the original training table.
    ///
    /// The inverse metrics table is recreated and receives one accuracy row
    /// per job that ran. Jobs whose forward table is missing are skipped.
    pub fn run_inverse(&self) -> Result<SweepReport, PipelineError> {
        let start = Instant::now();
        report(self.progress.as_ref(), || ProgressMsg::StageStarted { stage: Stage::Inverse });

        self.metrics.inverse_table().reset()?;
        let centroids = self.prepare()?;
        let mut sweep = SweepReport::default();
        let train = &self.config.train_table;

        for &grid in &self.config.grids {
            let mesh = Arc::new(generate_mesh(grid)?);
            for &method in &self.config.methods {
                let job = InterpolationJob {
                    input: forward_output_path(&self.config.data_dir, train, grid, method),
                    output: inverse_output_path(&self.config.data_dir, train, grid, method),
                    grid,
                    method,
                    source: Arc::clone(&mesh),
                    destination: Arc::clone(&centroids),
                    expected_layout: None,
                };

                match self.run_inverse_job(&job, train)? {
                    Some(record) => sweep.records.push(record.into()),
                    None => sweep.skipped.push(job.input.clone()),
                }
            }
        }

        sweep.elapsed = self.finish_stage(Stage::Inverse, start);
        Ok(sweep)
    }

    /// Runs one inverse job and scores its output against `original`.
    ///
    /// Returns `Ok(None)`, after logging a warning, when the job's input
    /// table does not exist. If the input has a layout manifest it must
    /// belong to the same grid and method, and the rows must match it.
    pub fn run_inverse_job(
        &self,
        job: &InterpolationJob,
        original: &Path,
    ) -> Result<Option<AccuracyRecord>, PipelineError> {
        remove_stale(&job.output)?;

        if !job.input.exists() {
            warn!("No interpolated data file to open: {}", job.input.display());
            report(self.progress.as_ref(), || ProgressMsg::JobSkipped {
                file: job.input_stem(),
                reason: "interpolated data file is missing".to_string(),
            });
            return Ok(None);
        }

        let manifest_path = LayoutManifest::path_for(&job.input);
        let expected_layout = match manifest_path.exists() {
            true => {
                let manifest = LayoutManifest::load(&manifest_path)?;
                if manifest.grid != job.grid || manifest.method != job.method {
                    return Err(PipelineError::ManifestForOtherJob {
                        path: manifest_path,
                        grid: job.grid,
                        method: job.method,
                        found_grid: manifest.grid,
                        found_method: manifest.method,
                    });
                }
                Some(manifest.layout)
            }
            false => None,
        };
        let job = InterpolationJob {
            expected_layout,
            ..job.clone()
        };

        let clock = MetricsAccumulator::start_job();
        self.job_started(&job);

        self.transformer.run(&job)?;
        let record = self.metrics.record_accuracy(&job, original, &job.output)?;

        info!("R-squared on {} method for {} grid: {}", job.method, job.grid, record.r2);
        info!("MAE on {} method for {} grid: {}", job.method, job.grid, record.mae);
        info!("MAPE on {} method for {} grid: {}", job.method, job.grid, record.mape);

        let elapsed = clock.elapsed();
        info!("Finished processing {} in {} minutes.", job.output_name(), format_minutes(elapsed));
        info!("Metrics saved to {}", self.metrics.inverse_table().path().display());

        self.job_finished(&job, elapsed);
        Ok(Some(record))
    }

    /// Runs the configured external stages in order.
    ///
    /// A stage that cannot be started or exits unsuccessfully is logged
    /// and reported; later stages still run.
    pub fn run_external_stages(&self) -> Vec<StageOutcome> {
        if self.config.external_stages.is_empty() {
            return Vec::new();
        }

        let start = Instant::now();
        report(self.progress.as_ref(), || ProgressMsg::StageStarted { stage: Stage::External });

        let outcomes = self
            .config
            .external_stages
            .iter()
            .map(|stage| self.run_external_stage(stage))
            .collect();

        self.finish_stage(Stage::External, start);
        outcomes
    }

    fn run_external_stage(&self, stage: &ExternalStage) -> StageOutcome {
        info!(program = %stage.program, "Running {}", stage.name);

        match Command::new(&stage.program).args(&stage.args).status() {
            Ok(status) => {
                if !status.success() {
                    warn!("{} exited with {status}", stage.name);
                }
                StageOutcome {
                    name: stage.name.clone(),
                    code: status.code(),
                    success: status.success(),
                }
            }
            Err(e) => {
                warn!("{} could not be started: {e}", stage.name);
                StageOutcome {
                    name: stage.name.clone(),
                    code: None,
                    success: false,
                }
            }
        }
    }

    fn job_started(&self, job: &InterpolationJob) {
        report(self.progress.as_ref(), || ProgressMsg::JobStarted {
            file: job.input_stem(),
            grid: job.grid,
            method: job.method.to_string(),
        });
    }

    fn job_finished(&self, job: &InterpolationJob, elapsed: Duration) {
        report(self.progress.as_ref(), || ProgressMsg::JobFinished {
            file: job.output_name(),
            grid: job.grid,
            method: job.method.to_string(),
            elapsed,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        layout::RecordLayout,
        metrics::read_table,
        synthetic::write_synthetic_dataset,
    };
    use tempfile::tempdir;

    fn line_count(path: &Path) -> usize {
        fs::read_to_string(path).unwrap().lines().count()
    }

    #[test]
    fn output_names_follow_the_input_stem() {
        let dir = Path::new("/data");
        let input = Path::new("/raw/x_train.csv");
        assert_eq!(
            forward_output_path(dir, input, 30, RBFKernelType::Cubic),
            PathBuf::from("/data/x_train_30_cubic.csv")
        );
        assert_eq!(
            inverse_output_path(dir, input, 40, RBFKernelType::Multiquadric),
            PathBuf::from("/data/x_train_40_multiquadric_inv.csv")
        );
    }

    #[test]
    fn inverse_job_without_forward_table_is_skipped() {
        let dir = tempdir().unwrap();
        let data = dir.path().join("data");
        let centroids = dir.path().join("centroids.csv");
        let train = dir.path().join("x_train.csv");
        write_synthetic_dataset(&centroids, &train, 30, 2, 2, Some(5)).unwrap();

        let config = PipelineConfig::builder(&data, &centroids, &train)
            .grids([20])
            .methods([RBFKernelType::Linear])
            .timesteps(2)
            .build()
            .unwrap();
        let driver = PipelineDriver::new(config).unwrap();

        let sweep = driver.run_inverse().unwrap();
        assert!(sweep.records.is_empty());
        assert_eq!(sweep.skipped, vec![data.join("x_train_20_linear.csv")]);

        // Clean slate but no rows: the metrics table is never created.
        assert!(!driver.metrics.inverse_table().path().exists());
    }

    #[test]
    fn forward_and_inverse_round_trip_on_564_centroids() {
        let dir = tempdir().unwrap();
        let data = dir.path().join("data");
        let centroids = dir.path().join("centroids.csv");
        let train = dir.path().join("x_train.csv");
        write_synthetic_dataset(&centroids, &train, 564, 1, 20, Some(42)).unwrap();

        let config = PipelineConfig::builder(&data, &centroids, &train)
            .grids([20])
            .methods([RBFKernelType::Linear])
            .build()
            .unwrap();
        let driver = PipelineDriver::new(config).unwrap();

        let forward = driver.run_forward().unwrap();
        let timings: Vec<_> = forward.timings().collect();
        assert_eq!(timings.len(), 1);
        assert_eq!(timings[0].file, "x_train");
        assert_eq!(forward.accuracy().count(), 0);

        let forward_table = read_table(&data.join("x_train_20_linear.csv")).unwrap();
        assert_eq!(forward_table.shape(), (1, 20 * (2 + 3 * 253)));

        let manifest = LayoutManifest::load(data.join("x_train_20_linear.layout.json")).unwrap();
        assert_eq!(manifest.layout, RecordLayout::new(20, 253));
        assert_eq!(manifest.source_points, 564);

        let inverse = driver.run_inverse().unwrap();
        assert!(inverse.skipped.is_empty());
        assert_eq!(inverse.records.len(), 1);

        let reconstructed = read_table(&data.join("x_train_20_linear_inv.csv")).unwrap();
        assert_eq!(reconstructed.shape(), (1, 20 * (2 + 3 * 564)));

        let record = inverse.accuracy().next().unwrap();
        // One run: every column is constant and R-squared is undefined.
        assert!(record.r2.is_nan());
        assert!(record.mae >= 0.0);
        assert!(record.mape >= 0.0);
        assert!(record.mae.is_finite());

        assert_eq!(line_count(&driver.config().forward_metrics_path()), 2);
        assert_eq!(line_count(&driver.config().inverse_metrics_path()), 2);

        // A second forward sweep starts the metrics table from scratch.
        driver.run_forward().unwrap();
        assert_eq!(line_count(&driver.config().forward_metrics_path()), 2);
    }

    #[test]
    fn non_finite_centroid_aborts_the_sweep() {
        let dir = tempdir().unwrap();
        let data = dir.path().join("data");
        let centroids = dir.path().join("centroids.csv");
        let train = dir.path().join("x_train.csv");
        write_synthetic_dataset(&centroids, &train, 30, 1, 2, Some(9)).unwrap();

        let config = PipelineConfig::builder(&data, &centroids, &train)
            .grids([20])
            .methods([RBFKernelType::Multiquadric])
            .timesteps(2)
            .build()
            .unwrap();
        let driver = PipelineDriver::new(config).unwrap();

        // Bad value in the first row, then in a later row.
        let original = fs::read_to_string(&centroids).unwrap();
        let mut lines: Vec<&str> = original.lines().collect();
        for position in [0, 2] {
            lines.insert(position, "NaN,1.0");
            fs::write(&centroids, lines.join("\n")).unwrap();

            match driver.run_forward().unwrap_err() {
                PipelineError::Centroids(PointFileError::NonFinite { line, column, .. }) => {
                    assert_eq!((line, column), (position + 1, 0));
                }
                other => panic!("unexpected error {other}"),
            }
            assert!(!data.join("x_train_20_multiquadric.csv").exists());
            lines.remove(position);
        }
    }

    #[test]
    fn failing_external_stage_is_reported_not_fatal() {
        let dir = tempdir().unwrap();
        let config = PipelineConfig::builder(dir.path(), "c.csv", "t.csv")
            .external_stage(ExternalStage {
                name: "missing".into(),
                program: "definitely-not-a-real-program-7f3a".into(),
                args: vec![],
            })
            .build()
            .unwrap();
        let outcomes = PipelineDriver::new(config).unwrap().run_external_stages();

        assert_eq!(
            outcomes,
            vec![StageOutcome {
                name: "missing".into(),
                code: None,
                success: false,
            }]
        );
    }
}
