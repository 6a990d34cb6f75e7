/////////////////////////////////////////////////////////////////////////////////////////////
//
// Streams simulation tables record by record through an RBF resampler into batched output.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Streaming record transformer.
//!
//! A job reads its input table one record at a time, re-expresses the
//! deformation fields of every timestep over the destination points and
//! buffers the output records, flushing a batch to disk whenever it fills.
//! At most one batch of output records is held in memory.
use crate::{
    common::format_value,
    geometry::PointSet,
    interpolant_config::RBFKernelType,
    layout::{FIELD_COMPONENTS, LayoutError, LayoutManifest, ManifestError, RecordLayout},
    progress::{ProgressMsg, ProgressSink, report},
    rbf::{FieldResampler, InterpolationError},
};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use faer::Mat;
use std::{
    fs::{self, OpenOptions},
    io,
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;
use tracing::debug;

/// Records buffered before a flush unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Timesteps per record unless configured otherwise.
pub const DEFAULT_TIMESTEPS: usize = 20;

/// Errors that abort a transformation job.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("opening {}: {source}", path.display())]
    Open { path: PathBuf, source: csv::Error },

    #[error("reading record {row} of {}: {source}", path.display())]
    Read {
        path: PathBuf,
        row: usize,
        source: csv::Error,
    },

    #[error("writing {}: {source}", path.display())]
    Write { path: PathBuf, source: csv::Error },

    #[error("removing stale output {}: {source}", path.display())]
    Remove { path: PathBuf, source: io::Error },

    #[error("{}, record {row}, column {column}: cannot parse {value:?} as a number", path.display())]
    Parse {
        path: PathBuf,
        row: usize,
        column: usize,
        value: String,
    },

    #[error("{}: {source}", path.display())]
    Layout { path: PathBuf, source: LayoutError },

    #[error("{}: manifest describes {manifest:?} but the rows encode {found:?}", path.display())]
    ManifestDisagrees {
        path: PathBuf,
        manifest: RecordLayout,
        found: RecordLayout,
    },

    #[error(transparent)]
    Interpolation(#[from] InterpolationError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

/// One unit of work: resample `input` from `source` onto `destination`.
#[derive(Debug, Clone)]
pub struct InterpolationJob {
    pub input: PathBuf,
    pub output: PathBuf,
    pub grid: usize,
    pub method: RBFKernelType,
    pub source: Arc<PointSet>,
    pub destination: Arc<PointSet>,
    /// Layout the input rows must have, when known from a manifest.
    pub expected_layout: Option<RecordLayout>,
}

impl InterpolationJob {
    /// File stem of the input table, used in output names and metrics.
    pub fn input_stem(&self) -> String {
        file_stem(&self.input)
    }

    /// File name of the output table.
    pub fn output_name(&self) -> String {
        self.output
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Outcome of a completed job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformSummary {
    pub output: PathBuf,
    pub records: usize,
    pub input_layout: Option<RecordLayout>,
    pub output_layout: RecordLayout,
    pub batches: usize,
}

/// Appends batches of records to a CSV table.
///
/// A flush writes the header row first if and only if the file does not
/// exist yet, so a table built from any number of flushes carries exactly
/// one header, on its first line.
#[derive(Debug)]
pub struct BatchWriter {
    path: PathBuf,
    header: Vec<String>,
    batch: Vec<Vec<String>>,
    batch_size: usize,
    written: usize,
    flushes: usize,
    progress: Option<Arc<dyn ProgressSink>>,
}

impl BatchWriter {
    pub fn new(path: PathBuf, header: Vec<String>, batch_size: usize) -> Self {
        Self {
            path,
            header,
            batch: Vec::with_capacity(batch_size),
            batch_size: batch_size.max(1),
            written: 0,
            flushes: 0,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: Option<Arc<dyn ProgressSink>>) -> Self {
        self.progress = progress;
        self
    }

    /// Buffers a record, flushing when the batch is full.
    pub fn push(&mut self, record: Vec<String>) -> Result<(), TransformError> {
        self.batch.push(record);
        if self.batch.len() >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    /// Writes the buffered records, with the header if the file is new.
    pub fn flush(&mut self) -> Result<(), TransformError> {
        let write_header = !self.path.exists();
        if self.batch.is_empty() && !write_header {
            return Ok(());
        }

        let write_err = |source| TransformError::Write {
            path: self.path.clone(),
            source,
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| write_err(e.into()))?;
        let mut wtr = WriterBuilder::new().has_headers(false).from_writer(file);

        if write_header {
            wtr.write_record(&self.header).map_err(write_err)?;
        }
        for record in &self.batch {
            wtr.write_record(record).map_err(write_err)?;
        }
        wtr.flush().map_err(|e| write_err(e.into()))?;

        let records = self.batch.len();
        self.written += records;
        self.flushes += 1;
        self.batch.clear();

        report(self.progress.as_ref(), || ProgressMsg::BatchFlushed {
            output: self.path.clone(),
            records,
            total: self.written,
        });
        Ok(())
    }

    /// Flushes what remains and returns `(records written, flushes)`.
    ///
    /// The file exists afterwards even if no record was ever pushed.
    pub fn finish(mut self) -> Result<(usize, usize), TransformError> {
        self.flush()?;
        Ok((self.written, self.flushes))
    }
}

/// A convenience builder for constructing a [`StreamingRecordTransformer`].
///
/// The builder should be called via the [`StreamingRecordTransformer::builder`] method.
#[derive(Debug, Clone)]
pub struct StreamingRecordTransformerBuilder {
    batch_size: usize,
    timesteps: usize,
    smoothing: f64,
    progress: Option<Arc<dyn ProgressSink>>,
}

impl StreamingRecordTransformerBuilder {
    /// Records buffered before each write.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Timestep blocks per record.
    pub fn timesteps(mut self, timesteps: usize) -> Self {
        self.timesteps = timesteps;
        self
    }

    /// Nugget added to the diagonal of every RBF system.
    pub fn smoothing(mut self, smoothing: f64) -> Self {
        self.smoothing = smoothing;
        self
    }

    pub fn progress(mut self, progress: Option<Arc<dyn ProgressSink>>) -> Self {
        self.progress = progress;
        self
    }

    pub fn build(self) -> StreamingRecordTransformer {
        StreamingRecordTransformer {
            batch_size: self.batch_size.max(1),
            timesteps: self.timesteps,
            smoothing: self.smoothing,
            progress: self.progress,
        }
    }
}

/// Runs [`InterpolationJob`]s.
#[derive(Debug, Clone)]
pub struct StreamingRecordTransformer {
    batch_size: usize,
    timesteps: usize,
    smoothing: f64,
    progress: Option<Arc<dyn ProgressSink>>,
}

impl Default for StreamingRecordTransformer {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl StreamingRecordTransformer {
    pub fn builder() -> StreamingRecordTransformerBuilder {
        StreamingRecordTransformerBuilder {
            batch_size: DEFAULT_BATCH_SIZE,
            timesteps: DEFAULT_TIMESTEPS,
            smoothing: 0.0,
            progress: None,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn timesteps(&self) -> usize {
        self.timesteps
    }

    /// Runs `job` to completion.
    ///
    /// Any stale output table (and its manifest) is removed first. The
    /// input layout is derived from the width of the first record, checked
    /// against the job's source point set and, when present, against the
    /// expected layout. Every later record must have the same width.
    ///
    /// Force pairs are copied verbatim. The three deformation fields of all
    /// timesteps are resampled together with one factorisation of the
    /// source system per job.
    pub fn run(&self, job: &InterpolationJob) -> Result<TransformSummary, TransformError> {
        let manifest_path = LayoutManifest::path_for(&job.output);
        remove_stale(&job.output)?;
        remove_stale(&manifest_path)?;

        let output_layout = RecordLayout::new(self.timesteps, job.destination.len());
        let resampler =
            FieldResampler::between(&job.source, &job.destination, job.method, self.smoothing)?;

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&job.input)
            .map_err(|source| TransformError::Open {
                path: job.input.clone(),
                source,
            })?;

        let mut writer = BatchWriter::new(job.output.clone(), output_layout.header(), self.batch_size)
            .with_progress(self.progress.clone());

        let mut input_layout: Option<RecordLayout> = None;
        let mut record = StringRecord::new();
        let mut row = 0;

        loop {
            let more = reader
                .read_record(&mut record)
                .map_err(|source| TransformError::Read {
                    path: job.input.clone(),
                    row: row + 1,
                    source,
                })?;
            if !more {
                break;
            }
            row += 1;

            let layout = match input_layout {
                Some(layout) => {
                    layout
                        .check_row(row, record.len())
                        .map_err(|source| TransformError::Layout {
                            path: job.input.clone(),
                            source,
                        })?;
                    layout
                }
                None => {
                    let layout = self.derive_layout(job, record.len())?;
                    debug!(points = layout.points, width = layout.record_width(), "input layout");
                    input_layout = Some(layout);
                    layout
                }
            };

            let out = self.transform_record(job, &resampler, &layout, &output_layout, &record, row)?;
            writer.push(out)?;
        }

        let (records, batches) = writer.finish()?;

        LayoutManifest {
            layout: output_layout,
            grid: job.grid,
            method: job.method,
            source_points: job.source.len(),
        }
        .save(&manifest_path)?;

        Ok(TransformSummary {
            output: job.output.clone(),
            records,
            input_layout,
            output_layout,
            batches,
        })
    }

    fn derive_layout(&self, job: &InterpolationJob, width: usize) -> Result<RecordLayout, TransformError> {
        let layout = RecordLayout::from_record_width(width, self.timesteps)
            .and_then(|layout| layout.expect_points(job.source.len()))
            .map_err(|source| TransformError::Layout {
                path: job.input.clone(),
                source,
            })?;

        match job.expected_layout {
            Some(manifest) if manifest != layout => Err(TransformError::ManifestDisagrees {
                path: job.input.clone(),
                manifest,
                found: layout,
            }),
            _ => Ok(layout),
        }
    }

    fn transform_record(
        &self,
        job: &InterpolationJob,
        resampler: &FieldResampler,
        input_layout: &RecordLayout,
        output_layout: &RecordLayout,
        record: &StringRecord,
        row: usize,
    ) -> Result<Vec<String>, TransformError> {
        let timesteps = input_layout.timesteps;
        let fields_per_record = FIELD_COMPONENTS * timesteps;

        // Column 3t + c holds component c of timestep t.
        let mut values = Mat::<f64>::zeros(input_layout.points, fields_per_record);
        for t in 0..timesteps {
            for p in 0..input_layout.points {
                for c in 0..FIELD_COMPONENTS {
                    let column = input_layout.field_column(t, p, c);
                    values[(p, FIELD_COMPONENTS * t + c)] = parse_cell(&job.input, record, row, column)?;
                }
            }
        }

        let resampled = resampler.resample(&values)?;

        let mut out = Vec::with_capacity(output_layout.record_width());
        for t in 0..timesteps {
            let offset = input_layout.block_offset(t);
            out.push(record[offset].to_string());
            out.push(record[offset + 1].to_string());

            for p in 0..output_layout.points {
                for c in 0..FIELD_COMPONENTS {
                    out.push(format_value(resampled[(p, FIELD_COMPONENTS * t + c)]));
                }
            }
        }

        Ok(out)
    }
}

fn parse_cell(path: &Path, record: &StringRecord, row: usize, column: usize) -> Result<f64, TransformError> {
    let value = &record[column];
    value.trim().parse().map_err(|_| TransformError::Parse {
        path: path.to_path_buf(),
        row,
        column,
        value: value.to_string(),
    })
}

pub(crate) fn remove_stale(path: &Path) -> Result<(), TransformError> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!("removed stale {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(TransformError::Remove {
            path: path.to_path_buf(),
            source,
        }),
    }
}
