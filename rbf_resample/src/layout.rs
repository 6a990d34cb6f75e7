/////////////////////////////////////////////////////////////////////////////////////////////
//
// Describes the per-record field layout of simulation tables and its on-disk manifest.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Record layout of simulation tables.
//!
//! A record is one simulation run, stored as `timesteps` consecutive blocks.
//! Each block is a force pair followed by a `(def_x, def_y, def_xy)` triple
//! for every point:
//!
//! ```text
//! | fx | fy | dx_0 | dy_0 | dxy_0 | dx_1 | dy_1 | dxy_1 | ... |
//! ```
use crate::interpolant_config::RBFKernelType;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Number of force components leading each block.
pub const FORCE_COMPONENTS: usize = 2;

/// Number of deformation components stored per point.
pub const FIELD_COMPONENTS: usize = 3;

/// Errors raised when a row does not fit the expected layout.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("a record needs at least one timestep")]
    NoTimesteps,

    #[error("row width {width} is not a multiple of {timesteps} timesteps")]
    UnevenTimesteps { width: usize, timesteps: usize },

    #[error("block width {block_width} is not 2 force values plus 3 values per point")]
    MalformedBlock { block_width: usize },

    #[error("row encodes {found} points but the point set has {expected}")]
    PointCountMismatch { expected: usize, found: usize },

    #[error("row {row} has {found} values, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
}

/// Field layout of one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordLayout {
    pub timesteps: usize,
    pub points: usize,
}

impl RecordLayout {
    pub fn new(timesteps: usize, points: usize) -> Self {
        Self { timesteps, points }
    }

    /// Width of one timestep block: `2 + 3 * points`.
    #[inline]
    pub fn block_width(&self) -> usize {
        FORCE_COMPONENTS + FIELD_COMPONENTS * self.points
    }

    /// Width of a whole record: `timesteps * block_width`.
    #[inline]
    pub fn record_width(&self) -> usize {
        self.timesteps * self.block_width()
    }

    /// Column offset of the first value of block `timestep`.
    #[inline]
    pub fn block_offset(&self, timestep: usize) -> usize {
        timestep * self.block_width()
    }

    /// Column of `component` (0 = x, 1 = y, 2 = xy) for `point` in block `timestep`.
    #[inline]
    pub fn field_column(&self, timestep: usize, point: usize, component: usize) -> usize {
        self.block_offset(timestep) + FORCE_COMPONENTS + FIELD_COMPONENTS * point + component
    }

    /// Recovers the layout from the width of a row.
    ///
    /// The width must split evenly into `timesteps` blocks and each block
    /// must be two force values plus a whole number of triples.
    pub fn from_record_width(width: usize, timesteps: usize) -> Result<Self, LayoutError> {
        if timesteps == 0 {
            return Err(LayoutError::NoTimesteps);
        }
        if width % timesteps != 0 {
            return Err(LayoutError::UnevenTimesteps { width, timesteps });
        }

        let block_width = width / timesteps;
        if block_width < FORCE_COMPONENTS || (block_width - FORCE_COMPONENTS) % FIELD_COMPONENTS != 0 {
            return Err(LayoutError::MalformedBlock { block_width });
        }

        Ok(Self::new(timesteps, (block_width - FORCE_COMPONENTS) / FIELD_COMPONENTS))
    }

    /// Checks that the layout encodes exactly `expected` points.
    pub fn expect_points(self, expected: usize) -> Result<Self, LayoutError> {
        match self.points == expected {
            true => Ok(self),
            false => Err(LayoutError::PointCountMismatch {
                expected,
                found: self.points,
            }),
        }
    }

    /// Checks that row number `row` (1-based, header excluded) has the record width.
    pub fn check_row(&self, row: usize, found: usize) -> Result<(), LayoutError> {
        let expected = self.record_width();
        match found == expected {
            true => Ok(()),
            false => Err(LayoutError::RaggedRow { row, expected, found }),
        }
    }

    /// Header row of a table with this layout: the column indices `0..width`.
    pub fn header(&self) -> Vec<String> {
        (0..self.record_width()).map(|i| i.to_string()).collect()
    }
}

const JSON_FORMAT_NAME: &str = "rbf_resample.layout";
const JSON_VERSION: u32 = 1;

/// Side-channel description of a transformed table.
///
/// Written next to every output table so a later job can interpret the
/// table without inferring its field count from the row width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutManifest {
    /// Layout of the rows of the table.
    pub layout: RecordLayout,
    /// Grid resolution involved in the job that wrote the table.
    pub grid: usize,
    pub method: RBFKernelType,
    /// Number of points of the table the job read from.
    pub source_points: usize,
}

/// Borrowing envelope for SAVE.
#[derive(Serialize)]
struct JsonEnvelopeRef<'a> {
    format: &'static str,
    version: u32,
    #[serde(flatten)]
    manifest: &'a LayoutManifest,
}

/// Owning envelope for LOAD.
#[derive(Deserialize)]
struct JsonEnvelopeOwned {
    format: String,
    version: u32,
    #[serde(flatten)]
    manifest: LayoutManifest,
}

/// Errors that can occur when saving or loading a [`LayoutManifest`].
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("creating {}: {source}", path.display())]
    Create { path: PathBuf, source: io::Error },

    #[error("opening {}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error("flushing {}: {source}", path.display())]
    Flush { path: PathBuf, source: io::Error },

    #[error("serializing JSON to {}: {source}", path.display())]
    Serialize {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("parsing JSON in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("unsupported format {found:?} (expected {expected:?}) in {}", path.display())]
    FormatMismatch {
        path: PathBuf,
        found: String,
        expected: &'static str,
    },

    #[error("unsupported version {found} (expected {expected}) in {}", path.display())]
    VersionMismatch {
        path: PathBuf,
        found: u32,
        expected: u32,
    },
}

impl LayoutManifest {
    /// Path of the manifest belonging to `table`: `<dir>/<stem>.layout.json`.
    pub fn path_for(table: &Path) -> PathBuf {
        let stem = table
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        table.with_file_name(format!("{stem}.layout.json"))
    }

    /// Save the manifest as a versioned JSON envelope `{ format, version, ... }`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ManifestError> {
        let path_ref = path.as_ref();
        let file = File::create(path_ref).map_err(|e| ManifestError::Create {
            path: path_ref.to_path_buf(),
            source: e,
        })?;
        let mut w = BufWriter::new(file);

        let env = JsonEnvelopeRef {
            format: JSON_FORMAT_NAME,
            version: JSON_VERSION,
            manifest: self,
        };

        serde_json::to_writer_pretty(&mut w, &env).map_err(|e| ManifestError::Serialize {
            path: path_ref.to_path_buf(),
            source: e,
        })?;
        w.flush().map_err(|e| ManifestError::Flush {
            path: path_ref.to_path_buf(),
            source: e,
        })?;
        Ok(())
    }

    /// Load a manifest, validating the envelope format and version.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ManifestError> {
        let path_ref = path.as_ref();
        let file = File::open(path_ref).map_err(|e| ManifestError::Open {
            path: path_ref.to_path_buf(),
            source: e,
        })?;

        let env: JsonEnvelopeOwned =
            serde_json::from_reader(BufReader::new(file)).map_err(|e| ManifestError::Parse {
                path: path_ref.to_path_buf(),
                source: e,
            })?;

        if env.format != JSON_FORMAT_NAME {
            return Err(ManifestError::FormatMismatch {
                path: path_ref.to_path_buf(),
                found: env.format,
                expected: JSON_FORMAT_NAME,
            });
        }

        if env.version != JSON_VERSION {
            return Err(ManifestError::VersionMismatch {
                path: path_ref.to_path_buf(),
                found: env.version,
                expected: JSON_VERSION,
            });
        }

        Ok(env.manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn widths_follow_the_point_count() {
        let layout = RecordLayout::new(20, 564);
        assert_eq!(layout.block_width(), 1694);
        assert_eq!(layout.record_width(), 33880);
        assert_eq!(layout.block_offset(3), 3 * 1694);
        assert_eq!(layout.field_column(1, 0, 0), 1694 + 2);
        assert_eq!(layout.field_column(1, 2, 2), 1694 + 2 + 6 + 2);
    }

    #[test]
    fn point_count_is_recovered_from_width() {
        let layout = RecordLayout::from_record_width(20 * (2 + 3 * 253), 20).unwrap();
        assert_eq!(layout, RecordLayout::new(20, 253));
        assert_eq!(layout.expect_points(253), Ok(layout));
    }

    #[test]
    fn inconsistent_widths_are_rejected() {
        assert_eq!(
            RecordLayout::from_record_width(101, 20),
            Err(LayoutError::UnevenTimesteps { width: 101, timesteps: 20 })
        );
        assert_eq!(
            RecordLayout::from_record_width(20 * 6, 20),
            Err(LayoutError::MalformedBlock { block_width: 6 })
        );
        assert_eq!(RecordLayout::from_record_width(10, 0), Err(LayoutError::NoTimesteps));
        assert_eq!(
            RecordLayout::new(20, 253).expect_points(564),
            Err(LayoutError::PointCountMismatch { expected: 564, found: 253 })
        );
        assert_eq!(
            RecordLayout::new(1, 1).check_row(4, 4),
            Err(LayoutError::RaggedRow { row: 4, expected: 5, found: 4 })
        );
    }

    #[test]
    fn header_is_the_column_indices() {
        let header = RecordLayout::new(2, 1).header();
        assert_eq!(header, vec!["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"]);
    }

    #[test]
    fn manifest_round_trip_and_validation() {
        let dir = tempdir().unwrap();
        let table = dir.path().join("x_train_20_linear.csv");
        let path = LayoutManifest::path_for(&table);
        assert_eq!(path.file_name().unwrap(), "x_train_20_linear.layout.json");

        let manifest = LayoutManifest {
            layout: RecordLayout::new(20, 253),
            grid: 20,
            method: RBFKernelType::Linear,
            source_points: 564,
        };
        manifest.save(&path).unwrap();
        assert_eq!(LayoutManifest::load(&path).unwrap(), manifest);

        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, text.replace("\"version\": 1", "\"version\": 9")).unwrap();
        assert!(matches!(
            LayoutManifest::load(&path),
            Err(ManifestError::VersionMismatch { found: 9, .. })
        ));
    }
}
