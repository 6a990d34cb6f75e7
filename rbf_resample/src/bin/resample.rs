/////////////////////////////////////////////////////////////////////////////////////////////
//
// Command-line entry point for running resampling sweeps and preparing their inputs.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! RBF resampling tool
//!
//! # Usage
//!
//! ```bash
//! resample run --config pipeline.toml
//! resample mesh --grid 30 --output grid_30.csv
//! resample synth --centroids centroids.csv --table x_train.csv --points 564 --runs 10
//! ```

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

use rbf_resample::{
    PipelineConfig, PipelineDriver, generate_mesh, point_array_to_csv,
    progress::TracingSink, synthetic::write_synthetic_dataset,
};

/// Forward and inverse RBF resampling of simulation fields
#[derive(Parser, Debug)]
#[command(name = "resample")]
#[command(about = "Resample simulation fields between centroids and cruciform grids")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Forward sweep, inverse sweep, then the external stages
    Run(SweepArgs),

    /// Forward sweep only
    Forward(SweepArgs),

    /// Inverse sweep only (needs the forward tables)
    Inverse(SweepArgs),

    /// Write the grid point set of a resolution as x,y CSV
    Mesh {
        /// Lattice points per axis
        #[arg(short, long)]
        grid: usize,

        /// Output file, defaults to grid_<N>.csv
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write a synthetic centroid file and simulation table
    Synth {
        #[arg(long)]
        centroids: PathBuf,

        #[arg(long)]
        table: PathBuf,

        /// Number of centroids
        #[arg(long, default_value = "564")]
        points: usize,

        /// Number of simulation runs
        #[arg(long, default_value = "10")]
        runs: usize,

        #[arg(long, default_value = "20")]
        timesteps: usize,

        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(clap::Args, Debug)]
struct SweepArgs {
    /// Pipeline configuration (TOML)
    #[arg(short, long)]
    config: PathBuf,

    /// Log every progress event, including batch flushes
    #[arg(long)]
    progress: bool,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(false).init();
}

fn driver(args: &SweepArgs) -> Result<PipelineDriver, Box<dyn std::error::Error>> {
    let config = PipelineConfig::from_toml_file(&args.config)?;
    info!("Loaded configuration from {}", args.config.display());

    let driver = PipelineDriver::new(config)?;
    Ok(match args.progress {
        true => driver.with_progress(Arc::new(TracingSink)),
        false => driver,
    })
}

fn write_mesh(grid: usize, output: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let mesh = generate_mesh(grid)?;
    let output = output.unwrap_or_else(|| PathBuf::from(format!("grid_{grid}.csv")));
    point_array_to_csv(&mesh.to_matrix(), Some(&["x", "y"][..]), &output)?;
    info!(points = mesh.len(), "Wrote {}", output.display());
    Ok(())
}

fn synth(
    centroids: &Path,
    table: &Path,
    points: usize,
    runs: usize,
    timesteps: usize,
    seed: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    write_synthetic_dataset(centroids, table, points, runs, timesteps, seed)?;
    info!(points, runs, timesteps, "Wrote {} and {}", centroids.display(), table.display());
    Ok(())
}

fn execute(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Run(args) => {
            let report = driver(&args)?.run()?;
            info!(
                forward_jobs = report.forward.records.len(),
                inverse_jobs = report.inverse.records.len(),
                skipped = report.inverse.skipped.len(),
                "Pipeline finished"
            );
        }
        Command::Forward(args) => {
            driver(&args)?.run_forward()?;
        }
        Command::Inverse(args) => {
            driver(&args)?.run_inverse()?;
        }
        Command::Mesh { grid, output } => write_mesh(grid, output)?,
        Command::Synth {
            centroids,
            table,
            points,
            runs,
            timesteps,
            seed,
        } => synth(&centroids, &table, points, runs, timesteps, seed)?,
    }
    Ok(())
}

fn main() {
    init_logging();

    let args = Args::parse();

    if let Err(e) = execute(args.command) {
        error!("{e}");
        process::exit(1);
    }
}
