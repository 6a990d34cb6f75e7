/////////////////////////////////////////////////////////////////////////////////////////////
//
// Defines progress reporting messages, sinks, and helper functions for long-running sweeps.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Progress reporting primitives for long-running sweeps.
//!
//! Components report through an optional `Arc<dyn ProgressSink>`. A caller
//! that wants notifications (a terminal, a chat hook, a progress bar)
//! installs a sink; [`closure_sink`] runs a handler on its own thread so a
//! slow consumer never stalls a job.

use std::fmt::{self, Debug};
use std::path::PathBuf;
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;
use tracing::info;

/// The stages of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Forward,
    Inverse,
    External,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Forward => "forward interpolation",
            Stage::Inverse => "inverse interpolation",
            Stage::External => "external stages",
        })
    }
}

/// Progress events emitted during a run.
#[derive(Debug, Clone)]
pub enum ProgressMsg {
    StageStarted { stage: Stage },

    StageFinished { stage: Stage, elapsed: Duration },

    JobStarted { file: String, grid: usize, method: String },

    JobFinished {
        file: String,
        grid: usize,
        method: String,
        elapsed: Duration,
    },

    /// A job was not run, e.g. because its input table is missing.
    JobSkipped { file: String, reason: String },

    /// A batch of records was written to `output`.
    BatchFlushed { output: PathBuf, records: usize, total: usize },
}

/// Sink that consumes progress messages.
pub trait ProgressSink: Send + Sync + Debug {
    fn emit(&self, msg: ProgressMsg);
}

/// Progress sink that forwards messages over a channel.
#[derive(Debug)]
pub struct ClosureSink {
    tx: mpsc::SyncSender<ProgressMsg>,
}

impl ProgressSink for ClosureSink {
    #[inline]
    fn emit(&self, msg: ProgressMsg) {
        let _ = self.tx.try_send(msg);
    }
}

/// Spawns a listener thread that runs a handler closure for each progress message.
///
/// The thread ends once every clone of the returned sink is dropped.
pub fn closure_sink<F>(
    buffer: usize,
    mut handler: F,
) -> (Arc<dyn ProgressSink>, thread::JoinHandle<()>)
where
    F: FnMut(ProgressMsg) + Send + 'static,
{
    let (tx, rx) = mpsc::sync_channel::<ProgressMsg>(buffer.max(1));
    let sink: Arc<dyn ProgressSink> = Arc::new(ClosureSink { tx });

    let handle = thread::spawn(move || {
        while let Ok(msg) = rx.recv() {
            handler(msg);
        }
    });

    (sink, handle)
}

/// Progress sink that writes every event to the `tracing` log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn emit(&self, msg: ProgressMsg) {
        match msg {
            ProgressMsg::StageStarted { stage } => info!("Starting {stage}"),
            ProgressMsg::StageFinished { stage, elapsed } => {
                info!("Finished {stage} in {} minutes.", format_minutes(elapsed))
            }
            ProgressMsg::JobStarted { file, grid, method } => {
                info!(grid, method = %method, "Processing {file}")
            }
            ProgressMsg::JobFinished { file, elapsed, .. } => {
                info!("Finished processing {file} in {} minutes.", format_minutes(elapsed))
            }
            ProgressMsg::JobSkipped { file, reason } => info!("Skipped {file}: {reason}"),
            ProgressMsg::BatchFlushed { output, records, total } => {
                info!(records, total, "Flushed batch to {}", output.display())
            }
        }
    }
}

/// Emits `msg` if a sink is installed.
#[inline]
pub(crate) fn report(sink: Option<&Arc<dyn ProgressSink>>, msg: impl FnOnce() -> ProgressMsg) {
    if let Some(sink) = sink {
        sink.emit(msg());
    }
}

/// Formats a duration as `m:ss`, truncating to whole seconds.
pub fn format_minutes(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn minutes_are_zero_padded() {
        assert_eq!(format_minutes(Duration::from_secs_f64(5.9)), "0:05");
        assert_eq!(format_minutes(Duration::from_secs(61)), "1:01");
        assert_eq!(format_minutes(Duration::from_secs(3600 + 42)), "60:42");
    }

    #[test]
    fn closure_sink_delivers_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_in_handler = Arc::clone(&seen);
        let (sink, handle) = closure_sink(8, move |msg| {
            if let ProgressMsg::JobSkipped { file, .. } = msg {
                seen_in_handler.lock().unwrap().push(file);
            }
        });

        let skipped = |file: &str| ProgressMsg::JobSkipped {
            file: file.into(),
            reason: "missing".into(),
        };
        report(Some(&sink), || skipped("a"));
        report(Some(&sink), || skipped("b"));
        report(None, || unreachable!());
        drop(sink);
        handle.join().unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["a".to_string(), "b".to_string()]);
    }
}
