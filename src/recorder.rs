//! Append-only run log.
//!
//! One headerless CSV row per search run. The first column is the execution
//! mode label and the last is the elapsed time in seconds, so downstream
//! tooling that only cares about timings can read those two columns alone.

use crate::optimization::search::SearchOutcome;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("Could not write results to `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not encode a result row: {0}")]
    Csv(#[from] csv::Error),
}

/// A single row of the run log. Field order is the column order.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub mode: String,
    pub run_id: Uuid,
    pub status: String,
    pub universe_size: usize,
    pub subset_size: usize,
    pub trials_per_combination: usize,
    pub seed: u64,
    pub workers: usize,
    pub combinations_evaluated: usize,
    pub combinations_skipped: usize,
    pub trials_evaluated: usize,
    pub degenerate_trials: usize,
    /// Empty when no trial produced a defined Sharpe ratio.
    pub best_sharpe: Option<f64>,
    pub elapsed_seconds: f64,
}

impl RunRecord {
    pub fn from_outcome(run_id: Uuid, outcome: &SearchOutcome) -> Self {
        RunRecord {
            mode: outcome.mode.label().to_string(),
            run_id,
            status: outcome.status.to_string(),
            universe_size: outcome.universe.len(),
            subset_size: outcome.subset_size,
            trials_per_combination: outcome.trials_per_combination,
            seed: outcome.seed,
            workers: outcome.workers,
            combinations_evaluated: outcome.combinations_evaluated,
            combinations_skipped: outcome.combinations_skipped,
            trials_evaluated: outcome.trials_evaluated,
            degenerate_trials: outcome.degenerate_trials,
            best_sharpe: outcome.best_sharpe(),
            elapsed_seconds: outcome.elapsed_seconds,
        }
    }
}

/// Shared handle on the results file. Safe to use from several threads;
/// each row reaches the file in one write, so rows never interleave.
#[derive(Debug)]
pub struct ResultRecorder {
    path: PathBuf,
    file: Mutex<File>,
}

impl ResultRecorder {
    /// Opens `path` for appending, creating it and its parent directories
    /// when missing. Existing rows are kept.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RecorderError> {
        let path = path.as_ref().to_path_buf();
        let io_error = |source| RecorderError::Io {
            path: path.clone(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(io_error)?;
        info!("Recording run results to {}", path.display());
        Ok(ResultRecorder {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self, record: &RunRecord) -> Result<(), RecorderError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        writer.serialize(record)?;
        let row = writer
            .into_inner()
            .map_err(|error| RecorderError::Io {
                path: self.path.clone(),
                source: error.into_error(),
            })?;

        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        file.write_all(&row)
            .and_then(|_| file.flush())
            .map_err(|source| RecorderError::Io {
                path: self.path.clone(),
                source,
            })?;
        debug!("Recorded {} run {}", record.mode, record.run_id);
        Ok(())
    }

    /// Shorthand for recording a finished search under a fresh run id.
    pub fn record_outcome(&self, outcome: &SearchOutcome) -> Result<RunRecord, RecorderError> {
        let record = RunRecord::from_outcome(Uuid::new_v4(), outcome);
        self.record(&record)?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use tempfile::tempdir;

    fn record(mode: &str, elapsed_seconds: f64, best_sharpe: Option<f64>) -> RunRecord {
        RunRecord {
            mode: mode.to_string(),
            run_id: Uuid::new_v4(),
            status: "Complete".to_string(),
            universe_size: 30,
            subset_size: 25,
            trials_per_combination: 1000,
            seed: 42,
            workers: 8,
            combinations_evaluated: 142_506,
            combinations_skipped: 0,
            trials_evaluated: 142_506_000,
            degenerate_trials: 0,
            best_sharpe,
            elapsed_seconds,
        }
    }

    #[test]
    fn test_rows_are_headerless_with_mode_first_and_time_last() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("results.csv");
        let recorder = ResultRecorder::open(&path).unwrap();

        let first = record("Parallel", 12.5, Some(3.25));
        recorder.record(&first).unwrap();
        recorder.record(&record("Sequential", 80.0, None)).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let columns: Vec<&str> = lines[0].split(',').collect();
        assert_eq!(columns.len(), 14);
        assert_eq!(columns[0], "Parallel");
        assert_eq!(columns[1], first.run_id.to_string());
        assert_eq!(columns[12], "3.25");
        assert_eq!(columns[13], "12.5");

        let columns: Vec<&str> = lines[1].split(',').collect();
        assert_eq!(columns[0], "Sequential");
        assert_eq!(columns[12], "");
        assert_eq!(columns[13], "80.0");
    }

    #[test]
    fn test_reopening_appends() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results.csv");
        ResultRecorder::open(&path)
            .unwrap()
            .record(&record("Sequential", 1.0, Some(1.0)))
            .unwrap();
        ResultRecorder::open(&path)
            .unwrap()
            .record(&record("Sequential", 2.0, Some(1.0)))
            .unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }

    #[test]
    fn test_concurrent_writers_never_interleave() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results.csv");
        let recorder = Arc::new(ResultRecorder::open(&path).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let recorder = Arc::clone(&recorder);
                thread::spawn(move || {
                    for j in 0..25 {
                        recorder
                            .record(&record("Parallel", (i * 100 + j) as f64, Some(1.5)))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 200);
        for line in lines {
            let columns: Vec<&str> = line.split(',').collect();
            assert_eq!(columns.len(), 14, "Torn row: {}", line);
            assert_eq!(columns[0], "Parallel");
        }
    }
}
