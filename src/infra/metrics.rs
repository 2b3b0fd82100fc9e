// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records one CSV row per completed epoch.
//
// Output file: <output_dir>/metrics.csv, recreated at the start
// of every run so it only ever describes one training run.
//
//   epoch,train_loss,train_acc,val_loss,val_acc,lr
//   1,0.693100,0.512500,0.690200,0.550000,0.001000
//   2,0.671800,0.600000,0.665400,0.650000,0.000905
//
// Reference: Rust Book §12 (I/O and File Handling)

use std::{
    fmt,
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::domain::error::PipelineResult;

pub const METRICS_FILE: &str = "metrics.csv";

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Sample-weighted mean cross-entropy over the training batches
    pub train_loss: f64,

    /// Fraction of training samples classified correctly
    pub train_accuracy: f64,

    pub val_loss: f64,
    pub val_accuracy: f64,

    /// Learning rate the epoch was trained with
    pub learning_rate: f64,
}

impl fmt::Display for EpochMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Epoch {:>3} | train loss {:.4} acc {:.4} | val loss {:.4} acc {:.4} | lr {:.6}",
            self.epoch,
            self.train_loss,
            self.train_accuracy,
            self.val_loss,
            self.val_accuracy,
            self.learning_rate,
        )
    }
}

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Truncate (or create) the CSV in `dir` and write the header row.
    pub fn create(dir: impl AsRef<Path>) -> PipelineResult<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let csv_path = dir.join(METRICS_FILE);
        let mut f = fs::File::create(&csv_path)?;
        writeln!(f, "epoch,train_loss,train_acc,val_loss,val_acc,lr")?;

        tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&self, m: &EpochMetrics) -> PipelineResult<()> {
        let mut f = OpenOptions::new().append(true).open(&self.csv_path)?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6},{:.6}",
            m.epoch,
            m.train_loss,
            m.train_accuracy,
            m.val_loss,
            m.val_accuracy,
            m.learning_rate,
        )?;
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn row(epoch: usize) -> EpochMetrics {
        EpochMetrics {
            epoch,
            train_loss: 0.5,
            train_accuracy: 0.75,
            val_loss: 0.6,
            val_accuracy: 0.7,
            learning_rate: 1e-3,
        }
    }

    #[test]
    fn test_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::create(dir.path()).unwrap();
        logger.log(&row(1)).unwrap();
        logger.log(&row(2)).unwrap();

        let text = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "epoch,train_loss,train_acc,val_loss,val_acc,lr");
        assert_eq!(lines[1], "1,0.500000,0.750000,0.600000,0.700000,0.001000");
    }

    #[test]
    fn test_new_run_truncates_previous_log() {
        let dir = tempfile::tempdir().unwrap();
        MetricsLogger::create(dir.path()).unwrap().log(&row(1)).unwrap();

        let logger = MetricsLogger::create(dir.path()).unwrap();
        let text = fs::read_to_string(logger.csv_path()).unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn test_display_line() {
        let line = row(7).to_string();
        assert!(line.starts_with("Epoch   7"));
        assert!(line.contains("val loss 0.6000"));
    }
}
