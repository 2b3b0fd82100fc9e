// ============================================================
// Layer 2 — Inspect Use Case
// ============================================================
// Loads and validates a CSV export, then plans the split a
// training run with the same fraction and seed would use.
// Nothing is written to disk.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::data::{dataset::Dataset, loader::CsvSampleLoader, splitter::Split};
use crate::domain::sample::DatasetSummary;

pub struct InspectReport {
    pub summary:         DatasetSummary,
    pub train_size:      usize,
    pub validation_size: usize,
}

pub struct InspectUseCase {
    data_path:           PathBuf,
    validation_fraction: f64,
    seed:                u64,
}

impl InspectUseCase {
    pub fn new(data_path: PathBuf, validation_fraction: f64, seed: u64) -> Self {
        Self { data_path, validation_fraction, seed }
    }

    pub fn execute(&self) -> Result<InspectReport> {
        let dataset = Dataset::load(&CsvSampleLoader::new(&self.data_path))
            .with_context(|| format!("Cannot load dataset '{}'", self.data_path.display()))?;
        let split = Split::plan(dataset.len(), self.validation_fraction, self.seed);

        Ok(InspectReport {
            summary:         dataset.summary(),
            train_size:      split.train().len(),
            validation_size: split.validation().len(),
        })
    }
}
