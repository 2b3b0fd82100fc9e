// ============================================================
// Layer 2 — Evaluate Use Case
// ============================================================
// Reloads the best checkpoint from a finished run and scores
// every row of a CSV export with it:
//
//   1. Rebuild the model from <model_dir>/inceptiontime.json
//   2. Load the weights from <model_dir>/inceptiontime.mpk
//   3. Load and validate the CSV
//   4. Inference-mode loss and accuracy over all rows

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::data::{dataset::Dataset, loader::CsvSampleLoader};
use crate::infra::checkpoint::{CheckpointManager, CheckpointMeta};
use crate::ml::{inferencer::Inferencer, trainer::Evaluation};

pub struct EvaluateUseCase {
    model_dir:  PathBuf,
    inferencer: Inferencer,
}

impl EvaluateUseCase {
    pub fn new(model_dir: PathBuf) -> Result<Self> {
        let ckpt = CheckpointManager::new(&model_dir)?;
        let inferencer = Inferencer::from_checkpoint(&ckpt).with_context(|| {
            format!(
                "Cannot load a checkpoint from '{}'. Have you run 'train' first?",
                model_dir.display()
            )
        })?;
        Ok(Self { model_dir, inferencer })
    }

    pub fn checkpoint(&self) -> &CheckpointMeta {
        self.inferencer.meta()
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    pub fn evaluate(&self, data_path: &Path, batch_size: usize) -> Result<Evaluation> {
        let dataset = Dataset::load(&CsvSampleLoader::new(data_path))
            .with_context(|| format!("Cannot load dataset '{}'", data_path.display()))?;
        let indices: Vec<usize> = (0..dataset.len()).collect();
        Ok(self.inferencer.evaluate(&dataset, &indices, batch_size)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::PipelineError;

    #[test]
    fn test_untrained_directory_reports_no_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let err = EvaluateUseCase::new(dir.path().to_path_buf()).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::NoCheckpoint(_))
        ));
    }
}
