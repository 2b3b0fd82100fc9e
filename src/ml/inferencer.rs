// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Rebuilds a trained model from an output directory and scores
// datasets with it, without any training state.
use burn::prelude::*;

use crate::data::dataset::Dataset;
use crate::domain::error::{PipelineError, PipelineResult};
use crate::infra::checkpoint::{CheckpointManager, CheckpointMeta};
use crate::ml::model::{InceptionTime, ModelMode};
use crate::ml::trainer::{evaluate, Device, Evaluation, InferBackend};

pub struct Inferencer {
    model:  InceptionTime<InferBackend>,
    meta:   CheckpointMeta,
    device: Device,
}

impl Inferencer {
    pub fn from_checkpoint(ckpt_manager: &CheckpointManager) -> PipelineResult<Self> {
        let device = Device::default();
        let (model, meta) = ckpt_manager.load_model::<InferBackend>(&device)?;
        Ok(Self { model, meta, device })
    }

    pub fn meta(&self) -> &CheckpointMeta {
        &self.meta
    }

    /// Series length the checkpoint was trained on.
    pub fn bars(&self) -> usize {
        self.meta.bars
    }

    /// Class scores for one channel-major [4 * bars] series.
    pub fn predict(&self, features: &[f32]) -> PipelineResult<Vec<f32>> {
        let expected = self.model.in_channels * self.bars();
        if features.len() != expected {
            return Err(PipelineError::Config(format!(
                "expected {expected} feature values, got {}",
                features.len()
            )));
        }
        let input = Tensor::<InferBackend, 3>::from_data(
            TensorData::new(features.to_vec(), [1, self.model.in_channels, self.bars()]),
            &self.device,
        );
        self.model
            .forward(input, ModelMode::Inference)
            .into_data()
            .to_vec()
            .map_err(|e| PipelineError::Tensor(format!("{e:?}")))
    }

    /// Loss, accuracy and logits for the given rows of `dataset`.
    pub fn evaluate(
        &self,
        dataset:    &Dataset,
        indices:    &[usize],
        batch_size: usize,
    ) -> PipelineResult<Evaluation> {
        self.check_compatible(dataset)?;
        evaluate(&self.model, dataset, indices, batch_size, &self.device)
    }

    fn check_compatible(&self, dataset: &Dataset) -> PipelineResult<()> {
        if dataset.bars() != self.bars() {
            return Err(PipelineError::Config(format!(
                "dataset has {} bars per channel, checkpoint was trained on {}",
                dataset.bars(),
                self.bars()
            )));
        }
        if let Some(&label) = dataset.labels().iter().find(|&&l| l >= self.model.num_classes) {
            return Err(PipelineError::Config(format!(
                "label {label} is outside the {} classes the model was trained on",
                self.model.num_classes
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::backend_rng_lock;
    use crate::domain::sample::RawSample;
    use crate::ml::model::InceptionTimeConfig;
    use std::path::Path;

    fn saved_dir(bars: usize) -> tempfile::TempDir {
        let dir     = tempfile::tempdir().unwrap();
        let mut mgr = CheckpointManager::new(dir.path()).unwrap();
        let cfg     = InceptionTimeConfig::new(2).with_filters(4).with_depth(1);
        let model   = cfg.init::<InferBackend>(&Device::default());
        let meta    = CheckpointMeta { epoch: 1, val_loss: 0.7, val_accuracy: 0.5, bars, model: cfg };
        mgr.save_model(&model, meta).unwrap();
        dir
    }

    fn dataset(bars: usize, labels: &[usize]) -> Dataset {
        let samples = labels
            .iter()
            .map(|&l| RawSample::new(l, "c", vec![l as f32; 4 * bars]))
            .collect();
        Dataset::from_samples(Path::new("mem"), samples).unwrap()
    }

    #[test]
    fn test_predict_matches_evaluate() {
        let _rng = backend_rng_lock();
        let dir = saved_dir(8);
        let inf = Inferencer::from_checkpoint(&CheckpointManager::new(dir.path()).unwrap()).unwrap();
        assert_eq!(inf.bars(), 8);

        let ds   = dataset(8, &[0, 1]);
        let eval = inf.evaluate(&ds, &[1], 4).unwrap();
        assert_eq!(inf.predict(ds.sample(1)).unwrap(), eval.logits[0]);
    }

    #[test]
    fn test_rejects_other_series_length() {
        let _rng = backend_rng_lock();
        let dir = saved_dir(8);
        let inf = Inferencer::from_checkpoint(&CheckpointManager::new(dir.path()).unwrap()).unwrap();
        let err = inf.evaluate(&dataset(5, &[0]), &[0], 4).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
        assert!(inf.predict(&[0.0; 12]).is_err());
    }

    #[test]
    fn test_rejects_unknown_label() {
        let _rng = backend_rng_lock();
        let dir = saved_dir(4);
        let inf = Inferencer::from_checkpoint(&CheckpointManager::new(dir.path()).unwrap()).unwrap();
        let err = inf.evaluate(&dataset(4, &[0, 2]), &[0, 1], 4).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }
}
