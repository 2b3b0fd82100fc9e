// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Validate the configuration  (Layer 2)
//   Step 2: Load and validate the CSV   (Layer 4 - data)
//   Step 3: Plan the seeded split       (Layer 4 - data)
//   Step 4: Save config, open metrics   (Layer 6 - infra)
//   Step 5: Run the training loop       (Layer 5 - ml)
//   Step 6: Restore the best checkpoint (Layer 6 - infra)
//   Step 7: Final validation pass       (Layer 5 - ml)
//   Step 8: Export to ONNX              (Layer 5 - ml)
//
// Nothing is written to the output directory before the data
// has loaded cleanly. An export failure is reported after the
// checkpoint is already safe on disk.
//
// Reference: Burn Book §5 (Training)

use std::path::PathBuf;

use anyhow::{Context, Result};
use burn::prelude::*;
use serde::{Deserialize, Serialize};

use crate::data::{dataset::Dataset, loader::CsvSampleLoader, splitter::Split};
use crate::domain::error::{PipelineError, PipelineResult};
use crate::infra::{checkpoint::CheckpointManager, metrics::MetricsLogger};
use crate::ml::{
    exporter::OnnxExporter,
    trainer::{evaluate, run_training, Device, InferBackend, StopReason, TrainBackend},
};

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run. Written next to the
// checkpoint so a run can be reproduced from its output directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub data_path:           PathBuf,
    pub output_dir:          PathBuf,
    pub epochs:              usize,
    pub batch_size:          usize,
    pub learning_rate:       f64,
    pub weight_decay:        f64,
    pub validation_fraction: f64,
    pub seed:                u64,
    pub patience:            usize,
    pub dropout:             f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_path:           PathBuf::from("data.csv"),
            output_dir:          PathBuf::from("model"),
            epochs:              10,
            batch_size:          32,
            learning_rate:       1e-3,
            weight_decay:        1e-4,
            validation_fraction: 0.2,
            seed:                42,
            patience:            15,
            dropout:             0.2,
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> PipelineResult<()> {
        let fail = |msg: String| -> PipelineResult<()> { Err(PipelineError::Config(msg)) };

        if self.epochs == 0 {
            return fail("epochs must be at least 1".into());
        }
        if self.batch_size == 0 {
            return fail("batch size must be at least 1".into());
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return fail(format!("learning rate must be positive, got {}", self.learning_rate));
        }
        if !(self.weight_decay >= 0.0) {
            return fail(format!("weight decay must be non-negative, got {}", self.weight_decay));
        }
        if !(self.validation_fraction < 1.0) {
            return fail(format!(
                "validation fraction must be below 1, got {}",
                self.validation_fraction
            ));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return fail(format!("dropout must be in [0, 1), got {}", self.dropout));
        }
        if self.patience == 0 {
            return fail("patience must be at least 1".into());
        }
        Ok(())
    }
}

/// What a finished run reports back to the CLI.
#[derive(Debug, Clone)]
pub struct TrainingRunResult {
    pub train_size:        usize,
    pub validation_size:   usize,
    pub best_epoch:        usize,
    pub epochs_run:        usize,
    pub stopped_early:     bool,
    pub best_val_loss:     f64,
    pub best_val_accuracy: f64,
    pub checkpoint_path:   PathBuf,
    pub export_path:       PathBuf,
    /// Logits of the restored model on the validation set, in split order
    pub validation_logits: Vec<Vec<f32>>,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainingRunResult> {
        let cfg = &self.config;

        // ── Step 1: Configuration ─────────────────────────────────────────────
        cfg.validate()?;
        let device = Device::default();
        TrainBackend::seed(&device, cfg.seed);

        // ── Step 2: Load the CSV export ───────────────────────────────────────
        tracing::info!("Loading samples from '{}'", cfg.data_path.display());
        let dataset = Dataset::load(&CsvSampleLoader::new(&cfg.data_path))
            .with_context(|| format!("Cannot load dataset '{}'", cfg.data_path.display()))?;
        println!("{}", dataset.summary());

        // ── Step 3: Split ─────────────────────────────────────────────────────
        let split = Split::plan(dataset.len(), cfg.validation_fraction, cfg.seed);
        if split.train().is_empty() {
            return Err(PipelineError::Config(format!(
                "validation fraction {} leaves no training samples out of {}",
                cfg.validation_fraction,
                dataset.len()
            ))
            .into());
        }
        tracing::info!(
            "Split: {} train, {} validation",
            split.train().len(),
            split.validation().len()
        );

        // ── Step 4: Output directory ──────────────────────────────────────────
        let mut ckpt_manager = CheckpointManager::new(&cfg.output_dir)
            .with_context(|| format!("Cannot create '{}'", cfg.output_dir.display()))?;
        ckpt_manager.save_config(cfg)?;
        let metrics = MetricsLogger::create(&cfg.output_dir)?;

        // ── Step 5: Train ─────────────────────────────────────────────────────
        let outcome = run_training(cfg, &dataset, &split, &mut ckpt_manager, &metrics, &device)?;

        // ── Step 6: Restore the best weights for evaluation ───────────────────
        let fresh = outcome.model_config.init::<InferBackend>(&device);
        let (model, best) = ckpt_manager.restore_best(fresh, &device)?;

        // ── Step 7: Final evaluation ──────────────────────────────────────────
        let final_eval = evaluate(&model, &dataset, split.validation(), cfg.batch_size, &device)?;
        println!(
            "Best epoch {}: val loss {:.4}, val acc {:.4}",
            best.epoch, final_eval.loss, final_eval.accuracy
        );

        // ── Step 8: Export ────────────────────────────────────────────────────
        let export_path = OnnxExporter::new(dataset.bars())
            .export(&model, &ckpt_manager.export_path())
            .map_err(|e| {
                tracing::error!(
                    "ONNX export failed; checkpoint '{}' is still valid",
                    ckpt_manager.model_path().display()
                );
                e
            })?;
        println!("Exported ONNX model to {}", export_path.display());

        Ok(TrainingRunResult {
            train_size:        split.train().len(),
            validation_size:   split.validation().len(),
            best_epoch:        best.epoch,
            epochs_run:        outcome.epochs_run,
            stopped_early:     outcome.stop_reason == StopReason::EarlyStopped,
            best_val_loss:     final_eval.loss,
            best_val_accuracy: final_eval.accuracy,
            checkpoint_path:   ckpt_manager.model_path(),
            export_path,
            validation_logits: final_eval.logits,
        })
    }
}
