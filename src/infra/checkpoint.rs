// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Keeps exactly one checkpoint per output directory: the
// weights of the best epoch seen so far in the current run.
//
// What gets saved:
//   1. inceptiontime.mpk   — every learned parameter and the
//                            batch-norm running statistics
//   2. inceptiontime.json  — epoch, validation scores and the
//                            architecture needed to rebuild the
//                            model before loading the weights
//   3. train_config.json   — the run's hyperparameters
//
// Each save writes both files under a partial stem first and
// renames them into place only after both writes succeed, so a
// failed save leaves the previous checkpoint intact. Saved weights are a
// disk snapshot: later optimisation steps on the live model
// never change them.
//
// NamedMpkFileRecorder<FullPrecisionSettings> keeps f32 weights
// exact, so a reloaded model reproduces the logits it had when
// it was saved.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use std::{
    fs,
    path::{Path, PathBuf},
};

use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkFileRecorder},
};
use serde::{Deserialize, Serialize};

use crate::application::train_use_case::TrainConfig;
use crate::domain::error::{PipelineError, PipelineResult};
use crate::ml::model::{InceptionTime, InceptionTimeConfig};

/// Base name shared by the weight file and its metadata.
pub const CHECKPOINT_STEM: &str = "inceptiontime";
/// Stem used while a save is in flight.
const PARTIAL_STEM: &str = "inceptiontime-partial";
pub const EXPORT_FILE: &str = "inceptiontime.onnx";
pub const CONFIG_FILE: &str = "train_config.json";

type Recorder = NamedMpkFileRecorder<FullPrecisionSettings>;

/// Everything needed to rebuild and describe the saved model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMeta {
    /// 1-based epoch whose weights were saved
    pub epoch:        usize,
    pub val_loss:     f64,
    pub val_accuracy: f64,
    /// Series length the model was trained on
    pub bars:         usize,
    pub model:        InceptionTimeConfig,
}

pub struct CheckpointManager {
    dir:   PathBuf,
    /// Metadata of the checkpoint written during this run, if any.
    saved: Option<CheckpointMeta>,
}

impl CheckpointManager {
    /// Creates the directory (and its parents) if it does not exist.
    pub fn new(dir: impl AsRef<Path>) -> PipelineResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, saved: None })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn model_path(&self) -> PathBuf {
        self.dir.join(format!("{CHECKPOINT_STEM}.mpk"))
    }

    pub fn meta_path(&self) -> PathBuf {
        self.dir.join(format!("{CHECKPOINT_STEM}.json"))
    }

    pub fn export_path(&self) -> PathBuf {
        self.dir.join(EXPORT_FILE)
    }

    /// Metadata of the best checkpoint saved during this run.
    pub fn best(&self) -> Option<&CheckpointMeta> {
        self.saved.as_ref()
    }

    /// Persist `model` as the new best checkpoint, replacing any older one.
    ///
    /// On failure the previous checkpoint stays loadable.
    pub fn save_model<B: Backend>(
        &mut self,
        model: &InceptionTime<B>,
        meta:  CheckpointMeta,
    ) -> PipelineResult<()> {
        let partial_model = self.dir.join(format!("{PARTIAL_STEM}.mpk"));
        let partial_meta  = self.dir.join(format!("{PARTIAL_STEM}.json"));

        let written = self
            .write_partial(model, &meta, &partial_meta)
            .and_then(|()| {
                fs::rename(&partial_model, self.model_path())?;
                fs::rename(&partial_meta, self.meta_path())?;
                Ok(())
            });
        if let Err(e) = written {
            let _ = fs::remove_file(&partial_model);
            let _ = fs::remove_file(&partial_meta);
            return Err(e);
        }

        tracing::debug!(
            "Saved checkpoint: epoch {} (val_loss {:.4})",
            meta.epoch,
            meta.val_loss
        );
        self.saved = Some(meta);
        Ok(())
    }

    fn write_partial<B: Backend>(
        &self,
        model:     &InceptionTime<B>,
        meta:      &CheckpointMeta,
        meta_path: &Path,
    ) -> PipelineResult<()> {
        // The recorder appends the .mpk extension itself.
        model
            .clone()
            .save_file(self.dir.join(PARTIAL_STEM), &Recorder::new())
            .map_err(|e| {
                PipelineError::Checkpoint(format!(
                    "cannot write '{}': {e:?}",
                    self.model_path().display()
                ))
            })?;
        fs::write(meta_path, serde_json::to_string_pretty(meta)?)?;
        Ok(())
    }

    /// Load the weights saved during this run into `model`.
    ///
    /// Fails with `NoCheckpoint` when no epoch improved, even if an
    /// older run left files in the directory.
    pub fn restore_best<B: Backend>(
        &self,
        model:  InceptionTime<B>,
        device: &B::Device,
    ) -> PipelineResult<(InceptionTime<B>, CheckpointMeta)> {
        let meta = self
            .saved
            .clone()
            .ok_or_else(|| PipelineError::NoCheckpoint(self.dir.clone()))?;
        let model = self.load_weights(model, device)?;
        Ok((model, meta))
    }

    /// Read the metadata file left by an earlier run.
    pub fn load_meta(&self) -> PipelineResult<CheckpointMeta> {
        let path = self.meta_path();
        if !path.exists() || !self.model_path().exists() {
            return Err(PipelineError::NoCheckpoint(self.dir.clone()));
        }
        let json = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Rebuild the architecture from the metadata file, then load the weights.
    pub fn load_model<B: Backend>(
        &self,
        device: &B::Device,
    ) -> PipelineResult<(InceptionTime<B>, CheckpointMeta)> {
        let meta  = self.load_meta()?;
        let model = self.load_weights(meta.model.init(device), device)?;
        tracing::info!(
            "Loaded checkpoint from epoch {} (val_loss {:.4})",
            meta.epoch,
            meta.val_loss
        );
        Ok((model, meta))
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> PipelineResult<()> {
        let path = self.dir.join(CONFIG_FILE);
        fs::write(&path, serde_json::to_string_pretty(cfg)?)?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> PipelineResult<TrainConfig> {
        let json = fs::read_to_string(self.dir.join(CONFIG_FILE))?;
        Ok(serde_json::from_str(&json)?)
    }

    fn load_weights<B: Backend>(
        &self,
        model:  InceptionTime<B>,
        device: &B::Device,
    ) -> PipelineResult<InceptionTime<B>> {
        model
            .load_file(self.dir.join(CHECKPOINT_STEM), &Recorder::new(), device)
            .map_err(|e| {
                PipelineError::Checkpoint(format!(
                    "cannot load '{}': {e:?}",
                    self.model_path().display()
                ))
            })
    }
}
