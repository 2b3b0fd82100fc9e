// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Manual epoch loop with Adam and a cosine learning-rate
// schedule. Each epoch runs two phases:
//
//   train    : seeded shuffle of the training indices,
//              mini-batch forward/backward/step in Train mode
//   evaluate : validation indices in fixed order, Inference
//              mode on the inner (non-autodiff) backend
//
// After evaluation the early-stopping policy decides whether
// to save a checkpoint and whether another epoch may start.
// The learning rate advances once per completed epoch.
//
// Burn notes:
//   - Training uses TrainBackend (Autodiff<NdArray>)
//   - model.valid() returns the model on InferBackend (NdArray)
//   - argmax(1) returns [batch, 1] so it is flattened before .equal()
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam,
//            Loshchilov & Hutter (2017) SGDR

use burn::{
    backend::{ndarray::NdArrayDevice, Autodiff, NdArray},
    module::AutodiffModule,
    optim::{decay::WeightDecayConfig, AdamConfig, GradientsParams, Optimizer},
    prelude::*,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::SeriesBatcher, dataset::Dataset, splitter::Split};
use crate::domain::error::{PipelineError, PipelineResult};
use crate::infra::{
    checkpoint::{CheckpointManager, CheckpointMeta},
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::model::{InceptionTime, InceptionTimeConfig, ModelMode};
use crate::ml::schedule::{CosineAnnealing, EarlyStopping};

pub type TrainBackend = Autodiff<NdArray>;
pub type InferBackend = NdArray;
pub type Device       = NdArrayDevice;

/// Why the epoch loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EpochBudget,
    EarlyStopped,
}

#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub history:      Vec<EpochMetrics>,
    pub epochs_run:   usize,
    pub stop_reason:  StopReason,
    /// Architecture every checkpoint of this run was built with
    pub model_config: InceptionTimeConfig,
}

/// Loss, accuracy and raw logits over an ordered set of samples.
#[derive(Debug, Clone, Default)]
pub struct Evaluation {
    pub loss:     f64,
    pub accuracy: f64,
    /// One row of class scores per evaluated sample, in input order
    pub logits:   Vec<Vec<f32>>,
}

/// Architecture for `dataset`, with dropout taken from the run config.
pub fn model_config(cfg: &TrainConfig, dataset: &Dataset) -> InceptionTimeConfig {
    InceptionTimeConfig::new(dataset.num_classes()).with_dropout(cfg.dropout)
}

pub fn run_training(
    cfg:          &TrainConfig,
    dataset:      &Dataset,
    split:        &Split,
    ckpt_manager: &mut CheckpointManager,
    metrics:      &MetricsLogger,
    device:       &Device,
) -> PipelineResult<TrainOutcome> {

    // ── Build model ───────────────────────────────────────────────────────────
    let model_cfg = model_config(cfg, dataset);
    let mut model: InceptionTime<TrainBackend> = model_cfg.init(device);
    tracing::info!(
        "Model ready: {} blocks, {} filters per branch, {} classes",
        model_cfg.depth,
        model_cfg.filters,
        model_cfg.num_classes,
    );

    // ── Adam with an L2 penalty added to the gradient ────────────────────────
    let mut optim = AdamConfig::new()
        .with_weight_decay(Some(WeightDecayConfig::new(cfg.weight_decay as f32)))
        .init();

    let mut schedule = CosineAnnealing::new(cfg.learning_rate, cfg.epochs);
    let mut stopping = EarlyStopping::new(cfg.patience);

    let train_batcher = SeriesBatcher::<TrainBackend>::new(device.clone());

    let mut history     = Vec::with_capacity(cfg.epochs);
    let mut stop_reason = StopReason::EpochBudget;

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 0..cfg.epochs {
        let lr = schedule.lr();

        // ── Training phase ────────────────────────────────────────────────────
        let order = split.epoch_order(epoch);
        let mut loss_sum = 0.0f64;
        let mut correct  = 0usize;
        let mut seen     = 0usize;

        for (batch_idx, indices) in order.chunks(cfg.batch_size).enumerate() {
            let batch = train_batcher.batch(dataset, indices);
            let n     = batch.len();

            let (loss, logits) =
                model.forward_loss(batch.inputs, batch.targets.clone(), ModelMode::Train);

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            if !loss_val.is_finite() {
                return Err(PipelineError::NonFiniteLoss {
                    epoch: epoch + 1,
                    batch: batch_idx + 1,
                });
            }
            loss_sum += loss_val * n as f64;
            correct  += count_correct(logits, batch.targets);
            seen     += n;

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(lr, model, grads);
        }

        let train_loss     = mean_or_zero(loss_sum, seen);
        let train_accuracy = mean_or_zero(correct as f64, seen);

        // ── Validation phase ──────────────────────────────────────────────────
        let eval = evaluate(&model.valid(), dataset, split.validation(), cfg.batch_size, device)?;

        let row = EpochMetrics {
            epoch: epoch + 1,
            train_loss,
            train_accuracy,
            val_loss: eval.loss,
            val_accuracy: eval.accuracy,
            learning_rate: lr,
        };
        println!("{row}");
        metrics.log(&row)?;
        history.push(row);

        // ── Checkpoint / early stop ───────────────────────────────────────────
        let decision = stopping.observe(eval.loss);
        if decision.improved {
            ckpt_manager.save_model(
                &model,
                CheckpointMeta {
                    epoch:        epoch + 1,
                    val_loss:     eval.loss,
                    val_accuracy: eval.accuracy,
                    bars:         dataset.bars(),
                    model:        model_cfg.clone(),
                },
            )?;
        }
        schedule.step();

        if decision.should_stop {
            println!(
                "Early stopping at epoch {}: no improvement for {} epochs (best val loss {:.4})",
                epoch + 1,
                stopping.epochs_no_improve(),
                stopping.best_val_loss(),
            );
            stop_reason = StopReason::EarlyStopped;
            break;
        }
    }

    Ok(TrainOutcome {
        epochs_run: history.len(),
        history,
        stop_reason,
        model_config: model_cfg,
    })
}

/// Inference-mode loss, accuracy and logits over `indices`, in order.
///
/// An empty index set evaluates to zero loss and zero accuracy.
pub fn evaluate(
    model:      &InceptionTime<InferBackend>,
    dataset:    &Dataset,
    indices:    &[usize],
    batch_size: usize,
    device:     &Device,
) -> PipelineResult<Evaluation> {
    let batcher = SeriesBatcher::<InferBackend>::new(device.clone());

    let mut loss_sum = 0.0f64;
    let mut correct  = 0usize;
    let mut logits   = Vec::with_capacity(indices.len());

    for chunk in indices.chunks(batch_size.max(1)) {
        let batch = batcher.batch(dataset, chunk);
        let n     = batch.len();

        let (loss, batch_logits) =
            model.forward_loss(batch.inputs, batch.targets.clone(), ModelMode::Inference);

        loss_sum += loss.into_scalar().elem::<f64>() * n as f64;
        correct  += count_correct(batch_logits.clone(), batch.targets);

        let [_, classes] = batch_logits.dims();
        let values: Vec<f32> = batch_logits
            .into_data()
            .to_vec()
            .map_err(|e| PipelineError::Tensor(format!("{e:?}")))?;
        logits.extend(values.chunks(classes).map(<[f32]>::to_vec));
    }

    Ok(Evaluation {
        loss:     mean_or_zero(loss_sum, indices.len()),
        accuracy: mean_or_zero(correct as f64, indices.len()),
        logits,
    })
}

fn count_correct<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> usize {
    // argmax(1) returns shape [batch, 1]; flatten to [batch]
    let predicted = logits.argmax(1).flatten::<1>(0, 1);
    let hits: i64 = predicted.equal(targets).int().sum().into_scalar().elem::<i64>();
    hits as usize
}

fn mean_or_zero(sum: f64, count: usize) -> f64 {
    if count == 0 { 0.0 } else { sum / count as f64 }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::backend_rng_lock;
    use crate::domain::sample::RawSample;
    use std::path::Path;

    fn toy_dataset(rows: usize, bars: usize) -> Dataset {
        let samples = (0..rows)
            .map(|i| {
                let label = i % 2;
                let features = (0..4 * bars)
                    .map(|j| if label == 0 { (j as f32 * 0.3).sin() } else { j as f32 / 10.0 })
                    .collect();
                RawSample::new(label, if label == 0 { "flat" } else { "up" }, features)
            })
            .collect();
        Dataset::from_samples(Path::new("mem"), samples).unwrap()
    }

    fn small_config(out: &Path, epochs: usize) -> TrainConfig {
        TrainConfig {
            output_dir: out.to_path_buf(),
            epochs,
            batch_size: 8,
            validation_fraction: 0.25,
            seed: 3,
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_empty_evaluation_is_zero() {
        let _rng = backend_rng_lock();
        let ds     = toy_dataset(4, 6);
        let device = Device::default();
        let model  = InceptionTimeConfig::new(2).with_filters(4).with_depth(1).init(&device);
        let eval   = evaluate(&model, &ds, &[], 8, &device).unwrap();
        assert_eq!(eval.loss, 0.0);
        assert_eq!(eval.accuracy, 0.0);
        assert!(eval.logits.is_empty());
    }

    #[test]
    fn test_evaluation_keeps_index_order() {
        let _rng = backend_rng_lock();
        let ds     = toy_dataset(6, 6);
        let device = Device::default();
        let model  = InceptionTimeConfig::new(2).with_filters(4).with_depth(1).init(&device);

        let forward = evaluate(&model, &ds, &[0, 1, 2], 2, &device).unwrap();
        let reverse = evaluate(&model, &ds, &[2, 1, 0], 3, &device).unwrap();
        assert_eq!(forward.logits.len(), 3);
        assert_eq!(forward.logits[0], reverse.logits[2]);
        assert_eq!(forward.logits[2], reverse.logits[0]);
        assert!((forward.loss - reverse.loss).abs() < 1e-6);
    }

    #[test]
    fn test_training_writes_history_and_checkpoint() {
        let _rng = backend_rng_lock();
        let dir     = tempfile::tempdir().unwrap();
        let cfg     = small_config(dir.path(), 2);
        let ds      = toy_dataset(16, 8);
        let split   = Split::plan(ds.len(), cfg.validation_fraction, cfg.seed);
        let mut mgr = CheckpointManager::new(dir.path()).unwrap();
        let metrics = MetricsLogger::create(dir.path()).unwrap();

        let outcome =
            run_training(&cfg, &ds, &split, &mut mgr, &metrics, &Device::default()).unwrap();

        assert_eq!(outcome.epochs_run, 2);
        assert_eq!(outcome.stop_reason, StopReason::EpochBudget);
        assert_eq!(outcome.history[0].epoch, 1);
        assert!((outcome.history[0].learning_rate - cfg.learning_rate).abs() < 1e-12);
        assert!(outcome.history[1].learning_rate < outcome.history[0].learning_rate);
        assert!(outcome.history.iter().all(|m| m.train_loss.is_finite()));

        // The first epoch always improves on +inf, so a checkpoint exists.
        let best = mgr.best().unwrap();
        assert!(best.epoch >= 1);
        assert!(mgr.model_path().exists());

        let csv = std::fs::read_to_string(metrics.csv_path()).unwrap();
        assert_eq!(csv.lines().count(), 3);
    }

    #[test]
    fn test_without_validation_stops_after_patience() {
        let _rng = backend_rng_lock();
        // Validation loss is always 0.0: only epoch 1 improves.
        let dir     = tempfile::tempdir().unwrap();
        let cfg     = TrainConfig {
            validation_fraction: 0.0,
            patience: 2,
            ..small_config(dir.path(), 10)
        };
        let ds      = toy_dataset(8, 6);
        let split   = Split::plan(ds.len(), cfg.validation_fraction, cfg.seed);
        let mut mgr = CheckpointManager::new(dir.path()).unwrap();
        let metrics = MetricsLogger::create(dir.path()).unwrap();

        let outcome =
            run_training(&cfg, &ds, &split, &mut mgr, &metrics, &Device::default()).unwrap();

        assert_eq!(outcome.epochs_run, 3);
        assert_eq!(outcome.stop_reason, StopReason::EarlyStopped);
        assert_eq!(mgr.best().unwrap().epoch, 1);
    }

    #[test]
    fn test_overflowing_features_abort_with_non_finite_loss() {
        let _rng = backend_rng_lock();
        let dir     = tempfile::tempdir().unwrap();
        let cfg     = small_config(dir.path(), 3);
        let samples = (0..16)
            .map(|i| {
                let features = (0..4 * 8)
                    .map(|j| if (i + j) % 2 == 0 { 3.0e38 } else { -3.0e38 })
                    .collect();
                RawSample::new(i % 2, "x", features)
            })
            .collect();
        let ds      = Dataset::from_samples(Path::new("mem"), samples).unwrap();
        let split   = Split::plan(ds.len(), cfg.validation_fraction, cfg.seed);
        let mut mgr = CheckpointManager::new(dir.path()).unwrap();
        let metrics = MetricsLogger::create(dir.path()).unwrap();

        let err = run_training(&cfg, &ds, &split, &mut mgr, &metrics, &Device::default())
            .unwrap_err();
        assert!(matches!(err, PipelineError::NonFiniteLoss { epoch: 1, batch: 1 }));
        assert_eq!(err.to_string(), "non-finite training loss in epoch 1, batch 1");
        assert!(mgr.best().is_none());
    }
}
