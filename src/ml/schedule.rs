//! Learning-rate schedule and early-stopping policy.
//!
//! Both are advanced once per completed epoch by the training loop.

use std::f64::consts::PI;

/// Cosine annealing from `initial_lr` down to `min_lr` over `total_epochs`.
///
/// `lr(e) = min_lr + (initial_lr - min_lr) * (1 + cos(pi * e / total_epochs)) / 2`
#[derive(Debug, Clone)]
pub struct CosineAnnealing {
    initial_lr:   f64,
    min_lr:       f64,
    total_epochs: usize,
    epoch:        usize,
}

impl CosineAnnealing {
    pub fn new(initial_lr: f64, total_epochs: usize) -> Self {
        Self::with_min_lr(initial_lr, 0.0, total_epochs)
    }

    pub fn with_min_lr(initial_lr: f64, min_lr: f64, total_epochs: usize) -> Self {
        Self { initial_lr, min_lr, total_epochs, epoch: 0 }
    }

    /// Learning rate for the current epoch.
    pub fn lr(&self) -> f64 {
        self.lr_at(self.epoch)
    }

    pub fn lr_at(&self, epoch: usize) -> f64 {
        if self.total_epochs == 0 {
            return self.initial_lr;
        }
        let progress = (epoch as f64 / self.total_epochs as f64).min(1.0);
        let cosine_factor = 0.5 * (1.0 + (PI * progress).cos());
        self.min_lr + (self.initial_lr - self.min_lr) * cosine_factor
    }

    /// Advance one epoch. Called after every epoch, improving or not.
    pub fn step(&mut self) {
        self.epoch += 1;
    }
}

/// What the stopping policy concluded after one epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopDecision {
    /// Strictly better than every earlier epoch: persist a checkpoint.
    pub improved:    bool,
    /// Patience exhausted: do not start another epoch.
    pub should_stop: bool,
}

/// Patience-based early stopping on validation loss.
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience:          usize,
    best_val_loss:     f64,
    epochs_no_improve: usize,
}

impl EarlyStopping {
    pub fn new(patience: usize) -> Self {
        Self {
            patience,
            best_val_loss: f64::INFINITY,
            epochs_no_improve: 0,
        }
    }

    pub fn best_val_loss(&self) -> f64 {
        self.best_val_loss
    }

    pub fn epochs_no_improve(&self) -> usize {
        self.epochs_no_improve
    }

    /// Record one epoch's validation loss. Ties do not count as improvement.
    pub fn observe(&mut self, val_loss: f64) -> StopDecision {
        if val_loss < self.best_val_loss {
            self.best_val_loss = val_loss;
            self.epochs_no_improve = 0;
            StopDecision { improved: true, should_stop: false }
        } else {
            self.epochs_no_improve += 1;
            StopDecision {
                improved:    false,
                should_stop: self.epochs_no_improve >= self.patience,
            }
        }
    }
}
