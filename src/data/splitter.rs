// ============================================================
// Layer 4 — Train/Validation Split Planner
// ============================================================
// Partitions sample indices into a training set and a
// validation set, reproducibly:
//
//   validation size = floor(N * fraction)   (0 when fraction <= 0)
//   train size      = N - validation size
//
// A ChaCha8 generator seeded with the run seed permutes 0..N;
// the first `train size` indices train, the rest validate.
// ChaCha8 output is fixed by its seed on every platform, so the
// same seed always gives the same split.
//
// Training order is reshuffled every epoch from a seed derived
// from (root seed, epoch). Validation order never changes.
//
// Reference: rand / rand_chacha crate documentation

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Disjoint, exhaustive train/validation index sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    train:      Vec<usize>,
    validation: Vec<usize>,
    seed:       u64,
}

impl Split {
    /// Plan the split for `total` samples.
    pub fn plan(total: usize, validation_fraction: f64, seed: u64) -> Self {
        let val_size = validation_size(total, validation_fraction);

        let mut indices: Vec<usize> = (0..total).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        indices.shuffle(&mut rng);

        // split_off(n) leaves [0..n) in `indices` and returns [n..)
        let validation = indices.split_off(total - val_size);

        tracing::debug!(
            "Dataset split: {} training, {} validation (seed {})",
            indices.len(),
            validation.len(),
            seed,
        );

        Self { train: indices, validation, seed }
    }

    pub fn train(&self) -> &[usize] {
        &self.train
    }

    pub fn validation(&self) -> &[usize] {
        &self.validation
    }

    /// Training indices in the order used for `epoch` (0-based).
    pub fn epoch_order(&self, epoch: usize) -> Vec<usize> {
        let mut order = self.train.clone();
        let mut rng = ChaCha8Rng::seed_from_u64(epoch_seed(self.seed, epoch));
        order.shuffle(&mut rng);
        order
    }
}

/// floor(total * fraction), clamped to [0, total].
pub fn validation_size(total: usize, fraction: f64) -> usize {
    if !(fraction > 0.0) {
        return 0;
    }
    ((total as f64 * fraction).floor() as usize).min(total)
}

// The root seed itself drives the partition; epochs start at +1.
fn epoch_seed(seed: u64, epoch: usize) -> u64 {
    seed.wrapping_add(epoch as u64 + 1)
}
