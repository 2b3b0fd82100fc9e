// ============================================================
// Layer 4 — Series Batcher
// ============================================================
// Stacks a list of dataset rows into tensors:
//
//   inputs : [batch, 4, bars]   float
//   targets: [batch]            int (class labels)
//
// Rows are already channel-major and rectangular inside
// Dataset, so batching is a straight copy followed by a reshape.
//
// Reference: Burn Book §4 (Batcher)

use burn::{prelude::*, tensor::TensorData};

use crate::data::dataset::Dataset;
use crate::domain::sample::CHANNELS;

/// A batch of samples ready for the model forward pass.
#[derive(Debug, Clone)]
pub struct SeriesBatch<B: Backend> {
    /// shape: [batch_size, CHANNELS, bars]
    pub inputs: Tensor<B, 3>,

    /// shape: [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

impl<B: Backend> SeriesBatch<B> {
    pub fn len(&self) -> usize {
        self.targets.dims()[0]
    }
}

/// Holds the target device so tensors are created in the right place.
#[derive(Clone, Debug)]
pub struct SeriesBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> SeriesBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    /// Gather `indices` from `dataset` into one batch, in the given order.
    pub fn batch(&self, dataset: &Dataset, indices: &[usize]) -> SeriesBatch<B> {
        let batch_size = indices.len();
        let bars       = dataset.bars();

        let mut flat = Vec::with_capacity(batch_size * CHANNELS * bars);
        for &i in indices {
            flat.extend_from_slice(dataset.sample(i));
        }

        let labels: Vec<i64> = indices.iter().map(|&i| dataset.label(i) as i64).collect();

        let inputs = Tensor::<B, 3>::from_data(
            TensorData::new(flat, [batch_size, CHANNELS, bars]),
            &self.device,
        );
        let targets = Tensor::<B, 1, Int>::from_data(
            TensorData::new(labels, [batch_size]),
            &self.device,
        );

        SeriesBatch { inputs, targets }
    }
}
