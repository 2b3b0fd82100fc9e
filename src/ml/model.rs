use burn::{
    nn::{
        conv::{Conv1d, Conv1dConfig},
        loss::CrossEntropyLossConfig,
        BatchNorm, BatchNormConfig,
        Dropout, DropoutConfig,
        Linear, LinearConfig,
        PaddingConfig1d,
    },
    prelude::*,
    tensor::activation::relu,
};

/// Receptive-field widths of the parallel branches in every block.
pub const KERNEL_SIZES: [usize; 3] = [9, 19, 39];

/// Whether a forward pass is part of training.
///
/// `Train` applies dropout and lets batch normalisation use batch
/// statistics (and update its running averages) on an autodiff backend.
/// `Inference` never drops activations and always normalises with the
/// running statistics, so it is deterministic on any backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelMode {
    Train,
    Inference,
}

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct InceptionTimeConfig {
    pub num_classes: usize,
    #[config(default = "4")]
    pub in_channels: usize,
    /// Output channels of each convolution branch
    #[config(default = "32")]
    pub filters:     usize,
    /// Number of stacked inception blocks
    #[config(default = "3")]
    pub depth:       usize,
    #[config(default = "0.2")]
    pub dropout:     f64,
}

impl InceptionTimeConfig {
    /// Channels produced by every block, and the width of the pooled embedding.
    pub fn embedding_width(&self) -> usize {
        self.filters * KERNEL_SIZES.len()
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> InceptionTime<B> {
        let width = self.embedding_width();
        let blocks: Vec<InceptionBlock<B>> = (0..self.depth)
            .map(|i| {
                let in_channels = if i == 0 { self.in_channels } else { width };
                self.build_block(in_channels, device)
            })
            .collect();
        let head = LinearConfig::new(width, self.num_classes).init(device);
        InceptionTime {
            blocks,
            head,
            in_channels: self.in_channels,
            num_classes: self.num_classes,
        }
    }

    fn build_block<B: Backend>(&self, in_channels: usize, device: &B::Device) -> InceptionBlock<B> {
        // Odd kernels with "same" padding (k / 2 each side) keep the length.
        let branches = KERNEL_SIZES
            .iter()
            .map(|&k| {
                Conv1dConfig::new(in_channels, self.filters, k)
                    .with_padding(PaddingConfig1d::Same)
                    .init(device)
            })
            .collect();
        let norm    = BatchNormConfig::new(self.embedding_width()).init(device);
        let dropout = DropoutConfig::new(self.dropout).init();
        InceptionBlock { branches, norm, dropout }
    }
}

/// Parallel convolutions over the same input, concatenated on the
/// channel axis, then normalisation, ReLU and dropout.
#[derive(Module, Debug)]
pub struct InceptionBlock<B: Backend> {
    pub branches: Vec<Conv1d<B>>,
    pub norm:     BatchNorm<B>,
    pub dropout:  Dropout,
}

impl<B: Backend> InceptionBlock<B> {
    /// [batch, in_channels, bars] → [batch, filters * branches, bars]
    pub fn forward(&self, x: Tensor<B, 3>, mode: ModelMode) -> Tensor<B, 3> {
        let outputs: Vec<Tensor<B, 3>> = self
            .branches
            .iter()
            .map(|conv| conv.forward(x.clone()))
            .collect();
        let x = Tensor::cat(outputs, 1);

        match mode {
            ModelMode::Train => self.dropout.forward(relu(self.norm.forward(x))),
            ModelMode::Inference => relu(self.normalize_running(x)),
        }
    }

    fn normalize_running(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let channels = x.dims()[1];
        let mean  = self.norm.running_mean.value().reshape([1, channels, 1]);
        let var   = self.norm.running_var.value().reshape([1, channels, 1]);
        let gamma = self.norm.gamma.val().reshape([1, channels, 1]);
        let beta  = self.norm.beta.val().reshape([1, channels, 1]);

        (x - mean) / var.add_scalar(self.norm.epsilon).sqrt() * gamma + beta
    }
}

#[derive(Module, Debug)]
pub struct InceptionTime<B: Backend> {
    pub blocks:      Vec<InceptionBlock<B>>,
    pub head:        Linear<B>,
    pub in_channels: usize,
    pub num_classes: usize,
}

impl<B: Backend> InceptionTime<B> {
    /// [batch, in_channels, bars] → [batch, embedding_width]
    ///
    /// Global average pooling over time makes the width independent of `bars`.
    pub fn embed(&self, input: Tensor<B, 3>, mode: ModelMode) -> Tensor<B, 2> {
        let mut x = input;
        for block in &self.blocks {
            x = block.forward(x, mode);
        }
        let [batch_size, channels, _] = x.dims();
        x.mean_dim(2).reshape([batch_size, channels])
    }

    /// [batch, in_channels, bars] → logits [batch, num_classes]
    pub fn forward(&self, input: Tensor<B, 3>, mode: ModelMode) -> Tensor<B, 2> {
        self.head.forward(self.embed(input, mode))
    }

    /// Mean cross-entropy over the batch, plus the logits it was computed from.
    pub fn forward_loss(
        &self,
        input:   Tensor<B, 3>,
        targets: Tensor<B, 1, Int>,
        mode:    ModelMode,
    ) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let logits = self.forward(input, mode);
        let loss = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits.clone(), targets);
        (loss, logits)
    }
}

/// Serialises tests that draw from the backend's global RNG
/// (parameter init, dropout, random tensors).
#[cfg(test)]
pub(crate) fn backend_rng_lock() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn model(num_classes: usize) -> InceptionTime<TestBackend> {
        InceptionTimeConfig::new(num_classes).init(&Default::default())
    }

    #[test]
    fn test_default_architecture() {
        let _rng = backend_rng_lock();
        let m = model(3);
        assert_eq!(m.blocks.len(), 3);
        assert_eq!(m.blocks[0].branches.len(), 3);
        assert_eq!(m.blocks[0].branches[0].weight.val().dims(), [32, 4, 9]);
        assert_eq!(m.blocks[1].branches[2].weight.val().dims(), [32, 96, 39]);
        assert_eq!(m.num_classes, 3);
    }

    #[test]
    fn test_logits_shape() {
        let _rng = backend_rng_lock();
        let m = model(3);
        let x = Tensor::<TestBackend, 3>::ones([2, 4, 50], &Default::default());
        assert_eq!(m.forward(x, ModelMode::Inference).dims(), [2, 3]);
    }

    #[test]
    fn test_short_series_with_default_width() {
        let _rng = backend_rng_lock();
        // Series shorter than the widest kernel must still pad cleanly.
        let m = model(2);
        let device = Default::default();
        for bars in 1..=20 {
            let x = Tensor::<TestBackend, 3>::ones([2, 4, bars], &device);
            assert_eq!(m.forward(x, ModelMode::Inference).dims(), [2, 2], "bars = {bars}");
        }
    }

    #[test]
    fn test_embedding_width_is_independent_of_length() {
        let _rng = backend_rng_lock();
        let m = model(2);
        let device = Default::default();
        let short = Tensor::<TestBackend, 3>::ones([1, 4, 12], &device);
        let long  = Tensor::<TestBackend, 3>::ones([1, 4, 80], &device);
        assert_eq!(m.embed(short, ModelMode::Inference).dims(), [1, 96]);
        assert_eq!(m.embed(long, ModelMode::Inference).dims(), [1, 96]);
    }

    #[test]
    fn test_inference_is_deterministic() {
        let _rng = backend_rng_lock();
        let m = model(2);
        let x = Tensor::<TestBackend, 3>::random(
            [3, 4, 20],
            burn::tensor::Distribution::Normal(0.0, 1.0),
            &Default::default(),
        );
        let a: Vec<f32> = m.forward(x.clone(), ModelMode::Inference).into_data().to_vec().unwrap();
        let b: Vec<f32> = m.forward(x, ModelMode::Inference).into_data().to_vec().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_loss_is_finite_and_positive() {
        let _rng = backend_rng_lock();
        let m = model(2);
        let device = Default::default();
        let x = Tensor::<TestBackend, 3>::ones([2, 4, 16], &device);
        let y = Tensor::<TestBackend, 1, Int>::from_data(TensorData::new(vec![0i64, 1], [2]), &device);
        let (loss, logits) = m.forward_loss(x, y, ModelMode::Inference);
        let loss: f32 = loss.into_scalar().elem();
        assert!(loss.is_finite() && loss > 0.0);
        assert_eq!(logits.dims(), [2, 2]);
    }
}
