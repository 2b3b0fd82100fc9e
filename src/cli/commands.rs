// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands, `train`, `inspect` and
// `evaluate`, and all their configurable flags.
//
// Reference: Rust Book §12 (Building a CLI Program)

use std::path::PathBuf;

use clap::{Args, Subcommand};
use crate::application::train_use_case::TrainConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train an InceptionTime classifier on a CSV export and export it to ONNX
    Train(TrainArgs),

    /// Validate a CSV export and preview the train/validation split
    Inspect(InspectArgs),

    /// Score a CSV export with a trained checkpoint
    Evaluate(EvaluateArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// CSV export: label, display name, then 4 * bars feature values per row
    #[arg(long)]
    pub data: PathBuf,

    /// Output directory for the checkpoint, ONNX model and metrics
    #[arg(long, default_value = "model")]
    pub out: PathBuf,

    /// Maximum number of passes through the training data
    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    /// Samples per mini-batch
    #[arg(long, default_value_t = 32)]
    pub batch: usize,

    /// Initial learning rate, annealed to zero over the epoch budget
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Fraction of samples held out for validation
    #[arg(long, default_value_t = 0.2, allow_negative_numbers = true)]
    pub val: f64,

    /// Seed for the split, the epoch shuffles and weight initialisation
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// L2 penalty applied by Adam
    #[arg(long, default_value_t = 1e-4)]
    pub weight_decay: f64,

    /// Epochs without validation improvement before stopping
    #[arg(long, default_value_t = 15)]
    pub patience: usize,

    /// Dropout probability after each inception block
    #[arg(long, default_value_t = 0.2)]
    pub dropout: f64,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data_path:           a.data,
            output_dir:          a.out,
            epochs:              a.epochs,
            batch_size:          a.batch,
            learning_rate:       a.lr,
            weight_decay:        a.weight_decay,
            validation_fraction: a.val,
            seed:                a.seed,
            patience:            a.patience,
            dropout:             a.dropout,
        }
    }
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    #[arg(long)]
    pub data: PathBuf,

    #[arg(long, default_value_t = 0.2, allow_negative_numbers = true)]
    pub val: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    #[arg(long)]
    pub data: PathBuf,

    /// Directory written by a previous `train` run
    #[arg(long, default_value = "model")]
    pub model_dir: PathBuf,

    #[arg(long, default_value_t = 32)]
    pub batch: usize,
}
