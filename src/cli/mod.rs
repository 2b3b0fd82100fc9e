// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses command line arguments with clap and routes each
// subcommand to its use case in Layer 2. Printing of final
// results happens here; per-epoch lines come from the trainer.
//
//   1. `train`    — full pipeline: load, train, checkpoint, export
//   2. `inspect`  — validate a CSV and preview the split
//   3. `evaluate` — score a CSV with a trained checkpoint
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvaluateArgs, InspectArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "inceptiontime-trainer",
    version,
    about = "Train an InceptionTime classifier on bar series and export it to ONNX."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => run_train(args),
            Commands::Inspect(args)  => run_inspect(args),
            Commands::Evaluate(args) => run_evaluate(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on '{}'", args.data.display());

    let result = TrainUseCase::new(args.into()).execute()?;

    if result.stopped_early {
        println!("Stopped early after {} epochs.", result.epochs_run);
    }
    println!(
        "Best validation loss {:.4}, accuracy {:.4} (epoch {})",
        result.best_val_loss, result.best_val_accuracy, result.best_epoch
    );
    println!("Checkpoint: {}", result.checkpoint_path.display());
    println!("ONNX model: {}", result.export_path.display());
    Ok(())
}

fn run_inspect(args: InspectArgs) -> Result<()> {
    use crate::application::inspect_use_case::InspectUseCase;

    let report = InspectUseCase::new(args.data, args.val, args.seed).execute()?;
    println!("{}", report.summary);
    println!(
        "Split (val {}, seed {}): {} train, {} validation",
        args.val, args.seed, report.train_size, report.validation_size
    );
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    let use_case = EvaluateUseCase::new(args.model_dir)?;
    let meta = use_case.checkpoint();
    println!(
        "Checkpoint from epoch {} in '{}' ({} bars, {} classes)",
        meta.epoch,
        use_case.model_dir().display(),
        meta.bars,
        meta.model.num_classes
    );

    let eval = use_case.evaluate(&args.data, args.batch)?;
    println!(
        "Evaluated {} samples: loss {:.4}, accuracy {:.4}",
        eval.logits.len(),
        eval.loss,
        eval.accuracy
    );
    Ok(())
}
