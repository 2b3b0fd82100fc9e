// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything the pipeline writes to the output directory that
// is not the exported model itself:
//
//   checkpoint.rs — best-epoch weights, their metadata and the
//                   run configuration. Rebuilds the model for
//                   evaluation after training.
//
//   metrics.rs    — one CSV row per epoch for plotting learning
//                   curves.
//
// Reference: Rust Book §7 (Modules)
//            Burn Book §5 (Checkpointing)

/// Best-checkpoint persistence and restore
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;
