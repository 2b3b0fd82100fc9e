// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All tensor code lives here. The application layer only sees
// Dataset in, TrainOutcome / Evaluation / export path out.
//
//   model.rs      — InceptionTime: stacked inception blocks
//                   (parallel 9/19/39 convolutions, batch norm,
//                   ReLU, dropout), global average pooling and a
//                   linear classification head
//
//   schedule.rs   — cosine learning-rate annealing and
//                   patience-based early stopping
//
//   trainer.rs    — the epoch loop: seeded mini-batches, Adam
//                   steps, validation, best-checkpoint saving
//
//   onnx_proto.rs — prost messages for the ONNX subset we write
//
//   exporter.rs   — turns a trained model into an ONNX graph
//
//   inferencer.rs — reloads a checkpoint for evaluation
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)
//            Ismail Fawaz et al. (2020) InceptionTime

/// InceptionTime architecture
pub mod model;

/// Learning-rate schedule and early stopping
pub mod schedule;

/// Epoch loop with validation and checkpointing
pub mod trainer;

/// ONNX protobuf messages
pub mod onnx_proto;

/// ONNX graph export
pub mod exporter;

/// Checkpoint reload and evaluation
pub mod inferencer;
