// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from the CSV export to tensor batches:
//
//   CSV export
//       │
//       ▼
//   CsvSampleLoader   → parses and validates rows
//       │
//       ▼
//   Dataset           → rectangular [N, 4, bars] store + labels
//       │
//       ▼
//   Split             → seeded train/validation partition,
//       │               per-epoch training order
//       ▼
//   SeriesBatcher     → stacks rows into tensor batches
//
// Reference: Burn Book §4 (Datasets and Batchers)

/// Reads labelled rows from the CSV export
pub mod loader;

/// Rectangular in-memory dataset with class metadata
pub mod dataset;

/// Seeded train/validation split and epoch ordering
pub mod splitter;

/// Stacks dataset rows into tensor batches
pub mod batcher;
