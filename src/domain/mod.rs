// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, enums and traits describing what the
// pipeline works with. No Burn types, no file I/O here.
//
//   sample.rs — one ingested CSV row, per-class summaries
//   error.rs  — the pipeline's error taxonomy
//   traits.rs — the seam between the dataset builder and
//               whatever produces raw samples
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// One ingested row and the dataset summary types
pub mod sample;

// Typed failures raised by every stage of the pipeline
pub mod error;

// Core abstractions (traits) that other layers implement
pub mod traits;
