// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The dataset builder only needs "something that yields raw
// samples". Programming against this trait keeps the CSV
// details inside the data layer:
//   - CsvSampleLoader implements SampleSource
//   - tests can hand in an in-memory source
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use std::path::Path;

use crate::domain::{error::PipelineResult, sample::RawSample};

// ─── SampleSource ─────────────────────────────────────────────────────────────
/// Any component that can produce the rows of a dataset.
pub trait SampleSource {
    /// Where the samples come from, for diagnostics and errors.
    fn origin(&self) -> &Path;

    /// Load every sample, in file order.
    fn load_all(&self) -> PipelineResult<Vec<RawSample>>;
}
