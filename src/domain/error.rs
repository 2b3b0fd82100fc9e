// ============================================================
// Layer 3 — Pipeline Errors
// ============================================================
// Every failure the pipeline can report, as one enum.
//
//   Ingestion  : MalformedRow, InvalidFeatureLayout, RaggedRow,
//                EmptyDataset
//   Config     : Config
//   Training   : NonFiniteLoss, NoCheckpoint, Checkpoint
//   Export     : Export
//   Runtime    : Tensor
//   Plumbing   : Io, Csv, Json
//
// None of these are retried. The application layer wraps them
// in anyhow with context before they reach the operator.
//
// Reference: Rust Book §9 (Error Handling), thiserror docs

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("malformed row at line {line}: {reason}")]
    MalformedRow { line: u64, reason: String },

    #[error("invalid feature layout at line {line}: {count} feature values is not a positive multiple of 4")]
    InvalidFeatureLayout { line: u64, count: usize },

    #[error("data row {row} has {found} bars per channel, expected {expected}")]
    RaggedRow { row: usize, expected: usize, found: usize },

    #[error("dataset '{}' contains no usable rows", .0.display())]
    EmptyDataset(PathBuf),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("non-finite training loss in epoch {epoch}, batch {batch}")]
    NonFiniteLoss { epoch: usize, batch: usize },

    #[error("no checkpoint available in '{}'", .0.display())]
    NoCheckpoint(PathBuf),

    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    #[error("export failed: {0}")]
    Export(String),

    #[error("tensor data error: {0}")]
    Tensor(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
