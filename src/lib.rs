//! Training pipeline for an InceptionTime bar-series classifier:
//! CSV export in, best checkpoint and ONNX model out.

pub mod cli;
pub mod application;
pub mod domain;
pub mod data;
pub mod ml;
pub mod infra;
