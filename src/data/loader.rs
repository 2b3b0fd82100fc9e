// ============================================================
// Layer 4 — CSV Sample Loader
// ============================================================
// Reads the bar-series export with the csv crate.
//
// File layout (first row is a header and is skipped):
//
//   label,class,o0,c0,h0,l0,...
//   0,flat,1.02,1.01,...
//   1,impulse,0.98,0.99,...
//
// Each data row becomes one RawSample. Parsing is strict:
//   - label must be a non-negative integer
//   - every feature must be a finite number
//   - the feature count must be a positive multiple of 4
// Any violation aborts the load with the offending line number.
// Nothing is skipped silently: a bad row means a bad export.
//
// Reference: csv crate documentation
//            Rust Book §9 (Error Handling)

use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::domain::{
    error::{PipelineError, PipelineResult},
    sample::{RawSample, CHANNELS, MAX_LABEL},
    traits::SampleSource,
};

/// Loads every row of a labelled CSV export.
/// Implements the SampleSource trait from Layer 3.
pub struct CsvSampleLoader {
    path: PathBuf,
}

impl CsvSampleLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SampleSource for CsvSampleLoader {
    fn origin(&self) -> &Path {
        &self.path
    }

    fn load_all(&self) -> PipelineResult<Vec<RawSample>> {
        // flexible(true): row width is validated below with a
        // domain error instead of a generic csv one
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_path(&self.path)?;

        let mut samples = Vec::new();
        for record in reader.records() {
            let record = record?;
            let line   = record.position().map(|p| p.line()).unwrap_or(0);
            samples.push(parse_record(&record, line)?);
        }

        tracing::debug!("Read {} rows from '{}'", samples.len(), self.path.display());
        Ok(samples)
    }
}

/// Turn one CSV record into a RawSample.
fn parse_record(record: &StringRecord, line: u64) -> PipelineResult<RawSample> {
    if record.len() < 2 {
        return Err(PipelineError::MalformedRow {
            line,
            reason: format!("expected at least label and class name, found {} field(s)", record.len()),
        });
    }

    let label = record[0].parse::<usize>().map_err(|e| PipelineError::MalformedRow {
        line,
        reason: format!("label '{}' is not a non-negative integer: {e}", &record[0]),
    })?;
    if label > MAX_LABEL {
        return Err(PipelineError::MalformedRow {
            line,
            reason: format!("label {label} exceeds the maximum of {MAX_LABEL}"),
        });
    }

    let features = record
        .iter()
        .skip(2)
        .enumerate()
        .map(|(i, raw)| parse_feature(raw, i, line))
        .collect::<PipelineResult<Vec<f32>>>()?;

    if features.is_empty() || features.len() % CHANNELS != 0 {
        return Err(PipelineError::InvalidFeatureLayout { line, count: features.len() });
    }

    Ok(RawSample::new(label, &record[1], features))
}

fn parse_feature(raw: &str, index: usize, line: u64) -> PipelineResult<f32> {
    match raw.parse::<f32>() {
        Ok(v) if v.is_finite() => Ok(v),
        Ok(_) => Err(PipelineError::MalformedRow {
            line,
            reason: format!("feature {index} ('{raw}') is not finite"),
        }),
        Err(e) => Err(PipelineError::MalformedRow {
            line,
            reason: format!("feature {index} ('{raw}') is not numeric: {e}"),
        }),
    }
}
