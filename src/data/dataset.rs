// ============================================================
// Layer 4 — Dataset
// ============================================================
// Holds every loaded sample in one rectangular array:
//
//   features : [samples, CHANNELS, bars], row-major, channel-major
//              per row (first `bars` values are channel 0)
//   labels   : one class index per sample
//
// The number of classes is the largest label plus one. Class
// display names come from the first row seen for each label.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::domain::{
    error::{PipelineError, PipelineResult},
    sample::{ClassSummary, DatasetSummary, RawSample, CHANNELS, MAX_LABEL},
    traits::SampleSource,
};

/// All samples of one export, stored as a rectangular
/// `[samples, CHANNELS, bars]` array plus parallel labels.
#[derive(Debug, Clone)]
pub struct Dataset {
    origin:      PathBuf,
    features:    Vec<f32>,
    labels:      Vec<usize>,
    class_names: BTreeMap<usize, String>,
    bars:        usize,
    num_classes: usize,
}

impl Dataset {
    /// Load every sample from `source` and log the per-class summary.
    pub fn load(source: &impl SampleSource) -> PipelineResult<Self> {
        let samples = source.load_all()?;
        let dataset = Self::from_samples(source.origin(), samples)?;
        tracing::debug!("{}", dataset.summary());
        Ok(dataset)
    }

    pub fn from_samples(origin: &Path, samples: Vec<RawSample>) -> PipelineResult<Self> {
        let Some(first) = samples.first() else {
            return Err(PipelineError::EmptyDataset(origin.to_path_buf()));
        };
        let bars = first.bar_count();

        let mut features    = Vec::with_capacity(samples.len() * CHANNELS * bars);
        let mut labels      = Vec::with_capacity(samples.len());
        let mut class_names = BTreeMap::new();

        for (row, sample) in samples.into_iter().enumerate() {
            if sample.features.len() != CHANNELS * bars {
                return Err(PipelineError::RaggedRow {
                    row:      row + 1,
                    expected: bars,
                    found:    sample.bar_count(),
                });
            }
            if sample.label > MAX_LABEL {
                return Err(PipelineError::Config(format!(
                    "row {}: label {} exceeds the maximum of {MAX_LABEL}",
                    row + 1,
                    sample.label
                )));
            }
            // First row seen for a label names the class; later
            // rows with a different display name are ignored.
            class_names.entry(sample.label).or_insert(sample.display_name);
            labels.push(sample.label);
            features.extend_from_slice(&sample.features);
        }

        let num_classes = labels.iter().copied().max().map_or(0, |max| max + 1);

        Ok(Self {
            origin: origin.to_path_buf(),
            features,
            labels,
            class_names,
            bars,
            num_classes,
        })
    }

    pub fn origin(&self) -> &Path {
        &self.origin
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn bars(&self) -> usize {
        self.bars
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn label(&self, index: usize) -> usize {
        self.labels[index]
    }

    /// Channel-major features of one sample, `CHANNELS * bars` long.
    pub fn sample(&self, index: usize) -> &[f32] {
        let width = CHANNELS * self.bars;
        &self.features[index * width..(index + 1) * width]
    }

    pub fn class_name(&self, label: usize) -> Option<&str> {
        self.class_names.get(&label).map(String::as_str)
    }

    pub fn summary(&self) -> DatasetSummary {
        let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
        for &label in &self.labels {
            *counts.entry(label).or_default() += 1;
        }

        let per_class = counts
            .into_iter()
            .map(|(label, count)| ClassSummary {
                label,
                name: self.class_name(label).unwrap_or_default().to_string(),
                count,
            })
            .collect();

        DatasetSummary {
            samples:     self.len(),
            num_classes: self.num_classes,
            bars:        self.bars,
            per_class,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(label: usize, name: &str, bars: usize) -> RawSample {
        RawSample::new(label, name, vec![label as f32; CHANNELS * bars])
    }

    #[test]
    fn test_class_inference_and_first_seen_names() {
        let samples = vec![
            sample(0, "flat", 3),
            sample(1, "up", 3),
            sample(0, "renamed", 3),
            sample(2, "down", 3),
        ];
        let ds = Dataset::from_samples(Path::new("mem"), samples).unwrap();

        assert_eq!(ds.num_classes(), 3);
        assert_eq!(ds.class_name(0), Some("flat"));
        assert_eq!(ds.class_name(2), Some("down"));
        assert_eq!(ds.labels(), &[0, 1, 0, 2]);
    }

    #[test]
    fn test_rectangular_layout() {
        let samples = vec![
            RawSample::new(0, "a", (0..8).map(|v| v as f32).collect()),
            RawSample::new(1, "b", (8..16).map(|v| v as f32).collect()),
        ];
        let ds = Dataset::from_samples(Path::new("mem"), samples).unwrap();

        assert_eq!(ds.bars(), 2);
        assert_eq!(ds.sample(1), &[8.0, 9.0, 10.0, 11.0, 12.0, 13.0, 14.0, 15.0]);
    }

    #[test]
    fn test_empty_dataset_is_rejected() {
        let err = Dataset::from_samples(Path::new("empty.csv"), Vec::new()).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyDataset(_)));
    }

    #[test]
    fn test_ragged_rows_are_rejected() {
        let samples = vec![sample(0, "a", 5), sample(1, "b", 4)];
        let err = Dataset::from_samples(Path::new("mem"), samples).unwrap_err();
        assert!(matches!(err, PipelineError::RaggedRow { row: 2, expected: 5, found: 4 }));
    }

    #[test]
    fn test_label_above_maximum_is_rejected() {
        let samples = vec![sample(0, "a", 2), RawSample::new(usize::MAX, "b", vec![0.0; 8])];
        let err = Dataset::from_samples(Path::new("mem"), samples).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn test_summary_counts_per_class() {
        let samples = vec![sample(1, "up", 2), sample(0, "flat", 2), sample(1, "up", 2)];
        let ds = Dataset::from_samples(Path::new("mem"), samples).unwrap();
        let summary = ds.summary();

        assert_eq!(summary.samples, 3);
        assert_eq!(summary.num_classes, 2);
        assert_eq!(summary.per_class[0], ClassSummary { label: 0, name: "flat".into(), count: 1 });
        assert_eq!(summary.per_class[1], ClassSummary { label: 1, name: "up".into(), count: 2 });
    }
}
