// ============================================================
// Layer 3 — Sample Domain Types
// ============================================================
// A RawSample is one CSV row after parsing:
//
//   label, display_name, f_0, f_1, ..., f_{4k-1}
//
// The feature values are four equal-length channels laid out
// back to back, so the count must be a multiple of 4.
//
// Reference: Rust Book §5 (Structs and Methods)

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of parallel channels every row carries.
pub const CHANNELS: usize = 4;

/// Largest accepted class label. The classifier head gets one
/// output per label up to the maximum seen, so this bounds its width.
pub const MAX_LABEL: usize = 1023;

/// One parsed dataset row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    /// Integer class label, 0-based
    pub label: usize,

    /// Human readable class name as written on this row
    pub display_name: String,

    /// Channel-major feature values (channel 0 first)
    pub features: Vec<f32>,
}

impl RawSample {
    pub fn new(label: usize, display_name: impl Into<String>, features: Vec<f32>) -> Self {
        Self {
            label,
            display_name: display_name.into(),
            features,
        }
    }

    /// Bars per channel. Only meaningful once the layout has been
    /// validated (feature count divisible by [`CHANNELS`]).
    pub fn bar_count(&self) -> usize {
        self.features.len() / CHANNELS
    }
}

/// Sample count for one class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassSummary {
    pub label: usize,
    pub name:  String,
    pub count: usize,
}

/// Diagnostic overview of a loaded dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub samples:     usize,
    pub num_classes: usize,
    pub bars:        usize,
    pub per_class:   Vec<ClassSummary>,
}

impl fmt::Display for DatasetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Loaded {} samples, {} classes, {} bars per channel",
            self.samples, self.num_classes, self.bars
        )?;
        for class in &self.per_class {
            write!(f, " | {}={} ({})", class.label, class.count, class.name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_count() {
        let s = RawSample::new(1, "up", vec![0.0; 200]);
        assert_eq!(s.bar_count(), 50);
    }

    #[test]
    fn test_summary_display_lists_classes() {
        let summary = DatasetSummary {
            samples:     3,
            num_classes: 2,
            bars:        5,
            per_class:   vec![
                ClassSummary { label: 0, name: "flat".into(), count: 2 },
                ClassSummary { label: 1, name: "impulse".into(), count: 1 },
            ],
        };
        let line = summary.to_string();
        assert!(line.starts_with("Loaded 3 samples, 2 classes"));
        assert!(line.contains("0=2 (flat)"));
        assert!(line.contains("1=1 (impulse)"));
    }
}
