//! The optimization report returned next to the output bytes.

use serde_derive::Serialize;
use serde_json::{Map, Value};

use crate::conformance::PdfTraits;
use crate::inspect::InspectSnapshot;

/// One pass's entry: its fixed name, wall time, and either the named counts
/// it produced or the error message it failed with.
#[derive(Debug, Clone, Serialize)]
pub struct PassRecord {
    pub name: String,
    pub ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub counts: Map<String, Value>,
}

impl PassRecord {
    pub fn count(&self, key: &str) -> i64 {
        self.counts.get(key).and_then(Value::as_i64).unwrap_or(0)
    }

    pub fn flag(&self, key: &str) -> bool {
        self.counts.get(key).and_then(Value::as_bool).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InspectPair {
    pub before: InspectSnapshot,
    pub after: InspectSnapshot,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlimReport {
    pub input_size: u64,
    pub output_size: u64,
    pub saved_bytes: u64,
    /// Rounded to one decimal.
    pub saved_percent: f64,
    pub pdf_traits: PdfTraits,
    pub passes: Vec<PassRecord>,
    pub inspect: InspectPair,
    /// The optimized result was not smaller; the input bytes were returned.
    #[serde(skip_serializing_if = "is_false")]
    pub size_guard: bool,
    /// The integrity check failed; the input bytes were returned.
    #[serde(skip_serializing_if = "is_false")]
    pub content_guard: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub content_warnings: Vec<String>,
}

impl SlimReport {
    pub fn pass(&self, name: &str) -> Option<&PassRecord> {
        self.passes.iter().find(|p| p.name == name)
    }
}

/// Result of a successful [`crate::optimize`] run.
#[derive(Debug, Clone)]
pub struct SlimOutput {
    pub bytes: Vec<u8>,
    pub report: SlimReport,
}

fn is_false(value: &bool) -> bool {
    !*value
}

pub(crate) fn saved_percent(input_size: u64, output_size: u64) -> f64 {
    if input_size == 0 {
        return 0.0;
    }
    let saved = input_size.saturating_sub(output_size) as f64;
    (saved * 1000.0 / input_size as f64).round() / 10.0
}
