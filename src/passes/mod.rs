//! The eight rewriting passes, in their fixed pipeline order.
//!
//! Every pass mutates the object graph in place and returns a named count
//! record. A pass must leave the graph consistent on every exit path:
//! references resolve, stream Lengths match payloads. Per-object problems
//! (undecodable filter, subsetter rejection, encoder regression) are skips,
//! never errors.

pub mod dedup;
pub mod images;
pub mod metadata;
pub mod prune;
pub mod recompress;
pub mod subset;
pub mod unembed;

use lopdf::Document;
use serde_json::{Map, Value};

use crate::conformance::PdfTraits;
use crate::errors::Result;
use crate::pipeline::SlimOptions;

pub(crate) struct PassCtx<'a> {
    pub doc: &'a mut Document,
    pub traits: &'a PdfTraits,
    pub options: &'a SlimOptions,
}

pub(crate) type Counts = Map<String, Value>;

pub(crate) type PassFn = fn(&mut PassCtx<'_>) -> Result<Counts>;

/// Fixed pass order; also the order of `report.passes`.
pub(crate) const PASS_TABLE: &[(&str, PassFn)] = &[
    ("recompress-streams", recompress::run),
    ("recompress-images", images::run),
    ("unembed-standard-fonts", unembed::run),
    ("subset-fonts", subset::run),
    ("deduplicate-objects", dedup::run_objects),
    ("deduplicate-fonts", dedup::run_font_files),
    ("strip-metadata", metadata::run),
    ("remove-unreferenced", prune::run),
];

pub(crate) fn counts(pairs: &[(&str, i64)]) -> Counts {
    let mut map = Counts::new();
    for (key, value) in pairs {
        map.insert((*key).to_string(), Value::from(*value));
    }
    map
}
