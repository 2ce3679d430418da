//! The pipeline orchestrator: load, probe, snapshot, run the eight passes in
//! order, snapshot again, check integrity, serialize, and guard the result.
//!
//! Two guards protect the caller from a bad trade. The integrity check walks
//! every page's Contents references; a single dangling one discards the whole
//! optimization and returns the input bytes with `content_guard`. The size
//! guard does the same when the serialized output failed to get smaller.

use std::time::Instant;

use lopdf::{Document, Object, ObjectId};
use serde_derive::{Deserialize, Serialize};

use crate::conformance::detect_traits;
use crate::errors::Result;
use crate::graph::{load_document, ref_tag, save_document};
use crate::inspect;
use crate::passes::{PassCtx, PASS_TABLE};
use crate::report::{saved_percent, InspectPair, PassRecord, SlimOutput, SlimReport};

/// Engine options. Each pass reads only the fields it understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlimOptions {
    /// Gate the lossy image-recompression pass on.
    pub lossy: bool,
    /// JPEG quality in (0, 1] when lossy.
    pub image_quality: f32,
    /// Downsample images above this effective DPI when lossy.
    pub max_image_dpi: Option<u32>,
    /// Drop embedded programs of base-14 Type1 fonts.
    pub unembed_standard_fonts: bool,
    /// Subset eligible embedded fonts to the glyphs in use.
    pub subset_fonts: bool,
}

impl Default for SlimOptions {
    fn default() -> Self {
        SlimOptions {
            lossy: false,
            image_quality: 0.85,
            max_image_dpi: None,
            unembed_standard_fonts: true,
            subset_fonts: true,
        }
    }
}

/// Called at pass boundaries: `(i + 0.5) / N` before pass `i`, `(i + 1) / N`
/// after it, with the pass label.
pub type ProgressFn<'a> = &'a mut dyn FnMut(f32, &str);

/// Runs the full optimization pipeline over a PDF byte sequence.
///
/// Returns the (possibly unchanged) output bytes and the report. The only
/// fatal failures are an unreadable input and a serialization error; every
/// pass failure is captured in its report entry and the pipeline continues.
pub fn optimize(
    input: &[u8],
    options: &SlimOptions,
    mut progress: Option<ProgressFn<'_>>,
) -> Result<SlimOutput> {
    let mut doc = load_document(input)?;
    let traits = detect_traits(&doc);
    let before = inspect::snapshot(&doc);

    let total = PASS_TABLE.len() as f32;
    let mut passes = Vec::with_capacity(PASS_TABLE.len());
    for (index, &(name, pass)) in PASS_TABLE.iter().enumerate() {
        if let Some(cb) = progress.as_deref_mut() {
            cb((index as f32 + 0.5) / total, name);
        }
        let start = Instant::now();
        let result = {
            let mut ctx = PassCtx {
                doc: &mut doc,
                traits: &traits,
                options,
            };
            pass(&mut ctx)
        };
        let ms = start.elapsed().as_secs_f64() * 1000.0;
        let record = match result {
            Ok(counts) => PassRecord {
                name: name.to_string(),
                ms,
                error: None,
                counts,
            },
            Err(e) => {
                log::warn!("pass {name} failed: {e}");
                PassRecord {
                    name: name.to_string(),
                    ms,
                    error: Some(e.to_string()),
                    counts: Default::default(),
                }
            }
        };
        passes.push(record);
        if let Some(cb) = progress.as_deref_mut() {
            cb((index as f32 + 1.0) / total, name);
        }
    }

    let after = inspect::snapshot(&doc);
    let input_size = input.len() as u64;
    let mut report = SlimReport {
        input_size,
        output_size: input_size,
        saved_bytes: 0,
        saved_percent: 0.0,
        pdf_traits: traits.clone(),
        passes,
        inspect: InspectPair { before, after },
        size_guard: false,
        content_guard: false,
        content_warnings: Vec::new(),
    };

    let warnings = integrity_warnings(&doc);
    if !warnings.is_empty() {
        for warning in &warnings {
            log::warn!("integrity check: {warning}");
        }
        report.content_guard = true;
        report.content_warnings = warnings;
        return Ok(SlimOutput {
            bytes: input.to_vec(),
            report,
        });
    }

    let use_object_streams = !traits.forbids_object_streams();
    let bytes = save_document(&mut doc, use_object_streams)?;

    if bytes.len() >= input.len() {
        report.size_guard = true;
        return Ok(SlimOutput {
            bytes: input.to_vec(),
            report,
        });
    }

    report.output_size = bytes.len() as u64;
    report.saved_bytes = input_size - report.output_size;
    report.saved_percent = saved_percent(input_size, report.output_size);
    Ok(SlimOutput { bytes, report })
}

/// Every page's Contents reference must still resolve after the passes.
fn integrity_warnings(doc: &Document) -> Vec<String> {
    let mut warnings = Vec::new();
    for (page_number, page_id) in doc.get_pages() {
        let Ok(page) = doc.get_dictionary(page_id) else {
            warnings.push(format!("page {page_number}: page dictionary missing"));
            continue;
        };
        let Ok(contents) = page.get(b"Contents") else {
            continue;
        };
        let mut check = |id: ObjectId| {
            if !doc.objects.contains_key(&id) {
                warnings.push(format!(
                    "page {page_number}: Contents {} does not resolve",
                    ref_tag(id)
                ));
            }
        };
        match contents {
            Object::Reference(id) => check(*id),
            Object::Array(items) => {
                for item in items {
                    if let Object::Reference(id) = item {
                        check(*id);
                    }
                }
            }
            _ => {}
        }
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Stream};

    fn minimal_pdf() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let content_id = doc.add_object(Object::Stream(Stream::new(
            dictionary! {},
            b"BT ET".to_vec(),
        )));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ],
            "Contents" => Object::Reference(content_id),
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Count" => 1,
                "Kids" => vec![Object::Reference(page_id)],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));
        let mut bytes = Vec::new();
        doc.save_to(&mut std::io::BufWriter::new(&mut bytes)).unwrap();
        bytes
    }

    #[test]
    fn tiny_input_hits_a_guard() {
        let input = minimal_pdf();
        let output = optimize(&input, &SlimOptions::default(), None).unwrap();
        assert!(output.bytes.len() <= input.len());
        if output.bytes == input {
            assert!(output.report.size_guard || output.report.content_guard);
        }
    }

    #[test]
    fn every_pass_appears_in_order() {
        let input = minimal_pdf();
        let output = optimize(&input, &SlimOptions::default(), None).unwrap();
        let names: Vec<&str> = output.report.passes.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "recompress-streams",
                "recompress-images",
                "unembed-standard-fonts",
                "subset-fonts",
                "deduplicate-objects",
                "deduplicate-fonts",
                "strip-metadata",
                "remove-unreferenced",
            ]
        );
        for pass in &output.report.passes {
            assert!(pass.ms >= 0.0);
            assert!(pass.error.is_none());
        }
    }

    #[test]
    fn progress_reports_half_steps_then_full() {
        let input = minimal_pdf();
        let mut fractions: Vec<f32> = Vec::new();
        let mut cb = |fraction: f32, _label: &str| fractions.push(fraction);
        optimize(&input, &SlimOptions::default(), Some(&mut cb)).unwrap();
        assert_eq!(fractions.len(), 16);
        let n = 8.0f32;
        assert!((fractions[0] - 0.5 / n).abs() < 1e-6);
        assert!((fractions[1] - 1.0 / n).abs() < 1e-6);
        assert!((fractions[15] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn unreadable_input_is_fatal() {
        let err = optimize(b"not a pdf", &SlimOptions::default(), None);
        assert!(matches!(err, Err(crate::errors::SlimError::UnreadableInput(_))));
    }

    #[test]
    fn options_default_match_the_contract() {
        let options = SlimOptions::default();
        assert!(!options.lossy);
        assert!((options.image_quality - 0.85).abs() < f32::EPSILON);
        assert_eq!(options.max_image_dpi, None);
        assert!(options.unembed_standard_fonts);
        assert!(options.subset_fonts);
    }
}
