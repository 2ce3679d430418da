//! # pdfslim
//!
//! pdfslim is a PDF size-reduction engine. It parses a document's indirect
//! object graph (via [lopdf]) and runs a fixed sequence of rewriting passes
//! that shrink the file while preserving its rendered appearance:
//!
//! 1. re-deflate every decodable non-image stream at the maximum level
//! 2. (lossy, opt-in) recompress Flate-stored images as JPEG, with optional
//!    DPI-capped downsampling
//! 3. unembed the base-14 standard fonts
//! 4. subset embedded fonts to the glyphs in use
//! 5. deduplicate identical streams
//! 6. deduplicate identical embedded font programs
//! 7. strip XMP metadata and producer-private keys (migrating the document
//!    language into the catalog first)
//! 8. remove unreferenced objects
//!
//! Every run returns both the output bytes and a [`SlimReport`] with
//! per-pass counts and before/after inspector snapshots. Two safety guards
//! return the input unchanged rather than a worse or broken file: the
//! integrity check (`content_guard`) and the size guard (`size_guard`).
//! Declared PDF/A documents keep their embedded fonts, their XMP packet,
//! and a classic cross-reference layout.
//!
//! ```no_run
//! use pdfslim::{optimize, SlimOptions};
//!
//! let input = std::fs::read("big.pdf").unwrap();
//! let output = optimize(&input, &SlimOptions::default(), None).unwrap();
//! println!(
//!     "{} -> {} bytes ({}% saved)",
//!     output.report.input_size, output.report.output_size, output.report.saved_percent
//! );
//! std::fs::write("small.pdf", &output.bytes).unwrap();
//! ```
//!
//! The engine is a pure function of `(input, options)`: no I/O, no global
//! state, deterministic output for deterministic codecs. Encrypted inputs
//! fail with [`SlimError::UnreadableInput`].

pub mod cmap;
pub mod conformance;
pub mod content;
pub mod encodings;
pub mod errors;
pub mod filters;
pub mod graph;
pub mod hash;
pub mod inspect;
mod passes;
pub mod pipeline;
pub mod report;
pub mod subsetter;
pub mod unicode;

pub use conformance::PdfTraits;
pub use errors::SlimError;
pub use inspect::{InspectCategory, InspectItem, InspectSnapshot};
pub use pipeline::{optimize, ProgressFn, SlimOptions};
pub use report::{PassRecord, SlimOutput, SlimReport};

/// Classifies a document's objects without optimizing it.
pub fn inspect_bytes(input: &[u8]) -> Result<InspectSnapshot, SlimError> {
    let doc = graph::load_document(input)?;
    Ok(inspect::snapshot(&doc))
}

/// Probes accessibility and conformance traits without optimizing.
pub fn detect_traits(input: &[u8]) -> Result<PdfTraits, SlimError> {
    let doc = graph::load_document(input)?;
    Ok(conformance::detect_traits(&doc))
}
