//! Per-font text usage collection.
//!
//! Walks every page's content stream (and, through `Do`, every Form XObject
//! it draws) tracking the current font set by `Tf`, and records the raw byte
//! sequences shown by `Tj`, `'`, `"` and `TJ`. The bytes are intentionally
//! left unmapped: one byte per glyph for simple fonts, two big-endian bytes
//! per glyph for Identity-H composite fonts. The Unicode mapper interprets
//! them later.

use std::collections::{HashMap, HashSet};

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::filters::decode_stream;
use crate::graph::{dict_get, name_is, resolve};

/// Raw byte sequences consumed per font object.
pub type FontUsage = HashMap<ObjectId, Vec<Vec<u8>>>;

const MAX_PARENT_HOPS: usize = 32;
const MAX_FORM_DEPTH: usize = 16;

/// Collects the usage map for the whole document.
pub fn collect_font_usage(doc: &Document) -> FontUsage {
    let mut collector = UsageCollector {
        doc,
        usage: FontUsage::new(),
        active_forms: HashSet::new(),
    };

    for (_, page_id) in doc.get_pages() {
        let Ok(page) = doc.get_dictionary(page_id) else { continue };
        let resources = page_resources(doc, page);
        let Some(content) = page_content_bytes(doc, page) else { continue };
        collector.walk(&content, resources, 0);
    }

    collector.usage
}

/// Resolves a page's Resources, following the Parent chain for inherited
/// entries.
pub fn page_resources<'a>(doc: &'a Document, page: &'a Dictionary) -> Option<&'a Dictionary> {
    let mut dict = page;
    for _ in 0..MAX_PARENT_HOPS {
        if let Some(res) = dict_get(doc, dict, b"Resources") {
            return res.as_dict().ok();
        }
        match dict_get(doc, dict, b"Parent") {
            Some(parent) => dict = parent.as_dict().ok()?,
            None => return None,
        }
    }
    None
}

/// Concatenates and decodes a page's Contents streams. `None` when nothing
/// decodable is attached to the page.
pub fn page_content_bytes(doc: &Document, page: &Dictionary) -> Option<Vec<u8>> {
    let contents = page.get(b"Contents").ok()?;
    let mut bytes = Vec::new();
    let mut append = |obj: &Object| {
        if let Object::Stream(stream) = resolve(doc, obj) {
            if let Ok(decoded) = decode_stream(doc, stream) {
                bytes.extend_from_slice(&decoded);
                bytes.push(b'\n');
            }
        }
    };
    match resolve(doc, contents) {
        Object::Array(items) => {
            for item in items {
                append(item);
            }
        }
        other => append(other),
    }
    if bytes.is_empty() {
        None
    } else {
        Some(bytes)
    }
}

struct UsageCollector<'a> {
    doc: &'a Document,
    usage: FontUsage,
    /// Forms on the current recursion path; breaks `Do` cycles.
    active_forms: HashSet<ObjectId>,
}

impl<'a> UsageCollector<'a> {
    fn walk(&mut self, content: &[u8], resources: Option<&'a Dictionary>, depth: usize) {
        let Ok(parsed) = Content::decode(content) else {
            log::debug!("skipping unparseable content stream");
            return;
        };

        let mut current_font: Option<ObjectId> = None;
        for op in &parsed.operations {
            match op.operator.as_str() {
                "Tf" => {
                    current_font = op
                        .operands
                        .first()
                        .and_then(crate::graph::name_of)
                        .and_then(|name| self.font_reference(resources, name));
                }
                "Tj" | "'" => {
                    if let Some(Object::String(bytes, _)) = op.operands.first() {
                        self.record(current_font, bytes);
                    }
                }
                "\"" => {
                    if let Some(Object::String(bytes, _)) = op.operands.get(2) {
                        self.record(current_font, bytes);
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = op.operands.first() {
                        for item in items {
                            if let Object::String(bytes, _) = item {
                                self.record(current_font, bytes);
                            }
                        }
                    }
                }
                "Do" => {
                    if depth < MAX_FORM_DEPTH {
                        if let Some(name) = op.operands.first().and_then(crate::graph::name_of) {
                            self.enter_form(resources, name, depth);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn record(&mut self, font: Option<ObjectId>, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        if let Some(id) = font {
            self.usage.entry(id).or_default().push(bytes.to_vec());
        }
    }

    fn font_reference(&self, resources: Option<&Dictionary>, name: &[u8]) -> Option<ObjectId> {
        let fonts = dict_get(self.doc, resources?, b"Font")?.as_dict().ok()?;
        match fonts.get(name).ok()? {
            Object::Reference(id) => Some(*id),
            _ => None,
        }
    }

    fn enter_form(&mut self, resources: Option<&'a Dictionary>, name: &[u8], depth: usize) {
        let Some(outer) = resources else { return };
        let Some(xobjects) = dict_get(self.doc, outer, b"XObject").and_then(|o| o.as_dict().ok())
        else {
            return;
        };
        let Ok(Object::Reference(form_id)) = xobjects.get(name) else { return };
        let Ok(Object::Stream(stream)) = self.doc.get_object(*form_id) else { return };
        if !stream
            .dict
            .get(b"Subtype")
            .map(|s| name_is(s, b"Form"))
            .unwrap_or(false)
        {
            return;
        }
        if !self.active_forms.insert(*form_id) {
            return;
        }
        let form_resources = dict_get(self.doc, &stream.dict, b"Resources")
            .and_then(|o| o.as_dict().ok())
            .or(resources);
        if let Ok(content) = decode_stream(self.doc, stream) {
            self.walk(&content, form_resources, depth + 1);
        }
        self.active_forms.remove(form_id);
    }
}
