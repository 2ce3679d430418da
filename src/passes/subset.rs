//! Font subsetting: shrink each eligible embedded font program to the
//! glyphs the document actually shows.
//!
//! Eligibility is deliberately strict. Composite fonts must be Identity-H
//! (any other CMap would need a code-space remap the engine does not do),
//! already-subsetted simple fonts are excluded (their code space is
//! renumbered against a parent face we no longer have), and small programs
//! are not worth the risk. Every guard failure is a skip, not an error.

use std::collections::BTreeSet;

use lopdf::{Document, Object, ObjectId};

use super::{counts, Counts, PassCtx};
use crate::content::collect_font_usage;
use crate::encodings::has_subset_prefix;
use crate::errors::Result;
use crate::filters::{decode_stream, deflate_max};
use crate::graph::{dict_get, name_of};
use crate::subsetter::{has_cmap_table, subset_font, SubsetInput};
use crate::unicode::{
    base_font_name, descriptor_dict, font_file_ref, is_identity_h, simple_font_codepoints,
    type0_cids, type0_codepoints,
};

/// Font programs below this size are left alone.
const MIN_PROGRAM_BYTES: usize = 10 * 1024;

struct Replacement {
    program_id: ObjectId,
    key: &'static [u8],
    packed: Vec<u8>,
    subset_len: usize,
}

pub(crate) fn run(ctx: &mut PassCtx<'_>) -> Result<Counts> {
    if !ctx.options.subset_fonts {
        return Ok(counts(&[("subsetted", 0), ("skipped", 0)]));
    }

    let usage = collect_font_usage(ctx.doc);
    let mut font_ids: Vec<ObjectId> = usage.keys().copied().collect();
    font_ids.sort_unstable();

    let mut subsetted = 0i64;
    let mut skipped = 0i64;

    for font_id in font_ids {
        let strings = &usage[&font_id];
        match plan(ctx.doc, font_id, strings) {
            Some(replacement) => {
                let Some(Object::Stream(stream)) = ctx.doc.objects.get_mut(&replacement.program_id)
                else {
                    continue;
                };
                stream.dict.set("Filter", "FlateDecode");
                stream.dict.remove(b"DecodeParms");
                stream.dict.remove(b"DP");
                if replacement.key != b"FontFile3" {
                    stream.dict.set("Length1", replacement.subset_len as i64);
                }
                stream.set_content(replacement.packed);
                subsetted += 1;
                log::debug!("subsetted font {font_id:?}");
            }
            None => skipped += 1,
        }
    }

    Ok(counts(&[("subsetted", subsetted), ("skipped", skipped)]))
}

fn plan(doc: &Document, font_id: ObjectId, strings: &[Vec<u8>]) -> Option<Replacement> {
    if strings.is_empty() {
        return None;
    }
    let font = doc.get_dictionary(font_id).ok()?;

    let subtype = dict_get(doc, font, b"Subtype").and_then(name_of)?;
    let is_type0 = match subtype {
        b"Type0" => true,
        b"Type1" | b"TrueType" => false,
        _ => return None,
    };

    if is_type0 {
        if !is_identity_h(doc, font) {
            return None;
        }
    } else if base_font_name(doc, font).map(|n| has_subset_prefix(&n)).unwrap_or(false) {
        // Already a subset of a face we cannot see; re-subsetting by Unicode
        // would drop glyphs.
        return None;
    }

    let descriptor = descriptor_dict(doc, font)?;
    let (key, program_id) = font_file_ref(descriptor)?;
    let Ok(Object::Stream(program)) = doc.get_object(program_id) else {
        return None;
    };
    let decoded = decode_stream(doc, program).ok()?;
    if decoded.len() < MIN_PROGRAM_BYTES {
        return None;
    }

    let input = if is_type0 && !has_cmap_table(&decoded) {
        // No cmap to map Unicode through: the CIDs are the glyph ids.
        SubsetInput::GlyphIds(type0_cids(strings))
    } else if is_type0 {
        let cids = type0_cids(strings);
        let codepoints = type0_codepoints(doc, font, &cids);
        if codepoints.is_empty() {
            return None;
        }
        SubsetInput::Unicode(codepoints)
    } else {
        let codepoints: BTreeSet<u32> = simple_font_codepoints(doc, font, strings);
        if codepoints.is_empty() {
            return None;
        }
        SubsetInput::Unicode(codepoints)
    };
    if input.is_empty() {
        return None;
    }

    let subset = match subset_font(&decoded, &input, is_type0) {
        Ok(bytes) => bytes,
        Err(e) => {
            log::debug!("subsetter rejected font {font_id:?}: {e}");
            return None;
        }
    };
    if subset.is_empty() || subset.len() >= decoded.len() {
        return None;
    }

    let packed = deflate_max(&subset).ok()?;
    Some(Replacement {
        program_id,
        key,
        packed,
        subset_len: subset.len(),
    })
}
