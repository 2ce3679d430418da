//! Standard-font unembedding: a Type1 font whose BaseFont names one of the
//! base-14 faces renders identically from the viewer's built-in copy, so the
//! embedded program and its descriptor can go. Never applied to documents
//! that declared PDF/A, where embedding is the point.

use lopdf::{Object, ObjectId};
use serde_json::Value;

use super::{counts, Counts, PassCtx};
use crate::encodings::{is_standard_font_name, strip_subset_prefix};
use crate::errors::Result;
use crate::graph::{dict_get, name_is, name_of};

pub(crate) fn run(ctx: &mut PassCtx<'_>) -> Result<Counts> {
    if !ctx.options.unembed_standard_fonts {
        return Ok(counts(&[("unembedded", 0), ("skipped", 0)]));
    }
    if ctx.traits.is_pdf_a {
        let mut record = counts(&[("unembedded", 0), ("skipped", 0)]);
        record.insert("pdfa_skipped".to_string(), Value::Bool(true));
        return Ok(record);
    }

    let mut unembedded = 0i64;
    let mut skipped = 0i64;
    let ids: Vec<ObjectId> = ctx.doc.objects.keys().copied().collect();

    for id in ids {
        let canonical = {
            let Some(Object::Dictionary(dict)) = ctx.doc.objects.get(&id) else {
                continue;
            };
            let is_type1_font = dict_get(ctx.doc, dict, b"Type")
                .map(|t| name_is(t, b"Font"))
                .unwrap_or(false)
                && dict_get(ctx.doc, dict, b"Subtype")
                    .map(|s| name_is(s, b"Type1"))
                    .unwrap_or(false);
            if !is_type1_font {
                continue;
            }
            let Some(base) = dict_get(ctx.doc, dict, b"BaseFont").and_then(name_of) else {
                skipped += 1;
                continue;
            };
            let base = String::from_utf8_lossy(base).into_owned();
            let stripped = strip_subset_prefix(&base);
            if is_standard_font_name(stripped) {
                Some(stripped.to_string())
            } else {
                skipped += 1;
                continue;
            }
        };

        if let Some(name) = canonical {
            let Some(Object::Dictionary(dict)) = ctx.doc.objects.get_mut(&id) else {
                continue;
            };
            dict.set("BaseFont", Object::Name(name.into_bytes()));
            dict.remove(b"FontDescriptor");
            dict.set("Encoding", "WinAnsiEncoding");
            // ToUnicode, Widths, FirstChar, LastChar stay untouched.
            unembedded += 1;
            log::debug!("unembedded standard font {id:?}");
        }
    }

    Ok(counts(&[("unembedded", unembedded), ("skipped", skipped)]))
}
