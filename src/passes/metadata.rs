//! Metadata stripping: drop the XMP packet and a fixed set of
//! producer-private keys, after rescuing the document language into the
//! catalog. The /Info dictionary stays: it is the user-visible metadata.
//!
//! Declared PDF/A documents keep their XMP (the packet carries the
//! conformance claim itself) and only lose the private keys.

use lopdf::{Object, ObjectId, StringFormat};
use serde_json::Value;

use super::{counts, Counts, PassCtx};
use crate::conformance::{xmp_bytes, xmp_language};
use crate::errors::Result;
use crate::graph::{catalog, catalog_id};

/// Producer-private keys swept from every dictionary in the graph.
const PRIVATE_KEYS: [&[u8]; 9] = [
    b"PieceInfo",
    b"Thumb",
    b"AIPrivateData1",
    b"AIPrivateData2",
    b"AIPrivateData3",
    b"AIPrivateData4",
    b"AIMetaData",
    b"Photoshop",
    b"IRB",
];

pub(crate) fn run(ctx: &mut PassCtx<'_>) -> Result<Counts> {
    let mut metadata_removed = 0i64;
    let mut keys_removed = 0i64;
    let mut lang_migrated = false;

    if ctx.traits.is_pdf_a {
        // The XMP packet carries the PDF/A declaration; removing it would
        // strip the conformance claim the engine promised to preserve.
    } else {
        migrate_language(ctx, &mut lang_migrated);
        metadata_removed = remove_catalog_metadata(ctx);
    }

    let ids: Vec<ObjectId> = ctx.doc.objects.keys().copied().collect();
    for id in ids {
        let dict = match ctx.doc.objects.get_mut(&id) {
            Some(Object::Dictionary(d)) => d,
            Some(Object::Stream(s)) => &mut s.dict,
            _ => continue,
        };
        for key in PRIVATE_KEYS {
            if dict.remove(key).is_some() {
                keys_removed += 1;
            }
        }
    }

    let mut record = counts(&[
        ("metadata_removed", metadata_removed),
        ("keys_removed", keys_removed),
    ]);
    record.insert("lang_migrated".to_string(), Value::Bool(lang_migrated));
    if ctx.traits.is_pdf_a {
        record.insert("pdfa_skipped".to_string(), Value::Bool(true));
    }
    Ok(record)
}

/// If the catalog has no Lang and the XMP packet declares one, copy it over
/// before the packet is deleted.
fn migrate_language(ctx: &mut PassCtx<'_>, migrated: &mut bool) {
    let has_lang = catalog(ctx.doc).map(|c| c.get(b"Lang").is_ok()).unwrap_or(true);
    if has_lang {
        return;
    }
    let Some(xmp) = xmp_bytes(ctx.doc) else { return };
    let Some(lang) = xmp_language(&String::from_utf8_lossy(&xmp)) else { return };
    let Some(root_id) = catalog_id(ctx.doc) else { return };
    if let Ok(root) = ctx.doc.get_dictionary_mut(root_id) {
        root.set("Lang", Object::String(lang.into_bytes(), StringFormat::Literal));
        *migrated = true;
    }
}

fn remove_catalog_metadata(ctx: &mut PassCtx<'_>) -> i64 {
    let Some(root_id) = catalog_id(ctx.doc) else { return 0 };
    let metadata_ref = {
        let Ok(root) = ctx.doc.get_dictionary_mut(root_id) else { return 0 };
        match root.remove(b"Metadata") {
            Some(Object::Reference(id)) => Some(id),
            Some(_) => None,
            None => return 0,
        }
    };
    if let Some(id) = metadata_ref {
        ctx.doc.objects.remove(&id);
    }
    1
}
