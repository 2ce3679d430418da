//! Deduplication passes: elect one canonical object per content digest,
//! rewrite every reference to point at it, delete the duplicates.
//!
//! The general pass hashes every stream over its dictionary (minus Length)
//! plus payload. The font-file pass hashes FontFile* payloads only, so the
//! same program embedded under descriptors with differing bookkeeping keys
//! still collapses.

use std::collections::HashMap;

use lopdf::{Object, ObjectId};

use super::{counts, Counts, PassCtx};
use crate::errors::Result;
use crate::graph::{dict_get, name_is, rewrite_references};
use crate::hash::{content_hash, stream_hash};
use crate::unicode::FONT_FILE_KEYS;

pub(crate) fn run_objects(ctx: &mut PassCtx<'_>) -> Result<Counts> {
    let mut canonical: HashMap<String, ObjectId> = HashMap::new();
    let mut duplicates: HashMap<ObjectId, ObjectId> = HashMap::new();

    // BTreeMap order makes "first seen" deterministic.
    for (&id, obj) in &ctx.doc.objects {
        let Object::Stream(stream) = obj else { continue };
        let digest = stream_hash(&stream.dict, &stream.content);
        match canonical.get(&digest) {
            Some(&keep) => {
                duplicates.insert(id, keep);
            }
            None => {
                canonical.insert(digest, id);
            }
        }
    }

    let rewritten = rewrite_references(ctx.doc, &duplicates);
    for id in duplicates.keys() {
        ctx.doc.objects.remove(id);
    }

    Ok(counts(&[
        ("deduplicated", duplicates.len() as i64),
        ("rewritten", rewritten as i64),
    ]))
}

pub(crate) fn run_font_files(ctx: &mut PassCtx<'_>) -> Result<Counts> {
    let mut canonical: HashMap<String, ObjectId> = HashMap::new();
    let mut duplicates: HashMap<ObjectId, ObjectId> = HashMap::new();
    let mut descriptor_fixes: Vec<(ObjectId, &'static [u8], ObjectId)> = Vec::new();

    for (&desc_id, obj) in &ctx.doc.objects {
        let dict = match obj {
            Object::Dictionary(d) => d,
            Object::Stream(s) => &s.dict,
            _ => continue,
        };
        if !dict_get(ctx.doc, dict, b"Type")
            .map(|t| name_is(t, b"FontDescriptor"))
            .unwrap_or(false)
        {
            continue;
        }
        for key in FONT_FILE_KEYS {
            let Ok(Object::Reference(target)) = dict.get(key) else { continue };
            let Ok(Object::Stream(stream)) = ctx.doc.get_object(*target) else { continue };
            let digest = content_hash(&stream.content);
            match canonical.get(&digest) {
                Some(&keep) if keep != *target => {
                    duplicates.insert(*target, keep);
                    descriptor_fixes.push((desc_id, key, keep));
                }
                Some(_) => {}
                None => {
                    canonical.insert(digest, *target);
                }
            }
        }
    }

    for (desc_id, key, keep) in descriptor_fixes {
        let dict = match ctx.doc.objects.get_mut(&desc_id) {
            Some(Object::Dictionary(d)) => d,
            Some(Object::Stream(s)) => &mut s.dict,
            _ => continue,
        };
        dict.set(key, Object::Reference(keep));
    }

    // Catch references outside descriptors too (rare, but cheap to cover
    // with the same walk the general pass uses).
    let rewritten = rewrite_references(ctx.doc, &duplicates);
    for id in duplicates.keys() {
        ctx.doc.objects.remove(id);
    }

    Ok(counts(&[
        ("deduplicated", duplicates.len() as i64),
        ("rewritten", rewritten as i64),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conformance::PdfTraits;
    use crate::pipeline::SlimOptions;
    use lopdf::{dictionary, Document, Stream};

    fn run_pass(doc: &mut Document, pass: super::super::PassFn) -> Counts {
        let traits = PdfTraits::default();
        let options = SlimOptions::default();
        let mut ctx = PassCtx { doc, traits: &traits, options: &options };
        pass(&mut ctx).unwrap()
    }

    #[test]
    fn identical_streams_collapse_to_one() {
        let mut doc = Document::with_version("1.5");
        let make = || Object::Stream(Stream::new(dictionary! {}, b"shared payload".to_vec()));
        let first = doc.add_object(make());
        let second = doc.add_object(make());
        let third = doc.add_object(make());
        let holder = doc.add_object(dictionary! {
            "A" => Object::Reference(second),
            "B" => Object::Reference(third),
        });

        let record = run_pass(&mut doc, run_objects);
        assert_eq!(record["deduplicated"], 2);

        let dict = doc.get_dictionary(holder).unwrap();
        assert_eq!(dict.get(b"A").unwrap().as_reference().unwrap(), first);
        assert_eq!(dict.get(b"B").unwrap().as_reference().unwrap(), first);
        assert!(doc.get_object(second).is_err());
        assert!(doc.get_object(third).is_err());
    }

    #[test]
    fn differing_dictionaries_keep_streams_apart() {
        let mut doc = Document::with_version("1.5");
        doc.add_object(Object::Stream(Stream::new(
            dictionary! { "Subtype" => "Form" },
            b"same".to_vec(),
        )));
        doc.add_object(Object::Stream(Stream::new(
            dictionary! { "Subtype" => "Image" },
            b"same".to_vec(),
        )));
        let record = run_pass(&mut doc, run_objects);
        assert_eq!(record["deduplicated"], 0);
    }

    #[test]
    fn dedup_twice_finds_nothing_the_second_time() {
        let mut doc = Document::with_version("1.5");
        let make = || Object::Stream(Stream::new(dictionary! {}, b"payload".to_vec()));
        doc.add_object(make());
        doc.add_object(make());

        let first = run_pass(&mut doc, run_objects);
        assert_eq!(first["deduplicated"], 1);
        let second = run_pass(&mut doc, run_objects);
        assert_eq!(second["deduplicated"], 0);
    }

    #[test]
    fn font_files_dedup_on_payload_despite_dict_noise() {
        let mut doc = Document::with_version("1.5");
        let program = vec![7u8; 512];
        let file_a = doc.add_object(Object::Stream(Stream::new(
            dictionary! { "Length1" => 512 },
            program.clone(),
        )));
        // Same program bytes, different bookkeeping.
        let file_b = doc.add_object(Object::Stream(Stream::new(
            dictionary! { "Length1" => 512, "Comment" => "copy" },
            program,
        )));
        let desc_a = doc.add_object(dictionary! {
            "Type" => "FontDescriptor",
            "FontFile2" => Object::Reference(file_a),
        });
        let desc_b = doc.add_object(dictionary! {
            "Type" => "FontDescriptor",
            "FontFile2" => Object::Reference(file_b),
        });

        let record = run_pass(&mut doc, run_font_files);
        assert_eq!(record["deduplicated"], 1);
        assert!(doc.get_object(file_b).is_err());
        for desc in [desc_a, desc_b] {
            let dict = doc.get_dictionary(desc).unwrap();
            assert_eq!(dict.get(b"FontFile2").unwrap().as_reference().unwrap(), file_a);
        }
    }

    #[test]
    fn shared_font_file_is_not_a_duplicate() {
        let mut doc = Document::with_version("1.5");
        let file = doc.add_object(Object::Stream(Stream::new(dictionary! {}, vec![1u8; 64])));
        for _ in 0..2 {
            doc.add_object(dictionary! {
                "Type" => "FontDescriptor",
                "FontFile" => Object::Reference(file),
            });
        }
        let record = run_pass(&mut doc, run_font_files);
        assert_eq!(record["deduplicated"], 0);
        assert!(doc.get_object(file).is_ok());
    }
}
