//! Object-graph plumbing on top of lopdf.
//!
//! The engine works directly on [`lopdf::Document`]: the object map is the
//! arena (keyed by `(object number, generation)`), and every inter-object
//! link is an [`Object::Reference`]. This module adds what the passes need
//! around that: loading with the unencrypted-PDF contract, serialization with
//! or without object streams, reference resolution, a recursive reference
//! rewriter, and the reachability walk used by the pruning pass.

use std::collections::{HashMap, HashSet, VecDeque};

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::errors::{Result, SlimError};

/// Hard cap on reference-chain hops. Reference cycles are legal in PDF
/// (outlines, structure trees), so resolution must terminate on its own.
const MAX_REF_DEPTH: usize = 16;

static NULL_OBJECT: Object = Object::Null;

/// Parses a PDF from bytes. Fails with [`SlimError::UnreadableInput`] on
/// malformed structure or when the trailer carries an `Encrypt` entry.
pub fn load_document(bytes: &[u8]) -> Result<Document> {
    let doc = Document::load_mem(bytes)
        .map_err(|e| SlimError::UnreadableInput(format!("failed to load PDF: {e}")))?;
    if doc.trailer.get(b"Encrypt").is_ok() {
        return Err(SlimError::UnreadableInput(
            "encrypted documents are not supported".to_string(),
        ));
    }
    if doc.trailer.get(b"Root").is_err() {
        return Err(SlimError::UnreadableInput("missing Root in trailer".to_string()));
    }
    Ok(doc)
}

/// Serializes the graph back to bytes.
///
/// `use_object_streams` selects the modern layout (compressed object and
/// cross-reference streams); the pipeline turns it off for documents that
/// declared PDF/A-1 conformance, which forbids object streams.
pub fn save_document(doc: &mut Document, use_object_streams: bool) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    {
        let mut writer = std::io::BufWriter::new(&mut bytes);
        let saved = if use_object_streams {
            doc.save_modern(&mut writer)
        } else {
            doc.save_to(&mut writer)
        };
        saved.map_err(|e| SlimError::Write(format!("failed to serialize PDF: {e}")))?;
    }
    Ok(bytes)
}

/// Follows reference chains until a direct object (or the depth cap) is hit.
pub fn resolve<'a>(doc: &'a Document, mut obj: &'a Object) -> &'a Object {
    for _ in 0..MAX_REF_DEPTH {
        match obj {
            Object::Reference(id) => match doc.get_object(*id) {
                Ok(next) => obj = next,
                Err(_) => return &NULL_OBJECT,
            },
            _ => return obj,
        }
    }
    obj
}

/// Fetches `key` from `dict` and resolves it through the graph.
pub fn dict_get<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    dict.get(key).ok().map(|obj| resolve(doc, obj))
}

/// The name bytes of `obj`, if it is a name.
pub fn name_of(obj: &Object) -> Option<&[u8]> {
    match obj {
        Object::Name(n) => Some(n.as_slice()),
        _ => None,
    }
}

pub fn name_is(obj: &Object, expected: &[u8]) -> bool {
    name_of(obj) == Some(expected)
}

/// Numeric coercion across Integer and Real.
pub fn as_number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

pub fn as_integer(obj: &Object) -> Option<i64> {
    match obj {
        Object::Integer(i) => Some(*i),
        Object::Real(r) => Some(*r as i64),
        _ => None,
    }
}

/// Resolves the document catalog dictionary.
pub fn catalog<'a>(doc: &'a Document) -> Option<&'a Dictionary> {
    let root = doc.trailer.get(b"Root").ok()?;
    resolve(doc, root).as_dict().ok()
}

/// The object id behind the trailer's `Root` entry.
pub fn catalog_id(doc: &Document) -> Option<ObjectId> {
    doc.trailer.get(b"Root").ok().and_then(|o| o.as_reference().ok())
}

/// Rewrites every occurrence of a mapped reference, anywhere in the graph
/// (dictionary values, array elements, stream dictionaries, and the trailer).
/// Returns the number of references rewritten.
pub fn rewrite_references(doc: &mut Document, map: &HashMap<ObjectId, ObjectId>) -> usize {
    if map.is_empty() {
        return 0;
    }
    let mut rewritten = 0;
    let ids: Vec<ObjectId> = doc.objects.keys().copied().collect();
    for id in ids {
        if let Some(obj) = doc.objects.get_mut(&id) {
            rewritten += rewrite_in_object(obj, map);
        }
    }
    rewritten += rewrite_in_dictionary(&mut doc.trailer, map);
    rewritten
}

fn rewrite_in_object(obj: &mut Object, map: &HashMap<ObjectId, ObjectId>) -> usize {
    match obj {
        Object::Reference(id) => {
            if let Some(canonical) = map.get(id) {
                *id = *canonical;
                1
            } else {
                0
            }
        }
        Object::Array(items) => items.iter_mut().map(|o| rewrite_in_object(o, map)).sum(),
        Object::Dictionary(dict) => rewrite_in_dictionary(dict, map),
        Object::Stream(stream) => rewrite_in_dictionary(&mut stream.dict, map),
        _ => 0,
    }
}

fn rewrite_in_dictionary(dict: &mut Dictionary, map: &HashMap<ObjectId, ObjectId>) -> usize {
    let keys: Vec<Vec<u8>> = dict.iter().map(|(k, _)| k.clone()).collect();
    let mut rewritten = 0;
    for key in keys {
        if let Ok(value) = dict.get_mut(&key) {
            rewritten += rewrite_in_object(value, map);
        }
    }
    rewritten
}

/// Breadth-first reachability from the trailer roots (`Root`, `Info`,
/// `Encrypt`, `ID`). Traverses dictionary values, array elements, and the
/// dictionaries of streams. Cycle-safe via the visited set.
pub fn reachable_set(doc: &Document) -> HashSet<ObjectId> {
    let mut visited: HashSet<ObjectId> = HashSet::new();
    let mut queue: VecDeque<ObjectId> = VecDeque::new();

    for key in [b"Root".as_slice(), b"Info".as_slice(), b"Encrypt".as_slice(), b"ID".as_slice()] {
        if let Ok(obj) = doc.trailer.get(key) {
            enqueue_references(obj, &mut visited, &mut queue);
        }
    }

    while let Some(id) = queue.pop_front() {
        let Ok(obj) = doc.get_object(id) else { continue };
        match obj {
            Object::Dictionary(dict) => {
                for (_, value) in dict.iter() {
                    enqueue_references(value, &mut visited, &mut queue);
                }
            }
            Object::Array(items) => {
                for value in items {
                    enqueue_references(value, &mut visited, &mut queue);
                }
            }
            Object::Stream(stream) => {
                for (_, value) in stream.dict.iter() {
                    enqueue_references(value, &mut visited, &mut queue);
                }
            }
            _ => {}
        }
    }

    visited
}

fn enqueue_references(obj: &Object, visited: &mut HashSet<ObjectId>, queue: &mut VecDeque<ObjectId>) {
    match obj {
        Object::Reference(id) => {
            if visited.insert(*id) {
                queue.push_back(*id);
            }
        }
        Object::Array(items) => {
            for value in items {
                enqueue_references(value, visited, queue);
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter() {
                enqueue_references(value, visited, queue);
            }
        }
        _ => {}
    }
}

/// Renders an object id the way the inspector and report key their maps.
pub fn ref_tag(id: ObjectId) -> String {
    format!("{} {} R", id.0, id.1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    fn tiny_doc() -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ],
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
        doc
    }

    #[test]
    fn reachability_covers_page_tree() {
        let doc = tiny_doc();
        let reachable = reachable_set(&doc);
        assert_eq!(reachable.len(), 3);
        for id in doc.objects.keys() {
            assert!(reachable.contains(id));
        }
    }

    #[test]
    fn orphan_is_not_reachable() {
        let mut doc = tiny_doc();
        let orphan = doc.add_object(Object::Integer(42));
        let reachable = reachable_set(&doc);
        assert!(!reachable.contains(&orphan));
    }

    #[test]
    fn rewrite_replaces_nested_references() {
        let mut doc = tiny_doc();
        let dup = doc.add_object(Object::Integer(7));
        let canonical = doc.add_object(Object::Integer(7));
        let holder = doc.add_object(dictionary! {
            "Direct" => Object::Reference(dup),
            "Nested" => vec![Object::Reference(dup), Object::Integer(1)],
        });
        let mut map = HashMap::new();
        map.insert(dup, canonical);
        let rewritten = rewrite_references(&mut doc, &map);
        assert_eq!(rewritten, 2);
        let dict = doc.get_dictionary(holder).unwrap();
        assert_eq!(dict.get(b"Direct").unwrap().as_reference().unwrap(), canonical);
    }

    #[test]
    fn load_rejects_encrypted_trailer() {
        let mut doc = tiny_doc();
        let enc = doc.add_object(dictionary! { "Filter" => "Standard" });
        doc.trailer.set("Encrypt", Object::Reference(enc));
        let mut bytes = Vec::new();
        doc.save_to(&mut std::io::BufWriter::new(&mut bytes)).unwrap();
        match load_document(&bytes) {
            Err(SlimError::UnreadableInput(_)) => {}
            other => panic!("expected UnreadableInput, got {other:?}"),
        }
    }

    #[test]
    fn resolve_follows_reference_chain() {
        let mut doc = tiny_doc();
        let target = doc.add_object(Object::Integer(9));
        let hop = doc.add_object(Object::Reference(target));
        let hop_ref = Object::Reference(hop);
        let resolved = resolve(&doc, &hop_ref);
        assert_eq!(as_integer(resolved), Some(9));
    }
}
