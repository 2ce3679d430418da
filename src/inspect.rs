//! The object inspector: classifies every indirect object into one of six
//! categories and records display metadata, producing the serializable
//! snapshot the report embeds before and after the pass sequence.
//!
//! The snapshot only reads the graph. Classification is independent of the
//! physical file layout; it looks at object shapes and at three pre-scanned
//! relations (content stream → page, image XObjects, FontFile targets).

use std::collections::{HashMap, HashSet};

use lopdf::{Dictionary, Document, Object, ObjectId};
use serde_derive::{Deserialize, Serialize};

use crate::filters::filter_display_names;
use crate::graph::{as_integer, dict_get, name_is, name_of, ref_tag};
use crate::unicode::FONT_FILE_KEYS;

pub const CATEGORY_NAMES: [&str; 6] = [
    "Fonts",
    "Images",
    "Page Content",
    "Metadata",
    "Document Structure",
    "Other Data",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectItem {
    /// `"12 0 R"` style reference tag.
    pub reference: String,
    /// Stream payload bytes; zero for non-streams.
    pub size: u64,
    /// Filter chain names, outermost first.
    pub filters: Vec<String>,
    /// Human-readable description.
    pub display: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectCategory {
    pub name: String,
    pub total_size: u64,
    pub items: Vec<InspectItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectSnapshot {
    pub object_count: usize,
    pub total_size: u64,
    pub categories: Vec<InspectCategory>,
}

impl InspectSnapshot {
    pub fn category(&self, name: &str) -> Option<&InspectCategory> {
        self.categories.iter().find(|c| c.name == name)
    }
}

/// Page relations learned in one pre-scan: which streams are page content
/// (and for which page), and which streams are image XObjects.
struct PageScan {
    content_pages: HashMap<ObjectId, u32>,
    image_refs: HashSet<ObjectId>,
}

/// Produces the snapshot for the current graph state.
pub fn snapshot(doc: &Document) -> InspectSnapshot {
    let scan = scan_pages(doc);
    let font_files = font_file_targets(doc);

    let mut categories: Vec<InspectCategory> = CATEGORY_NAMES
        .iter()
        .map(|name| InspectCategory {
            name: (*name).to_string(),
            total_size: 0,
            items: Vec::new(),
        })
        .collect();

    let mut total_size = 0u64;
    for (&id, obj) in &doc.objects {
        let (category_index, item) = classify(doc, id, obj, &scan, &font_files);
        total_size += item.size;
        categories[category_index].total_size += item.size;
        categories[category_index].items.push(item);
    }

    InspectSnapshot {
        object_count: doc.objects.len(),
        total_size,
        categories,
    }
}

fn classify(
    doc: &Document,
    id: ObjectId,
    obj: &Object,
    scan: &PageScan,
    font_files: &HashSet<ObjectId>,
) -> (usize, InspectItem) {
    let mut item = InspectItem {
        reference: ref_tag(id),
        size: 0,
        filters: Vec::new(),
        display: String::new(),
        subcategory: None,
    };

    let dict: Option<&Dictionary> = match obj {
        Object::Stream(stream) => {
            item.size = stream.content.len() as u64;
            item.filters = filter_display_names(doc, &stream.dict);
            Some(&stream.dict)
        }
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    };

    let type_is = |name: &[u8]| {
        dict.and_then(|d| dict_get(doc, d, b"Type"))
            .map(|t| name_is(t, name))
            .unwrap_or(false)
    };
    let subtype_is = |name: &[u8]| {
        dict.and_then(|d| dict_get(doc, d, b"Subtype"))
            .map(|t| name_is(t, name))
            .unwrap_or(false)
    };

    if matches!(obj, Object::Stream(_)) && subtype_is(b"Image") {
        item.display = dict.map(|d| image_display(doc, d)).unwrap_or_default();
        return (1, item);
    }
    if matches!(obj, Object::Stream(_)) && (type_is(b"Metadata") || subtype_is(b"XML")) {
        item.display = "XMP metadata".to_string();
        return (3, item);
    }
    if font_files.contains(&id) {
        item.display = "Embedded font program".to_string();
        return (0, item);
    }
    if type_is(b"Font") {
        item.display = dict.map(|d| font_display(doc, d)).unwrap_or_default();
        return (0, item);
    }
    if type_is(b"FontDescriptor") {
        let name = dict
            .and_then(|d| dict_get(doc, d, b"FontName"))
            .and_then(name_of)
            .map(|n| String::from_utf8_lossy(n).into_owned())
            .unwrap_or_default();
        item.display = format!(
            "{} (FontDescriptor)",
            crate::encodings::strip_subset_prefix(&name)
        );
        return (0, item);
    }
    if let Some(page) = scan.content_pages.get(&id) {
        item.display = format!("Page {page}");
        return (2, item);
    }
    if type_is(b"Page") || type_is(b"Pages") || type_is(b"Catalog") {
        item.display = dict
            .and_then(|d| dict_get(doc, d, b"Type"))
            .and_then(name_of)
            .map(|n| String::from_utf8_lossy(n).into_owned())
            .unwrap_or_default();
        return (4, item);
    }
    if scan.image_refs.contains(&id) {
        // Image resource that lost its Subtype; still an image to the viewer.
        item.display = dict.map(|d| image_display(doc, d)).unwrap_or_default();
        return (1, item);
    }

    let (subcategory, display) = other_shape(doc, obj, dict);
    item.subcategory = Some(subcategory.to_string());
    item.display = display;
    (5, item)
}

fn other_shape(doc: &Document, obj: &Object, dict: Option<&Dictionary>) -> (&'static str, String) {
    if let Some(d) = dict {
        if d.get(b"N").is_ok() && d.get(b"Alternate").is_ok() {
            return ("ICC Profile", "ICC color profile".to_string());
        }
        if d.get(b"CMapName").is_ok() {
            return ("CMap", "Character map".to_string());
        }
        if dict_get(doc, d, b"Subtype").map(|s| name_is(s, b"Form")).unwrap_or(false) {
            return ("Form XObject", "Form XObject".to_string());
        }
        let is_annot = dict_get(doc, d, b"Type").map(|t| name_is(t, b"Annot")).unwrap_or(false)
            || dict_get(doc, d, b"Subtype")
                .map(|s| name_is(s, b"Link") || name_is(s, b"Widget"))
                .unwrap_or(false);
        if is_annot {
            return ("Annotation", "Annotation".to_string());
        }
        if d.get(b"Differences").is_ok() {
            return ("Encoding", "Encoding differences".to_string());
        }
        if d.get(b"Registry").is_ok() && d.get(b"Ordering").is_ok() {
            return ("CID Registry", "CID system info".to_string());
        }
    }
    if let Object::Array(items) = obj {
        if !items.is_empty() && items.iter().all(|o| as_integer(o).is_some()) {
            return ("Widths", "Glyph widths".to_string());
        }
    }
    ("Miscellaneous", "Data".to_string())
}

fn image_display(doc: &Document, dict: &Dictionary) -> String {
    let width = dict_get(doc, dict, b"Width").and_then(as_integer).unwrap_or(0);
    let height = dict_get(doc, dict, b"Height").and_then(as_integer).unwrap_or(0);
    let colorspace = dict_get(doc, dict, b"ColorSpace")
        .and_then(name_of)
        .map(|n| String::from_utf8_lossy(n).into_owned())
        .unwrap_or_else(|| "?".to_string());
    format!("{width} × {height} {colorspace}")
}

fn font_display(doc: &Document, dict: &Dictionary) -> String {
    let base = dict_get(doc, dict, b"BaseFont")
        .and_then(name_of)
        .map(|n| String::from_utf8_lossy(n).into_owned())
        .unwrap_or_else(|| "(unnamed)".to_string());
    let subtype = dict_get(doc, dict, b"Subtype")
        .and_then(name_of)
        .map(|n| String::from_utf8_lossy(n).into_owned())
        .unwrap_or_else(|| "Font".to_string());
    format!("{} ({subtype})", crate::encodings::strip_subset_prefix(&base))
}

fn scan_pages(doc: &Document) -> PageScan {
    let mut scan = PageScan {
        content_pages: HashMap::new(),
        image_refs: HashSet::new(),
    };

    for (page_number, page_id) in doc.get_pages() {
        let Ok(page) = doc.get_dictionary(page_id) else { continue };

        if let Ok(contents) = page.get(b"Contents") {
            match contents {
                Object::Reference(id) => {
                    scan.content_pages.insert(*id, page_number);
                }
                Object::Array(items) => {
                    for item in items {
                        if let Object::Reference(id) = item {
                            scan.content_pages.insert(*id, page_number);
                        }
                    }
                }
                _ => {}
            }
        }

        let Some(resources) = crate::content::page_resources(doc, page) else { continue };
        let Some(xobjects) = dict_get(doc, resources, b"XObject").and_then(|o| o.as_dict().ok())
        else {
            continue;
        };
        for (_, value) in xobjects.iter() {
            if let Object::Reference(id) = value {
                if let Ok(Object::Stream(stream)) = doc.get_object(*id) {
                    if dict_get(doc, &stream.dict, b"Subtype")
                        .map(|s| name_is(s, b"Image"))
                        .unwrap_or(false)
                    {
                        scan.image_refs.insert(*id);
                    }
                }
            }
        }
    }

    scan
}

/// The set of streams reachable through any FontDescriptor's FontFile keys.
fn font_file_targets(doc: &Document) -> HashSet<ObjectId> {
    let mut targets = HashSet::new();
    for obj in doc.objects.values() {
        let dict = match obj {
            Object::Dictionary(d) => d,
            Object::Stream(s) => &s.dict,
            _ => continue,
        };
        if !dict_get(doc, dict, b"Type").map(|t| name_is(t, b"FontDescriptor")).unwrap_or(false) {
            continue;
        }
        for key in FONT_FILE_KEYS {
            if let Ok(Object::Reference(id)) = dict.get(key) {
                targets.insert(*id);
            }
        }
    }
    targets
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Stream};

    fn base_doc() -> (Document, ObjectId) {
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
        (doc, content_id)
    }

    #[test]
    fn page_content_and_structure_categories() {
        let (doc, content_id) = base_doc();
        let snap = snapshot(&doc);
        assert_eq!(snap.object_count, 4);

        let content = snap.category("Page Content").unwrap();
        assert_eq!(content.items.len(), 1);
        assert_eq!(content.items[0].reference, ref_tag(content_id));
        assert_eq!(content.items[0].display, "Page 1");

        let structure = snap.category("Document Structure").unwrap();
        assert_eq!(structure.items.len(), 3);
    }

    #[test]
    fn fonts_cover_descriptor_and_program() {
        let (mut doc, _) = base_doc();
        let program = doc.add_object(Object::Stream(Stream::new(
            dictionary! { "Filter" => "FlateDecode" },
            vec![0u8; 64],
        )));
        let descriptor = doc.add_object(dictionary! {
            "Type" => "FontDescriptor",
            "FontName" => "ABCDEF+Helvetica",
            "FontFile2" => Object::Reference(program),
        });
        doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "ABCDEF+Helvetica",
            "FontDescriptor" => Object::Reference(descriptor),
        });

        let snap = snapshot(&doc);
        let fonts = snap.category("Fonts").unwrap();
        assert_eq!(fonts.items.len(), 3);
        assert!(fonts.items.iter().any(|i| i.display == "Helvetica (Type1)"));
        assert!(fonts.items.iter().any(|i| i.display == "Embedded font program"));
        assert_eq!(fonts.total_size, 64);
    }

    #[test]
    fn image_and_metadata_categories() {
        let (mut doc, _) = base_doc();
        doc.add_object(Object::Stream(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 10,
                "Height" => 20,
                "ColorSpace" => "DeviceRGB",
            },
            vec![0u8; 600],
        )));
        doc.add_object(Object::Stream(Stream::new(
            dictionary! { "Type" => "Metadata", "Subtype" => "XML" },
            b"<x:xmpmeta/>".to_vec(),
        )));

        let snap = snapshot(&doc);
        let images = snap.category("Images").unwrap();
        assert_eq!(images.items[0].display, "10 × 20 DeviceRGB");
        let metadata = snap.category("Metadata").unwrap();
        assert_eq!(metadata.items.len(), 1);
    }

    #[test]
    fn other_data_subcategories() {
        let (mut doc, _) = base_doc();
        doc.add_object(dictionary! { "N" => 3, "Alternate" => "DeviceRGB" });
        doc.add_object(dictionary! {
            "Registry" => Object::String(b"Adobe".to_vec(), lopdf::StringFormat::Literal),
            "Ordering" => Object::String(b"Identity".to_vec(), lopdf::StringFormat::Literal),
        });
        doc.add_object(Object::Array(vec![
            Object::Integer(500),
            Object::Integer(600),
        ]));

        let snap = snapshot(&doc);
        let other = snap.category("Other Data").unwrap();
        let subs: Vec<_> = other
            .items
            .iter()
            .filter_map(|i| i.subcategory.as_deref())
            .collect();
        assert!(subs.contains(&"ICC Profile"));
        assert!(subs.contains(&"CID Registry"));
        assert!(subs.contains(&"Widths"));
    }
}
