//! Shared builders for synthetic test documents.

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

pub struct DocBuilder {
    pub doc: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
    catalog_entries: Vec<(Vec<u8>, Object)>,
}

impl DocBuilder {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        DocBuilder {
            doc,
            pages_id,
            page_ids: Vec::new(),
            catalog_entries: Vec::new(),
        }
    }

    pub fn add_stream(&mut self, dict: Dictionary, content: Vec<u8>) -> ObjectId {
        self.doc.add_object(Object::Stream(Stream::new(dict, content)))
    }

    /// Content stream deflated at the given level (0 = stored raw).
    pub fn add_content(&mut self, bytes: &[u8], level: u32) -> ObjectId {
        if level == 0 {
            self.add_stream(dictionary! {}, bytes.to_vec())
        } else {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(level));
            encoder.write_all(bytes).unwrap();
            let packed = encoder.finish().unwrap();
            self.add_stream(dictionary! { "Filter" => "FlateDecode" }, packed)
        }
    }

    pub fn add_page(&mut self, width: i64, height: i64, content_id: ObjectId, resources: Dictionary) -> ObjectId {
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(self.pages_id),
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(width),
                Object::Integer(height),
            ],
            "Contents" => Object::Reference(content_id),
            "Resources" => Object::Dictionary(resources),
        });
        self.page_ids.push(page_id);
        page_id
    }

    pub fn set_catalog(&mut self, key: &str, value: Object) {
        self.catalog_entries.push((key.as_bytes().to_vec(), value));
    }

    /// XMP packet as a catalog Metadata stream.
    pub fn add_xmp(&mut self, xmp: &str) -> ObjectId {
        let id = self.add_stream(
            dictionary! { "Type" => "Metadata", "Subtype" => "XML" },
            xmp.as_bytes().to_vec(),
        );
        self.set_catalog("Metadata", Object::Reference(id));
        id
    }

    /// An embedded Type1 font: program stream + descriptor + font dict.
    /// Returns (font, descriptor, program).
    pub fn add_embedded_type1(&mut self, base_font: &str) -> (ObjectId, ObjectId, ObjectId) {
        let program_bytes: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
        let program = self.add_stream(
            dictionary! { "Length1" => program_bytes.len() as i64 },
            program_bytes,
        );
        let descriptor = self.doc.add_object(dictionary! {
            "Type" => "FontDescriptor",
            "FontName" => Object::Name(base_font.as_bytes().to_vec()),
            "Flags" => 32,
            "FontFile2" => Object::Reference(program),
        });
        let font = self.doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => Object::Name(base_font.as_bytes().to_vec()),
            "FirstChar" => 32,
            "LastChar" => 126,
            "FontDescriptor" => Object::Reference(descriptor),
        });
        (font, descriptor, program)
    }

    pub fn finish(mut self) -> Vec<u8> {
        let kids: Vec<Object> = self.page_ids.iter().map(|id| Object::Reference(*id)).collect();
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Count" => kids.len() as i64,
                "Kids" => kids,
            }),
        );
        let mut catalog = dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(self.pages_id),
        };
        for (key, value) in self.catalog_entries {
            catalog.set(key, value);
        }
        let catalog_id = self.doc.add_object(catalog);
        self.doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut bytes = Vec::new();
        self.doc
            .save_to(&mut std::io::BufWriter::new(&mut bytes))
            .unwrap();
        bytes
    }
}

/// Pseudo-random but deterministic bytes; incompressible enough to make
/// deletions dominate size arithmetic.
pub fn noise(len: usize, seed: u32) -> Vec<u8> {
    let mut state = seed | 1;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 7) as u8
        })
        .collect()
}

/// A smooth radial pattern: rows differ (so deflate stays honest) but JPEG
/// compresses it hard.
pub fn radial_rgb(width: usize, height: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        for x in 0..width {
            let d = ((x * x + y * y) as f64).sqrt();
            let v = (d * 255.0 / ((width * width + height * height) as f64).sqrt()) as u8;
            data.push(v);
            data.push(255 - v);
            data.push(v / 2 + 64);
        }
    }
    data
}

/// Deflates at max level, as input fixtures store images.
pub fn deflated(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn literal(text: &str) -> Object {
    Object::String(text.as_bytes().to_vec(), StringFormat::Literal)
}

/// True when any dictionary (or stream dictionary) in the document carries
/// the key.
pub fn any_dict_has_key(doc: &Document, key: &[u8]) -> bool {
    doc.objects.values().any(|obj| match obj {
        Object::Dictionary(d) => d.has(key),
        Object::Stream(s) => s.dict.has(key),
        _ => false,
    })
}
