//! The Unicode mapper: turns the raw byte sequences a font consumed into the
//! set of Unicode codepoints (or CIDs for composite fonts) they denote.
//!
//! Simple fonts go through the encoding chain of PDF 32000 §9.10: the
//! Encoding entry (or WinAnsi when absent) with Differences applied yields a
//! glyph name per code; ToUnicode takes precedence when present, then the
//! Adobe glyph list, `uniXXXX` names, and finally a plain-ASCII reading for
//! printable codes. Composite Identity-H fonts read two-byte big-endian CIDs
//! and resolve them through ToUnicode only.

use std::collections::BTreeSet;

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::cmap::ToUnicodeCMap;
use crate::encodings::{encoding_table, glyph_name_to_unicode, BaseEncoding, EncodingTable};
use crate::graph::{as_integer, dict_get, name_is, name_of, resolve};

pub const FONT_FILE_KEYS: [&[u8]; 3] = [b"FontFile", b"FontFile2", b"FontFile3"];

/// Unicode codepoints consumed by a simple (Type1/TrueType) font.
pub fn simple_font_codepoints(
    doc: &Document,
    font: &Dictionary,
    strings: &[Vec<u8>],
) -> BTreeSet<u32> {
    let mut used_codes: BTreeSet<u8> = BTreeSet::new();
    for s in strings {
        used_codes.extend(s.iter().copied());
    }

    let to_unicode = ToUnicodeCMap::from_font_dict(doc, font);
    let table = build_encoding_names(doc, font);

    let mut codepoints = BTreeSet::new();
    for code in used_codes {
        if let Some(cmap) = &to_unicode {
            if let Some(cps) = cmap.codepoints(u32::from(code)) {
                codepoints.extend(cps.iter().copied());
                continue;
            }
        }
        if let Some(name) = &table[code as usize] {
            if let Some(cp) = glyph_name_to_unicode(name) {
                codepoints.insert(cp);
                continue;
            }
        }
        if (0x20..=0x7E).contains(&code) {
            codepoints.insert(u32::from(code));
        }
    }
    codepoints
}

/// CIDs consumed by an Identity-H composite font: two-byte big-endian pairs.
/// A trailing odd byte is dropped.
pub fn type0_cids(strings: &[Vec<u8>]) -> BTreeSet<u16> {
    let mut cids = BTreeSet::new();
    for s in strings {
        for pair in s.chunks_exact(2) {
            cids.insert(u16::from_be_bytes([pair[0], pair[1]]));
        }
    }
    cids
}

/// Maps CIDs through the font's ToUnicode CMap. Empty when the CMap is
/// absent; the caller treats that as "cannot subset by Unicode".
pub fn type0_codepoints(doc: &Document, font: &Dictionary, cids: &BTreeSet<u16>) -> BTreeSet<u32> {
    let mut codepoints = BTreeSet::new();
    let Some(cmap) = ToUnicodeCMap::from_font_dict(doc, font) else {
        return codepoints;
    };
    for &cid in cids {
        if let Some(cps) = cmap.codepoints(u32::from(cid)) {
            codepoints.extend(cps.iter().copied());
        }
    }
    codepoints
}

/// Identity-H means: Encoding is the name `Identity-H` and the first
/// descendant's CIDToGIDMap is absent or the name `Identity`, so character
/// codes, CIDs, and glyph ids are one numbering.
pub fn is_identity_h(doc: &Document, font: &Dictionary) -> bool {
    let Some(encoding) = dict_get(doc, font, b"Encoding") else {
        return false;
    };
    if !name_is(encoding, b"Identity-H") {
        return false;
    }
    let Some(descendant) = first_descendant(doc, font) else {
        return false;
    };
    match dict_get(doc, descendant, b"CIDToGIDMap") {
        None => true,
        Some(obj) => name_is(obj, b"Identity"),
    }
}

/// The first entry of a Type0 font's DescendantFonts array.
pub fn first_descendant<'a>(doc: &'a Document, font: &'a Dictionary) -> Option<&'a Dictionary> {
    let descendants = dict_get(doc, font, b"DescendantFonts")?;
    let array = descendants.as_array().ok()?;
    resolve(doc, array.first()?).as_dict().ok()
}

/// Resolves the FontDescriptor for a font, following DescendantFonts for
/// composite fonts.
pub fn descriptor_dict<'a>(doc: &'a Document, font: &'a Dictionary) -> Option<&'a Dictionary> {
    if let Some(obj) = dict_get(doc, font, b"FontDescriptor") {
        return obj.as_dict().ok();
    }
    let descendant = first_descendant(doc, font)?;
    dict_get(doc, descendant, b"FontDescriptor")?.as_dict().ok()
}

/// The embedded font program behind a descriptor: which FontFile key carries
/// it and the stream's object id.
pub fn font_file_ref(descriptor: &Dictionary) -> Option<(&'static [u8], ObjectId)> {
    for key in FONT_FILE_KEYS {
        if let Ok(Object::Reference(id)) = descriptor.get(key) {
            return Some((key, *id));
        }
    }
    None
}

/// The font's BaseFont name as UTF-8.
pub fn base_font_name(doc: &Document, font: &Dictionary) -> Option<String> {
    let base = dict_get(doc, font, b"BaseFont")?;
    name_of(base).map(|n| String::from_utf8_lossy(n).into_owned())
}

/// Builds the 256-entry glyph-name table for a simple font, honoring the
/// Encoding entry and its Differences array.
fn build_encoding_names(doc: &Document, font: &Dictionary) -> Vec<Option<String>> {
    let seed = |encoding: BaseEncoding| -> Vec<Option<String>> {
        let table: EncodingTable = encoding_table(encoding);
        table.iter().map(|slot| slot.map(str::to_string)).collect()
    };

    let Some(encoding_obj) = dict_get(doc, font, b"Encoding") else {
        return seed(BaseEncoding::WinAnsi);
    };

    match encoding_obj {
        Object::Name(name) => {
            let base = BaseEncoding::from_name(name).unwrap_or(BaseEncoding::WinAnsi);
            seed(base)
        }
        Object::Dictionary(dict) => {
            let base = dict_get(doc, dict, b"BaseEncoding")
                .and_then(name_of)
                .and_then(BaseEncoding::from_name)
                .unwrap_or(BaseEncoding::WinAnsi);
            let mut table = seed(base);
            if let Some(Object::Array(differences)) = dict_get(doc, dict, b"Differences") {
                let mut code: usize = 0;
                for item in differences {
                    let item = resolve(doc, item);
                    if let Some(n) = as_integer(item) {
                        code = n.clamp(0, 255) as usize;
                    } else if let Some(name) = name_of(item) {
                        if code < 256 {
                            table[code] = Some(String::from_utf8_lossy(name).into_owned());
                            code += 1;
                        }
                    }
                }
            }
            table
        }
        _ => seed(BaseEncoding::WinAnsi),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    #[test]
    fn ascii_fallback_without_encoding() {
        let doc = Document::with_version("1.5");
        let font = dictionary! { "Type" => "Font", "Subtype" => "Type1" };
        let strings = vec![b"Hi!".to_vec()];
        let cps = simple_font_codepoints(&doc, &font, &strings);
        assert_eq!(cps, BTreeSet::from([0x48, 0x69, 0x21]));
    }

    #[test]
    fn winansi_high_codes_resolve() {
        let doc = Document::with_version("1.5");
        let font = dictionary! { "Subtype" => "Type1", "Encoding" => "WinAnsiEncoding" };
        // 0xE9 is eacute, 0x80 is the euro sign.
        let strings = vec![vec![0xE9, 0x80]];
        let cps = simple_font_codepoints(&doc, &font, &strings);
        assert_eq!(cps, BTreeSet::from([0x00E9, 0x20AC]));
    }

    #[test]
    fn differences_override_base_encoding() {
        let doc = Document::with_version("1.5");
        let font = dictionary! {
            "Subtype" => "Type1",
            "Encoding" => Object::Dictionary(dictionary! {
                "BaseEncoding" => "WinAnsiEncoding",
                "Differences" => vec![
                    Object::Integer(65),
                    Object::Name(b"eacute".to_vec()),
                    Object::Name(b"uni0416".to_vec()),
                ],
            }),
        };
        let strings = vec![vec![65, 66, 67]];
        let cps = simple_font_codepoints(&doc, &font, &strings);
        // 65 -> eacute, 66 -> uni0416, 67 stays 'C'.
        assert_eq!(cps, BTreeSet::from([0x00E9, 0x0416, 0x43]));
    }

    #[test]
    fn type0_cid_extraction_drops_odd_tail() {
        let strings = vec![vec![0x00, 0x41, 0x01, 0x02, 0xFF]];
        let cids = type0_cids(&strings);
        assert_eq!(cids, BTreeSet::from([0x0041, 0x0102]));
    }

    #[test]
    fn identity_h_detection() {
        let mut doc = Document::with_version("1.5");
        let descendant = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "CIDToGIDMap" => "Identity",
        });
        let font = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "Encoding" => "Identity-H",
            "DescendantFonts" => vec![Object::Reference(descendant)],
        };
        assert!(is_identity_h(&doc, &font));

        let vertical = dictionary! {
            "Subtype" => "Type0",
            "Encoding" => "Identity-V",
            "DescendantFonts" => vec![Object::Reference(descendant)],
        };
        assert!(!is_identity_h(&doc, &vertical));
    }

    #[test]
    fn descriptor_via_descendant_fonts() {
        let mut doc = Document::with_version("1.5");
        let program = doc.add_object(Object::Null);
        let descriptor = doc.add_object(dictionary! {
            "Type" => "FontDescriptor",
            "FontFile2" => Object::Reference(program),
        });
        let descendant = doc.add_object(dictionary! {
            "Subtype" => "CIDFontType2",
            "FontDescriptor" => Object::Reference(descriptor),
        });
        let font = dictionary! {
            "Subtype" => "Type0",
            "DescendantFonts" => vec![Object::Reference(descendant)],
        };
        let desc = descriptor_dict(&doc, &font).expect("descriptor resolves");
        let (key, id) = font_file_ref(desc).expect("font file present");
        assert_eq!(key, b"FontFile2");
        assert_eq!(id, program);
    }
}
