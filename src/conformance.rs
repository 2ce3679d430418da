//! Accessibility and archival-conformance probing.
//!
//! Computed once at load and handed to every pass as read-only advice: the
//! passes must not unembed fonts from a declared PDF/A file, must keep the
//! structure tree of a tagged file intact, and the serializer must avoid
//! object streams for PDF/A-1.
//!
//! XMP is recognized, not validated: element and attribute forms of the
//! pdfaid / pdfuaid / dc:language / xml:lang markers are matched with
//! regexes, and malformed packets simply yield empty fields.

use lopdf::{Document, Object};
use regex::Regex;
use serde_derive::{Deserialize, Serialize};

use crate::filters::decode_stream;
use crate::graph::{catalog, dict_get, name_is, resolve};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfTraits {
    /// Catalog MarkInfo.Marked is true.
    pub is_tagged: bool,
    /// Catalog carries a StructTreeRoot.
    pub has_struct_tree: bool,
    /// Document language, from catalog Lang or the XMP packet.
    pub lang: Option<String>,
    /// XMP declared a pdfaid:part.
    pub is_pdf_a: bool,
    /// Combined part + conformance, e.g. `1B`, `2U`, or bare `3`.
    pub pdf_a_level: Option<String>,
    /// XMP declared a pdfuaid:part.
    pub is_pdf_ua: bool,
}

impl PdfTraits {
    /// PDF/A-1 forbids object streams; later parts allow them.
    pub fn forbids_object_streams(&self) -> bool {
        self.is_pdf_a
            && self
                .pdf_a_level
                .as_deref()
                .map(|level| level.starts_with('1'))
                .unwrap_or(false)
    }
}

/// Walks the catalog and the /Metadata XMP stream.
pub fn detect_traits(doc: &Document) -> PdfTraits {
    let mut traits = PdfTraits::default();
    let Some(root) = catalog(doc) else {
        return traits;
    };

    if let Some(mark_info) = dict_get(doc, root, b"MarkInfo").and_then(|o| o.as_dict().ok()) {
        traits.is_tagged = matches!(dict_get(doc, mark_info, b"Marked"), Some(Object::Boolean(true)));
    }
    traits.has_struct_tree = root.get(b"StructTreeRoot").is_ok();
    if let Some(Object::String(lang, _)) = dict_get(doc, root, b"Lang") {
        traits.lang = Some(String::from_utf8_lossy(lang).into_owned());
    }

    if let Some(xmp) = xmp_bytes(doc) {
        let xmp = String::from_utf8_lossy(&xmp);
        let part = first_capture(&xmp, &[
            r"<pdfaid:part(?:\s[^>]*)?>\s*(\d+)\s*</pdfaid:part>",
            r#"pdfaid:part\s*=\s*"(\d+)""#,
        ]);
        let conformance = first_capture(&xmp, &[
            r"<pdfaid:conformance(?:\s[^>]*)?>\s*([A-Ua-u])\s*</pdfaid:conformance>",
            r#"pdfaid:conformance\s*=\s*"([A-Ua-u])""#,
        ]);
        if let Some(part) = part {
            traits.is_pdf_a = true;
            traits.pdf_a_level = Some(match conformance {
                Some(c) => format!("{part}{}", c.to_uppercase()),
                None => part,
            });
        }
        traits.is_pdf_ua = first_capture(&xmp, &[
            r"<pdfuaid:part(?:\s[^>]*)?>\s*(\d+)\s*</pdfuaid:part>",
            r#"pdfuaid:part\s*=\s*"(\d+)""#,
        ])
        .is_some();

        if traits.lang.is_none() {
            traits.lang = xmp_language(&xmp);
        }
    }

    traits
}

/// The raw XMP packet behind the catalog's Metadata entry, decoded through
/// its filter chain when one is declared.
pub fn xmp_bytes(doc: &Document) -> Option<Vec<u8>> {
    let root = catalog(doc)?;
    let metadata = root.get(b"Metadata").ok()?;
    match resolve(doc, metadata) {
        Object::Stream(stream) => {
            if !name_is(
                dict_get(doc, &stream.dict, b"Type").unwrap_or(&Object::Null),
                b"Metadata",
            ) && !name_is(
                dict_get(doc, &stream.dict, b"Subtype").unwrap_or(&Object::Null),
                b"XML",
            ) {
                log::debug!("catalog Metadata does not look like an XMP stream");
            }
            decode_stream(doc, stream).ok().or_else(|| Some(stream.content.clone()))
        }
        _ => None,
    }
}

/// Document language from an XMP packet: dc:language rdf:li first, then an
/// xml:lang attribute, skipping the `x-default` placeholder.
pub fn xmp_language(xmp: &str) -> Option<String> {
    let li = Regex::new(r"(?s)<dc:language[^>]*>.*?<rdf:li[^>]*>\s*([A-Za-z0-9-]+)\s*</rdf:li>")
        .ok()?;
    if let Some(caps) = li.captures(xmp) {
        let lang = caps[1].to_string();
        if is_language_tag(&lang) {
            return Some(lang);
        }
    }
    let attr = Regex::new(r#"xml:lang\s*=\s*"([^"]+)""#).ok()?;
    for caps in attr.captures_iter(xmp) {
        let lang = caps[1].to_string();
        if lang != "x-default" && is_language_tag(&lang) {
            return Some(lang);
        }
    }
    None
}

/// `[A-Za-z]{2,3}(-[A-Za-z0-9-]+)?`
pub fn is_language_tag(value: &str) -> bool {
    let mut parts = value.splitn(2, '-');
    let primary = parts.next().unwrap_or("");
    if !(2..=3).contains(&primary.len()) || !primary.bytes().all(|b| b.is_ascii_alphabetic()) {
        return false;
    }
    match parts.next() {
        None => true,
        Some(rest) => {
            !rest.is_empty()
                && rest.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
        }
    }
}

fn first_capture(text: &str, patterns: &[&str]) -> Option<String> {
    for pattern in patterns {
        let re = Regex::new(pattern).ok()?;
        if let Some(caps) = re.captures(text) {
            return Some(caps[1].to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Stream};

    fn doc_with_catalog(extra: lopdf::Dictionary) -> Document {
        let mut doc = Document::with_version("1.5");
        let mut cat = dictionary! { "Type" => "Catalog" };
        for (k, v) in extra.iter() {
            cat.set(k.clone(), v.clone());
        }
        let catalog_id = doc.add_object(cat);
        doc.trailer.set("Root", Object::Reference(catalog_id));
        doc
    }

    fn with_xmp(xmp: &str, extra: lopdf::Dictionary) -> Document {
        let mut doc = doc_with_catalog(extra);
        let meta_id = doc.add_object(Object::Stream(Stream::new(
            dictionary! { "Type" => "Metadata", "Subtype" => "XML" },
            xmp.as_bytes().to_vec(),
        )));
        let root_id = doc.trailer.get(b"Root").unwrap().as_reference().unwrap();
        if let Ok(cat) = doc.get_dictionary_mut(root_id) {
            cat.set("Metadata", Object::Reference(meta_id));
        }
        doc
    }

    #[test]
    fn detects_pdfa_element_form() {
        let xmp = r#"<rdf:Description rdf:about="">
            <pdfaid:part>1</pdfaid:part>
            <pdfaid:conformance>B</pdfaid:conformance>
        </rdf:Description>"#;
        let doc = with_xmp(xmp, dictionary! {});
        let traits = detect_traits(&doc);
        assert!(traits.is_pdf_a);
        assert_eq!(traits.pdf_a_level.as_deref(), Some("1B"));
        assert!(traits.forbids_object_streams());
    }

    #[test]
    fn detects_pdfa_attribute_form_and_ua() {
        let xmp = r#"<rdf:Description pdfaid:part="2" pdfaid:conformance="u" pdfuaid:part="1"/>"#;
        let doc = with_xmp(xmp, dictionary! {});
        let traits = detect_traits(&doc);
        assert_eq!(traits.pdf_a_level.as_deref(), Some("2U"));
        assert!(traits.is_pdf_ua);
        assert!(!traits.forbids_object_streams());
    }

    #[test]
    fn catalog_lang_wins_over_xmp() {
        let xmp = r#"<dc:language><rdf:Bag><rdf:li>fr</rdf:li></rdf:Bag></dc:language>"#;
        let doc = with_xmp(
            xmp,
            dictionary! { "Lang" => Object::String(b"en-US".to_vec(), lopdf::StringFormat::Literal) },
        );
        let traits = detect_traits(&doc);
        assert_eq!(traits.lang.as_deref(), Some("en-US"));
    }

    #[test]
    fn xmp_language_fallback_skips_x_default() {
        let xmp = r#"<rdf:li xml:lang="x-default">t</rdf:li><rdf:li xml:lang="de-DE">t</rdf:li>"#;
        assert_eq!(xmp_language(xmp).as_deref(), Some("de-DE"));
    }

    #[test]
    fn tagged_and_struct_tree_flags() {
        let mut doc = Document::with_version("1.5");
        let struct_root = doc.add_object(dictionary! { "Type" => "StructTreeRoot" });
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "MarkInfo" => Object::Dictionary(dictionary! { "Marked" => true }),
            "StructTreeRoot" => Object::Reference(struct_root),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));
        let traits = detect_traits(&doc);
        assert!(traits.is_tagged);
        assert!(traits.has_struct_tree);
        assert!(!traits.is_pdf_a);
    }

    #[test]
    fn language_tag_shapes() {
        assert!(is_language_tag("en"));
        assert!(is_language_tag("en-US"));
        assert!(is_language_tag("deu"));
        assert!(!is_language_tag("x-default"));
        assert!(!is_language_tag("e"));
        assert!(!is_language_tag("en_US"));
    }
}
