//! Stream recompression: decode every decodable non-image stream and
//! re-deflate it at the maximum level, keeping the result only when it is
//! strictly smaller than the stored payload.

use lopdf::{Dictionary, Document, Object, ObjectId};

use super::{counts, Counts, PassCtx};
use crate::errors::Result;
use crate::filters::{
    all_filters_decodable, decode_parms_for, decode_stream, deflate_max, filter_chain,
    has_image_native_filter,
};
use crate::graph::{as_integer, dict_get, name_is};

pub(crate) fn run(ctx: &mut PassCtx<'_>) -> Result<Counts> {
    let ids: Vec<ObjectId> = ctx.doc.objects.keys().copied().collect();
    let mut recompressed = 0i64;
    let mut skipped = 0i64;

    for id in ids {
        let replacement = {
            let Some(Object::Stream(stream)) = ctx.doc.objects.get(&id) else {
                continue;
            };
            if !eligible(ctx.doc, &stream.dict) {
                skipped += 1;
                continue;
            }
            match decode_stream(ctx.doc, stream).and_then(|raw| deflate_max(&raw)) {
                Ok(packed) if packed.len() < stream.content.len() => Some(packed),
                Ok(_) => None,
                Err(e) => {
                    log::debug!("recompress skipping {id:?}: {e}");
                    None
                }
            }
        };

        match replacement {
            Some(packed) => {
                let Some(Object::Stream(stream)) = ctx.doc.objects.get_mut(&id) else {
                    continue;
                };
                stream.dict.set("Filter", "FlateDecode");
                stream.dict.remove(b"DecodeParms");
                stream.dict.remove(b"DP");
                stream.set_content(packed);
                recompressed += 1;
            }
            None => skipped += 1,
        }
    }

    Ok(counts(&[("recompressed", recompressed), ("skipped", skipped)]))
}

fn eligible(doc: &Document, dict: &Dictionary) -> bool {
    if has_image_native_filter(doc, dict) || !all_filters_decodable(doc, dict) {
        return false;
    }
    // The XMP packet stays as-is: the metadata pass scans its bytes later,
    // and PDF/A requires it uncompressed.
    let is_metadata = dict_get(doc, dict, b"Type").map(|t| name_is(t, b"Metadata")).unwrap_or(false)
        || dict_get(doc, dict, b"Subtype").map(|t| name_is(t, b"XML")).unwrap_or(false);
    if is_metadata {
        return false;
    }
    // A predicted stream cannot be re-emitted without its DecodeParms;
    // leave those to the image pass, which knows how to unwind them.
    if let Ok(chain) = filter_chain(doc, dict) {
        for index in 0..chain.len() {
            if let Some(parms) = decode_parms_for(doc, dict, index) {
                let predictor = dict_get(doc, parms, b"Predictor").and_then(as_integer).unwrap_or(1);
                if predictor > 1 {
                    return false;
                }
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conformance::PdfTraits;
    use crate::pipeline::SlimOptions;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use lopdf::{dictionary, Stream};
    use std::io::Write;

    fn run_pass(doc: &mut Document) -> Counts {
        let traits = PdfTraits::default();
        let options = SlimOptions::default();
        let mut ctx = PassCtx { doc, traits: &traits, options: &options };
        run(&mut ctx).unwrap()
    }

    #[test]
    fn level_one_deflate_shrinks() {
        let raw = b"0 0 612 792 re f ".repeat(200);
        let mut weak = ZlibEncoder::new(Vec::new(), Compression::new(1));
        weak.write_all(&raw).unwrap();
        let weak = weak.finish().unwrap();

        let mut doc = Document::with_version("1.5");
        let id = doc.add_object(Object::Stream(Stream::new(
            dictionary! { "Filter" => "FlateDecode" },
            weak.clone(),
        )));

        let record = run_pass(&mut doc);
        assert_eq!(record["recompressed"], 1);

        let Object::Stream(stream) = doc.get_object(id).unwrap() else { panic!() };
        assert!(stream.content.len() < weak.len());
        assert_eq!(
            crate::filters::decode_stream(&doc, stream).unwrap(),
            raw
        );
        let length = stream.dict.get(b"Length").unwrap().as_i64().unwrap();
        assert_eq!(length as usize, stream.content.len());
    }

    #[test]
    fn uncompressed_stream_gets_deflated() {
        let raw = b"BT /F1 24 Tf 72 720 Td (repetitive repetitive) Tj ET\n".repeat(50);
        let mut doc = Document::with_version("1.5");
        let id = doc.add_object(Object::Stream(Stream::new(dictionary! {}, raw.to_vec())));

        let record = run_pass(&mut doc);
        assert_eq!(record["recompressed"], 1);
        let Object::Stream(stream) = doc.get_object(id).unwrap() else { panic!() };
        assert!(name_is(stream.dict.get(b"Filter").unwrap(), b"FlateDecode"));
    }

    #[test]
    fn dct_streams_pass_through() {
        let mut doc = Document::with_version("1.5");
        let id = doc.add_object(Object::Stream(Stream::new(
            dictionary! { "Subtype" => "Image", "Filter" => "DCTDecode" },
            vec![0xFF, 0xD8, 0xFF, 0xE0],
        )));
        let record = run_pass(&mut doc);
        assert_eq!(record["recompressed"], 0);
        let Object::Stream(stream) = doc.get_object(id).unwrap() else { panic!() };
        assert_eq!(stream.content, vec![0xFF, 0xD8, 0xFF, 0xE0]);
    }

    #[test]
    fn metadata_stream_is_left_alone() {
        let xmp = b"<x:xmpmeta>".repeat(100);
        let mut doc = Document::with_version("1.5");
        let id = doc.add_object(Object::Stream(Stream::new(
            dictionary! { "Type" => "Metadata", "Subtype" => "XML" },
            xmp.clone(),
        )));
        let record = run_pass(&mut doc);
        assert_eq!(record["recompressed"], 0);
        let Object::Stream(stream) = doc.get_object(id).unwrap() else { panic!() };
        assert_eq!(stream.content, xmp);
    }

    #[test]
    fn already_tight_stream_is_skipped() {
        // Random-ish bytes deflate to something larger; the original stays.
        let noise: Vec<u8> = (0..512u32).map(|i| (i.wrapping_mul(2654435761) >> 13) as u8).collect();
        let packed = deflate_max(&noise).unwrap();
        let mut doc = Document::with_version("1.5");
        let id = doc.add_object(Object::Stream(Stream::new(
            dictionary! { "Filter" => "FlateDecode" },
            packed.clone(),
        )));
        let record = run_pass(&mut doc);
        assert_eq!(record["recompressed"], 0);
        let Object::Stream(stream) = doc.get_object(id).unwrap() else { panic!() };
        assert_eq!(stream.content, packed);
    }
}
