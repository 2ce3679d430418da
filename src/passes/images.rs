//! Lossy image recompression: decode FlateDecode-stored DeviceRGB/DeviceGray
//! images, optionally downsample them to a target effective DPI with an
//! area-average filter, JPEG-encode, and keep the JPEG when it is strictly
//! smaller than the stored payload.

use std::collections::HashMap;

use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use lopdf::{Document, Object, ObjectId};

use super::{counts, Counts, PassCtx};
use crate::content::page_resources;
use crate::errors::{Result, SlimError};
use crate::filters::{
    all_filters_decodable, decode_parms_for, decode_stream, filter_chain, has_image_native_filter,
    unpredict_png,
};
use crate::graph::{as_integer, as_number, dict_get, name_is, name_of};

/// Images smaller than this decode to too little data to be worth a JPEG.
const MIN_DECODED_BYTES: usize = 10 * 1024;

struct Replacement {
    jpeg: Vec<u8>,
    resized: Option<(i64, i64)>,
}

pub(crate) fn run(ctx: &mut PassCtx<'_>) -> Result<Counts> {
    let mut converted = 0i64;
    let mut downsampled = 0i64;
    let mut skipped = 0i64;

    if !ctx.options.lossy {
        return Ok(counts(&[
            ("converted", 0),
            ("downsampled", 0),
            ("skipped", 0),
        ]));
    }

    let quality = (f64::from(ctx.options.image_quality.clamp(0.01, 1.0)) * 100.0).round() as u8;
    let page_dims = smallest_page_dims(ctx.doc);
    let ids: Vec<ObjectId> = ctx.doc.objects.keys().copied().collect();

    for id in ids {
        let is_image = matches!(
            ctx.doc.objects.get(&id),
            Some(Object::Stream(stream))
                if dict_get(ctx.doc, &stream.dict, b"Subtype")
                    .map(|s| name_is(s, b"Image"))
                    .unwrap_or(false)
        );
        if !is_image {
            continue;
        }

        match analyze(ctx.doc, id, &page_dims, ctx.options.max_image_dpi, quality) {
            Some(replacement) => {
                let Some(Object::Stream(stream)) = ctx.doc.objects.get_mut(&id) else {
                    continue;
                };
                stream.dict.set("Filter", "DCTDecode");
                stream.dict.remove(b"DecodeParms");
                stream.dict.remove(b"DP");
                if let Some((w, h)) = replacement.resized {
                    stream.dict.set("Width", w);
                    stream.dict.set("Height", h);
                    downsampled += 1;
                }
                stream.set_content(replacement.jpeg);
                converted += 1;
            }
            None => skipped += 1,
        }
    }

    Ok(counts(&[
        ("converted", converted),
        ("downsampled", downsampled),
        ("skipped", skipped),
    ]))
}

fn analyze(
    doc: &Document,
    id: ObjectId,
    page_dims: &HashMap<ObjectId, (f64, f64)>,
    max_dpi: Option<u32>,
    quality: u8,
) -> Option<Replacement> {
    let Some(Object::Stream(stream)) = doc.objects.get(&id) else {
        return None;
    };
    let dict = &stream.dict;

    if matches!(dict_get(doc, dict, b"ImageMask"), Some(Object::Boolean(true))) {
        return None;
    }
    if dict.get(b"SMask").is_ok() {
        return None;
    }
    if has_image_native_filter(doc, dict) || !all_filters_decodable(doc, dict) {
        return None;
    }
    let bpc = dict_get(doc, dict, b"BitsPerComponent").and_then(as_integer).unwrap_or(8);
    if bpc != 8 {
        return None;
    }
    let components = match dict_get(doc, dict, b"ColorSpace").and_then(name_of) {
        Some(b"DeviceRGB") => 3usize,
        Some(b"DeviceGray") => 1usize,
        _ => return None,
    };
    let width = dict_get(doc, dict, b"Width").and_then(as_integer)? as usize;
    let height = dict_get(doc, dict, b"Height").and_then(as_integer)? as usize;
    if width == 0 || height == 0 {
        return None;
    }

    let mut data = decode_stream(doc, stream).ok()?;

    if let Some((columns, colors, pred_bpc)) = predictor_parameters(doc, dict, width, components) {
        data = unpredict_png(&data, columns, colors, pred_bpc).ok()?;
    }

    if data.len() < MIN_DECODED_BYTES {
        return None;
    }
    if data.len() != width * height * components {
        return None;
    }

    let mut rgba = expand_rgba(&data, components);
    let mut out_width = width;
    let mut out_height = height;

    if let (Some(target), Some(&(page_w, page_h))) = (max_dpi, page_dims.get(&id)) {
        let effective = effective_dpi(width, height, page_w, page_h);
        if effective > f64::from(target) {
            out_width = ((width as f64) * f64::from(target) / effective).round().max(1.0) as usize;
            out_height = ((height as f64) * f64::from(target) / effective).round().max(1.0) as usize;
            rgba = box_downsample(&rgba, width, height, out_width, out_height);
        }
    }

    let jpeg = encode_jpeg(&rgba, out_width, out_height, components == 1, quality).ok()?;
    if jpeg.len() >= stream.content.len() {
        return None;
    }

    let resized = (out_width != width).then_some((out_width as i64, out_height as i64));
    Some(Replacement { jpeg, resized })
}

/// PNG-prediction parameters when any filter in the chain declares
/// `Predictor >= 10`.
fn predictor_parameters(
    doc: &Document,
    dict: &lopdf::Dictionary,
    width: usize,
    components: usize,
) -> Option<(usize, usize, usize)> {
    let chain = filter_chain(doc, dict).ok()?;
    for index in 0..chain.len() {
        let Some(parms) = decode_parms_for(doc, dict, index) else { continue };
        let predictor = dict_get(doc, parms, b"Predictor").and_then(as_integer).unwrap_or(1);
        if predictor >= 10 {
            let columns = dict_get(doc, parms, b"Columns")
                .and_then(as_integer)
                .map(|c| c as usize)
                .unwrap_or(width);
            let colors = dict_get(doc, parms, b"Colors")
                .and_then(as_integer)
                .map(|c| c as usize)
                .unwrap_or(components);
            let bpc = dict_get(doc, parms, b"BitsPerComponent")
                .and_then(as_integer)
                .map(|b| b as usize)
                .unwrap_or(8);
            return Some((columns, colors, bpc));
        }
    }
    None
}

/// `min(w·72/page_w, h·72/page_h)`: the resolution the image renders at when
/// drawn across the page.
fn effective_dpi(width: usize, height: usize, page_w: f64, page_h: f64) -> f64 {
    let x = width as f64 * 72.0 / page_w.max(1.0);
    let y = height as f64 * 72.0 / page_h.max(1.0);
    x.min(y)
}

fn expand_rgba(data: &[u8], components: usize) -> Vec<u8> {
    let pixels = data.len() / components;
    let mut rgba = Vec::with_capacity(pixels * 4);
    match components {
        1 => {
            for &g in data {
                rgba.extend_from_slice(&[g, g, g, 255]);
            }
        }
        _ => {
            for px in data.chunks_exact(3) {
                rgba.extend_from_slice(&[px[0], px[1], px[2], 255]);
            }
        }
    }
    rgba
}

/// Area-average (box) downsampling over RGBA pixels: each source pixel
/// contributes by the area of its overlap with the destination pixel's
/// pre-image.
fn box_downsample(src: &[u8], sw: usize, sh: usize, dw: usize, dh: usize) -> Vec<u8> {
    let x_ratio = sw as f64 / dw as f64;
    let y_ratio = sh as f64 / dh as f64;
    let mut out = Vec::with_capacity(dw * dh * 4);

    for dy in 0..dh {
        let y0 = dy as f64 * y_ratio;
        let y1 = y0 + y_ratio;
        for dx in 0..dw {
            let x0 = dx as f64 * x_ratio;
            let x1 = x0 + x_ratio;

            let mut acc = [0.0f64; 4];
            let mut area = 0.0f64;
            let sy_end = (y1.ceil() as usize).min(sh);
            let sx_end = (x1.ceil() as usize).min(sw);
            for sy in (y0.floor() as usize)..sy_end {
                let wy = (y1.min(sy as f64 + 1.0) - y0.max(sy as f64)).max(0.0);
                for sx in (x0.floor() as usize)..sx_end {
                    let wx = (x1.min(sx as f64 + 1.0) - x0.max(sx as f64)).max(0.0);
                    let weight = wx * wy;
                    let offset = (sy * sw + sx) * 4;
                    for c in 0..4 {
                        acc[c] += f64::from(src[offset + c]) * weight;
                    }
                    area += weight;
                }
            }
            if area <= 0.0 {
                out.extend_from_slice(&[0, 0, 0, 255]);
                continue;
            }
            for c in &acc {
                out.push((c / area).round().clamp(0.0, 255.0) as u8);
            }
        }
    }

    out
}

fn encode_jpeg(
    rgba: &[u8],
    width: usize,
    height: usize,
    gray: bool,
    quality: u8,
) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, quality);
    let result = if gray {
        let luma: Vec<u8> = rgba.chunks_exact(4).map(|px| px[0]).collect();
        encoder.encode(&luma, width as u32, height as u32, ExtendedColorType::L8)
    } else {
        let rgb: Vec<u8> = rgba
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect();
        encoder.encode(&rgb, width as u32, height as u32, ExtendedColorType::Rgb8)
    };
    result.map_err(|e| SlimError::Encode(format!("JPEG encode failed: {e}")))?;
    Ok(out)
}

/// For each image XObject: the dimensions of the smallest page that draws
/// it, used as the DPI reference.
fn smallest_page_dims(doc: &Document) -> HashMap<ObjectId, (f64, f64)> {
    let mut dims: HashMap<ObjectId, (f64, f64)> = HashMap::new();
    for (_, page_id) in doc.get_pages() {
        let Ok(page) = doc.get_dictionary(page_id) else { continue };
        let Some((page_w, page_h)) = media_box_dims(doc, page) else { continue };
        let Some(resources) = page_resources(doc, page) else { continue };
        let Some(xobjects) = dict_get(doc, resources, b"XObject").and_then(|o| o.as_dict().ok())
        else {
            continue;
        };
        for (_, value) in xobjects.iter() {
            let Object::Reference(id) = value else { continue };
            let entry = dims.entry(*id).or_insert((page_w, page_h));
            if page_w * page_h < entry.0 * entry.1 {
                *entry = (page_w, page_h);
            }
        }
    }
    dims
}

fn media_box_dims(doc: &Document, page: &lopdf::Dictionary) -> Option<(f64, f64)> {
    let media_box = dict_get(doc, page, b"MediaBox")?.as_array().ok()?;
    if media_box.len() != 4 {
        return None;
    }
    let coords: Vec<f64> = media_box.iter().filter_map(as_number).collect();
    if coords.len() != 4 {
        return None;
    }
    Some(((coords[2] - coords[0]).abs(), (coords[3] - coords[1]).abs()))
}
