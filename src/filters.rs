//! Stream filter codecs.
//!
//! A stream's `Filter` entry names a pipeline of encodings, applied in order
//! when decoding. The engine decodes FlateDecode (flate2), LZWDecode (weezl,
//! MSB-first variable-width codes with TIFF-style early change), ASCII85,
//! ASCIIHex, and RunLength. The image-native filters (DCTDecode, JPXDecode,
//! CCITTFaxDecode, JBIG2Decode) are recognized so passes can route around
//! them, but never decoded.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{Dictionary, Document, Object, Stream};
use smallvec::SmallVec;

use crate::errors::{Result, SlimError};
use crate::graph::{as_integer, dict_get, name_of, resolve};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFilter {
    Flate,
    Lzw,
    Ascii85,
    AsciiHex,
    RunLength,
    Dct,
    Jpx,
    CcittFax,
    Jbig2,
}

pub type FilterChain = SmallVec<[StreamFilter; 2]>;

impl StreamFilter {
    /// Recognizes a filter name, including the PDF short forms.
    pub fn from_name(name: &[u8]) -> Option<StreamFilter> {
        match name {
            b"FlateDecode" | b"Fl" => Some(StreamFilter::Flate),
            b"LZWDecode" | b"LZW" => Some(StreamFilter::Lzw),
            b"ASCII85Decode" | b"A85" => Some(StreamFilter::Ascii85),
            b"ASCIIHexDecode" | b"AHx" => Some(StreamFilter::AsciiHex),
            b"RunLengthDecode" | b"RL" => Some(StreamFilter::RunLength),
            b"DCTDecode" | b"DCT" => Some(StreamFilter::Dct),
            b"JPXDecode" => Some(StreamFilter::Jpx),
            b"CCITTFaxDecode" | b"CCF" => Some(StreamFilter::CcittFax),
            b"JBIG2Decode" => Some(StreamFilter::Jbig2),
            _ => None,
        }
    }

    /// Filters whose payload is a compressed image the engine passes through.
    pub fn is_image_native(self) -> bool {
        matches!(
            self,
            StreamFilter::Dct | StreamFilter::Jpx | StreamFilter::CcittFax | StreamFilter::Jbig2
        )
    }

    pub fn display_name(self) -> &'static str {
        match self {
            StreamFilter::Flate => "FlateDecode",
            StreamFilter::Lzw => "LZWDecode",
            StreamFilter::Ascii85 => "ASCII85Decode",
            StreamFilter::AsciiHex => "ASCIIHexDecode",
            StreamFilter::RunLength => "RunLengthDecode",
            StreamFilter::Dct => "DCTDecode",
            StreamFilter::Jpx => "JPXDecode",
            StreamFilter::CcittFax => "CCITTFaxDecode",
            StreamFilter::Jbig2 => "JBIG2Decode",
        }
    }
}

/// Parses the `Filter` entry of a stream dictionary into an ordered chain.
/// An empty chain means the payload is stored raw. Unknown filter names fail.
pub fn filter_chain(doc: &Document, dict: &Dictionary) -> Result<FilterChain> {
    let mut chain = FilterChain::new();
    let Some(filter_obj) = dict_get(doc, dict, b"Filter") else {
        return Ok(chain);
    };
    match filter_obj {
        Object::Name(name) => {
            chain.push(known_filter(name)?);
        }
        Object::Array(items) => {
            for item in items {
                let resolved = resolve(doc, item);
                let name = name_of(resolved)
                    .ok_or_else(|| SlimError::UnsupportedFilter("non-name filter entry".into()))?;
                chain.push(known_filter(name)?);
            }
        }
        Object::Null => {}
        _ => return Err(SlimError::UnsupportedFilter("malformed Filter entry".into())),
    }
    Ok(chain)
}

fn known_filter(name: &[u8]) -> Result<StreamFilter> {
    StreamFilter::from_name(name).ok_or_else(|| {
        SlimError::UnsupportedFilter(String::from_utf8_lossy(name).into_owned())
    })
}

/// True when the chain parses and contains nothing the engine cannot decode.
/// Passes gate on this before calling [`decode_stream`].
pub fn all_filters_decodable(doc: &Document, dict: &Dictionary) -> bool {
    match filter_chain(doc, dict) {
        Ok(chain) => !chain.iter().any(|f| f.is_image_native()),
        Err(_) => false,
    }
}

pub fn has_image_native_filter(doc: &Document, dict: &Dictionary) -> bool {
    match filter_chain(doc, dict) {
        Ok(chain) => chain.iter().any(|f| f.is_image_native()),
        Err(_) => false,
    }
}

/// The `DecodeParms` dictionary for the filter at `index`, if any.
/// `DecodeParms` is a single dictionary for a one-filter stream or an array
/// parallel to the `Filter` array; `DP` is the short form.
pub fn decode_parms_for<'a>(
    doc: &'a Document,
    dict: &'a Dictionary,
    index: usize,
) -> Option<&'a Dictionary> {
    let parms = dict_get(doc, dict, b"DecodeParms").or_else(|| dict_get(doc, dict, b"DP"))?;
    match parms {
        Object::Dictionary(d) if index == 0 => Some(d),
        Object::Array(items) => match resolve(doc, items.get(index)?) {
            Object::Dictionary(d) => Some(d),
            _ => None,
        },
        _ => None,
    }
}

/// Decodes a stream payload through its full filter chain.
///
/// Prediction is not undone here; the image pass handles `Predictor` itself
/// (callers that cannot interpret predicted output must check `DecodeParms`).
pub fn decode_stream(doc: &Document, stream: &Stream) -> Result<Vec<u8>> {
    let chain = filter_chain(doc, &stream.dict)?;
    let mut data = stream.content.clone();
    for (index, filter) in chain.iter().enumerate() {
        data = match filter {
            StreamFilter::Flate => inflate(&data)?,
            StreamFilter::Lzw => {
                let early_change = decode_parms_for(doc, &stream.dict, index)
                    .and_then(|p| dict_get(doc, p, b"EarlyChange").and_then(as_integer))
                    .unwrap_or(1);
                lzw_decode(&data, early_change != 0)?
            }
            StreamFilter::Ascii85 => ascii85_decode(&data)?,
            StreamFilter::AsciiHex => asciihex_decode(&data)?,
            StreamFilter::RunLength => runlength_decode(&data)?,
            other => {
                return Err(SlimError::Decode(format!(
                    "refusing to decode image-native filter {}",
                    other.display_name()
                )))
            }
        };
    }
    Ok(data)
}

/// Inflates one zlib-wrapped FlateDecode payload.
pub fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    ZlibDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| SlimError::Decode(format!("inflate failed: {e}")))?;
    Ok(out)
}

/// Deflates at the maximum level. The single re-encode path used by the
/// recompression, subsetting, and replacement logic.
pub fn deflate_max(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder
        .write_all(data)
        .map_err(|e| SlimError::Encode(format!("deflate write failed: {e}")))?;
    encoder
        .finish()
        .map_err(|e| SlimError::Encode(format!("deflate finish failed: {e}")))
}

fn lzw_decode(data: &[u8], early_change: bool) -> Result<Vec<u8>> {
    let mut decoder = if early_change {
        weezl::decode::Decoder::with_tiff_size_switch(weezl::BitOrder::Msb, 8)
    } else {
        weezl::decode::Decoder::new(weezl::BitOrder::Msb, 8)
    };
    decoder
        .decode(data)
        .map_err(|e| SlimError::Decode(format!("LZW decode failed: {e}")))
}

fn ascii85_decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut group = [0u8; 5];
    let mut len = 0usize;
    let mut iter = data.iter().copied();
    while let Some(byte) = iter.next() {
        match byte {
            b'~' => break,
            b'z' if len == 0 => out.extend_from_slice(&[0, 0, 0, 0]),
            b'!'..=b'u' => {
                group[len] = byte - b'!';
                len += 1;
                if len == 5 {
                    push_base85_group(&mut out, &group, 5);
                    len = 0;
                }
            }
            b if b.is_ascii_whitespace() => {}
            other => {
                return Err(SlimError::Decode(format!(
                    "invalid ASCII85 byte 0x{other:02x}"
                )))
            }
        }
    }
    if len == 1 {
        return Err(SlimError::Decode("truncated ASCII85 group".into()));
    }
    if len > 1 {
        for slot in group.iter_mut().skip(len) {
            *slot = b'u' - b'!';
        }
        push_base85_group(&mut out, &group, len);
    }
    Ok(out)
}

fn push_base85_group(out: &mut Vec<u8>, group: &[u8; 5], present: usize) {
    let mut value: u32 = 0;
    for &digit in group {
        value = value.wrapping_mul(85).wrapping_add(u32::from(digit));
    }
    let bytes = value.to_be_bytes();
    out.extend_from_slice(&bytes[..present - 1]);
}

fn asciihex_decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut high: Option<u8> = None;
    for &byte in data {
        let digit = match byte {
            b'>' => break,
            b'0'..=b'9' => byte - b'0',
            b'a'..=b'f' => byte - b'a' + 10,
            b'A'..=b'F' => byte - b'A' + 10,
            b if b.is_ascii_whitespace() => continue,
            other => {
                return Err(SlimError::Decode(format!(
                    "invalid ASCIIHex byte 0x{other:02x}"
                )))
            }
        };
        match high.take() {
            Some(h) => out.push((h << 4) | digit),
            None => high = Some(digit),
        }
    }
    if let Some(h) = high {
        out.push(h << 4);
    }
    Ok(out)
}

fn runlength_decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut i = 0usize;
    while i < data.len() {
        let length = data[i];
        i += 1;
        match length {
            0..=127 => {
                let run = length as usize + 1;
                if i + run > data.len() {
                    return Err(SlimError::Decode("truncated RunLength literal".into()));
                }
                out.extend_from_slice(&data[i..i + run]);
                i += run;
            }
            128 => break,
            _ => {
                let Some(&byte) = data.get(i) else {
                    return Err(SlimError::Decode("truncated RunLength repeat".into()));
                };
                i += 1;
                out.extend(std::iter::repeat(byte).take(257 - length as usize));
            }
        }
    }
    Ok(out)
}

/// Undoes PNG prediction (filter types None/Sub/Up/Average/Paeth, one tag
/// byte per row). The previous row and the pixel left of the first column
/// are zero-initialized per the PNG reconstruction rules.
pub fn unpredict_png(data: &[u8], columns: usize, colors: usize, bits_per_component: usize) -> Result<Vec<u8>> {
    let bpp = ((colors * bits_per_component) / 8).max(1);
    let row_len = (columns * colors * bits_per_component + 7) / 8;
    let stride = row_len + 1;
    if stride == 1 || data.len() % stride != 0 {
        return Err(SlimError::Decode(format!(
            "predicted data length {} is not a multiple of stride {stride}",
            data.len()
        )));
    }

    let rows = data.len() / stride;
    let mut out = Vec::with_capacity(rows * row_len);
    let mut prev_row = vec![0u8; row_len];

    for row_index in 0..rows {
        let row_start = row_index * stride;
        let filter_type = data[row_start];
        let row = &data[row_start + 1..row_start + stride];
        let mut current = row.to_vec();

        match filter_type {
            0 => {}
            1 => {
                for i in bpp..row_len {
                    current[i] = current[i].wrapping_add(current[i - bpp]);
                }
            }
            2 => {
                for i in 0..row_len {
                    current[i] = current[i].wrapping_add(prev_row[i]);
                }
            }
            3 => {
                for i in 0..row_len {
                    let left = if i >= bpp { current[i - bpp] as u16 } else { 0 };
                    let up = prev_row[i] as u16;
                    current[i] = current[i].wrapping_add(((left + up) / 2) as u8);
                }
            }
            4 => {
                for i in 0..row_len {
                    let left = if i >= bpp { current[i - bpp] } else { 0 };
                    let up = prev_row[i];
                    let up_left = if i >= bpp { prev_row[i - bpp] } else { 0 };
                    current[i] = current[i].wrapping_add(paeth(left, up, up_left));
                }
            }
            other => {
                return Err(SlimError::Decode(format!(
                    "unknown PNG predictor row filter {other}"
                )))
            }
        }

        out.extend_from_slice(&current);
        prev_row = current;
    }

    Ok(out)
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = i16::from(a) + i16::from(b) - i16::from(c);
    let pa = (p - i16::from(a)).abs();
    let pb = (p - i16::from(b)).abs();
    let pc = (p - i16::from(c)).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

/// Human-readable filter names for the inspector.
pub fn filter_display_names(doc: &Document, dict: &Dictionary) -> Vec<String> {
    let mut names = Vec::new();
    let Some(filter_obj) = dict_get(doc, dict, b"Filter") else {
        return names;
    };
    let push = |names: &mut Vec<String>, obj: &Object| {
        if let Some(name) = name_of(obj) {
            names.push(String::from_utf8_lossy(name).into_owned());
        }
    };
    match filter_obj {
        Object::Name(_) => push(&mut names, filter_obj),
        Object::Array(items) => {
            for item in items {
                push(&mut names, resolve(doc, item));
            }
        }
        _ => {}
    }
    names
}
