//! Stable content hashing for the deduplication passes.
//!
//! Two 32-bit multiply-xor lanes are advanced per byte and folded into a
//! 64-bit digest rendered as base-36. Non-cryptographic by design: the
//! pipeline only needs collisions to be negligible across the tens of
//! thousands of streams a large document holds, and the digest must be
//! identical across runs and platforms.

use lopdf::{Dictionary, Object};

const LANE1_SEED: u32 = 0xdead_beef;
const LANE2_SEED: u32 = 0x41c6_ce57;

/// Hashes raw bytes into a base-36 digest string.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut h1 = LANE1_SEED;
    let mut h2 = LANE2_SEED;
    for &byte in bytes {
        h1 = (h1 ^ u32::from(byte)).wrapping_mul(2_654_435_761);
        h2 = (h2 ^ u32::from(byte)).wrapping_mul(1_597_334_677);
    }
    h1 = (h1 ^ (h1 >> 16)).wrapping_mul(2_246_822_507) ^ (h2 ^ (h2 >> 13)).wrapping_mul(3_266_489_909);
    h2 = (h2 ^ (h2 >> 16)).wrapping_mul(2_246_822_507) ^ (h1 ^ (h1 >> 13)).wrapping_mul(3_266_489_909);
    let digest = (u64::from(h2) << 32) | u64::from(h1);
    to_base36(digest)
}

/// Digest over a stream: canonical dictionary text (minus `Length`, which
/// merely tracks the payload) followed by the raw payload bytes.
pub fn stream_hash(dict: &Dictionary, payload: &[u8]) -> String {
    let mut buffer = canonical_dictionary_bytes(dict);
    buffer.extend_from_slice(payload);
    content_hash(&buffer)
}

/// Sorted `key=value` pairs joined by `|`, `Length` excluded.
fn canonical_dictionary_bytes(dict: &Dictionary) -> Vec<u8> {
    let mut entries: Vec<(&[u8], &Object)> = dict
        .iter()
        .filter(|(key, _)| key.as_slice() != b"Length")
        .map(|(key, value)| (key.as_slice(), value))
        .collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    let mut buffer = Vec::new();
    for (key, value) in entries {
        buffer.extend_from_slice(key);
        buffer.push(b'=');
        write_object_token(&mut buffer, value);
        buffer.push(b'|');
    }
    buffer
}

fn write_object_token(buffer: &mut Vec<u8>, obj: &Object) {
    match obj {
        Object::Null => buffer.extend_from_slice(b"null"),
        Object::Boolean(b) => buffer.extend_from_slice(if *b { b"true" } else { b"false" }),
        Object::Integer(i) => buffer.extend_from_slice(i.to_string().as_bytes()),
        Object::Real(r) => buffer.extend_from_slice(format!("{r}").as_bytes()),
        Object::Name(n) => {
            buffer.push(b'/');
            buffer.extend_from_slice(n);
        }
        Object::String(s, _) => {
            buffer.push(b'(');
            for byte in s {
                buffer.extend_from_slice(format!("{byte:02x}").as_bytes());
            }
            buffer.push(b')');
        }
        Object::Array(items) => {
            buffer.push(b'[');
            for item in items {
                write_object_token(buffer, item);
                buffer.push(b' ');
            }
            buffer.push(b']');
        }
        Object::Dictionary(dict) => {
            buffer.extend_from_slice(b"<<");
            buffer.extend_from_slice(&canonical_dictionary_bytes(dict));
            buffer.extend_from_slice(b">>");
        }
        Object::Stream(stream) => {
            // Streams are always indirect; a nested one only shows up in
            // malformed input. Hash its dictionary shape regardless.
            buffer.extend_from_slice(b"<<");
            buffer.extend_from_slice(&canonical_dictionary_bytes(&stream.dict));
            buffer.extend_from_slice(b">>stream");
        }
        Object::Reference(id) => {
            buffer.extend_from_slice(format!("R{},{}", id.0, id.1).as_bytes());
        }
    }
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.iter().rev().map(|&b| char::from(b)).collect()
}
