//! ToUnicode CMap parsing.
//!
//! A font's ToUnicode stream is PostScript-flavored CMap text; the engine
//! needs only the `bfchar` and `bfrange` sections, which map character codes
//! (CIDs for composite fonts, code bytes for simple fonts) to Unicode.
//! Destination hex strings longer than four digits carry multiple UTF-16
//! units; surrogate pairs are folded to a single codepoint above U+FFFF.

use std::collections::BTreeMap;

use lopdf::{Dictionary, Document, Object};

use crate::filters::decode_stream;
use crate::graph::resolve;

/// Guard against absurd `bfrange` spans in damaged files.
const MAX_RANGE_SPAN: u32 = 0x1_0000;

/// The mapping from a character code to one or more Unicode codepoints.
#[derive(Debug, Default, Clone)]
pub struct ToUnicodeCMap {
    pub mappings: BTreeMap<u32, Vec<u32>>,
}

#[derive(Debug, PartialEq)]
enum Token {
    Hex(String),
    Word(String),
    ArrayOpen,
    ArrayClose,
}

impl ToUnicodeCMap {
    /// Parses CMap text. Lines outside bfchar/bfrange sections (codespace
    /// ranges, CIDSystemInfo, comments) are skipped.
    pub fn parse(input: &str) -> ToUnicodeCMap {
        let tokens = lex(input);
        let mut mappings = BTreeMap::new();
        let mut i = 0usize;

        while i < tokens.len() {
            match &tokens[i] {
                Token::Word(w) if w == "beginbfchar" => {
                    i += 1;
                    while i + 1 < tokens.len() {
                        match (&tokens[i], &tokens[i + 1]) {
                            (Token::Hex(src), Token::Hex(dst)) => {
                                if let Some(code) = parse_hex_u32(src) {
                                    mappings.insert(code, fold_destination(dst, 0));
                                }
                                i += 2;
                            }
                            _ => break,
                        }
                    }
                }
                Token::Word(w) if w == "beginbfrange" => {
                    i += 1;
                    while i + 2 < tokens.len() {
                        let (Token::Hex(lo), Token::Hex(hi)) = (&tokens[i], &tokens[i + 1]) else {
                            break;
                        };
                        let (Some(lo), Some(hi)) = (parse_hex_u32(lo), parse_hex_u32(hi)) else {
                            break;
                        };
                        match &tokens[i + 2] {
                            Token::Hex(dst) => {
                                let span = hi.saturating_sub(lo).min(MAX_RANGE_SPAN);
                                for step in 0..=span {
                                    mappings.insert(lo + step, fold_destination(dst, step));
                                }
                                i += 3;
                            }
                            Token::ArrayOpen => {
                                i += 3;
                                let mut code = lo;
                                while let Some(Token::Hex(dst)) = tokens.get(i) {
                                    if code <= hi {
                                        mappings.insert(code, fold_destination(dst, 0));
                                        code += 1;
                                    }
                                    i += 1;
                                }
                                if let Some(Token::ArrayClose) = tokens.get(i) {
                                    i += 1;
                                }
                            }
                            _ => break,
                        }
                    }
                }
                _ => i += 1,
            }
        }

        ToUnicodeCMap { mappings }
    }

    /// The Unicode codepoints a character code maps to, if any.
    pub fn codepoints(&self, code: u32) -> Option<&[u32]> {
        self.mappings.get(&code).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Looks for a `ToUnicode` entry on the font dictionary, decodes the
    /// stream and parses it. Returns `None` when the entry is absent or the
    /// stream cannot be decoded.
    pub fn from_font_dict(doc: &Document, font: &Dictionary) -> Option<ToUnicodeCMap> {
        let to_unicode = font.get(b"ToUnicode").ok()?;
        let stream = match resolve(doc, to_unicode) {
            Object::Stream(s) => s,
            _ => return None,
        };
        let content = decode_stream(doc, stream).ok()?;
        let text = String::from_utf8_lossy(&content);
        let cmap = Self::parse(&text);
        if cmap.is_empty() {
            None
        } else {
            Some(cmap)
        }
    }
}

fn lex(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '<' => {
                let mut hex = String::new();
                for h in chars.by_ref() {
                    if h == '>' {
                        break;
                    }
                    if h.is_ascii_hexdigit() {
                        hex.push(h);
                    }
                }
                tokens.push(Token::Hex(hex));
            }
            '[' => tokens.push(Token::ArrayOpen),
            ']' => tokens.push(Token::ArrayClose),
            '%' => {
                for h in chars.by_ref() {
                    if h == '\n' || h == '\r' {
                        break;
                    }
                }
            }
            c if c.is_whitespace() => {}
            c => {
                let mut word = String::new();
                word.push(c);
                while let Some(&next) = chars.peek() {
                    if next.is_whitespace() || matches!(next, '<' | '[' | ']' | '%') {
                        break;
                    }
                    word.push(next);
                    chars.next();
                }
                tokens.push(Token::Word(word));
            }
        }
    }
    tokens
}

fn parse_hex_u32(hex: &str) -> Option<u32> {
    if hex.is_empty() || hex.len() > 8 {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}

/// Splits a destination hex string into 16-bit units, applies the bfrange
/// step to the final unit, and folds surrogate pairs into scalar values.
fn fold_destination(hex: &str, step: u32) -> Vec<u32> {
    let mut units: Vec<u16> = Vec::new();
    if hex.len() <= 4 {
        if let Some(v) = parse_hex_u32(hex) {
            units.push(v as u16);
        }
    } else {
        let digits: Vec<u8> = hex.bytes().collect();
        for chunk in digits.chunks_exact(4) {
            let text = std::str::from_utf8(chunk).unwrap_or("");
            if let Ok(v) = u16::from_str_radix(text, 16) {
                units.push(v);
            }
        }
    }
    if units.is_empty() {
        return Vec::new();
    }
    if step > 0 {
        let last = units.len() - 1;
        units[last] = units[last].wrapping_add(step as u16);
    }

    let mut out = Vec::with_capacity(units.len());
    let mut iter = char::decode_utf16(units.iter().copied());
    loop {
        match iter.next() {
            Some(Ok(c)) => out.push(c as u32),
            Some(Err(e)) => out.push(u32::from(e.unpaired_surrogate())),
            None => break,
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_counted_bfchar_section() {
        let cmap_text = r#"
/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CMapName /Custom-UCS def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
3 beginbfchar
<0000> <0020>
<0009> <041f>
<000a> <0430>
endbfchar
endcmap
CMapName currentdict /CMap defineresource pop
end
end
"#;
        let cmap = ToUnicodeCMap::parse(cmap_text);
        assert_eq!(cmap.mappings.len(), 3);
        assert_eq!(cmap.codepoints(0x0000), Some(&[0x0020u32][..]));
        assert_eq!(cmap.codepoints(0x0009), Some(&[0x041Fu32][..]));
    }

    #[test]
    fn bfrange_incrementing_form() {
        let cmap = ToUnicodeCMap::parse("1 beginbfrange\n<0041> <0043> <0061>\nendbfrange");
        assert_eq!(cmap.codepoints(0x41), Some(&[0x61u32][..]));
        assert_eq!(cmap.codepoints(0x42), Some(&[0x62u32][..]));
        assert_eq!(cmap.codepoints(0x43), Some(&[0x63u32][..]));
        assert_eq!(cmap.codepoints(0x44), None);
    }

    #[test]
    fn bfrange_array_form() {
        let cmap = ToUnicodeCMap::parse("1 beginbfrange\n<0010> <0012> [<2013> <2014> <2026>]\nendbfrange");
        assert_eq!(cmap.codepoints(0x10), Some(&[0x2013u32][..]));
        assert_eq!(cmap.codepoints(0x11), Some(&[0x2014u32][..]));
        assert_eq!(cmap.codepoints(0x12), Some(&[0x2026u32][..]));
    }

    #[test]
    fn long_destination_folds_surrogate_pairs() {
        // D835 DC46 is the UTF-16 encoding of U+1D446.
        let cmap = ToUnicodeCMap::parse("1 beginbfchar\n<0005> <D835DC46>\nendbfchar");
        assert_eq!(cmap.codepoints(0x0005), Some(&[0x1D446u32][..]));
    }

    #[test]
    fn multi_codepoint_destination() {
        // One glyph expanding to "ffi".
        let cmap = ToUnicodeCMap::parse("1 beginbfchar\n<0007> <006600660069>\nendbfchar");
        assert_eq!(cmap.codepoints(0x0007), Some(&[0x66u32, 0x66, 0x69][..]));
    }
}
