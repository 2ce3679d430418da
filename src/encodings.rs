//! Fixed lookup tables: the 14 standard font names, the WinAnsi, MacRoman
//! and Standard encodings as 256-entry glyph-name tables, and the slice of
//! the Adobe Glyph List the encodings and common fonts actually reference.

/// The base-14 faces a viewer must supply without embedding.
pub const STANDARD_FONT_NAMES: [&str; 14] = [
    "Helvetica",
    "Helvetica-Bold",
    "Helvetica-Oblique",
    "Helvetica-BoldOblique",
    "Times-Roman",
    "Times-Bold",
    "Times-Italic",
    "Times-BoldItalic",
    "Courier",
    "Courier-Bold",
    "Courier-Oblique",
    "Courier-BoldOblique",
    "Symbol",
    "ZapfDingbats",
];

pub fn is_standard_font_name(name: &str) -> bool {
    STANDARD_FONT_NAMES.contains(&name)
}

/// Strips a `ABCDEF+` subset prefix (six uppercase letters plus `+`).
pub fn strip_subset_prefix(name: &str) -> &str {
    let bytes = name.as_bytes();
    if bytes.len() > 7 && bytes[6] == b'+' && bytes[..6].iter().all(u8::is_ascii_uppercase) {
        &name[7..]
    } else {
        name
    }
}

pub fn has_subset_prefix(name: &str) -> bool {
    strip_subset_prefix(name).len() != name.len()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseEncoding {
    WinAnsi,
    MacRoman,
    Standard,
}

impl BaseEncoding {
    pub fn from_name(name: &[u8]) -> Option<BaseEncoding> {
        match name {
            b"WinAnsiEncoding" => Some(BaseEncoding::WinAnsi),
            b"MacRomanEncoding" => Some(BaseEncoding::MacRoman),
            b"StandardEncoding" => Some(BaseEncoding::Standard),
            _ => None,
        }
    }
}

pub type EncodingTable = [Option<&'static str>; 256];

/// Builds the 256-entry glyph-name table for a predefined encoding.
pub fn encoding_table(encoding: BaseEncoding) -> EncodingTable {
    let mut table: EncodingTable = [None; 256];
    fill_latin_printable(&mut table);
    match encoding {
        BaseEncoding::WinAnsi => {
            for &(code, name) in WIN_ANSI_HIGH {
                table[code as usize] = Some(name);
            }
        }
        BaseEncoding::MacRoman => {
            for &(code, name) in MAC_ROMAN_HIGH {
                table[code as usize] = Some(name);
            }
        }
        BaseEncoding::Standard => {
            // Standard keeps the typographic quotes in the ASCII range.
            table[0x27] = Some("quoteright");
            table[0x60] = Some("quoteleft");
            for &(code, name) in STANDARD_HIGH {
                table[code as usize] = Some(name);
            }
        }
    }
    table
}

const ASCII_UPPER: [&str; 26] = [
    "A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "O", "P", "Q", "R", "S",
    "T", "U", "V", "W", "X", "Y", "Z",
];

const ASCII_LOWER: [&str; 26] = [
    "a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l", "m", "n", "o", "p", "q", "r", "s",
    "t", "u", "v", "w", "x", "y", "z",
];

const DIGIT_NAMES: [&str; 10] = [
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine",
];

const LATIN_PUNCTUATION: &[(u8, &str)] = &[
    (0x20, "space"),
    (0x21, "exclam"),
    (0x22, "quotedbl"),
    (0x23, "numbersign"),
    (0x24, "dollar"),
    (0x25, "percent"),
    (0x26, "ampersand"),
    (0x27, "quotesingle"),
    (0x28, "parenleft"),
    (0x29, "parenright"),
    (0x2A, "asterisk"),
    (0x2B, "plus"),
    (0x2C, "comma"),
    (0x2D, "hyphen"),
    (0x2E, "period"),
    (0x2F, "slash"),
    (0x3A, "colon"),
    (0x3B, "semicolon"),
    (0x3C, "less"),
    (0x3D, "equal"),
    (0x3E, "greater"),
    (0x3F, "question"),
    (0x40, "at"),
    (0x5B, "bracketleft"),
    (0x5C, "backslash"),
    (0x5D, "bracketright"),
    (0x5E, "asciicircum"),
    (0x5F, "underscore"),
    (0x60, "grave"),
    (0x7B, "braceleft"),
    (0x7C, "bar"),
    (0x7D, "braceright"),
    (0x7E, "asciitilde"),
];

fn fill_latin_printable(table: &mut EncodingTable) {
    for &(code, name) in LATIN_PUNCTUATION {
        table[code as usize] = Some(name);
    }
    for (i, &name) in DIGIT_NAMES.iter().enumerate() {
        table[0x30 + i] = Some(name);
    }
    for (i, &name) in ASCII_UPPER.iter().enumerate() {
        table[0x41 + i] = Some(name);
    }
    for (i, &name) in ASCII_LOWER.iter().enumerate() {
        table[0x61 + i] = Some(name);
    }
}

const WIN_ANSI_HIGH: &[(u8, &str)] = &[
    (0x80, "Euro"),
    (0x82, "quotesinglbase"),
    (0x83, "florin"),
    (0x84, "quotedblbase"),
    (0x85, "ellipsis"),
    (0x86, "dagger"),
    (0x87, "daggerdbl"),
    (0x88, "circumflex"),
    (0x89, "perthousand"),
    (0x8A, "Scaron"),
    (0x8B, "guilsinglleft"),
    (0x8C, "OE"),
    (0x8E, "Zcaron"),
    (0x91, "quoteleft"),
    (0x92, "quoteright"),
    (0x93, "quotedblleft"),
    (0x94, "quotedblright"),
    (0x95, "bullet"),
    (0x96, "endash"),
    (0x97, "emdash"),
    (0x98, "tilde"),
    (0x99, "trademark"),
    (0x9A, "scaron"),
    (0x9B, "guilsinglright"),
    (0x9C, "oe"),
    (0x9E, "zcaron"),
    (0x9F, "Ydieresis"),
    (0xA0, "space"),
    (0xA1, "exclamdown"),
    (0xA2, "cent"),
    (0xA3, "sterling"),
    (0xA4, "currency"),
    (0xA5, "yen"),
    (0xA6, "brokenbar"),
    (0xA7, "section"),
    (0xA8, "dieresis"),
    (0xA9, "copyright"),
    (0xAA, "ordfeminine"),
    (0xAB, "guillemotleft"),
    (0xAC, "logicalnot"),
    (0xAD, "hyphen"),
    (0xAE, "registered"),
    (0xAF, "macron"),
    (0xB0, "degree"),
    (0xB1, "plusminus"),
    (0xB2, "twosuperior"),
    (0xB3, "threesuperior"),
    (0xB4, "acute"),
    (0xB5, "mu"),
    (0xB6, "paragraph"),
    (0xB7, "periodcentered"),
    (0xB8, "cedilla"),
    (0xB9, "onesuperior"),
    (0xBA, "ordmasculine"),
    (0xBB, "guillemotright"),
    (0xBC, "onequarter"),
    (0xBD, "onehalf"),
    (0xBE, "threequarters"),
    (0xBF, "questiondown"),
    (0xC0, "Agrave"),
    (0xC1, "Aacute"),
    (0xC2, "Acircumflex"),
    (0xC3, "Atilde"),
    (0xC4, "Adieresis"),
    (0xC5, "Aring"),
    (0xC6, "AE"),
    (0xC7, "Ccedilla"),
    (0xC8, "Egrave"),
    (0xC9, "Eacute"),
    (0xCA, "Ecircumflex"),
    (0xCB, "Edieresis"),
    (0xCC, "Igrave"),
    (0xCD, "Iacute"),
    (0xCE, "Icircumflex"),
    (0xCF, "Idieresis"),
    (0xD0, "Eth"),
    (0xD1, "Ntilde"),
    (0xD2, "Ograve"),
    (0xD3, "Oacute"),
    (0xD4, "Ocircumflex"),
    (0xD5, "Otilde"),
    (0xD6, "Odieresis"),
    (0xD7, "multiply"),
    (0xD8, "Oslash"),
    (0xD9, "Ugrave"),
    (0xDA, "Uacute"),
    (0xDB, "Ucircumflex"),
    (0xDC, "Udieresis"),
    (0xDD, "Yacute"),
    (0xDE, "Thorn"),
    (0xDF, "germandbls"),
    (0xE0, "agrave"),
    (0xE1, "aacute"),
    (0xE2, "acircumflex"),
    (0xE3, "atilde"),
    (0xE4, "adieresis"),
    (0xE5, "aring"),
    (0xE6, "ae"),
    (0xE7, "ccedilla"),
    (0xE8, "egrave"),
    (0xE9, "eacute"),
    (0xEA, "ecircumflex"),
    (0xEB, "edieresis"),
    (0xEC, "igrave"),
    (0xED, "iacute"),
    (0xEE, "icircumflex"),
    (0xEF, "idieresis"),
    (0xF0, "eth"),
    (0xF1, "ntilde"),
    (0xF2, "ograve"),
    (0xF3, "oacute"),
    (0xF4, "ocircumflex"),
    (0xF5, "otilde"),
    (0xF6, "odieresis"),
    (0xF7, "divide"),
    (0xF8, "oslash"),
    (0xF9, "ugrave"),
    (0xFA, "uacute"),
    (0xFB, "ucircumflex"),
    (0xFC, "udieresis"),
    (0xFD, "yacute"),
    (0xFE, "thorn"),
    (0xFF, "ydieresis"),
];

const MAC_ROMAN_HIGH: &[(u8, &str)] = &[
    (0x80, "Adieresis"),
    (0x81, "Aring"),
    (0x82, "Ccedilla"),
    (0x83, "Eacute"),
    (0x84, "Ntilde"),
    (0x85, "Odieresis"),
    (0x86, "Udieresis"),
    (0x87, "aacute"),
    (0x88, "agrave"),
    (0x89, "acircumflex"),
    (0x8A, "adieresis"),
    (0x8B, "atilde"),
    (0x8C, "aring"),
    (0x8D, "ccedilla"),
    (0x8E, "eacute"),
    (0x8F, "egrave"),
    (0x90, "ecircumflex"),
    (0x91, "edieresis"),
    (0x92, "iacute"),
    (0x93, "igrave"),
    (0x94, "icircumflex"),
    (0x95, "idieresis"),
    (0x96, "ntilde"),
    (0x97, "oacute"),
    (0x98, "ograve"),
    (0x99, "ocircumflex"),
    (0x9A, "odieresis"),
    (0x9B, "otilde"),
    (0x9C, "uacute"),
    (0x9D, "ugrave"),
    (0x9E, "ucircumflex"),
    (0x9F, "udieresis"),
    (0xA0, "dagger"),
    (0xA1, "degree"),
    (0xA2, "cent"),
    (0xA3, "sterling"),
    (0xA4, "section"),
    (0xA5, "bullet"),
    (0xA6, "paragraph"),
    (0xA7, "germandbls"),
    (0xA8, "registered"),
    (0xA9, "copyright"),
    (0xAA, "trademark"),
    (0xAB, "acute"),
    (0xAC, "dieresis"),
    (0xAD, "notequal"),
    (0xAE, "AE"),
    (0xAF, "Oslash"),
    (0xB0, "infinity"),
    (0xB1, "plusminus"),
    (0xB2, "lessequal"),
    (0xB3, "greaterequal"),
    (0xB4, "yen"),
    (0xB5, "mu"),
    (0xB6, "partialdiff"),
    (0xB7, "summation"),
    (0xB8, "product"),
    (0xB9, "pi"),
    (0xBA, "integral"),
    (0xBB, "ordfeminine"),
    (0xBC, "ordmasculine"),
    (0xBD, "Omega"),
    (0xBE, "ae"),
    (0xBF, "oslash"),
    (0xC0, "questiondown"),
    (0xC1, "exclamdown"),
    (0xC2, "logicalnot"),
    (0xC3, "radical"),
    (0xC4, "florin"),
    (0xC5, "approxequal"),
    (0xC6, "Delta"),
    (0xC7, "guillemotleft"),
    (0xC8, "guillemotright"),
    (0xC9, "ellipsis"),
    (0xCA, "space"),
    (0xCB, "Agrave"),
    (0xCC, "Atilde"),
    (0xCD, "Otilde"),
    (0xCE, "OE"),
    (0xCF, "oe"),
    (0xD0, "endash"),
    (0xD1, "emdash"),
    (0xD2, "quotedblleft"),
    (0xD3, "quotedblright"),
    (0xD4, "quoteleft"),
    (0xD5, "quoteright"),
    (0xD6, "divide"),
    (0xD7, "lozenge"),
    (0xD8, "ydieresis"),
    (0xD9, "Ydieresis"),
    (0xDA, "fraction"),
    (0xDB, "currency"),
    (0xDC, "guilsinglleft"),
    (0xDD, "guilsinglright"),
    (0xDE, "fi"),
    (0xDF, "fl"),
    (0xE0, "daggerdbl"),
    (0xE1, "periodcentered"),
    (0xE2, "quotesinglbase"),
    (0xE3, "quotedblbase"),
    (0xE4, "perthousand"),
    (0xE5, "Acircumflex"),
    (0xE6, "Ecircumflex"),
    (0xE7, "Aacute"),
    (0xE8, "Edieresis"),
    (0xE9, "Egrave"),
    (0xEA, "Iacute"),
    (0xEB, "Icircumflex"),
    (0xEC, "Idieresis"),
    (0xED, "Igrave"),
    (0xEE, "Oacute"),
    (0xEF, "Ocircumflex"),
    (0xF0, "apple"),
    (0xF1, "Ograve"),
    (0xF2, "Uacute"),
    (0xF3, "Ucircumflex"),
    (0xF4, "Ugrave"),
    (0xF5, "dotlessi"),
    (0xF6, "circumflex"),
    (0xF7, "tilde"),
    (0xF8, "macron"),
    (0xF9, "breve"),
    (0xFA, "dotaccent"),
    (0xFB, "ring"),
    (0xFC, "cedilla"),
    (0xFD, "hungarumlaut"),
    (0xFE, "ogonek"),
    (0xFF, "caron"),
];

const STANDARD_HIGH: &[(u8, &str)] = &[
    (0xA1, "exclamdown"),
    (0xA2, "cent"),
    (0xA3, "sterling"),
    (0xA4, "fraction"),
    (0xA5, "yen"),
    (0xA6, "florin"),
    (0xA7, "section"),
    (0xA8, "currency"),
    (0xA9, "quotesingle"),
    (0xAA, "quotedblleft"),
    (0xAB, "guillemotleft"),
    (0xAC, "guilsinglleft"),
    (0xAD, "guilsinglright"),
    (0xAE, "fi"),
    (0xAF, "fl"),
    (0xB1, "endash"),
    (0xB2, "dagger"),
    (0xB3, "daggerdbl"),
    (0xB4, "periodcentered"),
    (0xB6, "paragraph"),
    (0xB7, "bullet"),
    (0xB8, "quotesinglbase"),
    (0xB9, "quotedblbase"),
    (0xBA, "quotedblright"),
    (0xBB, "guillemotright"),
    (0xBC, "ellipsis"),
    (0xBD, "perthousand"),
    (0xBF, "questiondown"),
    (0xC1, "grave"),
    (0xC2, "acute"),
    (0xC3, "circumflex"),
    (0xC4, "tilde"),
    (0xC5, "macron"),
    (0xC6, "breve"),
    (0xC7, "dotaccent"),
    (0xC8, "dieresis"),
    (0xCA, "ring"),
    (0xCB, "cedilla"),
    (0xCD, "hungarumlaut"),
    (0xCE, "ogonek"),
    (0xCF, "caron"),
    (0xD0, "emdash"),
    (0xE1, "AE"),
    (0xE3, "ordfeminine"),
    (0xE8, "Lslash"),
    (0xE9, "Oslash"),
    (0xEA, "OE"),
    (0xEB, "ordmasculine"),
    (0xF1, "ae"),
    (0xF5, "dotlessi"),
    (0xF8, "lslash"),
    (0xF9, "oslash"),
    (0xFA, "oe"),
    (0xFB, "germandbls"),
];

/// Resolves a glyph name to a Unicode codepoint: single-letter names map to
/// themselves, `uniXXXX` and `uXXXX`–`uXXXXXX` are parsed as hex, everything
/// else goes through the glyph-list table.
pub fn glyph_name_to_unicode(name: &str) -> Option<u32> {
    if name.len() == 1 {
        let byte = name.as_bytes()[0];
        if byte.is_ascii_graphic() {
            return Some(u32::from(byte));
        }
    }
    if let Some(hex) = name.strip_prefix("uni") {
        if hex.len() >= 4 && hex.as_bytes()[..4].iter().all(u8::is_ascii_hexdigit) {
            return u32::from_str_radix(&hex[..4], 16).ok();
        }
    }
    if let Some(hex) = name.strip_prefix('u') {
        if (4..=6).contains(&hex.len()) && hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            if let Ok(value) = u32::from_str_radix(hex, 16) {
                if char::from_u32(value).is_some() {
                    return Some(value);
                }
            }
        }
    }
    GLYPH_LIST
        .iter()
        .find(|(glyph, _)| *glyph == name)
        .map(|(_, codepoint)| *codepoint)
}

/// The slice of the Adobe Glyph List covering the three predefined encodings
/// plus the ligature and symbol names common in subset fonts.
const GLYPH_LIST: &[(&str, u32)] = &[
    ("AE", 0x00C6),
    ("Aacute", 0x00C1),
    ("Acircumflex", 0x00C2),
    ("Adieresis", 0x00C4),
    ("Agrave", 0x00C0),
    ("Aring", 0x00C5),
    ("Atilde", 0x00C3),
    ("Ccedilla", 0x00C7),
    ("Delta", 0x2206),
    ("Eacute", 0x00C9),
    ("Ecircumflex", 0x00CA),
    ("Edieresis", 0x00CB),
    ("Egrave", 0x00C8),
    ("Eth", 0x00D0),
    ("Euro", 0x20AC),
    ("Iacute", 0x00CD),
    ("Icircumflex", 0x00CE),
    ("Idieresis", 0x00CF),
    ("Igrave", 0x00CC),
    ("Lslash", 0x0141),
    ("Ntilde", 0x00D1),
    ("OE", 0x0152),
    ("Oacute", 0x00D3),
    ("Ocircumflex", 0x00D4),
    ("Odieresis", 0x00D6),
    ("Ograve", 0x00D2),
    ("Omega", 0x2126),
    ("Oslash", 0x00D8),
    ("Otilde", 0x00D5),
    ("Scaron", 0x0160),
    ("Thorn", 0x00DE),
    ("Uacute", 0x00DA),
    ("Ucircumflex", 0x00DB),
    ("Udieresis", 0x00DC),
    ("Ugrave", 0x00D9),
    ("Yacute", 0x00DD),
    ("Ydieresis", 0x0178),
    ("Zcaron", 0x017D),
    ("aacute", 0x00E1),
    ("acircumflex", 0x00E2),
    ("acute", 0x00B4),
    ("adieresis", 0x00E4),
    ("ae", 0x00E6),
    ("agrave", 0x00E0),
    ("ampersand", 0x0026),
    ("apple", 0xF8FF),
    ("approxequal", 0x2248),
    ("aring", 0x00E5),
    ("asciicircum", 0x005E),
    ("asciitilde", 0x007E),
    ("asterisk", 0x002A),
    ("at", 0x0040),
    ("atilde", 0x00E3),
    ("backslash", 0x005C),
    ("bar", 0x007C),
    ("braceleft", 0x007B),
    ("braceright", 0x007D),
    ("bracketleft", 0x005B),
    ("bracketright", 0x005D),
    ("breve", 0x02D8),
    ("brokenbar", 0x00A6),
    ("bullet", 0x2022),
    ("caron", 0x02C7),
    ("ccedilla", 0x00E7),
    ("cedilla", 0x00B8),
    ("cent", 0x00A2),
    ("circumflex", 0x02C6),
    ("colon", 0x003A),
    ("comma", 0x002C),
    ("copyright", 0x00A9),
    ("currency", 0x00A4),
    ("dagger", 0x2020),
    ("daggerdbl", 0x2021),
    ("degree", 0x00B0),
    ("dieresis", 0x00A8),
    ("divide", 0x00F7),
    ("dollar", 0x0024),
    ("dotaccent", 0x02D9),
    ("dotlessi", 0x0131),
    ("eacute", 0x00E9),
    ("ecircumflex", 0x00EA),
    ("edieresis", 0x00EB),
    ("egrave", 0x00E8),
    ("eight", 0x0038),
    ("ellipsis", 0x2026),
    ("emdash", 0x2014),
    ("endash", 0x2013),
    ("equal", 0x003D),
    ("eth", 0x00F0),
    ("exclam", 0x0021),
    ("exclamdown", 0x00A1),
    ("fi", 0xFB01),
    ("five", 0x0035),
    ("fl", 0xFB02),
    ("florin", 0x0192),
    ("four", 0x0034),
    ("fraction", 0x2044),
    ("germandbls", 0x00DF),
    ("grave", 0x0060),
    ("greater", 0x003E),
    ("greaterequal", 0x2265),
    ("guillemotleft", 0x00AB),
    ("guillemotright", 0x00BB),
    ("guilsinglleft", 0x2039),
    ("guilsinglright", 0x203A),
    ("hungarumlaut", 0x02DD),
    ("hyphen", 0x002D),
    ("iacute", 0x00ED),
    ("icircumflex", 0x00EE),
    ("idieresis", 0x00EF),
    ("igrave", 0x00EC),
    ("infinity", 0x221E),
    ("integral", 0x222B),
    ("lessequal", 0x2264),
    ("less", 0x003C),
    ("logicalnot", 0x00AC),
    ("lozenge", 0x25CA),
    ("lslash", 0x0142),
    ("macron", 0x00AF),
    ("mu", 0x00B5),
    ("multiply", 0x00D7),
    ("nine", 0x0039),
    ("notequal", 0x2260),
    ("ntilde", 0x00F1),
    ("numbersign", 0x0023),
    ("oacute", 0x00F3),
    ("ocircumflex", 0x00F4),
    ("odieresis", 0x00F6),
    ("oe", 0x0153),
    ("ogonek", 0x02DB),
    ("ograve", 0x00F2),
    ("one", 0x0031),
    ("onehalf", 0x00BD),
    ("onequarter", 0x00BC),
    ("onesuperior", 0x00B9),
    ("ordfeminine", 0x00AA),
    ("ordmasculine", 0x00BA),
    ("oslash", 0x00F8),
    ("otilde", 0x00F5),
    ("paragraph", 0x00B6),
    ("parenleft", 0x0028),
    ("parenright", 0x0029),
    ("partialdiff", 0x2202),
    ("percent", 0x0025),
    ("period", 0x002E),
    ("periodcentered", 0x00B7),
    ("perthousand", 0x2030),
    ("pi", 0x03C0),
    ("plus", 0x002B),
    ("plusminus", 0x00B1),
    ("product", 0x220F),
    ("question", 0x003F),
    ("questiondown", 0x00BF),
    ("quotedbl", 0x0022),
    ("quotedblbase", 0x201E),
    ("quotedblleft", 0x201C),
    ("quotedblright", 0x201D),
    ("quoteleft", 0x2018),
    ("quoteright", 0x2019),
    ("quotesinglbase", 0x201A),
    ("quotesingle", 0x0027),
    ("radical", 0x221A),
    ("registered", 0x00AE),
    ("ring", 0x02DA),
    ("scaron", 0x0161),
    ("section", 0x00A7),
    ("semicolon", 0x003B),
    ("seven", 0x0037),
    ("six", 0x0036),
    ("slash", 0x002F),
    ("space", 0x0020),
    ("sterling", 0x00A3),
    ("summation", 0x2211),
    ("three", 0x0033),
    ("threequarters", 0x00BE),
    ("threesuperior", 0x00B3),
    ("tilde", 0x02DC),
    ("trademark", 0x2122),
    ("two", 0x0032),
    ("twosuperior", 0x00B2),
    ("underscore", 0x005F),
    ("yen", 0x00A5),
    ("ydieresis", 0x00FF),
    ("yacute", 0x00FD),
    ("zcaron", 0x017E),
    ("zero", 0x0030),
];
