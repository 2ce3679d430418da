//! Narrow interface to the font subsetter.
//!
//! The engine hands allsorts either a set of Unicode codepoints (resolved to
//! glyph ids through the font's `cmap`) or a set of glyph ids directly (the
//! cmap-less Identity-H case, where CIDs are glyph ids). With `retain_gids`
//! the kept range is widened to `0..=max_used` so allsorts' in-order
//! renumbering degenerates to the identity map and a CIDFont's Identity
//! CID→GID mapping keeps resolving.

use std::collections::BTreeSet;

use allsorts::binary::read::ReadScope;
use allsorts::font::read_cmap_subtable;
use allsorts::font_data::FontData;
use allsorts::tables::cmap::Cmap;
use allsorts::tables::FontTableProvider;
use allsorts::tag;

use crate::errors::{Result, SlimError};

#[derive(Debug, Clone)]
pub enum SubsetInput {
    /// Unicode codepoints; mapped to glyph ids through the font's cmap.
    Unicode(BTreeSet<u32>),
    /// Glyph ids, passed through as-is.
    GlyphIds(BTreeSet<u16>),
}

impl SubsetInput {
    pub fn is_empty(&self) -> bool {
        match self {
            SubsetInput::Unicode(set) => set.is_empty(),
            SubsetInput::GlyphIds(set) => set.is_empty(),
        }
    }
}

/// Subsets a TrueType/OpenType font program to the given character set.
pub fn subset_font(font_bytes: &[u8], input: &SubsetInput, retain_gids: bool) -> Result<Vec<u8>> {
    let scope = ReadScope::new(font_bytes);
    let font_file = scope
        .read::<FontData<'_>>()
        .map_err(|e| SlimError::FontSubset(format!("unreadable font program: {e:?}")))?;
    let provider = font_file
        .table_provider(0)
        .map_err(|e| SlimError::FontSubset(format!("no table provider: {e:?}")))?;

    let mut glyph_ids: BTreeSet<u16> = match input {
        SubsetInput::GlyphIds(ids) => ids.clone(),
        SubsetInput::Unicode(codepoints) => {
            let cmap_data = provider
                .read_table_data(tag::CMAP)
                .map_err(|e| SlimError::FontSubset(format!("missing cmap table: {e:?}")))?;
            let cmap = ReadScope::new(&cmap_data)
                .read::<Cmap<'_>>()
                .map_err(|e| SlimError::FontSubset(format!("bad cmap table: {e:?}")))?;
            let (_, subtable) = read_cmap_subtable(&cmap)
                .map_err(|e| SlimError::FontSubset(format!("bad cmap subtable: {e:?}")))?
                .ok_or_else(|| SlimError::FontSubset("no usable cmap subtable".to_string()))?;

            let mut ids = BTreeSet::new();
            for &cp in codepoints {
                if let Ok(Some(gid)) = subtable.map_glyph(cp) {
                    ids.insert(gid);
                }
            }
            ids
        }
    };

    if glyph_ids.is_empty() {
        return Err(SlimError::FontSubset("no glyphs to keep".to_string()));
    }

    // .notdef must survive every subset.
    glyph_ids.insert(0);

    let ordered: Vec<u16> = if retain_gids {
        let max = *glyph_ids.iter().next_back().unwrap_or(&0);
        (0..=max).collect()
    } else {
        glyph_ids.into_iter().collect()
    };

    allsorts::subset::subset(
        &provider,
        &ordered,
        &allsorts::subset::SubsetProfile::Pdf,
        allsorts::subset::CmapTarget::default(),
    )
    .map_err(|e| SlimError::FontSubset(format!("subsetting failed: {e:?}")))
}

/// Checks the TrueType/OpenType table directory for a `cmap` entry.
/// The directory starts at offset 12; entries are 16 bytes, tag first.
pub fn has_cmap_table(font_bytes: &[u8]) -> bool {
    if font_bytes.len() < 12 {
        return false;
    }
    let sfnt = &font_bytes[0..4];
    if sfnt != [0x00, 0x01, 0x00, 0x00] && sfnt != b"OTTO" && sfnt != b"true" {
        return false;
    }
    let num_tables = u16::from_be_bytes([font_bytes[4], font_bytes[5]]) as usize;
    if font_bytes.len() < 12 + num_tables * 16 {
        return false;
    }
    (0..num_tables).any(|i| {
        let offset = 12 + i * 16;
        &font_bytes[offset..offset + 4] == b"cmap"
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_sfnt(tags: &[&[u8; 4]]) -> Vec<u8> {
        let mut font = vec![0x00, 0x01, 0x00, 0x00];
        font.extend_from_slice(&(tags.len() as u16).to_be_bytes());
        font.extend_from_slice(&[0, 0, 0, 0, 0, 0]); // search params, unused here
        for tag in tags {
            font.extend_from_slice(*tag);
            font.extend_from_slice(&[0u8; 12]); // checksum, offset, length
        }
        font
    }

    #[test]
    fn cmap_table_detection() {
        assert!(has_cmap_table(&fake_sfnt(&[b"glyf", b"cmap", b"loca"])));
        assert!(!has_cmap_table(&fake_sfnt(&[b"glyf", b"loca"])));
        assert!(!has_cmap_table(b"not a font"));
    }

    #[test]
    fn truncated_directory_is_rejected() {
        let mut font = fake_sfnt(&[b"cmap"]);
        font.truncate(14);
        assert!(!has_cmap_table(&font));
    }

    #[test]
    fn empty_input_is_an_error() {
        let input = SubsetInput::Unicode(BTreeSet::new());
        assert!(input.is_empty());
        let result = subset_font(&fake_sfnt(&[b"cmap"]), &input, false);
        assert!(result.is_err());
    }
}
