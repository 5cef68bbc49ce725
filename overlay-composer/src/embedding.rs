//! Composite font embedding
//!
//! Text is drawn with a Type0 font whose CIDs are the glyph indices of the
//! registered font (Identity-H encoding, identity CID-to-GID map). Only the
//! widths and Unicode mappings of glyphs that actually appear in the text are
//! written; the font program itself is embedded whole.

use crate::error::{Error, Result};
use crate::fonts::RegisteredFont;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::BTreeMap;
use std::io::Write;

/// Maximum entries per bfchar block allowed by the CMap format.
const BFCHAR_BLOCK: usize = 100;

/// Glyphs used by a piece of text: glyph index → (character, width in 1/1000 em).
pub(crate) fn used_glyphs(font: &RegisteredFont, text: &str) -> BTreeMap<u16, (char, f32)> {
    let mut glyphs = BTreeMap::new();
    for ch in text.chars() {
        if !font.has_glyph(ch) {
            log::warn!("Font '{}' has no glyph for {:?}, drawing .notdef", font.name(), ch);
        }
        glyphs
            .entry(font.glyph_index(ch))
            .or_insert_with(|| (ch, font.glyph_width(ch)));
    }
    glyphs
}

/// Build the TJ operand for `text`: glyph index strings interleaved with kerning adjustments.
pub(crate) fn glyph_run(font: &RegisteredFont, text: &str) -> Vec<Object> {
    let chars: Vec<char> = text.chars().collect();
    let mut tj = Vec::new();
    let mut pending: Vec<u8> = Vec::with_capacity(chars.len() * 2);

    for (i, &ch) in chars.iter().enumerate() {
        pending.extend_from_slice(&font.glyph_index(ch).to_be_bytes());

        if let Some(&next) = chars.get(i + 1) {
            let kern = font.kerning(ch, next);
            if kern != 0.0 {
                tj.push(Object::String(std::mem::take(&mut pending), StringFormat::Hexadecimal));
                // TJ numbers move the pen left, kerning values move it right.
                tj.push(Object::Real(-kern));
            }
        }
    }

    if !pending.is_empty() {
        tj.push(Object::String(pending, StringFormat::Hexadecimal));
    }
    tj
}

/// Object ids of a font embedded into one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EmbeddedFont {
    /// The Type0 font referenced from page resources.
    pub font_id: ObjectId,
    /// The FontFile2 stream, identical for every text drawn with the same font.
    pub program_id: ObjectId,
}

/// Add the Type0 font and its descendants to `doc`.
pub(crate) fn embed_font(doc: &mut Document, font: &RegisteredFont, text: &str) -> Result<EmbeddedFont> {
    let base_font = font.postscript_name();
    let glyphs = used_glyphs(font, text);
    let (ascent, descent) = font.vertical_extent();

    let font_file_id = doc.add_object(font_file_stream(font.data())?);

    let mut descriptor = Dictionary::new();
    descriptor.set("Type", Object::Name(b"FontDescriptor".to_vec()));
    descriptor.set("FontName", Object::Name(base_font.clone().into_bytes()));
    // Nonsymbolic: glyphs come from the Standard Latin character set.
    descriptor.set("Flags", Object::Integer(32));
    descriptor.set(
        "FontBBox",
        Object::Array(vec![
            Object::Integer(0),
            Object::Real(descent),
            Object::Integer(1000),
            Object::Real(ascent),
        ]),
    );
    descriptor.set("ItalicAngle", Object::Integer(0));
    descriptor.set("Ascent", Object::Real(ascent));
    descriptor.set("Descent", Object::Real(descent));
    descriptor.set("CapHeight", Object::Real(ascent * 0.8));
    descriptor.set("StemV", Object::Integer(80));
    descriptor.set("FontFile2", Object::Reference(font_file_id));
    let descriptor_id = doc.add_object(Object::Dictionary(descriptor));

    let mut cidfont = Dictionary::new();
    cidfont.set("Type", Object::Name(b"Font".to_vec()));
    cidfont.set("Subtype", Object::Name(b"CIDFontType2".to_vec()));
    cidfont.set("BaseFont", Object::Name(base_font.clone().into_bytes()));
    cidfont.set(
        "CIDSystemInfo",
        Object::Dictionary(Dictionary::from_iter([
            ("Registry", Object::string_literal("Adobe")),
            ("Ordering", Object::string_literal("Identity")),
            ("Supplement", Object::Integer(0)),
        ])),
    );
    cidfont.set("FontDescriptor", Object::Reference(descriptor_id));
    cidfont.set("DW", Object::Integer(1000));
    cidfont.set("W", widths_array(&glyphs));
    cidfont.set("CIDToGIDMap", Object::Name(b"Identity".to_vec()));
    let cidfont_id = doc.add_object(Object::Dictionary(cidfont));

    let tounicode_id = doc.add_object(tounicode_stream(&glyphs));

    let mut type0 = Dictionary::new();
    type0.set("Type", Object::Name(b"Font".to_vec()));
    type0.set("Subtype", Object::Name(b"Type0".to_vec()));
    type0.set("BaseFont", Object::Name(base_font.into_bytes()));
    type0.set("Encoding", Object::Name(b"Identity-H".to_vec()));
    type0.set("DescendantFonts", Object::Array(vec![Object::Reference(cidfont_id)]));
    type0.set("ToUnicode", Object::Reference(tounicode_id));

    Ok(EmbeddedFont {
        font_id: doc.add_object(Object::Dictionary(type0)),
        program_id: font_file_id,
    })
}

fn font_file_stream(data: &[u8]) -> Result<Stream> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| Error::Pdf(format!("failed to compress font program: {}", e)))?;
    let compressed = encoder
        .finish()
        .map_err(|e| Error::Pdf(format!("failed to compress font program: {}", e)))?;

    let mut dict = Dictionary::new();
    dict.set("Length1", Object::Integer(data.len() as i64));
    dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
    Ok(Stream::new(dict, compressed).with_compression(false))
}

fn widths_array(glyphs: &BTreeMap<u16, (char, f32)>) -> Object {
    let mut w = Vec::with_capacity(glyphs.len() * 2);
    for (&gid, &(_, width)) in glyphs {
        w.push(Object::Integer(i64::from(gid)));
        w.push(Object::Array(vec![Object::Real(width)]));
    }
    Object::Array(w)
}

fn tounicode_stream(glyphs: &BTreeMap<u16, (char, f32)>) -> Stream {
    let mut cmap = String::from(
        "/CIDInit /ProcSet findresource begin\n\
         12 dict begin\n\
         begincmap\n\
         /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
         /CMapName /Adobe-Identity-UCS def\n\
         /CMapType 2 def\n\
         1 begincodespacerange\n\
         <0000> <FFFF>\n\
         endcodespacerange\n",
    );

    let entries: Vec<(u16, char)> = glyphs.iter().map(|(&gid, &(ch, _))| (gid, ch)).collect();
    for block in entries.chunks(BFCHAR_BLOCK) {
        cmap.push_str(&format!("{} beginbfchar\n", block.len()));
        for &(gid, ch) in block {
            let mut units = [0u16; 2];
            let utf16: String = ch
                .encode_utf16(&mut units)
                .iter()
                .map(|unit| format!("{:04X}", unit))
                .collect();
            cmap.push_str(&format!("<{:04X}> <{}>\n", gid, utf16));
        }
        cmap.push_str("endbfchar\n");
    }

    cmap.push_str(
        "endcmap\n\
         CMapName currentdict /CMap defineresource pop\n\
         end\n\
         end\n",
    );
    Stream::new(Dictionary::new(), cmap.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::FontRegistry;

    const FONT_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/assets/fonts/DejaVuSans.ttf");

    fn font() -> RegisteredFont {
        FontRegistry::new().register("DejaVu", FONT_PATH).unwrap()
    }

    #[test]
    fn test_glyph_run_encodes_two_bytes_per_char() {
        let font = font();
        let run = glyph_run(&font, "Jane Doe");
        let bytes: usize = run
            .iter()
            .filter_map(|o| match o {
                Object::String(s, _) => Some(s.len()),
                _ => None,
            })
            .sum();
        assert_eq!(bytes, 2 * "Jane Doe".chars().count());
    }

    #[test]
    fn test_glyph_run_advance_matches_measurement() {
        let font = font();
        let text = "AVATAR Poznań";
        let run = glyph_run(&font, text);

        // Recompute the pen advance the way a PDF viewer does for TJ.
        let mut advance = 0.0;
        for item in &run {
            match item {
                Object::String(bytes, _) => {
                    for pair in bytes.chunks(2) {
                        let gid = u16::from_be_bytes([pair[0], pair[1]]);
                        let ch = text.chars().find(|&c| font.glyph_index(c) == gid).unwrap();
                        advance += font.glyph_width(ch);
                    }
                }
                Object::Real(adjust) => advance -= adjust,
                _ => unreachable!(),
            }
        }
        assert!((advance - font.text_units(text)).abs() < 1e-2);
    }

    #[test]
    fn test_used_glyphs_are_deduplicated() {
        let font = font();
        let glyphs = used_glyphs(&font, "anna");
        assert_eq!(glyphs.len(), 2);
    }

    #[test]
    fn test_tounicode_lists_every_glyph() {
        let font = font();
        let glyphs = used_glyphs(&font, "Poznań");
        let stream = tounicode_stream(&glyphs);
        let cmap = String::from_utf8(stream.content).unwrap();
        assert!(cmap.contains(&format!("{} beginbfchar", glyphs.len())));
        assert!(cmap.contains("<0144>"), "ń must map back to U+0144");
    }

    #[test]
    fn test_embed_font_builds_type0_chain() {
        let font = font();
        let mut doc = Document::with_version("1.5");
        let embedded = embed_font(&mut doc, &font, "Jane").unwrap();

        let type0 = doc.get_dictionary(embedded.font_id).unwrap();
        assert_eq!(type0.get(b"Subtype").unwrap().as_name().unwrap(), b"Type0");
        assert_eq!(type0.get(b"Encoding").unwrap().as_name().unwrap(), b"Identity-H");

        let descendants = type0.get(b"DescendantFonts").unwrap().as_array().unwrap();
        let cid_id = descendants[0].as_reference().unwrap();
        let cidfont = doc.get_dictionary(cid_id).unwrap();
        assert_eq!(cidfont.get(b"Subtype").unwrap().as_name().unwrap(), b"CIDFontType2");
        // "Jane" uses four distinct glyphs: gid + [width] per glyph.
        assert_eq!(cidfont.get(b"W").unwrap().as_array().unwrap().len(), 8);

        let descriptor_id = cidfont.get(b"FontDescriptor").unwrap().as_reference().unwrap();
        let descriptor = doc.get_dictionary(descriptor_id).unwrap();
        let program = descriptor.get(b"FontFile2").unwrap().as_reference().unwrap();
        assert_eq!(program, embedded.program_id);
    }
}
