//! Font registry and text metrics
//!
//! Fonts are loaded once, registered under a logical name and shared by every
//! overlay that draws with them. Width measurement and PDF glyph widths both
//! come from the same fontdue metrics, so a measured string occupies exactly
//! the same width once drawn.

use crate::error::{Error, Result};
use fontdue::{Font, FontSettings};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Size at which glyph metrics are sampled: one em in PDF glyph space.
pub(crate) const GLYPH_SPACE_UNITS: f32 = 1000.0;

/// A loaded font, cheap to clone and shareable across threads.
#[derive(Clone)]
pub struct RegisteredFont {
    inner: Arc<FontData>,
}

struct FontData {
    name: String,
    path: Option<PathBuf>,
    font: Font,
    data: Vec<u8>,
}

impl std::fmt::Debug for RegisteredFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredFont")
            .field("name", &self.inner.name)
            .field("path", &self.inner.path)
            .field("bytes", &self.inner.data.len())
            .finish()
    }
}

impl RegisteredFont {
    fn from_bytes(name: &str, data: Vec<u8>, path: Option<PathBuf>) -> Result<Self> {
        check_sfnt_version(name, &data)?;
        let font = Font::from_bytes(data.as_slice(), FontSettings::default()).map_err(|e| {
            Error::FontNotFound {
                name: name.to_string(),
                reason: format!("failed to parse font data: {}", e),
            }
        })?;

        Ok(Self {
            inner: Arc::new(FontData {
                name: name.to_string(),
                path,
                font,
                data,
            }),
        })
    }

    /// Logical name the font was registered under.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Source file, when the font was registered from disk.
    pub fn path(&self) -> Option<&Path> {
        self.inner.path.as_deref()
    }

    /// Raw font program, embedded into every overlay that uses the font.
    pub fn data(&self) -> &[u8] {
        &self.inner.data
    }

    /// Whether both handles come from the same registration.
    pub(crate) fn same_font(&self, other: &RegisteredFont) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn font(&self) -> &Font {
        &self.inner.font
    }

    pub fn has_glyph(&self, ch: char) -> bool {
        self.inner.font.has_glyph(ch)
    }

    /// Glyph index used as the CID in the embedded font. Missing glyphs map to 0 (.notdef).
    pub fn glyph_index(&self, ch: char) -> u16 {
        self.inner.font.lookup_glyph_index(ch)
    }

    /// Advance width of a glyph in 1/1000 em.
    pub fn glyph_width(&self, ch: char) -> f32 {
        self.inner.font.metrics(ch, GLYPH_SPACE_UNITS).advance_width
    }

    /// Pair kerning in 1/1000 em (negative pulls the pair together).
    pub fn kerning(&self, left: char, right: char) -> f32 {
        self.inner
            .font
            .horizontal_kern(left, right, GLYPH_SPACE_UNITS)
            .unwrap_or(0.0)
    }

    /// Width of `text` in 1/1000 em, advances plus kerning.
    pub fn text_units(&self, text: &str) -> f32 {
        let chars: Vec<char> = text.chars().collect();
        let mut width = 0.0;
        for (i, &ch) in chars.iter().enumerate() {
            width += self.glyph_width(ch);
            if let Some(&next) = chars.get(i + 1) {
                width += self.kerning(ch, next);
            }
        }
        width
    }

    /// Width of `text` in points when drawn at `font_size`.
    pub fn text_width(&self, text: &str, font_size: f32) -> f32 {
        self.text_units(text) * font_size / GLYPH_SPACE_UNITS
    }

    /// Ascent and descent in 1/1000 em, falling back to typical Latin values.
    pub fn vertical_extent(&self) -> (f32, f32) {
        match self.inner.font.horizontal_line_metrics(GLYPH_SPACE_UNITS) {
            Some(m) => (m.ascent, m.descent),
            None => (880.0, -120.0),
        }
    }

    /// Name usable as a PDF BaseFont: ASCII alphanumerics, '-' and '_' only.
    pub fn postscript_name(&self) -> String {
        let raw = self.inner.font.name().unwrap_or(&self.inner.name);
        let mut out = String::with_capacity(raw.len());
        for ch in raw.chars() {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                out.push(ch);
            } else if ch.is_whitespace() {
                out.push('-');
            }
        }
        if out.is_empty() {
            "EmbeddedFont".to_string()
        } else {
            out
        }
    }
}

/// Only plain TrueType outlines can be embedded as FontFile2.
///
/// Collections (`ttcf`) and CFF-flavoured OpenType (`OTTO`) parse fine for
/// measurement but would be embedded as broken programs, so they are refused.
fn check_sfnt_version(name: &str, data: &[u8]) -> Result<()> {
    let unsupported = |kind: &str| Error::FontNotFound {
        name: name.to_string(),
        reason: format!("{} cannot be embedded, use a single TrueType font", kind),
    };
    match data.get(..4) {
        Some([0x00, 0x01, 0x00, 0x00]) | Some(b"true") => Ok(()),
        Some(b"ttcf") => Err(unsupported("TrueType collection")),
        Some(b"OTTO") => Err(unsupported("CFF-based OpenType font")),
        _ => Err(Error::FontNotFound {
            name: name.to_string(),
            reason: "not a TrueType font".to_string(),
        }),
    }
}

/// Caller-owned set of fonts keyed by logical name.
///
/// Registration is idempotent: registering a name a second time keeps the
/// first font and succeeds, so drivers can register unconditionally.
#[derive(Debug, Default, Clone)]
pub struct FontRegistry {
    fonts: HashMap<String, RegisteredFont>,
}

impl FontRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a TrueType file and register it under `name`.
    pub fn register<P: AsRef<Path>>(&mut self, name: &str, path: P) -> Result<RegisteredFont> {
        if let Some(existing) = self.fonts.get(name) {
            log::debug!("Font '{}' already registered, skipping", name);
            return Ok(existing.clone());
        }

        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FontNotFound {
                name: name.to_string(),
                reason: format!("font file {} does not exist", path.display()),
            });
        }

        let data = std::fs::read(path).map_err(|e| Error::FontNotFound {
            name: name.to_string(),
            reason: format!("cannot read {}: {}", path.display(), e),
        })?;

        log::info!("Loading font: {} from {}", name, path.display());
        let font = RegisteredFont::from_bytes(name, data, Some(path.to_path_buf()))?;
        self.fonts.insert(name.to_string(), font.clone());
        Ok(font)
    }

    /// Register an in-memory font program under `name`.
    pub fn register_bytes(&mut self, name: &str, data: Vec<u8>) -> Result<RegisteredFont> {
        if let Some(existing) = self.fonts.get(name) {
            log::debug!("Font '{}' already registered, skipping", name);
            return Ok(existing.clone());
        }

        let font = RegisteredFont::from_bytes(name, data, None)?;
        self.fonts.insert(name.to_string(), font.clone());
        Ok(font)
    }

    pub fn get(&self, name: &str) -> Result<RegisteredFont> {
        self.fonts.get(name).cloned().ok_or_else(|| Error::FontNotFound {
            name: name.to_string(),
            reason: "font has not been registered".to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fonts.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }
}
