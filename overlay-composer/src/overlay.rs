//! Overlay page rendering
//!
//! An overlay is a standalone single-page PDF with the same page size as the
//! template it will be merged onto. It holds nothing but one line of text, so
//! the template shows through everywhere else.

use crate::embedding;
use crate::error::{Error, Result};
use crate::fonts::{FontRegistry, RegisteredFont};
use lopdf::{
    content::{Content, Operation},
    Dictionary, Document, Object, ObjectId, Stream,
};
use std::fmt;

/// Distance from the page edge used by left and right alignment, in points.
pub const SIDE_MARGIN: f32 = 25.0;

/// Resource name of the overlay font inside the overlay page.
const FONT_RESOURCE: &str = "F1";

/// Horizontal placement policy for a line of text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HorizontalAlignment {
    Left,
    Center,
    Right,
    /// Absolute x offset of the baseline start, in points.
    Exact(f32),
}

impl HorizontalAlignment {
    /// Parse an alignment name; `offset` is required for (and only used by) `exact`.
    pub fn parse(name: &str, offset: Option<f32>) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(HorizontalAlignment::Left),
            "center" => Ok(HorizontalAlignment::Center),
            "right" => Ok(HorizontalAlignment::Right),
            "exact" => match offset {
                Some(x) if x.is_finite() => Ok(HorizontalAlignment::Exact(x)),
                Some(x) => Err(Error::InvalidParameter(format!(
                    "exact horizontal offset must be finite, got {}",
                    x
                ))),
                None => Err(Error::InvalidAlignment(
                    "exact (without a horizontal offset)".to_string(),
                )),
            },
            _ => Err(Error::InvalidAlignment(name.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            HorizontalAlignment::Left => "left",
            HorizontalAlignment::Center => "center",
            HorizontalAlignment::Right => "right",
            HorizontalAlignment::Exact(_) => "exact",
        }
    }

    /// X coordinate of the text start for a line `text_width` wide on a `page_width` page.
    pub fn resolve(&self, page_width: f32, text_width: f32) -> f32 {
        match *self {
            HorizontalAlignment::Left => SIDE_MARGIN,
            HorizontalAlignment::Center => (page_width - text_width) / 2.0,
            HorizontalAlignment::Right => page_width - text_width - SIDE_MARGIN,
            HorizontalAlignment::Exact(x) => x,
        }
    }
}

impl fmt::Display for HorizontalAlignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HorizontalAlignment::Exact(x) => write!(f, "exact({})", x),
            other => f.write_str(other.name()),
        }
    }
}

/// One line of text to draw on an overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlaySpec {
    pub text: String,
    pub font_size: f32,
    /// Baseline y coordinate, measured from the bottom of the page.
    pub vertical_position: f32,
    pub alignment: HorizontalAlignment,
}

impl OverlaySpec {
    /// A centered line; use [`OverlaySpec::with_alignment`] for other policies.
    pub fn new(text: impl Into<String>, font_size: f32, vertical_position: f32) -> Self {
        Self {
            text: text.into(),
            font_size,
            vertical_position,
            alignment: HorizontalAlignment::Center,
        }
    }

    pub fn with_alignment(mut self, alignment: HorizontalAlignment) -> Self {
        self.alignment = alignment;
        self
    }
}

/// Where the text ended up on the overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    /// Measured width of the text at the overlay's font size.
    pub text_width: f32,
}

/// A rendered single-page overlay.
#[derive(Debug, Clone)]
pub struct OverlayPage {
    document: Document,
    page_id: ObjectId,
    width: f32,
    height: f32,
    placement: Placement,
    spec: OverlaySpec,
    program: Option<(RegisteredFont, ObjectId)>,
}

impl OverlayPage {
    pub fn page_size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    pub fn spec(&self) -> &OverlaySpec {
        &self.spec
    }

    pub fn text(&self) -> &str {
        &self.spec.text
    }

    pub(crate) fn document(&self) -> &Document {
        &self.document
    }

    pub(crate) fn page_id(&self) -> ObjectId {
        self.page_id
    }

    /// Font drawn with and the id of its embedded program, if any text was drawn.
    pub(crate) fn font_program(&self) -> Option<(&RegisteredFont, ObjectId)> {
        self.program.as_ref().map(|(font, id)| (font, *id))
    }

    /// Serialize the overlay on its own, mostly useful for inspection.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut document = self.document.clone();
        let mut output = Vec::new();
        document.save_to(&mut output)?;
        Ok(output)
    }
}

/// Combine the footer text with the caller-supplied date.
///
/// The date is passed in (already formatted, e.g. `2024.01.01`) so the
/// result does not depend on the clock.
pub fn compose_footer(base_footer_text: &str, include_date: bool, current_date: &str) -> String {
    if include_date {
        format!("{}, {}", base_footer_text, current_date)
    } else {
        base_footer_text.to_string()
    }
}

/// Measure `spec.text`, place it according to `spec.alignment` and draw it on a
/// blank `page_width` × `page_height` page.
pub fn render_overlay_page(
    font: &RegisteredFont,
    page_width: f32,
    page_height: f32,
    spec: &OverlaySpec,
) -> Result<OverlayPage> {
    validate_dimension("page width", page_width)?;
    validate_dimension("page height", page_height)?;
    validate_dimension("font size", spec.font_size)?;
    if !spec.vertical_position.is_finite() {
        return Err(Error::InvalidParameter(format!(
            "vertical position must be finite, got {}",
            spec.vertical_position
        )));
    }

    let text_width = font.text_width(&spec.text, spec.font_size);
    let placement = Placement {
        x: spec.alignment.resolve(page_width, text_width),
        y: spec.vertical_position,
        text_width,
    };
    log::debug!(
        "Placing {:?} at ({:.2}, {:.2}), width {:.2}, alignment {}",
        spec.text,
        placement.x,
        placement.y,
        text_width,
        spec.alignment
    );

    let mut document = Document::with_version("1.5");
    let pages_id = document.new_object_id();

    let mut resources = Dictionary::new();
    let mut content = Content { operations: Vec::new() };
    let mut program = None;
    if !spec.text.is_empty() {
        let embedded = embedding::embed_font(&mut document, font, &spec.text)?;
        resources.set(
            "Font",
            Object::Dictionary(Dictionary::from_iter([(
                FONT_RESOURCE,
                Object::Reference(embedded.font_id),
            )])),
        );
        program = Some((font.clone(), embedded.program_id));
        content.operations = text_operations(font, spec, placement);
    }

    let content_id = document.add_object(Stream::new(Dictionary::new(), content.encode()?));

    let mut page_dict = Dictionary::new();
    page_dict.set("Type", Object::Name(b"Page".to_vec()));
    page_dict.set("Parent", Object::Reference(pages_id));
    page_dict.set("Resources", Object::Dictionary(resources));
    page_dict.set(
        "MediaBox",
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(page_width),
            Object::Real(page_height),
        ]),
    );
    page_dict.set("Contents", Object::Reference(content_id));
    let page_id = document.add_object(Object::Dictionary(page_dict));

    let pages_dict = Dictionary::from_iter([
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(vec![Object::Reference(page_id)])),
        ("Count", Object::Integer(1)),
    ]);
    document.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let info_id = document.add_object(Dictionary::from_iter([(
        "Producer",
        Object::string_literal("overlay-composer"),
    )]));
    let catalog_id = document.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    document.trailer.set("Root", Object::Reference(catalog_id));
    document.trailer.set("Info", Object::Reference(info_id));

    Ok(OverlayPage {
        document,
        page_id,
        width: page_width,
        height: page_height,
        placement,
        spec: spec.clone(),
        program,
    })
}

/// [`render_overlay_page`] with the font looked up by its registered name.
pub fn render_named_overlay_page(
    registry: &FontRegistry,
    font_name: &str,
    page_width: f32,
    page_height: f32,
    spec: &OverlaySpec,
) -> Result<OverlayPage> {
    let font = registry.get(font_name)?;
    render_overlay_page(&font, page_width, page_height, spec)
}

fn text_operations(font: &RegisteredFont, spec: &OverlaySpec, placement: Placement) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new(
            "Tf",
            vec![
                Object::Name(FONT_RESOURCE.as_bytes().to_vec()),
                Object::Real(spec.font_size),
            ],
        ),
        Operation::new(
            "Tm",
            vec![
                Object::Real(1.0),
                Object::Real(0.0),
                Object::Real(0.0),
                Object::Real(1.0),
                Object::Real(placement.x),
                Object::Real(placement.y),
            ],
        ),
        Operation::new("TJ", vec![Object::Array(embedding::glyph_run(font, &spec.text))]),
        Operation::new("ET", vec![]),
    ]
}

fn validate_dimension(what: &str, value: f32) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidParameter(format!(
            "{} must be a positive number, got {}",
            what, value
        )))
    }
}
