//! Overlay Composer
//!
//! Stamps a line of text (and an optional dated footer) onto the first page
//! of a PDF template. Text is measured with fontdue, drawn on a transparent
//! overlay page with an embedded composite font, and merged onto the template
//! as a Form XObject with lopdf.
//!
//! ```no_run
//! use overlay_composer::{CertificateComposer, CompositionOptions, FontRegistry, TemplatePage};
//!
//! # fn main() -> overlay_composer::Result<()> {
//! let mut registry = FontRegistry::new();
//! registry.register("DejaVu", "assets/fonts/DejaVuSans.ttf")?;
//!
//! let composer = CertificateComposer::new(&registry, "DejaVu", CompositionOptions::default())?;
//! let template = TemplatePage::load("template/diploma.pdf")?;
//! composer.compose(&template, "Jane Doe", "2024.01.01")?.save("diploma_Jane_Doe.pdf")?;
//! # Ok(())
//! # }
//! ```

pub mod composer;
mod embedding;
pub mod error;
pub mod fonts;
pub mod merge;
pub mod overlay;
pub mod template;

pub use composer::{CertificateComposer, CompositionOptions};
pub use error::{Error, Result};
pub use fonts::{FontRegistry, RegisteredFont};
pub use merge::{merge_template_with_overlays, MergedPage};
pub use overlay::{
    compose_footer, render_named_overlay_page, render_overlay_page, HorizontalAlignment,
    OverlayPage, OverlaySpec, Placement, SIDE_MARGIN,
};
pub use template::TemplatePage;
