//! Certificate composition
//!
//! [`CertificateComposer`] runs the whole pipeline for one template and one
//! line of text: main overlay, optional footer overlay, merge.

use crate::error::{Error, Result};
use crate::fonts::{FontRegistry, RegisteredFont};
use crate::merge::{merge_template_with_overlays, MergedPage};
use crate::overlay::{compose_footer, render_overlay_page, HorizontalAlignment, OverlaySpec};
use crate::template::TemplatePage;
use std::path::Path;

/// Layout options shared by every page a composer produces.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositionOptions {
    pub font_size: f32,
    /// Baseline of the main text, in points from the bottom edge.
    pub text_vertical_position: f32,
    pub add_footer: bool,
    pub add_date_to_footer: bool,
    pub footer_text: String,
    pub footer_font_size: f32,
    pub footer_vertical_position: f32,
    pub footer_alignment: HorizontalAlignment,
}

impl Default for CompositionOptions {
    fn default() -> Self {
        Self {
            font_size: 32.0,
            text_vertical_position: 280.0,
            add_footer: false,
            add_date_to_footer: false,
            footer_text: "Poznań".to_string(),
            footer_font_size: 12.0,
            footer_vertical_position: 15.0,
            footer_alignment: HorizontalAlignment::Exact(280.0),
        }
    }
}

impl CompositionOptions {
    pub fn validate(&self) -> Result<()> {
        positive("font size", self.font_size)?;
        finite("text vertical position", self.text_vertical_position)?;
        if self.add_footer {
            positive("footer font size", self.footer_font_size)?;
            finite("footer vertical position", self.footer_vertical_position)?;
            if let HorizontalAlignment::Exact(x) = self.footer_alignment {
                finite("footer horizontal position", x)?;
            }
        }
        Ok(())
    }
}

fn positive(what: &str, value: f32) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidParameter(format!("{} must be positive, got {}", what, value)))
    }
}

fn finite(what: &str, value: f32) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::InvalidParameter(format!("{} must be finite, got {}", what, value)))
    }
}

/// Stamps text onto templates with one font and one set of options.
#[derive(Debug, Clone)]
pub struct CertificateComposer {
    font: RegisteredFont,
    options: CompositionOptions,
}

impl CertificateComposer {
    /// Resolve `font_name` in `registry` and validate `options`.
    pub fn new(registry: &FontRegistry, font_name: &str, options: CompositionOptions) -> Result<Self> {
        options.validate()?;
        let font = registry.get(font_name)?;
        Ok(Self { font, options })
    }

    pub fn options(&self) -> &CompositionOptions {
        &self.options
    }

    pub fn font(&self) -> &RegisteredFont {
        &self.font
    }

    /// Stamp `text` centered on `template`, plus the footer when enabled.
    ///
    /// `footer_date` is only used when the footer carries a date.
    pub fn compose(&self, template: &TemplatePage, text: &str, footer_date: &str) -> Result<MergedPage> {
        let (width, height) = template.page_size();

        let main_spec = OverlaySpec::new(text, self.options.font_size, self.options.text_vertical_position);
        let main = render_overlay_page(&self.font, width, height, &main_spec)?;

        let footer = if self.options.add_footer {
            let footer_text = compose_footer(
                &self.options.footer_text,
                self.options.add_date_to_footer,
                footer_date,
            );
            let spec = OverlaySpec::new(
                footer_text,
                self.options.footer_font_size,
                self.options.footer_vertical_position,
            )
            .with_alignment(self.options.footer_alignment);
            Some(render_overlay_page(&self.font, width, height, &spec)?)
        } else {
            None
        };

        merge_template_with_overlays(template, &main, footer.as_ref())
    }

    /// Load `template_path`, stamp `text` and write the result to `output`.
    pub fn compose_to_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        template_path: P,
        text: &str,
        footer_date: &str,
        output: Q,
    ) -> Result<MergedPage> {
        let template = TemplatePage::load(template_path)?;
        let merged = self.compose(&template, text, footer_date)?;
        merged.save(output)?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FONT_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/assets/fonts/DejaVuSans.ttf");

    fn registry() -> FontRegistry {
        let mut registry = FontRegistry::new();
        registry.register("DejaVu", FONT_PATH).unwrap();
        registry
    }

    #[test]
    fn test_default_options() {
        let options = CompositionOptions::default();
        assert_eq!(options.font_size, 32.0);
        assert_eq!(options.text_vertical_position, 280.0);
        assert_eq!(options.footer_alignment, HorizontalAlignment::Exact(280.0));
        assert_eq!(options.footer_text, "Poznań");
        assert!(!options.add_footer);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_unknown_font_is_rejected() {
        let err = CertificateComposer::new(&registry(), "Arial", CompositionOptions::default()).unwrap_err();
        assert!(err.is_batch_fatal());
    }

    #[test]
    fn test_invalid_options_are_rejected() {
        let options = CompositionOptions {
            font_size: 0.0,
            ..CompositionOptions::default()
        };
        let err = CertificateComposer::new(&registry(), "DejaVu", options).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }

    #[test]
    fn test_footer_settings_ignored_when_footer_disabled() {
        let options = CompositionOptions {
            footer_font_size: -1.0,
            ..CompositionOptions::default()
        };
        assert!(options.validate().is_ok());

        let options = CompositionOptions {
            add_footer: true,
            ..options
        };
        assert!(options.validate().is_err());
    }
}
