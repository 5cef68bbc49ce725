//! Stamping configuration
//!
//! Every field has a default, so a config file only needs the values it
//! changes. Command-line flags are applied on top by the binary.

use crate::error::{Result, StampError};
use chrono::NaiveDate;
use overlay_composer::{CompositionOptions, HorizontalAlignment};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Format of the date appended to the footer.
pub const FOOTER_DATE_FORMAT: &str = "%Y.%m.%d";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StampConfig {
    /// Logical font name the font file is registered under.
    pub font_name: String,
    pub font_path: PathBuf,
    pub font_size: f32,
    pub footer_font_size: f32,
    pub text_vertical_position: f32,
    pub footer_vertical_position: f32,
    /// One of left, center, right, exact.
    pub footer_horizontal_alignment: String,
    /// Footer x offset, used only with exact alignment.
    pub footer_horizontal_position_value: f32,
    pub add_footer: bool,
    pub add_date_to_footer: bool,
    pub footer_text: String,
    /// Fixed footer date; today's date when absent.
    pub footer_date: Option<String>,
    pub template_dir: PathBuf,
    pub names_file: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for StampConfig {
    fn default() -> Self {
        Self {
            font_name: "Arial".to_string(),
            font_path: PathBuf::from("arial.ttf"),
            font_size: 32.0,
            footer_font_size: 12.0,
            text_vertical_position: 280.0,
            footer_vertical_position: 15.0,
            footer_horizontal_alignment: "exact".to_string(),
            footer_horizontal_position_value: 280.0,
            add_footer: false,
            add_date_to_footer: false,
            footer_text: "Poznań".to_string(),
            footer_date: None,
            template_dir: PathBuf::from("template"),
            names_file: PathBuf::from("names.txt"),
            output_dir: PathBuf::from("output"),
        }
    }
}

impl StampConfig {
    /// Load a JSON config file; missing keys take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| StampError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: StampConfig =
            serde_json::from_str(&contents).map_err(|source| StampError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Footer alignment parsed from its configured name.
    pub fn footer_alignment(&self) -> Result<HorizontalAlignment> {
        let alignment = HorizontalAlignment::parse(
            &self.footer_horizontal_alignment,
            Some(self.footer_horizontal_position_value),
        )?;
        Ok(alignment)
    }

    /// Composer options derived from this configuration.
    pub fn composition_options(&self) -> Result<CompositionOptions> {
        Ok(CompositionOptions {
            font_size: self.font_size,
            text_vertical_position: self.text_vertical_position,
            add_footer: self.add_footer,
            add_date_to_footer: self.add_date_to_footer,
            footer_text: self.footer_text.clone(),
            footer_font_size: self.footer_font_size,
            footer_vertical_position: self.footer_vertical_position,
            footer_alignment: self.footer_alignment()?,
        })
    }

    /// Check everything that can be checked before any page is rendered.
    pub fn validate(&self) -> Result<()> {
        if self.font_name.trim().is_empty() {
            return Err(StampError::InvalidConfig("font_name must not be empty".to_string()));
        }
        if let Some(date) = &self.footer_date {
            if date.trim().is_empty() {
                return Err(StampError::InvalidConfig(
                    "footer_date must not be empty when set".to_string(),
                ));
            }
        }
        self.composition_options()?.validate()?;
        Ok(())
    }

    /// The configured footer date, or `today` as `YYYY.MM.DD`.
    pub fn resolved_footer_date(&self, today: NaiveDate) -> String {
        match &self.footer_date {
            Some(date) => date.clone(),
            None => today.format(FOOTER_DATE_FORMAT).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StampConfig::default();
        assert_eq!(config.font_name, "Arial");
        assert_eq!(config.font_size, 32.0);
        assert_eq!(config.footer_horizontal_alignment, "exact");
        assert_eq!(config.template_dir, PathBuf::from("template"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: StampConfig =
            serde_json::from_str(r#"{ "font_size": 28, "add_footer": true }"#).unwrap();
        assert_eq!(config.font_size, 28.0);
        assert!(config.add_footer);
        assert_eq!(config.footer_text, "Poznań");
        assert_eq!(config.output_dir, PathBuf::from("output"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stamp.json");
        fs::write(&path, r#"{ "footer_horizontal_alignment": "right", "footer_date": "2024.01.01" }"#)
            .unwrap();

        let config = StampConfig::load(&path).unwrap();
        assert_eq!(config.footer_alignment().unwrap(), HorizontalAlignment::Right);
        assert_eq!(config.footer_date.as_deref(), Some("2024.01.01"));
    }

    #[test]
    fn test_load_rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stamp.json");
        fs::write(&path, "{ font_size: ").unwrap();
        assert!(matches!(StampConfig::load(&path), Err(StampError::ConfigParse { .. })));
        assert!(matches!(
            StampConfig::load(dir.path().join("missing.json")),
            Err(StampError::ConfigRead { .. })
        ));
    }

    #[test]
    fn test_invalid_alignment_fails_validation() {
        let config = StampConfig {
            footer_horizontal_alignment: "middle".to_string(),
            ..StampConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            StampError::Composer(overlay_composer::Error::InvalidAlignment(_))
        ));
    }

    #[test]
    fn test_exact_alignment_uses_position_value() {
        let config = StampConfig {
            footer_horizontal_position_value: 120.0,
            ..StampConfig::default()
        };
        assert_eq!(config.footer_alignment().unwrap(), HorizontalAlignment::Exact(120.0));
    }

    #[test]
    fn test_resolved_footer_date() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(StampConfig::default().resolved_footer_date(today), "2024.03.07");

        let config = StampConfig {
            footer_date: Some("2023.12.31".to_string()),
            ..StampConfig::default()
        };
        assert_eq!(config.resolved_footer_date(today), "2023.12.31");
    }
}
