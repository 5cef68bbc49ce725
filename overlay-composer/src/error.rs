//! Error types for the overlay composer.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for composer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while measuring, rendering, merging or writing pages.
#[derive(Error, Debug)]
pub enum Error {
    /// The template path does not exist.
    #[error("Template not found: {}", .0.display())]
    TemplateNotFound(PathBuf),

    /// The template exists but is not a usable PDF document.
    #[error("Template {} is unreadable: {reason}", path.display())]
    TemplateUnreadable { path: PathBuf, reason: String },

    /// The font file is missing, unparsable, or the name was never registered.
    #[error("Font '{name}' not found: {reason}")]
    FontNotFound { name: String, reason: String },

    /// Alignment is not one of left, center, right, exact.
    #[error("Invalid horizontal alignment '{0}': expected one of left, center, right, exact")]
    InvalidAlignment(String),

    /// A size or coordinate is out of range.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The merged page could not be written to its destination.
    #[error("Cannot write {}: {source}", path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// PDF object construction or encoding failed.
    #[error("PDF error: {0}")]
    Pdf(String),
}

impl Error {
    /// Whether a batch driver should stop instead of skipping the current pair.
    ///
    /// Only font failures qualify: every page depends on the measured glyph
    /// widths, so there is no meaningful way to continue without the font.
    pub fn is_batch_fatal(&self) -> bool {
        matches!(self, Error::FontNotFound { .. })
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        Error::Pdf(err.to_string())
    }
}

/// Serialization into an in-memory buffer; file writes report [`Error::OutputWrite`].
impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Pdf(format!("serialization failed: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidAlignment("diagonal".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid horizontal alignment 'diagonal': expected one of left, center, right, exact"
        );

        let err = Error::TemplateNotFound(PathBuf::from("template/missing.pdf"));
        assert_eq!(err.to_string(), "Template not found: template/missing.pdf");
    }

    #[test]
    fn test_only_font_errors_are_batch_fatal() {
        let font = Error::FontNotFound {
            name: "Arial".to_string(),
            reason: "missing".to_string(),
        };
        assert!(font.is_batch_fatal());

        let write = Error::OutputWrite {
            path: PathBuf::from("output/a.pdf"),
            source: io::Error::new(io::ErrorKind::NotFound, "no such directory"),
        };
        assert!(!write.is_batch_fatal());
        assert!(!Error::InvalidAlignment("up".into()).is_batch_fatal());
        assert!(!Error::Pdf("bad xref".into()).is_batch_fatal());
    }

    #[test]
    fn test_lopdf_error_conversion() {
        let err: Error = lopdf::Error::DictKey.into();
        assert!(matches!(err, Error::Pdf(_)));
    }

    #[test]
    fn test_io_error_conversion() {
        fn serialize() -> Result<()> {
            let written: io::Result<()> = Err(io::Error::new(io::ErrorKind::WriteZero, "buffer full"));
            written?;
            Ok(())
        }
        let err = serialize().unwrap_err();
        assert!(matches!(err, Error::Pdf(ref msg) if msg.contains("buffer full")));
        assert!(!err.is_batch_fatal());
    }
}
