//! Driver-level errors.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StampError>;

#[derive(Error, Debug)]
pub enum StampError {
    /// Failure reported by the overlay composer.
    #[error(transparent)]
    Composer(#[from] overlay_composer::Error),

    #[error("Cannot read names file {}: {source}", path.display())]
    NamesFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot list templates in {}: {source}", path.display())]
    TemplateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot create output directory {}: {source}", path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot read config file {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid config file {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl StampError {
    /// Whether the batch must stop rather than skip the current pair.
    pub fn is_batch_fatal(&self) -> bool {
        match self {
            StampError::Composer(err) => err.is_batch_fatal(),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composer_errors_keep_their_policy() {
        let skip: StampError = overlay_composer::Error::TemplateNotFound(PathBuf::from("a.pdf")).into();
        assert!(!skip.is_batch_fatal());
        assert_eq!(skip.to_string(), "Template not found: a.pdf");

        let fatal: StampError = overlay_composer::Error::FontNotFound {
            name: "Arial".into(),
            reason: "missing".into(),
        }
        .into();
        assert!(fatal.is_batch_fatal());
    }

    #[test]
    fn test_driver_errors_are_fatal() {
        let err = StampError::NamesFile {
            path: PathBuf::from("names.txt"),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.is_batch_fatal());
        assert!(err.to_string().starts_with("Cannot read names file names.txt"));
    }
}
