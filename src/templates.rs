//! Template discovery.

use crate::error::{Result, StampError};
use std::fs;
use std::path::{Path, PathBuf};

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// PDF files directly inside `dir`, sorted by file name.
pub fn list_templates<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let dir_error = |source| StampError::TemplateDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut templates = Vec::new();
    for entry in fs::read_dir(dir).map_err(dir_error)? {
        let path = entry.map_err(dir_error)?.path();
        if path.is_file() && is_pdf(&path) {
            templates.push(path);
        } else {
            log::debug!("Ignoring non-template entry {}", path.display());
        }
    }
    templates.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    log::info!("Found {} templates in {}", templates.len(), dir.display());
    Ok(templates)
}
