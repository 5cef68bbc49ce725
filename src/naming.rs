//! Output file naming.
//!
//! `{templateBaseName}_{text}.pdf`, where the base name is the template file
//! name up to its first `.`. Spaces and path separators anywhere in the
//! resulting name, base name included, are replaced by `_`.

use std::path::{Path, PathBuf};

/// Template file name up to its first `.` (`diploma.v2.pdf` → `diploma`).
pub fn template_base_name<P: AsRef<Path>>(template: P) -> String {
    let file_name = template
        .as_ref()
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    match file_name.split_once('.') {
        Some((base, _)) => base.to_string(),
        None => file_name,
    }
}

fn sanitize_text(text: &str) -> String {
    text.chars()
        .map(|ch| match ch {
            ' ' | '/' | '\\' => '_',
            other => other,
        })
        .collect()
}

pub fn output_file_name<P: AsRef<Path>>(template: P, text: &str) -> String {
    let stem = format!("{}_{}", template_base_name(template), text);
    format!("{}.pdf", sanitize_text(&stem))
}

pub fn output_path<D: AsRef<Path>, P: AsRef<Path>>(output_dir: D, template: P, text: &str) -> PathBuf {
    output_dir.as_ref().join(output_file_name(template, text))
}
