//! Names list parsing.

use crate::error::{Result, StampError};
use std::fs;
use std::path::Path;

/// One name per line, trimmed; blank lines are dropped.
pub fn parse_names(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read and parse a UTF-8 names file.
pub fn read_names<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| StampError::NamesFile {
        path: path.to_path_buf(),
        source,
    })?;
    let names = parse_names(&contents);
    log::info!("Read {} names from {}", names.len(), path.display());
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_lines_and_whitespace() {
        let names = parse_names("\n  Jane Doe \n\nJan Kowalski\n\n");
        assert_eq!(names, vec!["Jane Doe", "Jan Kowalski"]);
    }

    #[test]
    fn test_crlf_line_endings() {
        let names = parse_names("Jane Doe\r\nŁukasz Żółć\r\n");
        assert_eq!(names, vec!["Jane Doe", "Łukasz Żółć"]);
    }

    #[test]
    fn test_empty_file() {
        assert!(parse_names("").is_empty());
        assert!(parse_names("\n \n\t\n").is_empty());
    }

    #[test]
    fn test_missing_file() {
        let err = read_names("/nonexistent/names.txt").unwrap_err();
        assert!(matches!(err, StampError::NamesFile { .. }));
    }
}
