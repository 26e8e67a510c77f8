//! Common utilities for runmerge-cmd

use std::path::Path;

use anyhow::{Context, Result};
use runmerge_index::MergeOptions;

/// Checks that a file exists and is a regular file.
pub fn validate_file_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("File does not exist: {}", path.display());
    }
    if !path.is_file() {
        anyhow::bail!("Path is not a file: {}", path.display());
    }
    Ok(())
}

/// Loads merge options from a JSON file, or the defaults when no file is given.
pub fn load_options(path: Option<&Path>) -> Result<MergeOptions> {
    let Some(path) = path else {
        return Ok(MergeOptions::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Invalid merge options in {}", path.display()))
}

/// Formats file size in human-readable format
pub fn format_size(size: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = size as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", size as u64, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

/// Renders a term for display, escaping bytes that are not printable ASCII.
pub fn display_term(term: &[u8]) -> String {
    term.escape_ascii().to_string()
}
