use std::fs;
use std::path::Path;

use tracing::warn;

use crate::io::board_io::BoardError;
use crate::model::config::BoardConfig;

/// Name of the board configuration file
pub const CONFIG_FILE: &str = "taskboard.toml";

const CONFIG_HEADER: &str = "\
# Task board configuration.
# Columns are matched against task tags with spaces and `#` removed:
# the column \"Next week\" collects lines tagged #Nextweek.
";

/// Parse board settings leniently. Empty text is a new board; text that
/// does not parse as a board configuration falls back to the defaults.
pub fn parse_config(text: &str) -> BoardConfig {
    if text.trim().is_empty() {
        return BoardConfig::default();
    }
    match toml::from_str(text) {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "invalid {}, using default settings", CONFIG_FILE);
            BoardConfig::default()
        }
    }
}

/// Read the board config. A missing or unreadable file yields an error;
/// malformed content yields the defaults.
pub fn read_config(board_dir: &Path) -> Result<BoardConfig, BoardError> {
    let config_path = board_dir.join(CONFIG_FILE);
    let config_text = fs::read_to_string(&config_path).map_err(|e| BoardError::ReadError {
        path: config_path.clone(),
        source: e,
    })?;
    Ok(parse_config(&config_text))
}

/// Read the raw toml_edit document for round-trip-safe editing.
pub fn read_config_document(board_dir: &Path) -> Result<toml_edit::DocumentMut, BoardError> {
    let config_path = board_dir.join(CONFIG_FILE);
    let config_text = fs::read_to_string(&config_path).map_err(|e| BoardError::ReadError {
        path: config_path.clone(),
        source: e,
    })?;
    Ok(config_text.parse()?)
}

/// Write the config document back to disk, preserving formatting.
pub fn write_config(board_dir: &Path, doc: &toml_edit::DocumentMut) -> Result<(), BoardError> {
    let config_path = board_dir.join(CONFIG_FILE);
    fs::write(&config_path, doc.to_string()).map_err(|e| BoardError::WriteError {
        path: config_path,
        source: e,
    })?;
    Ok(())
}

/// Render a new configuration file
pub fn render_config(config: &BoardConfig) -> Result<String, BoardError> {
    Ok(format!("{}\n{}", CONFIG_HEADER, toml::to_string(config)?))
}

/// Append a column. Returns false if a column with that name exists.
pub fn add_column(doc: &mut toml_edit::DocumentMut, name: &str) -> bool {
    if !doc.contains_key("columns") {
        doc["columns"] = toml_edit::value(toml_edit::Array::new());
    }
    let Some(columns) = doc["columns"].as_array_mut() else {
        return false;
    };
    if columns.iter().any(|c| c.as_str() == Some(name)) {
        return false;
    }
    columns.push(name);
    true
}

/// Remove a column by name. Returns false if it was not configured.
pub fn remove_column(doc: &mut toml_edit::DocumentMut, name: &str) -> bool {
    let Some(columns) = doc.get_mut("columns").and_then(|c| c.as_array_mut()) else {
        return false;
    };
    let before = columns.len();
    columns.retain(|c| c.as_str() != Some(name));
    columns.len() != before
}
