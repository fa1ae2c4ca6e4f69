//! Options and remap file loading for mdconv
//!
//! Options come from an explicit JSON/TOML file or from the platform
//! configuration directory. The link remap side file is a plain
//! line-oriented list of `source  replacement` pairs.

use crate::config::ProcessorOptions;
use crate::error::{Error, Result, ResultExt};
use log::{debug, info};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Application name used for the config directory
const APP_NAME: &str = "mdconv";

/// Default options file name
const OPTIONS_FILE_NAME: &str = "options.toml";

/// Prefix of comment lines in the remap side file
const REMAP_COMMENT_PREFIX: &str = "//";

// ─────────────────────────────────────────────────────────────────────────────
// Platform-Specific Directory Resolution
// ─────────────────────────────────────────────────────────────────────────────

/// Get the platform-specific configuration directory for the application.
///
/// # Errors
///
/// Returns `Error::Application` if the config directory cannot be determined
/// (e.g., if the HOME environment variable is not set).
pub fn get_config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|base| base.join(APP_NAME))
        .ok_or_else(|| Error::Application("Configuration directory not found".to_string()))
}

/// Path of the options file loaded when no `--config` is given.
pub fn default_options_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join(OPTIONS_FILE_NAME))
}

// ─────────────────────────────────────────────────────────────────────────────
// Load Options
// ─────────────────────────────────────────────────────────────────────────────

/// Load options from a JSON or TOML file, chosen by extension.
///
/// Files with any extension other than `.json` are read as TOML. An empty
/// file yields default options.
///
/// # Errors
///
/// - `Error::ConfigLoad`: the file cannot be read
/// - `Error::ConfigParse`: the contents are not valid for the format
pub fn load_options(path: &Path) -> Result<ProcessorOptions> {
    debug!("Loading options from: {}", path.display());

    let contents = fs::read_to_string(path).map_err(|e| Error::ConfigLoad {
        path: path.to_path_buf(),
        source: Box::new(e),
    })?;

    if contents.trim().is_empty() {
        debug!("Options file is empty, using defaults");
        return Ok(ProcessorOptions::default());
    }

    let is_json = path
        .extension()
        .map_or(false, |e| e.to_string_lossy().eq_ignore_ascii_case("json"));
    let options = if is_json {
        ProcessorOptions::from_json_sanitized(&contents)?
    } else {
        ProcessorOptions::from_toml_sanitized(&contents)?
    };

    info!("Options loaded from {}", path.display());
    Ok(options)
}

/// Load options from the default location, falling back to defaults.
///
/// A missing file is not an error; an unreadable or corrupted one is logged
/// as a warning.
pub fn load_default_options() -> ProcessorOptions {
    default_options_path()
        .and_then(|path| {
            if path.exists() {
                load_options(&path)
            } else {
                debug!("No options file at {}, using defaults", path.display());
                Ok(ProcessorOptions::default())
            }
        })
        .unwrap_or_warn_default(ProcessorOptions::default(), "Failed to load options")
}

// ─────────────────────────────────────────────────────────────────────────────
// Remap Side File
// ─────────────────────────────────────────────────────────────────────────────

/// Parse remap pairs from text.
///
/// Each non-blank, non-`//` line holds a source address and its replacement
/// separated by whitespace. Lines with a single token are ignored.
pub fn parse_link_map(text: &str) -> HashMap<String, String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(REMAP_COMMENT_PREFIX))
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let source = parts.next()?;
            let replacement = parts.next()?;
            Some((source.to_string(), replacement.to_string()))
        })
        .collect()
}

/// Load the remap side file.
pub fn load_link_map(path: &Path) -> Result<HashMap<String, String>> {
    let contents = fs::read_to_string(path).map_err(|e| Error::ConfigLoad {
        path: path.to_path_buf(),
        source: Box::new(e),
    })?;
    let map = parse_link_map(&contents);
    debug!("Loaded {} remap entries from {}", map.len(), path.display());
    Ok(map)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
