//! User settings (`settings.toml`).
//!
//! ```toml
//! [history]
//! limit = 100
//!
//! [recalc]
//! mode = "fixed-point"   # or "single-pass"
//!
//! [display]
//! locale = "en-US"       # or "de-DE"
//! ```
//!
//! Problems never stop the program: they are returned as warnings and the
//! affected settings keep their defaults.

use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use testsheet_core::{RecalcMode, SheetOptions};
use testsheet_engine::engine::DisplayLocale;

const MAX_SETTINGS_FILE_BYTES: u64 = 1_048_576; // 1 MiB

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsFile {
    history: Option<HistorySection>,
    recalc: Option<RecalcSection>,
    display: Option<DisplaySection>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct HistorySection {
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RecalcSection {
    mode: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DisplaySection {
    locale: Option<String>,
}

/// Load sheet options from `settings_file`, or from the user config dir when
/// none is given. Returns the options and any warnings.
pub fn load_settings(settings_file: Option<&PathBuf>) -> (SheetOptions, Vec<String>) {
    let mut warnings: Vec<String> = Vec::new();
    let mut options = SheetOptions::default();

    let Some(path) = settings_file.cloned().or_else(user_settings_path) else {
        return (options, warnings);
    };
    if !path.exists() {
        if settings_file.is_some() {
            warnings.push(format!("Settings file not found: {}", path.display()));
        }
        return (options, warnings);
    }

    let file = match read_settings_file(&path) {
        Ok(content) => match toml::from_str::<SettingsFile>(&content) {
            Ok(parsed) => parsed,
            Err(err) => {
                warnings.push(format!("Failed to parse {}: {}", path.display(), err));
                return (options, warnings);
            }
        },
        Err(err) => {
            warnings.push(format!("Failed to read {}: {}", path.display(), err));
            return (options, warnings);
        }
    };

    if let Some(limit) = file.history.and_then(|h| h.limit) {
        if limit == 0 {
            warnings.push("history.limit must be at least 1; keeping the default".to_string());
        } else {
            options.history_limit = limit;
        }
    }

    if let Some(mode) = file.recalc.and_then(|r| r.mode) {
        match mode.trim().to_ascii_lowercase().as_str() {
            "fixed-point" | "fixed_point" => options.recalc_mode = RecalcMode::FixedPoint,
            "single-pass" | "single_pass" => options.recalc_mode = RecalcMode::SinglePass,
            other => warnings.push(format!("Unknown recalc.mode '{}'", other)),
        }
    }

    if let Some(tag) = file.display.and_then(|d| d.locale) {
        match DisplayLocale::from_tag(&tag) {
            Some(locale) => options.locale = locale,
            None => warnings.push(format!("Unknown display.locale '{}'", tag)),
        }
    }

    (options, warnings)
}

fn read_settings_file(path: &Path) -> std::io::Result<String> {
    let meta = std::fs::metadata(path)?;
    if meta.len() > MAX_SETTINGS_FILE_BYTES {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!(
                "settings file too large ({} bytes, max {})",
                meta.len(),
                MAX_SETTINGS_FILE_BYTES
            ),
        ));
    }
    std::fs::read_to_string(path)
}

fn user_settings_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("", "", "testsheet")?;
    let mut path = proj.config_dir().to_path_buf();
    path.push("settings.toml");
    Some(path)
}
