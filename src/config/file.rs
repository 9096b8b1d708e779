//! Loading the configuration file.

use super::types::EasyTLConfig;
use crate::error::EasyTLError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Project-local config file name.
const LOCAL_CONFIG_NAME: &str = "easytl.toml";

/// Config file name within the XDG config directory.
const XDG_CONFIG_NAME: &str = "config.toml";

/// Application name for XDG directory lookup.
const APP_NAME: &str = "easytl";

/// Loads configuration from the first existing search path.
///
/// Search order:
/// 1. `./easytl.toml`
/// 2. `~/.config/easytl/config.toml`
///
/// Returns the defaults if neither exists.
///
/// # Errors
///
/// Returns a configuration error if a file exists but cannot be read,
/// parsed, or validated.
pub fn load() -> Result<EasyTLConfig, EasyTLError> {
    match search_paths().into_iter().find(|path| path.exists()) {
        Some(path) => from_path(&path),
        None => {
            debug!("no configuration file found; using defaults");
            Ok(EasyTLConfig::default())
        }
    }
}

/// Loads `explicit` if given, otherwise searches like [`load`].
///
/// Unlike the search, an explicit path that does not exist is an error.
///
/// # Errors
///
/// See [`from_path`].
pub fn load_from(explicit: Option<&Path>) -> Result<EasyTLConfig, EasyTLError> {
    match explicit {
        Some(path) => from_path(path),
        None => load(),
    }
}

/// Loads and validates configuration from a specific file.
///
/// # Errors
///
/// Returns a configuration error naming the file if it cannot be read,
/// contains invalid TOML, or fails validation.
pub fn from_path(path: &Path) -> Result<EasyTLConfig, EasyTLError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        EasyTLError::configuration(
            "config_file",
            format!("failed to read '{}': {}", path.display(), e),
        )
    })?;

    let config = from_str(&contents).map_err(|e| {
        EasyTLError::configuration(
            "config_file",
            format!("failed to load '{}': {}", path.display(), e),
        )
    })?;

    debug!(path = %path.display(), "loaded configuration");
    Ok(config)
}

/// Parses and validates configuration from a TOML string.
///
/// # Errors
///
/// Returns a configuration error if the TOML is invalid or a value fails
/// validation.
pub fn from_str(toml_str: &str) -> Result<EasyTLConfig, EasyTLError> {
    let config: EasyTLConfig = toml::from_str(toml_str)
        .map_err(|e| EasyTLError::configuration("config", format!("invalid TOML: {e}")))?;
    config.validate()?;
    Ok(config)
}

/// Returns the paths searched for a configuration file, in order.
#[must_use]
pub fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(LOCAL_CONFIG_NAME)];
    paths.extend(xdg_config_dir().map(|dir| dir.join(XDG_CONFIG_NAME)));
    paths
}

/// Returns `~/.config/easytl` (or the platform equivalent).
#[must_use]
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join(APP_NAME))
}

/// Returns `~/.local/share/easytl` (or the platform equivalent), where the
/// access token is kept.
#[must_use]
pub fn xdg_data_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|p| p.join(APP_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogLevel;
    use crate::translate::Provider;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn from_str_parses_all_tables() {
        let toml = r#"
            [api]
            base_url = "https://easytl.example.com/api"
            timeout_secs = 120

            [defaults]
            provider = "Anthropic"
            model = "claude-3-opus-20240229"
            language = "Japanese"

            [logging]
            level = "warn"
            stderr = true
        "#;

        let config = from_str(toml).unwrap();

        assert_eq!(config.api.base_url, "https://easytl.example.com/api");
        assert_eq!(config.api.timeout_secs, Some(120));
        assert_eq!(config.api.translate_path, "/translate");
        assert_eq!(config.defaults.provider, Provider::Anthropic);
        assert_eq!(config.defaults.language.as_deref(), Some("Japanese"));
        assert_eq!(config.defaults.tone, "Formal; Polite");
        assert_eq!(config.logging.level, LogLevel::Warn);
        assert!(config.logging.stderr);
    }

    #[test]
    fn empty_string_is_default_config() {
        assert_eq!(from_str("").unwrap(), EasyTLConfig::default());
    }

    #[test]
    fn from_str_error_on_invalid_toml() {
        let err = from_str("this is not valid toml [[[").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn from_str_runs_validation() {
        let err = from_str("[defaults]\nprovider = \"Gemini\"\nmodel = \"gpt-4\"").unwrap_err();
        assert!(err.to_string().contains("defaults.model"));
    }

    #[test]
    fn from_path_reads_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("easytl.toml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "[api]\nbase_url = \"http://127.0.0.1:9000\"").unwrap();

        let config = from_path(&config_path).unwrap();
        assert_eq!(config.api.base_url, "http://127.0.0.1:9000");
    }

    #[test]
    fn from_path_error_names_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("broken.toml");
        std::fs::write(&config_path, "[api\n").unwrap();

        let err = from_path(&config_path).unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let result = load_from(Some(Path::new("/nonexistent/easytl.toml")));
        assert!(result.unwrap_err().is_configuration());
    }

    #[test]
    fn search_paths_start_with_local_file() {
        let paths = search_paths();
        assert_eq!(paths[0], PathBuf::from(LOCAL_CONFIG_NAME));
    }

    #[test]
    fn xdg_dirs_end_with_app_name() {
        if let Some(dir) = xdg_config_dir() {
            assert!(dir.ends_with(APP_NAME));
        }
        if let Some(dir) = xdg_data_dir() {
            assert!(dir.ends_with(APP_NAME));
        }
    }
}
