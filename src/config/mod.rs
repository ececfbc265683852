//! Configuration management.
//!
//! Settings are resolved per field with this priority:
//! 1. Explicit CLI flag (clap also folds in the matching `PARISH_*` env var)
//! 2. The JSON config file at `~/.parish/config.json` (or `PARISH_CONFIG`)
//! 3. Built-in default
//!
//! The file is optional; a missing file is the same as an empty one.

use crate::error::{Error, Result};
use chrono::Locale;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default address for `parish serve`.
pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

/// Default base URL the admin client talks to.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:3000";

/// Default unread-message poll period.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Contents of `~/.parish/config.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParishConfig {
    pub db_path: Option<PathBuf>,
    pub bind: Option<String>,
    pub admin_token: Option<String>,
    pub api_url: Option<String>,
    pub cors_origin: Option<String>,
    pub locale: Option<String>,
    pub poll_interval_secs: Option<u64>,
}

/// Values given on the command line (or their env var fallbacks).
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub db_path: Option<PathBuf>,
    pub bind: Option<String>,
    pub admin_token: Option<String>,
    pub api_url: Option<String>,
    pub cors_origin: Option<String>,
    pub locale: Option<String>,
}

/// Fully resolved settings used by the server and the admin client.
#[derive(Debug, Clone)]
pub struct Settings {
    pub db_path: PathBuf,
    pub bind: SocketAddr,
    pub admin_token: Option<String>,
    pub api_url: String,
    pub cors_origin: Option<String>,
    pub locale: Locale,
    pub poll_interval: Duration,
}

impl Settings {
    /// Merge CLI overrides over the config file over defaults.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the bind address or locale cannot be parsed,
    /// or if no database location can be determined.
    pub fn resolve(overrides: &Overrides, file: &ParishConfig) -> Result<Self> {
        let db_path = overrides
            .db_path
            .clone()
            .or_else(|| file.db_path.clone())
            .or_else(default_db_path)
            .ok_or_else(|| Error::Config("Could not determine home directory".into()))?;

        let bind_str = first_non_empty(&[overrides.bind.as_deref(), file.bind.as_deref()])
            .unwrap_or(DEFAULT_BIND);
        let bind = bind_str
            .parse::<SocketAddr>()
            .map_err(|e| Error::Config(format!("Invalid bind address '{bind_str}': {e}")))?;

        let admin_token = first_non_empty(&[
            overrides.admin_token.as_deref(),
            file.admin_token.as_deref(),
        ])
        .map(ToString::to_string);

        let api_url = first_non_empty(&[overrides.api_url.as_deref(), file.api_url.as_deref()])
            .unwrap_or(DEFAULT_API_URL)
            .trim_end_matches('/')
            .to_string();

        let cors_origin = first_non_empty(&[
            overrides.cors_origin.as_deref(),
            file.cors_origin.as_deref(),
        ])
        .map(ToString::to_string);

        let locale = match first_non_empty(&[overrides.locale.as_deref(), file.locale.as_deref()]) {
            Some(name) => parse_locale(name)?,
            None => Locale::en_US,
        };

        let poll_interval = Duration::from_secs(
            file.poll_interval_secs
                .filter(|s| *s > 0)
                .unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
        );

        Ok(Self {
            db_path,
            bind,
            admin_token,
            api_url,
            cors_origin,
            locale,
            poll_interval,
        })
    }
}

fn first_non_empty<'a>(candidates: &[Option<&'a str>]) -> Option<&'a str> {
    candidates
        .iter()
        .flatten()
        .copied()
        .map(str::trim)
        .find(|s| !s.is_empty())
}

/// Map a locale name (`pl_PL`, `pl-PL`, `en_US`) to a chrono locale.
///
/// Only the locales the admin panel ships translations for are accepted.
///
/// # Errors
///
/// Returns `Error::Config` for unsupported names.
pub fn parse_locale(name: &str) -> Result<Locale> {
    match name.replace('-', "_").as_str() {
        "en_US" | "en" => Ok(Locale::en_US),
        "en_GB" => Ok(Locale::en_GB),
        "pl_PL" | "pl" => Ok(Locale::pl_PL),
        "de_DE" | "de" => Ok(Locale::de_DE),
        "fr_FR" | "fr" => Ok(Locale::fr_FR),
        "es_ES" | "es" => Ok(Locale::es_ES),
        "it_IT" | "it" => Ok(Locale::it_IT),
        _ => Err(Error::Config(format!(
            "Unsupported locale '{name}' (use en_US, en_GB, pl_PL, de_DE, fr_FR, es_ES or it_IT)"
        ))),
    }
}

/// Get the global parish directory location (`~/.parish/`).
#[must_use]
pub fn global_parish_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".parish"))
}

/// Default database location: `~/.parish/data/parish.db`.
#[must_use]
pub fn default_db_path() -> Option<PathBuf> {
    global_parish_dir().map(|dir| dir.join("data").join("parish.db"))
}

/// Get the config file path.
///
/// `PARISH_CONFIG` overrides the default `~/.parish/config.json`.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("PARISH_CONFIG") {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    global_parish_dir()
        .map(|dir| dir.join("config.json"))
        .ok_or(Error::Config("Could not determine home directory".into()))
}

/// Load the config file from its default location.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config() -> Result<ParishConfig> {
    load_config_from(&config_path()?)
}

/// Load the config file from an explicit path.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config_from(path: &Path) -> Result<ParishConfig> {
    if !path.exists() {
        return Ok(ParishConfig::default());
    }

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read config file: {e}")))?;

    serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse config file: {e}")))
}

/// Get the default actor name for the audit trail.
///
/// Priority:
/// 1. `PARISH_ACTOR` environment variable
/// 2. System username
/// 3. "admin"
#[must_use]
pub fn default_actor() -> String {
    if let Ok(actor) = std::env::var("PARISH_ACTOR") {
        if !actor.is_empty() {
            return actor;
        }
    }

    if let Ok(user) = std::env::var("USER") {
        if !user.is_empty() {
            return user;
        }
    }

    "admin".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_actor() {
        assert!(!default_actor().is_empty());
    }

    #[test]
    fn test_override_beats_file() {
        let overrides = Overrides {
            db_path: Some(PathBuf::from("/tmp/flag.db")),
            bind: Some("0.0.0.0:8080".to_string()),
            ..Overrides::default()
        };
        let file = ParishConfig {
            db_path: Some(PathBuf::from("/tmp/file.db")),
            bind: Some("127.0.0.1:9000".to_string()),
            admin_token: Some("from-file".to_string()),
            ..ParishConfig::default()
        };

        let settings = Settings::resolve(&overrides, &file).unwrap();
        assert_eq!(settings.db_path, PathBuf::from("/tmp/flag.db"));
        assert_eq!(settings.bind.port(), 8080);
        assert_eq!(settings.admin_token.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_defaults() {
        let overrides = Overrides {
            db_path: Some(PathBuf::from("/tmp/x.db")),
            ..Overrides::default()
        };
        let settings = Settings::resolve(&overrides, &ParishConfig::default()).unwrap();
        assert_eq!(settings.bind.to_string(), DEFAULT_BIND);
        assert_eq!(settings.api_url, DEFAULT_API_URL);
        assert_eq!(settings.locale, Locale::en_US);
        assert_eq!(settings.poll_interval, Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS));
        assert!(settings.admin_token.is_none());
    }

    #[test]
    fn test_blank_values_fall_through() {
        let overrides = Overrides {
            db_path: Some(PathBuf::from("/tmp/x.db")),
            admin_token: Some("   ".to_string()),
            api_url: Some("http://parish.local/".to_string()),
            ..Overrides::default()
        };
        let settings = Settings::resolve(&overrides, &ParishConfig::default()).unwrap();
        assert!(settings.admin_token.is_none());
        assert_eq!(settings.api_url, "http://parish.local");
    }

    #[test]
    fn test_invalid_bind_is_config_error() {
        let overrides = Overrides {
            db_path: Some(PathBuf::from("/tmp/x.db")),
            bind: Some("not-an-address".to_string()),
            ..Overrides::default()
        };
        let err = Settings::resolve(&overrides, &ParishConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_parse_locale() {
        assert_eq!(parse_locale("pl-PL").unwrap(), Locale::pl_PL);
        assert_eq!(parse_locale("de").unwrap(), Locale::de_DE);
        assert!(parse_locale("xx_YY").is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"admin_token": "secret", "poll_interval_secs": 5}"#).unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.admin_token.as_deref(), Some("secret"));
        assert_eq!(config.poll_interval_secs, Some(5));

        let missing = load_config_from(&dir.path().join("missing.json")).unwrap();
        assert!(missing.admin_token.is_none());
    }
}
