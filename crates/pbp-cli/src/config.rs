//! Settings file (`pbp.toml`).
//!
//! ```toml
//! user_name = "ana"
//! partner_name = "model"
//! max_continuations = 5
//! diff_context = 5
//! apply = false
//! backend_cmd = "llm -m fast"
//! model = "fast"
//! template = "prompts/pair.txt"
//! history_dir = "/home/ana/.pbp/history"
//! files = ["src/main.rs", "Cargo.toml"]
//! part_limit = 20000
//! ```
//!
//! Every key is optional. Command-line flags override the file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use pbp_driver::DriverConfig;
use pbp_session::SessionConfig;
use serde::Deserialize;

pub const DEFAULT_FILE: &str = "pbp.toml";

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub user_name: Option<String>,
    pub partner_name: Option<String>,
    pub max_continuations: Option<usize>,
    pub diff_context: Option<usize>,
    pub apply: bool,
    pub backend_cmd: Option<String>,
    pub model: Option<String>,
    pub template: Option<PathBuf>,
    pub history_dir: Option<PathBuf>,
    pub files: Vec<String>,
    pub part_limit: Option<usize>,
}

impl Settings {
    pub fn session_config(&self) -> SessionConfig {
        let defaults = SessionConfig::default();
        SessionConfig {
            max_continuations: self.max_continuations.unwrap_or(defaults.max_continuations),
            user_name: self.user_name.clone().unwrap_or(defaults.user_name),
            partner_name: self.partner_name.clone().unwrap_or(defaults.partner_name),
            part_limit: self.part_limit,
        }
    }

    pub fn driver_config(&self, apply: bool) -> DriverConfig {
        let defaults = DriverConfig::default();
        DriverConfig {
            diff_context: self.diff_context.unwrap_or(defaults.diff_context),
            apply: apply || self.apply,
        }
    }

    /// Where conversations are saved: the configured directory, else
    /// `~/.pbp/history`.
    pub fn history_dir(&self) -> PathBuf {
        self.history_dir.clone().unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
            PathBuf::from(home).join(".pbp").join("history")
        })
    }
}

pub fn parse(text: &str) -> Result<Settings> {
    toml::from_str(text).context("invalid settings")
}

/// Load `explicit`, or `pbp.toml` in the working directory when it
/// exists, or defaults.
///
/// # Errors
///
/// Returns an error if an explicitly named file is missing, or if a
/// settings file cannot be read or parsed.
pub fn load(explicit: Option<&Path>) -> Result<Settings> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_FILE);
            if !default.exists() {
                return Ok(Settings::default());
            }
            default
        }
    };
    let text = fs::read_to_string(&path).with_context(|| format!("cannot read {}", path.display()))?;
    let settings = parse(&text).with_context(|| format!("in {}", path.display()))?;
    tracing::debug!(path = %path.display(), "settings loaded");
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let settings = parse("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.session_config(), SessionConfig::default());
        assert_eq!(settings.driver_config(false), DriverConfig::default());
    }

    #[test]
    fn values_override_defaults() {
        let settings = parse(
            r#"
            user_name = "ana"
            max_continuations = 2
            diff_context = 1
            apply = true
            files = ["src/main.rs"]
            "#,
        )
        .unwrap();
        let session = settings.session_config();
        assert_eq!(session.user_name, "ana");
        assert_eq!(session.partner_name, "partner");
        assert_eq!(session.max_continuations, 2);
        let driver = settings.driver_config(false);
        assert_eq!(driver.diff_context, 1);
        assert!(driver.apply);
        assert_eq!(settings.files, ["src/main.rs"]);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(parse("colour = true").is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(Some(&dir.path().join("nope.toml"))).is_err());

        let path = dir.path().join("pbp.toml");
        fs::write(&path, "partner_name = \"model\"\n").unwrap();
        assert_eq!(load(Some(&path)).unwrap().partner_name.as_deref(), Some("model"));
    }
}
