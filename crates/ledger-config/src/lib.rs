//! # ledger-config
//!
//! YAML configuration for tokenledger, read from
//! `~/.config/tokenledger/config.yaml` unless `TOKENLEDGER_CONFIG` or an
//! explicit path says otherwise.
//!
//! ```yaml
//! home_dir: /srv/dev-home
//! sources:
//!   codex_sessions_dir: ~/archive/codex/sessions
//! plan:
//!   provider: claude
//!   name: Max
//!   monthly_cost: 200.0
//! ```
//!
//! A missing default file is not an error: every field has a default and
//! source paths fall back to their well-known locations under the home
//! directory.

use std::path::{Path, PathBuf};

use ledger_core::{LedgerError, Result, paths};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Environment variable overriding the configuration file location.
pub const CONFIG_ENV_VAR: &str = "TOKENLEDGER_CONFIG";

/// Subscription plan the user pays for, shown next to API-equivalent spend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanConfig {
    /// Which assistant the plan belongs to (e.g. "claude")
    pub provider: String,

    /// Plan display name (e.g. "Max")
    pub name: String,

    /// Flat monthly price in USD
    pub monthly_cost: f64,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            provider: "claude".to_string(),
            name: "Max".to_string(),
            monthly_cost: 200.0,
        }
    }
}

/// Per-source path overrides. Unset entries use the default location.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceOverrides {
    pub claude_stats_cache: Option<PathBuf>,
    pub claude_projects_dir: Option<PathBuf>,
    pub codex_sessions_dir: Option<PathBuf>,
    pub cursor_db: Option<PathBuf>,
    pub gemini_dir: Option<PathBuf>,
}

impl SourceOverrides {
    /// Copy with a leading `~` in every set path expanded against `home`.
    pub fn expanded(&self, home: &Path) -> Self {
        let expand = |path: &Option<PathBuf>| path.as_ref().map(|p| paths::expand_tilde(p, home));
        Self {
            claude_stats_cache: expand(&self.claude_stats_cache),
            claude_projects_dir: expand(&self.claude_projects_dir),
            codex_sessions_dir: expand(&self.codex_sessions_dir),
            cursor_db: expand(&self.cursor_db),
            gemini_dir: expand(&self.gemini_dir),
        }
    }
}

/// Top-level configuration file contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base directory every default source path is resolved against
    pub home_dir: Option<PathBuf>,

    /// Per-source path overrides
    pub sources: SourceOverrides,

    /// Subscription plan
    pub plan: PlanConfig,
}

impl Config {
    /// Load configuration.
    ///
    /// With `path == None` the location comes from `TOKENLEDGER_CONFIG`, then
    /// the default path; a missing file yields [`Config::default`]. An
    /// explicitly requested file that does not exist is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match std::env::var_os(CONFIG_ENV_VAR).filter(|v| !v.is_empty()) {
                Some(p) => (PathBuf::from(p), true),
                None => (default_config_path()?, false),
            },
        };

        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if explicit {
                    return Err(LedgerError::config_not_found_with_source(&path, e));
                }
                debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(LedgerError::io("reading config", &path, e)),
        };

        let config = Self::from_yaml(&contents, &path)?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Parse configuration from YAML text. `origin` is used in error messages.
    pub fn from_yaml(contents: &str, origin: &Path) -> Result<Self> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self =
            serde_yaml::from_str(contents).map_err(|e| LedgerError::ConfigInvalid {
                path: origin.to_path_buf(),
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !self.plan.monthly_cost.is_finite() || self.plan.monthly_cost < 0.0 {
            return Err(LedgerError::ConfigValidation {
                message: format!(
                    "plan.monthly_cost must be a non-negative number, got {}",
                    self.plan.monthly_cost
                ),
            });
        }
        Ok(())
    }

    /// Home directory to resolve source paths against, with `~` expanded.
    pub fn resolved_home(&self) -> Result<PathBuf> {
        let home = paths::home_dir()?;
        Ok(match &self.home_dir {
            Some(dir) => paths::expand_tilde(dir, &home),
            None => home,
        })
    }

    /// Home directory for source paths: `home_override` when given,
    /// otherwise [`Config::resolved_home`].
    pub fn effective_home(&self, home_override: Option<&Path>) -> Result<PathBuf> {
        match home_override {
            Some(home) => Ok(home.to_path_buf()),
            None => self.resolved_home(),
        }
    }
}

/// Default configuration path: `~/.config/tokenledger/config.yaml`
pub fn default_config_path() -> Result<PathBuf> {
    Ok(paths::home_dir()?
        .join(".config")
        .join("tokenledger")
        .join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.home_dir.is_none());
        assert_eq!(config.plan.name, "Max");
        assert_eq!(config.plan.monthly_cost, 200.0);
        assert!(config.sources.codex_sessions_dir.is_none());
    }

    #[test]
    fn test_parse_partial_yaml() {
        let yaml = r#"
sources:
  codex_sessions_dir: /data/codex
plan:
  name: Pro
"#;
        let config = Config::from_yaml(yaml, Path::new("test.yaml")).unwrap();
        assert_eq!(
            config.sources.codex_sessions_dir,
            Some(PathBuf::from("/data/codex"))
        );
        assert!(config.sources.cursor_db.is_none());
        assert_eq!(config.plan.name, "Pro");
        // Unset plan fields keep their defaults
        assert_eq!(config.plan.provider, "claude");
        assert_eq!(config.plan.monthly_cost, 200.0);
    }

    #[test]
    fn test_invalid_yaml() {
        let err = Config::from_yaml("plan: [unterminated", Path::new("bad.yaml")).unwrap_err();
        assert!(matches!(err, LedgerError::ConfigInvalid { .. }));
        assert!(err.to_string().contains("bad.yaml"));
    }

    #[test]
    fn test_negative_plan_cost_rejected() {
        let err = Config::from_yaml("plan:\n  monthly_cost: -5\n", Path::new("c.yaml")).unwrap_err();
        assert!(matches!(err, LedgerError::ConfigValidation { .. }));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "home_dir: /srv/home\n").unwrap();

        let config = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(config.home_dir, Some(PathBuf::from("/srv/home")));
        assert_eq!(config.resolved_home().unwrap(), PathBuf::from("/srv/home"));
    }

    #[test]
    fn test_load_explicit_missing_file_is_error() {
        let dir = tempdir().unwrap();
        let err = Config::load(Some(dir.path().join("nope.yaml").as_path())).unwrap_err();
        assert!(matches!(err, LedgerError::ConfigNotFound { .. }));
    }

    #[test]
    #[serial]
    fn test_load_missing_default_uses_defaults() {
        let dir = tempdir().unwrap();
        // SAFETY: serialized with every other test that touches the environment
        unsafe {
            std::env::remove_var(CONFIG_ENV_VAR);
            std::env::set_var("HOME", dir.path());
        }
        let config = Config::load(None).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    #[serial]
    fn test_load_from_env_var() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("custom.yaml");
        std::fs::write(&path, "plan:\n  monthly_cost: 20\n").unwrap();
        // SAFETY: serialized with every other test that touches the environment
        unsafe { std::env::set_var(CONFIG_ENV_VAR, &path) };
        let config = Config::load(None);
        unsafe { std::env::remove_var(CONFIG_ENV_VAR) };
        assert_eq!(config.unwrap().plan.monthly_cost, 20.0);
    }

    #[test]
    #[serial]
    fn test_effective_home_prefers_override() {
        // SAFETY: serialized with every other test that touches the environment
        unsafe { std::env::set_var("HOME", "/home/dev") };
        let config = Config {
            home_dir: Some(PathBuf::from("~/alt")),
            ..Config::default()
        };
        assert_eq!(
            config.effective_home(None).unwrap(),
            PathBuf::from("/home/dev/alt")
        );
        assert_eq!(
            config.effective_home(Some(Path::new("/mnt/backup"))).unwrap(),
            PathBuf::from("/mnt/backup")
        );
    }

    #[test]
    fn test_overrides_expand_tilde_against_given_home() {
        let overrides = SourceOverrides {
            gemini_dir: Some(PathBuf::from("~/.gemini-work")),
            cursor_db: Some(PathBuf::from("/var/cursor.db")),
            ..SourceOverrides::default()
        };
        let expanded = overrides.expanded(Path::new("/mnt/backup"));
        assert_eq!(
            expanded.gemini_dir,
            Some(PathBuf::from("/mnt/backup/.gemini-work"))
        );
        assert_eq!(expanded.cursor_db, Some(PathBuf::from("/var/cursor.db")));
        assert_eq!(expanded.codex_sessions_dir, None);
    }
}
