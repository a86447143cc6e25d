//! Application configuration loaded with figment.
//!
//! Sources, highest precedence first:
//! 1. `ADMINPANEL_*` environment variables (`ADMINPANEL_LOG_LEVEL=debug`)
//! 2. The TOML file given to [`AppConfig::from_file`]
//! 3. Built-in defaults
//!
//! # Invariants
//! - `db_path` is required and non-empty; every other key has a default.
//! - `page_default_rows` is at least 1.

use crate::logging::default_log_level;
use figment::error::Kind;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_PREFIX: &str = "ADMINPANEL_";

pub const KEY_DB_PATH: &str = "db_path";
pub const KEY_PAGE_DEFAULT_ROWS: &str = "page_default_rows";

const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 30 * 60;
const DEFAULT_PAGE_ROWS: u32 = 20;

#[derive(Debug)]
pub enum ConfigError {
    /// A required key is absent or empty.
    Missing(&'static str),
    /// A key holds a value outside its allowed range.
    Invalid { key: &'static str, value: String },
    /// The file, environment or merged document could not be read.
    Load(Box<figment::Error>),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(key) => write!(f, "missing required config key `{key}`"),
            Self::Invalid { key, value } => {
                write!(f, "invalid value `{value}` for config key `{key}`")
            }
            Self::Load(err) => write!(f, "failed to load config: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Load(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(value: figment::Error) -> Self {
        match &value.kind {
            Kind::MissingField(field) if &**field == KEY_DB_PATH => Self::Missing(KEY_DB_PATH),
            _ => Self::Load(Box::new(value)),
        }
    }
}

/// Typed runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub db_path: PathBuf,
    #[serde(default = "default_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    #[serde(default)]
    pub bootstrap_file: Option<PathBuf>,
    #[serde(default = "default_idle_timeout_secs")]
    pub online_idle_timeout_secs: u64,
    #[serde(default = "default_page_rows")]
    pub page_default_rows: u32,
}

fn default_level() -> String {
    default_log_level().to_string()
}

fn default_idle_timeout_secs() -> u64 {
    DEFAULT_IDLE_TIMEOUT_SECS
}

fn default_page_rows() -> u32 {
    DEFAULT_PAGE_ROWS
}

impl AppConfig {
    /// Defaults for everything except the database location.
    pub fn with_db_path(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            log_level: default_level(),
            log_dir: None,
            bootstrap_file: None,
            online_idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
            page_default_rows: DEFAULT_PAGE_ROWS,
        }
    }

    /// Loads `path` (TOML) with `ADMINPANEL_*` overrides.
    ///
    /// Relative `db_path`, `log_dir` and `bootstrap_file` values resolve
    /// against the file's directory. A missing file is an error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::load(path.as_ref(), ENV_PREFIX)
    }

    /// Applies `ADMINPANEL_*` overrides on top of `self`.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        Self::from_figment(
            Figment::new()
                .merge(Serialized::defaults(self))
                .merge(Env::prefixed(ENV_PREFIX)),
        )
    }

    pub(crate) fn load(path: &Path, env_prefix: &str) -> Result<Self, ConfigError> {
        let figment = Figment::new()
            .merge(Toml::file_exact(path))
            .merge(Env::prefixed(env_prefix));
        let mut config = Self::from_figment(figment)?;
        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        Ok(config)
    }

    fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::Missing(KEY_DB_PATH));
        }
        if self.page_default_rows == 0 {
            return Err(ConfigError::Invalid {
                key: KEY_PAGE_DEFAULT_ROWS,
                value: self.page_default_rows.to_string(),
            });
        }
        Ok(())
    }

    pub fn online_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.online_idle_timeout_secs)
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        if self.db_path.is_relative() {
            self.db_path = base.join(&self.db_path);
        }
        if let Some(dir) = self.log_dir.as_mut().filter(|dir| dir.is_relative()) {
            *dir = base.join(&*dir);
        }
        if let Some(file) = self.bootstrap_file.as_mut().filter(|file| file.is_relative()) {
            *file = base.join(&*file);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ConfigError, KEY_DB_PATH};
    use std::path::Path;
    use std::time::Duration;

    fn write_config(dir: &Path, body: &str) -> std::path::PathBuf {
        let path = dir.join("adminpanel.toml");
        std::fs::write(&path, body).expect("write config");
        path
    }

    #[test]
    fn file_values_apply_over_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write_config(
            dir.path(),
            "db_path = \"/var/lib/admin.db\"\nonline_idle_timeout_secs = 60\n",
        );

        let config = AppConfig::load(&path, "ADMINPANEL_TEST_DEFAULTS_").expect("config");
        assert_eq!(config.db_path, Path::new("/var/lib/admin.db"));
        assert_eq!(config.online_idle_timeout(), Duration::from_secs(60));
        assert_eq!(config.page_default_rows, 20);
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn relative_paths_resolve_against_config_dir() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write_config(
            dir.path(),
            "db_path = \"data/admin.db\"\nbootstrap_file = \"seed.xml\"\n",
        );

        let config = AppConfig::load(&path, "ADMINPANEL_TEST_RELATIVE_").expect("config");
        assert_eq!(config.db_path, dir.path().join("data/admin.db"));
        assert_eq!(config.bootstrap_file, Some(dir.path().join("seed.xml")));
    }

    #[test]
    fn environment_overrides_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write_config(dir.path(), "db_path = \"admin.db\"\nlog_level = \"info\"\n");

        std::env::set_var("ADMINPANEL_TEST_ENV_LOG_LEVEL", "debug");
        std::env::set_var("ADMINPANEL_TEST_ENV_PAGE_DEFAULT_ROWS", "50");
        let config = AppConfig::load(&path, "ADMINPANEL_TEST_ENV_").expect("config");
        std::env::remove_var("ADMINPANEL_TEST_ENV_LOG_LEVEL");
        std::env::remove_var("ADMINPANEL_TEST_ENV_PAGE_DEFAULT_ROWS");

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.page_default_rows, 50);
    }

    #[test]
    fn requires_db_path_and_positive_page_rows() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = write_config(dir.path(), "log_level = \"info\"\n");
        assert!(matches!(
            AppConfig::load(&missing, "ADMINPANEL_TEST_MISSING_"),
            Err(ConfigError::Missing(KEY_DB_PATH))
        ));

        let zero_rows = write_config(dir.path(), "db_path = \"a.db\"\npage_default_rows = 0\n");
        assert!(matches!(
            AppConfig::load(&zero_rows, "ADMINPANEL_TEST_ZERO_"),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn missing_or_malformed_file_is_load_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        assert!(matches!(
            AppConfig::load(&dir.path().join("absent.toml"), "ADMINPANEL_TEST_ABSENT_"),
            Err(ConfigError::Load(_))
        ));

        let broken = write_config(dir.path(), "db_path = \n");
        assert!(matches!(
            AppConfig::load(&broken, "ADMINPANEL_TEST_BROKEN_"),
            Err(ConfigError::Load(_))
        ));
    }
}
