use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "APPTRACK";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_string(),
            timeout_secs: 15,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    pub user: Option<String>,
    pub token: Option<String>,
}

impl AppConfig {
    /// Loads `config.toml` from the user config dir, overlaid by `APPTRACK_*` env vars.
    pub fn load() -> Result<(Self, PathBuf)> {
        let path = default_path();
        let config = Self::load_from(&path, None)?;
        Ok((config, path))
    }

    /// `env` replaces the process environment when given (used by tests).
    pub fn load_from(path: &Path, env: Option<config::Map<String, String>>) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::from(path.to_path_buf()).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        settings
            .try_deserialize()
            .with_context(|| format!("Invalid config: {}", path.display()))
    }
}

pub fn default_path() -> PathBuf {
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "apptrack") {
        proj_dirs.config_dir().join("config.toml")
    } else {
        PathBuf::from("apptrack.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn no_env() -> Option<config::Map<String, String>> {
        Some(config::Map::new())
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(&dir.path().join("config.toml"), no_env()).unwrap();
        assert_eq!(config.api.base_url, "http://localhost:5000/api");
        assert_eq!(config.api.timeout(), Duration::from_secs(15));
        assert_eq!(config.auth.user, None);
        assert_eq!(config.auth.token, None);
    }

    #[test]
    fn test_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[api]
base_url = "https://tracker.example.com/api"

[auth]
user = "ada@example.com"
token = "abc123"
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path, no_env()).unwrap();
        assert_eq!(config.api.base_url, "https://tracker.example.com/api");
        assert_eq!(config.api.timeout_secs, 15);
        assert_eq!(config.auth.user.as_deref(), Some("ada@example.com"));
        assert_eq!(config.auth.token.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[api]\nbase_url = \"http://file/api\"\ntimeout_secs = 3\n").unwrap();

        let mut env = config::Map::new();
        env.insert("APPTRACK_API__BASE_URL".to_string(), "http://env/api".to_string());
        env.insert("APPTRACK_AUTH__USER".to_string(), "grace".to_string());

        let config = AppConfig::load_from(&path, Some(env)).unwrap();
        assert_eq!(config.api.base_url, "http://env/api");
        assert_eq!(config.api.timeout_secs, 3);
        assert_eq!(config.auth.user.as_deref(), Some("grace"));
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[api\nbase_url = ").unwrap();
        assert!(AppConfig::load_from(&path, no_env()).is_err());
    }
}
