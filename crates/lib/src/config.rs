//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.askdoc/config.json`) and environment.
//! Only the backend location and the token file live here; everything else is in-memory state.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Question-answering backend settings.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Credential storage settings.
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Where the backend lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendConfig {
    /// Base URL of the backend (default "http://127.0.0.1:8000"). Overridden by ASKDOC_BACKEND_URL env.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

/// Credential storage: path of the token file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    /// Token file override. Relative paths are resolved against the config file's parent.
    /// Omit to use `token` next to the config file.
    #[serde(default)]
    pub token_path: Option<PathBuf>,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

/// Resolve the backend base URL: env ASKDOC_BACKEND_URL overrides config. Trailing slashes are stripped.
pub fn resolve_backend_url(config: &Config) -> String {
    std::env::var("ASKDOC_BACKEND_URL")
        .ok()
        .and_then(|s| {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        })
        .unwrap_or_else(|| config.backend.base_url.trim().to_string())
        .trim_end_matches('/')
        .to_string()
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("ASKDOC_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".askdoc").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the given path, or the default path (or ASKDOC_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used (for resolving the token file).
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

/// Resolve the token file: `auth.tokenPath` if set (relative to the config file's parent), else `token` next to the config file.
pub fn resolve_token_path(config: &Config, config_path: &Path) -> PathBuf {
    let config_parent = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    match &config.auth.token_path {
        Some(p) if !p.as_os_str().is_empty() => {
            if p.is_absolute() {
                p.clone()
            } else {
                config_parent.join(p)
            }
        }
        _ => config_parent.join(crate::token::TOKEN_FILE_NAME),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_backend_url() {
        let b = BackendConfig::default();
        assert_eq!(b.base_url, "http://127.0.0.1:8000");
    }

    #[test]
    fn parses_camel_case_fields() {
        let config: Config = serde_json::from_str(
            r#"{ "backend": { "baseUrl": "http://qa.local:9000/" }, "auth": { "tokenPath": "creds/tok" } }"#,
        )
        .unwrap();
        assert_eq!(config.backend.base_url, "http://qa.local:9000/");
        assert_eq!(config.auth.token_path, Some(PathBuf::from("creds/tok")));
    }

    #[test]
    fn empty_object_is_all_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.backend.base_url, "http://127.0.0.1:8000");
        assert!(config.auth.token_path.is_none());
    }

    #[test]
    fn resolve_token_path_default() {
        let config = Config::default();
        let path = Path::new("/home/user/.askdoc/config.json");
        assert_eq!(
            resolve_token_path(&config, path),
            PathBuf::from("/home/user/.askdoc/token")
        );
    }

    #[test]
    fn resolve_token_path_override_relative() {
        let mut config = Config::default();
        config.auth.token_path = Some(PathBuf::from("secrets/token"));
        let path = Path::new("/home/user/.askdoc/config.json");
        assert_eq!(
            resolve_token_path(&config, path),
            PathBuf::from("/home/user/.askdoc/secrets/token")
        );
    }

    #[test]
    fn resolve_token_path_override_absolute() {
        let mut config = Config::default();
        config.auth.token_path = Some(PathBuf::from("/run/askdoc/token"));
        let path = Path::new("/home/user/.askdoc/config.json");
        assert_eq!(
            resolve_token_path(&config, path),
            PathBuf::from("/run/askdoc/token")
        );
    }

    #[test]
    fn load_config_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("askdoc-config-test-missing").join("config.json");
        let (config, used) = load_config(Some(path.clone())).unwrap();
        assert_eq!(used, path);
        assert_eq!(config.backend.base_url, "http://127.0.0.1:8000");
    }
}
