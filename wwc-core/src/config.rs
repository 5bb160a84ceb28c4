//! Configuration system for the WWC Copilot.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> CLI args.
//! Configuration is loaded from the user config dir (`wwc-copilot/config.toml`) and/or
//! `.wwc-copilot/config.toml` in the workspace directory.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;
use crate::synthesis::DEFAULT_CONFIDENCE_THRESHOLD;

const WORKSPACE_DIR: &str = ".wwc-copilot";
const CONFIG_FILE: &str = "config.toml";

/// Top-level configuration for the copilot client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CopilotConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

/// Where the synthesis service lives and how to talk to it.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL all endpoint paths are resolved against.
    pub base_url: String,
    /// Token sent as `Authorization: token <value>`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8888/jupyterlab-research-assistant-wwc-copilot/"
                .to_string(),
            api_token: None,
            timeout_secs: 120,
            connect_timeout_secs: 10,
            user_agent: format!("wwc-copilot/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl ServerConfig {
    /// Parsed base URL, always ending in `/` so endpoint paths join beneath it.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let mut raw = self.base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let url = Url::parse(&raw).map_err(|e| ConfigError::Invalid {
            message: format!("server.base_url '{}': {e}", self.base_url),
        })?;
        if url.cannot_be_a_base() {
            return Err(ConfigError::Invalid {
                message: format!("server.base_url '{}' cannot be a base URL", self.base_url),
            });
        }
        Ok(url)
    }
}

/// Local persistence settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for wizard progress records. Defaults to the platform data dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_dir: Option<PathBuf>,
}

/// Defaults applied to synthesis requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub confidence_threshold: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extract_findings: Option<bool>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            outcome_name: None,
            extract_findings: None,
        }
    }
}

impl CopilotConfig {
    /// Check values figment cannot check on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.base_url()?;
        let threshold = self.analysis.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Invalid {
                message: format!(
                    "analysis.confidence_threshold must be between 0 and 1, got {threshold}"
                ),
            });
        }
        if self.server.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                message: "server.timeout_secs must be greater than 0".into(),
            });
        }
        Ok(())
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("dev", "wwc-copilot", "wwc-copilot")
}

/// Path of the user-level config file, if the platform has a config dir.
pub fn user_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

pub fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(WORKSPACE_DIR).join(CONFIG_FILE)
}

/// Load configuration from all layers.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `WWC_COPILOT_`)
/// 3. Workspace-local config (`.wwc-copilot/config.toml`)
/// 4. User config
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&CopilotConfig>,
) -> Result<CopilotConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(CopilotConfig::default()));

    if let Some(user_config) = user_config_path() {
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // WWC_COPILOT_SERVER__BASE_URL, WWC_COPILOT_ANALYSIS__CONFIDENCE_THRESHOLD, etc.
    figment = figment.merge(Env::prefixed("WWC_COPILOT_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    let config: CopilotConfig = figment.extract().map_err(|e| ConfigError::ParseError {
        message: e.to_string(),
    })?;
    config.validate()?;
    Ok(config)
}

/// Load a single config file with no other layers applied.
pub fn load_config_file(path: &Path) -> Result<CopilotConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::ParseError {
        message: format!("{}: {e}", path.display()),
    })?;
    let config: CopilotConfig = toml::from_str(&raw).map_err(|e| ConfigError::ParseError {
        message: format!("{}: {e}", path.display()),
    })?;
    config.validate()?;
    Ok(config)
}

/// Check whether any configuration file exists (user-level or workspace-level).
pub fn config_exists(workspace: Option<&Path>) -> bool {
    if user_config_path().is_some_and(|p| p.exists()) {
        return true;
    }
    workspace.is_some_and(|ws| workspace_config_path(ws).exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = CopilotConfig::default();
        assert_eq!(config.analysis.confidence_threshold, 0.8);
        assert!(config.server.api_token.is_none());
        assert!(config.storage.progress_dir.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let mut config = CopilotConfig::default();
        config.analysis.outcome_name = Some("reading".into());
        config.storage.progress_dir = Some(PathBuf::from("/tmp/progress"));
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: CopilotConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(deserialized, config);
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let server = ServerConfig {
            base_url: "http://localhost:8888/wwc".into(),
            ..Default::default()
        };
        assert_eq!(server.base_url().unwrap().as_str(), "http://localhost:8888/wwc/");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = CopilotConfig::default();
        config.analysis.confidence_threshold = 1.2;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));

        let mut config = CopilotConfig::default();
        config.server.base_url = "::nope".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_token() {
        let server = ServerConfig {
            api_token: Some("secret-token".into()),
            ..Default::default()
        };
        let debug = format!("{server:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_load_config_with_overrides() {
        let mut overrides = CopilotConfig::default();
        overrides.analysis.confidence_threshold = 0.6;
        overrides.server.timeout_secs = 30;

        let config = load_config(None, Some(&overrides)).unwrap();
        assert_eq!(config.analysis.confidence_threshold, 0.6);
        assert_eq!(config.server.timeout_secs, 30);
    }

    #[test]
    fn test_load_config_from_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let ws_dir = dir.path().join(WORKSPACE_DIR);
        std::fs::create_dir_all(&ws_dir).unwrap();
        std::fs::write(
            ws_dir.join(CONFIG_FILE),
            r#"
[server]
base_url = "http://research.local:9000/wwc"

[analysis]
confidence_threshold = 0.9
outcome_name = "math_achievement"
"#,
        )
        .unwrap();

        let config = load_config(Some(dir.path()), None).unwrap();
        assert_eq!(config.server.base_url, "http://research.local:9000/wwc");
        assert_eq!(config.server.timeout_secs, 120);
        assert_eq!(config.analysis.confidence_threshold, 0.9);
        assert_eq!(config.analysis.outcome_name.as_deref(), Some("math_achievement"));
        assert!(config_exists(Some(dir.path())));
    }

    #[test]
    fn test_workspace_threshold_out_of_range_fails() {
        let dir = tempfile::tempdir().unwrap();
        let ws_dir = dir.path().join(WORKSPACE_DIR);
        std::fs::create_dir_all(&ws_dir).unwrap();
        std::fs::write(
            ws_dir.join(CONFIG_FILE),
            "[analysis]\nconfidence_threshold = 3.0\n",
        )
        .unwrap();
        assert!(load_config(Some(dir.path()), None).is_err());
    }

    #[test]
    fn test_load_config_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }
}
