//! Client configuration and service factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use quizpath_core::traits::{AnswerService, ContentService};

use crate::bank::LocalBank;
use crate::http::{HttpQuizClient, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};

/// Top-level quizpath configuration.
///
/// Note: Custom Debug impl masks the token to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
pub struct QuizpathConfig {
    /// Base URL of the quiz API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token identifying the learner.
    #[serde(default)]
    pub token: Option<String>,
    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Local question bank; when set, no server is contacted.
    #[serde(default)]
    pub bank: Option<PathBuf>,
}

impl std::fmt::Debug for QuizpathConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuizpathConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("timeout_secs", &self.timeout_secs)
            .field("bank", &self.bank)
            .finish()
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for QuizpathConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            timeout_secs: default_timeout(),
            bank: None,
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
///
/// Substituted values are inserted verbatim and never rescanned.
fn resolve_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        let var_name = &rest[start + 2..start + len];
        result.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + len + 1..];
    }
    result.push_str(rest);
    result
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `quizpath.toml` in the current directory
/// 2. `~/.config/quizpath/config.toml`
///
/// Environment variable overrides: `QUIZPATH_BASE_URL`, `QUIZPATH_TOKEN`.
pub fn load_config() -> Result<QuizpathConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<QuizpathConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("quizpath.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => parse_config_file(&path)?,
        None => QuizpathConfig::default(),
    };

    config.base_url = resolve_env_vars(&config.base_url);
    config.token = config.token.as_deref().map(resolve_env_vars);
    apply_env_overrides(
        &mut config,
        std::env::var("QUIZPATH_BASE_URL").ok(),
        std::env::var("QUIZPATH_TOKEN").ok(),
    );

    tracing::debug!(?config, "configuration loaded");
    Ok(config)
}

/// Environment overrides are taken literally; only file values are expanded.
fn apply_env_overrides(
    config: &mut QuizpathConfig,
    base_url: Option<String>,
    token: Option<String>,
) {
    if let Some(url) = base_url {
        config.base_url = url;
    }
    if let Some(token) = token {
        config.token = Some(token);
    }
    config.token = config.token.take().filter(|t| !t.is_empty());
}

fn parse_config_file(path: &Path) -> Result<QuizpathConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    let mut config = toml::from_str::<QuizpathConfig>(&content)
        .with_context(|| format!("failed to parse config: {}", path.display()))?;

    // A relative bank path is relative to the config file, not the working directory.
    if let (Some(bank), Some(dir)) = (config.bank.as_mut(), path.parent()) {
        if bank.is_relative() {
            *bank = dir.join(&*bank);
        }
    }
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("quizpath"))
}

/// The content and answer services an engine runs against.
pub struct Services {
    pub content: Arc<dyn ContentService>,
    pub answers: Arc<dyn AnswerService>,
}

/// Build the services described by `config`: a local bank if one is
/// configured, the HTTP API otherwise.
pub fn create_services(config: &QuizpathConfig) -> Result<Services> {
    if let Some(path) = &config.bank {
        let bank = Arc::new(LocalBank::load(path)?);
        tracing::info!(path = %path.display(), "using local question bank");
        return Ok(Services {
            content: bank.clone(),
            answers: bank,
        });
    }

    let client = Arc::new(
        HttpQuizClient::new(&config.base_url, config.token.clone(), config.timeout_secs)
            .context("failed to create quiz API client")?,
    );
    Ok(Services {
        content: client.clone(),
        answers: client,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_QUIZPATH_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_QUIZPATH_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_QUIZPATH_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        std::env::remove_var("_QUIZPATH_TEST_VAR");
    }

    #[test]
    fn resolve_env_vars_does_not_rescan_values() {
        std::env::set_var("_QUIZPATH_SELF_REF", "${_QUIZPATH_SELF_REF}");
        assert_eq!(
            resolve_env_vars("a${_QUIZPATH_SELF_REF}b"),
            "a${_QUIZPATH_SELF_REF}b"
        );
        std::env::remove_var("_QUIZPATH_SELF_REF");

        assert_eq!(resolve_env_vars("x${_QUIZPATH_UNSET_VAR}y"), "xy");
        assert_eq!(resolve_env_vars("open ${never closed"), "open ${never closed");
    }

    #[test]
    fn env_overrides_are_taken_literally() {
        let mut config = QuizpathConfig {
            token: Some("from-file".into()),
            ..Default::default()
        };
        apply_env_overrides(
            &mut config,
            Some("https://quiz.example.com/api".into()),
            Some("tok-${NOT_A_VAR}".into()),
        );
        assert_eq!(config.base_url, "https://quiz.example.com/api");
        assert_eq!(config.token.as_deref(), Some("tok-${NOT_A_VAR}"));

        apply_env_overrides(&mut config, None, Some(String::new()));
        assert!(config.token.is_none());
    }

    #[test]
    fn default_config() {
        let config = QuizpathConfig::default();
        assert_eq!(config.base_url, "http://localhost:5000/api");
        assert_eq!(config.timeout_secs, 30);
        assert!(config.token.is_none());
        assert!(config.bank.is_none());
    }

    #[test]
    fn debug_masks_token() {
        let config = QuizpathConfig {
            token: Some("secret-token".into()),
            ..Default::default()
        };
        let printed = format!("{config:?}");
        assert!(!printed.contains("secret-token"));
        assert!(printed.contains("***"));
    }

    #[test]
    fn parse_config_file_resolves_relative_bank() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quizpath.toml");
        std::fs::write(
            &path,
            r#"
base_url = "https://quiz.example.com/api"
token = "abc"
timeout_secs = 10
bank = "bank.toml"
"#,
        )
        .unwrap();

        let config = parse_config_file(&path).unwrap();
        assert_eq!(config.base_url, "https://quiz.example.com/api");
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.bank, Some(dir.path().join("bank.toml")));
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let err = load_config_from(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn http_services_for_plain_config() {
        let services = create_services(&QuizpathConfig::default());
        assert!(services.is_ok());
    }
}
