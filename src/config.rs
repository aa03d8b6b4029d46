use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::auth::Credentials;
use crate::error::JenkinsError;

/// Jenkins instance used when neither a flag, the environment nor a config file names one.
pub const DEFAULT_BASE_URL: &str = "https://is.dbc.dk";

pub const ENV_URL: &str = "JENKINS_URL";
pub const ENV_USERNAME: &str = "JENKINS_USERNAME";
pub const ENV_PASSWORD: &str = "JENKINS_PASSWORD";

/// Configuration file structure for jenkins-helpers.
///
/// Every value is optional; command-line flags and environment variables
/// take precedence over anything set here (see [`Settings::resolve`]).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub jenkins: JenkinsConfig,

    #[serde(default)]
    pub git: GitConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct JenkinsConfig {
    /// Jenkins base URL
    pub url: Option<String>,

    /// Jenkins user name
    pub user: Option<String>,

    /// API token or password for `user`
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GitConfig {
    /// Git executable
    #[serde(default = "default_git_program")]
    pub program: String,

    /// Name given to the remote in the temporary repository
    #[serde(default = "default_remote_name")]
    pub remote_name: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            program: default_git_program(),
            remote_name: default_remote_name(),
        }
    }
}

fn default_git_program() -> String {
    "git".to_string()
}

fn default_remote_name() -> String {
    "origin".to_string()
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./jenkins-helpers.toml
    /// 3. ./jenkins-helpers.json
    /// 4. ./jenkins-helpers.yaml
    /// 5. ./jenkins-helpers.yml
    /// 6. `<config dir>/jenkins-helpers/config.toml`
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        for candidate in Self::candidates() {
            if candidate.exists() {
                log::debug!("Loading configuration from {}", candidate.display());
                return Self::load_from_path(&candidate);
            }
        }

        Ok(Self::default())
    }

    fn candidates() -> Vec<PathBuf> {
        let mut candidates: Vec<PathBuf> = [
            "jenkins-helpers.toml",
            "jenkins-helpers.json",
            "jenkins-helpers.yaml",
            "jenkins-helpers.yml",
        ]
        .iter()
        .map(PathBuf::from)
        .collect();

        if let Some(dir) = dirs::config_dir() {
            candidates.push(dir.join("jenkins-helpers").join("config.toml"));
        }

        candidates
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }
}

/// Where a resolved setting came from, highest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Source {
    Flag,
    Environment,
    ConfigFile,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<T> {
    pub value: T,
    pub source: Source,
}

/// Values given on the command line, if any.
#[derive(Debug, Default, Clone, Copy)]
pub struct Overrides<'a> {
    pub server: Option<&'a str>,
    pub user: Option<&'a str>,
    pub secret: Option<&'a str>,
}

/// Settings resolved once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: Resolved<String>,
    pub user: Option<Resolved<String>>,
    pub secret: Option<Resolved<String>>,
    pub git: GitConfig,
}

impl Settings {
    /// Resolve settings with precedence flag > environment > config file > default.
    pub fn resolve(overrides: Overrides<'_>, config: &Config) -> Self {
        Self::resolve_with(overrides, config, |key| std::env::var(key).ok())
    }

    pub fn resolve_with<F>(overrides: Overrides<'_>, config: &Config, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let server = pick(
            overrides.server,
            env(ENV_URL),
            config.jenkins.url.as_deref(),
        )
        .unwrap_or_else(|| Resolved {
            value: DEFAULT_BASE_URL.to_string(),
            source: Source::Default,
        });

        let server = Resolved {
            value: server.value.trim_end_matches('/').to_string(),
            source: server.source,
        };

        Self {
            server,
            user: pick(
                overrides.user,
                env(ENV_USERNAME),
                config.jenkins.user.as_deref(),
            ),
            secret: pick(
                overrides.secret,
                env(ENV_PASSWORD),
                config.jenkins.api_key.as_deref(),
            ),
            git: config.git.clone(),
        }
    }

    /// Credentials for the Jenkins API, or `None` for anonymous access.
    pub fn credentials(&self) -> crate::error::Result<Option<Credentials>> {
        match (&self.user, &self.secret) {
            (Some(user), Some(secret)) => {
                Ok(Some(Credentials::new(user.value.as_str(), secret.value.as_str())))
            }
            (None, None) => Ok(None),
            (Some(user), None) => Err(JenkinsError::Credentials(format!(
                "no API key or password given for user {} (use --api-key or {ENV_PASSWORD})",
                user.value
            ))),
            (None, Some(_)) => Err(JenkinsError::Credentials(format!(
                "an API key was given without a user (use --user or {ENV_USERNAME})"
            ))),
        }
    }
}

fn pick(flag: Option<&str>, env: Option<String>, file: Option<&str>) -> Option<Resolved<String>> {
    if let Some(value) = flag {
        return Some(Resolved {
            value: value.to_string(),
            source: Source::Flag,
        });
    }
    if let Some(value) = env.filter(|v| !v.is_empty()) {
        return Some(Resolved {
            value,
            source: Source::Environment,
        });
    }
    file.map(|value| Resolved {
        value: value.to_string(),
        source: Source::ConfigFile,
    })
}
