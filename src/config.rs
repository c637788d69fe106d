use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use jenkins_client::{Credentials, HttpRequester, Jenkins};

/// Configuration file structure for jenkins-client.
///
/// Holds the server connection so it does not have to be repeated on every
/// invocation. Command-line flags and environment variables override it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ServerConfig {
    /// Jenkins root URL, including any context path
    #[serde(default = "default_url")]
    pub url: String,

    pub username: Option<String>,

    /// API token of `username`
    pub token: Option<String>,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub accept_invalid_certs: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Print raw JSON snapshots instead of tables
    #[serde(default)]
    pub json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            username: None,
            token: None,
            timeout_secs: default_timeout_secs(),
            accept_invalid_certs: false,
        }
    }
}

fn default_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl ServerConfig {
    /// Basic-auth credentials, when both halves are configured.
    pub fn credentials(&self) -> Option<Credentials> {
        match (&self.username, &self.token) {
            (Some(username), Some(token)) => {
                Some(Credentials::new(username.as_str(), token.as_str()))
            }
            _ => None,
        }
    }

    /// Builds a handle to the configured server.
    pub fn connect(&self) -> Result<Jenkins> {
        let requester = HttpRequester::new(
            self.credentials(),
            Duration::from_secs(self.timeout_secs),
            self.accept_invalid_certs,
        )?;
        Jenkins::with_requester(&self.url, Arc::new(requester))
            .with_context(|| format!("Failed to set up client for {}", self.url))
    }
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./jenkins.toml
    /// 3. ./jenkins.json
    /// 4. ./jenkins.yaml
    /// 5. ./jenkins.yml
    /// 6. `<config dir>/jenkins-client/config.toml`
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let mut candidates: Vec<PathBuf> = ["jenkins.toml", "jenkins.json", "jenkins.yaml", "jenkins.yml"]
            .iter()
            .map(PathBuf::from)
            .collect();
        if let Some(dir) = dirs::config_dir() {
            candidates.push(dir.join("jenkins-client").join("config.toml"));
        }

        for candidate in &candidates {
            if candidate.exists() {
                return Self::load_from_path(candidate);
            }
        }

        Ok(Self::default())
    }

    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("");

        match extension {
            "toml" => {
                toml::from_str(&contents)
                    .with_context(|| format!("Failed to parse TOML config: {}", path.display()))
            }
            "json" => {
                serde_json::from_str(&contents)
                    .with_context(|| format!("Failed to parse JSON config: {}", path.display()))
            }
            "yaml" | "yml" => {
                serde_yaml::from_str(&contents)
                    .with_context(|| format!("Failed to parse YAML config: {}", path.display()))
            }
            _ => {
                toml::from_str(&contents)
                    .or_else(|_| serde_json::from_str(&contents))
                    .or_else(|_| serde_yaml::from_str(&contents))
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))
            }
        }
    }

    /// Save configuration to a file, in the format its extension names.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("yaml") | Some("yml") => serde_yaml::to_string(self)?,
            _ => toml::to_string_pretty(self)?,
        };

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }
}
