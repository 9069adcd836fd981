//! Configuration management for Ozette
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files and CLI overrides.

use crate::cli::Cli;
use crate::error::{OzetteError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for Ozette
///
/// This structure holds all configuration needed for the client,
/// including the Ollama endpoint and attachment handling settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Ollama backend configuration
    #[serde(default)]
    pub ollama: OllamaConfig,

    /// Attachment staging configuration
    #[serde(default)]
    pub attachments: AttachmentsConfig,
}

/// Ollama backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Ollama server host
    #[serde(default = "default_ollama_host")]
    pub host: String,

    /// Model to use for the chat session
    #[serde(default = "default_ollama_model")]
    pub model: String,
}

fn default_ollama_host() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "gemma3:4b".to_string()
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: default_ollama_host(),
            model: default_ollama_model(),
        }
    }
}

/// Attachment staging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentsConfig {
    /// Directory used to hold uploaded attachments until release
    ///
    /// When unset, a per-user data directory is used.
    #[serde(default)]
    pub directory: Option<PathBuf>,

    /// Maximum size in bytes for a single staged file
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,

    /// File extensions accepted for staging (lowercase, no leading dot)
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

fn default_max_file_bytes() -> u64 {
    10 * 1024 * 1024
}

fn default_allowed_extensions() -> Vec<String> {
    [
        "pdf", "txt", "doc", "docx", "md", "mdx", "js", "ts", "py", "rb", "java", "cpp", "c",
        "go", "rs", "php", "html", "css", "json",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for AttachmentsConfig {
    fn default() -> Self {
        Self {
            directory: None,
            max_file_bytes: default_max_file_bytes(),
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file, applying CLI overrides
    ///
    /// A missing config file is not an error: defaults are used so the
    /// client works against a local Ollama out of the box.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the YAML configuration file
    /// * `cli` - Parsed CLI arguments whose `--host`/`--model` override the file
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    ///
    /// # Examples
    ///
    /// ```
    /// use ozette::cli::Cli;
    /// use ozette::config::Config;
    ///
    /// let cli = Cli::default();
    /// let config = Config::load("does/not/exist.yaml", &cli).unwrap();
    /// assert_eq!(config.ollama.host, "http://localhost:11434");
    /// ```
    pub fn load(path: impl AsRef<Path>, cli: &Cli) -> Result<Self> {
        let path = path.as_ref();

        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| OzetteError::Config(format!("failed to read {:?}: {}", path, e)))?;
            serde_yaml::from_str::<Config>(&contents)?
        } else {
            tracing::debug!("Config file {:?} not found, using defaults", path);
            Config::default()
        };

        if let Some(host) = &cli.host {
            config.ollama.host = host.clone();
        }
        if let Some(model) = &cli.model {
            config.ollama.model = model.clone();
        }

        Ok(config)
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the host is not a valid URL or the attachment
    /// size limit is zero.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.ollama.host).map_err(|e| {
            OzetteError::Config(format!("invalid ollama host {:?}: {}", self.ollama.host, e))
        })?;

        if self.attachments.max_file_bytes == 0 {
            return Err(
                OzetteError::Config("attachments.max_file_bytes must be positive".into()).into(),
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.ollama.host, "http://localhost:11434");
        assert_eq!(config.ollama.model, "gemma3:4b");
        assert_eq!(config.attachments.max_file_bytes, 10 * 1024 * 1024);
        assert!(config.attachments.allowed_extensions.contains(&"md".to_string()));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let cli = Cli::default();
        let config = Config::load("no/such/config.yaml", &cli).unwrap();
        assert_eq!(config.ollama.model, "gemma3:4b");
    }

    #[test]
    fn test_load_parses_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "ollama:\n  host: http://10.0.0.5:11434\n  model: llama3.2:latest\n",
        )
        .unwrap();

        let cli = Cli::default();
        let config = Config::load(&path, &cli).unwrap();
        assert_eq!(config.ollama.host, "http://10.0.0.5:11434");
        assert_eq!(config.ollama.model, "llama3.2:latest");
    }

    #[test]
    fn test_cli_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "ollama:\n  model: llama3.2:latest\n").unwrap();

        let cli = Cli {
            host: Some("http://other:11434".to_string()),
            model: Some("mistral:latest".to_string()),
            ..Cli::default()
        };
        let config = Config::load(&path, &cli).unwrap();
        assert_eq!(config.ollama.host, "http://other:11434");
        assert_eq!(config.ollama.model, "mistral:latest");
    }

    #[test]
    fn test_validate_rejects_bad_host() {
        let mut config = Config::default();
        config.ollama.host = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_max_file_bytes() {
        let mut config = Config::default();
        config.attachments.max_file_bytes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_defaults() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }
}
