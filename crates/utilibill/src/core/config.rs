//! Configuration loading and management.
//!
//! [`ExtractionConfig`] covers pipeline behavior and can be loaded from a
//! TOML file or discovered in the directory hierarchy. [`ProviderConfig`]
//! covers model credentials: it is resolved once at startup, validated, and
//! passed explicitly to constructors - never read from the environment
//! mid-run. A missing credential is fatal before any document is touched.

use crate::error::{Result, UtilibillError};
use crate::generation::{GeminiModel, OpenAiModel, TextModel, DEFAULT_TIMEOUT_SECS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Pipeline configuration.
///
/// # Example
///
/// ```rust
/// use utilibill::ExtractionConfig;
///
/// // Create with defaults
/// let config = ExtractionConfig::default();
///
/// // Load from TOML file
/// // let config = ExtractionConfig::from_toml_file("utilibill.toml")?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Cache parsed document text between runs
    #[serde(default = "default_true")]
    pub use_cache: bool,

    /// Directory holding cached parsed text
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Chunked extraction policy (None = always single-pass)
    #[serde(default = "default_chunking")]
    pub chunking: Option<ChunkingPolicy>,

    /// Reconciliation strategy for duplicate records
    #[serde(default)]
    pub reconciler: ReconcilerKind,

    /// Maximum concurrent documents in batch runs (None = num_cpus * 2)
    #[serde(default)]
    pub max_concurrent_documents: Option<usize>,
}

/// When and how documents are split for extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingPolicy {
    /// Documents longer than this many characters are chunked
    #[serde(default = "default_threshold_chars")]
    pub threshold_chars: usize,

    /// Maximum characters per chunk
    #[serde(default = "default_chunk_chars")]
    pub max_chars: usize,

    /// Overlap between chunks in characters
    #[serde(default = "default_chunk_overlap")]
    pub max_overlap: usize,
}

impl Default for ChunkingPolicy {
    fn default() -> Self {
        Self {
            threshold_chars: default_threshold_chars(),
            max_chars: default_chunk_chars(),
            max_overlap: default_chunk_overlap(),
        }
    }
}

/// Reconciliation strategy selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReconcilerKind {
    /// Pure in-process merge algorithm
    #[default]
    Deterministic,
    /// Second structured-generation call merges the records
    ModelAssisted,
}

fn default_true() -> bool {
    true
}
fn default_cache_dir() -> PathBuf {
    PathBuf::from(".utilibill").join("parsed")
}
fn default_chunking() -> Option<ChunkingPolicy> {
    Some(ChunkingPolicy::default())
}
fn default_threshold_chars() -> usize {
    12000
}
fn default_chunk_chars() -> usize {
    4000
}
fn default_chunk_overlap() -> usize {
    300
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            use_cache: true,
            cache_dir: default_cache_dir(),
            chunking: default_chunking(),
            reconciler: ReconcilerKind::default(),
            max_concurrent_documents: None,
        }
    }
}

impl ExtractionConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `UtilibillError::Validation` if the file doesn't exist or is
    /// invalid TOML.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            UtilibillError::validation(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        toml::from_str(&content).map_err(|e| {
            UtilibillError::validation(format!(
                "Invalid TOML in {}: {}",
                path.as_ref().display(),
                e
            ))
        })
    }

    /// Discover `utilibill.toml` in the current directory or any parent.
    ///
    /// # Returns
    ///
    /// - `Some(config)` if found
    /// - `None` if no config file found
    pub fn discover() -> Result<Option<Self>> {
        let mut current = std::env::current_dir().map_err(UtilibillError::Io)?;

        loop {
            let candidate = current.join("utilibill.toml");
            if candidate.exists() {
                return Ok(Some(Self::from_toml_file(candidate)?));
            }

            if let Some(parent) = current.parent() {
                current = parent.to_path_buf();
            } else {
                break;
            }
        }

        Ok(None)
    }
}

/// Which model backend serves structured generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Gemini,
    OpenAi,
}

/// Resolved model credentials and selection.
///
/// Gemini wins when both keys are configured; OpenAI is the fallback.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub provider: ProviderKind,
    pub api_key: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl ProviderConfig {
    /// Resolve provider selection from the environment, failing fast when no
    /// usable credential exists.
    pub fn from_env() -> Result<Self> {
        if let Some(api_key) = non_empty_env("GEMINI_API_KEY") {
            return Ok(Self {
                provider: ProviderKind::Gemini,
                api_key,
                model: "gemini-2.5-flash".to_string(),
                timeout_secs: DEFAULT_TIMEOUT_SECS,
            });
        }
        if let Some(api_key) = non_empty_env("OPENAI_API_KEY") {
            return Ok(Self {
                provider: ProviderKind::OpenAi,
                api_key,
                model: "gpt-4o".to_string(),
                timeout_secs: DEFAULT_TIMEOUT_SECS,
            });
        }
        Err(UtilibillError::validation(
            "no API key configured for either Gemini or OpenAI; set GEMINI_API_KEY or OPENAI_API_KEY",
        ))
    }

    /// Override the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the request timeout.
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Validate the configuration without building a client.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(UtilibillError::validation("provider API key is empty"));
        }
        if self.model.trim().is_empty() {
            return Err(UtilibillError::validation("provider model name is empty"));
        }
        Ok(())
    }

    /// Build the configured model client.
    pub fn build_model(&self) -> Result<Arc<dyn TextModel>> {
        self.validate()?;
        match self.provider {
            ProviderKind::Gemini => Ok(Arc::new(GeminiModel::new(
                self.api_key.as_str(),
                self.model.as_str(),
                self.timeout_secs,
            )?)),
            ProviderKind::OpenAi => Ok(Arc::new(OpenAiModel::new(
                self.api_key.as_str(),
                self.model.as_str(),
                self.timeout_secs,
            )?)),
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = ExtractionConfig::default();
        assert!(config.use_cache);
        assert!(config.chunking.is_some());
        assert_eq!(config.reconciler, ReconcilerKind::Deterministic);
        assert!(config.max_concurrent_documents.is_none());
    }

    #[test]
    fn test_from_toml_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("utilibill.toml");

        fs::write(
            &config_path,
            r#"
use_cache = false
reconciler = "model-assisted"

[chunking]
threshold_chars = 8000
max_chars = 2000
max_overlap = 150
        "#,
        )
        .unwrap();

        let config = ExtractionConfig::from_toml_file(&config_path).unwrap();
        assert!(!config.use_cache);
        assert_eq!(config.reconciler, ReconcilerKind::ModelAssisted);
        let chunking = config.chunking.unwrap();
        assert_eq!(chunking.threshold_chars, 8000);
        assert_eq!(chunking.max_chars, 2000);
        assert_eq!(chunking.max_overlap, 150);
    }

    #[test]
    fn test_from_toml_file_missing() {
        let result = ExtractionConfig::from_toml_file("/nonexistent/utilibill.toml");
        assert!(matches!(result, Err(UtilibillError::Validation { .. })));
    }

    #[test]
    fn test_from_toml_invalid() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("utilibill.toml");
        fs::write(&config_path, "use_cache = maybe").unwrap();

        let result = ExtractionConfig::from_toml_file(&config_path);
        assert!(matches!(result, Err(UtilibillError::Validation { .. })));
    }

    #[test]
    fn test_provider_config_validate_rejects_blank_key() {
        let config = ProviderConfig {
            provider: ProviderKind::OpenAi,
            api_key: "  ".to_string(),
            model: "gpt-4o".to_string(),
            timeout_secs: 30,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_provider_from_env_fallback() {
        // No other test touches these variables, so mutation here is safe
        // even with parallel test threads.
        std::env::remove_var("GEMINI_API_KEY");
        std::env::remove_var("OPENAI_API_KEY");
        assert!(
            ProviderConfig::from_env().is_err(),
            "no credential must fail fast"
        );

        std::env::set_var("OPENAI_API_KEY", "sk-test");
        let config = ProviderConfig::from_env().unwrap();
        assert_eq!(config.provider, ProviderKind::OpenAi);
        assert_eq!(config.model, "gpt-4o");

        std::env::set_var("GEMINI_API_KEY", "g-test");
        let config = ProviderConfig::from_env().unwrap();
        assert_eq!(config.provider, ProviderKind::Gemini, "Gemini wins over OpenAI");
        assert_eq!(config.model, "gemini-2.5-flash");

        std::env::remove_var("GEMINI_API_KEY");
        std::env::remove_var("OPENAI_API_KEY");
    }

    #[test]
    fn test_provider_config_builders() {
        let config = ProviderConfig {
            provider: ProviderKind::Gemini,
            api_key: "key".to_string(),
            model: "gemini-2.5-flash".to_string(),
            timeout_secs: 120,
        }
        .with_model("gemini-2.5-pro")
        .with_timeout_secs(60);

        assert_eq!(config.model, "gemini-2.5-pro");
        assert_eq!(config.timeout_secs, 60);
        assert!(config.validate().is_ok());
        assert!(config.build_model().is_ok());
    }
}
