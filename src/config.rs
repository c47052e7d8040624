use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub paperkg: PaperkgConfig,
    pub embeddings: EmbeddingsConfig,
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

/// PaperKG-specific configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PaperkgConfig {
    pub db_path: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Embedding gateway configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingsConfig {
    pub provider: String,
    pub model: String,
    pub api_key_env: String,
    pub dimensions: usize,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

fn default_cache_capacity() -> usize {
    1000
}

/// Extraction gateway and construction-pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    pub model: String,
    pub api_key_env: String,
    /// How many characters of the document head are sent for metadata extraction.
    #[serde(default = "default_metadata_prefix_chars")]
    pub metadata_prefix_chars: usize,
    /// Sections shorter than this are skipped in Round 2.
    #[serde(default = "default_min_section_chars")]
    pub min_section_chars: usize,
    /// Paragraph fragments shorter than this are discarded in Round 3.
    #[serde(default = "default_min_paragraph_chars")]
    pub min_paragraph_chars: usize,
}

fn default_metadata_prefix_chars() -> usize {
    8000
}

fn default_min_section_chars() -> usize {
    200
}

fn default_min_paragraph_chars() -> usize {
    50
}

/// Retrieval tuning configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_k")]
    pub default_k: usize,
    #[serde(default = "default_citation_k")]
    pub citation_k: usize,
    /// Subgraph loader expansion rounds per query.
    #[serde(default = "default_hop_budget")]
    pub hop_budget: usize,
    /// Maximum depth of descendant-ward path enumeration.
    #[serde(default = "default_descendant_depth")]
    pub descendant_depth: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_k: default_k(),
            citation_k: default_citation_k(),
            hop_budget: default_hop_budget(),
            descendant_depth: default_descendant_depth(),
        }
    }
}

fn default_k() -> usize {
    10
}

fn default_citation_k() -> usize {
    3
}

fn default_hop_budget() -> usize {
    3
}

fn default_descendant_depth() -> usize {
    2
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in PAPERKG_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        // Load .env file if it exists (ignore errors - file is optional)
        let _ = dotenv::dotenv();

        let config_path = std::env::var("PAPERKG_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Config = toml::from_str(&config_str)
            .context("Failed to parse config.toml")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        // Check both environment variable and .env file (dotenv already loaded in Config::load)
        std::env::var(&self.embeddings.api_key_env)
            .with_context(|| {
                format!(
                    "Environment variable {} not set. Set it in your .env file or as an environment variable with your embedding API key.",
                    self.embeddings.api_key_env
                )
            })?;

        std::env::var(&self.extraction.api_key_env)
            .with_context(|| {
                format!(
                    "Environment variable {} not set. Set it in your .env file or as an environment variable with your extraction API key.",
                    self.extraction.api_key_env
                )
            })?;

        if self.embeddings.dimensions == 0 {
            anyhow::bail!("embeddings.dimensions must be greater than 0");
        }

        if self.retrieval.default_k == 0 {
            anyhow::bail!("retrieval.default_k must be greater than 0");
        }

        if self.retrieval.hop_budget == 0 {
            anyhow::bail!("retrieval.hop_budget must be greater than 0");
        }

        if self.extraction.min_paragraph_chars == 0 {
            anyhow::bail!("extraction.min_paragraph_chars must be greater than 0");
        }

        Ok(())
    }

    /// Get database path
    pub fn db_path(&self) -> &Path {
        &self.paperkg.db_path
    }
}
