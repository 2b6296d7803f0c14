//! Project configuration file support for contentloops.
//!
//! Loads defaults from `contentloops.toml` in the working directory. Command-line
//! flags override every value set here.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Project-level configuration loaded from `contentloops.toml`
#[derive(Debug, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Ollama model used for every stage
    pub model: Option<String>,
    /// Base URL of the Ollama daemon
    pub ollama_url: Option<String>,
    #[serde(default)]
    pub backend: BackendSection,
    #[serde(default)]
    pub run: RunSection,
    /// Criterion weights; replaces the built-in criteria when non-empty
    #[serde(default)]
    pub criteria: BTreeMap<String, f64>,
}

/// `[backend]` table
#[derive(Debug, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BackendSection {
    pub temperature: Option<f32>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
    pub retry_delay_ms: Option<u64>,
}

/// `[run]` table
#[derive(Debug, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RunSection {
    pub language: Option<String>,
    pub topic: Option<String>,
    pub target_audience: Option<String>,
    pub hashtags: Option<Vec<String>>,
    pub evaluation_focus: Option<String>,
    pub max_iterations: Option<usize>,
    pub pass_threshold: Option<f64>,
    pub enable_search: Option<bool>,
    /// Directory of `.md`/`.txt` reference documents
    pub context_dir: Option<PathBuf>,
    /// Where exported posts are written
    pub output_dir: Option<PathBuf>,
}

/// The config file name
pub const CONFIG_FILE_NAME: &str = "contentloops.toml";

impl ProjectConfig {
    /// Load configuration from the working directory.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if file exists and parses successfully
    /// - `Ok(None)` if file does not exist
    /// - `Err(...)` if file exists but fails to parse (hard error)
    pub fn load(working_dir: &Path) -> Result<Option<Self>> {
        let config_path = working_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        Ok(Some(config))
    }
}
