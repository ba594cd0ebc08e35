//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.cohort-assistant.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".cohort-assistant.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Input data settings.
    #[serde(default)]
    pub data: DataConfig,

    /// Model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Chat settings.
    #[serde(default)]
    pub chat: ChatConfig,

    /// Dashboard presentation settings.
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

/// Input data settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Path of the cohort summary CSV.
    #[serde(default = "default_csv_path")]
    pub csv_path: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            csv_path: default_csv_path(),
        }
    }
}

fn default_csv_path() -> PathBuf {
    PathBuf::from("Data summary.csv")
}

/// LLM model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Substring of the preferred model name.
    #[serde(default = "default_preferred_model")]
    pub preferred_model: String,

    /// Gemini API base URL.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Temperature for generation. Provider default when unset.
    #[serde(default)]
    pub temperature: Option<f32>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            preferred_model: default_preferred_model(),
            api_base_url: default_api_base_url(),
            api_key_env: default_api_key_env(),
            temperature: None,
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_preferred_model() -> String {
    "1.5-flash".to_string()
}

fn default_api_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_timeout() -> u64 {
    120
}

/// Chat session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Most recent messages sent with each request (0 = entire session).
    #[serde(default = "default_max_history")]
    pub max_history_messages: usize,

    /// Company the assistant answers for.
    #[serde(default = "default_company")]
    pub company: String,

    /// Analyst the assistant represents.
    #[serde(default = "default_analyst")]
    pub analyst: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_history_messages: default_max_history(),
            company: default_company(),
            analyst: default_analyst(),
        }
    }
}

fn default_max_history() -> usize {
    40
}

fn default_company() -> String {
    "Fido".to_string()
}

fn default_analyst() -> String {
    "Gloria Odamten".to_string()
}

/// Dashboard page settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Page title.
    #[serde(default = "default_title")]
    pub title: String,

    /// URL of the embedded BI report.
    #[serde(default = "default_embed_url")]
    pub embed_url: String,

    /// Logo inlined into the HTML export when present.
    #[serde(default = "default_logo_path")]
    pub logo_path: PathBuf,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            embed_url: default_embed_url(),
            logo_path: default_logo_path(),
        }
    }
}

fn default_title() -> String {
    "Fido Loan Portfolio & KYC Analytics".to_string()
}

fn default_embed_url() -> String {
    "https://app.powerbi.com/view?r=eyJrIjoiMzZlNzRlOWQtMGJiMS00NmEwLWJiMzQtM2VlNTgxYmEwMzE1IiwidCI6IjhkMWE2OWVjLTAzYjUtNDM0NS1hZTIxLWRhZDExMmY1ZmI0ZiIsImMiOjN9".to_string()
}

fn default_logo_path() -> PathBuf {
    PathBuf::from("logo.png")
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only explicitly provided CLI values override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref data) = args.data {
            self.data.csv_path = data.clone();
        }
        if let Some(ref model) = args.model {
            self.model.preferred_model = model.clone();
        }
        if let Some(timeout) = args.timeout {
            self.model.timeout_seconds = timeout;
        }
        if let Some(temperature) = args.temperature {
            self.model.temperature = Some(temperature);
        }
        if let Some(max_history) = args.max_history {
            self.chat.max_history_messages = max_history;
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
