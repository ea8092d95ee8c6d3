//! Application configuration for docmirror.
//!
//! User config lives at `~/.docmirror/docmirror.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DocMirrorError, Result};
use crate::types::{OptimizationLevel, RepairOptions};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "docmirror.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".docmirror";

// ---------------------------------------------------------------------------
// Config structs (matching docmirror.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Crawl policies.
    #[serde(default)]
    pub crawl: CrawlPoliciesConfig,

    /// Markdown conversion settings.
    #[serde(default)]
    pub conversion: ConversionConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Default output directory for mirrored sites.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Default maximum crawl depth (0 = unbounded).
    #[serde(default)]
    pub max_depth: u32,

    /// Generate README/navigation pages after a run.
    #[serde(default = "default_true")]
    pub generate_readme: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            max_depth: 0,
            generate_readme: true,
        }
    }
}

fn default_output_dir() -> String {
    "docs".into()
}
fn default_true() -> bool {
    true
}

/// `[crawl]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlPoliciesConfig {
    /// URLs or URL prefixes to exclude from crawling.
    #[serde(default)]
    pub exclude_urls: Vec<String>,

    /// Minimum delay between consecutive requests, in milliseconds.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CrawlPoliciesConfig {
    fn default() -> Self {
        Self {
            exclude_urls: Vec::new(),
            delay_ms: default_delay_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_delay_ms() -> u64 {
    1000
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[conversion]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// AI optimization level.
    #[serde(default)]
    pub ai_optimization: OptimizationLevel,

    /// Emit raw converter output (fence syntax is still normalized).
    #[serde(default)]
    pub raw: bool,

    /// Rewrite legacy `[code]` delimiters into backtick fences.
    #[serde(default = "default_true")]
    pub force_fences: bool,

    /// Collapse runs of blank lines to a single blank line.
    #[serde(default = "default_true")]
    pub reduce_empty_lines: bool,

    /// Opt-in placeholder insertion for suspected lost leading lines.
    #[serde(default)]
    pub reconstruct_leading_lines: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            ai_optimization: OptimizationLevel::default(),
            raw: false,
            force_fences: true,
            reduce_empty_lines: true,
            reconstruct_leading_lines: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Runtime crawl config (merged from config file + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime crawl configuration. Immutable after crawl start.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Maximum crawl depth from the root URL (0 = unbounded).
    pub max_depth: u32,
    /// Delay between consecutive fetch attempts, in milliseconds.
    pub delay_ms: u64,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// URLs or URL prefixes to exclude.
    pub exclude_urls: Vec<String>,
}

impl From<&AppConfig> for CrawlConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_depth: config.defaults.max_depth,
            delay_ms: config.crawl.delay_ms,
            timeout_secs: config.crawl.timeout_secs,
            exclude_urls: config.crawl.exclude_urls.clone(),
        }
    }
}

impl From<&ConversionConfig> for RepairOptions {
    fn from(config: &ConversionConfig) -> Self {
        Self {
            level: config.ai_optimization,
            raw: config.raw,
            force_fences: config.force_fences,
            reduce_empty_lines: config.reduce_empty_lines,
            reconstruct_leading_lines: config.reconstruct_leading_lines,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.docmirror/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DocMirrorError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.docmirror/docmirror.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DocMirrorError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        DocMirrorError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DocMirrorError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| DocMirrorError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DocMirrorError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("output_dir"));
        assert!(toml_str.contains("delay_ms"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.crawl.delay_ms, 1000);
        assert_eq!(parsed.crawl.timeout_secs, 30);
        assert!(parsed.conversion.force_fences);
    }

    #[test]
    fn config_with_excludes() {
        let toml_str = r#"
[defaults]
output_dir = "/tmp/mirror"
max_depth = 3

[crawl]
exclude_urls = ["https://docs.example.com/api/", "https://docs.example.com/changelog"]
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.max_depth, 3);
        assert_eq!(config.crawl.exclude_urls.len(), 2);
    }

    #[test]
    fn conversion_level_parses_kebab_case() {
        let toml_str = r#"
[conversion]
ai_optimization = "token-optimized"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(
            config.conversion.ai_optimization,
            OptimizationLevel::TokenOptimized
        );
    }

    #[test]
    fn crawl_config_from_app_config() {
        let app = AppConfig::default();
        let crawl = CrawlConfig::from(&app);
        assert_eq!(crawl.max_depth, 0);
        assert_eq!(crawl.delay_ms, 1000);
        assert!(crawl.exclude_urls.is_empty());
    }

    #[test]
    fn repair_options_from_conversion_config() {
        let mut conversion = ConversionConfig::default();
        conversion.raw = true;
        conversion.reduce_empty_lines = false;

        let opts = RepairOptions::from(&conversion);
        assert!(opts.raw);
        assert!(!opts.reduce_empty_lines);
        assert_eq!(opts.level, OptimizationLevel::Standard);
    }
}
