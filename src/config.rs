//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.trajplot.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".trajplot.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Analysis settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Input table layout.
    #[serde(default)]
    pub table: TableConfig,

    /// Chart output settings.
    #[serde(default)]
    pub render: RenderConfig,
}

/// The three analysis options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Path to the input table.
    #[serde(default = "default_source_path")]
    pub source_path: PathBuf,

    /// Logical name of the aggregated value, used for labels.
    #[serde(default = "default_focus")]
    pub focus_metric_name: String,

    /// Trailing moving-average window.
    #[serde(default = "default_smoothing_window")]
    pub smoothing_window: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            source_path: default_source_path(),
            focus_metric_name: default_focus(),
            smoothing_window: default_smoothing_window(),
        }
    }
}

fn default_source_path() -> PathBuf {
    PathBuf::from("uncertainty_strong_matrix.csv")
}

fn default_focus() -> String {
    "uncertainty".to_string()
}

fn default_smoothing_window() -> usize {
    2
}

/// Input table layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    /// Name of the identifier column.
    #[serde(default = "default_id_column")]
    pub id_column: String,

    /// Prefix shared by chunk columns (`<prefix><integer>`).
    #[serde(default = "default_chunk_prefix")]
    pub chunk_prefix: String,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            id_column: default_id_column(),
            chunk_prefix: default_chunk_prefix(),
        }
    }
}

fn default_id_column() -> String {
    "filename".to_string()
}

fn default_chunk_prefix() -> String {
    "chunk_".to_string()
}

/// Which charts to produce.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum RenderTarget {
    /// SVG chart only
    Static,
    /// HTML chart only
    Interactive,
    /// Both charts (default)
    #[default]
    Both,
    /// No charts
    None,
}

impl RenderTarget {
    pub fn wants_static(self) -> bool {
        matches!(self, RenderTarget::Static | RenderTarget::Both)
    }

    pub fn wants_interactive(self) -> bool {
        matches!(self, RenderTarget::Interactive | RenderTarget::Both)
    }
}

/// Chart output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Directory the charts are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Charts to produce.
    #[serde(default)]
    pub target: RenderTarget,

    /// Chart title.
    #[serde(default = "default_title")]
    pub title: String,

    /// Label for the chunk position axis.
    #[serde(default = "default_x_label")]
    pub x_label: String,

    /// Static chart width in pixels.
    #[serde(default = "default_width")]
    pub width: u32,

    /// Static chart height in pixels.
    #[serde(default = "default_height")]
    pub height: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            target: RenderTarget::default(),
            title: default_title(),
            x_label: default_x_label(),
            width: default_width(),
            height: default_height(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_title() -> String {
    "Trajectory Across Conversation Time".to_string()
}

fn default_x_label() -> String {
    "Decile of Conversation Time".to_string()
}

fn default_width() -> u32 {
    1200
}

fn default_height() -> u32 {
    600
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
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.trajplot.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(DEFAULT_CONFIG_FILE);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence, but only when explicitly provided.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref source) = args.source {
            self.analysis.source_path = source.clone();
        }
        if let Some(ref focus) = args.focus {
            self.analysis.focus_metric_name = focus.clone();
        }
        if let Some(window) = args.window {
            self.analysis.smoothing_window = window;
        }

        if let Some(ref id_column) = args.id_column {
            self.table.id_column = id_column.clone();
        }
        if let Some(ref prefix) = args.prefix {
            self.table.chunk_prefix = prefix.clone();
        }

        if let Some(ref output_dir) = args.output_dir {
            self.render.output_dir = output_dir.clone();
        }
        if let Some(target) = args.render {
            self.render.target = target;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
