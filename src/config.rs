//! Configuration loading for the loss plotter.
//!
//! Every field defaults to the value the solver's tooling has always used, so a
//! run without `loss_plot.toml` in the working directory behaves exactly like the
//! fixed-constant pipeline.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::loader::PyramidLevel;

/// Name of the optional configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "loss_plot.toml";

/// Errors raised while reading or validating the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Which 4-line blocks of the log are parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockBoundary {
    /// Block starts strictly below `line_count - 4`; the last block of the file is skipped.
    #[default]
    Legacy,
    /// Every complete block is parsed.
    Inclusive,
}

/// Settings for the log loader.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct LoaderConfig {
    /// Number of loss values a data line must hold to be accepted.
    pub row_width: usize,
    pub block_boundary: BlockBoundary,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            row_width: 60,
            block_boundary: BlockBoundary::Legacy,
        }
    }
}

/// Settings for the plot renderer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PlotConfig {
    /// Pyramid level whose losses are plotted.
    pub level: PyramidLevel,
    /// Every `row_stride`-th run is drawn, starting at the first one.
    pub row_stride: usize,
    pub output_path: PathBuf,
    /// Distance between x-axis tick marks, in iterations.
    pub x_tick_step: usize,
    pub x_label: String,
    pub y_label: String,
    pub title: String,
    /// Fraction of the figure height kept free above the chart for the title.
    pub title_margin: f64,
    pub width: u32,
    pub height: u32,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            level: PyramidLevel::Level0,
            row_stride: 60,
            output_path: PathBuf::from("fc.png"),
            x_tick_step: 4,
            x_label: "Iterations".to_string(),
            y_label: "Log average loss".to_string(),
            title: "λ=0.5, step=1, insufficient data association".to_string(),
            title_margin: 0.2,
            width: 640,
            height: 480,
        }
    }
}

/// Top-level configuration of a plotting run.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct AppConfig {
    /// Path of the solver's losses log.
    pub log_path: PathBuf,
    /// Open a window showing the saved figure after rendering.
    pub show_window: bool,
    pub loader: LoaderConfig,
    pub plot: PlotConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from("../../cmake-build-release/bin/examples/odometry_less_assoc_step_1.log"),
            show_window: true,
            loader: LoaderConfig::default(),
            plot: PlotConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// Fields missing from the file keep their defaults.
    pub fn load(config_path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(config_path).map_err(|source| ConfigError::Read {
            path: config_path.to_path_buf(),
            source,
        })?;

        Self::from_toml(&content)
    }

    /// Load `config_path` if it exists, otherwise fall back to the defaults.
    pub fn load_or_default(config_path: &Path) -> Result<Self, ConfigError> {
        if config_path.exists() {
            log::info!("Loading configuration from {}", config_path.display());
            Self::load(config_path)
        } else {
            log::debug!("No config file at {}, using defaults", config_path.display());
            Ok(Self::default())
        }
    }

    /// Parse and validate configuration text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make loading or rendering meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.loader.row_width == 0 {
            return Err(ConfigError::Invalid("loader.row-width must be positive".to_string()));
        }
        if self.plot.row_stride == 0 {
            return Err(ConfigError::Invalid("plot.row-stride must be positive".to_string()));
        }
        if self.plot.x_tick_step == 0 {
            return Err(ConfigError::Invalid("plot.x-tick-step must be positive".to_string()));
        }
        if self.plot.width == 0 || self.plot.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "Figure size {}x{} must be positive in both dimensions",
                self.plot.width, self.plot.height
            )));
        }
        if !(0.0..1.0).contains(&self.plot.title_margin) {
            return Err(ConfigError::Invalid(format!(
                "plot.title-margin {} must be within [0, 1)",
                self.plot.title_margin
            )));
        }
        Ok(())
    }
}
