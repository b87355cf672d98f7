use anyhow::Context;
use env_logger::Builder;
use log::{LevelFilter, info, warn};
use std::path::Path;

use crate::config::{AppConfig, CONFIG_FILE_NAME};
use crate::loader::load_losses_log;
use crate::render::{display_available, render_loss_plot, show_plot_window};

mod config;
mod loader;
mod render;

fn run() -> anyhow::Result<()> {
    let config = AppConfig::load_or_default(Path::new(CONFIG_FILE_NAME)).context("Failed to load configuration")?;

    let losses = load_losses_log(&config.log_path, &config.loader)
        .with_context(|| format!("Failed to load losses log {}", config.log_path.display()))?;

    let level = config.plot.level;
    let curves = render_loss_plot(losses.level(level), &config.plot)
        .with_context(|| format!("Failed to render loss plot for pyramid {}", level))?;
    info!("Saved {} loss curves of pyramid {} to {}", curves, level, config.plot.output_path.display());

    if !config.show_window {
        return Ok(());
    }
    if !display_available() {
        warn!("No display available, skipping plot window");
        return Ok(());
    }
    if let Err(e) = show_plot_window(&config.plot.output_path, &config.plot.title) {
        warn!("{:#}", e);
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    // Logging setup
    Builder::new()
        .filter_level(LevelFilter::Warn)
        .filter(Some("pyramid_loss_plot"), LevelFilter::Info)
        .parse_default_env()
        .init();

    run()
}
