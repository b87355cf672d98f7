//! Native window showing a saved plot image.
//!
//! Displaying is best-effort: the figure is already on disk when the window
//! opens, so callers log failures here instead of aborting.

use anyhow::{Context, anyhow};
use eframe::egui;
use std::path::Path;

/// Minimal eframe app that shows one image scaled to the window.
struct PlotViewer {
    texture: egui::TextureHandle,
}

impl PlotViewer {
    fn new(ctx: &egui::Context, image: egui::ColorImage) -> Self {
        let texture = ctx.load_texture("loss_plot", image, egui::TextureOptions::LINEAR);
        Self { texture }
    }
}

impl eframe::App for PlotViewer {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.centered_and_justified(|ui| {
                ui.add(egui::Image::new(&self.texture).shrink_to_fit());
            });
        });
    }
}

/// Decode a PNG from disk into an egui image.
fn load_color_image(path: &Path) -> anyhow::Result<egui::ColorImage> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read plot image {}", path.display()))?;
    let img = image::load_from_memory(&bytes).with_context(|| format!("Failed to decode plot image {}", path.display()))?;

    let rgba = img.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    let pixels = rgba.as_flat_samples();
    Ok(egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice()))
}

/// Whether a display server looks reachable from this process.
pub fn display_available() -> bool {
    if cfg!(all(unix, not(target_os = "macos"))) {
        ["DISPLAY", "WAYLAND_DISPLAY"]
            .iter()
            .any(|var| std::env::var_os(var).is_some_and(|value| !value.is_empty()))
    } else {
        true
    }
}

/// Open a window showing the image at `path` and block until it is closed.
pub fn show_plot_window(path: &Path, title: &str) -> anyhow::Result<()> {
    let image = load_color_image(path)?;
    let [width, height] = image.size;
    log::info!("Opening plot window for {} ({}x{})", path.display(), width, height);

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(title)
            .with_inner_size([width as f32, height as f32]),
        ..Default::default()
    };

    eframe::run_native(
        title,
        native_options,
        Box::new(move |cc| Ok(Box::new(PlotViewer::new(&cc.egui_ctx, image)))),
    )
    .map_err(|e| anyhow!("Failed to open plot window: {}", e))
}
