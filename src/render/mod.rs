//! Plot rendering and display.
//!
//! - `plot`: draws sampled loss curves of one pyramid level to a PNG file
//! - `viewer`: shows the saved PNG in a native window when a display is available

pub mod plot;
pub mod viewer;

pub use plot::render_loss_plot;
pub use viewer::{display_available, show_plot_window};
