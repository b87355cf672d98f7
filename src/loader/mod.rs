//! Loader for pyramid solver loss logs.
//!
//! Provides functionality for:
//! - Splitting the log into 4-line blocks (header plus one line per pyramid level)
//! - Parsing data lines into loss rows and dropping rows of the wrong width
//! - Stacking the accepted rows of each level into a loss matrix

pub mod log_loader;
pub mod row_parser;
pub mod types;

pub use log_loader::load_losses_log;
pub use types::{LossMatrix, PyramidLevel};
