//! TUI module: Terminal User Interface using Ratatui.
//!
//! A single page holding:
//! - The clinical data form
//! - The 5-year risk and survival curve for the last submission

mod app;
mod styles;
pub mod ui;

pub use app::App;
pub use styles::MedicalTheme;
