//! Cardiosurv: 5-year cardiovascular risk for people living with HIV
//!
//! Main entry point for the terminal application.

use anyhow::Result;
use std::io::IsTerminal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cardiosurv::config::AppConfig;
use cardiosurv::tui::App;

fn main() -> Result<()> {
    // Initialize logging.
    //
    // Writing logs to the terminal would corrupt the TUI (alternate screen):
    // - interactive TTY: log to a file
    // - non-interactive: log to stdout
    let log_mode = std::env::var("CARDIOSURV_LOG_MODE").unwrap_or_else(|_| "auto".to_string());

    let interactive = std::io::stdout().is_terminal();
    let use_file = match log_mode.as_str() {
        "file" => true,
        "stdout" => false,
        // auto
        _ => interactive,
    };

    let (writer, _guard) = if use_file {
        let log_file = std::env::var("CARDIOSURV_LOG_FILE")
            .unwrap_or_else(|_| "cardiosurv.log".to_string());

        if let Some(parent) = std::path::Path::new(&log_file).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stdout())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(writer))
        .init();

    tracing::info!("Starting Cardiosurv...");

    let config = AppConfig::from_env();
    println!(
        "Preparing model artifacts in {} ...",
        config.cache_dir.display()
    );

    // Fetch and load before the terminal is taken over, so failures print plainly.
    let mut app = App::new(&config)?;
    app.run()?;

    tracing::info!("Cardiosurv shutdown complete.");
    Ok(())
}
