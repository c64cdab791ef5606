use std::io;
use std::process::ExitCode;

use toldo_core::config::{AppConfig, LoadOptions, LogFormat};
use tracing::Level;

fn init_logging(config: &AppConfig) {
    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(io::stderr);

    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

fn main() -> ExitCode {
    // Invalid config is reported by the command itself; logging falls back to defaults.
    let config = AppConfig::load(LoadOptions::default()).unwrap_or_default();
    init_logging(&config);

    toldo_cli::run()
}
