use std::fs;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_DIR: &str = "logs";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("farmstead=info,warn"))
}

/// Initializes the logging system with both console and file output.
pub fn init_logging() {
    let _ = fs::create_dir_all(LOG_DIR);

    // Daily rotation, non-blocking so request handlers never wait on disk
    let file_appender = tracing_appender::rolling::daily(LOG_DIR, "farmstead.log");
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);

    let console_layer = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stdout);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(file_layer)
        .with(console_layer)
        .init();

    // The guard must outlive the process or buffered lines are lost
    std::mem::forget(guard);
}

/// Console-only logging for the operator binaries.
pub fn init_cli_logging() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}
