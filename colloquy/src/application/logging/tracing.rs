use once_cell::sync::OnceCell;
use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::application::config::configuration::Configuration;

static LOGGER_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();

pub fn tracing_subscribe(config: &Configuration) -> bool {
    // Create log directory if it doesn't exist
    let log_dir = config.log_dir();
    if !log_dir.exists() {
        if let Err(e) = std::fs::create_dir_all(&log_dir) {
            warn!("Failed to create log directory: {}", e);
            return false;
        }
    }

    let env_filter_layer = fmt::layer().with_filter(
        EnvFilter::from_default_env().add_directive("hyper=off".parse().unwrap()),
    );
    let file_appender = tracing_appender::rolling::daily(&log_dir, "colloquy.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    _ = LOGGER_GUARD.set(guard);
    let log_writer_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    tracing_subscriber::registry()
        .with(log_writer_layer)
        .with(env_filter_layer)
        .try_init()
        .is_ok()
}
