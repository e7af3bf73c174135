use std::fs;
use std::io;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

pub const LOG_FILE: &str = "gamemaster.log";

fn filter(verbose: u8) -> EnvFilter {
    // RUST_LOG wins over -v
    EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    })
}

/// Log to stderr, for the one-shot mode.
pub fn init_stderr(verbose: u8) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(verbose))
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

/// Log to `<dir>/gamemaster.log`, leaving the terminal to the UI.
///
/// The returned guard flushes pending lines on drop and must outlive the UI.
pub fn init_file(dir: &Path, verbose: u8) -> io::Result<WorkerGuard> {
    fs::create_dir_all(dir)?;
    let appender = tracing_appender::rolling::never(dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(verbose.max(1)))
        .with_ansi(false)
        .with_writer(writer)
        .try_init();
    Ok(guard)
}
