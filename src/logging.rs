// src/logging.rs

use color_eyre::eyre::Result;
use directories::ProjectDirs;
use lazy_static::lazy_static;
use std::path::PathBuf;
use time::macros::format_description;
use tracing_error::ErrorLayer;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

lazy_static! {
    pub static ref PROJECT_NAME: String = env!("CARGO_CRATE_NAME").to_uppercase();
    pub static ref LOG_ENV: String = format!("{}_LOGLEVEL", PROJECT_NAME.clone());
    pub static ref LOG_FILE: String = format!("{}.log", env!("CARGO_PKG_NAME"));
}

fn project_directory() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "prism-scan", env!("CARGO_PKG_NAME"))
}

/// Where the log file and the default database live.
pub fn get_data_dir() -> PathBuf {
    if let Some(proj_dirs) = project_directory() {
        proj_dirs.data_local_dir().to_path_buf()
    } else {
        PathBuf::from(".").join(".data")
    }
}

pub fn log_file_path() -> PathBuf {
    get_data_dir().join(LOG_FILE.as_str())
}

/// Initializes file-based logging using the tracing subscriber.
///
/// The filter comes from `RUST_LOG`, then `PRISM_SCAN_LOGLEVEL`, then
/// defaults to `prism_scan=info`.
pub fn initialize_logging() -> Result<()> {
    let directory = get_data_dir();
    std::fs::create_dir_all(&directory)?;
    let log_file = std::fs::File::create(log_file_path())?;

    let file_log_level = std::env::var("RUST_LOG")
        .or_else(|_| std::env::var(LOG_ENV.as_str()))
        .unwrap_or_else(|_| format!("{}=info", env!("CARGO_CRATE_NAME")));

    let timer = LocalTime::new(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second]"
    ));
    let file_subscriber = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_timer(timer)
        .with_target(false)
        .with_ansi(false)
        .with_filter(EnvFilter::new(file_log_level));

    tracing_subscriber::registry()
        .with(file_subscriber)
        .with(ErrorLayer::default())
        .init();

    Ok(())
}

/// The last `count` lines of the log file, oldest first. Empty if the file
/// cannot be read.
pub fn read_log_tail(count: usize) -> Vec<String> {
    let content = std::fs::read_to_string(log_file_path()).unwrap_or_default();
    tail(&content, count)
}

fn tail(content: &str, count: usize) -> Vec<String> {
    let lines: Vec<&str> = content.lines().collect();
    let start = lines.len().saturating_sub(count);
    lines[start..].iter().map(|line| line.to_string()).collect()
}
