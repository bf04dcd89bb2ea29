// src/log.rs
use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::consts::{LOG_FILE, STORE_DIR};

/// Install the global subscriber: compact lines on stderr, mirrored into
/// `.store/debug.log`. Timestamps are elapsed time since start.
///
/// `RUST_LOG` overrides the default filter. Calling this twice is harmless;
/// the second subscriber is simply not installed.
pub fn init(verbose: bool) -> io::Result<()> {
    let dir = Path::new(STORE_DIR);
    fs::create_dir_all(dir)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(LOG_FILE))?;

    let default_filter = if verbose { "info,vf_scrape=debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    let stderr_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_timer(fmt::time::uptime())
        .with_target(false)
        .compact();

    let file_layer = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_timer(fmt::time::uptime())
        .with_ansi(false)
        .compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init();

    Ok(())
}

/// Info-level logging
#[macro_export]
macro_rules! logf {
    ($($arg:tt)*) => {
        $crate::__tracing::info!($($arg)*)
    };
}

/// Debug-level logging
#[macro_export]
macro_rules! logd {
    ($($arg:tt)*) => {
        $crate::__tracing::debug!($($arg)*)
    };
}

/// Warn-level logging
#[macro_export]
macro_rules! logw {
    ($($arg:tt)*) => {
        $crate::__tracing::warn!($($arg)*)
    };
}

/// Error-level logging
#[macro_export]
macro_rules! loge {
    ($($arg:tt)*) => {
        $crate::__tracing::error!($($arg)*)
    };
}
