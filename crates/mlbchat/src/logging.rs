use std::fs::File;
use std::io;
use std::sync::Mutex;

use tracing::Level;
use tracing_subscriber::filter::{EnvFilter, LevelFilter, filter_fn};
use tracing_subscriber::prelude::*;

const INFO_LOG: &str = "mlbchat_info.log";
const ERROR_LOG: &str = "mlbchat_errors.log";

/// Installs the global subscriber.
///
/// Everything at INFO and above goes to stdout, `RUST_LOG` can change
/// that. Our own DEBUG to WARN events also go to the info log, and our own
/// errors to the error log.
pub fn init() -> io::Result<()> {
    let info_log = File::create(INFO_LOG)?;
    let error_log = File::create(ERROR_LOG)?;

    let console_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    let console = tracing_subscriber::fmt::layer().with_filter(console_filter);

    let info = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(Mutex::new(info_log))
        .with_filter(filter_fn(|meta| {
            is_ours(meta.target())
                && *meta.level() <= Level::DEBUG
                && *meta.level() != Level::ERROR
        }));

    let errors = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(Mutex::new(error_log))
        .with_filter(filter_fn(|meta| {
            is_ours(meta.target()) && *meta.level() == Level::ERROR
        }));

    tracing_subscriber::registry()
        .with(console)
        .with(info)
        .with(errors)
        .init();
    Ok(())
}

#[inline]
fn is_ours(target: &str) -> bool {
    target.starts_with("mlbchat")
}
