//! Logging setup
//!
//! The library only emits `tracing` events; binaries call [`init_logging`]
//! once to print them.

use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable that overrides the filter, e.g. `QC_VISION_LOG=debug`
pub const LOG_ENV: &str = "QC_VISION_LOG";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

/// Default filter used when `QC_VISION_LOG` is not set
fn default_directive(level: LogLevel) -> String {
    format!("qc_vision={}", level.to_tracing_level())
}

/// Install a formatted subscriber on stderr.
///
/// `QC_VISION_LOG` takes precedence over `level`. Calling this twice is
/// harmless; the second call is ignored.
pub fn init_logging(level: LogLevel) {
    let env_filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(level)));

    let installed = tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(env_filter)
        .try_init();

    if installed.is_ok() {
        tracing::debug!("Logging initialized at {:?}", level);
    }
}
