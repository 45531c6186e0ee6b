//! Tracing subscriber setup for the command line.
//!
//! The library only emits `tracing` events; embedders install their own subscriber.

use std::sync::Once;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Verbosity of the build output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
  /// No output.
  Silent,
  /// Errors only.
  Error,
  /// Errors and warnings, such as missing mapped resources.
  Warn,
  /// Build progress.
  #[default]
  Info,
  /// Every resolved path and joined resource.
  Debug,
}

impl LogLevel {
  fn as_level_filter(self) -> LevelFilter {
    match self {
      Self::Silent => LevelFilter::OFF,
      Self::Error => LevelFilter::ERROR,
      Self::Warn => LevelFilter::WARN,
      Self::Info => LevelFilter::INFO,
      Self::Debug => LevelFilter::DEBUG,
    }
  }
}

impl std::str::FromStr for LogLevel {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "silent" | "off" => Ok(Self::Silent),
      "error" => Ok(Self::Error),
      "warn" | "warning" => Ok(Self::Warn),
      "info" => Ok(Self::Info),
      "debug" => Ok(Self::Debug),
      other => Err(format!("invalid log level: {other}")),
    }
  }
}

impl std::fmt::Display for LogLevel {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let name = match self {
      Self::Silent => "off",
      Self::Error => "error",
      Self::Warn => "warn",
      Self::Info => "info",
      Self::Debug => "debug",
    };
    f.write_str(name)
  }
}

/// Install the global subscriber; `RUST_LOG` refines `level`. Only the first call has an effect.
pub fn init_logging(level: LogLevel) {
  INIT.call_once(|| {
    let filter = EnvFilter::builder()
      .with_default_directive(level.as_level_filter().into())
      .from_env_lossy();

    tracing_subscriber::registry()
      .with(filter)
      .with(fmt::layer().compact().with_target(false).without_time())
      .init();
  });
}
