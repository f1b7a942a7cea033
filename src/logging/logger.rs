//! Structured logger writing to console and a persistent log file.
use std::path::PathBuf;

use super::types::Log;

/// Implement the display methods of [`Log`] by delegating to inherent
/// methods of the same name on the implementing type.
macro_rules! forward_log_methods {
    ($($method:ident),+ $(,)?) => {
        $(
            fn $method(&self, msg: &str) {
                self.$method(msg);
            }
        )+
    };
}

/// Production logger.
///
/// All messages are always written to a persistent log file at
/// `<cache dir>/winsetup/<command>.log` with timestamps and ANSI codes
/// stripped, regardless of the verbose flag.  The file itself is created
/// and written by the [`FileLayer`](super::subscriber::FileLayer)
/// installed by [`init_subscriber`](super::subscriber::init_subscriber);
/// this type only routes messages through [`tracing`].
#[derive(Debug)]
pub struct Logger {
    log_file: Option<PathBuf>,
}

impl Logger {
    /// Create a new logger for the given subcommand.
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self {
            log_file: super::utils::log_file_path(command),
        }
    }

    /// Return the log file path, if available.
    #[must_use]
    pub const fn log_path(&self) -> Option<&PathBuf> {
        self.log_file.as_ref()
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log a stage header (major section).
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: "winsetup::stage", "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a debug message (suppressed on console unless verbose; always
    /// written to the log file).
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Log a dry-run action message.
    pub fn dry_run(&self, msg: &str) {
        tracing::info!(target: "winsetup::dry_run", "{msg}");
    }
}

impl Log for Logger {
    forward_log_methods!(stage, info, debug, warn, error, dry_run);
}
