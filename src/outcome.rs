//! Append-only outcome records with dual console/file sinks.
//!
//! Every attempted setting yields exactly one [`OutcomeRecord`].  Records
//! are echoed to the console (or emitted as line-delimited JSON in machine
//! mode) and written to a persistent run-log file, where each line is
//! flushed and synced before the next setting is attempted so a crash
//! mid-run never loses already-recorded outcomes.
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::logging::Log;

/// Final status of one attempted setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// The provider applied the change.
    Success,
    /// Nothing was done: inapplicable, already satisfied, or dry run.
    Skipped,
    /// The provider (or its state check) failed.
    Failed,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Skipped => write!(f, "skipped"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// One per applied setting: id, wall-clock timestamp, status, and a
/// human-readable cause for skips and failures.
#[derive(Debug, Clone, Serialize)]
pub struct OutcomeRecord {
    /// Id of the setting this record describes.
    pub setting_id: String,
    /// UTC timestamp, RFC 3339.
    pub timestamp: String,
    /// Final status.
    pub status: Status,
    /// Cause, present for `Skipped` and `Failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl OutcomeRecord {
    /// Create a record stamped with the current time.
    #[must_use]
    pub fn new(setting_id: impl Into<String>, status: Status, detail: Option<String>) -> Self {
        Self {
            setting_id: setting_id.into(),
            timestamp: chrono::Utc::now()
                .format("%Y-%m-%dT%H:%M:%SZ")
                .to_string(),
            status,
            detail,
        }
    }

    /// Render the record as one line of JSON.
    #[must_use]
    pub fn to_json_line(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| format!("{{\"setting_id\":\"{}\"}}", self.setting_id))
    }

    /// Render the self-contained run-log line for this record.
    #[must_use]
    pub fn to_log_line(&self) -> String {
        let mut line = format!(
            "[{}] setting={} status={}",
            self.timestamp, self.setting_id, self.status
        );
        if let Some(detail) = &self.detail {
            line.push_str(&format!(" detail=\"{}\"", detail.replace('"', "'")));
        }
        line
    }
}

/// Aggregate counts over a run's records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeCounts {
    /// Number of `Success` records.
    pub succeeded: usize,
    /// Number of `Skipped` records.
    pub skipped: usize,
    /// Number of `Failed` records.
    pub failed: usize,
}

impl OutcomeCounts {
    /// Total number of records.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.succeeded + self.skipped + self.failed
    }
}

/// Append-only structured record of a run, with console and file sinks.
pub struct OutcomeLog {
    records: Mutex<Vec<OutcomeRecord>>,
    sink: Option<Mutex<fs::File>>,
    sink_path: Option<PathBuf>,
    json_lines: bool,
    log: Arc<dyn Log>,
}

impl std::fmt::Debug for OutcomeLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutcomeLog")
            .field("sink_path", &self.sink_path)
            .field("json_lines", &self.json_lines)
            .finish_non_exhaustive()
    }
}

impl OutcomeLog {
    /// Open an outcome log appending to `path`.
    ///
    /// A sink that cannot be opened is reported once and disabled; the
    /// run itself proceeds with console output only.
    #[must_use]
    pub fn new(log: Arc<dyn Log>, path: Option<PathBuf>, json_lines: bool) -> Self {
        let sink = path.as_ref().and_then(|p| {
            let file = fs::OpenOptions::new().create(true).append(true).open(p);
            match file {
                Ok(f) => Some(Mutex::new(f)),
                Err(e) => {
                    log.warn(&format!(
                        "outcome log {} unavailable: {e}; continuing without it",
                        p.display()
                    ));
                    None
                }
            }
        });
        Self {
            records: Mutex::new(Vec::new()),
            sink,
            sink_path: path,
            json_lines,
            log,
        }
    }

    /// Default outcome log path under the cache directory.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        Some(crate::logging::cache_dir()?.join("outcomes.log"))
    }

    /// Path of the file sink, if one is open.
    #[must_use]
    pub fn sink_path(&self) -> Option<&Path> {
        self.sink.as_ref().and(self.sink_path.as_deref())
    }

    /// Write a timestamped lifecycle event line to the file sink.
    pub fn event(&self, msg: &str) {
        self.log.debug(msg);
        let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
        self.write_line(&format!("[{ts}] {msg}"));
    }

    /// Append a record, making it durable before returning.
    pub fn record(&self, record: OutcomeRecord) {
        self.write_line(&record.to_log_line());

        if self.json_lines {
            println!("{}", record.to_json_line());
        } else {
            match record.status {
                Status::Success => self.log.info(&format!("\u{2713} {}", record.setting_id)),
                Status::Skipped => {
                    let detail = record.detail.as_deref().unwrap_or("skipped");
                    self.log
                        .info(&format!("\u{25cb} {} ({detail})", record.setting_id));
                }
                Status::Failed => {
                    let detail = record.detail.as_deref().unwrap_or("unknown cause");
                    self.log
                        .error(&format!("\u{2717} {}: {detail}", record.setting_id));
                }
            }
        }

        if let Ok(mut guard) = self.records.lock() {
            guard.push(record);
        }
    }

    /// Return a clone of all records so far.
    pub fn records(&self) -> Vec<OutcomeRecord> {
        self.records
            .lock()
            .map_or_else(|_| vec![], |guard| guard.clone())
    }

    /// Aggregate counts over the records so far.
    pub fn counts(&self) -> OutcomeCounts {
        let mut counts = OutcomeCounts::default();
        for record in self.records() {
            match record.status {
                Status::Success => counts.succeeded += 1,
                Status::Skipped => counts.skipped += 1,
                Status::Failed => counts.failed += 1,
            }
        }
        counts
    }

    /// Count the number of failed records.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.counts().failed
    }

    /// Print the run summary through the logger.
    pub fn print_summary(&self) {
        let counts = self.counts();
        if counts.total() == 0 {
            return;
        }
        self.log.stage("Summary");
        self.log.info(&format!(
            "{} settings: \x1b[32m{} succeeded\x1b[0m, \x1b[33m{} skipped\x1b[0m, \x1b[31m{} failed\x1b[0m",
            counts.total(),
            counts.succeeded,
            counts.skipped,
            counts.failed
        ));
        if let Some(path) = self.sink_path() {
            self.log.info(&format!("\x1b[2moutcomes: {}\x1b[0m", path.display()));
        }
    }

    /// Append one line to the file sink, flushed and synced so it survives
    /// a crash during the next setting.
    fn write_line(&self, line: &str) {
        if let Some(sink) = &self.sink
            && let Ok(mut file) = sink.lock()
        {
            writeln!(file, "{line}").ok();
            file.flush().ok();
            file.sync_data().ok();
        }
    }
}
