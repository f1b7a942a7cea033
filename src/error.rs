//! Typed errors for the run-level failure modes.
//!
//! Provider-level failures never surface as errors: they are converted to
//! failed outcome records at the applier boundary.  Only the two run-level
//! conditions below reach `main` and turn into a non-zero exit code.
use thiserror::Error;

/// Run-level errors that abort a `winsetup apply`.
#[derive(Error, Debug)]
pub enum SetupError {
    /// The process is not elevated; nothing has been mutated.
    #[error("administrative privileges are required; re-run from an elevated shell")]
    NotElevated,

    /// A critical setting failed and halted the queue.
    #[error("run aborted: critical setting '{setting_id}' failed")]
    Aborted {
        /// Id of the critical setting that failed.
        setting_id: String,
    },
}
