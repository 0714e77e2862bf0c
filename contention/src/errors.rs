use std::io;

use thiserror::Error;

/// Failures the driver can report. Invariant violations and race artifacts are
/// not errors: the first are logged as they happen, the second show up in the
/// final report.
#[derive(Error, Debug)]
pub enum ContentionError {
    /// The OS refused to create a worker thread.
    #[error("failed to spawn worker {worker}: {source}")]
    Spawn {
        worker: String,
        #[source]
        source: io::Error,
    },

    #[error("worker {0} panicked")]
    WorkerPanicked(String),

    #[error("config error: {0}")]
    Config(#[from] confy::ConfyError),

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}
