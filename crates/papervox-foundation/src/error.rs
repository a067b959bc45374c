use thiserror::Error;

/// Application-lifecycle errors. Failures that belong to a specific
/// subsystem (document handling, speech synthesis) carry their own error
/// types in the owning crate; this enum covers what the process as a whole
/// can do nothing about except report.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Fatal error, cannot recover: {0}")]
    Fatal(String),
}
