use thiserror::Error;

/// Fatal errors that end the process. Per-process and per-field failures
/// never surface here; they are absorbed into sentinel values on the
/// affected record.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to initialize terminal: {0}")]
    TerminalInit(#[source] std::io::Error),

    #[error("/proc is not readable on this system: {0}")]
    ProcfsUnavailable(#[source] std::io::Error),

    #[error("could not read or write settings file {path}: {source}")]
    Settings {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid command line: {0}")]
    BadCli(String),
}

impl AppError {
    /// Process exit code for this error, per the CLI contract.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::ProcfsUnavailable(_) => 1,
            AppError::TerminalInit(_) | AppError::Settings { .. } => 2,
            AppError::BadCli(_) => -1,
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
