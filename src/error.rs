//! Error types.
//!
//! Two layers:
//!
//! - [`ProcessError`]: typed failures of the per-sample pipeline stages. Callers
//!   match on the variant to tell "bad data" apart from "bad fit".
//! - [`AppError`]: what the binary prints before exiting (exit code + message).

use thiserror::Error;

/// Pipeline stage that produced a [`SampleError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Ingest,
    Convert,
    Segment,
    Fit,
    Export,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::Ingest => "ingest",
            Stage::Convert => "convert",
            Stage::Segment => "segment",
            Stage::Fit => "fit",
            Stage::Export => "export",
        }
    }
}

/// Typed failures of the indentation pipeline.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("missing required column `{column}`")]
    MissingColumn { column: String },

    #[error("empty data: {0}")]
    EmptyData(String),

    #[error("invalid retract segment: {0}")]
    InvalidSegment(String),

    #[error("degenerate fit: {0}")]
    DegenerateFit(String),

    #[error("fit did not converge: {0}")]
    FitConvergence(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to parse {what}: {message}")]
    Parse { what: String, message: String },

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl ProcessError {
    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        ProcessError::Io {
            path: path.display().to_string(),
            source,
        }
    }

    /// Short machine-friendly kind name (used in reports).
    pub fn kind(&self) -> &'static str {
        match self {
            ProcessError::MissingColumn { .. } => "missing_column",
            ProcessError::EmptyData(_) => "empty_data",
            ProcessError::InvalidSegment(_) => "invalid_segment",
            ProcessError::DegenerateFit(_) => "degenerate_fit",
            ProcessError::FitConvergence(_) => "fit_convergence",
            ProcessError::InvalidConfig(_) => "invalid_config",
            ProcessError::Parse { .. } => "parse",
            ProcessError::Io { .. } => "io",
            ProcessError::Csv(_) => "csv",
        }
    }

    /// True for failures caused by the input data rather than the solver.
    pub fn is_data_error(&self) -> bool {
        !matches!(self, ProcessError::FitConvergence(_))
    }
}

/// A [`ProcessError`] tagged with the sample and stage it came from.
#[derive(Debug, Error)]
#[error("sample {sample_id} ({}): {source}", stage.label())]
pub struct SampleError {
    pub sample_id: String,
    pub stage: Stage,
    #[source]
    pub source: ProcessError,
}

impl SampleError {
    pub fn new(sample_id: impl Into<String>, stage: Stage, source: ProcessError) -> Self {
        Self {
            sample_id: sample_id.into(),
            stage,
            source,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl ProcessError {
    fn exit_code(&self) -> u8 {
        match self {
            ProcessError::MissingColumn { .. }
            | ProcessError::InvalidConfig(_)
            | ProcessError::Parse { .. }
            | ProcessError::Io { .. }
            | ProcessError::Csv(_) => 2,
            ProcessError::EmptyData(_) | ProcessError::InvalidSegment(_) => 3,
            ProcessError::DegenerateFit(_) | ProcessError::FitConvergence(_) => 4,
        }
    }
}

impl From<ProcessError> for AppError {
    fn from(err: ProcessError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl From<SampleError> for AppError {
    fn from(err: SampleError) -> Self {
        AppError::new(err.source.exit_code(), err.to_string())
    }
}
