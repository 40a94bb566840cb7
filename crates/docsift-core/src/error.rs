//! Error types for docsift operations.
//!
//! Run-level infrastructure failures (output directory, run lock, record file)
//! surface as [`SiftError`]. Per-document extraction failures never do: those
//! become quarantine records with a [`crate::ReasonCode`].

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for docsift operations.
pub type SiftResult<T> = Result<T, SiftError>;

/// Main error type for all docsift operations.
#[derive(Error, Debug)]
pub enum SiftError {
    /// Configuration is missing or inconsistent.
    #[error("Configuration error: {message}")]
    Configuration { message: String, code: ErrorCode },

    /// Writing the run record file failed.
    #[error("Record writer error: {message}")]
    Record {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Moving a file into review or appending its manifest row failed.
    #[error("Quarantine error: {message}")]
    Quarantine {
        message: String,
        code: ErrorCode,
        path: Option<PathBuf>,
    },

    /// Another worker already owns the run.
    #[error("Run lock error: {message}")]
    RunLock { message: String, code: ErrorCode },

    /// Scratch space could not be acquired.
    #[error("Scratch error: {message}")]
    Scratch {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A run was asked to move backwards or skip a lifecycle state.
    #[error("Invalid run transition for '{run}': {from} -> {to}")]
    InvalidTransition {
        run: String,
        from: String,
        to: String,
    },

    /// Pruning refused to touch a path outside the run boundary.
    #[error("Refusing to prune {path}: {message}")]
    PruneBoundary { path: PathBuf, message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Configuration (CFG_xxx)
    CfgInvalidValue,
    CfgCutoffOrder,
    CfgUnsupportedFormat,

    // Record output (REC_xxx)
    RecOpenFailed,
    RecWriteFailed,

    // Quarantine (QRN_xxx)
    QrnMoveFailed,
    QrnManifestFailed,

    // Run lock (LCK_xxx)
    LockHeld,
    LockCreateFailed,

    // Scratch (SCR_xxx)
    ScrCreateFailed,

    // Filesystem (IO_xxx)
    IoFailed,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::CfgInvalidValue => "CFG_001",
            ErrorCode::CfgCutoffOrder => "CFG_002",
            ErrorCode::CfgUnsupportedFormat => "CFG_003",
            ErrorCode::RecOpenFailed => "REC_001",
            ErrorCode::RecWriteFailed => "REC_002",
            ErrorCode::QrnMoveFailed => "QRN_001",
            ErrorCode::QrnManifestFailed => "QRN_002",
            ErrorCode::LockHeld => "LCK_001",
            ErrorCode::LockCreateFailed => "LCK_002",
            ErrorCode::ScrCreateFailed => "SCR_001",
            ErrorCode::IoFailed => "IO_001",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl SiftError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            code: ErrorCode::CfgInvalidValue,
        }
    }

    /// Create a configuration error for a ladder whose cutoffs do not decrease.
    pub fn cutoff_order(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            code: ErrorCode::CfgCutoffOrder,
        }
    }

    /// Create a record writer error.
    pub fn record(message: impl Into<String>) -> Self {
        Self::Record {
            message: message.into(),
            code: ErrorCode::RecWriteFailed,
            source: None,
        }
    }

    /// Create a quarantine move error.
    pub fn quarantine_move(message: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::Quarantine {
            message: message.into(),
            code: ErrorCode::QrnMoveFailed,
            path: Some(path.into()),
        }
    }

    /// Create a quarantine manifest error.
    pub fn quarantine_manifest(message: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::Quarantine {
            message: message.into(),
            code: ErrorCode::QrnManifestFailed,
            path: Some(path.into()),
        }
    }

    /// Create a run lock error for a run that is already owned.
    pub fn lock_held(run: impl AsRef<str>) -> Self {
        Self::RunLock {
            message: format!("run '{}' is locked by another worker", run.as_ref()),
            code: ErrorCode::LockHeld,
        }
    }

    /// Create a scratch error.
    pub fn scratch(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Scratch {
            message: message.into(),
            code: ErrorCode::ScrCreateFailed,
            source: Some(Box::new(source)),
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Configuration { code, .. } => *code,
            Self::Record { code, .. } => *code,
            Self::Quarantine { code, .. } => *code,
            Self::RunLock { code, .. } => *code,
            Self::Scratch { code, .. } => *code,
            Self::Io(_) => ErrorCode::IoFailed,
            _ => ErrorCode::Internal,
        }
    }

    /// Whether the error is a lock already held by someone else.
    pub fn is_lock_held(&self) -> bool {
        matches!(self.code(), ErrorCode::LockHeld)
    }
}

impl From<csv::Error> for SiftError {
    fn from(err: csv::Error) -> Self {
        Self::Record {
            message: err.to_string(),
            code: ErrorCode::RecWriteFailed,
            source: Some(Box::new(err)),
        }
    }
}
