//! Error types for the funnel report pipeline.
//!
//! This module defines one error type per pipeline stage:
//!
//! - [`SourceError`] - report or processed file unreadable
//! - [`ProcessError`] - unexpected shape during aggregation
//! - [`SinkError`] - output file unwritable
//! - [`AuthError`] - credential flow failure
//! - [`TransportError`] - remote Sheets write failure
//! - [`PipelineError`] - top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across stage boundaries. No stage swallows
//! a failure; the CLI decides what a failure means for the run.

use std::path::PathBuf;
use thiserror::Error;

// =============================================================================
// Source Errors
// =============================================================================

/// Errors reading an input table (the funnel report or the processed CSV).
#[derive(Debug, Error)]
pub enum SourceError {
    /// Failed to read the file at all.
    #[error("Failed to read '{}': {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Workbook could not be opened or decoded.
    #[error("Failed to open workbook '{}': {}", .path.display(), .message)]
    Workbook { path: PathBuf, message: String },

    /// Workbook has no worksheets.
    #[error("Workbook '{}' contains no worksheets", .path.display())]
    NoWorksheets { path: PathBuf },

    /// Table has no header row.
    #[error("'{}' contains no header row", .path.display())]
    EmptyTable { path: PathBuf },

    /// Invalid CSV content in the processed file.
    #[error("Invalid CSV in '{}': {}", .path.display(), .source)]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

// =============================================================================
// Processing Errors
// =============================================================================

/// Errors during aggregation.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// A required report column is missing.
    #[error("Missing report column: {0}")]
    MissingColumn(String),
}

// =============================================================================
// Sink Errors
// =============================================================================

/// Errors writing the processed CSV.
#[derive(Debug, Error)]
pub enum SinkError {
    /// IO error creating or writing the output.
    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),

    /// CSV serialization failed.
    #[error("Failed to serialize output: {0}")]
    Csv(#[from] csv::Error),

    /// Atomic rename over the destination failed.
    #[error("Failed to replace '{}': {}", .path.display(), .message)]
    Persist { path: PathBuf, message: String },
}

// =============================================================================
// Auth Errors
// =============================================================================

/// Errors from the credential store.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No token file at the configured path.
    #[error("No credentials at '{}'; provision a token file first", .0.display())]
    MissingToken(PathBuf),

    /// Token file exists but cannot be read or parsed.
    #[error("Invalid token file '{}': {}", .path.display(), .message)]
    InvalidToken { path: PathBuf, message: String },

    /// Token expired and no refresh token is stored.
    #[error("Access token expired and no refresh token is available")]
    Unrefreshable,

    /// Token refresh request failed.
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    /// Failed to persist the refreshed token.
    #[error("Failed to save token file '{}': {}", .path.display(), .message)]
    SaveFailed { path: PathBuf, message: String },
}

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors talking to the Sheets API.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Request could not be sent or the connection failed.
    #[error("Sheets request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("Sheets API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The API answered with a body we cannot decode.
    #[error("Invalid Sheets response: {0}")]
    InvalidResponse(String),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the error type returned by the functions in [`crate::pipeline`].
/// It wraps every stage error so callers can decide whether to halt.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Input unreadable.
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Aggregation failed.
    #[error("Processing error: {0}")]
    Process(#[from] ProcessError),

    /// Output file unwritable.
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    /// Credential flow failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Remote write failed.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for loader operations.
pub type SourceResult<T> = Result<T, SourceError>;

/// Result type for aggregation.
pub type ProcessResult<T> = Result<T, ProcessError>;

/// Result type for the CSV sink.
pub type SinkResult<T> = Result<T, SinkError>;

/// Result type for credential operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Result type for Sheets calls.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // ProcessError -> PipelineError
        let process_err = ProcessError::MissingColumn("Funn Status".into());
        let pipeline_err: PipelineError = process_err.into();
        assert!(pipeline_err.to_string().contains("Funn Status"));

        // AuthError -> PipelineError
        let auth_err = AuthError::Unrefreshable;
        let pipeline_err: PipelineError = auth_err.into();
        assert!(pipeline_err.to_string().contains("refresh"));
    }

    #[test]
    fn test_source_error_names_path() {
        let err = SourceError::EmptyTable {
            path: PathBuf::from("data/funnel_report.xlsx"),
        };
        assert!(err.to_string().contains("funnel_report.xlsx"));
    }

    #[test]
    fn test_transport_error_format() {
        let err = TransportError::Api {
            status: 403,
            message: "The caller does not have permission".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("403"));
        assert!(msg.contains("permission"));
    }
}
