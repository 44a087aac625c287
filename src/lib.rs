//! # Funnelsync - daily funnel counts for the sales dashboard
//!
//! Funnelsync turns the periodic sales-funnel export into a daily counted
//! time series and pushes it to the shared dashboard spreadsheet.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Funnel xlsx │────▶│   Loader    │────▶│ Aggregator  │────▶│  CSV file   │
//! │  (export)   │     │ (RawTable)  │     │ (daily cnt) │     │  (durable)  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └──────┬──────┘
//!                                                                    │
//!                                              ┌─────────────┐       │
//!                                              │   Sheets    │◀──────┘
//!                                              │ (publisher) │
//!                                              └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use funnelsync::pipeline::process_to_csv;
//! use std::path::Path;
//!
//! let outcome = process_to_csv(
//!     Path::new("data/funnel_report.xlsx"),
//!     Path::new("data/daily_funnel.csv"),
//! )?;
//! println!("{} daily records", outcome.records.len());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - One error type per stage, wrapped by [`PipelineError`]
//! - [`loader`] - Report file to in-memory table
//! - [`aggregate`] - The core filter/group/resample/count pipeline
//! - [`export`] - Durable CSV intermediate (atomic writes)
//! - [`sheets`] - Google Sheets client and credential store
//! - [`pipeline`] - Stage orchestration

// Core modules
pub mod error;

// Loading
pub mod loader;

// Aggregation
pub mod aggregate;

// Durable output
pub mod export;

// Publishing
pub mod sheets;

// Orchestration
pub mod pipeline;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    AuthError,
    PipelineError,
    ProcessError,
    SinkError,
    SourceError,
    TransportError,
};

// =============================================================================
// Re-exports - Loader
// =============================================================================

pub use loader::{load_report, Cell, RawTable};

// =============================================================================
// Re-exports - Aggregation
// =============================================================================

pub use aggregate::{aggregate, title_case, DailyFunnelCount, ALLOWED_CHANNELS};

// =============================================================================
// Re-exports - Export
// =============================================================================

pub use export::{read_csv, write_csv, OUTPUT_COLUMNS};

// =============================================================================
// Re-exports - Sheets
// =============================================================================

pub use sheets::{
    CredentialStore, SheetTarget, SheetsClient, StoredCredentials, UpdateResponse,
    SPREADSHEETS_SCOPE,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use pipeline::{process_report, process_to_csv, publish_csv, ProcessOutcome};
