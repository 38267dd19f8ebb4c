//! Billing document export.

mod billing;
mod pdf;
mod snapshot;

pub use billing::*;
pub use pdf::*;
pub use snapshot::*;

use thiserror::Error;

use crate::store::StoreError;

/// Export errors.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Patient not found: {0}")]
    PatientNotFound(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ExportResult<T> = Result<T, ExportError>;
