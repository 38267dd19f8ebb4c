//! Procedure record lifecycle: validation and the editing session.

mod session;
mod validation;

pub use session::*;
pub use validation::*;

use std::time::Duration;

use thiserror::Error;

use crate::export::ExportError;
use crate::store::StoreError;

/// Procedure lifecycle errors.
#[derive(Error, Debug)]
pub enum ProcedureError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Procedure not found: {0}")]
    NotFound(String),

    #[error("Store not ready after {0:?}")]
    InitializationTimeout(Duration),

    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    #[error("Chart is read-only while {0}")]
    Locked(&'static str),

    /// The record was persisted; only the billing document failed.
    #[error("Procedure {procedure_id} saved, but billing failed: {source}")]
    Billing {
        procedure_id: String,
        #[source]
        source: ExportError,
    },

    #[error("Billing export failed: {0}")]
    Export(#[from] ExportError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<StoreError> for ProcedureError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::InitializationTimeout(timeout) => ProcedureError::InitializationTimeout(timeout),
            other => ProcedureError::Store(other),
        }
    }
}

pub type ProcedureResult<T> = Result<T, ProcedureError>;
