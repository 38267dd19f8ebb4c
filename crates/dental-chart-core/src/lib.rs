//! Dental Chart Core Library
//!
//! Interactive teeth chart, procedure record lifecycle and billing documents
//! for a dental clinic.
//!
//! # Architecture
//!
//! ```text
//!   Tooth catalog (52 FDI teeth)
//!            │
//!            ▼
//!   ChartModel ◀── toggle / set_text / load_from
//!            │
//!            │ collect()
//!            ▼
//!   ProcedureSession ── validate ──▶ DocumentStore (procedures)
//!     Draft → Saved → Viewing → Editing        │
//!            │                                 │ patientDetails
//!            ▼                                 ▼
//!   HighlightOverlay ──▶ ChartSnapshotter ──▶ BillingExporter
//!                                              │
//!                                              ▼
//!                                      A4 billing PDF
//! ```
//!
//! # Core Principle
//!
//! **The chart snapshot is the record.** What `collect` returns is exactly
//! what gets persisted and exactly what `load_from` restores.
//!
//! # Modules
//!
//! - [`models`]: Domain types (ToothId, TreatedTooth, ProcedureRecord, etc.)
//! - [`chart`]: Chart model, highlight overlay and SVG rendering
//! - [`db`]: SQLite document table
//! - [`store`]: Document store trait and readiness gate
//! - [`procedure`]: Form validation and the editing session
//! - [`export`]: Billing document assembly and PDF rendering
//! - [`config`]: Clinic configuration

pub mod chart;
pub mod config;
pub mod db;
pub mod export;
pub mod models;
pub mod procedure;
pub mod store;

// Re-export commonly used types
pub use chart::{render_chart_svg, ChartModel, HighlightOverlay};
pub use config::ClinicConfig;
pub use db::Database;
pub use export::{BillingDocument, BillingExporter, ChartImage, ChartSnapshotter};
pub use models::{
    PatientDetails, ProcedureForm, ProcedureRecord, SurfaceSection, ToothId, ToothTextField,
    TreatedTooth,
};
pub use procedure::{Confirmation, ProcedureSession, SaveOutcome, SessionContext, SessionState};
pub use store::{Collection, DocumentStore, Readiness, SqliteDocumentStore};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::Mutex;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum DentalChartError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Export error: {0}")]
    ExportError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<db::DbError> for DentalChartError {
    fn from(e: db::DbError) -> Self {
        DentalChartError::DatabaseError(e.to_string())
    }
}

impl From<store::StoreError> for DentalChartError {
    fn from(e: store::StoreError) -> Self {
        if matches!(e, store::StoreError::NotFound { .. }) {
            DentalChartError::NotFound(e.to_string())
        } else {
            DentalChartError::DatabaseError(e.to_string())
        }
    }
}

impl From<procedure::ProcedureError> for DentalChartError {
    fn from(e: procedure::ProcedureError) -> Self {
        use procedure::ProcedureError;
        let message = e.to_string();
        match e {
            ProcedureError::Validation(v) => DentalChartError::ValidationError(v.to_string()),
            ProcedureError::NotFound(id) => DentalChartError::NotFound(id),
            ProcedureError::Store(s) => s.into(),
            ProcedureError::Billing { .. } | ProcedureError::Export(_) => {
                DentalChartError::ExportError(message)
            }
            _ => DentalChartError::InvalidInput(message),
        }
    }
}

impl From<export::ExportError> for DentalChartError {
    fn from(e: export::ExportError) -> Self {
        match e {
            export::ExportError::PatientNotFound(id) => DentalChartError::NotFound(id),
            other => DentalChartError::ExportError(other.to_string()),
        }
    }
}

impl From<config::ConfigError> for DentalChartError {
    fn from(e: config::ConfigError) -> Self {
        DentalChartError::ConfigError(e.to_string())
    }
}

impl From<serde_json::Error> for DentalChartError {
    fn from(e: serde_json::Error) -> Self {
        DentalChartError::InvalidInput(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for DentalChartError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        DentalChartError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Free Functions (exported to FFI)
// =========================================================================

/// Install a global `tracing` subscriber. Later calls are no-ops.
#[uniffi::export]
pub fn init_logging(filter: String) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let filter = tracing_subscriber::EnvFilter::try_new(&filter)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Tooth numbers in chart display order.
#[uniffi::export]
pub fn tooth_catalog() -> Vec<u8> {
    models::all_tooth_ids().iter().map(|t| t.number()).collect()
}

/// Create an empty chart.
#[uniffi::export]
pub fn new_teeth_chart() -> std::sync::Arc<TeethChart> {
    std::sync::Arc::new(TeethChart {
        chart: Mutex::new(ChartModel::new()),
    })
}

// =========================================================================
// Chart Object
// =========================================================================

/// Thread-safe chart wrapper for FFI.
#[derive(uniffi::Object)]
pub struct TeethChart {
    chart: Mutex<ChartModel>,
}

#[uniffi::export]
impl TeethChart {
    /// Flip a section; returns whether it is now active.
    pub fn toggle_section(
        &self,
        tooth_number: u32,
        section: FfiSurfaceSection,
    ) -> Result<bool, DentalChartError> {
        let tooth = tooth_for(tooth_number)?;
        let mut chart = self.chart.lock()?;
        Ok(chart.toggle_section(tooth, section.into()))
    }

    pub fn set_treatment(&self, tooth_number: u32, value: String) -> Result<(), DentalChartError> {
        let tooth = tooth_for(tooth_number)?;
        let mut chart = self.chart.lock()?;
        chart.set_text(tooth, ToothTextField::TreatmentDone, &value);
        Ok(())
    }

    pub fn set_condition(&self, tooth_number: u32, value: String) -> Result<(), DentalChartError> {
        let tooth = tooth_for(tooth_number)?;
        let mut chart = self.chart.lock()?;
        chart.set_text(tooth, ToothTextField::ExistingCondition, &value);
        Ok(())
    }

    /// Present teeth in catalog order.
    pub fn collect(&self) -> Result<Vec<FfiTreatedTooth>, DentalChartError> {
        let chart = self.chart.lock()?;
        Ok(chart.collect().into_iter().map(Into::into).collect())
    }

    pub fn clear(&self) -> Result<(), DentalChartError> {
        self.chart.lock()?.clear();
        Ok(())
    }

    /// Replace contents with a snapshot; returns how many entries were skipped.
    pub fn load_from(&self, snapshot: Vec<FfiTreatedTooth>) -> Result<u32, DentalChartError> {
        let snapshot: Vec<TreatedTooth> = snapshot.into_iter().map(Into::into).collect();
        let mut chart = self.chart.lock()?;
        Ok(chart.load_from(&snapshot) as u32)
    }

    pub fn is_modified(&self, tooth_number: u32) -> Result<bool, DentalChartError> {
        let tooth = tooth_for(tooth_number)?;
        Ok(self.chart.lock()?.is_modified(tooth))
    }

    pub fn summary_lines(&self) -> Result<Vec<String>, DentalChartError> {
        Ok(self.chart.lock()?.summary_lines())
    }

    /// SVG markup of the chart, optionally with the export highlight.
    pub fn render_svg(&self, highlighted: bool) -> Result<String, DentalChartError> {
        let chart = self.chart.lock()?;
        let overlay = highlighted.then(|| HighlightOverlay::from_chart(&chart));
        Ok(render_chart_svg(&chart, overlay.as_ref()))
    }
}

fn tooth_for(number: u32) -> Result<ToothId, DentalChartError> {
    ToothId::new(number)
        .ok_or_else(|| DentalChartError::InvalidInput(format!("Unknown tooth number {}", number)))
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe surface section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiSurfaceSection {
    Center,
    Top,
    Right,
    Bottom,
    Left,
}

impl From<FfiSurfaceSection> for SurfaceSection {
    fn from(section: FfiSurfaceSection) -> Self {
        match section {
            FfiSurfaceSection::Center => SurfaceSection::Center,
            FfiSurfaceSection::Top => SurfaceSection::Top,
            FfiSurfaceSection::Right => SurfaceSection::Right,
            FfiSurfaceSection::Bottom => SurfaceSection::Bottom,
            FfiSurfaceSection::Left => SurfaceSection::Left,
        }
    }
}

impl From<SurfaceSection> for FfiSurfaceSection {
    fn from(section: SurfaceSection) -> Self {
        match section {
            SurfaceSection::Center => FfiSurfaceSection::Center,
            SurfaceSection::Top => FfiSurfaceSection::Top,
            SurfaceSection::Right => FfiSurfaceSection::Right,
            SurfaceSection::Bottom => FfiSurfaceSection::Bottom,
            SurfaceSection::Left => FfiSurfaceSection::Left,
        }
    }
}

/// FFI-safe treated tooth entry.
#[derive(Debug, Clone, PartialEq, uniffi::Record)]
pub struct FfiTreatedTooth {
    pub tooth_number: u32,
    pub treatment_done: String,
    pub existing_condition: String,
    pub active_sections: Vec<FfiSurfaceSection>,
}

impl From<TreatedTooth> for FfiTreatedTooth {
    fn from(tooth: TreatedTooth) -> Self {
        Self {
            tooth_number: tooth.tooth_number,
            treatment_done: tooth.treatment_done,
            existing_condition: tooth.existing_condition,
            active_sections: tooth.active_sections.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<FfiTreatedTooth> for TreatedTooth {
    fn from(tooth: FfiTreatedTooth) -> Self {
        Self {
            tooth_number: tooth.tooth_number,
            treatment_done: tooth.treatment_done,
            existing_condition: tooth.existing_condition,
            active_sections: tooth.active_sections.into_iter().map(Into::into).collect(),
        }
    }
}
