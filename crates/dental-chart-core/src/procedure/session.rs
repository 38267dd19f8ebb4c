//! Procedure editing session.
//!
//! A session owns one chart and walks a single procedure record through its
//! lifecycle:
//!
//! ```text
//!            submit               edit
//!   Draft ──────────▶ Saved ◀──────────┐
//!     │  ▲              │ edit          │ update
//!     │  │ close        ▼               │
//!     │  └──────── Viewing ──edit──▶ Editing
//!     └── open ──────▲
//! ```
//!
//! `close` returns to Draft from any state. The chart is only mutable in
//! Draft and Editing.

use std::sync::Arc;

use chrono::{Local, Utc};

use super::validation::{validate_form, DoctorRoster};
use super::{ProcedureError, ProcedureResult};
use crate::chart::ChartModel;
use crate::config::ClinicConfig;
use crate::export::{BillingExporter, BillingOutput, ChartSnapshotter};
use crate::models::{ProcedureForm, ProcedureRecord};
use crate::store::{Collection, DocumentStore, Readiness, StoreError};

/// Collaborators of a session, passed in explicitly.
#[derive(Clone)]
pub struct SessionContext {
    pub store: Arc<dyn DocumentStore>,
    pub readiness: Readiness,
    pub snapshotter: Arc<dyn ChartSnapshotter>,
    pub config: Arc<ClinicConfig>,
}

impl SessionContext {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        readiness: Readiness,
        snapshotter: Arc<dyn ChartSnapshotter>,
        config: Arc<ClinicConfig>,
    ) -> Self {
        Self {
            store,
            readiness,
            snapshotter,
            config,
        }
    }

    pub fn exporter(&self) -> BillingExporter {
        BillingExporter::new(
            self.store.clone(),
            self.readiness.clone(),
            self.snapshotter.clone(),
            self.config.clone(),
        )
    }

    /// Wait for the store, bounded by the configured timeout.
    pub async fn ready(&self) -> ProcedureResult<()> {
        self.readiness
            .wait(self.config.store.init_timeout())
            .await
            .map_err(ProcedureError::from)
    }

    /// Configured doctors merged with the `doctors` collection.
    pub async fn roster(&self) -> ProcedureResult<DoctorRoster> {
        self.ready().await?;
        let mut roster = DoctorRoster::new(self.config.doctors.names.iter().cloned());
        let documents = self.store.list(Collection::Doctors).await?;
        roster.extend_from_documents(&documents);
        Ok(roster)
    }
}

/// Lifecycle state of the session's procedure record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// New, unsaved procedure
    Draft,
    /// Persisted; chart locked
    Saved { id: String },
    /// Loaded read-only
    Viewing { id: String },
    /// Loaded for in-place update
    Editing { id: String },
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Draft => "drafting",
            SessionState::Saved { .. } => "saved",
            SessionState::Viewing { .. } => "viewing",
            SessionState::Editing { .. } => "editing",
        }
    }

    pub fn procedure_id(&self) -> Option<&str> {
        match self {
            SessionState::Draft => None,
            SessionState::Saved { id } | SessionState::Viewing { id } | SessionState::Editing { id } => {
                Some(id)
            }
        }
    }

    pub fn is_chart_editable(&self) -> bool {
        matches!(self, SessionState::Draft | SessionState::Editing { .. })
    }
}

/// Answer to the confirmation prompt shown before saving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

/// Successful save with its billing document.
#[derive(Debug, Clone)]
pub struct SaveReport {
    pub procedure_id: String,
    pub record: ProcedureRecord,
    pub billing: BillingOutput,
}

#[derive(Debug, Clone)]
pub enum SaveOutcome {
    /// Declined at the confirmation prompt; nothing changed
    Cancelled,
    Saved(SaveReport),
}

/// A stored procedure and its ID.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredProcedure {
    pub id: String,
    pub record: ProcedureRecord,
}

/// One patient's procedure form and chart.
pub struct ProcedureSession {
    ctx: SessionContext,
    exporter: BillingExporter,
    patient_id: String,
    state: SessionState,
    chart: ChartModel,
    loaded: Option<ProcedureRecord>,
}

impl ProcedureSession {
    pub fn new(ctx: SessionContext, patient_id: impl Into<String>) -> Self {
        let exporter = ctx.exporter();
        Self {
            ctx,
            exporter,
            patient_id: patient_id.into(),
            state: SessionState::Draft,
            chart: ChartModel::new(),
            loaded: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn patient_id(&self) -> &str {
        &self.patient_id
    }

    pub fn chart(&self) -> &ChartModel {
        &self.chart
    }

    /// Mutable chart access. Only allowed while drafting or editing.
    pub fn chart_mut(&mut self) -> ProcedureResult<&mut ChartModel> {
        if !self.state.is_chart_editable() {
            return Err(ProcedureError::Locked(self.state.name()));
        }
        Ok(&mut self.chart)
    }

    /// The record last loaded or saved.
    pub fn loaded_record(&self) -> Option<&ProcedureRecord> {
        self.loaded.as_ref()
    }

    /// Form values for the loaded record, for populating the form.
    pub fn form(&self) -> Option<ProcedureForm> {
        self.loaded.as_ref().map(ProcedureRecord::to_form)
    }

    /// Save a new procedure and generate its billing document.
    pub async fn submit(
        &mut self,
        form: ProcedureForm,
        confirmation: Confirmation,
    ) -> ProcedureResult<SaveOutcome> {
        if self.state != SessionState::Draft {
            return Err(self.invalid("submit"));
        }

        let roster = self.ctx.roster().await?;
        validate_form(&form, &roster, Local::now().date_naive())?;
        if confirmation == Confirmation::Declined {
            return Ok(SaveOutcome::Cancelled);
        }

        let record = form.into_record(self.patient_id.clone(), self.chart.collect());
        let id = self
            .ctx
            .store
            .add(Collection::Procedures, record.to_document()?)
            .await?;

        tracing::info!(
            procedure_id = %id,
            patient_id = %self.patient_id,
            teeth = record.treated_teeth.len(),
            "Procedure saved"
        );

        self.state = SessionState::Saved { id: id.clone() };
        self.loaded = Some(record.clone());

        self.finish_save(id, record).await
    }

    /// Load a stored procedure read-only.
    pub async fn open(&mut self, procedure_id: &str) -> ProcedureResult<&ProcedureRecord> {
        if !matches!(self.state, SessionState::Draft | SessionState::Saved { .. }) {
            return Err(self.invalid("open"));
        }

        let record = self.fetch(procedure_id).await?;
        if record.patient_id != self.patient_id {
            tracing::warn!(
                procedure_id = %procedure_id,
                record_patient = %record.patient_id,
                session_patient = %self.patient_id,
                "Opened procedure belongs to another patient"
            );
        }

        self.chart.load_from(&record.treated_teeth);
        self.state = SessionState::Viewing {
            id: procedure_id.to_string(),
        };
        tracing::info!(procedure_id = %procedure_id, "Procedure opened");

        Ok(self.loaded.insert(record))
    }

    /// Switch a viewed or saved procedure to editing.
    pub fn edit(&mut self) -> ProcedureResult<()> {
        match &self.state {
            SessionState::Viewing { id } | SessionState::Saved { id } => {
                self.state = SessionState::Editing { id: id.clone() };
                Ok(())
            }
            _ => Err(self.invalid("edit")),
        }
    }

    /// Replace the procedure being edited and regenerate its billing document.
    pub async fn update(
        &mut self,
        form: ProcedureForm,
        confirmation: Confirmation,
    ) -> ProcedureResult<SaveOutcome> {
        let id = match &self.state {
            SessionState::Editing { id } => id.clone(),
            _ => return Err(self.invalid("update")),
        };

        let roster = self.ctx.roster().await?;
        validate_form(&form, &roster, Local::now().date_naive())?;
        if confirmation == Confirmation::Declined {
            return Ok(SaveOutcome::Cancelled);
        }

        let patient_id = self
            .loaded
            .as_ref()
            .map(|r| r.patient_id.clone())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| self.patient_id.clone());
        let mut record = form.into_record(patient_id, self.chart.collect());
        record.updated_at = Some(Utc::now());

        self.ctx
            .store
            .update(Collection::Procedures, &id, record.to_document()?)
            .await
            .map_err(|e| not_found_as(e, &id))?;

        tracing::info!(procedure_id = %id, teeth = record.treated_teeth.len(), "Procedure updated");

        self.state = SessionState::Saved { id: id.clone() };
        self.loaded = Some(record.clone());

        self.finish_save(id, record).await
    }

    /// Discard the loaded record and return to an empty draft.
    pub fn close(&mut self) {
        self.chart.clear();
        self.loaded = None;
        self.state = SessionState::Draft;
    }

    /// Regenerate the billing document for a stored procedure. The session
    /// state is not changed.
    pub async fn print_existing(&self, procedure_id: &str) -> ProcedureResult<BillingOutput> {
        let record = self.fetch(procedure_id).await?;
        Ok(self.exporter.export(procedure_id, &record).await?)
    }

    /// This patient's procedures, most recent date first. Undated records
    /// sort last.
    pub async fn history(&self) -> ProcedureResult<Vec<StoredProcedure>> {
        self.ctx.ready().await?;
        let documents = self
            .ctx
            .store
            .find_by_field(Collection::Procedures, "patientId", &self.patient_id)
            .await?;

        let mut procedures = documents
            .into_iter()
            .map(|doc| -> ProcedureResult<StoredProcedure> {
                Ok(StoredProcedure {
                    record: ProcedureRecord::from_document(doc.body)?,
                    id: doc.id,
                })
            })
            .collect::<ProcedureResult<Vec<_>>>()?;

        procedures.sort_by(|a, b| b.record.date.cmp(&a.record.date));
        Ok(procedures)
    }

    async fn fetch(&self, procedure_id: &str) -> ProcedureResult<ProcedureRecord> {
        self.ctx.ready().await?;
        let doc = self
            .ctx
            .store
            .get(Collection::Procedures, procedure_id)
            .await
            .map_err(|e| not_found_as(e, procedure_id))?;
        Ok(ProcedureRecord::from_document(doc.body)?)
    }

    async fn finish_save(
        &self,
        procedure_id: String,
        record: ProcedureRecord,
    ) -> ProcedureResult<SaveOutcome> {
        match self.exporter.export(&procedure_id, &record).await {
            Ok(billing) => Ok(SaveOutcome::Saved(SaveReport {
                procedure_id,
                record,
                billing,
            })),
            Err(source) => {
                tracing::warn!(procedure_id = %procedure_id, error = %source, "Billing failed after save");
                Err(ProcedureError::Billing {
                    procedure_id,
                    source,
                })
            }
        }
    }

    fn invalid(&self, action: &'static str) -> ProcedureError {
        ProcedureError::InvalidTransition {
            action,
            state: self.state.name(),
        }
    }
}

fn not_found_as(e: StoreError, procedure_id: &str) -> ProcedureError {
    match e {
        StoreError::NotFound { .. } => ProcedureError::NotFound(procedure_id.to_string()),
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::UnavailableSnapshotter;
    use crate::models::{SurfaceSection, ToothId};
    use crate::store::SqliteDocumentStore;
    use chrono::NaiveDate;
    use serde_json::json;

    fn setup_session() -> (ProcedureSession, SqliteDocumentStore) {
        let store = SqliteDocumentStore::open_in_memory().unwrap();
        store
            .insert_with_id(Collection::PatientDetails, "p1", &json!({"fullName": "Ana Santos"}))
            .unwrap();

        let mut config = ClinicConfig::default();
        config.doctors.names = vec!["Dr. Cruz".to_string()];

        let ctx = SessionContext::new(
            Arc::new(store.clone()),
            Readiness::ready(),
            Arc::new(UnavailableSnapshotter),
            Arc::new(config),
        );
        (ProcedureSession::new(ctx, "p1"), store)
    }

    fn make_form() -> ProcedureForm {
        ProcedureForm {
            procedure: "Filling".into(),
            doctor: "dr. cruz".into(),
            date: NaiveDate::from_ymd_opt(2024, 1, 10),
            ..Default::default()
        }
    }

    #[test]
    fn test_state_names() {
        assert_eq!(SessionState::Draft.name(), "drafting");
        assert_eq!(SessionState::Draft.procedure_id(), None);
        let editing = SessionState::Editing { id: "x".into() };
        assert_eq!(editing.procedure_id(), Some("x"));
        assert!(editing.is_chart_editable());
        assert!(!SessionState::Viewing { id: "x".into() }.is_chart_editable());
    }

    #[tokio::test]
    async fn test_declined_submit_changes_nothing() {
        let (mut session, store) = setup_session();
        let outcome = session
            .submit(make_form(), Confirmation::Declined)
            .await
            .unwrap();

        assert!(matches!(outcome, SaveOutcome::Cancelled));
        assert_eq!(session.state(), &SessionState::Draft);
        assert!(store.list(Collection::Procedures).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_submit_saves_and_locks_chart() {
        let (mut session, _store) = setup_session();
        session
            .chart_mut()
            .unwrap()
            .toggle_section(ToothId::new(11).unwrap(), SurfaceSection::Top);

        let outcome = session
            .submit(make_form(), Confirmation::Confirmed)
            .await
            .unwrap();
        let SaveOutcome::Saved(report) = outcome else {
            panic!("expected a saved outcome");
        };

        assert_eq!(
            session.state(),
            &SessionState::Saved {
                id: report.procedure_id.clone()
            }
        );
        assert_eq!(report.record.doctor, "dr. cruz");
        assert_eq!(report.record.treated_teeth.len(), 1);
        assert!(matches!(session.chart_mut(), Err(ProcedureError::Locked("saved"))));
    }

    #[tokio::test]
    async fn test_invalid_transitions() {
        let (mut session, _store) = setup_session();

        assert!(matches!(
            session.edit(),
            Err(ProcedureError::InvalidTransition { action: "edit", .. })
        ));
        assert!(matches!(
            session.update(make_form(), Confirmation::Confirmed).await,
            Err(ProcedureError::InvalidTransition { action: "update", .. })
        ));
        assert_eq!(session.state(), &SessionState::Draft);
    }

    #[tokio::test]
    async fn test_open_missing_procedure() {
        let (mut session, _store) = setup_session();
        session
            .chart_mut()
            .unwrap()
            .toggle_section(ToothId::new(21).unwrap(), SurfaceSection::Left);

        let result = session.open("missing").await;
        assert!(matches!(result, Err(ProcedureError::NotFound(id)) if id == "missing"));

        // Failed fetch leaves the chart as it was.
        assert!(session.chart().is_modified(ToothId::new(21).unwrap()));
        assert_eq!(session.state(), &SessionState::Draft);
    }
}
