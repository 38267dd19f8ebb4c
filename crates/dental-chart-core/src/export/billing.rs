//! Billing document content and export orchestration.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use sha2::{Digest, Sha256};

use super::pdf::{layout_billing, render_pages};
use super::snapshot::{ChartImage, ChartSnapshotter};
use super::{ExportError, ExportResult};
use crate::chart::{ChartModel, HighlightOverlay};
use crate::config::ClinicConfig;
use crate::models::{PatientDetails, ProcedureRecord, TreatedTooth};
use crate::store::{Collection, DocumentStore, Readiness, StoreError};

/// Printed instead of the chart when capture fails.
pub const CHART_CAPTURE_PLACEHOLDER: &str = "Error capturing teeth chart image";

/// Printed in the chart section when no teeth were marked.
pub const NO_TEETH_MESSAGE: &str = "No specific teeth were marked for this procedure.";

/// Patient block of the billing document.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientBlock {
    pub full_name: String,
    pub contact_no: String,
    pub email: String,
    pub address: String,
    pub birthday: String,
    /// Procedure date
    pub date: String,
}

/// Procedure block of the billing document.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureBlock {
    pub procedure: String,
    pub doctor: String,
    pub remarks: String,
}

/// Single row of the billing table, amounts already formatted.
#[derive(Debug, Clone, PartialEq)]
pub struct BillingRow {
    pub procedure: String,
    pub total_bill: String,
    pub amount_paid: String,
    pub balance: String,
}

/// Chart figure of the billing document.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartFigure {
    Image(ChartImage),
    /// Capture was attempted and failed
    CaptureFailed,
    /// No treated teeth, so no capture was attempted
    NotApplicable,
}

/// Content of a billing document, independent of the output format.
#[derive(Debug, Clone, PartialEq)]
pub struct BillingDocument {
    pub procedure_id: String,
    pub file_name: String,
    pub clinic_name: String,
    pub taglines: Vec<String>,
    pub generated_at: String,
    pub patient: PatientBlock,
    pub procedure: ProcedureBlock,
    pub chart: ChartFigure,
    /// One line per treated tooth
    pub treated_lines: Vec<String>,
    pub billing: BillingRow,
    /// Footer line printed on every page
    pub thank_you: String,
    /// SHA-256 of the record's canonical JSON, for audit traceability
    pub record_digest: String,
}

impl BillingDocument {
    /// Assemble the document for a stored procedure.
    pub fn assemble(
        procedure_id: &str,
        record: &ProcedureRecord,
        patient: &PatientDetails,
        chart: ChartFigure,
        config: &ClinicConfig,
        generated_at: DateTime<Utc>,
    ) -> ExportResult<Self> {
        let or_na = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or("N/A")
                .to_string()
        };
        let text_or = |value: &str, fallback: &str| {
            if value.trim().is_empty() {
                fallback.to_string()
            } else {
                value.to_string()
            }
        };

        let date = record
            .date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "N/A".to_string());

        Ok(Self {
            procedure_id: procedure_id.to_string(),
            file_name: billing_file_name(&patient.file_label(), record.date, procedure_id),
            clinic_name: config.clinic.name.clone(),
            taglines: config.clinic.taglines.clone(),
            generated_at: generated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            patient: PatientBlock {
                full_name: patient.display_name(),
                contact_no: or_na(&patient.contact_no),
                email: or_na(&patient.email),
                address: or_na(&patient.address),
                birthday: or_na(&patient.birthday),
                date,
            },
            procedure: ProcedureBlock {
                procedure: text_or(&record.procedure, "N/A"),
                doctor: text_or(&record.doctor, "N/A"),
                remarks: text_or(&record.remarks, "None"),
            },
            chart,
            treated_lines: ChartModel::from_treated(&record.treated_teeth)
                .collect()
                .iter()
                .map(TreatedTooth::billing_line)
                .collect(),
            billing: BillingRow {
                procedure: text_or(&record.procedure, "N/A"),
                total_bill: format_amount(record.billing.total_bill),
                amount_paid: format_amount(record.billing.amount),
                balance: format_amount(record.billing.balance),
            },
            thank_you: config.clinic.thank_you_line(),
            record_digest: record_digest(record)?,
        })
    }

    /// Whether the chart section lists treated teeth.
    pub fn has_treated_teeth(&self) -> bool {
        !self.treated_lines.is_empty()
    }

    /// Plain-text rendering in document order, without pagination.
    pub fn to_text(&self) -> String {
        let mut lines = vec![self.clinic_name.clone()];
        lines.extend(self.taglines.iter().cloned());
        lines.push(format!("Generated: {}", self.generated_at));
        lines.push(String::new());

        lines.push("PATIENT INFORMATION".to_string());
        lines.push(format!("Full Name: {}", self.patient.full_name));
        lines.push(format!("Contact No.: {}", self.patient.contact_no));
        lines.push(format!("Email: {}", self.patient.email));
        lines.push(format!("Address: {}", self.patient.address));
        lines.push(format!("Birthday: {}", self.patient.birthday));
        lines.push(format!("Date: {}", self.patient.date));
        lines.push(String::new());

        lines.push("PROCEDURE DETAILS".to_string());
        lines.push(format!("Procedure: {}", self.procedure.procedure));
        lines.push(format!("Doctor: {}", self.procedure.doctor));
        lines.push(format!("Remarks: {}", self.procedure.remarks));
        lines.push(String::new());

        lines.push("DENTAL CHART - TREATED TEETH".to_string());
        if self.has_treated_teeth() {
            match &self.chart {
                ChartFigure::Image(image) => lines.push(format!(
                    "[chart image {}x{}]",
                    image.width_px, image.height_px
                )),
                ChartFigure::CaptureFailed | ChartFigure::NotApplicable => {
                    lines.push(CHART_CAPTURE_PLACEHOLDER.to_string())
                }
            }
            lines.push("Treated Teeth Summary:".to_string());
            lines.extend(self.treated_lines.iter().cloned());
        } else {
            lines.push(NO_TEETH_MESSAGE.to_string());
        }
        lines.push(String::new());

        lines.push("BILLING INFORMATION".to_string());
        lines.push("Procedure | Total Bill | Amount Paid | Balance".to_string());
        lines.push(format!(
            "{} | {} | {} | {}",
            self.billing.procedure,
            self.billing.total_bill,
            self.billing.amount_paid,
            self.billing.balance
        ));
        lines.push(String::new());
        lines.push(self.thank_you.clone());

        lines.join("\n")
    }
}

/// Format an amount en-US style with two decimals. Missing amounts print as zero.
pub fn format_amount(value: Option<f64>) -> String {
    let value = value.filter(|v| v.is_finite()).unwrap_or(0.0);
    let cents = (value.abs() * 100.0).round() as u64;
    let digits = (cents / 100).to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}{}.{:02}", sign, grouped, cents % 100)
}

/// `Billing_{label}_{date|No_Date}_{id}.pdf`
pub fn billing_file_name(label: &str, date: Option<NaiveDate>, procedure_id: &str) -> String {
    let date = date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "No_Date".to_string());
    format!("Billing_{}_{}_{}.pdf", label, date, procedure_id)
}

/// Hex SHA-256 of the record's canonical JSON.
pub fn record_digest(record: &ProcedureRecord) -> serde_json::Result<String> {
    let json = record.to_canonical_json()?;
    Ok(hex::encode(Sha256::digest(json.as_bytes())))
}

/// A generated billing document.
#[derive(Debug, Clone)]
pub struct BillingOutput {
    pub document: BillingDocument,
    /// Rendered PDF bytes
    pub pdf: Vec<u8>,
    /// Where the PDF was written, when an output directory is configured
    pub written_to: Option<PathBuf>,
}

/// Builds billing documents for stored procedures.
#[derive(Clone)]
pub struct BillingExporter {
    store: Arc<dyn DocumentStore>,
    readiness: Readiness,
    snapshotter: Arc<dyn ChartSnapshotter>,
    config: Arc<ClinicConfig>,
}

impl BillingExporter {
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

    /// Generate the billing document for a stored procedure.
    ///
    /// Chart capture failures are recovered as a placeholder; a missing
    /// patient fails the export.
    pub async fn export(
        &self,
        procedure_id: &str,
        record: &ProcedureRecord,
    ) -> ExportResult<BillingOutput> {
        self.readiness
            .wait(self.config.store.init_timeout())
            .await?;

        let patient_doc = match self
            .store
            .get(Collection::PatientDetails, &record.patient_id)
            .await
        {
            Ok(doc) => doc,
            Err(StoreError::NotFound { .. }) => {
                return Err(ExportError::PatientNotFound(record.patient_id.clone()))
            }
            Err(e) => return Err(e.into()),
        };
        let patient = PatientDetails::from_document(&patient_doc.body);

        let chart_model = ChartModel::from_treated(&record.treated_teeth);
        let chart = if !chart_model.is_empty() {
            self.capture_chart(procedure_id, &chart_model).await
        } else {
            ChartFigure::NotApplicable
        };

        let document = BillingDocument::assemble(
            procedure_id,
            record,
            &patient,
            chart,
            &self.config,
            Utc::now(),
        )?;
        let pages = layout_billing(&document, self.config.billing.chart_image_width_mm);
        let pdf = render_pages(&document, &pages)?;

        let written_to = match &self.config.billing.output_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                let path = dir.join(&document.file_name);
                std::fs::write(&path, &pdf)?;
                Some(path)
            }
            None => None,
        };

        tracing::info!(
            procedure_id = %procedure_id,
            file_name = %document.file_name,
            pages = pages.len(),
            "Billing document generated"
        );

        Ok(BillingOutput {
            document,
            pdf,
            written_to,
        })
    }

    async fn capture_chart(&self, procedure_id: &str, chart: &ChartModel) -> ChartFigure {
        let overlay = HighlightOverlay::from_chart(chart);

        match self.snapshotter.snapshot(chart, &overlay).await {
            Ok(image) => ChartFigure::Image(image),
            Err(e) => {
                tracing::warn!(procedure_id = %procedure_id, error = %e, "Chart capture failed");
                ChartFigure::CaptureFailed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BillingAmounts, SurfaceSection};

    fn make_record() -> ProcedureRecord {
        ProcedureRecord {
            patient_id: "p1".into(),
            procedure: "Root Canal".into(),
            doctor: "Dr. Cruz".into(),
            date: NaiveDate::from_ymd_opt(2024, 3, 14),
            remarks: String::new(),
            clinical: Default::default(),
            billing: BillingAmounts {
                total_bill: None,
                amount: Some(1500.5),
                balance: Some(1234567.891),
            },
            treated_teeth: vec![TreatedTooth {
                tooth_number: 11,
                treatment_done: "RCT".into(),
                existing_condition: String::new(),
                active_sections: vec![SurfaceSection::Center, SurfaceSection::Top],
            }],
            updated_at: None,
        }
    }

    fn make_patient() -> PatientDetails {
        PatientDetails {
            full_name: Some("Ana Santos".into()),
            email: Some("ana@example.com".into()),
            ..Default::default()
        }
    }

    fn generated_at() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-14T09:30:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(None), "0.00");
        assert_eq!(format_amount(Some(0.0)), "0.00");
        assert_eq!(format_amount(Some(999.999)), "1,000.00");
        assert_eq!(format_amount(Some(1500.5)), "1,500.50");
        assert_eq!(format_amount(Some(1234567.891)), "1,234,567.89");
        assert_eq!(format_amount(Some(-42.0)), "-42.00");
        assert_eq!(format_amount(Some(f64::NAN)), "0.00");
    }

    #[test]
    fn test_file_name() {
        assert_eq!(
            billing_file_name("Ana_Santos", NaiveDate::from_ymd_opt(2024, 3, 14), "abc"),
            "Billing_Ana_Santos_2024-03-14_abc.pdf"
        );
        assert_eq!(
            billing_file_name("Unknown_Patient", None, "abc"),
            "Billing_Unknown_Patient_No_Date_abc.pdf"
        );
    }

    #[test]
    fn test_assemble_content() {
        let document = BillingDocument::assemble(
            "proc-1",
            &make_record(),
            &make_patient(),
            ChartFigure::CaptureFailed,
            &ClinicConfig::default(),
            generated_at(),
        )
        .unwrap();

        assert_eq!(document.file_name, "Billing_Ana_Santos_2024-03-14_proc-1.pdf");
        assert_eq!(document.patient.full_name, "Ana Santos");
        assert_eq!(document.patient.contact_no, "N/A");
        assert_eq!(document.procedure.remarks, "None");
        assert_eq!(
            document.treated_lines,
            vec!["Tooth 11: Treatment: RCT | Sections: center, top"]
        );
        assert_eq!(document.billing.total_bill, "0.00");
        assert_eq!(document.billing.amount_paid, "1,500.50");
        assert_eq!(document.billing.balance, "1,234,567.89");
        assert_eq!(document.record_digest.len(), 64);

        let text = document.to_text();
        assert!(text.contains(CHART_CAPTURE_PLACEHOLDER));
        assert!(text.contains("Treated Teeth Summary:"));
        assert!(text.ends_with("Thank you for choosing Dental Clinic"));

        let patient_pos = text.find("PATIENT INFORMATION").unwrap();
        let chart_pos = text.find("DENTAL CHART").unwrap();
        let billing_pos = text.find("BILLING INFORMATION").unwrap();
        assert!(patient_pos < chart_pos && chart_pos < billing_pos);
    }

    #[test]
    fn test_assemble_without_teeth() {
        let mut record = make_record();
        record.treated_teeth.clear();

        let document = BillingDocument::assemble(
            "proc-2",
            &record,
            &PatientDetails::default(),
            ChartFigure::NotApplicable,
            &ClinicConfig::default(),
            generated_at(),
        )
        .unwrap();

        assert_eq!(document.patient.full_name, "N/A");
        assert!(document.file_name.starts_with("Billing_Unknown_Patient_"));
        let text = document.to_text();
        assert!(text.contains(NO_TEETH_MESSAGE));
        assert!(!text.contains("Treated Teeth Summary:"));
    }

    #[test]
    fn test_assemble_lists_teeth_in_chart_order() {
        let tooth = |n: u32, treatment: &str, condition: &str, sections: Vec<SurfaceSection>| {
            TreatedTooth {
                tooth_number: n,
                treatment_done: treatment.into(),
                existing_condition: condition.into(),
                active_sections: sections,
            }
        };
        let mut record = make_record();
        record.treated_teeth = vec![
            tooth(48, "EXT", "", vec![]),
            tooth(99, "BAD", "", vec![]),
            tooth(11, "", "C", vec![]),
            tooth(48, "", "", vec![SurfaceSection::Top]),
        ];

        let document = BillingDocument::assemble(
            "proc-3",
            &record,
            &make_patient(),
            ChartFigure::CaptureFailed,
            &ClinicConfig::default(),
            generated_at(),
        )
        .unwrap();

        assert_eq!(
            document.treated_lines,
            vec![
                "Tooth 11: | Condition: C",
                "Tooth 48: Treatment: EXT | Sections: top",
            ]
        );
    }

    #[test]
    fn test_digest_tracks_record_content() {
        let record = make_record();
        let mut changed = record.clone();
        changed.remarks = "Changed".into();

        assert_eq!(record_digest(&record).unwrap(), record_digest(&record).unwrap());
        assert_ne!(record_digest(&record).unwrap(), record_digest(&changed).unwrap());
    }
}
