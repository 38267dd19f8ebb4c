//! Procedure record models: persisted document shape and typed form input.
//!
//! Records written by older versions of the front-end differ in two ways:
//! the treated-teeth payload may live under `teethChart` instead of
//! `treatedTeeth`, and `totalBill` may be missing. Money fields were stored
//! as raw input strings. Reading accepts all of these shapes; writing always
//! produces the current shape.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::tooth::{SurfaceSection, ToothId};

/// Flattened per-tooth entry as stored inside a procedure record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TreatedTooth {
    /// FDI tooth number (kept raw so unknown legacy numbers survive reading)
    pub tooth_number: u32,
    /// Treatment performed
    #[serde(default)]
    pub treatment_done: String,
    /// Condition found before treatment
    #[serde(default)]
    pub existing_condition: String,
    /// Active surface sections, canonical order
    #[serde(default)]
    pub active_sections: Vec<SurfaceSection>,
}

impl TreatedTooth {
    /// Catalog tooth for this entry, if the number is known.
    pub fn tooth_id(&self) -> Option<ToothId> {
        ToothId::new(self.tooth_number)
    }

    /// Line used in the billing document's treated-teeth summary.
    pub fn billing_line(&self) -> String {
        let mut line = format!("Tooth {}:", self.tooth_number);
        if !self.treatment_done.is_empty() {
            line.push_str(&format!(" Treatment: {}", self.treatment_done));
        }
        if !self.existing_condition.is_empty() {
            line.push_str(&format!(" | Condition: {}", self.existing_condition));
        }
        if !self.active_sections.is_empty() {
            line.push_str(&format!(" | Sections: {}", self.sections_label()));
        }
        line
    }

    /// Label used in the on-screen summary next to the chart.
    pub fn summary_label(&self) -> String {
        let mut parts = vec![format!("Tooth {}", self.tooth_number)];
        if !self.treatment_done.is_empty() {
            parts.push(format!("Treatment: {}", self.treatment_done));
        }
        if !self.existing_condition.is_empty() {
            parts.push(format!("Condition: {}", self.existing_condition));
        }
        if !self.active_sections.is_empty() {
            parts.push(format!("Sections: {}", self.sections_label()));
        }
        parts.join(" | ")
    }

    fn sections_label(&self) -> String {
        self.active_sections
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Read an entry from a stored document, tolerating loose typing.
    ///
    /// Returns `None` when the entry has no usable tooth number. Unknown
    /// section names are dropped.
    pub fn from_value_lenient(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let tooth_number = match obj.get("toothNumber")? {
            Value::Number(n) => u32::try_from(n.as_u64()?).ok()?,
            Value::String(s) => s.trim().parse().ok()?,
            _ => return None,
        };

        let text = |key: &str| {
            obj.get(key)
                .map(text_from_value)
                .unwrap_or_default()
                .trim()
                .to_string()
        };

        let mut active_sections: Vec<SurfaceSection> = Vec::new();
        if let Some(Value::Array(items)) = obj.get("activeSections") {
            for section in items.iter().filter_map(Value::as_str).filter_map(SurfaceSection::from_name) {
                if !active_sections.contains(&section) {
                    active_sections.push(section);
                }
            }
        }

        Some(Self {
            tooth_number,
            treatment_done: text("treatmentDone"),
            existing_condition: text("existingCondition"),
            active_sections,
        })
    }
}

/// Free-text clinical fields captured by the newer procedure form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalNotes {
    pub condition: String,
    pub treatment: String,
    pub assistant_name: String,
    pub anesthesia: String,
    pub medicine: String,
    pub medicine_details: String,
}

/// Money fields of a procedure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BillingAmounts {
    /// Total bill (absent on records from the older schema)
    pub total_bill: Option<f64>,
    /// Amount paid
    pub amount: Option<f64>,
    /// Remaining balance
    pub balance: Option<f64>,
}

/// Typed procedure form input, populated once at the submit boundary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcedureForm {
    pub procedure: String,
    pub doctor: String,
    pub date: Option<NaiveDate>,
    pub remarks: String,
    pub clinical: ClinicalNotes,
    pub billing: BillingAmounts,
}

impl ProcedureForm {
    /// Build a record from this form and a collected chart snapshot.
    pub fn into_record(self, patient_id: String, treated_teeth: Vec<TreatedTooth>) -> ProcedureRecord {
        ProcedureRecord {
            patient_id,
            procedure: self.procedure.trim().to_string(),
            doctor: self.doctor.trim().to_string(),
            date: self.date,
            remarks: self.remarks.trim().to_string(),
            clinical: self.clinical,
            billing: self.billing,
            treated_teeth,
            updated_at: None,
        }
    }
}

/// A clinical procedure performed for one patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", from = "RawProcedureDocument")]
pub struct ProcedureRecord {
    /// Patient document ID
    pub patient_id: String,
    /// Procedure name
    pub procedure: String,
    /// Attending doctor, as entered
    pub doctor: String,
    /// Date performed
    pub date: Option<NaiveDate>,
    /// Free-text remarks
    pub remarks: String,
    #[serde(flatten)]
    pub clinical: ClinicalNotes,
    #[serde(flatten)]
    pub billing: BillingAmounts,
    /// Chart snapshot, canonical order
    pub treated_teeth: Vec<TreatedTooth>,
    /// Last in-place update
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProcedureRecord {
    /// Serialize to a store document (current schema).
    pub fn to_document(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// Hydrate from a store document of any known schema version.
    pub fn from_document(document: Value) -> serde_json::Result<Self> {
        serde_json::from_value(document)
    }

    /// Canonical JSON used for audit digests.
    pub fn to_canonical_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Form view of this record, for populating the UI in view/edit mode.
    pub fn to_form(&self) -> ProcedureForm {
        ProcedureForm {
            procedure: self.procedure.clone(),
            doctor: self.doctor.clone(),
            date: self.date,
            remarks: self.remarks.clone(),
            clinical: self.clinical.clone(),
            billing: self.billing.clone(),
        }
    }

    pub fn has_treated_teeth(&self) -> bool {
        !self.treated_teeth.is_empty()
    }
}

/// Wire shape accepted when reading procedure documents.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RawProcedureDocument {
    #[serde(deserialize_with = "lenient_text")]
    patient_id: String,
    #[serde(deserialize_with = "lenient_text")]
    procedure: String,
    #[serde(deserialize_with = "lenient_text")]
    doctor: String,
    #[serde(deserialize_with = "lenient_date")]
    date: Option<NaiveDate>,
    #[serde(deserialize_with = "lenient_text")]
    remarks: String,
    #[serde(deserialize_with = "lenient_text")]
    condition: String,
    #[serde(deserialize_with = "lenient_text")]
    treatment: String,
    #[serde(deserialize_with = "lenient_text")]
    assistant_name: String,
    #[serde(deserialize_with = "lenient_text")]
    anesthesia: String,
    #[serde(deserialize_with = "lenient_text")]
    medicine: String,
    #[serde(deserialize_with = "lenient_text")]
    medicine_details: String,
    #[serde(deserialize_with = "lenient_amount")]
    total_bill: Option<f64>,
    #[serde(deserialize_with = "lenient_amount")]
    amount: Option<f64>,
    #[serde(deserialize_with = "lenient_amount")]
    balance: Option<f64>,
    treated_teeth: Option<Value>,
    teeth_chart: Option<Value>,
    #[serde(deserialize_with = "lenient_timestamp")]
    updated_at: Option<DateTime<Utc>>,
}

impl From<RawProcedureDocument> for ProcedureRecord {
    fn from(raw: RawProcedureDocument) -> Self {
        // `treatedTeeth` takes precedence whenever it is present, even if empty.
        let teeth = match (raw.treated_teeth, raw.teeth_chart) {
            (Some(v), _) if !v.is_null() => v,
            (_, Some(v)) => v,
            _ => Value::Null,
        };

        let treated_teeth = match teeth {
            Value::Array(items) => items
                .iter()
                .filter_map(|item| {
                    let parsed = TreatedTooth::from_value_lenient(item);
                    if parsed.is_none() {
                        tracing::warn!(entry = %item, "Skipping malformed treated-tooth entry");
                    }
                    parsed
                })
                .collect(),
            _ => Vec::new(),
        };

        ProcedureRecord {
            patient_id: raw.patient_id,
            procedure: raw.procedure,
            doctor: raw.doctor,
            date: raw.date,
            remarks: raw.remarks,
            clinical: ClinicalNotes {
                condition: raw.condition,
                treatment: raw.treatment,
                assistant_name: raw.assistant_name,
                anesthesia: raw.anesthesia,
                medicine: raw.medicine,
                medicine_details: raw.medicine_details,
            },
            billing: BillingAmounts {
                total_bill: raw.total_bill,
                amount: raw.amount,
                balance: raw.balance,
            },
            treated_teeth,
            updated_at: raw.updated_at,
        }
    }
}

fn text_from_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

/// Parse a stored money value: number, numeric string, empty string or null.
pub fn amount_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned = s.trim().replace(',', "");
            if cleaned.is_empty() {
                None
            } else {
                cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
            }
        }
        _ => None,
    }
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(text_from_value).unwrap_or_default())
}

fn lenient_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(amount_from_value))
}

fn lenient_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(Value::as_str)
        .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()))
}

fn lenient_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc)))
}
