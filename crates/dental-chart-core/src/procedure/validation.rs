//! Procedure form validation and the doctor roster.

use chrono::NaiveDate;
use serde_json::Value;
use strsim::jaro_winkler;
use thiserror::Error;

use crate::models::ProcedureForm;
use crate::store::Document;

/// Minimum similarity for a roster name to be offered as a suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.8;

/// Body fields that may carry a doctor's display name.
const DOCTOR_NAME_FIELDS: [&str; 3] = ["name", "fullName", "doctorName"];

/// Form validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("Please select a valid doctor name from the list (got \"{name}\"){}", suggestion_hint(.suggestion))]
    UnknownDoctor {
        name: String,
        suggestion: Option<String>,
    },

    #[error("Procedure date {0} is in the future")]
    FutureDate(NaiveDate),

    #[error("Invalid amount for {field}: {value}")]
    InvalidAmount { field: &'static str, value: f64 },
}

fn suggestion_hint(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(name) => format!("; did you mean \"{}\"?", name),
        None => String::new(),
    }
}

/// Known doctors a procedure may be attributed to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DoctorRoster {
    names: Vec<String>,
}

impl DoctorRoster {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut roster = Self::default();
        roster.extend(names);
        roster
    }

    /// Add names, skipping blanks and case-insensitive duplicates.
    pub fn extend<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let name = name.into().trim().to_string();
            if !name.is_empty() && !self.contains(&name) {
                self.names.push(name);
            }
        }
    }

    /// Add the names found in `doctors` collection documents.
    pub fn extend_from_documents(&mut self, documents: &[Document]) {
        let names = documents.iter().filter_map(|doc| {
            DOCTOR_NAME_FIELDS
                .iter()
                .find_map(|field| doc.body.get(*field).and_then(Value::as_str))
                .map(str::to_string)
        });
        self.extend(names);
    }

    /// Trimmed, case-insensitive membership.
    pub fn contains(&self, name: &str) -> bool {
        let wanted = name.trim().to_lowercase();
        self.names.iter().any(|n| n.to_lowercase() == wanted)
    }

    /// Closest roster name, if any is similar enough.
    pub fn suggest(&self, name: &str) -> Option<String> {
        let wanted = name.trim().to_lowercase();
        if wanted.is_empty() {
            return None;
        }

        self.names
            .iter()
            .map(|n| (n, jaro_winkler(&wanted, &n.to_lowercase())))
            .filter(|(_, score)| *score >= SUGGESTION_THRESHOLD)
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(n, _)| n.clone())
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Validate a procedure form against the roster, as of `today`.
///
/// The doctor is checked first, matching the order the form reports errors.
pub fn validate_form(
    form: &ProcedureForm,
    roster: &DoctorRoster,
    today: NaiveDate,
) -> Result<(), ValidationError> {
    let doctor = form.doctor.trim();
    if doctor.is_empty() || !roster.contains(doctor) {
        return Err(ValidationError::UnknownDoctor {
            name: doctor.to_string(),
            suggestion: roster.suggest(doctor),
        });
    }

    if form.procedure.trim().is_empty() {
        return Err(ValidationError::MissingField("procedure"));
    }

    match form.date {
        None => return Err(ValidationError::MissingField("date")),
        Some(date) if date > today => return Err(ValidationError::FutureDate(date)),
        Some(_) => {}
    }

    let amounts = [
        ("totalBill", form.billing.total_bill),
        ("amount", form.billing.amount),
        ("balance", form.billing.balance),
    ];
    for (field, value) in amounts {
        if let Some(value) = value {
            if !value.is_finite() || value < 0.0 {
                return Err(ValidationError::InvalidAmount { field, value });
            }
        }
    }

    Ok(())
}
