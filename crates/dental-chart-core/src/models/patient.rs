//! Patient models.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Patient details as stored in the `patientDetails` collection.
///
/// Only the fields embedded in billing documents are modelled; anything else
/// in the stored document is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PatientDetails {
    /// Full name, when entered as a single field
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// Short display name used by some older records
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Contact number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Date of birth, as entered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birthday: Option<String>,
}

impl PatientDetails {
    /// Read from a stored document. Numbers are stringified; other
    /// non-string values are treated as absent.
    pub fn from_document(document: &Value) -> Self {
        let field = |key: &str| match document.get(key) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };

        Self {
            full_name: field("fullName"),
            name: field("name"),
            first_name: field("firstName"),
            middle_name: field("middleName"),
            last_name: field("lastName"),
            contact_no: field("contactNo"),
            email: field("email"),
            address: field("address"),
            birthday: field("birthday"),
        }
    }

    /// Name shown in the billing document's patient block.
    pub fn display_name(&self) -> String {
        if let Some(full) = non_empty(&self.full_name) {
            return full.to_string();
        }
        let joined = [&self.first_name, &self.middle_name, &self.last_name]
            .into_iter()
            .filter_map(non_empty)
            .collect::<Vec<_>>()
            .join(" ");
        if joined.is_empty() {
            "N/A".to_string()
        } else {
            joined
        }
    }

    /// Filesystem-safe label used in billing document file names.
    pub fn file_label(&self) -> String {
        let raw = non_empty(&self.full_name)
            .or_else(|| non_empty(&self.name))
            .or_else(|| non_empty(&self.first_name))
            .unwrap_or("Unknown_Patient");
        sanitize_file_component(raw)
    }
}

/// Replace every character outside ASCII letters and digits with `_`.
pub fn sanitize_file_component(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
