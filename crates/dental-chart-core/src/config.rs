//! Clinic configuration.
//!
//! Resolution order (highest priority first):
//! 1. Environment variables (`DENTAL_CHART_*`)
//! 2. TOML file passed to [`ClinicConfig::load`]
//! 3. Compiled defaults

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Invalid value for {field}: {message}")]
    Validation { field: String, message: String },
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ClinicConfig {
    pub clinic: ClinicSection,
    pub doctors: DoctorsSection,
    pub store: StoreSection,
    pub billing: BillingSection,
}

/// Clinic identity printed on billing documents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClinicSection {
    pub name: String,
    pub taglines: Vec<String>,
    /// Footer line; defaults to "Thank you for choosing {name}"
    pub thank_you: Option<String>,
}

impl Default for ClinicSection {
    fn default() -> Self {
        Self {
            name: "Dental Clinic".to_string(),
            taglines: vec![
                "Professional Dental Care Services".to_string(),
                "Complete Oral Health Solutions".to_string(),
            ],
            thank_you: None,
        }
    }
}

impl ClinicSection {
    pub fn thank_you_line(&self) -> String {
        self.thank_you
            .clone()
            .unwrap_or_else(|| format!("Thank you for choosing {}", self.name))
    }
}

/// Seed roster of known doctors.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct DoctorsSection {
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreSection {
    /// SQLite file; in-memory when unset
    pub db_path: Option<PathBuf>,
    /// Upper bound on waiting for store readiness
    pub init_timeout_ms: u64,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            db_path: None,
            init_timeout_ms: 3000,
        }
    }
}

impl StoreSection {
    pub fn init_timeout(&self) -> Duration {
        Duration::from_millis(self.init_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BillingSection {
    /// Directory billing PDFs are written to; not written when unset
    pub output_dir: Option<PathBuf>,
    pub chart_image_width_mm: f32,
}

impl Default for BillingSection {
    fn default() -> Self {
        Self {
            output_dir: None,
            chart_image_width_mm: 170.0,
        }
    }
}

impl ClinicConfig {
    /// Load from a TOML file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse from a TOML string. No environment overrides.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| ConfigError::Parse {
            path: "<string>".to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `DENTAL_CHART_*` overrides using the given lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(name) = lookup("DENTAL_CHART_CLINIC_NAME") {
            self.clinic.name = name;
        }
        if let Some(path) = lookup("DENTAL_CHART_DB_PATH") {
            self.store.db_path = Some(PathBuf::from(path));
        }
        if let Some(dir) = lookup("DENTAL_CHART_BILLING_DIR") {
            self.billing.output_dir = Some(PathBuf::from(dir));
        }
        if let Some(ms) = lookup("DENTAL_CHART_INIT_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.store.init_timeout_ms = ms;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.clinic.name.trim().is_empty() {
            return Err(ConfigError::Validation {
                field: "clinic.name".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        let width = self.billing.chart_image_width_mm;
        if !(width > 0.0 && width <= 180.0) {
            return Err(ConfigError::Validation {
                field: "billing.chart_image_width_mm".to_string(),
                message: "must be within the A4 printable width (0, 180]".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClinicConfig::from_toml("").unwrap();
        assert_eq!(config, ClinicConfig::default());
        assert_eq!(config.store.init_timeout(), Duration::from_secs(3));
        assert_eq!(config.billing.chart_image_width_mm, 170.0);
        assert_eq!(
            config.clinic.thank_you_line(),
            "Thank you for choosing Dental Clinic"
        );
    }

    #[test]
    fn test_partial_sections() {
        let config = ClinicConfig::from_toml(
            r#"
            [clinic]
            name = "Bright Smile Dental"

            [doctors]
            names = ["Dr. Cruz", "Dr. Santos"]

            [store]
            init_timeout_ms = 500
            "#,
        )
        .unwrap();

        assert_eq!(config.clinic.name, "Bright Smile Dental");
        assert_eq!(config.clinic.taglines.len(), 2);
        assert_eq!(config.doctors.names, vec!["Dr. Cruz", "Dr. Santos"]);
        assert_eq!(config.store.init_timeout_ms, 500);
        assert!(config.store.db_path.is_none());
        assert!(config.billing.output_dir.is_none());
    }

    #[test]
    fn test_invalid_toml() {
        let result = ClinicConfig::from_toml("[clinic\nname = 1");
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_validation() {
        let result = ClinicConfig::from_toml("[billing]\nchart_image_width_mm = 400.0");
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_overrides() {
        let mut config = ClinicConfig::default();
        config.apply_overrides(|key| match key {
            "DENTAL_CHART_DB_PATH" => Some("/tmp/clinic.db".to_string()),
            "DENTAL_CHART_INIT_TIMEOUT_MS" => Some("not a number".to_string()),
            _ => None,
        });
        assert_eq!(config.store.db_path, Some(PathBuf::from("/tmp/clinic.db")));
        assert_eq!(config.store.init_timeout_ms, 3000);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clinic.toml");
        std::fs::write(&path, "[clinic]\nname = \"Molar Care\"\n").unwrap();

        let config = ClinicConfig::load(&path).unwrap();
        assert_eq!(config.clinic.name, "Molar Care");

        let missing = ClinicConfig::load(&dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
