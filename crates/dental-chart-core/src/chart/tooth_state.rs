//! Per-tooth chart state.

use crate::models::{SectionSet, SurfaceSection, ToothId, ToothTextField, TreatedTooth};

/// Text length the chart inputs allow. Not enforced here.
pub const MAX_TOOTH_TEXT_CHARS: usize = 4;

/// Mutable record for one tooth on the chart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToothState {
    /// Treatment performed (trimmed)
    pub treatment_done: String,
    /// Condition found before treatment (trimmed)
    pub existing_condition: String,
    /// Active surface sections
    pub active_sections: SectionSet,
}

impl ToothState {
    /// A tooth is present in a snapshot iff any field is non-empty.
    pub fn is_present(&self) -> bool {
        !self.treatment_done.is_empty()
            || !self.existing_condition.is_empty()
            || !self.active_sections.is_empty()
    }

    pub fn text(&self, field: ToothTextField) -> &str {
        match field {
            ToothTextField::TreatmentDone => &self.treatment_done,
            ToothTextField::ExistingCondition => &self.existing_condition,
        }
    }

    pub(crate) fn set_text(&mut self, field: ToothTextField, value: &str) {
        let slot = match field {
            ToothTextField::TreatmentDone => &mut self.treatment_done,
            ToothTextField::ExistingCondition => &mut self.existing_condition,
        };
        *slot = value.trim().to_string();
    }

    pub fn has_section(&self, section: SurfaceSection) -> bool {
        self.active_sections.contains(section)
    }

    /// Whether any text field exceeds what the chart inputs accept.
    pub fn exceeds_text_limit(&self) -> bool {
        self.treatment_done.chars().count() > MAX_TOOTH_TEXT_CHARS
            || self.existing_condition.chars().count() > MAX_TOOTH_TEXT_CHARS
    }

    /// Flatten into the persisted entry shape.
    pub fn to_treated(&self, tooth: ToothId) -> TreatedTooth {
        TreatedTooth {
            tooth_number: u32::from(tooth.number()),
            treatment_done: self.treatment_done.clone(),
            existing_condition: self.existing_condition.clone(),
            active_sections: self.active_sections.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_state_not_present() {
        assert!(!ToothState::default().is_present());
    }

    #[test]
    fn test_any_field_makes_present() {
        let mut state = ToothState::default();
        state.set_text(ToothTextField::ExistingCondition, "C");
        assert!(state.is_present());

        let mut state = ToothState::default();
        state.active_sections.insert(SurfaceSection::Left);
        assert!(state.is_present());
    }

    #[test]
    fn test_set_text_trims() {
        let mut state = ToothState::default();
        state.set_text(ToothTextField::TreatmentDone, "  RCT \n");
        assert_eq!(state.text(ToothTextField::TreatmentDone), "RCT");

        state.set_text(ToothTextField::TreatmentDone, "   ");
        assert!(!state.is_present());
    }

    #[test]
    fn test_text_limit() {
        let mut state = ToothState::default();
        state.set_text(ToothTextField::TreatmentDone, "RCT");
        assert!(!state.exceeds_text_limit());
        state.set_text(ToothTextField::ExistingCondition, "CARIES");
        assert!(state.exceeds_text_limit());
    }

    #[test]
    fn test_to_treated_canonical_sections() {
        let mut state = ToothState::default();
        state.active_sections.insert(SurfaceSection::Top);
        state.active_sections.insert(SurfaceSection::Center);
        let tooth = ToothId::new(11).unwrap();

        let treated = state.to_treated(tooth);
        assert_eq!(treated.tooth_number, 11);
        assert_eq!(
            treated.active_sections,
            vec![SurfaceSection::Center, SurfaceSection::Top]
        );
    }
}
