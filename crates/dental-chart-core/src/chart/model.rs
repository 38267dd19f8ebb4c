//! Sparse chart model over the tooth catalog.

use std::collections::HashMap;

use crate::models::{all_tooth_ids, SurfaceSection, ToothId, ToothTextField, TreatedTooth};

use super::tooth_state::{ToothState, MAX_TOOTH_TEXT_CHARS};

/// Chart state for one procedure form.
///
/// Only touched teeth have an entry, and entries that stop being present
/// are pruned, so a cleared chart compares equal to a new one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChartModel {
    teeth: HashMap<ToothId, ToothState>,
}

impl ChartModel {
    /// Create an empty chart.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a chart from a persisted snapshot.
    pub fn from_treated(snapshot: &[TreatedTooth]) -> Self {
        let mut chart = Self::new();
        chart.load_from(snapshot);
        chart
    }

    /// Flip a surface section. Returns whether the section is now active.
    pub fn toggle_section(&mut self, tooth: ToothId, section: SurfaceSection) -> bool {
        let mut active = false;
        self.update(tooth, |state| active = state.active_sections.toggle(section));
        active
    }

    /// Set a text field to the trimmed value. An empty result clears the field.
    pub fn set_text(&mut self, tooth: ToothId, field: ToothTextField, value: &str) {
        self.update(tooth, |state| state.set_text(field, value));
    }

    /// Present teeth in canonical catalog order.
    pub fn collect(&self) -> Vec<TreatedTooth> {
        all_tooth_ids()
            .iter()
            .filter_map(|tooth| {
                self.teeth
                    .get(tooth)
                    .filter(|state| state.is_present())
                    .map(|state| state.to_treated(*tooth))
            })
            .collect()
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.teeth.clear();
    }

    /// Replace the chart contents with a persisted snapshot.
    ///
    /// Entries are applied in input order. Sections accumulate as a union;
    /// non-empty text overwrites. Entries whose tooth number is not in the
    /// catalog are skipped. Returns the number of skipped entries.
    pub fn load_from(&mut self, snapshot: &[TreatedTooth]) -> usize {
        self.clear();

        let mut ignored = 0;
        for entry in snapshot {
            let Some(tooth) = entry.tooth_id() else {
                tracing::debug!(tooth_number = entry.tooth_number, "Ignoring unknown tooth in snapshot");
                ignored += 1;
                continue;
            };

            self.update(tooth, |state| {
                for section in &entry.active_sections {
                    state.active_sections.insert(*section);
                }
                if !entry.treatment_done.trim().is_empty() {
                    state.set_text(ToothTextField::TreatmentDone, &entry.treatment_done);
                }
                if !entry.existing_condition.trim().is_empty() {
                    state.set_text(ToothTextField::ExistingCondition, &entry.existing_condition);
                }
            });
        }
        ignored
    }

    /// Whether the tooth currently carries any data.
    pub fn is_modified(&self, tooth: ToothId) -> bool {
        self.teeth.get(&tooth).is_some_and(ToothState::is_present)
    }

    /// Current state of a tooth, if touched.
    pub fn state(&self, tooth: ToothId) -> Option<&ToothState> {
        self.teeth.get(&tooth)
    }

    /// Number of teeth carrying data.
    pub fn modified_count(&self) -> usize {
        self.teeth.values().filter(|s| s.is_present()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.modified_count() == 0
    }

    /// On-screen summary, one line per present tooth.
    pub fn summary_lines(&self) -> Vec<String> {
        self.collect().iter().map(TreatedTooth::summary_label).collect()
    }

    fn update(&mut self, tooth: ToothId, apply: impl FnOnce(&mut ToothState)) {
        let state = self.teeth.entry(tooth).or_default();
        apply(state);

        if state.exceeds_text_limit() {
            tracing::warn!(
                tooth = %tooth,
                limit = MAX_TOOTH_TEXT_CHARS,
                "Tooth text exceeds chart input limit"
            );
        }
        if !state.is_present() {
            self.teeth.remove(&tooth);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tooth(n: u32) -> ToothId {
        ToothId::new(n).unwrap()
    }

    #[test]
    fn test_collect_worked_example() {
        let mut chart = ChartModel::new();
        chart.toggle_section(tooth(11), SurfaceSection::Center);
        chart.toggle_section(tooth(11), SurfaceSection::Top);
        chart.set_text(tooth(11), ToothTextField::TreatmentDone, "RCT");

        let collected = chart.collect();
        assert_eq!(
            collected,
            vec![TreatedTooth {
                tooth_number: 11,
                treatment_done: "RCT".into(),
                existing_condition: String::new(),
                active_sections: vec![SurfaceSection::Center, SurfaceSection::Top],
            }]
        );
    }

    #[test]
    fn test_condition_only_is_collected() {
        let mut chart = ChartModel::new();
        chart.set_text(tooth(48), ToothTextField::ExistingCondition, "M");

        let collected = chart.collect();
        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].tooth_number, 48);
        assert!(collected[0].active_sections.is_empty());
    }

    #[test]
    fn test_is_modified() {
        let mut chart = ChartModel::new();
        assert!(!chart.is_modified(tooth(21)));

        chart.set_text(tooth(21), ToothTextField::TreatmentDone, "   ");
        assert!(!chart.is_modified(tooth(21)));
        assert!(chart.state(tooth(21)).is_none());

        chart.toggle_section(tooth(21), SurfaceSection::Left);
        assert!(chart.is_modified(tooth(21)));

        chart.toggle_section(tooth(21), SurfaceSection::Left);
        assert!(!chart.is_modified(tooth(21)));
    }

    #[test]
    fn test_toggle_twice_restores_chart() {
        let mut chart = ChartModel::new();
        chart.set_text(tooth(36), ToothTextField::TreatmentDone, "F");
        let before = chart.clone();

        assert!(chart.toggle_section(tooth(36), SurfaceSection::Bottom));
        assert!(!chart.toggle_section(tooth(36), SurfaceSection::Bottom));
        assert_eq!(chart, before);
    }

    #[test]
    fn test_collect_canonical_order() {
        let mut chart = ChartModel::new();
        chart.toggle_section(tooth(75), SurfaceSection::Center);
        chart.toggle_section(tooth(11), SurfaceSection::Center);
        chart.toggle_section(tooth(55), SurfaceSection::Center);
        chart.toggle_section(tooth(48), SurfaceSection::Center);

        let numbers: Vec<u32> = chart.collect().iter().map(|t| t.tooth_number).collect();
        assert_eq!(numbers, vec![55, 11, 48, 75]);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut chart = ChartModel::new();
        chart.toggle_section(tooth(11), SurfaceSection::Right);
        chart.set_text(tooth(12), ToothTextField::ExistingCondition, "X");

        chart.clear();
        assert!(chart.collect().is_empty());
        assert_eq!(chart, ChartModel::new());
        chart.clear();
        assert_eq!(chart, ChartModel::new());
    }

    #[test]
    fn test_load_from_ignores_unknown_teeth() {
        let mut chart = ChartModel::new();
        chart.toggle_section(tooth(18), SurfaceSection::Top);

        let snapshot = vec![
            TreatedTooth {
                tooth_number: 99,
                treatment_done: "X".into(),
                existing_condition: String::new(),
                active_sections: vec![SurfaceSection::Center],
            },
            TreatedTooth {
                tooth_number: 26,
                treatment_done: " EXT ".into(),
                existing_condition: String::new(),
                active_sections: vec![],
            },
        ];
        let ignored = chart.load_from(&snapshot);

        assert_eq!(ignored, 1);
        assert!(!chart.is_modified(tooth(18)));
        assert_eq!(chart.collect().len(), 1);
        assert_eq!(chart.collect()[0].treatment_done, "EXT");
    }

    #[test]
    fn test_load_from_merges_duplicate_entries() {
        let snapshot = vec![
            TreatedTooth {
                tooth_number: 31,
                treatment_done: "F".into(),
                existing_condition: String::new(),
                active_sections: vec![SurfaceSection::Top],
            },
            TreatedTooth {
                tooth_number: 31,
                treatment_done: String::new(),
                existing_condition: "C".into(),
                active_sections: vec![SurfaceSection::Center, SurfaceSection::Top],
            },
        ];
        let chart = ChartModel::from_treated(&snapshot);

        let collected = chart.collect();
        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].treatment_done, "F");
        assert_eq!(collected[0].existing_condition, "C");
        assert_eq!(
            collected[0].active_sections,
            vec![SurfaceSection::Center, SurfaceSection::Top]
        );
    }

    #[test]
    fn test_summary_lines() {
        let mut chart = ChartModel::new();
        chart.set_text(tooth(11), ToothTextField::TreatmentDone, "RCT");
        chart.toggle_section(tooth(11), SurfaceSection::Center);
        assert_eq!(
            chart.summary_lines(),
            vec!["Tooth 11 | Treatment: RCT | Sections: center".to_string()]
        );
        assert_eq!(chart.modified_count(), 1);
        assert!(!chart.is_empty());
    }
}
