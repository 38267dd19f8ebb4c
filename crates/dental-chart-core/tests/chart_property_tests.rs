//! Chart model properties and worked examples.

use dental_chart_core::chart::ChartModel;
use dental_chart_core::models::{all_tooth_ids, SurfaceSection, ToothId, ToothTextField, TreatedTooth};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Edit {
    Toggle(ToothId, SurfaceSection),
    Text(ToothId, ToothTextField, String),
}

fn tooth() -> impl Strategy<Value = ToothId> {
    prop::sample::select(all_tooth_ids().to_vec())
}

fn section() -> impl Strategy<Value = SurfaceSection> {
    prop::sample::select(SurfaceSection::CANONICAL.to_vec())
}

fn field() -> impl Strategy<Value = ToothTextField> {
    prop_oneof![
        Just(ToothTextField::TreatmentDone),
        Just(ToothTextField::ExistingCondition),
    ]
}

fn edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (tooth(), section()).prop_map(|(t, s)| Edit::Toggle(t, s)),
        (tooth(), field(), "[ A-Z]{0,6}").prop_map(|(t, f, v)| Edit::Text(t, f, v)),
    ]
}

fn build(edits: &[Edit]) -> ChartModel {
    let mut chart = ChartModel::new();
    for edit in edits {
        match edit {
            Edit::Toggle(tooth, section) => {
                chart.toggle_section(*tooth, *section);
            }
            Edit::Text(tooth, field, value) => chart.set_text(*tooth, *field, value),
        }
    }
    chart
}

proptest! {
    #[test]
    fn collect_yields_only_present_teeth_in_catalog_order(edits in prop::collection::vec(edit(), 0..40)) {
        let chart = build(&edits);
        let collected = chart.collect();

        for entry in &collected {
            prop_assert!(
                !entry.treatment_done.is_empty()
                    || !entry.existing_condition.is_empty()
                    || !entry.active_sections.is_empty()
            );
            prop_assert_eq!(entry.treatment_done.trim(), entry.treatment_done.as_str());
        }

        let indices: Vec<usize> = collected
            .iter()
            .map(|e| e.tooth_id().unwrap().catalog_index())
            .collect();
        prop_assert!(indices.windows(2).all(|w| w[0] < w[1]));
        prop_assert_eq!(collected.len(), chart.modified_count());
    }

    #[test]
    fn sections_are_in_canonical_order(edits in prop::collection::vec(edit(), 0..40)) {
        for entry in build(&edits).collect() {
            let positions: Vec<usize> = entry
                .active_sections
                .iter()
                .map(|s| SurfaceSection::CANONICAL.iter().position(|c| c == s).unwrap())
                .collect();
            prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn toggle_twice_is_identity(
        edits in prop::collection::vec(edit(), 0..30),
        tooth in tooth(),
        section in section(),
    ) {
        let chart = build(&edits);
        let mut toggled = chart.clone();
        toggled.toggle_section(tooth, section);
        toggled.toggle_section(tooth, section);

        prop_assert_eq!(toggled.collect(), chart.collect());
        prop_assert_eq!(toggled, chart);
    }

    #[test]
    fn clear_empties_the_chart(edits in prop::collection::vec(edit(), 0..30)) {
        let mut chart = build(&edits);
        chart.clear();

        prop_assert!(chart.collect().is_empty());
        prop_assert_eq!(chart, ChartModel::new());
    }

    #[test]
    fn reload_is_a_fixed_point(edits in prop::collection::vec(edit(), 0..40)) {
        let collected = build(&edits).collect();

        let mut reloaded = ChartModel::new();
        reloaded.toggle_section(ToothId::new(11).unwrap(), SurfaceSection::Left);
        let skipped = reloaded.load_from(&collected);

        prop_assert_eq!(skipped, 0);
        prop_assert_eq!(reloaded.collect(), collected);
    }

    #[test]
    fn reload_merges_split_and_shuffled_entries(
        (collected, shuffled) in prop::collection::vec(edit(), 0..40).prop_flat_map(|edits| {
            let collected = build(&edits).collect();
            let split: Vec<TreatedTooth> = collected
                .iter()
                .flat_map(|entry| {
                    let text_only = TreatedTooth {
                        active_sections: Vec::new(),
                        ..entry.clone()
                    };
                    let sections_only = TreatedTooth {
                        treatment_done: String::new(),
                        existing_condition: String::new(),
                        ..entry.clone()
                    };
                    [text_only, sections_only, entry.clone()]
                })
                .collect();
            (Just(collected), Just(split).prop_shuffle())
        })
    ) {
        prop_assert_eq!(ChartModel::from_treated(&shuffled).collect(), collected.clone());

        let mut reloaded = ChartModel::new();
        let skipped = reloaded.load_from(&shuffled);
        prop_assert_eq!(skipped, 0);
        prop_assert_eq!(reloaded.collect(), collected);
    }
}

#[test]
fn worked_example_sections_and_treatment() {
    let tooth = ToothId::new(11).unwrap();
    let mut chart = ChartModel::new();
    chart.toggle_section(tooth, SurfaceSection::Top);
    chart.toggle_section(tooth, SurfaceSection::Center);
    chart.set_text(tooth, ToothTextField::TreatmentDone, "RCT");

    assert_eq!(
        chart.collect(),
        vec![TreatedTooth {
            tooth_number: 11,
            treatment_done: "RCT".into(),
            existing_condition: String::new(),
            active_sections: vec![SurfaceSection::Center, SurfaceSection::Top],
        }]
    );

    let json = serde_json::to_value(chart.collect()).unwrap();
    assert_eq!(
        json,
        serde_json::json!([{
            "toothNumber": 11,
            "treatmentDone": "RCT",
            "existingCondition": "",
            "activeSections": ["center", "top"]
        }])
    );
}

#[test]
fn worked_example_condition_only() {
    let tooth = ToothId::new(48).unwrap();
    let mut chart = ChartModel::new();
    chart.set_text(tooth, ToothTextField::ExistingCondition, "Caries");

    let collected = chart.collect();
    assert_eq!(collected.len(), 1);
    assert_eq!(collected[0].tooth_number, 48);
    assert!(collected[0].active_sections.is_empty());
}

#[test]
fn worked_example_whitespace_text_is_not_a_modification() {
    let tooth = ToothId::new(36).unwrap();
    let mut chart = ChartModel::new();
    assert!(!chart.is_modified(tooth));

    chart.set_text(tooth, ToothTextField::TreatmentDone, "   ");
    assert!(!chart.is_modified(tooth));
    assert!(chart.collect().is_empty());
}

#[test]
fn unknown_tooth_in_snapshot_is_ignored() {
    let snapshot = vec![
        TreatedTooth {
            tooth_number: 99,
            treatment_done: "EXT".into(),
            existing_condition: String::new(),
            active_sections: vec![SurfaceSection::Center],
        },
        TreatedTooth {
            tooth_number: 21,
            treatment_done: String::new(),
            existing_condition: "C".into(),
            active_sections: vec![],
        },
    ];

    let mut chart = ChartModel::new();
    assert_eq!(chart.load_from(&snapshot), 1);
    let collected = chart.collect();
    assert_eq!(collected.len(), 1);
    assert_eq!(collected[0].tooth_number, 21);
}

#[test]
fn duplicate_snapshot_entries_merge() {
    let snapshot = vec![
        TreatedTooth {
            tooth_number: 16,
            treatment_done: "F".into(),
            existing_condition: String::new(),
            active_sections: vec![SurfaceSection::Left],
        },
        TreatedTooth {
            tooth_number: 16,
            treatment_done: String::new(),
            existing_condition: "C".into(),
            active_sections: vec![SurfaceSection::Center],
        },
    ];

    let chart = ChartModel::from_treated(&snapshot);
    let collected = chart.collect();
    assert_eq!(collected.len(), 1);
    assert_eq!(collected[0].treatment_done, "F");
    assert_eq!(collected[0].existing_condition, "C");
    assert_eq!(
        collected[0].active_sections,
        vec![SurfaceSection::Center, SurfaceSection::Left]
    );
}
