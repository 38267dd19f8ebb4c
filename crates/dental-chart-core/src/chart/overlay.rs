//! Render-time highlight overlay for chart export.
//!
//! The overlay is a plain description handed to the renderer or snapshotter
//! alongside the chart. Nothing is mutated, so there is nothing to restore
//! after capture.

use serde::Serialize;

use crate::models::{SurfaceSection, ToothId, TreatedTooth};

use super::model::ChartModel;

/// Style applied to a highlighted tooth container.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ToothStyle {
    pub border: &'static str,
    pub background: &'static str,
}

/// Style applied to an active section of a highlighted tooth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SectionStyle {
    pub fill: &'static str,
    pub stroke: &'static str,
    pub stroke_width: f32,
}

pub const EXPORT_TOOTH_STYLE: ToothStyle = ToothStyle {
    border: "2px solid #ffd700",
    background: "#fff9e6",
};

pub const EXPORT_SECTION_STYLE: SectionStyle = SectionStyle {
    fill: "#ff0000",
    stroke: "darkred",
    stroke_width: 2.0,
};

/// One highlighted tooth.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToothHighlight {
    pub tooth: ToothId,
    /// Element id of the tooth container in the rendered chart
    pub element_id: String,
    /// Sections to paint with the section style
    pub sections: Vec<SurfaceSection>,
}

/// Highlight description for a chart export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighlightOverlay {
    pub teeth: Vec<ToothHighlight>,
    pub tooth_style: ToothStyle,
    pub section_style: SectionStyle,
}

impl HighlightOverlay {
    /// Overlay for a persisted snapshot. Entries are merged per tooth the
    /// way [`ChartModel::load_from`] merges them; unknown tooth numbers are
    /// skipped.
    pub fn from_treated(treated: &[TreatedTooth]) -> Self {
        Self::from_chart(&ChartModel::from_treated(treated))
    }

    /// Overlay for the chart's current `collect()` output.
    pub fn from_chart(chart: &ChartModel) -> Self {
        let teeth = chart
            .collect()
            .into_iter()
            .filter_map(|entry| {
                let tooth = entry.tooth_id()?;
                Some(ToothHighlight {
                    tooth,
                    element_id: tooth.element_id(),
                    sections: entry.active_sections,
                })
            })
            .collect();

        Self {
            teeth,
            tooth_style: EXPORT_TOOTH_STYLE,
            section_style: EXPORT_SECTION_STYLE,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.teeth.is_empty()
    }

    pub fn highlight_for(&self, tooth: ToothId) -> Option<&ToothHighlight> {
        self.teeth.iter().find(|h| h.tooth == tooth)
    }
}
