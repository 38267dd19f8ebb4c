//! SVG rendering of the teeth chart.
//!
//! Element ids follow the chart contract: each tooth container is
//! `tooth-{n}` and each section element is named after its section.

use std::fmt::Write;

use crate::models::{SurfaceSection, ToothGroup, ToothId};

use super::model::ChartModel;
use super::overlay::HighlightOverlay;

const CELL_WIDTH: u32 = 56;
const CELL_HEIGHT: u32 = 96;
const ROW_GAP: u32 = 12;
const MARGIN: u32 = 8;

/// Path data for a section inside the 50x50 diagram (before rotation).
fn section_shape(section: SurfaceSection) -> String {
    match section {
        SurfaceSection::Center => r#"<circle cx="25" cy="25" r="10""#.to_string(),
        SurfaceSection::Right => {
            r#"<path d="M25,5 A20,20 0 0,1 45,25 L35,25 A10,10 0 0,0 25,15 Z""#.to_string()
        }
        SurfaceSection::Bottom => {
            r#"<path d="M45,25 A20,20 0 0,1 25,45 L25,35 A10,10 0 0,0 35,25 Z""#.to_string()
        }
        SurfaceSection::Left => {
            r#"<path d="M25,45 A20,20 0 0,1 5,25 L15,25 A10,10 0 0,0 25,35 Z""#.to_string()
        }
        SurfaceSection::Top => {
            r#"<path d="M5,25 A20,20 0 0,1 25,5 L25,15 A10,10 0 0,0 15,25 Z""#.to_string()
        }
    }
}

/// Render the whole chart, optionally with an export overlay applied.
pub fn render_chart_svg(chart: &ChartModel, overlay: Option<&HighlightOverlay>) -> String {
    let widest = ToothGroup::ALL
        .iter()
        .map(|g| g.teeth().len() as u32)
        .max()
        .unwrap_or(0);
    let width = widest * CELL_WIDTH + 2 * MARGIN;
    let height = ToothGroup::ALL.len() as u32 * (CELL_HEIGHT + ROW_GAP) + 2 * MARGIN;

    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" class="chart-wrapper" viewBox="0 0 {width} {height}" width="{width}" height="{height}">"#
    );

    for (row, group) in ToothGroup::ALL.iter().enumerate() {
        let teeth = group.teeth();
        // Center shorter rows under the permanent rows.
        let offset_x = MARGIN + (widest - teeth.len() as u32) * CELL_WIDTH / 2;
        let y = MARGIN + row as u32 * (CELL_HEIGHT + ROW_GAP);
        for (col, tooth) in teeth.iter().enumerate() {
            let x = offset_x + col as u32 * CELL_WIDTH;
            render_tooth(&mut svg, chart, overlay, *tooth, x, y);
        }
    }

    svg.push_str("</svg>");
    svg
}

fn render_tooth(
    svg: &mut String,
    chart: &ChartModel,
    overlay: Option<&HighlightOverlay>,
    tooth: ToothId,
    x: u32,
    y: u32,
) {
    let state = chart.state(tooth);
    let highlight = overlay.and_then(|o| o.highlight_for(tooth).map(|h| (o, h)));
    let modified = chart.is_modified(tooth);

    let _ = write!(
        svg,
        r#"<g id="{}" class="tooth{}" transform="translate({x},{y})">"#,
        tooth.element_id(),
        if modified { " modified" } else { "" }
    );

    if let Some((overlay, _)) = highlight {
        let _ = write!(
            svg,
            r##"<rect class="pdf-highlight" x="1" y="1" width="{}" height="{}" fill="{}" stroke="#ffd700" stroke-width="2"/>"##,
            CELL_WIDTH - 2,
            CELL_HEIGHT - 2,
            overlay.tooth_style.background,
        );
    }

    let _ = write!(
        svg,
        r#"<text class="tooth-number" x="{}" y="12" text-anchor="middle" font-size="10">{}</text>"#,
        CELL_WIDTH / 2,
        tooth
    );

    let treatment = state.map(|s| s.treatment_done.as_str()).unwrap_or("");
    let condition = state.map(|s| s.existing_condition.as_str()).unwrap_or("");
    let _ = write!(
        svg,
        r#"<text id="treatmentBox" x="{}" y="26" text-anchor="middle" font-size="9">{}</text>"#,
        CELL_WIDTH / 2,
        escape_xml(treatment)
    );
    let _ = write!(
        svg,
        r#"<text id="existingConditionBox" x="{}" y="38" text-anchor="middle" font-size="9">{}</text>"#,
        CELL_WIDTH / 2,
        escape_xml(condition)
    );

    let _ = write!(
        svg,
        r#"<g transform="translate({},44) rotate(45,25,25)">"#,
        (CELL_WIDTH - 50) / 2
    );
    for section in SurfaceSection::CANONICAL {
        let active = state.is_some_and(|s| s.has_section(section));
        let _ = write!(
            svg,
            r#" {} id="{}" class="section{}""#,
            section_shape(section),
            section.as_str(),
            if active { " active" } else { "" }
        );
        match highlight {
            Some((overlay, h)) if h.sections.contains(&section) => {
                let style = overlay.section_style;
                let _ = write!(
                    svg,
                    r#" fill="{}" stroke="{}" stroke-width="{}""#,
                    style.fill, style.stroke, style.stroke_width
                );
            }
            _ if active => svg.push_str(r##" fill="#4a90d9" stroke="#333""##),
            _ => svg.push_str(r##" fill="#ffffff" stroke="#333""##),
        }
        svg.push_str("/>");
    }
    svg.push_str("</g></g>");
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{all_tooth_ids, ToothTextField};

    #[test]
    fn test_every_tooth_rendered() {
        let svg = render_chart_svg(&ChartModel::new(), None);
        for tooth in all_tooth_ids() {
            assert!(svg.contains(&format!(r#"id="tooth-{}""#, tooth)));
        }
        assert!(!svg.contains("section active"));
    }

    #[test]
    fn test_active_sections_marked() {
        let mut chart = ChartModel::new();
        chart.toggle_section(ToothId::new(11).unwrap(), SurfaceSection::Top);

        let svg = render_chart_svg(&chart, None);
        assert_eq!(svg.matches("section active").count(), 1);
        assert!(svg.contains(r#"class="tooth modified""#));
    }

    #[test]
    fn test_overlay_paints_sections() {
        let mut chart = ChartModel::new();
        chart.toggle_section(ToothId::new(11).unwrap(), SurfaceSection::Center);
        let overlay = HighlightOverlay::from_chart(&chart);

        let svg = render_chart_svg(&chart, Some(&overlay));
        assert!(svg.contains(r##"fill="#ff0000" stroke="darkred""##));
        assert_eq!(svg.matches("pdf-highlight").count(), 1);

        let plain = render_chart_svg(&chart, None);
        assert!(!plain.contains("pdf-highlight"));
    }

    #[test]
    fn test_text_is_escaped() {
        let mut chart = ChartModel::new();
        chart.set_text(ToothId::new(21).unwrap(), ToothTextField::TreatmentDone, "<&>");
        let svg = render_chart_svg(&chart, None);
        assert!(svg.contains("&lt;&amp;&gt;"));
    }
}
