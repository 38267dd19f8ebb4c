//! A4 layout and PDF rendering of billing documents.
//!
//! Layout is a pure pass producing positioned items per page (mm, origin at
//! the top-left). Footers need the final page count, so they are added once
//! the body is laid out. Rendering then maps the items onto `printpdf`.

use std::io::BufWriter;
use std::mem;

use printpdf::image_crate::{self, ImageFormat};
use printpdf::path::{PaintMode, WindingOrder};
use printpdf::*;

use super::billing::{BillingDocument, ChartFigure, CHART_CAPTURE_PLACEHOLDER, NO_TEETH_MESSAGE};
use super::snapshot::ChartImage;
use super::{ExportError, ExportResult};

pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 15.0;
/// Space reserved for the footer
const BOTTOM_MARGIN_MM: f32 = 20.0;
const MAX_CONTENT_Y: f32 = PAGE_HEIGHT_MM - BOTTOM_MARGIN_MM;
/// First content line on continuation pages
const CONTINUATION_TOP_MM: f32 = 20.0;
const FOOTER_Y: f32 = PAGE_HEIGHT_MM - 12.0;
const RIGHT_COLUMN_X: f32 = 120.0;
const LINE_MM: f32 = 7.0;
const SMALL_LINE_MM: f32 = 5.0;

const CHART_HEADING: &str = "DENTAL CHART - TREATED TEETH";
const CHART_CONTINUED: &str = "DENTAL CHART - TREATED TEETH (continued)";

/// Billing table header fill (gold).
const TABLE_HEADER_RGB: [u8; 3] = [255, 215, 0];
const TABLE_COLUMNS_MM: [f32; 4] = [72.0, 36.0, 36.0, 36.0];
const CELL_PADDING_MM: f32 = 3.0;

/// A positioned drawing instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutItem {
    Text {
        x: f32,
        y: f32,
        size: f32,
        bold: bool,
        text: String,
    },
    Rule {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        thickness: f32,
    },
    Fill {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        rgb: [u8; 3],
    },
    /// The captured chart, top-left at (x, y)
    ChartImage {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
}

/// Items on one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    pub items: Vec<LayoutItem>,
}

impl PageLayout {
    /// Text items on this page, in drawing order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.items.iter().filter_map(|item| match item {
            LayoutItem::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

/// Approximate Helvetica advance width.
fn text_width_mm(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * 0.52 * 0.3528
}

/// Greedy word wrap to a width in mm.
fn wrap_to_width(text: &str, width_mm: f32, size: f32) -> Vec<String> {
    let max_chars = ((width_mm / text_width_mm("x", size)) as usize).max(1);

    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if current.chars().count() + word.chars().count() + 1 > max_chars && !current.is_empty() {
            lines.push(mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Page cursor with page-break handling.
struct Cursor {
    done: Vec<PageLayout>,
    current: PageLayout,
    y: f32,
}

impl Cursor {
    fn new() -> Self {
        Self {
            done: Vec::new(),
            current: PageLayout::default(),
            y: 0.0,
        }
    }

    fn new_page(&mut self) {
        self.done.push(mem::take(&mut self.current));
        self.y = CONTINUATION_TOP_MM;
    }

    /// Break the page unless `height` more fits, repeating `continuation`
    /// as a heading on the new page.
    fn ensure(&mut self, height: f32, continuation: Option<&str>) {
        if self.y + height > MAX_CONTENT_Y {
            self.new_page();
            if let Some(title) = continuation {
                self.heading(title);
            }
        }
    }

    fn push(&mut self, item: LayoutItem) {
        self.current.items.push(item);
    }

    fn text_at(&mut self, x: f32, y: f32, size: f32, bold: bool, text: impl Into<String>) {
        self.push(LayoutItem::Text {
            x,
            y,
            size,
            bold,
            text: text.into(),
        });
    }

    fn text(&mut self, x: f32, size: f32, bold: bool, text: impl Into<String>) {
        let y = self.y;
        self.text_at(x, y, size, bold, text);
    }

    fn heading(&mut self, title: &str) {
        self.text(MARGIN_MM, 16.0, true, title);
        self.y += 10.0;
    }

    /// Wrapped paragraph at the left margin, breaking pages per line.
    fn paragraph(&mut self, text: &str, width: f32, size: f32, line_height: f32) {
        for line in wrap_to_width(text, width, size) {
            self.ensure(line_height, None);
            self.text(MARGIN_MM, size, false, line);
            self.y += line_height;
        }
    }

    fn finish(mut self) -> Vec<PageLayout> {
        self.done.push(self.current);
        self.done
    }
}

/// Lay out a billing document on A4 pages, footers included.
pub fn layout_billing(document: &BillingDocument, image_width_mm: f32) -> Vec<PageLayout> {
    let mut cursor = Cursor::new();

    layout_header(&mut cursor, document);
    layout_patient(&mut cursor, document);
    layout_procedure(&mut cursor, document);
    layout_chart(&mut cursor, document, image_width_mm);
    layout_billing_table(&mut cursor, document);

    let mut pages = cursor.finish();
    add_footers(&mut pages, &document.thank_you);
    pages
}

fn layout_header(cursor: &mut Cursor, document: &BillingDocument) {
    cursor.text_at(50.0, 20.0, 20.0, true, document.clinic_name.to_uppercase());
    for (i, tagline) in document.taglines.iter().enumerate() {
        cursor.text_at(50.0, 28.0 + i as f32 * LINE_MM, 12.0, false, tagline.clone());
    }
    cursor.text_at(
        140.0,
        15.0,
        10.0,
        false,
        format!("Generated: {}", document.generated_at),
    );
    cursor.push(LayoutItem::Rule {
        x1: MARGIN_MM,
        y1: 45.0,
        x2: PAGE_WIDTH_MM - MARGIN_MM,
        y2: 45.0,
        thickness: 0.5,
    });
    cursor.y = 55.0;
}

fn layout_patient(cursor: &mut Cursor, document: &BillingDocument) {
    let patient = &document.patient;

    cursor.ensure(50.0, None);
    cursor.heading("PATIENT INFORMATION");

    cursor.paragraph(&format!("Full Name: {}", patient.full_name), 180.0, 11.0, LINE_MM);

    cursor.ensure(LINE_MM, None);
    cursor.text(MARGIN_MM, 11.0, false, format!("Contact No.: {}", patient.contact_no));
    cursor.text(RIGHT_COLUMN_X, 11.0, false, format!("Email: {}", patient.email));
    cursor.y += LINE_MM;

    // Birthday sits on the last address line.
    let address = wrap_to_width(&format!("Address: {}", patient.address), 100.0, 11.0);
    let last = address.len() - 1;
    for (i, line) in address.into_iter().enumerate() {
        cursor.ensure(LINE_MM, None);
        cursor.text(MARGIN_MM, 11.0, false, line);
        if i == last {
            cursor.text(RIGHT_COLUMN_X, 11.0, false, format!("Birthday: {}", patient.birthday));
        }
        cursor.y += LINE_MM;
    }

    cursor.ensure(LINE_MM, None);
    cursor.text(MARGIN_MM, 11.0, false, format!("Date: {}", patient.date));
    cursor.y += 10.0;
}

fn layout_procedure(cursor: &mut Cursor, document: &BillingDocument) {
    let procedure = &document.procedure;

    cursor.ensure(40.0, None);
    cursor.heading("PROCEDURE DETAILS");

    let mut left = wrap_to_width(&format!("Procedure: {}", procedure.procedure), 100.0, 11.0);
    left.extend(wrap_to_width(&format!("Doctor: {}", procedure.doctor), 100.0, 11.0));
    let right = wrap_to_width(&format!("Remarks: {}", procedure.remarks), 70.0, 11.0);

    for row in 0..left.len().max(right.len()) {
        cursor.ensure(LINE_MM, None);
        if let Some(line) = left.get(row) {
            cursor.text(MARGIN_MM, 11.0, false, line.clone());
        }
        if let Some(line) = right.get(row) {
            cursor.text(RIGHT_COLUMN_X, 11.0, false, line.clone());
        }
        cursor.y += LINE_MM;
    }
    cursor.y += 10.0;
}

fn layout_chart(cursor: &mut Cursor, document: &BillingDocument, image_width_mm: f32) {
    cursor.ensure(30.0, None);
    cursor.heading(CHART_HEADING);

    if !document.has_treated_teeth() {
        cursor.ensure(10.0, None);
        cursor.text(MARGIN_MM, 10.0, false, NO_TEETH_MESSAGE);
        cursor.y += 10.0;
        cursor.y += 15.0;
        return;
    }

    match &document.chart {
        ChartFigure::Image(image) => {
            let (width, height) = fit_image(image, image_width_mm);
            cursor.ensure(height + 10.0, Some(CHART_CONTINUED));
            let y = cursor.y;
            cursor.push(LayoutItem::ChartImage {
                x: MARGIN_MM,
                y,
                width,
                height,
            });
            cursor.y += height + 10.0;
        }
        ChartFigure::CaptureFailed | ChartFigure::NotApplicable => {
            cursor.ensure(10.0, None);
            cursor.text(MARGIN_MM, 10.0, false, CHART_CAPTURE_PLACEHOLDER);
            cursor.y += 10.0;
        }
    }

    cursor.ensure(20.0, None);
    cursor.text(MARGIN_MM, 12.0, true, "Treated Teeth Summary:");
    cursor.y += 8.0;
    for line in &document.treated_lines {
        cursor.paragraph(line, 170.0, 10.0, SMALL_LINE_MM);
    }
    cursor.y += 15.0;
}

/// Scale the chart to `width_mm`, shrinking further if it would not fit on
/// an empty continuation page.
fn fit_image(image: &ChartImage, width_mm: f32) -> (f32, f32) {
    let max_height = MAX_CONTENT_Y - CONTINUATION_TOP_MM - 10.0 - 10.0;
    let height = image.height_for_width(width_mm);
    if height > max_height && height > 0.0 {
        let scale = max_height / height;
        (width_mm * scale, max_height)
    } else {
        (width_mm, height)
    }
}

fn layout_billing_table(cursor: &mut Cursor, document: &BillingDocument) {
    // Header plus an estimated table height.
    cursor.ensure(26.0 + 40.0, None);
    cursor.heading("BILLING INFORMATION");

    let billing = &document.billing;
    let header = ["Procedure", "Total Bill", "Amount Paid", "Balance"];
    let procedure_lines = wrap_to_width(
        &billing.procedure,
        TABLE_COLUMNS_MM[0] - 2.0 * CELL_PADDING_MM,
        10.0,
    );
    let amounts = [&billing.total_bill, &billing.amount_paid, &billing.balance];

    let header_height = 10.0;
    let body_height = procedure_lines.len() as f32 * SMALL_LINE_MM + 5.0;
    let table_width: f32 = TABLE_COLUMNS_MM.iter().sum();
    let top = cursor.y;

    cursor.push(LayoutItem::Fill {
        x: MARGIN_MM,
        y: top,
        width: table_width,
        height: header_height,
        rgb: TABLE_HEADER_RGB,
    });

    let mut x = MARGIN_MM;
    for (i, title) in header.iter().enumerate() {
        let width = TABLE_COLUMNS_MM[i];
        let text_x = if i == 0 {
            x + CELL_PADDING_MM
        } else {
            x + width - CELL_PADDING_MM - text_width_mm(title, 10.0)
        };
        cursor.text_at(text_x, top + 6.5, 10.0, true, *title);
        x += width;
    }

    let body_top = top + header_height;
    for (i, line) in procedure_lines.iter().enumerate() {
        cursor.text_at(
            MARGIN_MM + CELL_PADDING_MM,
            body_top + 6.5 + i as f32 * SMALL_LINE_MM,
            10.0,
            false,
            line.clone(),
        );
    }
    let mut x = MARGIN_MM + TABLE_COLUMNS_MM[0];
    for (amount, width) in amounts.iter().zip(&TABLE_COLUMNS_MM[1..]) {
        cursor.text_at(
            x + width - CELL_PADDING_MM - text_width_mm(amount, 10.0),
            body_top + 6.5,
            10.0,
            false,
            amount.to_string(),
        );
        x += width;
    }

    // Grid.
    let bottom = body_top + body_height;
    for y in [top, body_top, bottom] {
        cursor.push(LayoutItem::Rule {
            x1: MARGIN_MM,
            y1: y,
            x2: MARGIN_MM + table_width,
            y2: y,
            thickness: 0.1,
        });
    }
    let mut x = MARGIN_MM;
    for width in TABLE_COLUMNS_MM.iter().chain(std::iter::once(&0.0)) {
        cursor.push(LayoutItem::Rule {
            x1: x,
            y1: top,
            x2: x,
            y2: bottom,
            thickness: 0.1,
        });
        x += width;
    }

    cursor.y = bottom + 20.0;
}

fn add_footers(pages: &mut [PageLayout], thank_you: &str) {
    let count = pages.len();
    let thank_you_x = (PAGE_WIDTH_MM - text_width_mm(thank_you, 8.0)) / 2.0;

    for (i, page) in pages.iter_mut().enumerate() {
        page.items.push(LayoutItem::Text {
            x: MARGIN_MM,
            y: FOOTER_Y,
            size: 8.0,
            bold: false,
            text: format!("Page {} of {}", i + 1, count),
        });
        page.items.push(LayoutItem::Text {
            x: thank_you_x,
            y: FOOTER_Y,
            size: 8.0,
            bold: false,
            text: thank_you.to_string(),
        });
    }
}

/// Lay out and render a billing document to PDF bytes.
pub fn render_billing_pdf(document: &BillingDocument, image_width_mm: f32) -> ExportResult<Vec<u8>> {
    render_pages(document, &layout_billing(document, image_width_mm))
}

/// Render laid-out pages to PDF bytes.
pub fn render_pages(document: &BillingDocument, pages: &[PageLayout]) -> ExportResult<Vec<u8>> {
    let (doc, page1, layer1) = PdfDocument::new(
        &document.file_name,
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Layer 1",
    );
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ExportError::Pdf(format!("PDF font error: {e}")))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| ExportError::Pdf(format!("PDF font error: {e}")))?;

    let chart = match &document.chart {
        ChartFigure::Image(image) => Some(image),
        _ => None,
    };

    for (index, page) in pages.iter().enumerate() {
        let layer = if index == 0 {
            doc.get_page(page1).get_layer(layer1)
        } else {
            let (page_ref, layer_ref) =
                doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
            doc.get_page(page_ref).get_layer(layer_ref)
        };

        for item in &page.items {
            draw_item(&layer, item, &font, &bold, chart);
        }
    }

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| ExportError::Pdf(format!("PDF save error: {e}")))?;
    buf.into_inner()
        .map_err(|e| ExportError::Pdf(format!("PDF buffer error: {e}")))
}

/// Convert a top-origin y coordinate to PDF space.
fn pdf_y(y: f32) -> Mm {
    Mm(PAGE_HEIGHT_MM - y)
}

fn black() -> Color {
    Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None))
}

fn draw_item(
    layer: &PdfLayerReference,
    item: &LayoutItem,
    font: &IndirectFontRef,
    bold: &IndirectFontRef,
    chart: Option<&ChartImage>,
) {
    match item {
        LayoutItem::Text {
            x,
            y,
            size,
            bold: is_bold,
            text,
        } => {
            let face = if *is_bold { bold } else { font };
            layer.use_text(text.as_str(), *size, Mm(*x), pdf_y(*y), face);
        }
        LayoutItem::Rule {
            x1,
            y1,
            x2,
            y2,
            thickness,
        } => {
            layer.set_outline_thickness(*thickness);
            layer.add_line(Line {
                points: vec![
                    (Point::new(Mm(*x1), pdf_y(*y1)), false),
                    (Point::new(Mm(*x2), pdf_y(*y2)), false),
                ],
                is_closed: false,
            });
        }
        LayoutItem::Fill {
            x,
            y,
            width,
            height,
            rgb,
        } => {
            let [r, g, b] = *rgb;
            layer.set_fill_color(Color::Rgb(Rgb::new(
                r as f32 / 255.0,
                g as f32 / 255.0,
                b as f32 / 255.0,
                None,
            )));
            layer.add_polygon(Polygon {
                rings: vec![vec![
                    (Point::new(Mm(*x), pdf_y(*y)), false),
                    (Point::new(Mm(*x + *width), pdf_y(*y)), false),
                    (Point::new(Mm(*x + *width), pdf_y(*y + *height)), false),
                    (Point::new(Mm(*x), pdf_y(*y + *height)), false),
                ]],
                mode: PaintMode::Fill,
                winding_order: WindingOrder::NonZero,
            });
            layer.set_fill_color(black());
        }
        LayoutItem::ChartImage {
            x,
            y,
            width,
            height,
        } => {
            let decoded = chart.ok_or_else(|| "no chart image".to_string()).and_then(|image| {
                image_crate::load_from_memory_with_format(&image.png, ImageFormat::Png)
                    .map_err(|e| e.to_string())
            });
            match decoded {
                Ok(decoded) if decoded.width() > 0 && *width > 0.0 => {
                    let dpi = decoded.width() as f32 * 25.4 / *width;
                    Image::from_dynamic_image(&decoded).add_to_layer(
                        layer.clone(),
                        ImageTransform {
                            translate_x: Some(Mm(*x)),
                            translate_y: Some(pdf_y(*y + *height)),
                            dpi: Some(dpi),
                            ..Default::default()
                        },
                    );
                }
                Ok(_) => {
                    tracing::warn!("Chart image is empty");
                    layer.use_text(CHART_CAPTURE_PLACEHOLDER, 10.0, Mm(*x), pdf_y(*y), font);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Chart image could not be decoded");
                    layer.use_text(CHART_CAPTURE_PLACEHOLDER, 10.0, Mm(*x), pdf_y(*y), font);
                }
            }
        }
    }
}
