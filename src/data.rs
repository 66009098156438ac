use printpdf::{BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point};
use rust_xlsxwriter::{Format, Workbook};
use serde::Serialize;
use std::str::FromStr;

use crate::analytics::average;
use crate::database::{Student, Subject};
use crate::error::{Error, Result};
use crate::model::{History, XSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xlsx,
    Pdf,
    Json,
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" => Ok(ExportFormat::Xlsx),
            "pdf" => Ok(ExportFormat::Pdf),
            "json" => Ok(ExportFormat::Json),
            other => Err(Error::UnsupportedFormat(other.to_string())),
        }
    }
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Json => "json",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Json => "application/json",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SheetRow {
    #[serde(rename = "Subject")]
    pub subject: String,
    #[serde(rename = "Grade")]
    pub grade: f64,
    #[serde(rename = "Date Added")]
    pub date_added: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SheetSummary {
    pub student: String,
    pub average: f64,
    pub subjects_count: usize,
}

#[derive(Debug, Clone, Serialize)]
struct JsonSheet<'a> {
    subjects: &'a [SheetRow],
    summary: SheetSummary,
}

pub struct Export {
    pub file_name: String,
    pub mime_type: &'static str,
    pub body: Vec<u8>,
}

pub fn sheet_rows(subjects: &[Subject]) -> Vec<SheetRow> {
    subjects
        .iter()
        .map(|s| SheetRow {
            subject: s.subject.clone(),
            grade: s.grade,
            date_added: s.date_added.format("%Y-%m-%d %H:%M").to_string(),
        })
        .collect()
}

const SHEET_HEADERS: [&str; 3] = ["Subject", "Grade", "Date Added"];

pub fn write_csv(rows: &[SheetRow]) -> Result<Vec<u8>> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    wtr.write_record(SHEET_HEADERS)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.into_inner()
        .map_err(|e| Error::Io(std::io::Error::new(e.error().kind(), e.error().to_string())))
}

/// Workbook with a `Subjects` sheet and a one-row `Summary` sheet.
pub fn write_xlsx(rows: &[SheetRow], summary: &SheetSummary) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    let subjects = workbook.add_worksheet();
    subjects.set_name("Subjects")?;
    for (col, header) in SHEET_HEADERS.iter().enumerate() {
        subjects.write_string_with_format(0, col as u16, *header, &bold)?;
    }
    for (idx, row) in rows.iter().enumerate() {
        let r = idx as u32 + 1;
        subjects.write_string(r, 0, row.subject.as_str())?;
        subjects.write_number(r, 1, row.grade)?;
        subjects.write_string(r, 2, row.date_added.as_str())?;
    }
    subjects.set_column_width(0, 30)?;
    subjects.set_column_width(2, 18)?;

    let sheet = workbook.add_worksheet();
    sheet.set_name("Summary")?;
    for (col, header) in ["Student", "Average", "Subjects count"].iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, &bold)?;
    }
    sheet.write_string(1, 0, summary.student.as_str())?;
    sheet.write_number(1, 1, summary.average)?;
    sheet.write_number(1, 2, summary.subjects_count as f64)?;

    Ok(workbook.save_to_buffer()?)
}

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN_LEFT: f32 = 20.0;
const MARGIN_BOTTOM: f32 = 20.0;
const TABLE_TOP: f32 = 277.0;
const ROW_HEIGHT: f32 = 8.0;
const COLUMN_WIDTHS: [f32; 3] = [78.0, 21.0, 53.0];

fn pdf_error<E: std::fmt::Debug>(e: E) -> Error {
    Error::Pdf(format!("{:?}", e))
}

fn hline(layer: &PdfLayerReference, x1: f32, x2: f32, y: f32) {
    layer.add_line(Line {
        points: vec![(Point::new(Mm(x1), Mm(y)), false), (Point::new(Mm(x2), Mm(y)), false)],
        is_closed: false,
    });
}

fn vline(layer: &PdfLayerReference, x: f32, y1: f32, y2: f32) {
    layer.add_line(Line {
        points: vec![(Point::new(Mm(x), Mm(y1)), false), (Point::new(Mm(x), Mm(y2)), false)],
        is_closed: false,
    });
}

/// One grid row whose top edge sits at `top`.
fn draw_row(layer: &PdfLayerReference, top: f32, cells: [&str; 3], font: &IndirectFontRef) {
    let right = MARGIN_LEFT + COLUMN_WIDTHS.iter().sum::<f32>();
    let bottom = top - ROW_HEIGHT;
    hline(layer, MARGIN_LEFT, right, top);
    hline(layer, MARGIN_LEFT, right, bottom);

    let mut x = MARGIN_LEFT;
    vline(layer, x, top, bottom);
    for (cell, width) in cells.iter().zip(COLUMN_WIDTHS) {
        layer.use_text(*cell, 10.0, Mm(x + 2.0), Mm(bottom + 2.5), font);
        x += width;
        vline(layer, x, top, bottom);
    }
}

/// Student header followed by a grid of subjects, continued on new pages as needed.
pub fn write_pdf(student: &Student, rows: &[SheetRow]) -> Result<Vec<u8>> {
    let title = format!("{} - subjects", student.name);
    let (doc, page, layer) = PdfDocument::new(&title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_error)?;

    let mut layer = doc.get_page(page).get_layer(layer);
    layer.use_text(format!("Student: {}", student.name), 18.0, Mm(MARGIN_LEFT), Mm(TABLE_TOP), &bold);
    layer.use_text(format!("Index: {}", student.index), 11.0, Mm(MARGIN_LEFT), Mm(TABLE_TOP - 9.0), &regular);
    layer.use_text(format!("City: {}", student.city), 11.0, Mm(MARGIN_LEFT), Mm(TABLE_TOP - 15.0), &regular);

    let mut top = TABLE_TOP - 24.0;
    if rows.is_empty() {
        layer.use_text("No subjects available.", 11.0, Mm(MARGIN_LEFT), Mm(top), &regular);
    } else {
        draw_row(&layer, top, SHEET_HEADERS, &bold);
        top -= ROW_HEIGHT;
        for row in rows {
            if top - ROW_HEIGHT < MARGIN_BOTTOM {
                let (next_page, next_layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
                layer = doc.get_page(next_page).get_layer(next_layer);
                top = TABLE_TOP;
                draw_row(&layer, top, SHEET_HEADERS, &bold);
                top -= ROW_HEIGHT;
            }
            let grade = row.grade.to_string();
            draw_row(&layer, top, [row.subject.as_str(), grade.as_str(), row.date_added.as_str()], &regular);
            top -= ROW_HEIGHT;
        }
    }

    drop(layer);
    doc.save_to_bytes().map_err(pdf_error)
}

pub fn export_sheet(student: &Student, subjects: &[Subject], format: ExportFormat) -> Result<Export> {
    let rows = sheet_rows(subjects);
    let grades: Vec<f64> = subjects.iter().map(|s| s.grade).collect();
    let summary = SheetSummary {
        student: student.name.clone(),
        average: average(&grades),
        subjects_count: rows.len(),
    };

    let body = match format {
        ExportFormat::Csv => write_csv(&rows)?,
        ExportFormat::Xlsx => write_xlsx(&rows, &summary)?,
        ExportFormat::Pdf => write_pdf(student, &rows)?,
        ExportFormat::Json => serde_json::to_vec_pretty(&JsonSheet { subjects: &rows, summary })?,
    };

    log::info!("Exported {} subject(s) of student {} as {}", rows.len(), student.id, format.extension());
    Ok(Export {
        file_name: format!("{}_subjects.{}", download_stem(&student.name), format.extension()),
        mime_type: format.mime_type(),
        body,
    })
}

fn download_stem(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '"' | '/' | '\\') && !c.is_control())
        .collect();
    if cleaned.trim().is_empty() { "student".to_string() } else { cleaned }
}

/// Turns chronologically ordered subjects into a predictor history.
pub fn history_from_subjects(subjects: &[Subject], source: XSource) -> History {
    match source {
        XSource::Timestamp => History::from_timestamps(
            subjects
                .iter()
                .map(|s| (s.date_added.timestamp_millis() as f64 / 1000.0, s.grade)),
        ),
        XSource::Ordinal => History::from_grades(subjects.iter().map(|s| s.grade)),
    }
}
