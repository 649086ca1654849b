use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use printpdf::image_crate::codecs::jpeg::JpegDecoder;
use printpdf::{
    BuiltinFont, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference, Point,
};
use tracing::{debug, warn};

use super::aggregator::AggregatedSubject;
use crate::workflows::ingestion::normalizer::format_number;
use crate::workflows::registry::Student;

const DOCUMENT_TITLE: &str = "Hall Ticket";
const SUBJECTS_LABEL: &str = "Subjects to Write:";

// US Letter, in points.
const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;
const TOP_MARGIN: f32 = 72.0;
const BOTTOM_MARGIN: f32 = 72.0;
const LEFT: f32 = 50.0;
const RIGHT: f32 = 550.0;
const HEADER_FIT: (f32, f32) = (500.0, 100.0);

const TITLE_SIZE: f32 = 16.0;
const BODY_SIZE: f32 = 12.0;
const LINE_HEIGHT: f32 = BODY_SIZE * 1.2;
// Mean Helvetica advance as a fraction of the font size, rounded up.
const GLYPH_WIDTH: f32 = 0.55;

struct Column {
    title: &'static str,
    x: f32,
    width: f32,
}

const COLUMNS: [Column; 4] = [
    Column {
        title: "Subject Name",
        x: 50.0,
        width: 150.0,
    },
    Column {
        title: "Subject Code",
        x: 200.0,
        width: 100.0,
    },
    Column {
        title: "Type",
        x: 300.0,
        width: 100.0,
    },
    Column {
        title: "Exam Schedule",
        x: 400.0,
        width: 150.0,
    },
];

/// Everything printed on a hall ticket, independent of the output format.
#[derive(Debug, Clone, PartialEq)]
pub struct HallTicket {
    pub name: String,
    pub registration_number: String,
    pub department: String,
    pub semester: String,
    pub attendance: f64,
    pub fees_paid: bool,
    pub subjects: Vec<AggregatedSubject>,
}

impl HallTicket {
    pub fn new(student: &Student, subjects: Vec<AggregatedSubject>) -> Self {
        Self {
            name: student.name.clone(),
            registration_number: student.registration_number.clone(),
            department: student.department.clone().unwrap_or_default(),
            semester: student.semester.clone().unwrap_or_default(),
            attendance: student.attendance,
            fees_paid: student.fees_paid,
            subjects,
        }
    }

    pub fn metadata_lines(&self) -> [String; 4] {
        [
            format!("Name: {}", self.name),
            format!("Register Number: {}", self.registration_number),
            format!("Department: {}", self.department),
            format!("Semester: {}", self.semester),
        ]
    }

    /// Cells in column order: name, code, type, schedule.
    pub fn table_rows(&self) -> Vec<[String; 4]> {
        self.subjects
            .iter()
            .map(|subject| {
                [
                    subject.name.clone(),
                    subject.code.clone(),
                    subject.kind.label().to_string(),
                    subject.exam_schedule.clone(),
                ]
            })
            .collect()
    }

    pub fn footer_line(&self) -> String {
        format!(
            "Attendance: {}% / Fees Paid: {}",
            format_number(self.attendance),
            if self.fees_paid { "Yes" } else { "No" }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedArtifact {
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("pdf generation failed: {0}")]
    Pdf(String),
}

/// Lays a [`HallTicket`] out on fixed-geometry pages.
#[derive(Debug, Clone, Default)]
pub struct ArtifactRenderer {
    header_image: Option<PathBuf>,
}

impl ArtifactRenderer {
    pub fn new(header_image: Option<PathBuf>) -> Self {
        Self { header_image }
    }

    pub fn render(&self, ticket: &HallTicket) -> Result<RenderedArtifact, RenderError> {
        let (doc, page, layer) = PdfDocument::new(
            DOCUMENT_TITLE,
            pt(PAGE_WIDTH),
            pt(PAGE_HEIGHT),
            "Layer 1",
        );
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|err| RenderError::Pdf(err.to_string()))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|err| RenderError::Pdf(err.to_string()))?;

        let page_count = {
            let mut canvas = Canvas {
                doc: &doc,
                layer: doc.get_page(page).get_layer(layer),
                cursor: TOP_MARGIN,
                pages: 1,
                regular,
                bold,
            };

            if let Some(image) = self.header_image.as_deref().and_then(load_header) {
                canvas.header_image(image);
            }
            canvas.title(DOCUMENT_TITLE);
            for line in ticket.metadata_lines() {
                canvas.body_line(&line);
            }
            canvas.cursor += LINE_HEIGHT;
            canvas.subjects_label();
            canvas.table_header();
            for row in ticket.table_rows() {
                canvas.table_row(&row);
            }
            canvas.cursor += LINE_HEIGHT;
            canvas.ensure_room(LINE_HEIGHT);
            canvas.body_line(&ticket.footer_line());
            canvas.pages
        };

        let bytes = doc
            .save_to_bytes()
            .map_err(|err| RenderError::Pdf(err.to_string()))?;
        Ok(RenderedArtifact { bytes, page_count })
    }
}

struct Canvas<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    /// Distance from the top edge of the current page, in points.
    cursor: f32,
    pages: usize,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

impl Canvas<'_> {
    fn y(&self, from_top: f32) -> Mm {
        pt(PAGE_HEIGHT - from_top)
    }

    /// Start a new page when `height` does not fit. Returns whether it did.
    fn ensure_room(&mut self, height: f32) -> bool {
        if self.cursor + height <= PAGE_HEIGHT - BOTTOM_MARGIN {
            return false;
        }
        let (page, layer) = self.doc.add_page(pt(PAGE_WIDTH), pt(PAGE_HEIGHT), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.cursor = TOP_MARGIN;
        self.pages += 1;
        true
    }

    fn text(&self, text: &str, size: f32, x: f32, baseline: f32, bold: bool) {
        let font = if bold { &self.bold } else { &self.regular };
        self.layer.use_text(text, size, pt(x), self.y(baseline), font);
    }

    fn rule(&self, from_x: f32, to_x: f32, at: f32) {
        self.layer.set_outline_thickness(0.75);
        self.layer.add_line(Line {
            points: vec![
                (Point::new(pt(from_x), self.y(at)), false),
                (Point::new(pt(to_x), self.y(at)), false),
            ],
            is_closed: false,
        });
    }

    fn header_image(&mut self, image: Image) {
        let width = image.image.width.0 as f32;
        let height = image.image.height.0 as f32;
        if width <= 0.0 || height <= 0.0 {
            return;
        }

        let scale = (HEADER_FIT.0 / width).min(HEADER_FIT.1 / height);
        let (drawn_width, drawn_height) = (width * scale, height * scale);
        image.add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(pt((PAGE_WIDTH - drawn_width) / 2.0)),
                translate_y: Some(self.y(self.cursor + drawn_height)),
                scale_x: Some(scale),
                scale_y: Some(scale),
                dpi: Some(72.0),
                ..Default::default()
            },
        );
        self.cursor += drawn_height + LINE_HEIGHT;
    }

    fn title(&mut self, title: &str) {
        let width = text_width(title, TITLE_SIZE);
        let x = (PAGE_WIDTH - width) / 2.0;
        let baseline = self.cursor + TITLE_SIZE;
        self.text(title, TITLE_SIZE, x, baseline, false);
        self.rule(x, x + width, baseline + 2.0);
        self.cursor += TITLE_SIZE * 1.2 + LINE_HEIGHT;
    }

    fn body_line(&mut self, line: &str) {
        self.text(line, BODY_SIZE, LEFT, self.cursor + BODY_SIZE, false);
        self.cursor += LINE_HEIGHT;
    }

    fn subjects_label(&mut self) {
        let baseline = self.cursor + BODY_SIZE;
        self.text(SUBJECTS_LABEL, BODY_SIZE, LEFT, baseline, false);
        self.rule(LEFT, LEFT + text_width(SUBJECTS_LABEL, BODY_SIZE), baseline + 2.0);
        self.cursor += LINE_HEIGHT * 1.5;
    }

    fn table_header(&mut self) {
        let baseline = self.cursor + BODY_SIZE;
        for column in &COLUMNS {
            self.text(column.title, BODY_SIZE, column.x, baseline, true);
        }
        self.cursor += LINE_HEIGHT * 1.5;
        self.rule(LEFT, RIGHT, self.cursor);
        self.cursor += LINE_HEIGHT / 2.0;
    }

    /// Emit one row, wrapping each cell within its column. Rows never split
    /// across pages; continuation pages repeat the column header.
    fn table_row(&mut self, cells: &[String; 4]) {
        let wrapped: Vec<Vec<String>> = COLUMNS
            .iter()
            .zip(cells.iter())
            .map(|(column, cell)| wrap(cell, column.width, BODY_SIZE))
            .collect();
        let lines = wrapped.iter().map(Vec::len).max().unwrap_or(1);
        let height = lines as f32 * LINE_HEIGHT;

        if self.ensure_room(height) {
            self.table_header();
        }

        for (column, cell_lines) in COLUMNS.iter().zip(&wrapped) {
            for (index, line) in cell_lines.iter().enumerate() {
                let baseline = self.cursor + BODY_SIZE + index as f32 * LINE_HEIGHT;
                self.text(line, BODY_SIZE, column.x, baseline, false);
            }
        }
        self.cursor += height + LINE_HEIGHT / 2.0;
    }
}

fn pt(points: f32) -> Mm {
    Mm(points * 25.4 / 72.0)
}

fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * GLYPH_WIDTH
}

/// Glyphs that fit in `width` points. The tolerance keeps a column exactly N
/// glyphs wide at N despite f32 rounding.
fn chars_per_line(width: f32, size: f32) -> usize {
    ((width / (size * GLYPH_WIDTH) + 1e-3).floor() as usize).max(1)
}

/// Greedy word wrap to `width` points; words longer than a line are split.
fn wrap(text: &str, width: f32, size: f32) -> Vec<String> {
    let max_chars = chars_per_line(width, size);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            lines.push(word.drain(..max_chars).collect());
        }
        let word: String = word.into_iter().collect();
        if word.is_empty() {
            continue;
        }

        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > max_chars {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// The header asset is optional; any failure to load it is logged and skipped.
fn load_header(path: &Path) -> Option<Image> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "header image absent");
            return None;
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "header image unreadable");
            return None;
        }
    };

    let decoder = match JpegDecoder::new(BufReader::new(file)) {
        Ok(decoder) => decoder,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "header image is not a JPEG");
            return None;
        }
    };

    match Image::try_from(decoder) {
        Ok(image) => Some(image),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "header image could not be embedded");
            None
        }
    }
}
