//! PDF task report built with printpdf's builtin fonts

use super::metrics::Face;
use super::{check_limit, RenderError, ReportRenderer};
use crate::models::Task;
use chrono::{DateTime, Utc};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference};
use taskdesk_common::{
    format_date, format_datetime, DEFAULT_REPORT_MAX_TASKS, PDF_CONTENT_TYPE, REPORT_FILENAME,
};
use tracing::{debug, instrument};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;
const TITLE_SIZE: f32 = 18.0;
const HEADING_SIZE: f32 = 12.0;
const BODY_SIZE: f32 = 10.0;
/// Indent of the detail lines under a task heading, in mm
const DETAIL_INDENT: f32 = 4.0;
/// Slack for float rounding when comparing widths, in mm
const WIDTH_TOLERANCE: f32 = 0.001;

pub const EMPTY_REPORT_MESSAGE: &str = "No tasks match the selected filters.";

/// Layout options for [`PdfReportRenderer`]
#[derive(Debug, Clone)]
pub struct PdfReportConfig {
    pub title: String,
    pub max_tasks: usize,
    /// Description lines printed per task before truncating
    pub description_lines: usize,
}

impl Default for PdfReportConfig {
    fn default() -> Self {
        Self {
            title: "Task Report".to_string(),
            max_tasks: DEFAULT_REPORT_MAX_TASKS,
            description_lines: 6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Style {
    Title,
    Heading,
    Body,
}

impl Style {
    fn size(self) -> f32 {
        match self {
            Self::Title => TITLE_SIZE,
            Self::Heading => HEADING_SIZE,
            Self::Body => BODY_SIZE,
        }
    }

    fn face(self) -> Face {
        match self {
            Self::Body => Face::Regular,
            Self::Title | Self::Heading => Face::Bold,
        }
    }

    /// Vertical space the line takes up, in mm
    fn advance(self) -> f32 {
        self.size() * 0.5
    }

    fn width(self, text: &str) -> f32 {
        self.face().text_width(text, self.size())
    }

    fn char_width(self, c: char) -> f32 {
        self.face().char_width(c, self.size())
    }

    fn fits(self, text: &str, max: f32) -> bool {
        self.width(text) <= max + WIDTH_TOLERANCE
    }
}

/// Horizontal room between the left indent and the right margin, in mm
fn available_width(indent: f32) -> f32 {
    PAGE_WIDTH - 2.0 * MARGIN - indent
}

/// One drawn line; an empty `text` is vertical spacing only
#[derive(Debug, Clone, PartialEq)]
struct Line {
    style: Style,
    indent: f32,
    text: String,
}

impl Line {
    /// A line of printable text, shortened with `...` if it would cross the right margin
    fn new(style: Style, indent: f32, text: impl AsRef<str>) -> Self {
        let text = sanitize(text.as_ref());
        Self {
            style,
            indent,
            text: fit(&text, style, available_width(indent)),
        }
    }

    fn spacer() -> Self {
        Self {
            style: Style::Body,
            indent: 0.0,
            text: String::new(),
        }
    }

    /// Where the text ends, measured from the left edge of the page
    #[cfg(test)]
    fn right_edge(&self) -> f32 {
        MARGIN + self.indent + self.style.width(&self.text)
    }
}

/// Builtin PDF fonts only cover a single-byte encoding
fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c,
            '\t' | '\n' | '\r' => ' ',
            _ => '?',
        })
        .collect()
}

/// Split `text` after the longest prefix that fits in `max` mm, keeping at least one character
fn split_at_width(text: &str, style: Style, max: f32) -> (&str, &str) {
    let mut width = 0.0;
    let mut end = 0;
    for (i, c) in text.char_indices() {
        let w = style.char_width(c);
        if i > 0 && width + w > max + WIDTH_TOLERANCE {
            break;
        }
        width += w;
        end = i + c.len_utf8();
    }
    text.split_at(end)
}

/// `text` followed by `suffix`, dropping trailing characters of `text` until it fits
fn fit_with_suffix(text: &str, suffix: &str, style: Style, max: f32) -> String {
    let joined = format!("{text}{suffix}");
    if style.fits(&joined, max) {
        return joined;
    }
    let budget = max - style.width(suffix);
    let mut width = 0.0;
    let mut out = String::new();
    for c in text.chars() {
        let w = style.char_width(c);
        if width + w > budget + WIDTH_TOLERANCE {
            break;
        }
        width += w;
        out.push(c);
    }
    out.truncate(out.trim_end().len());
    out.push_str(suffix);
    out
}

fn fit(text: &str, style: Style, max: f32) -> String {
    if style.fits(text, max) {
        text.to_string()
    } else {
        fit_with_suffix(text, "...", style, max)
    }
}

/// Break `text` into lines no wider than `max` mm, at spaces where possible
fn wrap(text: &str, style: Style, max: f32) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            if !current.is_empty() {
                let candidate = format!("{current} {word}");
                if style.fits(&candidate, max) {
                    current = candidate;
                    continue;
                }
                lines.push(std::mem::take(&mut current));
            }
            let mut rest = word;
            while !style.fits(rest, max) {
                let (head, tail) = split_at_width(rest, style, max);
                lines.push(head.to_string());
                rest = tail;
            }
            current = rest.to_string();
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }
    lines
}

/// Renders tasks to an A4 PDF, one block per task, paginating as needed
#[derive(Debug, Clone, Default)]
pub struct PdfReportRenderer {
    config: PdfReportConfig,
}

impl PdfReportRenderer {
    #[must_use]
    pub fn new(config: PdfReportConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn with_max_tasks(max_tasks: usize) -> Self {
        Self::new(PdfReportConfig {
            max_tasks,
            ..PdfReportConfig::default()
        })
    }

    #[must_use]
    pub fn config(&self) -> &PdfReportConfig {
        &self.config
    }

    fn header(&self, tasks: &[Task], generated_at: DateTime<Utc>) -> Vec<Line> {
        vec![
            Line::new(Style::Title, 0.0, &self.config.title),
            Line::new(
                Style::Body,
                0.0,
                format!("Generated {}", format_datetime(&generated_at)),
            ),
            Line::new(Style::Body, 0.0, format!("{} task(s)", tasks.len())),
        ]
    }

    fn task_block(&self, task: &Task) -> Vec<Line> {
        let mut block = vec![
            Line::new(Style::Heading, 0.0, &task.name),
            Line::new(
                Style::Body,
                DETAIL_INDENT,
                format!(
                    "Status: {}    Priority: {}",
                    task.status.label(),
                    task.priority
                ),
            ),
            Line::new(
                Style::Body,
                DETAIL_INDENT,
                format!(
                    "Created: {}    Updated: {}",
                    format_date(&task.created_at.date_naive()),
                    format_date(&task.updated_at.date_naive())
                ),
            ),
        ];
        if let Some(file) = &task.file {
            block.push(Line::new(
                Style::Body,
                DETAIL_INDENT,
                format!("Attachment: {file}"),
            ));
        }

        let width = available_width(DETAIL_INDENT);
        let description = wrap(&sanitize(&task.description), Style::Body, width);
        let budget = self.config.description_lines;
        for (i, text) in description.iter().enumerate().take(budget) {
            let text = if i + 1 == budget && description.len() > budget {
                fit_with_suffix(text, " ...", Style::Body, width)
            } else {
                text.clone()
            };
            block.push(Line::new(Style::Body, DETAIL_INDENT, text));
        }
        block
    }

    /// Split the report into pages of lines
    ///
    /// The header and every task block end with a spacer line. A block is never
    /// split across pages unless it is taller than a whole page.
    fn layout(&self, tasks: &[Task], generated_at: DateTime<Utc>) -> Vec<Vec<Line>> {
        let usable = PAGE_HEIGHT - 2.0 * MARGIN;
        let height = |lines: &[Line]| lines.iter().map(|l| l.style.advance()).sum::<f32>();

        let mut header = self.header(tasks, generated_at);
        header.push(Line::spacer());
        let mut used = height(&header);
        let mut pages = vec![header];

        if tasks.is_empty() {
            pages[0].push(Line::new(Style::Body, 0.0, EMPTY_REPORT_MESSAGE));
            return pages;
        }

        for task in tasks {
            let mut block = self.task_block(task);
            block.push(Line::spacer());
            let block_height = height(&block);
            if used + block_height > usable && block_height <= usable {
                pages.push(Vec::new());
                used = 0.0;
            }
            for line in block {
                if used + line.style.advance() > usable {
                    pages.push(Vec::new());
                    used = 0.0;
                }
                used += line.style.advance();
                if let Some(page) = pages.last_mut() {
                    page.push(line);
                }
            }
        }
        pages
    }

    fn draw(&self, pages: &[Vec<Line>]) -> Result<Vec<u8>, RenderError> {
        let (doc, first_page, first_layer) = PdfDocument::new(
            &self.config.title,
            Mm(PAGE_WIDTH),
            Mm(PAGE_HEIGHT),
            "Layer 1",
        );
        let regular = builtin_font(&doc, BuiltinFont::Helvetica)?;
        let bold = builtin_font(&doc, BuiltinFont::HelveticaBold)?;

        for (index, lines) in pages.iter().enumerate() {
            let (page, layer) = if index == 0 {
                (first_page, first_layer)
            } else {
                doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1")
            };
            let layer = doc.get_page(page).get_layer(layer);

            let mut y = PAGE_HEIGHT - MARGIN;
            for line in lines {
                y -= line.style.advance();
                if line.text.is_empty() {
                    continue;
                }
                let font = match line.style.face() {
                    Face::Regular => &regular,
                    Face::Bold => &bold,
                };
                layer.use_text(
                    line.text.as_str(),
                    line.style.size(),
                    Mm(MARGIN + line.indent),
                    Mm(y),
                    font,
                );
            }
        }

        doc.save_to_bytes()
            .map_err(|e| RenderError::Pdf(e.to_string()))
    }
}

fn builtin_font(
    doc: &PdfDocumentReference,
    font: BuiltinFont,
) -> Result<IndirectFontRef, RenderError> {
    doc.add_builtin_font(font)
        .map_err(|e| RenderError::Pdf(format!("Failed to load font: {e}")))
}

impl ReportRenderer for PdfReportRenderer {
    #[instrument(skip(self, tasks), fields(tasks = tasks.len()))]
    fn render(&self, tasks: &[Task]) -> Result<Vec<u8>, RenderError> {
        check_limit(tasks.len(), self.max_tasks())?;
        let pages = self.layout(tasks, Utc::now());
        let bytes = self.draw(&pages)?;
        debug!("Rendered {} page PDF ({} bytes)", pages.len(), bytes.len());
        Ok(bytes)
    }

    fn content_type(&self) -> &'static str {
        PDF_CONTENT_TYPE
    }

    fn filename(&self) -> &'static str {
        REPORT_FILENAME
    }

    fn max_tasks(&self) -> Option<usize> {
        Some(self.config.max_tasks)
    }
}
