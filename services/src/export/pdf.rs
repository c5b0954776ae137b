//! PDF export: one A4 page per entry, extra pages when the content overflows.
//!
//! Layout is computed first as plain lines, then drawn with the built-in Helvetica faces.

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument};

use super::ExportError;
use crate::database::EntryRow;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;
const LINE_HEIGHT_MM: f32 = 7.0;
const HEADING_SIZE: f32 = 14.0;
const BODY_SIZE: f32 = 11.0;
const LAYER_NAME: &str = "Layer 1";

/// Characters per wrapped content line at body size.
pub const WRAP_WIDTH: usize = 85;
/// Characters per wrapped line at heading size.
pub const HEADING_WRAP_WIDTH: usize = 66;
pub const NO_ENTRIES_TEXT: &str = "There are no diary entries to export.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub text: String,
    pub heading: bool,
}

impl Line {
    fn heading(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            heading: true,
        }
    }

    fn body(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            heading: false,
        }
    }
}

fn lines_per_page() -> usize {
    ((PAGE_HEIGHT_MM - 2.0 * MARGIN_MM) / LINE_HEIGHT_MM) as usize
}

/// Greedy word wrap. Words longer than `width` are split.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > width {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                let rest = word.split_off(width);
                lines.push(word.into_iter().collect());
                word = rest;
            }

            let extra = if current.is_empty() { 0 } else { 1 };
            if current.chars().count() + extra + word.len() > width {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.extend(word);
        }
        lines.push(current);
    }

    lines
}

fn wrapped_headings(text: &str) -> impl Iterator<Item = Line> {
    wrap_text(text, HEADING_WRAP_WIDTH).into_iter().map(Line::heading)
}

/// Split entries into pages of lines.
pub fn layout_pages(entries: &[EntryRow]) -> Vec<Vec<Line>> {
    if entries.is_empty() {
        return vec![vec![Line::heading(NO_ENTRIES_TEXT)]];
    }

    let per_page = lines_per_page();
    let mut pages = Vec::new();

    for entry in entries {
        let mut lines = vec![Line::heading(format!(
            "Date: {}",
            entry.date.format("%Y-%m-%d")
        ))];
        lines.extend(wrapped_headings(&format!("Title: {}", entry.title)));
        lines.push(Line::heading(format!("Mood Rating: {}", entry.mood_rating)));
        lines.push(Line::heading("Content:"));
        lines.extend(wrap_text(&entry.content, WRAP_WIDTH).into_iter().map(Line::body));
        lines.extend(wrapped_headings(&format!("Tags: {}", entry.tag_list())));

        pages.extend(lines.chunks(per_page).map(<[Line]>::to_vec));
    }

    pages
}

fn draw_pages(pages: &[Vec<Line>]) -> Result<Vec<u8>, ExportError> {
    let (doc, first_page, first_layer) = PdfDocument::new(
        "Diary Entries",
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        LAYER_NAME,
    );
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ExportError::Pdf(format!("{e:?}")))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| ExportError::Pdf(format!("{e:?}")))?;

    let mut first = Some((first_page, first_layer));
    for lines in pages {
        let (page, layer) = match first.take() {
            Some(first) => first,
            None => doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), LAYER_NAME),
        };
        let layer = doc.get_page(page).get_layer(layer);

        for (row, line) in lines.iter().enumerate() {
            let (font, size): (&IndirectFontRef, f32) = if line.heading {
                (&bold, HEADING_SIZE)
            } else {
                (&regular, BODY_SIZE)
            };
            let y = PAGE_HEIGHT_MM - MARGIN_MM - (row as f32 + 1.0) * LINE_HEIGHT_MM;
            layer.use_text(line.text.clone(), size, Mm(MARGIN_MM), Mm(y), font);
        }
    }

    doc.save_to_bytes()
        .map_err(|e| ExportError::Pdf(format!("{e:?}")))
}

pub fn entries_to_pdf(entries: &[EntryRow]) -> Result<Vec<u8>, ExportError> {
    draw_pages(&layout_pages(entries))
}
