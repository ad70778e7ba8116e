// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Positioned text runs read from page content streams. Feeds the table
// detector and the editable-document encoder; scanned pages without a text
// layer simply yield no runs.

use std::collections::BTreeMap;

use falzwerk_core::error::{FalzwerkError, Result};
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};

use super::tree::number;

/// One string drawn by a text-showing operator.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    /// Start of the baseline in user space.
    pub x: f32,
    pub y: f32,
    /// Effective font size in points.
    pub font_size: f32,
}

impl TextRun {
    /// Rough right edge, assuming an average glyph is half an em wide.
    pub fn end_x(&self) -> f32 {
        self.x + self.text.chars().count() as f32 * self.font_size * 0.5
    }
}

/// A horizontal line of runs sharing a baseline, sorted left to right.
#[derive(Debug, Clone)]
pub struct TextLine {
    pub y: f32,
    pub runs: Vec<TextRun>,
}

impl TextLine {
    pub fn text(&self) -> String {
        self.runs
            .iter()
            .map(|run| run.text.trim())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Copy)]
struct TextMatrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Default for TextMatrix {
    fn default() -> Self {
        Self { a: 1.0, b: 0.0, c: 0.0, d: 1.0, e: 0.0, f: 0.0 }
    }
}

impl TextMatrix {
    fn translate(&mut self, tx: f32, ty: f32) {
        self.e += tx * self.a + ty * self.c;
        self.f += tx * self.b + ty * self.d;
    }

    fn scale(&self) -> f32 {
        (self.a * self.a + self.c * self.c).sqrt()
    }
}

/// Text runs on one page in content-stream order.
pub fn page_runs(doc: &Document, page_id: ObjectId) -> Result<Vec<TextRun>> {
    let fonts = doc.get_page_fonts(page_id).unwrap_or_default();
    let raw = doc
        .get_page_content(page_id)
        .map_err(|err| FalzwerkError::PdfError(format!("cannot read page content: {err}")))?;
    let content = Content::decode(&raw)
        .map_err(|err| FalzwerkError::PdfError(format!("cannot parse page content: {err}")))?;

    let mut runs = Vec::new();
    let mut font: Vec<u8> = Vec::new();
    let mut font_size = 12.0_f32;
    let mut leading = 0.0_f32;
    let mut line = TextMatrix::default();

    for op in &content.operations {
        let operands = &op.operands;
        match op.operator.as_str() {
            "BT" => line = TextMatrix::default(),
            "Tf" if operands.len() >= 2 => {
                if let Object::Name(name) = &operands[0] {
                    font = name.clone();
                }
                font_size = number(&operands[1]).unwrap_or(12.0);
            }
            "TL" if !operands.is_empty() => leading = number(&operands[0]).unwrap_or(0.0),
            "Td" if operands.len() >= 2 => {
                line.translate(number(&operands[0]).unwrap_or(0.0), number(&operands[1]).unwrap_or(0.0));
            }
            "TD" if operands.len() >= 2 => {
                let ty = number(&operands[1]).unwrap_or(0.0);
                leading = -ty;
                line.translate(number(&operands[0]).unwrap_or(0.0), ty);
            }
            "Tm" if operands.len() >= 6 => {
                let v: Vec<f32> = operands.iter().take(6).map(|o| number(o).unwrap_or(0.0)).collect();
                line = TextMatrix { a: v[0], b: v[1], c: v[2], d: v[3], e: v[4], f: v[5] };
            }
            "T*" => line.translate(0.0, -leading),
            "Tj" | "'" | "\"" | "TJ" => {
                if matches!(op.operator.as_str(), "'" | "\"") {
                    line.translate(0.0, -leading);
                }
                let text = shown_text(doc, fonts.get(&font).copied(), op.operator.as_str(), operands);
                if !text.trim().is_empty() {
                    runs.push(TextRun {
                        text,
                        x: line.e,
                        y: line.f,
                        font_size: font_size * line.scale(),
                    });
                }
            }
            _ => {}
        }
    }

    Ok(runs)
}

fn shown_text(doc: &Document, font: Option<&Dictionary>, operator: &str, operands: &[Object]) -> String {
    let encoding = font.and_then(|f| f.get_font_encoding(doc).ok());
    let decode = |bytes: &[u8]| match &encoding {
        Some(enc) => Document::decode_text(enc, bytes).unwrap_or_else(|_| decode_simple(bytes)),
        None => decode_simple(bytes),
    };

    let string_at = |index: usize| match operands.get(index) {
        Some(Object::String(bytes, _)) => decode(bytes),
        _ => String::new(),
    };

    match operator {
        "\"" => string_at(2),
        "TJ" => {
            let Some(Object::Array(items)) = operands.first() else {
                return String::new();
            };
            let mut combined = String::new();
            for item in items {
                match item {
                    Object::String(bytes, _) => combined.push_str(&decode(bytes)),
                    // A large negative kern is a word gap.
                    other => {
                        if number(other).is_some_and(|n| n < -200.0) && !combined.ends_with(' ') {
                            combined.push(' ');
                        }
                    }
                }
            }
            combined
        }
        _ => string_at(0),
    }
}

/// Fallback when a font has no usable encoding: UTF-16BE with BOM, UTF-8,
/// then Latin-1.
fn decode_simple(bytes: &[u8]) -> String {
    if let [0xFE, 0xFF, rest @ ..] = bytes {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_owned(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Group runs into lines by baseline, top of the page first. Runs whose
/// baselines differ by less than `tolerance` points share a line.
pub fn group_lines(runs: Vec<TextRun>, tolerance: f32) -> Vec<TextLine> {
    // Key on baseline in tenths of a point, descending.
    let mut by_y: BTreeMap<i64, Vec<TextRun>> = BTreeMap::new();
    for run in runs {
        by_y.entry(-(run.y * 10.0).round() as i64).or_default().push(run);
    }

    let mut lines: Vec<TextLine> = Vec::new();
    for (_, mut group) in by_y {
        let y = group[0].y;
        match lines.last_mut() {
            Some(last) if (last.y - y).abs() < tolerance => last.runs.append(&mut group),
            _ => lines.push(TextLine { y, runs: group }),
        }
    }
    for line in &mut lines {
        line.runs.sort_by(|a, b| a.x.total_cmp(&b.x));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::pdf::tree::page_ids;

    fn run(text: &str, x: f32, y: f32) -> TextRun {
        TextRun { text: text.into(), x, y, font_size: 10.0 }
    }

    #[test]
    fn reads_label_with_position() {
        let doc = fixtures::document(1, "T");
        let runs = page_runs(&doc, page_ids(&doc)[0]).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].text, "T-1");
        assert_eq!((runs[0].x, runs[0].y), (72.0, 700.0));
        assert_eq!(runs[0].font_size, 24.0);
    }

    #[test]
    fn lines_are_ordered_top_down_and_left_right() {
        let lines = group_lines(
            vec![run("b", 200.0, 700.5), run("c", 72.0, 600.0), run("a", 72.0, 700.0)],
            2.0,
        );
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text(), "a b");
        assert_eq!(lines[1].text(), "c");
    }

    #[test]
    fn utf16_strings_decode() {
        assert_eq!(decode_simple(&[0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69]), "Hi");
        assert_eq!(decode_simple(&[0x43, 0x61, 0x66, 0xE9]), "Café");
    }
}
