// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stream-mode table detection from text positions.
//
// Lines are split into cells wherever the horizontal gap between runs is
// wider than a character. A table is a block of consecutive lines that all
// split into the same number of cells (at least two).

use falzwerk_core::error::Result;
use tracing::{debug, instrument};

use super::{Table, TableDetector};
use crate::pdf::text::{TextLine, group_lines, page_runs};
use crate::pdf::{DocumentHandle, Page};

#[derive(Debug, Clone, Copy)]
pub struct StreamTableDetector {
    /// Baselines closer than this (points) form one line.
    pub line_tolerance: f32,
    pub min_rows: usize,
    pub min_columns: usize,
}

impl Default for StreamTableDetector {
    fn default() -> Self {
        Self {
            line_tolerance: 3.0,
            min_rows: 2,
            min_columns: 2,
        }
    }
}

impl StreamTableDetector {
    /// Group already-extracted lines into tables.
    pub fn tables_from_lines(&self, lines: &[TextLine]) -> Vec<Table> {
        let rows: Vec<Vec<String>> = lines.iter().map(split_cells).collect();

        let mut tables = Vec::new();
        let mut start = 0;
        while start < rows.len() {
            let width = rows[start].len();
            let mut end = start + 1;
            while end < rows.len() && rows[end].len() == width {
                end += 1;
            }
            if width >= self.min_columns && end - start >= self.min_rows {
                tables.push(Table {
                    rows: rows[start..end].to_vec(),
                });
            }
            start = end;
        }
        tables
    }
}

impl TableDetector for StreamTableDetector {
    fn name(&self) -> &str {
        "text-layout"
    }

    #[instrument(skip(self, handle), fields(page = page.index))]
    fn detect(&self, handle: &DocumentHandle, page: &Page) -> Result<Vec<Table>> {
        let runs = page_runs(handle.document(), page.content_ref)?;
        let lines = group_lines(runs, self.line_tolerance);
        let tables = self.tables_from_lines(&lines);
        debug!(lines = lines.len(), tables = tables.len(), "Tables detected");
        Ok(tables)
    }
}

/// Cell texts of one line. Runs closer than one em are joined.
fn split_cells(line: &TextLine) -> Vec<String> {
    let mut cells: Vec<String> = Vec::new();
    let mut previous_end: Option<(f32, f32)> = None;

    for run in &line.runs {
        let text = run.text.trim();
        let joins = previous_end.is_some_and(|(end, size)| run.x - end < size);
        match cells.last_mut() {
            Some(cell) if joins => {
                cell.push(' ');
                cell.push_str(text);
            }
            _ => cells.push(text.to_owned()),
        }
        previous_end = Some((run.end_x(), run.font_size));
    }
    cells
}
