//! Fixed-width text tables.

use super::{Cell, RenderError};

/// Column delimiter and table border.
pub const BORDER: char = '|';

/// Substituted for [`BORDER`] inside cell values.
const BORDER_SUBSTITUTE: char = '/';

/// A left-aligned column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub min_width: usize,
}

impl ColumnSpec {
    pub const fn new(name: &'static str, min_width: usize) -> Self {
        Self { name, min_width }
    }
}

/// Writes header, separator and rows for one set of columns.
#[derive(Debug, Clone)]
pub struct TableWriter {
    columns: Vec<ColumnSpec>,
}

impl TableWriter {
    pub fn new(columns: impl IntoIterator<Item = ColumnSpec>) -> Self {
        Self {
            columns: columns.into_iter().collect(),
        }
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Header row followed by a dashed separator row.
    pub fn write_header(&self, out: &mut String) {
        self.write_line(out, self.columns.iter().map(|c| c.name.to_string()));

        out.push(BORDER);
        for column in &self.columns {
            out.extend(std::iter::repeat_n('-', column.min_width + 2));
            out.push(BORDER);
        }
        out.push('\n');
    }

    pub fn write_row(&self, out: &mut String, cells: &[Cell]) -> Result<(), RenderError> {
        if cells.len() != self.columns.len() {
            return Err(RenderError::ColumnCount {
                expected: self.columns.len(),
                found: cells.len(),
            });
        }
        self.write_line(out, cells.iter().map(|c| sanitize_cell(&c.to_string())));
        Ok(())
    }

    fn write_line(&self, out: &mut String, values: impl Iterator<Item = String>) {
        out.push(BORDER);
        for (column, value) in self.columns.iter().zip(values) {
            out.push_str(&format!(" {:<width$} ", value, width = column.min_width));
            out.push(BORDER);
        }
        out.push('\n');
    }
}

/// Make a value safe to place between borders inside a code block.
///
/// Trims surrounding whitespace, replaces the border character, folds line
/// breaks into spaces and replaces backticks so the value cannot close the
/// enclosing code fence.
pub fn sanitize_cell(value: &str) -> String {
    value
        .trim()
        .chars()
        .map(|c| match c {
            BORDER => BORDER_SUBSTITUTE,
            '\r' | '\n' | '\t' => ' ',
            '`' => '\'',
            other => other,
        })
        .collect()
}
