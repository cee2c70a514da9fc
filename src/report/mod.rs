//! Report model and rendering.
//!
//! Records stay structured until the final step: [`ReportBuilder`] turns an
//! ordered [`Report`] into one text block, and [`sheet_rows`] turns the same
//! report into spreadsheet rows. Nothing is ever re-parsed from text.

mod builder;
mod sheet;
mod table;

use std::fmt;

pub use builder::*;
use chrono::NaiveDateTime;
pub use sheet::sheet_rows;
pub use table::*;

use crate::models::{Account, AccountId};

/// Rendered in place of any null / not-applicable value.
pub const NOT_AVAILABLE: &str = "N/A";

/// Timestamp format used in every cell.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One value of a record, before it is turned into text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Text(String),
    Int(i64),
    Timestamp(NaiveDateTime),
    /// Whole hours elapsed, rendered as "`n` hours ago".
    HoursAgo(i64),
    /// No qualifying value. Distinct from zero.
    Missing,
}

impl Cell {
    pub fn text(value: Option<&str>) -> Self {
        value.map_or(Cell::Missing, |v| Cell::Text(v.to_string()))
    }

    pub fn timestamp(value: Option<NaiveDateTime>) -> Self {
        value.map_or(Cell::Missing, Cell::Timestamp)
    }

    pub fn hours_ago(value: Option<i64>) -> Self {
        value.map_or(Cell::Missing, Cell::HoursAgo)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) if s.trim().is_empty() => f.write_str(NOT_AVAILABLE),
            Cell::Text(s) => f.write_str(s.trim()),
            Cell::Int(n) => write!(f, "{n}"),
            Cell::Timestamp(ts) => write!(f, "{}", ts.format(TIMESTAMP_FORMAT)),
            Cell::HoursAgo(h) => write!(f, "{h} hours ago"),
            Cell::Missing => f.write_str(NOT_AVAILABLE),
        }
    }
}

/// How a record variant is laid out in the text report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// One table row per account: name, id, then the record's cells.
    Flat,
    /// An account header line followed by one sub-table per section.
    Nested,
}

/// A titled block of rows inside a nested record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: String,
    pub rows: Vec<Vec<Cell>>,
    /// Line written instead of a sub-table when `rows` is empty.
    pub empty_note: &'static str,
    /// Spreadsheet counterpart of `empty_note`.
    pub empty_sheet_note: &'static str,
}

/// The cells of one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordBody {
    Row(Vec<Cell>),
    Sections(Vec<Section>),
}

/// Implemented by every metric record so the builder can lay it out.
pub trait RecordLayout {
    const LAYOUT: Layout;

    /// Flat layout: the columns after account name and id.
    /// Nested layout: the columns of each section's sub-table.
    fn columns() -> &'static [ColumnSpec];

    fn body(&self) -> RecordBody;
}

/// One account's record, in roster position.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow<R> {
    pub account: Account,
    pub record: R,
}

/// Ordered report rows plus the title they are rendered under.
#[derive(Debug, Clone, PartialEq)]
pub struct Report<R> {
    pub name: &'static str,
    pub title: &'static str,
    pub rows: Vec<ReportRow<R>>,
}

impl<R> Report<R> {
    pub fn new(name: &'static str, title: &'static str) -> Self {
        Self {
            name,
            title,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, account: Account, record: R) {
        self.rows.push(ReportRow { account, record });
    }
}

/// A record that could not be laid out.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("row has {found} cells but the table has {expected} columns")]
    ColumnCount { expected: usize, found: usize },

    #[error("record body does not match the {expected:?} layout")]
    LayoutMismatch { expected: Layout },
}

/// A row left out of the rendered report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderFailure {
    pub account_id: AccountId,
    pub error: RenderError,
}

/// The text form of a report, ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedReport {
    pub name: &'static str,
    pub title: String,
    pub body: String,
    pub rows_rendered: usize,
    pub failures: Vec<RenderFailure>,
}

impl RenderedReport {
    /// Title followed by the table inside a fixed-width code block.
    pub fn chat_text(&self) -> String {
        format!("{}\n\n```\n{}```", self.title, self.body)
    }
}
