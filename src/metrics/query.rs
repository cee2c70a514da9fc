//! Parameterized metric queries and the typed rows they return.

use chrono::NaiveDateTime;

use super::AggregateError;

/// Expected SQL type of a result column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// `bigint` (counts, whole hours).
    Int,
    /// `text`.
    Text,
    /// `timestamp` without time zone.
    Timestamp,
}

/// One nullable scalar decoded from a result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scalar {
    Int(Option<i64>),
    Text(Option<String>),
    Timestamp(Option<NaiveDateTime>),
}

impl Scalar {
    pub fn kind(&self) -> ColumnKind {
        match self {
            Scalar::Int(_) => ColumnKind::Int,
            Scalar::Text(_) => ColumnKind::Text,
            Scalar::Timestamp(_) => ColumnKind::Timestamp,
        }
    }
}

/// A read-only query bound to the active tenant.
///
/// The only bind parameter is `$1`, the account id. No other input ever
/// reaches SQL text.
#[derive(Debug, Clone, Copy)]
pub struct MetricQuery {
    /// Stable name used in logs and errors.
    pub name: &'static str,
    pub sql: &'static str,
    /// Result columns in select-list order.
    pub columns: &'static [ColumnKind],
}

impl MetricQuery {
    /// Check that a row has the column count and kinds this query declares.
    pub fn check_row(&self, row: &MetricRow) -> Result<(), AggregateError> {
        if row.len() != self.columns.len() {
            return Err(AggregateError::malformed(
                self.name,
                format!("expected {} columns, got {}", self.columns.len(), row.len()),
            ));
        }
        for (idx, (value, expected)) in row.values().iter().zip(self.columns).enumerate() {
            if value.kind() != *expected {
                return Err(AggregateError::malformed(
                    self.name,
                    format!(
                        "column {idx} expected {expected:?}, got {:?}",
                        value.kind()
                    ),
                ));
            }
        }
        Ok(())
    }
}

/// One result row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetricRow(Vec<Scalar>);

impl MetricRow {
    pub fn new(values: Vec<Scalar>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self) -> &[Scalar] {
        &self.0
    }

    pub fn int(&self, query: &MetricQuery, idx: usize) -> Result<Option<i64>, AggregateError> {
        match self.0.get(idx) {
            Some(Scalar::Int(v)) => Ok(*v),
            other => Err(shape_error(query, idx, ColumnKind::Int, other)),
        }
    }

    pub fn text(&self, query: &MetricQuery, idx: usize) -> Result<Option<&str>, AggregateError> {
        match self.0.get(idx) {
            Some(Scalar::Text(v)) => Ok(v.as_deref()),
            other => Err(shape_error(query, idx, ColumnKind::Text, other)),
        }
    }

    pub fn timestamp(
        &self,
        query: &MetricQuery,
        idx: usize,
    ) -> Result<Option<NaiveDateTime>, AggregateError> {
        match self.0.get(idx) {
            Some(Scalar::Timestamp(v)) => Ok(*v),
            other => Err(shape_error(query, idx, ColumnKind::Timestamp, other)),
        }
    }
}

fn shape_error(
    query: &MetricQuery,
    idx: usize,
    expected: ColumnKind,
    found: Option<&Scalar>,
) -> AggregateError {
    let detail = match found {
        Some(value) => format!("column {idx} expected {expected:?}, got {:?}", value.kind()),
        None => format!("column {idx} missing"),
    };
    AggregateError::malformed(query.name, detail)
}
