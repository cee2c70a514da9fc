use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Serialize;

use super::{
    AggregateError, ColumnKind, MetricQuery, MetricRow, MetricsAggregator, fetch_checked,
};
use crate::{
    db::{MetricsStore, TenantScope},
    report::{Cell, ColumnSpec, Layout, RecordBody, RecordLayout},
};

/// Live audiences of the scoped account, split by whether they were
/// refreshed since the database's current date began.
///
/// Soft-deleted, in-use and real-time (`rt_coll*`, `rt_prod*`) audiences are
/// excluded from all counts.
pub const AUDIENCE_FRESHNESS: MetricQuery = MetricQuery {
    name: "audience_freshness",
    sql: r#"
        SELECT
            COUNT(*)::bigint AS total,
            (COUNT(*) FILTER (WHERE updated_at >= CURRENT_DATE))::bigint AS updated_today,
            (COUNT(*) FILTER (WHERE updated_at < CURRENT_DATE))::bigint AS not_updated_today,
            (MAX(updated_at) FILTER (WHERE updated_at < CURRENT_DATE))::timestamp AS latest_not_updated_at
        FROM pf.audiences
        WHERE account_id = $1
          AND deleted_at IS NULL
          AND is_used = 'false'
          AND slug NOT LIKE 'rt_coll%'
          AND slug NOT LIKE 'rt_prod%'
    "#,
    columns: &[
        ColumnKind::Int,
        ColumnKind::Int,
        ColumnKind::Int,
        ColumnKind::Timestamp,
    ],
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AudienceFreshness {
    pub total: i64,
    pub updated_today: i64,
    pub not_updated_today: i64,
    /// Most recent update among the audiences not refreshed today.
    pub latest_not_updated_at: Option<NaiveDateTime>,
}

impl AudienceFreshness {
    /// Reduce the rows of [`AUDIENCE_FRESHNESS`]. No row, or null counts,
    /// mean zero.
    pub fn from_rows(rows: &[MetricRow]) -> Result<Self, AggregateError> {
        let Some(row) = rows.first() else {
            return Ok(Self::default());
        };
        let q = &AUDIENCE_FRESHNESS;
        Ok(Self {
            total: row.int(q, 0)?.unwrap_or(0),
            updated_today: row.int(q, 1)?.unwrap_or(0),
            not_updated_today: row.int(q, 2)?.unwrap_or(0),
            latest_not_updated_at: row.timestamp(q, 3)?,
        })
    }
}

impl RecordLayout for AudienceFreshness {
    const LAYOUT: Layout = Layout::Flat;

    fn columns() -> &'static [ColumnSpec] {
        const COLUMNS: &[ColumnSpec] = &[
            ColumnSpec::new("Total Audiences", 16),
            ColumnSpec::new("Updated Today", 13),
            ColumnSpec::new("Not Updated Today", 17),
            ColumnSpec::new("Latest Updated At", 19),
        ];
        COLUMNS
    }

    fn body(&self) -> RecordBody {
        RecordBody::Row(vec![
            Cell::Int(self.total),
            Cell::Int(self.updated_today),
            Cell::Int(self.not_updated_today),
            Cell::timestamp(self.latest_not_updated_at),
        ])
    }
}

pub struct AudienceFreshnessAggregator;

#[async_trait]
impl MetricsAggregator for AudienceFreshnessAggregator {
    type Record = AudienceFreshness;

    fn name(&self) -> &'static str {
        "audience"
    }

    fn title(&self) -> &'static str {
        "📊 Daily Audience Update Summary"
    }

    async fn aggregate(
        &self,
        store: &mut dyn MetricsStore,
        scope: &TenantScope,
    ) -> Result<AudienceFreshness, AggregateError> {
        let rows = fetch_checked(store, scope, &AUDIENCE_FRESHNESS).await?;
        AudienceFreshness::from_rows(&rows)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::{
        metrics::Scalar,
        models::Account,
        report::{Report, ReportBuilder},
    };

    fn new_year() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn row(total: i64, today: i64, stale: i64, latest: Option<NaiveDateTime>) -> MetricRow {
        MetricRow::new(vec![
            Scalar::Int(Some(total)),
            Scalar::Int(Some(today)),
            Scalar::Int(Some(stale)),
            Scalar::Timestamp(latest),
        ])
    }

    #[test]
    fn test_no_matching_audiences() {
        let record = AudienceFreshness::from_rows(&[row(0, 0, 0, None)]).unwrap();
        assert_eq!(record, AudienceFreshness::default());

        let record = AudienceFreshness::from_rows(&[]).unwrap();
        assert_eq!(record.total, 0);
        assert_eq!(record.latest_not_updated_at, None);
    }

    #[test]
    fn test_null_counts_are_zero() {
        let rows = [MetricRow::new(vec![
            Scalar::Int(None),
            Scalar::Int(None),
            Scalar::Int(None),
            Scalar::Timestamp(None),
        ])];
        assert_eq!(
            AudienceFreshness::from_rows(&rows).unwrap(),
            AudienceFreshness::default()
        );
    }

    #[test]
    fn test_wrong_column_kind_is_malformed() {
        let rows = [MetricRow::new(vec![Scalar::Text(Some("10".into()))])];
        assert!(matches!(
            AudienceFreshness::from_rows(&rows),
            Err(AggregateError::MalformedRow { .. })
        ));
    }

    #[test]
    fn test_rendered_row() {
        let record = AudienceFreshness::from_rows(&[row(10, 3, 7, Some(new_year()))]).unwrap();
        let mut report = Report::new("audience", "Audience");
        report.push(Account::new(123, "Acme"), record);

        let rendered = ReportBuilder::render(&report);
        let line = rendered.body.lines().nth(2).unwrap();
        assert_eq!(
            line,
            "| Acme                 | 123                 | 10               | 3             | 7                 | 2024-01-01 00:00:00 |"
        );
    }

    #[test]
    fn test_missing_latest_renders_not_available() {
        let record = AudienceFreshness::from_rows(&[row(3, 3, 0, None)]).unwrap();
        let mut report = Report::new("audience", "Audience");
        report.push(Account::new(1, "Fresh"), record);

        let rendered = ReportBuilder::render(&report);
        assert!(rendered.body.lines().nth(2).unwrap().contains("| N/A"));
    }
}
