use async_trait::async_trait;
use serde::Serialize;

use super::{
    AggregateError, ColumnKind, MetricQuery, MetricRow, MetricsAggregator, fetch_checked,
};
use crate::{
    db::{MetricsStore, TenantScope},
    report::{Cell, ColumnSpec, Layout, RecordBody, RecordLayout},
};

/// Whole hours since the newest order, truncated. Null without orders.
pub const LAST_ORDER_LAG: MetricQuery = MetricQuery {
    name: "last_order_lag",
    sql: r#"
        SELECT TRUNC(EXTRACT(EPOCH FROM (now() - MAX(order_date))) / 3600)::bigint
        FROM pf.wh_ecom_order
        WHERE account_id = $1
    "#,
    columns: &[ColumnKind::Int],
};

/// Whole hours since the newest customer was created, truncated.
pub const LAST_CUSTOMER_LAG: MetricQuery = MetricQuery {
    name: "last_customer_lag",
    sql: r#"
        SELECT TRUNC(EXTRACT(EPOCH FROM (now() - MAX(cust_created_at))) / 3600)::bigint
        FROM pf.wh_customer
        WHERE account_id = $1
    "#,
    columns: &[ColumnKind::Int],
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncLag {
    pub hours_since_last_order: Option<i64>,
    pub hours_since_last_customer: Option<i64>,
}

impl SyncLag {
    pub fn from_rows(
        order_rows: &[MetricRow],
        customer_rows: &[MetricRow],
    ) -> Result<Self, AggregateError> {
        Ok(Self {
            hours_since_last_order: single_hours(&LAST_ORDER_LAG, order_rows)?,
            hours_since_last_customer: single_hours(&LAST_CUSTOMER_LAG, customer_rows)?,
        })
    }
}

fn single_hours(query: &MetricQuery, rows: &[MetricRow]) -> Result<Option<i64>, AggregateError> {
    match rows {
        [] => Ok(None),
        [row] => row.int(query, 0),
        _ => Err(AggregateError::malformed(
            query.name,
            format!("expected at most one row, got {}", rows.len()),
        )),
    }
}

impl RecordLayout for SyncLag {
    const LAYOUT: Layout = Layout::Flat;

    fn columns() -> &'static [ColumnSpec] {
        const COLUMNS: &[ColumnSpec] = &[
            ColumnSpec::new("Last Order", 13),
            ColumnSpec::new("Last New Customer", 18),
        ];
        COLUMNS
    }

    fn body(&self) -> RecordBody {
        RecordBody::Row(vec![
            Cell::hours_ago(self.hours_since_last_order),
            Cell::hours_ago(self.hours_since_last_customer),
        ])
    }
}

pub struct SyncLagAggregator;

#[async_trait]
impl MetricsAggregator for SyncLagAggregator {
    type Record = SyncLag;

    fn name(&self) -> &'static str {
        "sync-lag"
    }

    fn title(&self) -> &'static str {
        "📊 Order and Customer Data Latest Sync Report"
    }

    async fn aggregate(
        &self,
        store: &mut dyn MetricsStore,
        scope: &TenantScope,
    ) -> Result<SyncLag, AggregateError> {
        let orders = fetch_checked(store, scope, &LAST_ORDER_LAG).await?;
        let customers = fetch_checked(store, scope, &LAST_CUSTOMER_LAG).await?;
        SyncLag::from_rows(&orders, &customers)
    }
}
