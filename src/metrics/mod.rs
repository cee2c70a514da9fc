//! Per-account metric aggregation.
//!
//! Each report variant is a [`MetricsAggregator`]: a fixed set of
//! [`MetricQuery`]s plus a pure reduction of their rows into one record.
//! Every time-relative value ("today", "hours since", "last 24 hours") is
//! computed by the database engine, so all accounts in a run are measured
//! against the same instant.
//!
//! ## Variants
//!
//! - [`AudienceFreshnessAggregator`]: audience counts and the latest stale update
//! - [`SyncLagAggregator`]: hours since the newest order and customer
//! - [`ChannelErrorsAggregator`]: failed-delivery error codes per channel

mod audience;
mod channel_errors;
pub mod query;
mod sync_lag;

use async_trait::async_trait;
pub use audience::*;
pub use channel_errors::*;
pub use query::{ColumnKind, MetricQuery, MetricRow, Scalar};
pub use sync_lag::*;

use crate::{
    db::{DbError, MetricsStore, TenantScope},
    models::AccountId,
    report::RecordLayout,
};

/// A report variant: what to query for one account and how to reduce it.
#[async_trait]
pub trait MetricsAggregator: Send + Sync {
    type Record: RecordLayout + Send + Sync;

    /// Short name used on the command line and in logs.
    fn name(&self) -> &'static str;

    /// Title line of the rendered report.
    fn title(&self) -> &'static str;

    /// Chat text to send instead of the table once the rows have been
    /// appended to a spreadsheet at `sheet_url`. `None` sends the table.
    fn sheet_link_message(&self, _sheet_url: &str) -> Option<String> {
        None
    }

    /// Run this variant's queries inside `scope` and reduce them.
    async fn aggregate(
        &self,
        store: &mut dyn MetricsStore,
        scope: &TenantScope,
    ) -> Result<Self::Record, AggregateError>;
}

/// Why one account's aggregation failed.
#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    #[error("account is not present in the roster table")]
    AccountNotFound,

    #[error("tenant scoping failed: {0}")]
    Scope(#[source] DbError),

    #[error("query '{query}' failed: {source}")]
    Query {
        query: &'static str,
        #[source]
        source: DbError,
    },

    #[error("query '{query}' returned a malformed row: {detail}")]
    MalformedRow { query: &'static str, detail: String },
}

impl AggregateError {
    pub fn malformed(query: &'static str, detail: impl Into<String>) -> Self {
        Self::MalformedRow {
            query,
            detail: detail.into(),
        }
    }
}

/// An aggregation failure tagged with the account it belongs to.
#[derive(Debug, thiserror::Error)]
#[error("account {account_id}: {source}")]
pub struct AccountError {
    pub account_id: AccountId,
    #[source]
    pub source: AggregateError,
}

impl AccountError {
    pub fn new(account_id: AccountId, source: AggregateError) -> Self {
        Self { account_id, source }
    }
}

/// Execute `query` for the scoped tenant and check every row against the
/// query's declared columns.
pub async fn fetch_checked(
    store: &mut dyn MetricsStore,
    scope: &TenantScope,
    query: &MetricQuery,
) -> Result<Vec<MetricRow>, AggregateError> {
    let rows = store
        .fetch(scope, query)
        .await
        .map_err(|source| AggregateError::Query {
            query: query.name,
            source,
        })?;

    tracing::debug!(
        account_id = %scope.account_id(),
        query = query.name,
        rows = rows.len(),
        "Metric query complete"
    );

    for row in &rows {
        query.check_row(row)?;
    }
    Ok(rows)
}
