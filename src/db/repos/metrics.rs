use async_trait::async_trait;

use super::TenantScope;
use crate::{
    db::error::DbResult,
    metrics::{MetricQuery, MetricRow},
    models::{Account, AccountId},
};

/// The metric store as seen by the pipeline.
///
/// At most one [`TenantScope`] is open at a time. Every query runs inside
/// the scope passed to it, and the store rejects a scope that is not the
/// active one. Calls are strictly sequential; there is no pool to race.
#[async_trait]
pub trait MetricsStore: Send {
    /// Scope all following queries to `account_id`.
    async fn enter_tenant(&mut self, account_id: AccountId) -> DbResult<TenantScope>;

    /// Resolve the scoped account's display name. `None` if the account
    /// table has no such row.
    async fn lookup_account(&mut self, scope: &TenantScope) -> DbResult<Option<Account>>;

    /// Run `query` with the scoped account id bound as `$1`.
    async fn fetch(&mut self, scope: &TenantScope, query: &MetricQuery)
    -> DbResult<Vec<MetricRow>>;

    /// End `scope` and discard any session state it set, whether or not
    /// the account's queries succeeded.
    async fn leave_tenant(&mut self, scope: TenantScope) -> DbResult<()>;

    /// Release the connection. Later calls fail with `DbError::Closed`;
    /// closing twice is a no-op.
    async fn close(&mut self) -> DbResult<()>;
}
