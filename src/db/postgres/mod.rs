use std::str::FromStr;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::{
    PgConnection, PgPool, Postgres, Row, Transaction,
    postgres::{PgConnectOptions, PgPoolOptions, PgRow},
};

use crate::{
    config::DatabaseConfig,
    db::{
        error::{DbError, DbResult},
        repos::{MetricsStore, ScopeTracker, TenantScope},
    },
    metrics::{ColumnKind, MetricQuery, MetricRow, Scalar},
    models::{Account, AccountId},
};

const BEGIN_SCOPE: &str = "SAVEPOINT tenant_scope";
/// Rolling back the savepoint also reverts whatever `set_account` set.
const ROLLBACK_SCOPE: &str = "ROLLBACK TO SAVEPOINT tenant_scope";
const RELEASE_SCOPE: &str = "RELEASE SAVEPOINT tenant_scope";

pub struct PostgresMetricsStore {
    pool: PgPool,
    tx: Option<Transaction<'static, Postgres>>,
    scopes: ScopeTracker,
}

impl PostgresMetricsStore {
    /// Connect and open the run's read-only transaction. Every account is
    /// then measured against the same transaction start time.
    pub async fn connect(config: &DatabaseConfig) -> DbResult<Self> {
        let mut options = PgConnectOptions::from_str(&config.url)?.ssl_mode(config.ssl_mode.into());
        if let Some(secs) = config.statement_timeout_secs {
            options = options.options([("statement_timeout", secs.saturating_mul(1000))]);
        }

        let pool = PgPoolOptions::new()
            .min_connections(0)
            .max_connections(1)
            .acquire_timeout(config.connect_timeout())
            .connect_with(options)
            .await?;

        let mut tx = pool.begin().await?;
        sqlx::query("SET TRANSACTION READ ONLY")
            .execute(&mut *tx)
            .await?;

        Ok(Self {
            pool,
            tx: Some(tx),
            scopes: ScopeTracker::default(),
        })
    }

    fn conn(&mut self) -> DbResult<&mut PgConnection> {
        match self.tx.as_mut() {
            Some(tx) => Ok(&mut **tx),
            None => Err(DbError::Closed),
        }
    }

    async fn begin_scope(&mut self, account_id: AccountId) -> DbResult<()> {
        let conn = self.conn()?;
        sqlx::query(BEGIN_SCOPE).execute(&mut *conn).await?;

        let scoped = sqlx::query("SELECT set_account($1)")
            .bind(account_id.get())
            .execute(&mut *conn)
            .await;
        if let Err(e) = scoped {
            // Leave the transaction usable for the next account.
            if let Err(cleanup) = end_scope(conn).await {
                tracing::warn!(
                    account_id = %account_id,
                    error = %cleanup,
                    "Failed to discard tenant savepoint"
                );
            }
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait]
impl MetricsStore for PostgresMetricsStore {
    async fn enter_tenant(&mut self, account_id: AccountId) -> DbResult<TenantScope> {
        self.conn()?;
        let scope = self.scopes.open(account_id)?;
        if let Err(e) = self.begin_scope(account_id).await {
            self.scopes.abandon();
            return Err(e);
        }
        tracing::debug!(account_id = %account_id, "Entered tenant scope");
        Ok(scope)
    }

    async fn lookup_account(&mut self, scope: &TenantScope) -> DbResult<Option<Account>> {
        self.scopes.check(scope)?;
        let rows = sqlx::query(
            r#"
            SELECT id::bigint AS id, COALESCE(display_name, '') AS display_name
            FROM pf.account
            WHERE id = $1
            "#,
        )
        .bind(scope.account_id().get())
        .fetch_all(self.conn()?)
        .await?;

        let accounts = rows
            .iter()
            .map(|row| -> DbResult<Account> {
                Ok(Account::new(
                    row.try_get::<i64, _>("id")?,
                    row.try_get::<String, _>("display_name")?,
                ))
            })
            .collect::<DbResult<Vec<_>>>()?;
        single_account(scope.account_id(), accounts)
    }

    async fn fetch(
        &mut self,
        scope: &TenantScope,
        query: &MetricQuery,
    ) -> DbResult<Vec<MetricRow>> {
        self.scopes.check(scope)?;
        let rows = sqlx::query(query.sql)
            .bind(scope.account_id().get())
            .fetch_all(self.conn()?)
            .await?;

        rows.iter().map(|row| decode_row(query, row)).collect()
    }

    async fn leave_tenant(&mut self, scope: TenantScope) -> DbResult<()> {
        let account_id = scope.account_id();
        self.scopes.close(scope)?;
        end_scope(self.conn()?).await?;
        tracing::debug!(account_id = %account_id, "Left tenant scope");
        Ok(())
    }

    async fn close(&mut self) -> DbResult<()> {
        let Some(tx) = self.tx.take() else {
            return Ok(());
        };
        let result = tx.rollback().await;
        self.pool.close().await;
        tracing::debug!("Metric store closed");
        result.map_err(DbError::from)
    }
}

async fn end_scope(conn: &mut PgConnection) -> Result<(), sqlx::Error> {
    sqlx::query(ROLLBACK_SCOPE).execute(&mut *conn).await?;
    sqlx::query(RELEASE_SCOPE).execute(&mut *conn).await?;
    Ok(())
}

/// An account id must resolve to at most one roster row.
fn single_account(account_id: AccountId, mut accounts: Vec<Account>) -> DbResult<Option<Account>> {
    match accounts.len() {
        0 | 1 => Ok(accounts.pop()),
        rows => Err(DbError::AmbiguousAccount { account_id, rows }),
    }
}

/// Decode by the kinds the query declares, in select-list order.
fn decode_row(query: &MetricQuery, row: &PgRow) -> DbResult<MetricRow> {
    query
        .columns
        .iter()
        .enumerate()
        .map(|(idx, kind)| -> DbResult<Scalar> {
            Ok(match kind {
                ColumnKind::Int => Scalar::Int(row.try_get::<Option<i64>, _>(idx)?),
                ColumnKind::Text => Scalar::Text(row.try_get::<Option<String>, _>(idx)?),
                ColumnKind::Timestamp => {
                    Scalar::Timestamp(row.try_get::<Option<NaiveDateTime>, _>(idx)?)
                }
            })
        })
        .collect::<DbResult<Vec<Scalar>>>()
        .map(MetricRow::new)
}
