//! The per-account report run.
//!
//! Accounts are processed strictly in roster order, one at a time:
//!
//! 1. `enter_tenant` scopes the session to the account
//! 2. the account row is looked up inside that scope
//! 3. the variant's queries run and are reduced to a record
//! 4. `leave_tenant` ends the scope, on success and on failure alike
//!
//! With `continue_on_error` a failed account is recorded and skipped.
//! Without it the run stops at the first failure. A scope that cannot be
//! released always stops the run, since no later account could be scoped
//! safely.

mod runner;

pub use runner::*;
use serde::Serialize;
use tracing::Instrument;

use crate::{
    db::{DbError, MetricsStore, TenantScope},
    delivery::{DeliveryResult, Sinks, deliver},
    metrics::{AccountError, AggregateError, MetricsAggregator},
    models::{Account, AccountId},
    report::{RenderedReport, Report, ReportBuilder, sheet_rows},
};

const ACCOUNT_LOOKUP: &str = "account_lookup";

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("run aborted: {0}")]
    Aborted(#[source] AccountError),

    #[error("failed to leave tenant scope for account {account_id}: {source}")]
    ScopeRelease {
        account_id: AccountId,
        #[source]
        source: DbError,
    },
}

/// A run-level account failure, as reported in the summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountFailure {
    pub account_id: AccountId,
    pub error: String,
}

impl From<&AccountError> for AccountFailure {
    fn from(err: &AccountError) -> Self {
        Self {
            account_id: err.account_id,
            error: err.source.to_string(),
        }
    }
}

/// What one report run did.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub rendered: RenderedReport,
    pub accounts_total: usize,
    pub account_failures: Vec<AccountFailure>,
    pub deliveries: Vec<DeliveryResult>,
}

impl RunSummary {
    pub fn report(&self) -> &'static str {
        self.rendered.name
    }

    pub fn rows_rendered(&self) -> usize {
        self.rendered.rows_rendered
    }

    pub fn failed_deliveries(&self) -> usize {
        self.deliveries.iter().filter(|d| !d.success).count()
    }

    /// Every account rendered and every delivery succeeded.
    pub fn is_clean(&self) -> bool {
        self.account_failures.is_empty()
            && self.rendered.failures.is_empty()
            && self.failed_deliveries() == 0
    }
}

/// Collected records plus the accounts that produced none.
pub struct Collected<R> {
    pub report: Report<R>,
    pub failures: Vec<AccountError>,
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    roster: Vec<AccountId>,
    continue_on_error: bool,
    dry_run: bool,
    sinks: Sinks,
}

impl Pipeline {
    pub fn new(roster: Vec<AccountId>, sinks: Sinks) -> Self {
        Self {
            roster,
            continue_on_error: true,
            dry_run: false,
            sinks,
        }
    }

    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    /// Render without delivering.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Collect, render and deliver one report variant.
    pub async fn run<A: MetricsAggregator>(
        &self,
        store: &mut dyn MetricsStore,
        aggregator: &A,
    ) -> Result<RunSummary, PipelineError> {
        tracing::info!(
            report = aggregator.name(),
            accounts = self.roster.len(),
            continue_on_error = self.continue_on_error,
            "Starting report run"
        );

        let Collected { report, failures } = self.collect(store, aggregator).await?;
        let rendered = ReportBuilder::render(&report);
        tracing::info!(
            report = aggregator.name(),
            "Report rendered\n{}",
            rendered.chat_text()
        );

        let deliveries = if self.dry_run {
            tracing::info!(report = aggregator.name(), "Dry run, skipping delivery");
            Vec::new()
        } else {
            let rows = if self.sinks.spreadsheet.is_some() {
                sheet_rows(&report)
            } else {
                Vec::new()
            };
            deliver(&self.sinks, &rendered, &rows, |url| {
                aggregator.sheet_link_message(url)
            })
            .await
        };

        let summary = RunSummary {
            rendered,
            accounts_total: self.roster.len(),
            account_failures: failures.iter().map(AccountFailure::from).collect(),
            deliveries,
        };

        tracing::info!(
            report = summary.report(),
            accounts_total = summary.accounts_total,
            rows_rendered = summary.rows_rendered(),
            account_failures = summary.account_failures.len(),
            render_failures = summary.rendered.failures.len(),
            failed_deliveries = summary.failed_deliveries(),
            "Report run complete"
        );

        Ok(summary)
    }

    /// Run every roster account through `aggregator`, in order.
    pub async fn collect<A: MetricsAggregator>(
        &self,
        store: &mut dyn MetricsStore,
        aggregator: &A,
    ) -> Result<Collected<A::Record>, PipelineError> {
        let mut report = Report::new(aggregator.name(), aggregator.title());
        let mut failures = Vec::new();

        for &account_id in &self.roster {
            let scope = match store.enter_tenant(account_id).await {
                Ok(scope) => scope,
                Err(e) => {
                    let err = AccountError::new(account_id, AggregateError::Scope(e));
                    self.record_failure(aggregator.name(), err, &mut failures)?;
                    continue;
                }
            };

            let span = tracing::info_span!(
                "account",
                report = aggregator.name(),
                account_id = %account_id
            );
            let outcome = aggregate_account(store, aggregator, &scope)
                .instrument(span)
                .await;

            store
                .leave_tenant(scope)
                .await
                .map_err(|source| PipelineError::ScopeRelease { account_id, source })?;

            match outcome {
                Ok((account, record)) => {
                    tracing::debug!(
                        report = aggregator.name(),
                        account_id = %account_id,
                        "Account aggregated"
                    );
                    report.push(account, record);
                }
                Err(e) => {
                    let err = AccountError::new(account_id, e);
                    self.record_failure(aggregator.name(), err, &mut failures)?;
                }
            }
        }

        Ok(Collected { report, failures })
    }

    fn record_failure(
        &self,
        report: &str,
        err: AccountError,
        failures: &mut Vec<AccountError>,
    ) -> Result<(), PipelineError> {
        if !self.continue_on_error {
            tracing::error!(report, error = %err, "Account failed, aborting run");
            return Err(PipelineError::Aborted(err));
        }
        tracing::warn!(report, error = %err, "Account failed, skipping");
        failures.push(err);
        Ok(())
    }
}

async fn aggregate_account<A: MetricsAggregator>(
    store: &mut dyn MetricsStore,
    aggregator: &A,
    scope: &TenantScope,
) -> Result<(Account, A::Record), AggregateError> {
    let account = store
        .lookup_account(scope)
        .await
        .map_err(|source| AggregateError::Query {
            query: ACCOUNT_LOOKUP,
            source,
        })?
        .ok_or(AggregateError::AccountNotFound)?;

    let record = aggregator.aggregate(store, scope).await?;
    Ok((account, record))
}
