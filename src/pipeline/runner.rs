//! Run one or more report variants on a single store, then close it.

use super::{Pipeline, RunSummary};
use crate::{
    db::MetricsStore,
    metrics::{
        AudienceFreshnessAggregator, ChannelErrorsAggregator, MetricsAggregator,
        SyncLagAggregator,
    },
};

/// A report variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Audience,
    SyncLag,
    ChannelErrors,
}

impl ReportKind {
    pub const ALL: [ReportKind; 3] = [
        ReportKind::Audience,
        ReportKind::SyncLag,
        ReportKind::ChannelErrors,
    ];
}

/// Process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every account rendered and every delivery succeeded.
    Clean = 0,
    /// Config or connection failure, or an aborted run.
    Failed = 1,
    /// The run finished but some accounts or deliveries failed.
    Partial = 2,
}

impl Outcome {
    fn severity(self) -> u8 {
        match self {
            Outcome::Clean => 0,
            Outcome::Partial => 1,
            Outcome::Failed => 2,
        }
    }

    pub fn worst(self, other: Outcome) -> Outcome {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }

    pub fn exit_code(self) -> i32 {
        self as i32
    }
}

/// Everything a sequence of report runs produced.
#[derive(Debug)]
pub struct Execution {
    pub outcome: Outcome,
    /// Summaries of the reports that completed, in run order.
    pub summaries: Vec<RunSummary>,
}

/// Run `reports` in order on `store` and close the store afterwards.
///
/// A report that fails outright stops the sequence. The store is closed on
/// every path, including an aborted run and a failed scope release.
pub async fn execute(
    pipeline: &Pipeline,
    store: &mut dyn MetricsStore,
    reports: &[ReportKind],
) -> Execution {
    let mut outcome = Outcome::Clean;
    let mut summaries = Vec::new();

    for &kind in reports {
        let result = match kind {
            ReportKind::Audience => run_one(pipeline, store, &AudienceFreshnessAggregator).await,
            ReportKind::SyncLag => run_one(pipeline, store, &SyncLagAggregator).await,
            ReportKind::ChannelErrors => run_one(pipeline, store, &ChannelErrorsAggregator).await,
        };
        match result {
            Some(summary) => {
                if !summary.is_clean() {
                    outcome = outcome.worst(Outcome::Partial);
                }
                summaries.push(summary);
            }
            None => {
                outcome = Outcome::Failed;
                break;
            }
        }
    }

    if let Err(e) = store.close().await {
        tracing::warn!(error = %e, "Failed to close metric store cleanly");
    }

    Execution { outcome, summaries }
}

async fn run_one<A: MetricsAggregator>(
    pipeline: &Pipeline,
    store: &mut dyn MetricsStore,
    aggregator: &A,
) -> Option<RunSummary> {
    match pipeline.run(store, aggregator).await {
        Ok(summary) => Some(summary),
        Err(e) => {
            tracing::error!(report = aggregator.name(), error = %e, "Report run failed");
            None
        }
    }
}
