use async_trait::async_trait;
use serde::Serialize;

use super::{
    AggregateError, ColumnKind, MetricQuery, MetricRow, MetricsAggregator, fetch_checked,
};
use crate::{
    db::{MetricsStore, TenantScope},
    report::{Cell, ColumnSpec, Layout, RecordBody, RecordLayout, Section},
};

const ERROR_COLUMNS: &[ColumnKind] = &[ColumnKind::Text, ColumnKind::Text, ColumnKind::Int];

/// Failed email deliveries in the last 24 hours, one row per error code
/// with a randomly chosen message and the code's total count.
pub const EMAIL_ERRORS: MetricQuery = MetricQuery {
    name: "email_errors",
    sql: r#"
        SELECT DISTINCT ON (errors->>'code')
            errors->>'code' AS error_code,
            errors->>'message' AS error_message,
            (COUNT(*) OVER (PARTITION BY errors->>'code'))::bigint AS error_count
        FROM pf.email_queue_id_status
        WHERE account_id = $1
          AND status = 'failed'
          AND status_update_at >= now() - INTERVAL '24 hours'
        ORDER BY errors->>'code', RANDOM()
    "#,
    columns: ERROR_COLUMNS,
};

pub const WHATSAPP_ERRORS: MetricQuery = MetricQuery {
    name: "whatsapp_errors",
    sql: r#"
        SELECT DISTINCT ON (errors->>'code')
            errors->>'code' AS error_code,
            errors->>'message' AS error_message,
            (COUNT(*) OVER (PARTITION BY errors->>'code'))::bigint AS error_count
        FROM pf.whatsapp_wamid_status
        WHERE account_id = $1
          AND status = 'failed'
          AND status_update_at >= now() - INTERVAL '24 hours'
          AND errors IS NOT NULL
        ORDER BY errors->>'code', RANDOM()
    "#,
    columns: ERROR_COLUMNS,
};

/// SMS gateways report the message under `error`.
pub const SMS_ERRORS: MetricQuery = MetricQuery {
    name: "sms_errors",
    sql: r#"
        SELECT DISTINCT ON (errors->>'code')
            errors->>'code' AS error_code,
            errors->>'error' AS error_message,
            (COUNT(*) OVER (PARTITION BY errors->>'code'))::bigint AS error_count
        FROM pf.sms_queue_id_status
        WHERE account_id = $1
          AND status = 'failed'
          AND status_update_at >= now() - INTERVAL '24 hours'
        ORDER BY errors->>'code', RANDOM()
    "#,
    columns: ERROR_COLUMNS,
};

/// Delivery channel with its own failure log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Channel {
    Email,
    WhatsApp,
    Sms,
}

impl Channel {
    /// Report order.
    pub const ALL: [Channel; 3] = [Channel::Email, Channel::WhatsApp, Channel::Sms];

    pub fn label(self) -> &'static str {
        match self {
            Channel::Email => "Email",
            Channel::WhatsApp => "WhatsApp",
            Channel::Sms => "SMS",
        }
    }

    pub fn query(self) -> &'static MetricQuery {
        match self {
            Channel::Email => &EMAIL_ERRORS,
            Channel::WhatsApp => &WHATSAPP_ERRORS,
            Channel::Sms => &SMS_ERRORS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorCodeCount {
    pub code: Option<String>,
    pub message: Option<String>,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelBreakdown {
    pub channel: Channel,
    /// Ordered by code. Empty when the channel had no failures.
    pub errors: Vec<ErrorCodeCount>,
}

impl ChannelBreakdown {
    pub fn from_rows(channel: Channel, rows: &[MetricRow]) -> Result<Self, AggregateError> {
        let query = channel.query();
        let errors = rows
            .iter()
            .map(|row| {
                let count = row
                    .int(query, 2)?
                    .ok_or_else(|| AggregateError::malformed(query.name, "null error count"))?;
                Ok(ErrorCodeCount {
                    code: row.text(query, 0)?.map(str::to_string),
                    message: row.text(query, 1)?.map(str::to_string),
                    count,
                })
            })
            .collect::<Result<Vec<_>, AggregateError>>()?;
        Ok(Self { channel, errors })
    }
}

/// Error codes per channel for one account, in [`Channel::ALL`] order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelErrors {
    pub channels: Vec<ChannelBreakdown>,
}

impl ChannelErrors {
    pub fn total(&self) -> i64 {
        self.channels
            .iter()
            .flat_map(|c| &c.errors)
            .map(|e| e.count)
            .sum()
    }
}

impl RecordLayout for ChannelErrors {
    const LAYOUT: Layout = Layout::Nested;

    fn columns() -> &'static [ColumnSpec] {
        const COLUMNS: &[ColumnSpec] = &[
            ColumnSpec::new("Error Code", 10),
            ColumnSpec::new("Error Message", 40),
            ColumnSpec::new("Count", 5),
        ];
        COLUMNS
    }

    fn body(&self) -> RecordBody {
        RecordBody::Sections(
            self.channels
                .iter()
                .map(|breakdown| Section {
                    title: format!("{} Errors", breakdown.channel.label()),
                    rows: breakdown
                        .errors
                        .iter()
                        .map(|e| {
                            vec![
                                Cell::text(e.code.as_deref()),
                                Cell::text(e.message.as_deref()),
                                Cell::Int(e.count),
                            ]
                        })
                        .collect(),
                    empty_note: "no errors",
                    empty_sheet_note: "No errors found.",
                })
                .collect(),
        )
    }
}

pub struct ChannelErrorsAggregator;

#[async_trait]
impl MetricsAggregator for ChannelErrorsAggregator {
    type Record = ChannelErrors;

    fn name(&self) -> &'static str {
        "channel-errors"
    }

    fn title(&self) -> &'static str {
        "🚨 Daily Channel Error Summary (past 24 hours)"
    }

    fn sheet_link_message(&self, sheet_url: &str) -> Option<String> {
        Some(format!(
            "Daily Error Logging sheet updated. Click the below link to review past 24 hours errors:\n{sheet_url}"
        ))
    }

    async fn aggregate(
        &self,
        store: &mut dyn MetricsStore,
        scope: &TenantScope,
    ) -> Result<ChannelErrors, AggregateError> {
        let mut channels = Vec::with_capacity(Channel::ALL.len());
        for channel in Channel::ALL {
            let rows = fetch_checked(store, scope, channel.query()).await?;
            channels.push(ChannelBreakdown::from_rows(channel, &rows)?);
        }
        Ok(ChannelErrors { channels })
    }
}
