//! Report delivery sinks.
//!
//! A rendered report goes to at most two destinations, each optional:
//!
//! - **Spreadsheet**: structured rows appended to a sheet in one batch
//! - **Chat**: a message in a chat channel, either the table itself or a
//!   link to the spreadsheet
//!
//! Each sink gets exactly one attempt per run. A failed delivery is
//! reported in the run summary and never undoes the other sink's result.
//!
//! ## Configuration
//!
//! ```toml
//! [chat]
//! webhook_url = "https://slack.com/api/chat.postMessage"
//! token = "${SLACK_BOT_TOKEN}"
//! channel = "C0123456789"
//!
//! [spreadsheet]
//! spreadsheet_id = "1AbCdEf"
//! sheet = "Errors"
//! credentials_file = "/etc/reports/service-account.json"
//! ```

mod chat;
mod spreadsheet;

use std::sync::Arc;

use async_trait::async_trait;
pub use chat::*;
use serde::Serialize;
pub use spreadsheet::*;

use crate::{config::ReportsConfig, report::RenderedReport};

/// Posts a text message to a chat channel.
#[async_trait]
pub trait ChatNotifier: Send + Sync {
    async fn post_message(&self, text: &str) -> Result<(), DeliveryError>;

    /// Sink name for logs and the run summary.
    fn name(&self) -> &'static str {
        "chat"
    }
}

/// Appends rows to a spreadsheet.
#[async_trait]
pub trait SheetAppender: Send + Sync {
    /// Append `rows` in one batch and return the spreadsheet's address.
    async fn append_rows(&self, rows: &[Vec<String>]) -> Result<String, DeliveryError>;

    fn name(&self) -> &'static str {
        "spreadsheet"
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{sink} rejected the request (HTTP {status}): {body}")]
    Rejected {
        sink: &'static str,
        status: u16,
        body: String,
    },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Invalid sink URL: {0}")]
    InvalidUrl(String),
}

/// Outcome of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryResult {
    pub sink: &'static str,
    pub success: bool,
    /// Sheet address on success, error text (including any response body)
    /// on failure.
    pub detail: Option<String>,
}

impl DeliveryResult {
    fn delivered(sink: &'static str, detail: Option<String>) -> Self {
        Self {
            sink,
            success: true,
            detail,
        }
    }

    fn failed(sink: &'static str, error: &DeliveryError) -> Self {
        Self {
            sink,
            success: false,
            detail: Some(error.to_string()),
        }
    }
}

/// The configured sinks. Either may be absent.
#[derive(Clone, Default)]
pub struct Sinks {
    pub chat: Option<Arc<dyn ChatNotifier>>,
    pub spreadsheet: Option<Arc<dyn SheetAppender>>,
}

impl Sinks {
    pub async fn from_config(config: &ReportsConfig) -> Result<Self, DeliveryError> {
        let chat = match &config.chat {
            Some(cfg) => Some(Arc::new(ChatSink::new(cfg)?) as Arc<dyn ChatNotifier>),
            None => None,
        };
        let spreadsheet = match &config.spreadsheet {
            Some(cfg) => {
                Some(Arc::new(SpreadsheetSink::from_config(cfg).await?) as Arc<dyn SheetAppender>)
            }
            None => None,
        };
        Ok(Self { chat, spreadsheet })
    }
}

impl std::fmt::Debug for Sinks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sinks")
            .field("chat", &self.chat.as_ref().map(|s| s.name()))
            .field("spreadsheet", &self.spreadsheet.as_ref().map(|s| s.name()))
            .finish()
    }
}

/// Deliver one rendered report.
///
/// The spreadsheet goes first so its address can be used in the chat
/// message: when `link_message` returns text for the address, that text is
/// posted instead of the table. If the spreadsheet append fails, chat falls
/// back to the table.
pub async fn deliver(
    sinks: &Sinks,
    rendered: &RenderedReport,
    sheet_rows: &[Vec<String>],
    link_message: impl Fn(&str) -> Option<String>,
) -> Vec<DeliveryResult> {
    let mut results = Vec::new();
    let mut chat_text = None;

    if let Some(sheet) = &sinks.spreadsheet {
        match sheet.append_rows(sheet_rows).await {
            Ok(url) => {
                tracing::info!(
                    report = rendered.name,
                    sink = sheet.name(),
                    rows = sheet_rows.len(),
                    url = %url,
                    "Report rows appended"
                );
                chat_text = link_message(&url);
                results.push(DeliveryResult::delivered(sheet.name(), Some(url)));
            }
            Err(e) => {
                tracing::warn!(
                    report = rendered.name,
                    sink = sheet.name(),
                    error = %e,
                    "Report delivery failed"
                );
                results.push(DeliveryResult::failed(sheet.name(), &e));
            }
        }
    }

    if let Some(chat) = &sinks.chat {
        let text = chat_text.unwrap_or_else(|| rendered.chat_text());
        match chat.post_message(&text).await {
            Ok(()) => {
                tracing::info!(report = rendered.name, sink = chat.name(), "Report posted");
                results.push(DeliveryResult::delivered(chat.name(), None));
            }
            Err(e) => {
                tracing::warn!(
                    report = rendered.name,
                    sink = chat.name(),
                    error = %e,
                    "Report delivery failed"
                );
                results.push(DeliveryResult::failed(chat.name(), &e));
            }
        }
    }

    results
}
