use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Chat webhook sink (Slack `chat.postMessage` compatible).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChatSinkConfig {
    /// Endpoint the message is POSTed to.
    pub webhook_url: String,

    /// Bearer token sent in the `Authorization` header.
    #[serde(default)]
    pub token: Option<String>,

    /// Target channel identifier.
    pub channel: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ChatSinkConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_http_url("chat.webhook_url", &self.webhook_url)?;
        if self.channel.trim().is_empty() {
            return Err(ConfigError::Validation(
                "chat.channel cannot be empty".into(),
            ));
        }
        if matches!(&self.token, Some(t) if t.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "chat.token is set but empty".into(),
            ));
        }
        validate_timeout("chat.timeout_secs", self.timeout_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Spreadsheet sink (Google Sheets `values:append`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpreadsheetSinkConfig {
    /// Spreadsheet identifier (the `/d/<id>/` segment of the sheet URL).
    pub spreadsheet_id: String,

    /// Tab that rows are appended to.
    #[serde(default = "default_sheet")]
    pub sheet: String,

    /// Service-account key file used to mint access tokens.
    #[serde(default)]
    pub credentials_file: Option<String>,

    /// Pre-issued OAuth access token. Alternative to `credentials_file`.
    #[serde(default)]
    pub access_token: Option<String>,

    /// Sheets API base URL.
    #[serde(default = "default_sheets_api_base_url")]
    pub api_base_url: String,

    /// URL included in the follow-up chat message. Defaults to the
    /// spreadsheet's docs.google.com address.
    #[serde(default)]
    pub public_url: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl SpreadsheetSinkConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.spreadsheet_id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "spreadsheet.spreadsheet_id cannot be empty".into(),
            ));
        }
        if self.sheet.trim().is_empty() {
            return Err(ConfigError::Validation(
                "spreadsheet.sheet cannot be empty".into(),
            ));
        }
        match (&self.credentials_file, &self.access_token) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::Validation(
                    "spreadsheet.credentials_file and spreadsheet.access_token are mutually exclusive"
                        .into(),
                ));
            }
            (None, None) => {
                return Err(ConfigError::Validation(
                    "spreadsheet requires either credentials_file or access_token".into(),
                ));
            }
            _ => {}
        }
        validate_http_url("spreadsheet.api_base_url", &self.api_base_url)?;
        if let Some(public_url) = &self.public_url {
            validate_http_url("spreadsheet.public_url", public_url)?;
        }
        validate_timeout("spreadsheet.timeout_secs", self.timeout_secs)
    }

    /// Address of the spreadsheet for humans.
    pub fn sheet_url(&self) -> String {
        self.public_url.clone().unwrap_or_else(|| {
            format!(
                "https://docs.google.com/spreadsheets/d/{}",
                self.spreadsheet_id
            )
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let parsed = url::Url::parse(value)
        .map_err(|e| ConfigError::Validation(format!("{field} is not a valid URL: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::Validation(format!(
            "{field} must use http or https, got '{}'",
            parsed.scheme()
        )));
    }
    Ok(())
}

fn validate_timeout(field: &str, secs: u64) -> Result<(), ConfigError> {
    if secs == 0 {
        return Err(ConfigError::Validation(format!(
            "{field} must be greater than zero"
        )));
    }
    Ok(())
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_sheet() -> String {
    "Sheet1".to_string()
}

fn default_sheets_api_base_url() -> String {
    "https://sheets.googleapis.com".to_string()
}
