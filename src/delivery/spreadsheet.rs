use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use url::Url;

use super::{DeliveryError, SheetAppender};
use crate::config::SpreadsheetSinkConfig;

#[cfg(feature = "gcp-auth")]
const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Source of the `Authorization` header value for the Sheets API.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// A ready header value, `Bearer` prefix included.
    async fn authorization(&self) -> Result<String, DeliveryError>;
}

/// A pre-issued access token.
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn authorization(&self) -> Result<String, DeliveryError> {
        Ok(bearer(&self.0))
    }
}

/// Mints tokens from a service-account key file.
#[cfg(feature = "gcp-auth")]
pub struct ServiceAccountTokens {
    key_path: String,
}

#[cfg(feature = "gcp-auth")]
impl ServiceAccountTokens {
    pub fn new(key_path: impl Into<String>) -> Self {
        Self {
            key_path: key_path.into(),
        }
    }
}

#[cfg(feature = "gcp-auth")]
#[async_trait]
impl TokenProvider for ServiceAccountTokens {
    async fn authorization(&self) -> Result<String, DeliveryError> {
        use google_cloud_auth::credentials::CredentialsFile;
        use google_cloud_token::TokenSourceProvider;

        let key_json = tokio::fs::read_to_string(&self.key_path)
            .await
            .map_err(|e| {
                DeliveryError::Auth(format!(
                    "Failed to read service account key file '{}': {}",
                    self.key_path, e
                ))
            })?;

        let creds: CredentialsFile = serde_json::from_str(&key_json).map_err(|e| {
            DeliveryError::Auth(format!("Failed to parse service account JSON: {}", e))
        })?;

        let config = google_cloud_auth::project::Config::default().with_scopes(&[SHEETS_SCOPE]);

        let ts = google_cloud_auth::token::DefaultTokenSourceProvider::new_with_credentials(
            config,
            Box::new(creds),
        )
        .await
        .map_err(|e| {
            DeliveryError::Auth(format!(
                "Failed to create token source from service account: {}",
                e
            ))
        })?;

        let token = ts
            .token_source()
            .token()
            .await
            .map_err(|e| DeliveryError::Auth(format!("Failed to get token: {}", e)))?;
        Ok(bearer(&token))
    }
}

/// Prefix `token` with `Bearer ` unless it already carries it.
pub fn bearer(token: &str) -> String {
    let token = token.trim();
    if token.starts_with("Bearer ") {
        token.to_string()
    } else {
        format!("Bearer {token}")
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AppendRequest<'a> {
    range: &'a str,
    major_dimension: &'static str,
    values: &'a [Vec<String>],
}

/// Google Sheets `spreadsheets.values.append` sink.
pub struct SpreadsheetSink {
    client: reqwest::Client,
    append_url: Url,
    range: String,
    sheet_url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl std::fmt::Debug for SpreadsheetSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpreadsheetSink")
            .field("append_url", &self.append_url.as_str())
            .field("sheet_url", &self.sheet_url)
            .finish()
    }
}

impl SpreadsheetSink {
    /// Build the sink with the token source the config names.
    pub async fn from_config(config: &SpreadsheetSinkConfig) -> Result<Self, DeliveryError> {
        let tokens: Arc<dyn TokenProvider> = match (&config.access_token, &config.credentials_file)
        {
            (Some(token), _) => Arc::new(StaticToken::new(token.clone())),
            #[cfg(feature = "gcp-auth")]
            (None, Some(path)) => Arc::new(ServiceAccountTokens::new(path.clone())),
            _ => {
                return Err(DeliveryError::Auth(
                    "spreadsheet sink has no usable credentials".into(),
                ));
            }
        };
        Self::new(config, tokens)
    }

    pub fn new(
        config: &SpreadsheetSinkConfig,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self, DeliveryError> {
        let range = format!("{}!A1", config.sheet);
        let append_segment = format!("{range}:append");

        let mut append_url = Url::parse(&config.api_base_url)
            .map_err(|e| DeliveryError::InvalidUrl(format!("{}: {e}", config.api_base_url)))?;
        append_url
            .path_segments_mut()
            .map_err(|()| DeliveryError::InvalidUrl(config.api_base_url.clone()))?
            .pop_if_empty()
            .extend([
                "v4",
                "spreadsheets",
                config.spreadsheet_id.as_str(),
                "values",
                append_segment.as_str(),
            ]);
        append_url
            .query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            append_url,
            range,
            sheet_url: config.sheet_url(),
            tokens,
        })
    }
}

#[async_trait]
impl SheetAppender for SpreadsheetSink {
    async fn append_rows(&self, rows: &[Vec<String>]) -> Result<String, DeliveryError> {
        let authorization = self.tokens.authorization().await?;
        let body = AppendRequest {
            range: &self.range,
            major_dimension: "ROWS",
            values: rows,
        };

        let response = self
            .client
            .post(self.append_url.clone())
            .header(reqwest::header::AUTHORIZATION, authorization)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected {
                sink: self.name(),
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(rows = rows.len(), range = %self.range, "Spreadsheet rows appended");
        Ok(self.sheet_url.clone())
    }
}

#[cfg(test)]
mod tests {
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_json, header, method, path, query_param},
    };

    use super::*;

    fn config(server: &MockServer) -> SpreadsheetSinkConfig {
        SpreadsheetSinkConfig {
            spreadsheet_id: "1AbC".into(),
            sheet: "Errors".into(),
            credentials_file: None,
            access_token: Some("ya29.token".into()),
            api_base_url: server.uri(),
            public_url: None,
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_bearer_prefix() {
        assert_eq!(bearer("abc"), "Bearer abc");
        assert_eq!(bearer("Bearer abc"), "Bearer abc");
        assert_eq!(bearer("  abc\n"), "Bearer abc");
    }

    #[tokio::test]
    async fn test_append_rows_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v4/spreadsheets/1AbC/values/Errors!A1:append"))
            .and(query_param("valueInputOption", "RAW"))
            .and(query_param("insertDataOption", "INSERT_ROWS"))
            .and(header("authorization", "Bearer ya29.token"))
            .and(body_json(serde_json::json!({
                "range": "Errors!A1",
                "majorDimension": "ROWS",
                "values": [["Title"], ["Account ID: 1", "Display Name: Acme"]],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "spreadsheetId": "1AbC",
                "updates": {"updatedRows": 2},
            })))
            .expect(1)
            .mount(&server)
            .await;

        let sink = SpreadsheetSink::from_config(&config(&server)).await.unwrap();
        let rows = vec![
            vec!["Title".to_string()],
            vec!["Account ID: 1".to_string(), "Display Name: Acme".to_string()],
        ];
        let url = sink.append_rows(&rows).await.unwrap();
        assert_eq!(url, "https://docs.google.com/spreadsheets/d/1AbC");
    }

    #[tokio::test]
    async fn test_public_url_is_returned() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let mut cfg = config(&server);
        cfg.public_url = Some("https://sheets.example.com/errors".into());
        let sink = SpreadsheetSink::from_config(&cfg).await.unwrap();
        assert_eq!(
            sink.append_rows(&[]).await.unwrap(),
            "https://sheets.example.com/errors"
        );
    }

    #[tokio::test]
    async fn test_rejected_append_carries_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("PERMISSION_DENIED"))
            .expect(1)
            .mount(&server)
            .await;

        let sink = SpreadsheetSink::from_config(&config(&server)).await.unwrap();
        let err = sink.append_rows(&[]).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Rejected { status: 403, .. }));
        assert!(err.to_string().contains("PERMISSION_DENIED"), "got: {err}");
    }

    #[tokio::test]
    async fn test_sheet_name_is_escaped() {
        let server = MockServer::start().await;
        let mut cfg = config(&server);
        cfg.sheet = "Daily Errors".into();
        let sink = SpreadsheetSink::new(&cfg, Arc::new(StaticToken::new("t"))).unwrap();
        assert!(
            sink.append_url
                .path()
                .ends_with("/values/Daily%20Errors!A1:append"),
            "got: {}",
            sink.append_url
        );
    }

    #[cfg(feature = "gcp-auth")]
    #[tokio::test]
    async fn test_missing_key_file_is_auth_error() {
        let tokens = ServiceAccountTokens::new("/nonexistent/service-account.json");
        let err = tokens.authorization().await.unwrap_err();
        assert!(matches!(err, DeliveryError::Auth(_)));
    }
}
