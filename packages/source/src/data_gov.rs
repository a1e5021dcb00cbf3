//! data.gov.in resource API client.
//!
//! The daily mandi price dataset is exposed as a paginated resource:
//!
//! ```text
//! GET {base_url}/{resource_id}?api-key=..&offset=..&limit=..&format=json
//!     &filters[arrival_date]=DD/MM/YYYY
//! ```
//!
//! The JSON body wraps the page in a `records` array alongside metadata
//! (`total`, `count`, ...), which is ignored.

use std::time::Duration;

use async_trait::async_trait;
use mandi_sync_source_models::{PartitionKey, RawRecord};

use crate::retry::{self, StatusClass};
use crate::{FetchError, RemoteReader, SourceError};

/// Default base URL of the data.gov.in resource API.
pub const DEFAULT_BASE_URL: &str = "https://api.data.gov.in/resource";

/// Resource ID of the "current daily price of various commodities from
/// various markets" dataset.
pub const DEFAULT_RESOURCE_ID: &str = "9ef84268-d588-465a-a308-a864a43d0070";

/// Connection settings for [`DataGovClient`].
#[derive(Debug, Clone)]
pub struct DataGovConfig {
    /// Base URL of the resource API, without a trailing slash.
    pub base_url: String,
    /// Dataset resource ID.
    pub resource_id: String,
    /// API key sent as the `api-key` query parameter.
    pub api_key: String,
    /// Maximum time to establish a connection.
    pub connect_timeout: Duration,
    /// Maximum time to wait between reads of the response.
    pub read_timeout: Duration,
}

/// Reads mandi price pages from data.gov.in.
#[derive(Debug, Clone)]
pub struct DataGovClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl DataGovClient {
    /// Builds a client with the configured timeouts and JSON headers.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the underlying HTTP client cannot be
    /// constructed (e.g. the TLS backend fails to initialize).
    pub fn new(config: &DataGovConfig) -> Result<Self, SourceError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .user_agent(concat!("mandi-sync/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/{}",
                config.base_url.trim_end_matches('/'),
                config.resource_id
            ),
            api_key: config.api_key.clone(),
        })
    }

    /// Returns the resource endpoint this client reads from.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RemoteReader for DataGovClient {
    async fn fetch(
        &self,
        partition: PartitionKey,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<RawRecord>, FetchError> {
        let offset = offset.to_string();
        let limit = limit.to_string();
        let filter = partition.api_filter();

        log::debug!("Fetching {partition} offset={offset} limit={limit}");

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("api-key", self.api_key.as_str()),
                ("offset", offset.as_str()),
                ("limit", limit.as_str()),
                ("format", "json"),
                ("filters[arrival_date]", filter.as_str()),
            ])
            .send()
            .await
            .map_err(retry::transport_error)?;

        let status = response.status();
        match retry::classify_status(status) {
            StatusClass::Fatal => {
                return Err(FetchError::Fatal {
                    status: status.as_u16(),
                    message: format!("non-retryable response from data.gov.in ({status})"),
                });
            }
            StatusClass::Transient => {
                let text = response.text().await.unwrap_or_default();
                return Err(FetchError::Transient {
                    message: format!("HTTP {status} from data.gov.in"),
                    preview: Some(retry::body_preview(&text)),
                });
            }
            StatusClass::Proceed => {}
        }

        let text = response.text().await.map_err(retry::transport_error)?;
        parse_records(&text)
    }
}

/// Extracts the `records` array from a response body.
///
/// A missing or `null` `records` field is an empty page.
///
/// # Errors
///
/// Returns [`FetchError::Transient`] (with a body preview) if the body is
/// not JSON, is not an object, or `records` is not an array of objects.
pub fn parse_records(text: &str) -> Result<Vec<RawRecord>, FetchError> {
    let malformed = |message: String| FetchError::Transient {
        message,
        preview: Some(retry::body_preview(text)),
    };

    let body: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| malformed(format!("invalid JSON from data.gov.in: {e}")))?;

    let serde_json::Value::Object(mut body) = body else {
        return Err(malformed("response body is not a JSON object".to_string()));
    };

    match body.remove("records") {
        None | Some(serde_json::Value::Null) => Ok(Vec::new()),
        Some(serde_json::Value::Array(items)) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                serde_json::Value::Object(record) => Ok(record),
                _ => Err(malformed(format!("record {i} is not a JSON object"))),
            })
            .collect(),
        Some(_) => Err(malformed("`records` is not an array".to_string())),
    }
}
