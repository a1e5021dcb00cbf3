//! Supabase (`PostgREST`) implementation of [`PriceStore`].
//!
//! All operations go through `{url}/rest/v1/{table}`:
//!
//! | Operation | Request |
//! |---|---|
//! | count | `HEAD ?select=id[&arrival_date=eq.D]` + `Prefer: count=exact` |
//! | upsert | `POST ?on_conflict=<identity>` + `Prefer: resolution=merge-duplicates` |
//! | insert | `POST` |
//! | earliest partition | `GET ?select=arrival_date&order=arrival_date.asc&limit=1` |
//! | delete | `DELETE ?arrival_date=eq.D` |
//!
//! The table must carry a unique constraint over the conflict target for
//! upserts to be idempotent.

use std::time::Duration;

use async_trait::async_trait;
use mandi_sync_source_models::{PARTITION_FIELD, PartitionKey, PriceRecord, conflict_target};
use reqwest::StatusCode;
use reqwest::header::{CONTENT_RANGE, HeaderMap, HeaderValue};

use crate::{DbError, PriceStore};

/// Maximum length of a rejected response body carried in [`DbError`].
const ERROR_BODY_LEN: usize = 500;

/// Connection settings for [`SupabaseStore`].
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Project URL (e.g. `https://xyz.supabase.co`).
    pub url: String,
    /// Service or anon key, sent as both `apikey` and bearer token.
    pub api_key: String,
    /// Destination table.
    pub table: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// A [`PriceStore`] backed by a Supabase table.
#[derive(Debug, Clone)]
pub struct SupabaseStore {
    client: reqwest::Client,
    rest_url: String,
    table: String,
}

impl SupabaseStore {
    /// Builds a store client.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the API key is not a valid header value or
    /// the HTTP client cannot be built.
    pub fn new(config: &SupabaseConfig) -> Result<Self, DbError> {
        let mut headers = HeaderMap::new();
        let mut api_key = header_value(&config.api_key)?;
        api_key.set_sensitive(true);
        let mut bearer = header_value(&format!("Bearer {}", config.api_key))?;
        bearer.set_sensitive(true);
        headers.insert("apikey", api_key);
        headers.insert(reqwest::header::AUTHORIZATION, bearer);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            rest_url: format!(
                "{}/rest/v1/{}",
                config.url.trim_end_matches('/'),
                config.table
            ),
            table: config.table.clone(),
        })
    }

    /// Returns the destination table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    async fn count(&self, partition: Option<PartitionKey>) -> Result<u64, DbError> {
        let mut request = self
            .client
            .head(&self.rest_url)
            .query(&[("select", "id")])
            .header("Prefer", "count=exact");
        if let Some(partition) = partition {
            request = request.query(&[(PARTITION_FIELD, format!("eq.{partition}"))]);
        }

        let response = request.send().await?;
        let status = response.status();
        let range = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = response.text().await?;
        check_response(status, &body)?;

        let range = range.ok_or_else(|| DbError::Conversion {
            message: "count response has no Content-Range header".to_string(),
        })?;
        parse_content_range(&range)
    }

    async fn write(&self, rows: &[PriceRecord], upsert: bool) -> Result<(), DbError> {
        let mut request = self.client.post(&self.rest_url);
        request = if upsert {
            request
                .query(&[("on_conflict", conflict_target())])
                .header("Prefer", "resolution=merge-duplicates,return=minimal")
        } else {
            request.header("Prefer", "return=minimal")
        };

        let response = request.json(rows).send().await?;
        let status = response.status();
        let body = response.text().await?;
        check_response(status, &body)
    }
}

#[async_trait]
impl PriceStore for SupabaseStore {
    async fn upsert(&self, rows: &[PriceRecord]) -> Result<(), DbError> {
        self.write(rows, true).await
    }

    async fn insert(&self, rows: &[PriceRecord]) -> Result<(), DbError> {
        self.write(rows, false).await
    }

    async fn count_for_partition(&self, partition: PartitionKey) -> Result<u64, DbError> {
        self.count(Some(partition)).await
    }

    async fn total_count(&self) -> Result<u64, DbError> {
        self.count(None).await
    }

    async fn earliest_partition(&self) -> Result<Option<PartitionKey>, DbError> {
        let order = format!("{PARTITION_FIELD}.asc");
        let response = self
            .client
            .get(&self.rest_url)
            .query(&[
                ("select", PARTITION_FIELD),
                ("order", order.as_str()),
                ("limit", "1"),
            ])
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        check_response(status, &body)?;

        parse_earliest(&body)
    }

    async fn delete_partition(&self, partition: PartitionKey) -> Result<u64, DbError> {
        let count = self.count(Some(partition)).await?;

        let response = self
            .client
            .delete(&self.rest_url)
            .query(&[(PARTITION_FIELD, format!("eq.{partition}"))])
            .header("Prefer", "return=minimal")
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        check_response(status, &body)?;

        Ok(count)
    }
}

fn header_value(value: &str) -> Result<HeaderValue, DbError> {
    HeaderValue::from_str(value).map_err(|e| DbError::Conversion {
        message: format!("invalid API key header: {e}"),
    })
}

/// Checks a store response for failure.
///
/// Besides non-2xx statuses, a 2xx body that is a JSON object carrying an
/// `error` field, or a `code` plus `message` pair, is treated as a
/// rejection: some gateways report partial failures that way.
///
/// # Errors
///
/// Returns [`DbError::Rejected`] if the response reports an error.
pub fn check_response(status: StatusCode, body: &str) -> Result<(), DbError> {
    let rejected = |message: &str| DbError::Rejected {
        status: status.as_u16(),
        message: truncate(message.trim(), ERROR_BODY_LEN),
    };

    if !status.is_success() {
        return Err(rejected(if body.trim().is_empty() {
            status.canonical_reason().unwrap_or("no response body")
        } else {
            body
        }));
    }

    let Ok(serde_json::Value::Object(object)) = serde_json::from_str::<serde_json::Value>(body)
    else {
        return Ok(());
    };

    if let Some(error) = object.get("error").filter(|e| !e.is_null()) {
        let message = error
            .as_str()
            .map_or_else(|| error.to_string(), String::from);
        return Err(rejected(&message));
    }

    if let (Some(code), Some(message)) = (object.get("code"), object.get("message")) {
        let message = message
            .as_str()
            .map_or_else(|| message.to_string(), String::from);
        return Err(rejected(&format!("{code}: {message}")));
    }

    Ok(())
}

/// Parses the total out of a `Content-Range` header (`0-24/3573` or
/// `*/3573`).
///
/// # Errors
///
/// Returns [`DbError::Conversion`] if the total is missing or unknown
/// (`*`).
pub fn parse_content_range(value: &str) -> Result<u64, DbError> {
    value
        .rsplit_once('/')
        .and_then(|(_, total)| total.trim().parse::<u64>().ok())
        .ok_or_else(|| DbError::Conversion {
            message: format!("unexpected Content-Range {value:?}"),
        })
}

/// Parses the body of the earliest-partition query.
///
/// # Errors
///
/// Returns [`DbError`] if the body is not an array of objects or the date
/// is not in canonical form.
pub fn parse_earliest(body: &str) -> Result<Option<PartitionKey>, DbError> {
    let rows: Vec<serde_json::Map<String, serde_json::Value>> = serde_json::from_str(body)?;

    let Some(value) = rows
        .first()
        .and_then(|row| row.get(PARTITION_FIELD))
        .and_then(serde_json::Value::as_str)
    else {
        return Ok(None);
    };

    value
        .parse::<PartitionKey>()
        .map(Some)
        .map_err(|e| DbError::Conversion {
            message: e.to_string(),
        })
}

fn truncate(text: &str, max: usize) -> String {
    text.char_indices()
        .nth(max)
        .map_or(text, |(idx, _)| &text[..idx])
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_content_range_forms() {
        assert_eq!(parse_content_range("0-24/3573").unwrap(), 3573);
        assert_eq!(parse_content_range("*/0").unwrap(), 0);
        assert!(parse_content_range("0-24/*").is_err());
        assert!(parse_content_range("garbage").is_err());
    }

    #[test]
    fn accepts_empty_success_body() {
        assert!(check_response(StatusCode::CREATED, "").is_ok());
        assert!(check_response(StatusCode::OK, "[]").is_ok());
    }

    #[test]
    fn rejects_error_status() {
        let err = check_response(
            StatusCode::CONFLICT,
            r#"{"code":"23505","message":"duplicate key value"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, DbError::Rejected { status: 409, .. }));
    }

    #[test]
    fn rejects_error_field_on_success_status() {
        let err = check_response(StatusCode::OK, r#"{"error":"partial failure"}"#).unwrap_err();
        match err {
            DbError::Rejected { status, message } => {
                assert_eq!(status, 200);
                assert_eq!(message, "partial failure");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_code_and_message_on_success_status() {
        let err = check_response(
            StatusCode::OK,
            r#"{"code":"PGRST204","message":"column not found"}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("column not found"));
    }

    #[test]
    fn null_error_field_is_not_a_rejection() {
        assert!(check_response(StatusCode::OK, r#"{"error":null,"data":[]}"#).is_ok());
    }

    #[test]
    fn parses_earliest_partition() {
        let body = r#"[{"arrival_date":"2024-01-03"}]"#;
        assert_eq!(
            parse_earliest(body).unwrap(),
            Some("2024-01-03".parse().unwrap())
        );
        assert_eq!(parse_earliest("[]").unwrap(), None);
        assert!(parse_earliest(r#"[{"arrival_date":"03/01/2024"}]"#).is_err());
    }

    #[test]
    fn rest_url_targets_table() {
        let store = SupabaseStore::new(&SupabaseConfig {
            url: "https://example.supabase.co/".to_string(),
            api_key: "secret".to_string(),
            table: "mandi_prices".to_string(),
            timeout: Duration::from_secs(30),
        })
        .unwrap();
        assert_eq!(store.rest_url, "https://example.supabase.co/rest/v1/mandi_prices");
        assert_eq!(store.table(), "mandi_prices");
    }
}
