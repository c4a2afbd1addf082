use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use serde_json::Value;
use tracing::debug;

use crate::error::{PromqlError, Result};
use crate::response::QueryResponse;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);
pub(crate) const MAX_ERROR_BODY_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct Prometheus {
    http: reqwest::Client,
    base_url: String,
}

impl Prometheus {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: build_http(DEFAULT_TIMEOUT),
            base_url: base_url.into(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http = build_http(timeout);
        self
    }

    pub fn from_env() -> Result<Self> {
        let (base_url, timeout) = env_config()?;
        let mut out = Self::new(base_url);
        if let Some(timeout) = timeout {
            out = out.with_timeout(timeout);
        }
        Ok(out)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }

    pub async fn query(&self, promql: &str) -> Result<QueryResponse> {
        let document = self.query_raw(promql).await?;
        Ok(QueryResponse::parse(document)?)
    }

    pub async fn query_raw(&self, promql: &str) -> Result<Value> {
        debug!(query = promql, "issuing instant query");
        let request = self
            .http
            .get(self.endpoint("/api/v1/query"))
            .query(&[("query", promql)]);
        checked_json(request).await
    }

    pub async fn query_range(
        &self,
        promql: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step: &str,
    ) -> Result<QueryResponse> {
        let document = self.query_range_raw(promql, start, end, step).await?;
        Ok(QueryResponse::parse(document)?)
    }

    pub async fn query_range_raw(
        &self,
        promql: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step: &str,
    ) -> Result<Value> {
        debug!(query = promql, %start, %end, step, "issuing range query");
        let start = unix_seconds(start);
        let end = unix_seconds(end);
        let request = self
            .http
            .get(self.endpoint("/api/v1/query_range"))
            .query(&[
                ("query", promql),
                ("start", start.as_str()),
                ("end", end.as_str()),
                ("step", step),
            ]);
        checked_json(request).await
    }
}

fn build_http(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .expect("reqwest client build should not fail")
}

pub(crate) fn env_config() -> Result<(String, Option<Duration>)> {
    let base_url = std::env::var("PROMETHEUS_URL")
        .map_err(|_| PromqlError::Config("PROMETHEUS_URL is not set".to_string()))?;
    let timeout = match std::env::var("PROMETHEUS_TIMEOUT_SECS") {
        Ok(raw) => {
            let secs: f64 = raw.parse().map_err(|_| {
                PromqlError::Config(format!("PROMETHEUS_TIMEOUT_SECS is not a number: {raw:?}"))
            })?;
            Some(Duration::from_secs_f64(secs))
        }
        Err(_) => None,
    };
    Ok((base_url, timeout))
}

pub(crate) fn unix_seconds(at: DateTime<Utc>) -> String {
    let seconds = at.timestamp() as f64 + f64::from(at.timestamp_subsec_nanos()) / 1e9;
    format!("{seconds}")
}

async fn checked_json(request: reqwest::RequestBuilder) -> Result<Value> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = error_body(response, MAX_ERROR_BODY_BYTES).await;
        debug!(%status, "request failed");
        return Err(PromqlError::Api { status, body });
    }
    let text = response.text().await?;
    Ok(serde_json::from_str(&text)?)
}

async fn error_body(response: reqwest::Response, max_bytes: usize) -> String {
    let mut out = Vec::<u8>::new();
    let mut truncated = false;

    let mut stream = response.bytes_stream();
    while let Some(next) = stream.next().await {
        let Ok(chunk) = next else {
            break;
        };
        let remaining = max_bytes.saturating_sub(out.len());
        if remaining == 0 {
            truncated = true;
            break;
        }
        if chunk.len() <= remaining {
            out.extend_from_slice(chunk.as_ref());
        } else {
            out.extend_from_slice(&chunk.as_ref()[..remaining]);
            truncated = true;
            break;
        }
    }

    let mut body = String::from_utf8_lossy(&out).to_string();
    if truncated {
        if !body.is_empty() {
            body.push('\n');
        }
        body.push_str("...(truncated)");
    }
    body
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn endpoint_joins_with_and_without_trailing_slash() {
        let bare = Prometheus::new("http://localhost:9090");
        let slashed = Prometheus::new("http://localhost:9090/");
        assert_eq!(
            bare.endpoint("/api/v1/query"),
            "http://localhost:9090/api/v1/query"
        );
        assert_eq!(
            slashed.endpoint("/api/v1/query"),
            "http://localhost:9090/api/v1/query"
        );
    }

    #[test]
    fn unix_seconds_formats_whole_and_fractional_timestamps() {
        let whole = Utc.with_ymd_and_hms(2023, 3, 28, 10, 40, 0).unwrap();
        assert_eq!(unix_seconds(whole), "1680000000");

        let fractional = whole + chrono::Duration::milliseconds(500);
        assert_eq!(unix_seconds(fractional), "1680000000.5");
    }
}
