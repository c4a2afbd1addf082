use std::io::Read;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::client::{MAX_ERROR_BODY_BYTES, unix_seconds};
use crate::error::{PromqlError, Result};
use crate::response::QueryResponse;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Clone)]
pub struct Prometheus {
    http: reqwest::blocking::Client,
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
        let (base_url, timeout) = crate::client::env_config()?;
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

    pub fn query(&self, promql: &str) -> Result<QueryResponse> {
        let document = self.query_raw(promql)?;
        Ok(QueryResponse::parse(document)?)
    }

    pub fn query_raw(&self, promql: &str) -> Result<Value> {
        debug!(query = promql, "issuing instant query");
        let request = self
            .http
            .get(self.endpoint("/api/v1/query"))
            .query(&[("query", promql)]);
        checked_json(request)
    }

    pub fn query_range(
        &self,
        promql: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step: &str,
    ) -> Result<QueryResponse> {
        let document = self.query_range_raw(promql, start, end, step)?;
        Ok(QueryResponse::parse(document)?)
    }

    pub fn query_range_raw(
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
        checked_json(request)
    }
}

fn build_http(timeout: Duration) -> reqwest::blocking::Client {
    reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .expect("reqwest client build should not fail")
}

fn checked_json(request: reqwest::blocking::RequestBuilder) -> Result<Value> {
    let response = request.send()?;
    let status = response.status();
    if !status.is_success() {
        let body = error_body(response, MAX_ERROR_BODY_BYTES);
        debug!(%status, "request failed");
        return Err(PromqlError::Api { status, body });
    }
    let text = response.text()?;
    Ok(serde_json::from_str(&text)?)
}

fn error_body(response: reqwest::blocking::Response, max_bytes: usize) -> String {
    let mut out = Vec::<u8>::new();
    let _ = response.take((max_bytes + 1) as u64).read_to_end(&mut out);

    let truncated = out.len() > max_bytes;
    if truncated {
        out.truncate(max_bytes);
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
