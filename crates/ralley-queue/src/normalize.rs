//! Request normalization.
//!
//! Turns a raw inbound request into a `REQUEST` job: resolves the target URL,
//! extracts scheduling directives, strips reserved keys and encodes the body.

use std::collections::BTreeMap;

use base64::Engine;
use serde_json::Value;
use url::Url;

use crate::clock::Timestamp;
use crate::directives::{self, Directives, RESERVED_HEADERS, RESERVED_PARAMS};
use crate::error::QueueError;
use crate::job::{Job, JobRequest, JobSource, JobStatus};

/// Connection-level headers of the inbound hop, never forwarded.
pub const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

const JSON_CONTENT_TYPE: &str = "application/json";
const TEXT_CONTENT_TYPE: &str = "text/plain";

/// Inbound request body.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Parsed structured data.
    Structured(Value),
    /// Opaque bytes.
    Raw(Vec<u8>),
}

/// A raw inbound request, as handed over by the HTTP listener.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRequest {
    pub method: String,
    /// Target URL, with or without a scheme.
    pub url: String,
    pub headers: BTreeMap<String, String>,
    /// Explicit parameters; these override pairs parsed from `url`.
    pub params: BTreeMap<String, String>,
    pub body: Option<RequestBody>,
}

impl RawRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }
}

/// Normalize `raw` into a pending `REQUEST` job received at `received`.
pub fn normalize(
    id: String,
    workspace: &str,
    raw: RawRequest,
    received: Timestamp,
) -> Result<Job, QueueError> {
    let mut headers: BTreeMap<String, String> = raw
        .headers
        .into_iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value))
        .collect();

    let mut url = resolve_url(&raw.url)?;

    let mut params: BTreeMap<String, String> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    params.extend(raw.params);

    let directives = Directives::extract(&headers, &params);
    let no_conflict = directives::no_conflict(&headers);

    headers.retain(|name, _| {
        !RESERVED_HEADERS.contains(&name.as_str()) && !HOP_BY_HOP_HEADERS.contains(&name.as_str())
    });
    if !no_conflict {
        params.retain(|name, _| !RESERVED_PARAMS.contains(&name.as_str()));
    }

    let body = match encode_body(raw.body)? {
        Some((bytes, content_type)) => {
            headers
                .entry("content-type".to_string())
                .or_insert_with(|| content_type.to_string());
            Some(base64::engine::general_purpose::STANDARD.encode(bytes))
        }
        None => None,
    };

    url.set_query(None);
    if !params.is_empty() {
        url.query_pairs_mut().extend_pairs(params.iter());
    }

    let host = match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        (None, _) => return Err(QueueError::MalformedRequest(format!("No host in '{}'", url))),
    };

    let method = match raw.method.trim() {
        "" => "POST".to_string(),
        m => m.to_ascii_uppercase(),
    };

    let request = JobRequest {
        method,
        scheme: url.scheme().to_string(),
        path: url.path().to_string(),
        url: url.to_string(),
        host,
        headers,
        params,
        hasbody: body.is_some(),
        body,
    };

    Ok(Job {
        id,
        status: JobStatus::Pending,
        source: JobSource::Request,
        workspace: workspace.to_string(),
        request,
        start: directives.start(received),
        received,
        attempts: 0,
        trace: directives.trace.clone(),
        directives,
        lineage: None,
        completed_at: None,
    })
}

/// Parse the target, defaulting the scheme to `https`.
fn resolve_url(raw: &str) -> Result<Url, QueueError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(QueueError::MalformedRequest("Empty target URL".to_string()));
    }

    let lower = raw.to_ascii_lowercase();
    let candidate = if lower.starts_with("http://") || lower.starts_with("https://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    };

    let url = Url::parse(&candidate)
        .map_err(|e| QueueError::MalformedRequest(format!("Invalid target URL '{}': {}", raw, e)))?;

    if url.host_str().map_or(true, str::is_empty) {
        return Err(QueueError::MalformedRequest(format!("No host in '{}'", raw)));
    }
    Ok(url)
}

/// Bytes to store plus the content type to assume when the caller sent none.
fn encode_body(body: Option<RequestBody>) -> Result<Option<(Vec<u8>, &'static str)>, QueueError> {
    let encoded = match body {
        None | Some(RequestBody::Structured(Value::Null)) => None,
        Some(RequestBody::Raw(bytes)) if bytes.is_empty() => None,
        Some(RequestBody::Raw(bytes)) => {
            let content_type = if is_json_document(&bytes) {
                JSON_CONTENT_TYPE
            } else {
                TEXT_CONTENT_TYPE
            };
            Some((bytes, content_type))
        }
        Some(RequestBody::Structured(Value::String(text))) => {
            Some((text.into_bytes(), TEXT_CONTENT_TYPE))
        }
        Some(RequestBody::Structured(value @ (Value::Object(_) | Value::Array(_)))) => {
            let bytes = serde_json::to_vec(&value)
                .map_err(|e| QueueError::MalformedRequest(format!("Unencodable body: {}", e)))?;
            Some((bytes, JSON_CONTENT_TYPE))
        }
        Some(RequestBody::Structured(scalar)) => {
            Some((scalar.to_string().into_bytes(), TEXT_CONTENT_TYPE))
        }
    };
    Ok(encoded)
}

/// Whether `bytes` hold a JSON object or array. The bytes themselves are kept as sent.
fn is_json_document(bytes: &[u8]) -> bool {
    matches!(
        bytes.iter().find(|b| !b.is_ascii_whitespace()),
        Some(b'{' | b'[')
    ) && serde_json::from_slice::<serde::de::IgnoredAny>(bytes).is_ok()
}

#[cfg(test)]
#[path = "normalize_tests.rs"]
mod tests;
