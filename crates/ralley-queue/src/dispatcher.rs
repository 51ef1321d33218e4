//! Outbound HTTP delivery.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::{Client, Method};
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::config::DispatchConfig;
use crate::error::QueueError;
use crate::job::Job;
use crate::normalize::HOP_BY_HOP_HEADERS;

/// Header carrying the dispatch time in epoch seconds.
pub const START_HEADER: &str = "x-ralley-start";
/// Header carrying the job id.
pub const ID_HEADER: &str = "x-ralley-id";

/// Delivers a due job.
///
/// A call that completes with any HTTP status is a success and yields that status.
/// Network errors, timeouts and oversized responses are failures.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, job: &Job) -> Result<u16, QueueError>;
}

/// `reqwest`-backed dispatcher.
pub struct HttpDispatcher {
    client: Client,
    config: DispatchConfig,
    clock: Arc<dyn Clock>,
}

impl HttpDispatcher {
    pub fn new(config: DispatchConfig) -> Result<Self, QueueError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                QueueError::DispatchFailure(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            config,
            clock: Arc::new(SystemClock),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn headers(&self, job: &Job) -> Result<HeaderMap, QueueError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, header_value(&user_agent())?);

        for (name, value) in &job.request.headers {
            if HOP_BY_HOP_HEADERS.contains(&name.as_str()) {
                continue;
            }
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                QueueError::DispatchFailure(format!("Invalid header name '{}': {}", name, e))
            })?;
            headers.insert(name, header_value(value)?);
        }

        headers.insert(
            HeaderName::from_static(START_HEADER),
            header_value(&self.clock.now().to_string())?,
        );
        headers.insert(HeaderName::from_static(ID_HEADER), header_value(&job.id)?);
        Ok(headers)
    }
}

#[async_trait]
impl Dispatcher for HttpDispatcher {
    async fn dispatch(&self, job: &Job) -> Result<u16, QueueError> {
        let method = Method::from_bytes(job.request.method.as_bytes()).map_err(|e| {
            QueueError::DispatchFailure(format!("Invalid method '{}': {}", job.request.method, e))
        })?;

        let mut request = self
            .client
            .request(method, &job.request.url)
            .headers(self.headers(job)?);
        if let Some(body) = job.request.decoded_body()? {
            request = request.body(body);
        }

        let mut response = request
            .send()
            .await
            .map_err(|e| QueueError::DispatchFailure(format!("Request failed: {}", e)))?;
        let status = response.status().as_u16();

        let limit = self.config.max_response_bytes;
        if response.content_length().is_some_and(|len| len > limit) {
            return Err(oversized(limit));
        }

        let mut read: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| QueueError::DispatchFailure(format!("Failed to read response: {}", e)))?
        {
            read += chunk.len() as u64;
            if read > limit {
                return Err(oversized(limit));
            }
        }

        debug!(job_id = %job.id, status, bytes = read, "Dispatched");
        Ok(status)
    }
}

fn user_agent() -> String {
    format!("ralley@{}", env!("CARGO_PKG_VERSION"))
}

fn header_value(value: &str) -> Result<HeaderValue, QueueError> {
    HeaderValue::from_str(value)
        .map_err(|e| QueueError::DispatchFailure(format!("Invalid header value: {}", e)))
}

fn oversized(limit: u64) -> QueueError {
    QueueError::DispatchFailure(format!("Response exceeds {} bytes", limit))
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
