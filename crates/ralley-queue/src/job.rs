//! Job record and status.

use std::collections::BTreeMap;

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::clock::Timestamp;
use crate::directives::{CronSpec, Directives};
use crate::error::QueueError;
use crate::lineage::Lineage;

/// Job status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    /// Registered, not yet picked up.
    #[default]
    Pending,
    /// Picked up for dispatch.
    Active,
    /// Suspended; never dispatched.
    Inactive,
}

/// Where a job came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobSource {
    /// Registered from an inbound request.
    Request,
    /// Spawned after a failed attempt.
    Retry,
    /// Spawned as a recurrence occurrence.
    Schedule,
}

/// Normalized outbound HTTP request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRequest {
    pub method: String,
    /// Fully-qualified target URL, including the forwarded query parameters.
    pub url: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
    /// Base64-encoded body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub host: String,
    pub scheme: String,
    pub path: String,
    #[serde(default)]
    pub hasbody: bool,
}

impl JobRequest {
    /// Decode the stored body.
    pub fn decoded_body(&self) -> Result<Option<Vec<u8>>, QueueError> {
        self.body
            .as_deref()
            .map(|b| {
                base64::engine::general_purpose::STANDARD
                    .decode(b)
                    .map_err(|e| QueueError::DispatchFailure(format!("Invalid body encoding: {}", e)))
            })
            .transpose()
    }
}

/// A schedulable unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    #[serde(default)]
    pub status: JobStatus,
    pub source: JobSource,
    pub workspace: String,
    pub request: JobRequest,
    /// When the job becomes due. Zero means immediately.
    #[serde(default)]
    pub start: Timestamp,
    pub received: Timestamp,
    /// Attempts used by this job's retry lineage.
    #[serde(default)]
    pub attempts: u32,
    /// Id of the originating `REQUEST` job. On the original it is the caller's
    /// `trace` directive, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
    /// Stored as top-level fields (`key`, `retry`, `cron`, ...).
    #[serde(flatten)]
    pub directives: Directives,
    /// Original scheduling descriptor, inherited by retry/recurrence children.
    #[serde(rename = "_source", default, skip_serializing_if = "Option::is_none")]
    pub lineage: Option<Lineage>,
    /// Set when a completed job is kept in retain mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Timestamp>,
}

impl Job {
    /// Whether the job may be dispatched at `now`.
    pub fn is_due(&self, now: Timestamp) -> bool {
        self.is_schedulable() && (self.start <= 0.0 || self.start <= now)
    }

    /// Whether the job belongs in the due index at all.
    pub fn is_schedulable(&self) -> bool {
        self.status != JobStatus::Inactive && self.completed_at.is_none()
    }

    /// The scheduling descriptor this job's children inherit.
    pub fn lineage_descriptor(&self) -> Lineage {
        self.lineage
            .clone()
            .unwrap_or_else(|| Lineage::from(&self.directives))
    }

    /// Cron recurrence, inherited or own.
    pub fn cron(&self) -> Option<&CronSpec> {
        match &self.lineage {
            Some(lineage) => lineage.cron.as_ref(),
            None => self.directives.cron.as_ref(),
        }
    }

    /// Interval recurrence in seconds, inherited or own.
    pub fn interval(&self) -> Option<f64> {
        match &self.lineage {
            Some(lineage) => lineage.interval,
            None => self.directives.interval,
        }
    }

    /// Whether this job seeds the next recurrence occurrence when it comes due.
    pub fn is_recurrence_trigger(&self) -> bool {
        (self.cron().is_some() || self.interval().is_some()) && self.start > 0.0
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
