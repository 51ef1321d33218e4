//! Lineage descriptor and child derivation shared by retries and recurrences.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::Timestamp;
use crate::directives::{CronSpec, Directives};
use crate::job::{Job, JobSource, JobStatus};

/// The original scheduling descriptor of a lineage.
///
/// Built once from the `REQUEST` job's directives and copied unchanged onto every
/// retry and recurrence child.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lineage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron: Option<CronSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<f64>,
    #[serde(default, rename = "delayuntil", skip_serializing_if = "Option::is_none")]
    pub delay_until: Option<Timestamp>,
}

impl From<&Directives> for Lineage {
    fn from(directives: &Directives) -> Self {
        Self {
            cron: directives.cron.clone(),
            interval: directives.interval,
            delay: directives.delay,
            delay_until: directives.delay_until,
        }
    }
}

/// Why a child job is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildKind {
    Retry,
    Schedule,
}

impl ChildKind {
    fn source(self) -> JobSource {
        match self {
            ChildKind::Retry => JobSource::Retry,
            ChildKind::Schedule => JobSource::Schedule,
        }
    }
}

/// Derive the next job of a lineage.
///
/// The child gets a fresh id, `start`/`received`, its own source and the trace of the
/// originating request. The lineage descriptor, retry policy and request are copied
/// unchanged. One-shot delays and recurrence directives only live in the lineage, so
/// they are cleared from the child's own directives. Only retries consume an attempt.
pub fn derive_child(parent: &Job, kind: ChildKind, start: Timestamp, now: Timestamp) -> Job {
    let trace = match parent.source {
        JobSource::Request => Some(parent.id.clone()),
        JobSource::Retry | JobSource::Schedule => parent.trace.clone(),
    };

    let attempts = match kind {
        ChildKind::Retry => parent.attempts.saturating_add(1),
        ChildKind::Schedule => parent.attempts,
    };

    let mut directives = parent.directives.clone();
    directives.delay = None;
    directives.delay_until = None;
    directives.cron = None;
    directives.interval = None;

    Job {
        id: Uuid::new_v4().to_string(),
        status: JobStatus::Pending,
        source: kind.source(),
        workspace: parent.workspace.clone(),
        request: parent.request.clone(),
        start,
        received: now,
        attempts,
        trace,
        directives,
        lineage: Some(parent.lineage_descriptor()),
        completed_at: None,
    }
}

#[cfg(test)]
#[path = "lineage_tests.rs"]
mod tests;
