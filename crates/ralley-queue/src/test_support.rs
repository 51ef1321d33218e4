//! Job fixtures shared by unit tests.

use std::collections::BTreeMap;

use crate::clock::Timestamp;
use crate::directives::Directives;
use crate::job::{Job, JobRequest, JobSource, JobStatus};

/// Matches `FakeClock::default()`.
pub(crate) const NOW: Timestamp = 1_700_000_000.0;

pub(crate) fn request(url: &str) -> JobRequest {
    let parsed = url::Url::parse(url).expect("fixture url");
    JobRequest {
        method: "POST".to_string(),
        url: url.to_string(),
        headers: BTreeMap::new(),
        params: BTreeMap::new(),
        body: None,
        host: parsed.host_str().unwrap_or_default().to_string(),
        scheme: parsed.scheme().to_string(),
        path: parsed.path().to_string(),
        hasbody: false,
    }
}

/// A `REQUEST` job due at `start`.
pub(crate) fn job(id: &str, start: Timestamp) -> Job {
    Job {
        id: id.to_string(),
        status: JobStatus::Pending,
        source: JobSource::Request,
        workspace: "dev".to_string(),
        request: request("https://example.com/hook"),
        start,
        received: NOW,
        attempts: 0,
        trace: None,
        directives: Directives::default(),
        lineage: None,
        completed_at: None,
    }
}

pub(crate) fn job_with(id: &str, start: Timestamp, directives: Directives) -> Job {
    Job {
        directives,
        ..job(id, start)
    }
}
