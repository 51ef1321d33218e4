//! Retry policy and retry planning.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::clock::Timestamp;
use crate::job::Job;
use crate::lineage::{derive_child, ChildKind};

/// Backoff strategy between retries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Backoff {
    /// Constant delay of `time` seconds.
    #[default]
    Fixed,
    /// Delay of `attempts ^ time` seconds.
    Exponential,
}

/// Retry policy parsed from a `max|BACKOFF|time` directive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of retries in a lineage.
    pub max: u32,
    pub backoff: Backoff,
    /// Base time in seconds (fixed delay, or exponent for exponential backoff).
    pub time: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max: 1,
            backoff: Backoff::Fixed,
            time: 1.0,
        }
    }
}

impl RetryPolicy {
    /// Parse `max|BACKOFF|time`. Missing or unparseable segments take their defaults.
    pub fn parse(raw: &str) -> Self {
        let defaults = Self::default();
        let mut parts = raw.split('|').map(str::trim);

        let max = parts
            .next()
            .filter(|s| !s.is_empty())
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|n| n.is_finite() && *n >= 0.0)
            .map(|n| n as u32)
            .unwrap_or(defaults.max);

        let backoff = match parts.next().filter(|s| !s.is_empty()) {
            None => defaults.backoff,
            Some(s) if s.eq_ignore_ascii_case("FIXED") => Backoff::Fixed,
            Some(s) if s.eq_ignore_ascii_case("EXPONENTIAL") => Backoff::Exponential,
            Some(other) => {
                warn!(backoff = %other, "Unknown retry backoff, using FIXED");
                Backoff::Fixed
            }
        };

        let time = parts
            .next()
            .filter(|s| !s.is_empty())
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|n| n.is_finite() && *n >= 0.0)
            .unwrap_or(defaults.time);

        Self { max, backoff, time }
    }

    /// Delay before the next retry, or `None` once `attempts` has reached `max`.
    ///
    /// A delay too large to represent also ends the lineage.
    pub fn next_delay(&self, attempts: u32) -> Option<f64> {
        if attempts >= self.max {
            return None;
        }

        // A zero base time means "unset".
        let time = if self.time == 0.0 { 1.0 } else { self.time };
        let delay = match self.backoff {
            Backoff::Fixed => time,
            Backoff::Exponential => f64::from(attempts).powf(time),
        };
        Some(delay.max(0.0)).filter(|d| d.is_finite())
    }
}

/// Plan the retry child for a job whose dispatch failed at `now`.
///
/// Returns `None` when the job has no retry policy or its lineage has used every retry.
pub fn plan_retry(job: &Job, now: Timestamp) -> Option<Job> {
    let policy = job.directives.retry.as_ref()?;
    let delay = policy.next_delay(job.attempts)?;
    let start = Some(now + delay).filter(|start| start.is_finite())?;
    Some(derive_child(job, ChildKind::Retry, start, now))
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
