//! Scheduling directives carried by inbound requests.
//!
//! Every directive can be given as an `x-ralley-<name>` header or as a `_<name>`
//! query parameter. Headers win. When `x-ralley-no-conflict` is set, query
//! parameters are never read as directives and are forwarded untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::clock::Timestamp;
use crate::retry::RetryPolicy;

/// Header that disables query-parameter directive aliases.
pub const NO_CONFLICT_HEADER: &str = "x-ralley-no-conflict";

/// Headers removed before a job is stored.
pub const RESERVED_HEADERS: &[&str] = &[
    "host",
    "content-length",
    "x-ralley-key",
    "x-ralley-delay",
    "x-ralley-delay-until",
    "x-ralley-retry",
    "x-ralley-interval",
    "x-ralley-cron",
    "x-ralley-throttle",
    "x-ralley-timezone",
    "x-ralley-trace",
    "x-ralley-token",
    "x-ralley-env",
    NO_CONFLICT_HEADER,
];

/// Query parameters removed before a job is stored (outside no-conflict mode).
pub const RESERVED_PARAMS: &[&str] = &[
    "_key",
    "_delay",
    "_delay_until",
    "_retry",
    "_interval",
    "_cron",
    "_throttle",
    "_timezone",
    "_trace",
    "_token",
    "_env",
];

/// A parsed cron directive: one entry per expression, one string per field.
pub type CronSpec = Vec<Vec<String>>;

/// Typed scheduling directives of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Directives {
    /// Partitioning hint.
    #[serde(default = "default_key")]
    pub key: String,

    /// Seconds after receipt before the job becomes due.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<f64>,

    /// Absolute epoch seconds at which the job becomes due.
    #[serde(default, rename = "delayuntil", skip_serializing_if = "Option::is_none")]
    pub delay_until: Option<Timestamp>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryPolicy>,

    /// Recurrence period in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron: Option<CronSpec>,

    /// Rate-limit hint, carried but not enforced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub throttle: Option<String>,

    /// Carried but not applied to cron evaluation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,

    /// Caller-supplied trace, applied to the registered job's own `trace`.
    #[serde(skip)]
    pub trace: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
}

fn default_key() -> String {
    "default".to_string()
}

impl Default for Directives {
    fn default() -> Self {
        Self {
            key: default_key(),
            delay: None,
            delay_until: None,
            retry: None,
            interval: None,
            cron: None,
            throttle: None,
            timezone: None,
            trace: None,
            env: None,
        }
    }
}

impl Directives {
    /// Extract directives from lowercased headers and merged query parameters.
    pub fn extract(headers: &BTreeMap<String, String>, params: &BTreeMap<String, String>) -> Self {
        let aliases_enabled = !no_conflict(headers);
        let lookup = |header: &str, alias: &str| -> Option<String> {
            non_empty(headers.get(header)).or_else(|| {
                if aliases_enabled {
                    non_empty(params.get(alias))
                } else {
                    None
                }
            })
        };

        Self {
            key: lookup("x-ralley-key", "_key").unwrap_or_else(default_key),
            delay: lookup("x-ralley-delay", "_delay").and_then(|v| parse_number("delay", &v)),
            delay_until: lookup("x-ralley-delay-until", "_delay_until")
                .and_then(|v| parse_number("delay-until", &v)),
            retry: lookup("x-ralley-retry", "_retry").map(|v| RetryPolicy::parse(&v)),
            interval: lookup("x-ralley-interval", "_interval")
                .and_then(|v| parse_number("interval", &v)),
            cron: lookup("x-ralley-cron", "_cron").and_then(|v| parse_cron(&v)),
            throttle: lookup("x-ralley-throttle", "_throttle"),
            timezone: lookup("x-ralley-timezone", "_timezone"),
            trace: lookup("x-ralley-trace", "_trace"),
            env: lookup("x-ralley-env", "_env"),
        }
    }

    /// When the job becomes due: `delay-until`, else `received + delay`, else `received`.
    pub fn start(&self, received: Timestamp) -> Timestamp {
        if let Some(until) = self.delay_until.filter(|t| *t > 0.0) {
            return until;
        }
        self.delay
            .filter(|d| *d > 0.0)
            .map(|delay| received + delay)
            .filter(|start| start.is_finite())
            .unwrap_or(received)
    }
}

/// Whether the no-conflict header is present with a truthy value.
pub fn no_conflict(headers: &BTreeMap<String, String>) -> bool {
    headers
        .get(NO_CONFLICT_HEADER)
        .map(|v| {
            let v = v.trim();
            !v.is_empty() && v != "0" && !v.eq_ignore_ascii_case("false")
        })
        .unwrap_or(false)
}

/// Split a cron directive into expressions (`,`) and fields (`|` or space).
pub fn parse_cron(raw: &str) -> Option<CronSpec> {
    let spec: CronSpec = raw
        .split(',')
        .map(|expr| {
            expr.split(['|', ' '])
                .filter(|field| !field.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .filter(|fields| !fields.is_empty())
        .collect();

    if spec.is_empty() {
        None
    } else {
        Some(spec)
    }
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_number(name: &str, raw: &str) -> Option<f64> {
    match raw.parse::<f64>() {
        Ok(n) if n.is_finite() => Some(n),
        _ => {
            warn!(directive = name, value = raw, "Ignoring non-numeric directive");
            None
        }
    }
}

#[cfg(test)]
#[path = "directives_tests.rs"]
mod tests;
