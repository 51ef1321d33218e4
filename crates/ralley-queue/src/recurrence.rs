//! Recurrence planning for cron and interval directives.
//!
//! Cron directives use crontab fields (`minute hour day-of-month month day-of-week`)
//! and are evaluated with the `cron` crate, which expects a leading seconds field and
//! numbers Sunday as 1. Five-field expressions get a `0` seconds field, and numeric
//! days of week are rewritten to names so `0`/`7` keep meaning Sunday. Evaluation is
//! in UTC.
//!
//! Crontab fires on a day matching either day field when both are restricted, while
//! the `cron` crate requires both. Such expressions are split into one schedule per
//! day field and the earlier match wins.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;
use tracing::warn;

use crate::clock::Timestamp;
use crate::directives::CronSpec;
use crate::error::QueueError;
use crate::job::Job;
use crate::lineage::{derive_child, ChildKind};

const DAY_NAMES: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

/// Next occurrence strictly after the job's `start`, if any.
///
/// When both cron and interval are configured the earlier occurrence wins.
pub fn next_occurrence(job: &Job) -> Option<Timestamp> {
    let by_interval = job
        .interval()
        .and_then(|interval| next_interval(job.start, interval));
    let by_cron = job.cron().and_then(|spec| next_cron_after(spec, job.start));

    match (by_interval, by_cron) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// Plan the `SCHEDULE` child for a recurrence trigger.
pub fn plan_recurrence(job: &Job, now: Timestamp) -> Option<Job> {
    let next = next_occurrence(job)?;
    Some(derive_child(job, ChildKind::Schedule, next, now))
}

/// `start + interval`, for a positive interval and a finite result.
pub fn next_interval(start: Timestamp, interval: f64) -> Option<Timestamp> {
    if interval > 0.0 && interval.is_finite() {
        Some(start + interval).filter(|next| next.is_finite())
    } else {
        None
    }
}

/// Earliest match across all cron expressions strictly after `after`.
///
/// Invalid expressions are logged and skipped.
pub fn next_cron_after(spec: &CronSpec, after: Timestamp) -> Option<Timestamp> {
    let after = to_datetime(after)?;

    spec.iter()
        .filter_map(|fields| match cron_schedules(fields) {
            Ok(schedules) => schedules
                .iter()
                .filter_map(|schedule| schedule.after(&after).next())
                .min(),
            Err(e) => {
                warn!(error = %e, "Skipping cron expression");
                None
            }
        })
        .min()
        .map(|next| next.timestamp() as Timestamp)
}

/// Build the `cron` schedules equivalent to one crontab expression.
pub fn cron_schedules(fields: &[String]) -> Result<Vec<Schedule>, QueueError> {
    let fields = to_cron_fields(fields)?;

    let variants = if is_restricted(&fields[3]) && is_restricted(&fields[5]) {
        let mut by_month_day = fields.clone();
        by_month_day[5] = "*".to_string();
        let mut by_week_day = fields;
        by_week_day[3] = "*".to_string();
        vec![by_month_day, by_week_day]
    } else {
        vec![fields]
    };

    variants
        .iter()
        .map(|fields| {
            let expression = fields.join(" ");
            Schedule::from_str(&expression).map_err(|e| QueueError::InvalidCron {
                expression,
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Rewrite crontab fields into the seconds-first form the `cron` crate parses.
pub fn to_cron_expression(fields: &[String]) -> Result<String, QueueError> {
    Ok(to_cron_fields(fields)?.join(" "))
}

fn to_cron_fields(fields: &[String]) -> Result<Vec<String>, QueueError> {
    let mut fields: Vec<String> = match fields.len() {
        5 => std::iter::once("0".to_string())
            .chain(fields.iter().cloned())
            .collect(),
        6 | 7 => fields.to_vec(),
        n => {
            return Err(QueueError::InvalidCron {
                expression: fields.join(" "),
                reason: format!("expected 5 fields, got {}", n),
            })
        }
    };

    fields[5] = translate_day_of_week(&fields[5]);
    Ok(fields)
}

/// A day field counts as unrestricted when it starts with `*` (as in `*/2`) or is `?`.
fn is_restricted(field: &str) -> bool {
    !(field.starts_with('*') || field == "?")
}

/// Map crontab day-of-week numbers (0-7, Sunday = 0 or 7) to day names.
fn translate_day_of_week(field: &str) -> String {
    let mut items = Vec::new();

    for item in field.split(',') {
        let (range, step) = match item.split_once('/') {
            Some((range, step)) => (range, Some(step)),
            None => (item, None),
        };

        let translated = match range.split_once('-') {
            Some((from, to)) => {
                let to = if to == "7" {
                    // `n-7` ends on Sunday, which sorts first in the name ordering.
                    if step.is_none() && from != "0" {
                        items.push("SUN".to_string());
                    }
                    "SAT".to_string()
                } else {
                    day_name(to)
                };
                format!("{}-{}", day_name(from), to)
            }
            None => day_name(range),
        };

        match step {
            Some(step) => items.push(format!("{}/{}", translated, step)),
            None => items.push(translated),
        }
    }

    items.join(",")
}

fn day_name(token: &str) -> String {
    match token.parse::<usize>() {
        Ok(7) => DAY_NAMES[0].to_string(),
        Ok(n) if n < DAY_NAMES.len() => DAY_NAMES[n].to_string(),
        _ => token.to_string(),
    }
}

fn to_datetime(ts: Timestamp) -> Option<DateTime<Utc>> {
    let secs = ts.floor();
    let nanos = ((ts - secs) * 1_000_000_000.0) as u32;
    DateTime::from_timestamp(secs as i64, nanos)
}

#[cfg(test)]
#[path = "recurrence_tests.rs"]
mod tests;
