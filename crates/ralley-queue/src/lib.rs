//! # Ralley Queue
//!
//! Scheduling and dispatch engine for the ralley dev queue.
//!
//! ## Features
//!
//! - Request normalization with `x-ralley-*` / `_*` scheduling directives
//! - Delayed delivery (`delay`, `delay-until`)
//! - Retry with fixed or exponential backoff
//! - Recurrence on cron expressions or fixed intervals
//! - In-memory job store with a time-ordered due index and JSON snapshots
//! - At-least-once HTTP delivery

pub mod clock;
pub mod config;
pub mod directives;
pub mod dispatcher;
pub mod error;
pub mod job;
pub mod lineage;
pub mod normalize;
pub mod recurrence;
pub mod retry;
pub mod scheduler;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use clock::{Clock, FakeClock, SystemClock, Timestamp};
pub use config::{DispatchConfig, QueueConfig};
pub use directives::Directives;
pub use dispatcher::{Dispatcher, HttpDispatcher};
pub use error::QueueError;
pub use job::{Job, JobRequest, JobSource, JobStatus};
pub use lineage::{derive_child, ChildKind, Lineage};
pub use normalize::{normalize, RawRequest, RequestBody};
pub use retry::{Backoff, RetryPolicy};
pub use scheduler::{Scheduler, TickReport};
pub use store::{JobStore, SharedJobStore};
