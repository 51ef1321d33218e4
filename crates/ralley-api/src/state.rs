//! Application state.

use ralley_queue::Scheduler;

/// State shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub scheduler: Scheduler,
}

impl AppState {
    pub fn new(scheduler: Scheduler) -> Self {
        Self { scheduler }
    }

    /// Number of jobs currently stored.
    pub fn job_count(&self) -> usize {
        self.scheduler.store().lock().len()
    }
}
