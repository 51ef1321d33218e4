//! Job store with a time-ordered due index and JSON snapshots.

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BinaryHeap, HashMap, HashSet};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use tokio::fs;
use tracing::debug;

use crate::clock::Timestamp;
use crate::error::QueueError;
use crate::job::{Job, JobStatus};

/// Heap entry ordering jobs by `start`, then id.
#[derive(Debug, Clone)]
struct DueEntry {
    start: Timestamp,
    id: String,
}

impl PartialEq for DueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DueEntry {}

impl PartialOrd for DueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.start
            .total_cmp(&other.start)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// In-memory job store.
///
/// The due index is a min-heap keyed by `start` with lazy invalidation: entries for
/// deleted, rescheduled, completed, inactive or in-flight jobs are dropped when they
/// reach the top.
#[derive(Debug, Default)]
pub struct JobStore {
    jobs: HashMap<String, Job>,
    index: BinaryHeap<Reverse<DueEntry>>,
    in_flight: HashSet<String>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&Job> {
        self.jobs.get(id)
    }

    /// Insert or replace a job and index it if it can become due.
    pub fn upsert(&mut self, job: Job) {
        self.in_flight.remove(&job.id);
        if job.is_schedulable() {
            self.index.push(Reverse(DueEntry {
                start: job.start,
                id: job.id.clone(),
            }));
        }
        self.jobs.insert(job.id.clone(), job);
    }

    pub fn delete(&mut self, id: &str) -> Option<Job> {
        self.in_flight.remove(id);
        self.jobs.remove(id)
    }

    /// All jobs, ordered by `start`.
    pub fn all(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.jobs.values().cloned().collect();
        jobs.sort_by(|a, b| a.start.total_cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
        jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Remove every due job from the index, mark it `ACTIVE` and return it.
    pub fn take_due(&mut self, now: Timestamp) -> Vec<Job> {
        let mut due = Vec::new();

        while let Some(Reverse(entry)) = self.index.peek() {
            if self.is_live(entry) {
                let due_now = self.jobs.get(&entry.id).is_some_and(|job| job.is_due(now));
                if !due_now {
                    break;
                }
            }
            let Some(Reverse(entry)) = self.index.pop() else {
                break;
            };
            if !self.is_live(&entry) {
                continue;
            }
            if let Some(job) = self.jobs.get_mut(&entry.id) {
                job.status = JobStatus::Active;
                self.in_flight.insert(entry.id);
                due.push(job.clone());
            }
        }

        due
    }

    /// `start` of the earliest job waiting in the index.
    pub fn next_due(&mut self) -> Option<Timestamp> {
        while let Some(Reverse(entry)) = self.index.peek() {
            if self.is_live(entry) {
                return Some(entry.start);
            }
            self.index.pop();
        }
        None
    }

    /// Keep a finished job for inspection. It is never dispatched again.
    pub fn complete(&mut self, id: &str, now: Timestamp) -> bool {
        self.in_flight.remove(id);
        match self.jobs.get_mut(id) {
            Some(job) => {
                job.completed_at = Some(now);
                true
            }
            None => false,
        }
    }

    fn is_live(&self, entry: &DueEntry) -> bool {
        !self.in_flight.contains(&entry.id)
            && self.jobs.get(&entry.id).is_some_and(|job| {
                job.is_schedulable() && job.start.to_bits() == entry.start.to_bits()
            })
    }

    /// Serialize the id → job mapping as pretty JSON.
    pub fn snapshot(&self) -> Result<String, QueueError> {
        let ordered: BTreeMap<&String, &Job> = self.jobs.iter().collect();
        serde_json::to_string_pretty(&ordered)
            .map_err(|e| QueueError::Persistence(format!("Failed to serialize jobs: {}", e)))
    }

    /// Rebuild a store from a snapshot. `ACTIVE` jobs are indexed again.
    pub fn from_snapshot(content: &str) -> Result<Self, QueueError> {
        let mut store = Self::new();
        if content.trim().is_empty() {
            return Ok(store);
        }

        let jobs: HashMap<String, Job> = serde_json::from_str(content)
            .map_err(|e| QueueError::Persistence(format!("Failed to parse snapshot: {}", e)))?;
        for job in jobs.into_values() {
            store.upsert(job);
        }
        Ok(store)
    }

    /// Load a snapshot file. A missing file yields an empty store.
    pub async fn load(path: &Path) -> Result<Self, QueueError> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No snapshot, starting empty");
                return Ok(Self::new());
            }
            Err(e) => {
                return Err(QueueError::Persistence(format!(
                    "Failed to read snapshot {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let store = Self::from_snapshot(&content)?;
        debug!(path = %path.display(), jobs = store.len(), "Loaded snapshot");
        Ok(store)
    }

    pub async fn save(&self, path: &Path) -> Result<(), QueueError> {
        write_snapshot(path, self.snapshot()?).await
    }
}

/// Write `content` next to `path` and rename it into place.
async fn write_snapshot(path: &Path, content: String) -> Result<(), QueueError> {
    let write_err = |e: std::io::Error| {
        QueueError::Persistence(format!("Failed to write snapshot {}: {}", path.display(), e))
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp = tmp_path(path);
    fs::write(&tmp, content).await.map_err(write_err)?;
    fs::rename(&tmp, path).await.map_err(write_err)?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

/// A [`JobStore`] shared between the scheduler, dispatch tasks and the HTTP listener.
///
/// Never hold the guard across an `.await`.
#[derive(Debug, Clone, Default)]
pub struct SharedJobStore(Arc<Mutex<JobStore>>);

impl SharedJobStore {
    pub fn new(store: JobStore) -> Self {
        Self(Arc::new(Mutex::new(store)))
    }

    pub fn lock(&self) -> MutexGuard<'_, JobStore> {
        self.0.lock()
    }

    pub async fn load(path: &Path) -> Result<Self, QueueError> {
        Ok(Self::new(JobStore::load(path).await?))
    }

    /// Snapshot under the lock, then write without it.
    pub async fn save(&self, path: &Path) -> Result<(), QueueError> {
        let (content, jobs) = {
            let store = self.lock();
            (store.snapshot()?, store.len())
        };
        write_snapshot(path, content).await?;
        debug!(path = %path.display(), jobs, "Saved snapshot");
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
