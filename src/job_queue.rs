//! Pending job queue and worker state
//!
//! The queue and the worker's running/stop flags share one mutex. The worker
//! marks itself idle in the same critical section in which it finds the queue
//! empty, so an enqueue either lands before that check or observes an idle
//! worker and starts a new one.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use crate::data_structures::{Job, JobId};

/// Running/stop flags of the single background worker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerState {
    pub running: bool,
    pub stop_requested: bool,
}

/// What the worker should do next
#[derive(Debug, PartialEq, Eq)]
pub enum NextJob {
    Run(Job),
    /// Queue drained; the worker is now idle
    Drained,
    /// Stop-after-current was honoured; the worker is now idle
    Stopped,
}

#[derive(Default)]
struct QueueInner {
    jobs: VecDeque<Job>,
    state: WorkerState,
}

/// FIFO of pending jobs with exactly one consumer
#[derive(Default)]
pub struct JobQueue {
    inner: Mutex<QueueInner>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueInner> {
        // Queue data stays consistent across a panicking holder
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append a job. Returns true when the caller must start a worker.
    pub fn push(&self, job: Job) -> bool {
        let mut inner = self.lock();
        inner.jobs.push_back(job);
        if inner.state.running {
            false
        } else {
            inner.state = WorkerState {
                running: true,
                stop_requested: false,
            };
            true
        }
    }

    /// Take the next job for the worker, or move it to idle
    pub fn next_job(&self) -> NextJob {
        let mut inner = self.lock();
        if inner.state.stop_requested {
            inner.state = WorkerState::default();
            return NextJob::Stopped;
        }
        match inner.jobs.pop_front() {
            Some(job) => NextJob::Run(job),
            None => {
                inner.state = WorkerState::default();
                NextJob::Drained
            }
        }
    }

    /// Ask the worker to stop after its current job. Returns false when idle.
    pub fn request_stop(&self) -> bool {
        let mut inner = self.lock();
        if inner.state.running {
            inner.state.stop_requested = true;
            true
        } else {
            false
        }
    }

    /// Drop all pending jobs, returning their ids in queue order
    pub fn clear(&self) -> Vec<JobId> {
        let mut inner = self.lock();
        inner.jobs.drain(..).map(|job| job.id).collect()
    }

    /// Undo a `push` that claimed the worker when the thread could not be started
    pub fn abort_start(&self) {
        self.lock().state = WorkerState::default();
    }

    pub fn state(&self) -> WorkerState {
        self.lock().state
    }

    pub fn len(&self) -> usize {
        self.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of pending jobs in queue order
    pub fn pending_ids(&self) -> Vec<JobId> {
        self.lock().jobs.iter().map(|job| job.id).collect()
    }
}
