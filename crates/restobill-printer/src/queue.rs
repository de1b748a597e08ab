//! # Print Queue
//!
//! Jobs wait here while the printer is unreachable and are written oldest
//! first once the link is up.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{PrintError, PrintResult};

/// A receipt or KOT waiting to be printed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintJob {
    pub id: String,

    /// Human label for logs and the UI ("Bill #1042", "KOT T7").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Rendered ESC/POS bytes.
    pub payload: Vec<u8>,

    /// Failed write attempts so far.
    pub attempts: u32,

    pub created_at: DateTime<Utc>,
}

impl PrintJob {
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        PrintJob {
            id: Uuid::new_v4().to_string(),
            label: None,
            payload: payload.into(),
            attempts: 0,
            created_at: Utc::now(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Bounded FIFO of pending jobs.
#[derive(Debug)]
pub struct PrintQueue {
    jobs: VecDeque<PrintJob>,
    capacity: usize,
}

impl PrintQueue {
    pub fn new(capacity: usize) -> Self {
        PrintQueue {
            jobs: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a job, refusing it when the queue is full.
    pub fn push(&mut self, job: PrintJob) -> PrintResult<()> {
        if self.jobs.len() >= self.capacity {
            return Err(PrintError::QueueFull {
                capacity: self.capacity,
            });
        }
        self.jobs.push_back(job);
        Ok(())
    }

    pub fn front_mut(&mut self) -> Option<&mut PrintJob> {
        self.jobs.front_mut()
    }

    pub fn pop_front(&mut self) -> Option<PrintJob> {
        self.jobs.pop_front()
    }

    /// Puts a job taken with `pop_front` back at the head. Not capacity
    /// checked: the slot was already counted.
    pub fn requeue_front(&mut self, job: PrintJob) {
        self.jobs.push_front(job);
    }

    /// 1-based position of a job, if still queued.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.jobs.iter().position(|j| j.id == id).map(|i| i + 1)
    }

    /// Forgets failed attempts (after a manual disconnect).
    pub fn reset_attempts(&mut self) {
        for job in &mut self.jobs {
            job.attempts = 0;
        }
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
