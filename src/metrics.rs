use std::sync::atomic::{AtomicU64, Ordering};
use serde::{Deserialize, Serialize};

use crate::pipeline::PaintError;
use crate::types::Receipt;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub completed: u64,
    pub painted: u64,
    pub failed: u64,

    // Failure breakdown
    pub already_painted: u64,
    pub request_errors: u64,
    pub signing_errors: u64,
    pub submission_errors: u64,
    pub confirmation_errors: u64,

    pub average_time_ms: f64,
    pub min_time_ms: u64,
    pub max_time_ms: u64,
}

/// Outcome category of a finished job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    AlreadyPainted,
    Request,
    Signing,
    Submission,
    Confirmation,
}

impl From<&PaintError> for ErrorType {
    fn from(err: &PaintError) -> Self {
        match err {
            PaintError::AlreadyPainted => ErrorType::AlreadyPainted,
            PaintError::InvalidArtifact | PaintError::Request(_) => ErrorType::Request,
            PaintError::Signing(_) => ErrorType::Signing,
            PaintError::Submission(_) => ErrorType::Submission,
            PaintError::Confirmation(_) => ErrorType::Confirmation,
        }
    }
}

/// Lock-free counters shared by all workers of a run.
#[derive(Debug)]
pub struct PaintMetrics {
    completed: AtomicU64,
    painted: AtomicU64,
    failed: AtomicU64,
    already_painted: AtomicU64,
    request_errors: AtomicU64,
    signing_errors: AtomicU64,
    submission_errors: AtomicU64,
    confirmation_errors: AtomicU64,

    total_time_ms: AtomicU64,
    min_time_ms: AtomicU64,
    max_time_ms: AtomicU64,
}

impl Default for PaintMetrics {
    fn default() -> Self { Self::new() }
}

impl PaintMetrics {
    pub fn new() -> Self {
        Self {
            completed: AtomicU64::new(0),
            painted: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            already_painted: AtomicU64::new(0),
            request_errors: AtomicU64::new(0),
            signing_errors: AtomicU64::new(0),
            submission_errors: AtomicU64::new(0),
            confirmation_errors: AtomicU64::new(0),
            total_time_ms: AtomicU64::new(0),
            min_time_ms: AtomicU64::new(u64::MAX),
            max_time_ms: AtomicU64::new(0),
        }
    }

    pub fn record_job(&self, time_ms: u64, outcome: &Result<Receipt, PaintError>) {
        match outcome {
            Ok(_) => {
                self.painted.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                self.record_error(ErrorType::from(err));
            }
        }

        self.total_time_ms.fetch_add(time_ms, Ordering::Relaxed);
        self.min_time_ms.fetch_min(time_ms, Ordering::Relaxed);
        self.max_time_ms.fetch_max(time_ms, Ordering::Relaxed);
        // last, so a reader that sees the completion also sees its category
        self.completed.fetch_add(1, Ordering::Release);
    }

    fn record_error(&self, error_type: ErrorType) {
        match error_type {
            ErrorType::AlreadyPainted => self.already_painted.fetch_add(1, Ordering::Relaxed),
            ErrorType::Request => self.request_errors.fetch_add(1, Ordering::Relaxed),
            ErrorType::Signing => self.signing_errors.fetch_add(1, Ordering::Relaxed),
            ErrorType::Submission => self.submission_errors.fetch_add(1, Ordering::Relaxed),
            ErrorType::Confirmation => self.confirmation_errors.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub fn completed(&self) -> u64 { self.completed.load(Ordering::Acquire) }

    pub fn snapshot(&self) -> Metrics {
        let completed = self.completed();
        let total_time_ms = self.total_time_ms.load(Ordering::Relaxed);
        let min_time_ms = self.min_time_ms.load(Ordering::Relaxed);

        Metrics {
            completed,
            painted: self.painted.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            already_painted: self.already_painted.load(Ordering::Relaxed),
            request_errors: self.request_errors.load(Ordering::Relaxed),
            signing_errors: self.signing_errors.load(Ordering::Relaxed),
            submission_errors: self.submission_errors.load(Ordering::Relaxed),
            confirmation_errors: self.confirmation_errors.load(Ordering::Relaxed),
            average_time_ms: if completed > 0 { total_time_ms as f64 / completed as f64 } else { 0.0 },
            min_time_ms: if min_time_ms == u64::MAX { 0 } else { min_time_ms },
            max_time_ms: self.max_time_ms.load(Ordering::Relaxed),
        }
    }
}
