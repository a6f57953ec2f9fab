// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::JobError;

/// Per-run information handed to [`crate::Job::run`].
#[derive(Debug, Clone)]
pub struct JobContext {
	pub run_id: String,
	pub cancellation_token: CancellationToken,
}

impl JobContext {
	pub fn new(cancellation_token: CancellationToken) -> Self {
		Self {
			run_id: uuid::Uuid::new_v4().to_string(),
			cancellation_token,
		}
	}

	/// `Err(JobError::Cancelled)` once the scheduler is shutting down.
	pub fn check_cancelled(&self) -> Result<(), JobError> {
		if self.cancellation_token.is_cancelled() {
			Err(JobError::Cancelled)
		} else {
			Ok(())
		}
	}
}

/// Cooperative cancellation flag shared between the scheduler and a job.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
	cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn cancel(&self) {
		self.cancelled.store(true, Ordering::SeqCst);
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancelled.load(Ordering::SeqCst)
	}
}
