// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use crate::context::{CancellationToken, JobContext};
use crate::error::JobError;
use crate::job::Job;

struct RegisteredJob {
	job: Arc<dyn Job>,
	interval: Duration,
}

/// Runs registered jobs on fixed intervals until shut down.
pub struct JobScheduler {
	jobs: HashMap<String, RegisteredJob>,
	cancellation_token: CancellationToken,
	shutdown_tx: broadcast::Sender<()>,
	handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Default for JobScheduler {
	fn default() -> Self {
		Self::new()
	}
}

impl JobScheduler {
	pub fn new() -> Self {
		let (shutdown_tx, _) = broadcast::channel(1);
		Self {
			jobs: HashMap::new(),
			cancellation_token: CancellationToken::new(),
			shutdown_tx,
			handles: Mutex::new(Vec::new()),
		}
	}

	/// Register `job` to run every `interval`. A job with the same id
	/// replaces the earlier registration.
	pub fn register_periodic(&mut self, job: Arc<dyn Job>, interval: Duration) {
		let id = job.id().to_string();
		self.jobs.insert(id, RegisteredJob { job, interval });
	}

	/// Spawn a loop per job. The first run happens one interval after start.
	#[instrument(skip(self))]
	pub async fn start(&self) {
		let mut handles = self.handles.lock().await;

		for (job_id, registered) in &self.jobs {
			let job = Arc::clone(&registered.job);
			let interval = registered.interval;
			let mut shutdown_rx = self.shutdown_tx.subscribe();
			let cancellation_token = self.cancellation_token.clone();
			let job_id = job_id.clone();

			let handle = tokio::spawn(async move {
				loop {
					tokio::select! {
						_ = tokio::time::sleep(interval) => {
							run_once(job.as_ref(), &cancellation_token).await;
						}
						_ = shutdown_rx.recv() => {
							info!(job_id = %job_id, "Shutting down periodic job");
							break;
						}
					}
				}
			});

			handles.push(handle);
		}

		info!(job_count = handles.len(), "Job scheduler started");
	}

	/// Stop every loop and wait for in-flight runs to return. Runs see the
	/// cancellation through [`JobContext::check_cancelled`].
	#[instrument(skip(self))]
	pub async fn shutdown(&self) {
		self.cancellation_token.cancel();
		let _ = self.shutdown_tx.send(());

		let mut handles = self.handles.lock().await;
		for handle in handles.drain(..) {
			let _ = handle.await;
		}

		info!("Job scheduler shut down");
	}

	pub fn job_ids(&self) -> Vec<String> {
		let mut ids: Vec<String> = self.jobs.keys().cloned().collect();
		ids.sort();
		ids
	}
}

async fn run_once(job: &dyn Job, cancellation_token: &CancellationToken) {
	let ctx = JobContext::new(cancellation_token.clone());

	match job.run(&ctx).await {
		Ok(output) => {
			info!(job_id = %job.id(), run_id = %ctx.run_id, message = %output.message, "Job completed successfully");
		}
		Err(JobError::Cancelled) => {
			info!(job_id = %job.id(), run_id = %ctx.run_id, "Job cancelled");
		}
		Err(JobError::Failed(message)) => {
			// Not retried here; the next interval runs it again.
			warn!(job_id = %job.id(), run_id = %ctx.run_id, error = %message, "Job failed");
		}
	}
}
