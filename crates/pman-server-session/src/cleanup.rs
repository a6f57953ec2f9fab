// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use pman_server_jobs::{Job, JobContext, JobError, JobOutput};
use tracing::instrument;

use crate::authority::SessionAuthority;

pub const TOKEN_CLEANUP_JOB_ID: &str = "token-cleanup";

/// Periodically deletes tracked tokens that have expired.
pub struct TokenCleanupJob {
	sessions: SessionAuthority,
}

impl TokenCleanupJob {
	pub fn new(sessions: SessionAuthority) -> Self {
		Self { sessions }
	}
}

#[async_trait]
impl Job for TokenCleanupJob {
	fn id(&self) -> &str {
		TOKEN_CLEANUP_JOB_ID
	}

	fn name(&self) -> &str {
		"Token Cleanup"
	}

	#[instrument(skip(self, ctx), fields(job_id = TOKEN_CLEANUP_JOB_ID))]
	async fn run(&self, ctx: &JobContext) -> Result<JobOutput, JobError> {
		ctx.check_cancelled()?;

		let tokens_deleted = self
			.sessions
			.sweep_expired()
			.await
			.map_err(|e| JobError::Failed(e.to_string()))?;

		tracing::info!(tokens_deleted, "Token cleanup completed");

		Ok(JobOutput {
			message: format!("Deleted {tokens_deleted} expired token records"),
			metadata: Some(serde_json::json!({ "tokens_deleted": tokens_deleted })),
		})
	}
}
