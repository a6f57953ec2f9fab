// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;

use crate::context::JobContext;
use crate::error::JobError;

/// A unit of background work. `id` keys the registration and appears in
/// every log line about the job.
#[async_trait]
pub trait Job: Send + Sync {
	fn id(&self) -> &str;
	fn name(&self) -> &str;
	async fn run(&self, ctx: &JobContext) -> Result<JobOutput, JobError>;
}

#[derive(Debug, Clone)]
pub struct JobOutput {
	pub message: String,
	pub metadata: Option<serde_json::Value>,
}
