// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobError {
	#[error("job failed: {0}")]
	Failed(String),

	#[error("job cancelled")]
	Cancelled,
}

pub type Result<T> = std::result::Result<T, JobError>;
