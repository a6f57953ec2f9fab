// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Periodic background jobs for the pman server.
//!
//! `pman-server serve` uses this to run the expired token sweep on an
//! interval until shutdown.

pub mod context;
pub mod error;
pub mod job;
pub mod scheduler;

pub use context::{CancellationToken, JobContext};
pub use error::{JobError, Result};
pub use job::{Job, JobOutput};
pub use scheduler::JobScheduler;
