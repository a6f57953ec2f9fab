// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! pman secret store server binary.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use pman_server::{create_app_state, logging, version};
use pman_server_jobs::JobScheduler;
use pman_server_session::TokenCleanupJob;

/// pman - hierarchical encrypted secret store.
#[derive(Parser, Debug)]
#[command(name = "pman-server", about = "Hierarchical encrypted secret store", version)]
struct Args {
	/// Config file; defaults to /etc/pman/server.toml.
	#[arg(long, short = 'c', env = "PMAN_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
	/// Open the store and run background jobs until interrupted (default)
	Serve,
	/// Delete expired issued-token records once and exit
	Sweep,
	/// Show version and build information
	Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();
	let command = args.command.unwrap_or(Command::Serve);

	if command == Command::Version {
		println!("{}", version::format_version_info());
		return Ok(());
	}

	dotenvy::dotenv().ok();

	let config = match &args.config {
		Some(path) => pman_server_config::load_config_with_file(path)?,
		None => pman_server_config::load_config()?,
	};

	logging::init_tracing(&config.logging);
	config.log_summary();

	tracing::info!(
		database = %config.database.url,
		domain_name = %config.auth.domain_name,
		"starting pman-server"
	);

	let state = create_app_state(&config).await?;

	match command {
		Command::Sweep => {
			let removed = state.sessions.sweep_expired().await?;
			tracing::info!(removed, "expired token records swept");
		}
		Command::Serve => {
			let mut scheduler = JobScheduler::new();
			scheduler.register_periodic(
				Arc::new(TokenCleanupJob::new(state.sessions.clone())),
				Duration::from_secs(config.auth.token_cleanup_interval_secs),
			);
			scheduler.start().await;
			tracing::info!(jobs = ?scheduler.job_ids(), "background jobs started");

			tokio::signal::ctrl_c().await?;
			tracing::info!("Received shutdown signal");
			scheduler.shutdown().await;
			state.pool.close().await;
			tracing::info!("Server shutdown complete");
		}
		Command::Version => {}
	}

	Ok(())
}
