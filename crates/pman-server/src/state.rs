// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use anyhow::Context;
use pman_server_config::ServerConfig;
use pman_server_db::{IdentityRepository, IssuedTokenRepository, SecretRowRepository, SqlitePool};
use pman_server_secrets::{SecretCipher, SecretsService};
use pman_server_session::{IdentityService, SessionAuthority, SessionConfig, TokenCodec};

/// Shared services for a running server.
#[derive(Clone)]
pub struct AppState {
	pub pool: SqlitePool,
	pub secrets: SecretsService,
	pub sessions: SessionAuthority,
	pub identities: IdentityService,
}

/// Open the configured database and build the services on top of it.
pub async fn create_app_state(config: &ServerConfig) -> anyhow::Result<AppState> {
	if let Some(path) = config.database.file_path() {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			std::fs::create_dir_all(parent)
				.with_context(|| format!("creating database directory {}", parent.display()))?;
		}
	}

	let pool = pman_server_db::create_pool(&config.database.url)
		.await
		.context("opening database")?;
	pman_server_db::run_migrations(&pool)
		.await
		.context("running migrations")?;

	create_app_state_with_pool(pool, config).await
}

/// Build the services over an already migrated pool.
pub async fn create_app_state_with_pool(
	pool: SqlitePool,
	config: &ServerConfig,
) -> anyhow::Result<AppState> {
	let key_material = config.crypto.encryption_key.expose();
	let cipher = Arc::new(SecretCipher::from_passphrase(key_material));
	let codec = Arc::new(TokenCodec::new(
		config.crypto.key_bytes(),
		config.auth.domain_name.clone(),
	));

	let identity_store = Arc::new(IdentityRepository::new(pool.clone()));
	let token_store = Arc::new(IssuedTokenRepository::new(pool.clone()));
	let secret_store = Arc::new(SecretRowRepository::new(pool.clone()));

	let sessions = SessionAuthority::new(
		identity_store.clone(),
		token_store,
		codec,
		SessionConfig {
			default_expire_days: config.auth.default_expire_days,
			untracked_tokens_allowed: config.auth.untracked_tokens_allowed,
		},
	);
	let identities = IdentityService::new(identity_store, sessions.clone());
	let secrets = SecretsService::new(secret_store, cipher);

	let created = identities
		.ensure_bootstrap_admin()
		.await
		.context("ensuring bootstrap administrator")?;
	if created {
		tracing::info!("bootstrap administrator created");
	}

	Ok(AppState {
		pool,
		secrets,
		sessions,
		identities,
	})
}
