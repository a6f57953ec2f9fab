// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use sqlx::sqlite::SqlitePool;

use crate::error::DbError;

const MIGRATIONS: &[(&str, &str)] = &[
	(
		"001_create_identities",
		include_str!("../migrations/001_create_identities.sql"),
	),
	(
		"002_create_secrets",
		include_str!("../migrations/002_create_secrets.sql"),
	),
	(
		"003_create_revoked_tokens",
		include_str!("../migrations/003_create_revoked_tokens.sql"),
	),
];

/// Create every table and index. Safe to run on every start.
#[tracing::instrument(skip(pool))]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), DbError> {
	for (name, sql) in MIGRATIONS {
		for stmt in sql.split(';').filter(|s| !s.trim().is_empty()) {
			sqlx::query(stmt).execute(pool).await?;
		}
		tracing::debug!(migration = name, "migration applied");
	}
	Ok(())
}
