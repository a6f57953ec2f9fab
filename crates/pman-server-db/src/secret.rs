// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Secret row repository.
//!
//! Rows are keyed by `(path, group_name)` and hold an already-encrypted value.
//! There are no folder rows: a folder exists only while some path starts with
//! `folder/`. Prefix filters compare with `substr` so `%` and `_` inside paths
//! are matched literally.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePool, Row};

use crate::error::DbError;
use crate::time::{from_db_time, to_db_time};

/// A stored secret, value still encrypted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretRecord {
	pub path: String,
	pub group_name: String,
	pub encrypted_value: String,
	pub created_by: String,
	pub updated_by: String,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

/// Provenance of a secret without its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretInfo {
	pub path: String,
	pub group_name: String,
	pub created_by: String,
	pub updated_by: String,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait SecretRowStore: Send + Sync {
	async fn upsert_secret(
		&self,
		path: &str,
		group_name: &str,
		encrypted_value: &str,
		actor: &str,
	) -> Result<(), DbError>;
	async fn get_secret(&self, path: &str, group_name: &str)
		-> Result<Option<SecretRecord>, DbError>;
	async fn get_secret_info(
		&self,
		path: &str,
		group_name: &str,
	) -> Result<Option<SecretInfo>, DbError>;
	async fn update_secret_value(
		&self,
		path: &str,
		group_name: &str,
		encrypted_value: &str,
		actor: &str,
	) -> Result<bool, DbError>;
	async fn delete_secret(&self, path: &str, group_name: &str) -> Result<bool, DbError>;
	async fn delete_secrets_under(&self, prefix: &str, group_name: &str) -> Result<u64, DbError>;
	async fn list_secret_paths(
		&self,
		group_name: &str,
		prefix: Option<&str>,
	) -> Result<Vec<String>, DbError>;
}

#[async_trait]
impl SecretRowStore for SecretRowRepository {
	async fn upsert_secret(
		&self,
		path: &str,
		group_name: &str,
		encrypted_value: &str,
		actor: &str,
	) -> Result<(), DbError> {
		self.upsert_secret(path, group_name, encrypted_value, actor)
			.await
	}

	async fn get_secret(
		&self,
		path: &str,
		group_name: &str,
	) -> Result<Option<SecretRecord>, DbError> {
		self.get_secret(path, group_name).await
	}

	async fn get_secret_info(
		&self,
		path: &str,
		group_name: &str,
	) -> Result<Option<SecretInfo>, DbError> {
		self.get_secret_info(path, group_name).await
	}

	async fn update_secret_value(
		&self,
		path: &str,
		group_name: &str,
		encrypted_value: &str,
		actor: &str,
	) -> Result<bool, DbError> {
		self.update_secret_value(path, group_name, encrypted_value, actor)
			.await
	}

	async fn delete_secret(&self, path: &str, group_name: &str) -> Result<bool, DbError> {
		self.delete_secret(path, group_name).await
	}

	async fn delete_secrets_under(&self, prefix: &str, group_name: &str) -> Result<u64, DbError> {
		self.delete_secrets_under(prefix, group_name).await
	}

	async fn list_secret_paths(
		&self,
		group_name: &str,
		prefix: Option<&str>,
	) -> Result<Vec<String>, DbError> {
		self.list_secret_paths(group_name, prefix).await
	}
}

#[derive(Clone)]
pub struct SecretRowRepository {
	pool: SqlitePool,
}

impl SecretRowRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Insert or overwrite the row for `(path, group_name)`.
	///
	/// An overwrite keeps the original `created_by`/`created_at` and records
	/// `actor` as the updater. Concurrent writers to one key resolve last
	/// writer wins inside SQLite.
	#[tracing::instrument(skip(self, encrypted_value))]
	pub async fn upsert_secret(
		&self,
		path: &str,
		group_name: &str,
		encrypted_value: &str,
		actor: &str,
	) -> Result<(), DbError> {
		let now = to_db_time(Utc::now());
		sqlx::query(
			r#"
			INSERT INTO secrets (
				path, group_name, encrypted_value, created_by, updated_by, created_at, updated_at
			) VALUES (?, ?, ?, ?, ?, ?, ?)
			ON CONFLICT(path, group_name) DO UPDATE SET
				encrypted_value = excluded.encrypted_value,
				updated_by = excluded.updated_by,
				updated_at = excluded.updated_at
			"#,
		)
		.bind(path)
		.bind(group_name)
		.bind(encrypted_value)
		.bind(actor)
		.bind(actor)
		.bind(&now)
		.bind(&now)
		.execute(&self.pool)
		.await?;

		tracing::debug!(path, group_name, "secret written");
		Ok(())
	}

	#[tracing::instrument(skip(self))]
	pub async fn get_secret(
		&self,
		path: &str,
		group_name: &str,
	) -> Result<Option<SecretRecord>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT path, group_name, encrypted_value, created_by, updated_by, created_at, updated_at
			FROM secrets
			WHERE path = ? AND group_name = ?
			"#,
		)
		.bind(path)
		.bind(group_name)
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| {
			let info = row_to_info(&r)?;
			Ok(SecretRecord {
				path: info.path,
				group_name: info.group_name,
				encrypted_value: r.get("encrypted_value"),
				created_by: info.created_by,
				updated_by: info.updated_by,
				created_at: info.created_at,
				updated_at: info.updated_at,
			})
		})
		.transpose()
	}

	/// Like [`Self::get_secret`] but never selects the encrypted value.
	#[tracing::instrument(skip(self))]
	pub async fn get_secret_info(
		&self,
		path: &str,
		group_name: &str,
	) -> Result<Option<SecretInfo>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT path, group_name, created_by, updated_by, created_at, updated_at
			FROM secrets
			WHERE path = ? AND group_name = ?
			"#,
		)
		.bind(path)
		.bind(group_name)
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| row_to_info(&r)).transpose()
	}

	/// Replace the value of an existing row. Returns `false` and writes nothing
	/// when the row is absent.
	#[tracing::instrument(skip(self, encrypted_value))]
	pub async fn update_secret_value(
		&self,
		path: &str,
		group_name: &str,
		encrypted_value: &str,
		actor: &str,
	) -> Result<bool, DbError> {
		let result = sqlx::query(
			r#"
			UPDATE secrets
			SET encrypted_value = ?, updated_by = ?, updated_at = ?
			WHERE path = ? AND group_name = ?
			"#,
		)
		.bind(encrypted_value)
		.bind(actor)
		.bind(to_db_time(Utc::now()))
		.bind(path)
		.bind(group_name)
		.execute(&self.pool)
		.await?;

		Ok(result.rows_affected() > 0)
	}

	#[tracing::instrument(skip(self))]
	pub async fn delete_secret(&self, path: &str, group_name: &str) -> Result<bool, DbError> {
		let result = sqlx::query("DELETE FROM secrets WHERE path = ? AND group_name = ?")
			.bind(path)
			.bind(group_name)
			.execute(&self.pool)
			.await?;

		let deleted = result.rows_affected() > 0;
		if deleted {
			tracing::debug!(path, group_name, "secret deleted");
		}
		Ok(deleted)
	}

	/// Delete `prefix` itself and everything below it, honouring segment
	/// boundaries: `team/db` removes `team/db` and `team/db/user` but not
	/// `team/dbx`. Returns the number of rows removed.
	#[tracing::instrument(skip(self))]
	pub async fn delete_secrets_under(&self, prefix: &str, group_name: &str) -> Result<u64, DbError> {
		let prefix = prefix.trim_end_matches('/');
		let child_prefix = format!("{prefix}/");

		let result = sqlx::query(
			r#"
			DELETE FROM secrets
			WHERE group_name = ?
			  AND (path = ? OR substr(path, 1, length(?)) = ?)
			"#,
		)
		.bind(group_name)
		.bind(prefix)
		.bind(&child_prefix)
		.bind(&child_prefix)
		.execute(&self.pool)
		.await?;

		let count = result.rows_affected();
		tracing::debug!(prefix, group_name, count, "secrets deleted recursively");
		Ok(count)
	}

	/// Paths in the group, byte-lexicographically ordered. `prefix` is a raw
	/// string prefix, so `a/b` also matches `a/bc`.
	#[tracing::instrument(skip(self))]
	pub async fn list_secret_paths(
		&self,
		group_name: &str,
		prefix: Option<&str>,
	) -> Result<Vec<String>, DbError> {
		let rows = match prefix.filter(|p| !p.is_empty()) {
			Some(prefix) => {
				sqlx::query(
					r#"
					SELECT path FROM secrets
					WHERE group_name = ? AND substr(path, 1, length(?)) = ?
					ORDER BY path
					"#,
				)
				.bind(group_name)
				.bind(prefix)
				.bind(prefix)
				.fetch_all(&self.pool)
				.await?
			}
			None => {
				sqlx::query("SELECT path FROM secrets WHERE group_name = ? ORDER BY path")
					.bind(group_name)
					.fetch_all(&self.pool)
					.await?
			}
		};

		Ok(rows.iter().map(|r| r.get("path")).collect())
	}
}

fn row_to_info(row: &sqlx::sqlite::SqliteRow) -> Result<SecretInfo, DbError> {
	let created_at: String = row.get("created_at");
	let updated_at: String = row.get("updated_at");

	Ok(SecretInfo {
		path: row.get("path"),
		group_name: row.get("group_name"),
		created_by: row.get("created_by"),
		updated_by: row.get("updated_by"),
		created_at: from_db_time("created_at", &created_at)?,
		updated_at: from_db_time("updated_at", &updated_at)?,
	})
}
