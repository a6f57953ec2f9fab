// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Issued-token repository.
//!
//! Tracks SHA-256 hashes of issued bearer tokens so they can be revoked
//! before they expire. The bearer token itself is never stored.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePool, Row};

use crate::error::DbError;
use crate::time::{from_db_time, to_db_time};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
	pub token_hash: String,
	pub user_email: String,
	pub expires_at: DateTime<Utc>,
	pub revoked: bool,
	pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait IssuedTokenStore: Send + Sync {
	async fn record_token(
		&self,
		token_hash: &str,
		user_email: &str,
		expires_at: DateTime<Utc>,
	) -> Result<(), DbError>;
	async fn get_unexpired_token(&self, token_hash: &str) -> Result<Option<IssuedToken>, DbError>;
	async fn revoke_tokens_for_user(&self, user_email: &str) -> Result<u64, DbError>;
	async fn cleanup_expired_tokens(&self) -> Result<u64, DbError>;
}

#[async_trait]
impl IssuedTokenStore for IssuedTokenRepository {
	async fn record_token(
		&self,
		token_hash: &str,
		user_email: &str,
		expires_at: DateTime<Utc>,
	) -> Result<(), DbError> {
		self.record_token(token_hash, user_email, expires_at).await
	}

	async fn get_unexpired_token(&self, token_hash: &str) -> Result<Option<IssuedToken>, DbError> {
		self.get_unexpired_token(token_hash).await
	}

	async fn revoke_tokens_for_user(&self, user_email: &str) -> Result<u64, DbError> {
		self.revoke_tokens_for_user(user_email).await
	}

	async fn cleanup_expired_tokens(&self) -> Result<u64, DbError> {
		self.cleanup_expired_tokens().await
	}
}

#[derive(Clone)]
pub struct IssuedTokenRepository {
	pool: SqlitePool,
}

impl IssuedTokenRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Remember an issued token by hash. Recording the same hash twice is a no-op.
	#[tracing::instrument(skip(self, token_hash))]
	pub async fn record_token(
		&self,
		token_hash: &str,
		user_email: &str,
		expires_at: DateTime<Utc>,
	) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO revoked_tokens (token_hash, user_email, expires_at, revoked, created_at)
			VALUES (?, ?, ?, 0, ?)
			ON CONFLICT(token_hash) DO NOTHING
			"#,
		)
		.bind(token_hash)
		.bind(user_email)
		.bind(to_db_time(expires_at))
		.bind(to_db_time(Utc::now()))
		.execute(&self.pool)
		.await?;

		tracing::debug!(user_email, "issued token recorded");
		Ok(())
	}

	/// Look up a tracked token that has not yet expired.
	#[tracing::instrument(skip(self, token_hash))]
	pub async fn get_unexpired_token(&self, token_hash: &str) -> Result<Option<IssuedToken>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT token_hash, user_email, expires_at, revoked, created_at
			FROM revoked_tokens
			WHERE token_hash = ? AND expires_at > ?
			"#,
		)
		.bind(token_hash)
		.bind(to_db_time(Utc::now()))
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| row_to_token(&r)).transpose()
	}

	/// Revoke every live, not yet revoked token of a user.
	///
	/// # Returns
	/// Number of tokens newly revoked.
	#[tracing::instrument(skip(self))]
	pub async fn revoke_tokens_for_user(&self, user_email: &str) -> Result<u64, DbError> {
		let result = sqlx::query(
			r#"
			UPDATE revoked_tokens
			SET revoked = 1
			WHERE user_email = ? AND revoked = 0 AND expires_at > ?
			"#,
		)
		.bind(user_email)
		.bind(to_db_time(Utc::now()))
		.execute(&self.pool)
		.await?;

		let count = result.rows_affected();
		tracing::debug!(user_email, count, "revoked tokens for user");
		Ok(count)
	}

	/// Delete tracked tokens whose expiry has passed. They can no longer
	/// validate, so removing them never changes an outcome.
	#[tracing::instrument(skip(self))]
	pub async fn cleanup_expired_tokens(&self) -> Result<u64, DbError> {
		let result = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at <= ?")
			.bind(to_db_time(Utc::now()))
			.execute(&self.pool)
			.await?;

		let count = result.rows_affected();
		if count > 0 {
			tracing::debug!(count, "expired tokens deleted");
		}
		Ok(count)
	}
}

fn row_to_token(row: &sqlx::sqlite::SqliteRow) -> Result<IssuedToken, DbError> {
	let expires_at: String = row.get("expires_at");
	let created_at: String = row.get("created_at");
	let revoked: i32 = row.get("revoked");

	Ok(IssuedToken {
		token_hash: row.get("token_hash"),
		user_email: row.get("user_email"),
		expires_at: from_db_time("expires_at", &expires_at)?,
		revoked: revoked != 0,
		created_at: from_db_time("created_at", &created_at)?,
	})
}
