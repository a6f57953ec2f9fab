// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Identity repository.
//!
//! Plain keyed storage by email. Rules about the bootstrap administrator and
//! grant validation live in the identity service, not here.

use async_trait::async_trait;
use chrono::Utc;
use pman_server_auth::{Identity, IdentityId, Role};
use sqlx::{sqlite::SqlitePool, Row};
use uuid::Uuid;

use crate::error::DbError;
use crate::time::{from_db_time, to_db_time};

#[async_trait]
pub trait IdentityStore: Send + Sync {
	async fn create_identity(&self, identity: &Identity) -> Result<(), DbError>;
	async fn get_identity_by_email(&self, email: &str) -> Result<Option<Identity>, DbError>;
	async fn list_identities(&self) -> Result<Vec<Identity>, DbError>;
	async fn update_role_and_grants(
		&self,
		email: &str,
		role: Role,
		group_grants: &str,
	) -> Result<bool, DbError>;
	async fn update_group_grants(&self, email: &str, group_grants: &str) -> Result<bool, DbError>;
	async fn set_enabled(&self, email: &str, enabled: bool) -> Result<bool, DbError>;
	async fn update_password_hash(&self, email: &str, password_hash: &str)
		-> Result<bool, DbError>;
	async fn delete_identity(&self, email: &str) -> Result<bool, DbError>;
}

#[async_trait]
impl IdentityStore for IdentityRepository {
	async fn create_identity(&self, identity: &Identity) -> Result<(), DbError> {
		self.create_identity(identity).await
	}

	async fn get_identity_by_email(&self, email: &str) -> Result<Option<Identity>, DbError> {
		self.get_identity_by_email(email).await
	}

	async fn list_identities(&self) -> Result<Vec<Identity>, DbError> {
		self.list_identities().await
	}

	async fn update_role_and_grants(
		&self,
		email: &str,
		role: Role,
		group_grants: &str,
	) -> Result<bool, DbError> {
		self.update_role_and_grants(email, role, group_grants).await
	}

	async fn update_group_grants(&self, email: &str, group_grants: &str) -> Result<bool, DbError> {
		self.update_group_grants(email, group_grants).await
	}

	async fn set_enabled(&self, email: &str, enabled: bool) -> Result<bool, DbError> {
		self.set_enabled(email, enabled).await
	}

	async fn update_password_hash(
		&self,
		email: &str,
		password_hash: &str,
	) -> Result<bool, DbError> {
		self.update_password_hash(email, password_hash).await
	}

	async fn delete_identity(&self, email: &str) -> Result<bool, DbError> {
		self.delete_identity(email).await
	}
}

/// Repository for identity rows.
///
/// Update and delete methods return `false` when no identity has the email.
#[derive(Clone)]
pub struct IdentityRepository {
	pool: SqlitePool,
}

impl IdentityRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Insert a new identity.
	///
	/// # Errors
	/// Returns `DbError::Conflict` if the email is already registered.
	#[tracing::instrument(skip(self, identity), fields(email = %identity.email))]
	pub async fn create_identity(&self, identity: &Identity) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO identities (
				id, email, password_hash, role, group_grants, enabled, created_at, updated_at
			) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(identity.id.to_string())
		.bind(&identity.email)
		.bind(&identity.password_hash)
		.bind(identity.role.as_str())
		.bind(&identity.group_grants)
		.bind(identity.enabled as i32)
		.bind(to_db_time(identity.created_at))
		.bind(to_db_time(identity.updated_at))
		.execute(&self.pool)
		.await
		.map_err(|e| {
			DbError::from_insert(e, || format!("identity {} already exists", identity.email))
		})?;

		tracing::debug!(email = %identity.email, "identity created");
		Ok(())
	}

	#[tracing::instrument(skip(self))]
	pub async fn get_identity_by_email(&self, email: &str) -> Result<Option<Identity>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, email, password_hash, role, group_grants, enabled, created_at, updated_at
			FROM identities
			WHERE email = ?
			"#,
		)
		.bind(email)
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| row_to_identity(&r)).transpose()
	}

	/// All identities ordered by email.
	#[tracing::instrument(skip(self))]
	pub async fn list_identities(&self) -> Result<Vec<Identity>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT id, email, password_hash, role, group_grants, enabled, created_at, updated_at
			FROM identities
			ORDER BY email
			"#,
		)
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(row_to_identity).collect()
	}

	#[tracing::instrument(skip(self, group_grants))]
	pub async fn update_role_and_grants(
		&self,
		email: &str,
		role: Role,
		group_grants: &str,
	) -> Result<bool, DbError> {
		let result = sqlx::query(
			r#"
			UPDATE identities
			SET role = ?, group_grants = ?, updated_at = ?
			WHERE email = ?
			"#,
		)
		.bind(role.as_str())
		.bind(group_grants)
		.bind(to_db_time(Utc::now()))
		.bind(email)
		.execute(&self.pool)
		.await?;

		Ok(result.rows_affected() > 0)
	}

	#[tracing::instrument(skip(self, group_grants))]
	pub async fn update_group_grants(&self, email: &str, group_grants: &str) -> Result<bool, DbError> {
		let result = sqlx::query(
			"UPDATE identities SET group_grants = ?, updated_at = ? WHERE email = ?",
		)
		.bind(group_grants)
		.bind(to_db_time(Utc::now()))
		.bind(email)
		.execute(&self.pool)
		.await?;

		Ok(result.rows_affected() > 0)
	}

	#[tracing::instrument(skip(self))]
	pub async fn set_enabled(&self, email: &str, enabled: bool) -> Result<bool, DbError> {
		let result = sqlx::query("UPDATE identities SET enabled = ?, updated_at = ? WHERE email = ?")
			.bind(enabled as i32)
			.bind(to_db_time(Utc::now()))
			.bind(email)
			.execute(&self.pool)
			.await?;

		let updated = result.rows_affected() > 0;
		if updated {
			tracing::debug!(email, enabled, "identity enabled flag changed");
		}
		Ok(updated)
	}

	#[tracing::instrument(skip(self, password_hash))]
	pub async fn update_password_hash(
		&self,
		email: &str,
		password_hash: &str,
	) -> Result<bool, DbError> {
		let result = sqlx::query(
			"UPDATE identities SET password_hash = ?, updated_at = ? WHERE email = ?",
		)
		.bind(password_hash)
		.bind(to_db_time(Utc::now()))
		.bind(email)
		.execute(&self.pool)
		.await?;

		Ok(result.rows_affected() > 0)
	}

	#[tracing::instrument(skip(self))]
	pub async fn delete_identity(&self, email: &str) -> Result<bool, DbError> {
		let result = sqlx::query("DELETE FROM identities WHERE email = ?")
			.bind(email)
			.execute(&self.pool)
			.await?;

		let deleted = result.rows_affected() > 0;
		if deleted {
			tracing::debug!(email, "identity deleted");
		}
		Ok(deleted)
	}
}

fn row_to_identity(row: &sqlx::sqlite::SqliteRow) -> Result<Identity, DbError> {
	let id_str: String = row.get("id");
	let id = Uuid::parse_str(&id_str)
		.map_err(|e| DbError::Internal(format!("Invalid identity ID: {e}")))?;

	let role_str: String = row.get("role");
	let role = role_str
		.parse::<Role>()
		.map_err(|e| DbError::Internal(e.to_string()))?;

	let created_at: String = row.get("created_at");
	let updated_at: String = row.get("updated_at");
	let enabled: i32 = row.get("enabled");

	Ok(Identity {
		id: IdentityId::new(id),
		email: row.get("email"),
		password_hash: row.get("password_hash"),
		role,
		group_grants: row.get("group_grants"),
		enabled: enabled != 0,
		created_at: from_db_time("created_at", &created_at)?,
		updated_at: from_db_time("updated_at", &updated_at)?,
	})
}
