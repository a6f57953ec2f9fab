// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Identity records and the reserved bootstrap administrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::grants::{GrantParseError, GroupGrants};
use crate::role::Role;

/// Email of the administrator created on first start. It can never be
/// deleted, disabled or demoted.
pub const BOOTSTRAP_ADMIN_EMAIL: &str = "admin@pman.system";

/// Well-known initial password of the bootstrap administrator. This is a
/// documented default, not a secret; operators are expected to change it.
pub const BOOTSTRAP_ADMIN_PASSWORD: &str = "DefaultPassword";

pub const BOOTSTRAP_ADMIN_GRANTS: &str = "team1:read_write,team2:read_write";

pub fn is_bootstrap_admin(email: &str) -> bool {
	email == BOOTSTRAP_ADMIN_EMAIL
}

/// Unique identifier for an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(Uuid);

impl IdentityId {
	pub fn new(id: Uuid) -> Self {
		Self(id)
	}

	pub fn generate() -> Self {
		Self(Uuid::new_v4())
	}

	pub fn as_uuid(&self) -> &Uuid {
		&self.0
	}
}

impl fmt::Display for IdentityId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl From<Uuid> for IdentityId {
	fn from(id: Uuid) -> Self {
		Self(id)
	}
}

/// A login-capable account.
///
/// `group_grants` is kept in its serialized form; it is only ever written after
/// passing [`GroupGrants::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
	pub id: IdentityId,
	pub email: String,
	#[serde(skip_serializing)]
	pub password_hash: String,
	pub role: Role,
	pub group_grants: String,
	pub enabled: bool,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl Identity {
	/// Build a fresh, enabled identity.
	pub fn new(
		email: impl Into<String>,
		password_hash: impl Into<String>,
		role: Role,
		grants: &GroupGrants,
	) -> Self {
		let now = Utc::now();
		Self {
			id: IdentityId::generate(),
			email: email.into(),
			password_hash: password_hash.into(),
			role,
			group_grants: grants.to_string(),
			enabled: true,
			created_at: now,
			updated_at: now,
		}
	}

	pub fn is_bootstrap_admin(&self) -> bool {
		is_bootstrap_admin(&self.email)
	}

	pub fn grants(&self) -> Result<GroupGrants, GrantParseError> {
		GroupGrants::parse(&self.group_grants)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid email address '{0}'")]
pub struct InvalidEmail(pub String);

/// Minimal shape check: one `@` with something on both sides, no whitespace.
pub fn validate_email(email: &str) -> Result<(), InvalidEmail> {
	let valid = match email.split_once('@') {
		Some((local, domain)) => {
			!local.is_empty()
				&& !domain.is_empty()
				&& !domain.contains('@')
				&& !email.chars().any(char::is_whitespace)
		}
		None => false,
	};
	if valid {
		Ok(())
	} else {
		Err(InvalidEmail(email.to_string()))
	}
}
