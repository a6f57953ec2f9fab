// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use pman_server_auth::{CredentialError, ErrorKind, GrantParseError, InvalidEmail, PasswordHashError};
use pman_server_db::DbError;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
	#[error(transparent)]
	Credential(#[from] CredentialError),

	#[error("validation error: {0}")]
	Validation(String),

	#[error("forbidden: {0}")]
	Forbidden(String),

	#[error("identity '{0}' not found")]
	NotFound(String),

	#[error("conflict: {0}")]
	Conflict(String),

	#[error("crypto failure: {0}")]
	Crypto(String),

	#[error("storage error: {0}")]
	Storage(DbError),
}

impl From<DbError> for SessionError {
	fn from(err: DbError) -> Self {
		match err {
			DbError::Conflict(msg) => SessionError::Conflict(msg),
			DbError::NotFound(msg) => SessionError::NotFound(msg),
			other => SessionError::Storage(other),
		}
	}
}

impl From<GrantParseError> for SessionError {
	fn from(err: GrantParseError) -> Self {
		SessionError::Validation(err.to_string())
	}
}

impl From<InvalidEmail> for SessionError {
	fn from(err: InvalidEmail) -> Self {
		SessionError::Validation(err.to_string())
	}
}

impl From<PasswordHashError> for SessionError {
	fn from(err: PasswordHashError) -> Self {
		SessionError::Crypto(err.to_string())
	}
}

impl SessionError {
	pub fn kind(&self) -> ErrorKind {
		match self {
			SessionError::Credential(_) => ErrorKind::Credential,
			SessionError::Validation(_) => ErrorKind::Validation,
			SessionError::Forbidden(_) => ErrorKind::Forbidden,
			SessionError::NotFound(_) => ErrorKind::NotFound,
			SessionError::Conflict(_) => ErrorKind::Conflict,
			SessionError::Crypto(_) => ErrorKind::CryptoFailure,
			SessionError::Storage(_) => ErrorKind::Storage,
		}
	}

	pub fn is_internal(&self) -> bool {
		self.kind().is_internal()
	}

	pub fn status_code(&self) -> u16 {
		self.kind().status_code()
	}

	/// The credential failure, if this is one.
	pub fn credential(&self) -> Option<CredentialError> {
		match self {
			SessionError::Credential(err) => Some(*err),
			_ => None,
		}
	}
}

pub type SessionResult<T> = Result<T, SessionError>;
