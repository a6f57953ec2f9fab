// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use pman_server_auth::ErrorKind;
use pman_server_db::DbError;

use crate::cipher::CipherError;
use crate::path::PathError;

#[derive(Debug, thiserror::Error)]
pub enum SecretsError {
	#[error("validation error: {0}")]
	Validation(#[from] PathError),

	#[error("{action} access to group '{group}' denied")]
	Forbidden { group: String, action: &'static str },

	#[error("secret '{path}' not found in group '{group}'")]
	NotFound { path: String, group: String },

	#[error("conflict: {0}")]
	Conflict(String),

	#[error("crypto failure: {0}")]
	Crypto(#[from] CipherError),

	#[error("storage error: {0}")]
	Storage(DbError),
}

impl From<DbError> for SecretsError {
	fn from(err: DbError) -> Self {
		match err {
			DbError::Conflict(msg) => SecretsError::Conflict(msg),
			other => SecretsError::Storage(other),
		}
	}
}

impl SecretsError {
	pub fn kind(&self) -> ErrorKind {
		match self {
			SecretsError::Validation(_) => ErrorKind::Validation,
			SecretsError::Forbidden { .. } => ErrorKind::Forbidden,
			SecretsError::NotFound { .. } => ErrorKind::NotFound,
			SecretsError::Conflict(_) => ErrorKind::Conflict,
			SecretsError::Crypto(_) => ErrorKind::CryptoFailure,
			SecretsError::Storage(_) => ErrorKind::Storage,
		}
	}

	pub fn is_internal(&self) -> bool {
		self.kind().is_internal()
	}

	pub fn status_code(&self) -> u16 {
		self.kind().status_code()
	}
}

pub type SecretsResult<T> = Result<T, SecretsError>;
