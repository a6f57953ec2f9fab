// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error taxonomy shared by every pman service.

use std::fmt;

/// Coarse error class. Service errors report one of these through `kind()` so
/// a request layer can map them without matching on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// Malformed input; nothing was attempted.
	Validation,
	/// The caller's grants do not cover the operation; checked before any I/O.
	Forbidden,
	/// The addressed record does not exist.
	NotFound,
	/// Concurrent modification or duplicate key.
	Conflict,
	/// Encryption or decryption failed.
	CryptoFailure,
	/// Login or token failure.
	Credential,
	/// Persistence failure.
	Storage,
}

impl ErrorKind {
	pub fn status_code(&self) -> u16 {
		match self {
			ErrorKind::Validation => 400,
			ErrorKind::Credential => 401,
			ErrorKind::Forbidden => 403,
			ErrorKind::NotFound => 404,
			ErrorKind::Conflict => 409,
			ErrorKind::CryptoFailure | ErrorKind::Storage => 500,
		}
	}

	/// Internal errors are logged in detail and shown to callers generically.
	pub fn is_internal(&self) -> bool {
		matches!(self, ErrorKind::CryptoFailure | ErrorKind::Storage)
	}
}

impl fmt::Display for ErrorKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			ErrorKind::Validation => "validation_error",
			ErrorKind::Forbidden => "forbidden",
			ErrorKind::NotFound => "not_found",
			ErrorKind::Conflict => "conflict",
			ErrorKind::CryptoFailure => "crypto_failure",
			ErrorKind::Credential => "credential_error",
			ErrorKind::Storage => "storage_error",
		};
		f.write_str(s)
	}
}

/// Login and bearer-token failures.
///
/// Messages stay coarse: an unknown email and a wrong password are the same
/// [`CredentialError::InvalidCredentials`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
	#[error("invalid credentials")]
	InvalidCredentials,

	#[error("account is disabled")]
	AccountDisabled,

	#[error("token is malformed")]
	Malformed,

	#[error("token has expired")]
	Expired,

	#[error("token signature is invalid")]
	BadSignature,

	#[error("token has been revoked")]
	Revoked,
}
