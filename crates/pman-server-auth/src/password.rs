// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Account password hashing and generation.

use std::sync::OnceLock;

use argon2::password_hash::{
	rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use pman_common_secret::SecretString;
use rand::{distributions::Alphanumeric, Rng};

use crate::argon2_config::argon2_instance;

/// Length of passwords handed out to newly created identities.
pub const GENERATED_PASSWORD_LEN: usize = 16;

#[derive(Debug, thiserror::Error)]
#[error("password hashing failed: {0}")]
pub struct PasswordHashError(String);

/// Hash a password into a PHC string (`$argon2id$...`).
pub fn hash_password(password: &str) -> Result<String, PasswordHashError> {
	let salt = SaltString::generate(&mut OsRng);
	argon2_instance()
		.hash_password(password.as_bytes(), &salt)
		.map(|hash| hash.to_string())
		.map_err(|e| PasswordHashError(e.to_string()))
}

/// Check a password against a stored PHC string. Unparsable hashes never match.
pub fn verify_password(password: &str, hash: &str) -> bool {
	let Ok(parsed) = PasswordHash::new(hash) else {
		return false;
	};
	argon2_instance()
		.verify_password(password.as_bytes(), &parsed)
		.is_ok()
}

/// Spend the same work as a real verification against a throwaway hash.
///
/// Used on the unknown-email login path so response time does not reveal
/// whether an account exists.
pub fn dummy_verify(password: &str) {
	static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();
	let hash = DUMMY_HASH.get_or_init(|| hash_password("pman-dummy-credential").ok());
	if let Some(hash) = hash {
		let _ = verify_password(password, hash);
	}
}

/// Random alphanumeric password for a newly created identity.
pub fn generate_password() -> SecretString {
	let password: String = rand::thread_rng()
		.sample_iter(&Alphanumeric)
		.take(GENERATED_PASSWORD_LEN)
		.map(char::from)
		.collect();
	SecretString::new(password)
}
