// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authorization primitives for pman.
//!
//! - [`grants`]: parsing `group:permission` strings and the read/write check
//! - [`Role`]: closed set of account roles
//! - [`Identity`]: account record, plus the reserved bootstrap administrator
//! - [`password`]: Argon2id hashing and generated passwords
//! - [`hash_token`]: one-way fingerprint of bearer tokens for the revocation store
//! - [`ErrorKind`] / [`CredentialError`]: error taxonomy shared by the services

mod argon2_config;
pub mod error;
pub mod grants;
pub mod identity;
pub mod password;
pub mod role;

pub use error::{CredentialError, ErrorKind};
pub use grants::{authorize, parse_grants, GrantParseError, GroupGrant, GroupGrants, Permission};
pub use identity::{
	is_bootstrap_admin, validate_email, Identity, IdentityId, InvalidEmail, BOOTSTRAP_ADMIN_EMAIL,
	BOOTSTRAP_ADMIN_GRANTS, BOOTSTRAP_ADMIN_PASSWORD,
};
pub use password::{
	dummy_verify, generate_password, hash_password, verify_password, PasswordHashError,
};
pub use role::{Role, UnknownRole};

pub use pman_common_secret::{Secret, SecretString};

/// SHA-256 of a bearer token, hex encoded.
///
/// Only this value is persisted, so a copy of the database does not yield
/// usable sessions.
pub fn hash_token(token: &str) -> String {
	use sha2::{Digest, Sha256};
	let mut hasher = Sha256::new();
	hasher.update(token.as_bytes());
	hex::encode(hasher.finalize())
}
