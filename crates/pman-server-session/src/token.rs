// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Signed session tokens.
//!
//! Tokens are HS256 JWTs carrying `{email, role, iat, exp, iss}`. Any verifier
//! holding the same secret can check them without a lookup; revocation is
//! layered on top by [`crate::SessionAuthority`].

use chrono::{DateTime, Utc};
use jsonwebtoken::{
	decode, encode, errors::ErrorKind as JwtErrorKind, Algorithm, DecodingKey, EncodingKey, Header,
	Validation,
};
use pman_common_secret::SecretString;
use pman_server_auth::{CredentialError, Role};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SessionError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
	pub email: String,
	pub role: Role,
	/// Issued at, seconds since the epoch.
	pub iat: i64,
	/// Expires at, seconds since the epoch.
	pub exp: i64,
	pub iss: String,
}

impl Claims {
	pub fn expires_at(&self) -> DateTime<Utc> {
		DateTime::from_timestamp(self.exp, 0).unwrap_or(DateTime::<Utc>::MAX_UTC)
	}

	pub fn issued_at(&self) -> DateTime<Utc> {
		DateTime::from_timestamp(self.iat, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
	}
}

pub struct TokenCodec {
	encoding_key: EncodingKey,
	decoding_key: DecodingKey,
	issuer: String,
	validation: Validation,
}

impl TokenCodec {
	/// `secret` is the process-wide signing secret; `issuer` is the
	/// deployment's domain name and is required on every token.
	pub fn new(secret: &[u8], issuer: impl Into<String>) -> Self {
		let issuer = issuer.into();

		let mut validation = Validation::new(Algorithm::HS256);
		validation.leeway = 0;
		validation.set_issuer(&[issuer.as_str()]);
		validation.set_required_spec_claims(&["exp", "iss"]);

		Self {
			encoding_key: EncodingKey::from_secret(secret),
			decoding_key: DecodingKey::from_secret(secret),
			issuer,
			validation,
		}
	}

	pub fn issuer(&self) -> &str {
		&self.issuer
	}

	/// Sign a token for `email` valid until `expires_at`.
	pub fn issue(
		&self,
		email: &str,
		role: Role,
		expires_at: DateTime<Utc>,
	) -> Result<(SecretString, Claims), SessionError> {
		let claims = Claims {
			email: email.to_string(),
			role,
			iat: Utc::now().timestamp(),
			exp: expires_at.timestamp(),
			iss: self.issuer.clone(),
		};
		let token = self.encode(&claims)?;
		Ok((token, claims))
	}

	pub fn encode(&self, claims: &Claims) -> Result<SecretString, SessionError> {
		encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
			.map(SecretString::new)
			.map_err(|e| SessionError::Crypto(format!("failed to sign token: {e}")))
	}

	/// Check signature, issuer and expiry.
	///
	/// The signature is verified before any claim, so a forged token is
	/// `BadSignature` even when it is also expired.
	pub fn decode(&self, token: &str) -> Result<Claims, CredentialError> {
		decode::<Claims>(token, &self.decoding_key, &self.validation)
			.map(|data| data.claims)
			.map_err(|e| map_jwt_error(e.kind()))
	}
}

fn map_jwt_error(kind: &JwtErrorKind) -> CredentialError {
	match kind {
		JwtErrorKind::ExpiredSignature => CredentialError::Expired,
		JwtErrorKind::InvalidSignature
		| JwtErrorKind::InvalidIssuer
		| JwtErrorKind::InvalidAlgorithm
		| JwtErrorKind::ImmatureSignature => CredentialError::BadSignature,
		_ => CredentialError::Malformed,
	}
}

impl fmt::Debug for TokenCodec {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TokenCodec")
			.field("issuer", &self.issuer)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Duration;

	fn codec() -> TokenCodec {
		TokenCodec::new(b"test-signing-secret", "pman.example.com")
	}

	#[test]
	fn issue_then_decode() {
		let codec = codec();
		let expires = Utc::now() + Duration::days(1);
		let (token, claims) = codec.issue("a@x", Role::Admin, expires).unwrap();

		let decoded = codec.decode(token.expose()).unwrap();
		assert_eq!(decoded, claims);
		assert_eq!(decoded.role, Role::Admin);
		assert_eq!(decoded.iss, "pman.example.com");
		assert_eq!(decoded.expires_at().timestamp(), expires.timestamp());
	}

	#[test]
	fn garbage_is_malformed() {
		assert_eq!(codec().decode("not-a-token"), Err(CredentialError::Malformed));
		assert_eq!(codec().decode(""), Err(CredentialError::Malformed));
	}

	#[test]
	fn other_secret_is_bad_signature() {
		let other = TokenCodec::new(b"another-secret", "pman.example.com");
		let (token, _) = other
			.issue("a@x", Role::User, Utc::now() + Duration::days(1))
			.unwrap();
		assert_eq!(codec().decode(token.expose()), Err(CredentialError::BadSignature));
	}

	#[test]
	fn other_issuer_is_bad_signature() {
		let other = TokenCodec::new(b"test-signing-secret", "elsewhere.example.com");
		let (token, _) = other
			.issue("a@x", Role::User, Utc::now() + Duration::days(1))
			.unwrap();
		assert_eq!(codec().decode(token.expose()), Err(CredentialError::BadSignature));
	}

	#[test]
	fn past_expiry_is_expired() {
		let (token, _) = codec()
			.issue("a@x", Role::User, Utc::now() - Duration::seconds(30))
			.unwrap();
		assert_eq!(codec().decode(token.expose()), Err(CredentialError::Expired));
	}

	#[test]
	fn forged_and_expired_reports_signature_first() {
		let other = TokenCodec::new(b"another-secret", "pman.example.com");
		let (token, _) = other
			.issue("a@x", Role::User, Utc::now() - Duration::days(1))
			.unwrap();
		assert_eq!(codec().decode(token.expose()), Err(CredentialError::BadSignature));
	}

	#[test]
	fn tampered_payload_is_rejected() {
		let codec = codec();
		let (token, _) = codec
			.issue("a@x", Role::User, Utc::now() + Duration::days(1))
			.unwrap();
		let (forged, _) = TokenCodec::new(b"x", "pman.example.com")
			.issue("a@x", Role::Admin, Utc::now() + Duration::days(1))
			.unwrap();
		let forged_payload = forged.expose().split('.').nth(1).unwrap().to_string();
		let mut parts: Vec<&str> = token.expose().split('.').collect();
		parts[1] = &forged_payload;

		assert_eq!(
			codec.decode(&parts.join(".")),
			Err(CredentialError::BadSignature)
		);
	}

	#[test]
	fn debug_hides_keys() {
		let debug = format!("{:?}", codec());
		assert!(debug.contains("pman.example.com"));
		assert!(!debug.contains("test-signing-secret"));
	}
}
