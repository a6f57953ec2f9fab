// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Login, token issuance and revocation.
//!
//! A token is valid when its signature, issuer and expiry check out, its hash
//! is not marked revoked, and its identity still exists and is enabled.
//! Only the SHA-256 of a token is ever stored.

use chrono::{DateTime, TimeDelta, Utc};
use pman_common_secret::SecretString;
use pman_server_auth::{
	dummy_verify, hash_token, verify_password, CredentialError, Identity, Role,
};
use pman_server_db::{IdentityStore, IssuedTokenStore};
use std::sync::Arc;
use tracing::instrument;

use crate::error::{SessionError, SessionResult};
use crate::token::{Claims, TokenCodec};

/// Token lifetime used when the caller asks for none.
pub const DEFAULT_EXPIRE_DAYS: i64 = 24;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
	pub default_expire_days: i64,
	/// Whether a correctly signed token whose hash was never recorded counts
	/// as live. When `false` such tokens are `Revoked`.
	pub untracked_tokens_allowed: bool,
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			default_expire_days: DEFAULT_EXPIRE_DAYS,
			untracked_tokens_allowed: true,
		}
	}
}

/// A freshly signed token and its claims.
#[derive(Debug, Clone)]
pub struct IssuedSession {
	pub token: SecretString,
	pub claims: Claims,
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
	pub token: SecretString,
	pub claims: Claims,
	pub identity: Identity,
}

#[derive(Clone)]
pub struct SessionAuthority {
	identities: Arc<dyn IdentityStore>,
	tokens: Arc<dyn IssuedTokenStore>,
	codec: Arc<TokenCodec>,
	config: SessionConfig,
}

impl SessionAuthority {
	pub fn new(
		identities: Arc<dyn IdentityStore>,
		tokens: Arc<dyn IssuedTokenStore>,
		codec: Arc<TokenCodec>,
		config: SessionConfig,
	) -> Self {
		Self {
			identities,
			tokens,
			codec,
			config,
		}
	}

	pub fn config(&self) -> &SessionConfig {
		&self.config
	}

	/// Check an email and password pair.
	///
	/// Unknown emails and wrong passwords both fail with
	/// `InvalidCredentials`, and both cost one Argon2 verification.
	/// `AccountDisabled` is only reported once the password is correct.
	#[instrument(skip(self, password))]
	pub async fn authenticate(&self, email: &str, password: &str) -> SessionResult<Identity> {
		let Some(identity) = self.identities.get_identity_by_email(email).await? else {
			dummy_verify(password);
			tracing::warn!(email, "login failed");
			return Err(CredentialError::InvalidCredentials.into());
		};

		if !verify_password(password, &identity.password_hash) {
			tracing::warn!(email, "login failed");
			return Err(CredentialError::InvalidCredentials.into());
		}

		if !identity.enabled {
			tracing::warn!(email, "login refused for disabled account");
			return Err(CredentialError::AccountDisabled.into());
		}

		Ok(identity)
	}

	/// Authenticate, then issue and record a token.
	///
	/// `ttl_days` falls back to the configured default when absent or not
	/// positive.
	#[instrument(skip(self, password))]
	pub async fn login(
		&self,
		email: &str,
		password: &str,
		ttl_days: Option<i64>,
	) -> SessionResult<LoginOutcome> {
		let identity = self.authenticate(email, password).await?;

		let IssuedSession { token, claims } =
			self.issue_token(&identity.email, identity.role, ttl_days)?;
		self.record_issued_token(token.expose(), &identity.email, claims.expires_at())
			.await?;

		tracing::info!(email = %identity.email, expires_at = %claims.expires_at(), "login succeeded");
		Ok(LoginOutcome {
			token,
			claims,
			identity,
		})
	}

	/// Sign a token. Does not record it; see [`Self::record_issued_token`].
	pub fn issue_token(
		&self,
		email: &str,
		role: Role,
		ttl_days: Option<i64>,
	) -> SessionResult<IssuedSession> {
		let days = ttl_days
			.filter(|days| *days > 0)
			.unwrap_or(self.config.default_expire_days);
		let expires_at = TimeDelta::try_days(days)
			.and_then(|ttl| Utc::now().checked_add_signed(ttl))
			.ok_or_else(|| {
				SessionError::Validation(format!("token lifetime of {days} days is out of range"))
			})?;

		let (token, claims) = self.codec.issue(email, role, expires_at)?;
		Ok(IssuedSession { token, claims })
	}

	/// Remember a token's hash so it can be revoked later.
	///
	/// The row is kept until [`tracked_until`] of `expires_at`, the first
	/// instant the signature check rejects the token.
	#[instrument(skip(self, token))]
	pub async fn record_issued_token(
		&self,
		token: &str,
		email: &str,
		expires_at: DateTime<Utc>,
	) -> SessionResult<()> {
		self.tokens
			.record_token(&hash_token(token), email, tracked_until(expires_at))
			.await?;
		Ok(())
	}

	/// Whether the token's hash is marked revoked.
	///
	/// A hash that was never recorded counts as not revoked unless
	/// `untracked_tokens_allowed` is off.
	#[instrument(skip(self, token))]
	pub async fn is_revoked(&self, token: &str) -> SessionResult<bool> {
		let hash = hash_token(token);
		match self.tokens.get_unexpired_token(&hash).await? {
			Some(tracked) => Ok(tracked.revoked),
			None => {
				if !self.config.untracked_tokens_allowed {
					tracing::debug!(token_hash = &hash[..12], "untracked token rejected");
				}
				Ok(!self.config.untracked_tokens_allowed)
			}
		}
	}

	/// Revoke every live token of `email`. Returns how many were revoked.
	#[instrument(skip(self))]
	pub async fn revoke_all_for_user(&self, email: &str) -> SessionResult<u64> {
		let count = self.tokens.revoke_tokens_for_user(email).await?;
		tracing::info!(email, count, "revoked tokens for user");
		Ok(count)
	}

	/// Full token check.
	///
	/// Signature and expiry are checked locally first; storage is only
	/// consulted for a token that passes them.
	#[instrument(skip(self, token))]
	pub async fn validate(&self, token: &str) -> SessionResult<Claims> {
		let claims = self.codec.decode(token)?;

		if self.is_revoked(token).await? {
			tracing::debug!(email = %claims.email, "revoked token presented");
			return Err(CredentialError::Revoked.into());
		}

		match self.identities.get_identity_by_email(&claims.email).await? {
			Some(identity) if identity.enabled => Ok(claims),
			Some(_) => {
				tracing::debug!(email = %claims.email, "token of disabled identity presented");
				Err(CredentialError::Revoked.into())
			}
			None => {
				tracing::debug!(email = %claims.email, "token of deleted identity presented");
				Err(CredentialError::Revoked.into())
			}
		}
	}

	/// Delete tracked tokens past their expiry. Safe to run at any time.
	#[instrument(skip(self))]
	pub async fn sweep_expired(&self) -> SessionResult<u64> {
		let count = self.tokens.cleanup_expired_tokens().await?;
		tracing::info!(count, "expired tokens swept");
		Ok(count)
	}
}

/// `exp` is whole seconds and a token still decodes during second `exp`
/// itself, so tracking must outlive it by one second.
pub fn tracked_until(expires_at: DateTime<Utc>) -> DateTime<Utc> {
	expires_at
		.timestamp()
		.checked_add(1)
		.and_then(|secs| DateTime::from_timestamp(secs, 0))
		.unwrap_or(DateTime::<Utc>::MAX_UTC)
}
