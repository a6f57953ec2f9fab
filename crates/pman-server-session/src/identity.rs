// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Identity administration.
//!
//! Enforces the rules storage does not: the bootstrap administrator is
//! permanent and stays an admin, grant strings must parse before they are
//! stored, and disabling or deleting an identity revokes its tokens.

use pman_common_secret::SecretString;
use pman_server_auth::{
	generate_password, hash_password, is_bootstrap_admin, validate_email, GroupGrants, Identity,
	Role, BOOTSTRAP_ADMIN_EMAIL, BOOTSTRAP_ADMIN_GRANTS, BOOTSTRAP_ADMIN_PASSWORD,
};
use pman_server_db::IdentityStore;
use std::sync::Arc;
use tracing::instrument;

use crate::authority::SessionAuthority;
use crate::error::{SessionError, SessionResult};

#[derive(Clone)]
pub struct IdentityService {
	identities: Arc<dyn IdentityStore>,
	sessions: SessionAuthority,
}

impl IdentityService {
	pub fn new(identities: Arc<dyn IdentityStore>, sessions: SessionAuthority) -> Self {
		Self {
			identities,
			sessions,
		}
	}

	/// Create an identity with a generated password.
	///
	/// The plaintext password is returned once and never stored.
	#[instrument(skip(self))]
	pub async fn create_identity(
		&self,
		email: &str,
		role: Role,
		grants: &str,
	) -> SessionResult<(Identity, SecretString)> {
		validate_email(email)?;
		let grants = GroupGrants::parse(grants)?;

		let password = generate_password();
		let hash = hash_password(password.expose())?;
		let identity = Identity::new(email, hash, role, &grants);
		self.identities.create_identity(&identity).await?;

		tracing::info!(email, role = %role, "identity created");
		Ok((identity, password))
	}

	#[instrument(skip(self))]
	pub async fn get(&self, email: &str) -> SessionResult<Identity> {
		self.identities
			.get_identity_by_email(email)
			.await?
			.ok_or_else(|| SessionError::NotFound(email.to_string()))
	}

	/// All identities ordered by email.
	#[instrument(skip(self))]
	pub async fn list(&self) -> SessionResult<Vec<Identity>> {
		Ok(self.identities.list_identities().await?)
	}

	/// Replace role and grants together.
	#[instrument(skip(self))]
	pub async fn update(&self, email: &str, role: Role, grants: &str) -> SessionResult<()> {
		if is_bootstrap_admin(email) && !role.is_admin() {
			return Err(forbidden_bootstrap("demoted"));
		}
		let grants = GroupGrants::parse(grants)?;

		if !self
			.identities
			.update_role_and_grants(email, role, &grants.to_string())
			.await?
		{
			return Err(SessionError::NotFound(email.to_string()));
		}

		tracing::info!(email, role = %role, "identity updated");
		Ok(())
	}

	/// Replace the grants. The string is stored in normalized form.
	#[instrument(skip(self))]
	pub async fn update_group_grants(&self, email: &str, grants: &str) -> SessionResult<()> {
		let grants = GroupGrants::parse(grants)?;

		if !self
			.identities
			.update_group_grants(email, &grants.to_string())
			.await?
		{
			return Err(SessionError::NotFound(email.to_string()));
		}

		tracing::info!(email, groups = grants.len(), "group grants updated");
		Ok(())
	}

	#[instrument(skip(self))]
	pub async fn enable(&self, email: &str) -> SessionResult<()> {
		if !self.identities.set_enabled(email, true).await? {
			return Err(SessionError::NotFound(email.to_string()));
		}
		tracing::info!(email, "identity enabled");
		Ok(())
	}

	/// Disable an identity and revoke its outstanding tokens.
	///
	/// Returns the number of tokens revoked.
	#[instrument(skip(self))]
	pub async fn disable(&self, email: &str) -> SessionResult<u64> {
		if is_bootstrap_admin(email) {
			return Err(forbidden_bootstrap("disabled"));
		}
		if !self.identities.set_enabled(email, false).await? {
			return Err(SessionError::NotFound(email.to_string()));
		}

		let revoked = self.sessions.revoke_all_for_user(email).await?;
		tracing::info!(email, revoked, "identity disabled");
		Ok(revoked)
	}

	/// Delete an identity after revoking its tokens.
	#[instrument(skip(self))]
	pub async fn delete(&self, email: &str) -> SessionResult<()> {
		if is_bootstrap_admin(email) {
			return Err(forbidden_bootstrap("deleted"));
		}

		let revoked = self.sessions.revoke_all_for_user(email).await?;
		if !self.identities.delete_identity(email).await? {
			return Err(SessionError::NotFound(email.to_string()));
		}

		tracing::info!(email, revoked, "identity deleted");
		Ok(())
	}

	/// Self-service password change; the current password must verify.
	#[instrument(skip(self, current, new))]
	pub async fn change_password(&self, email: &str, current: &str, new: &str) -> SessionResult<()> {
		require_password(new)?;
		self.sessions.authenticate(email, current).await?;
		self.store_password(email, new).await
	}

	/// Administrative reset; no current password needed.
	#[instrument(skip(self, new))]
	pub async fn set_password(&self, email: &str, new: &str) -> SessionResult<()> {
		require_password(new)?;
		self.store_password(email, new).await
	}

	async fn store_password(&self, email: &str, new: &str) -> SessionResult<()> {
		let hash = hash_password(new)?;
		if !self.identities.update_password_hash(email, &hash).await? {
			return Err(SessionError::NotFound(email.to_string()));
		}
		tracing::info!(email, "password changed");
		Ok(())
	}

	/// Create the bootstrap administrator if it does not exist.
	///
	/// Returns `true` when it was created.
	#[instrument(skip(self))]
	pub async fn ensure_bootstrap_admin(&self) -> SessionResult<bool> {
		if self
			.identities
			.get_identity_by_email(BOOTSTRAP_ADMIN_EMAIL)
			.await?
			.is_some()
		{
			return Ok(false);
		}

		let grants = GroupGrants::parse(BOOTSTRAP_ADMIN_GRANTS)?;
		let hash = hash_password(BOOTSTRAP_ADMIN_PASSWORD)?;
		let admin = Identity::new(BOOTSTRAP_ADMIN_EMAIL, hash, Role::Admin, &grants);

		match self.identities.create_identity(&admin).await {
			Ok(()) => {}
			// Another process created it first.
			Err(pman_server_db::DbError::Conflict(_)) => return Ok(false),
			Err(e) => return Err(e.into()),
		}

		tracing::warn!(
			email = BOOTSTRAP_ADMIN_EMAIL,
			password = BOOTSTRAP_ADMIN_PASSWORD,
			"created bootstrap admin with the default password; change it now"
		);
		Ok(true)
	}
}

fn forbidden_bootstrap(action: &str) -> SessionError {
	SessionError::Forbidden(format!("the bootstrap admin cannot be {action}"))
}

fn require_password(password: &str) -> SessionResult<()> {
	if password.is_empty() {
		return Err(SessionError::Validation(
			"password must not be empty".to_string(),
		));
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::authority::SessionConfig;
	use crate::token::TokenCodec;
	use pman_server_auth::password::GENERATED_PASSWORD_LEN;
	use pman_server_auth::{CredentialError, ErrorKind};
	use pman_server_db::testing::create_test_pool;
	use pman_server_db::{IdentityRepository, IssuedTokenRepository};

	async fn setup() -> (IdentityService, SessionAuthority) {
		let pool = create_test_pool().await.unwrap();
		let identities: Arc<dyn IdentityStore> = Arc::new(IdentityRepository::new(pool.clone()));
		let sessions = SessionAuthority::new(
			identities.clone(),
			Arc::new(IssuedTokenRepository::new(pool)),
			Arc::new(TokenCodec::new(b"signing-secret", "pman.example.com")),
			SessionConfig::default(),
		);
		(IdentityService::new(identities, sessions.clone()), sessions)
	}

	mod creation {
		use super::*;

		#[tokio::test]
		async fn create_returns_working_generated_password() {
			let (svc, sessions) = setup().await;
			let (identity, password) = svc
				.create_identity("a@x", Role::User, "team1:read")
				.await
				.unwrap();

			assert_eq!(password.expose().len(), GENERATED_PASSWORD_LEN);
			assert!(password.expose().chars().all(|c| c.is_ascii_alphanumeric()));
			assert!(identity.enabled);
			assert!(sessions.login("a@x", password.expose(), None).await.is_ok());
		}

		#[tokio::test]
		async fn duplicate_email_is_conflict() {
			let (svc, _) = setup().await;
			svc.create_identity("a@x", Role::User, "").await.unwrap();
			let err = svc
				.create_identity("a@x", Role::Admin, "")
				.await
				.unwrap_err();
			assert_eq!(err.kind(), ErrorKind::Conflict);
		}

		#[tokio::test]
		async fn invalid_input_is_rejected() {
			let (svc, _) = setup().await;
			let err = svc
				.create_identity("not-an-email", Role::User, "")
				.await
				.unwrap_err();
			assert_eq!(err.kind(), ErrorKind::Validation);

			let err = svc
				.create_identity("a@x", Role::User, "team1:rw")
				.await
				.unwrap_err();
			assert_eq!(err.kind(), ErrorKind::Validation);
			assert!(svc.list().await.unwrap().is_empty());
		}

		#[tokio::test]
		async fn list_is_ordered_by_email() {
			let (svc, _) = setup().await;
			for email in ["c@x", "a@x", "b@x"] {
				svc.create_identity(email, Role::User, "").await.unwrap();
			}
			let emails: Vec<String> = svc
				.list()
				.await
				.unwrap()
				.into_iter()
				.map(|i| i.email)
				.collect();
			assert_eq!(emails, vec!["a@x", "b@x", "c@x"]);
		}
	}

	mod grants {
		use super::*;

		#[tokio::test]
		async fn update_group_grants_stores_normalized_string() {
			let (svc, _) = setup().await;
			svc.create_identity("a@x", Role::User, "").await.unwrap();

			svc.update_group_grants("a@x", " team1 : read_write , team2:read ")
				.await
				.unwrap();
			assert_eq!(
				svc.get("a@x").await.unwrap().group_grants,
				"team1:read_write,team2:read"
			);
		}

		#[tokio::test]
		async fn unparsable_grants_are_never_stored() {
			let (svc, _) = setup().await;
			svc.create_identity("a@x", Role::User, "team1:read")
				.await
				.unwrap();

			for bad in ["team1", "team1:admin", "team1:read:x", ":read", "a:read,a:read"] {
				let err = svc.update_group_grants("a@x", bad).await.unwrap_err();
				assert_eq!(err.kind(), ErrorKind::Validation, "{bad}");
			}
			assert_eq!(svc.get("a@x").await.unwrap().group_grants, "team1:read");
		}

		#[tokio::test]
		async fn updates_on_missing_identity_are_not_found() {
			let (svc, _) = setup().await;
			let err = svc.update_group_grants("nobody@x", "team1:read").await.unwrap_err();
			assert_eq!(err.kind(), ErrorKind::NotFound);
			let err = svc.update("nobody@x", Role::User, "").await.unwrap_err();
			assert_eq!(err.kind(), ErrorKind::NotFound);
			let err = svc.enable("nobody@x").await.unwrap_err();
			assert_eq!(err.kind(), ErrorKind::NotFound);
			let err = svc.get("nobody@x").await.unwrap_err();
			assert_eq!(err.kind(), ErrorKind::NotFound);
		}

		#[tokio::test]
		async fn update_changes_role_and_grants() {
			let (svc, _) = setup().await;
			svc.create_identity("a@x", Role::User, "").await.unwrap();
			svc.update("a@x", Role::Admin, "ops:read").await.unwrap();

			let identity = svc.get("a@x").await.unwrap();
			assert_eq!(identity.role, Role::Admin);
			assert_eq!(identity.group_grants, "ops:read");
		}
	}

	mod bootstrap {
		use super::*;

		#[tokio::test]
		async fn ensure_bootstrap_admin_is_idempotent() {
			let (svc, sessions) = setup().await;
			assert!(svc.ensure_bootstrap_admin().await.unwrap());
			assert!(!svc.ensure_bootstrap_admin().await.unwrap());

			let admin = svc.get(BOOTSTRAP_ADMIN_EMAIL).await.unwrap();
			assert_eq!(admin.role, Role::Admin);
			assert_eq!(admin.group_grants, BOOTSTRAP_ADMIN_GRANTS);
			assert!(sessions
				.login(BOOTSTRAP_ADMIN_EMAIL, BOOTSTRAP_ADMIN_PASSWORD, None)
				.await
				.is_ok());
		}

		#[tokio::test]
		async fn bootstrap_admin_cannot_be_disabled_deleted_or_demoted() {
			let (svc, _) = setup().await;
			svc.ensure_bootstrap_admin().await.unwrap();

			let err = svc.disable(BOOTSTRAP_ADMIN_EMAIL).await.unwrap_err();
			assert_eq!(err.kind(), ErrorKind::Forbidden);
			let err = svc.delete(BOOTSTRAP_ADMIN_EMAIL).await.unwrap_err();
			assert_eq!(err.kind(), ErrorKind::Forbidden);
			let err = svc
				.update(BOOTSTRAP_ADMIN_EMAIL, Role::User, "")
				.await
				.unwrap_err();
			assert_eq!(err.kind(), ErrorKind::Forbidden);

			let admin = svc.get(BOOTSTRAP_ADMIN_EMAIL).await.unwrap();
			assert!(admin.enabled);
			assert_eq!(admin.role, Role::Admin);
		}

		#[tokio::test]
		async fn bootstrap_admin_grants_can_change() {
			let (svc, _) = setup().await;
			svc.ensure_bootstrap_admin().await.unwrap();
			svc.update(BOOTSTRAP_ADMIN_EMAIL, Role::Admin, "team3:read")
				.await
				.unwrap();
			assert_eq!(
				svc.get(BOOTSTRAP_ADMIN_EMAIL).await.unwrap().group_grants,
				"team3:read"
			);
		}
	}

	mod lifecycle {
		use super::*;

		#[tokio::test]
		async fn disabling_revokes_outstanding_tokens() {
			let (svc, sessions) = setup().await;
			let (_, password) = svc.create_identity("a@x", Role::User, "").await.unwrap();
			let first = sessions.login("a@x", password.expose(), None).await.unwrap();
			let second = sessions.login("a@x", password.expose(), None).await.unwrap();

			assert_eq!(svc.disable("a@x").await.unwrap(), 2);

			for token in [first.token, second.token] {
				let err = sessions.validate(token.expose()).await.unwrap_err();
				assert_eq!(err.credential(), Some(CredentialError::Revoked));
			}
			let err = sessions
				.login("a@x", password.expose(), None)
				.await
				.unwrap_err();
			assert_eq!(err.credential(), Some(CredentialError::AccountDisabled));
		}

		#[tokio::test]
		async fn reenabled_identity_can_log_in_but_old_tokens_stay_revoked() {
			let (svc, sessions) = setup().await;
			let (_, password) = svc.create_identity("a@x", Role::User, "").await.unwrap();
			let old = sessions.login("a@x", password.expose(), None).await.unwrap();

			svc.disable("a@x").await.unwrap();
			svc.enable("a@x").await.unwrap();

			assert!(sessions.validate(old.token.expose()).await.is_err());
			let fresh = sessions.login("a@x", password.expose(), None).await.unwrap();
			assert!(sessions.validate(fresh.token.expose()).await.is_ok());
		}

		#[tokio::test]
		async fn delete_removes_identity_and_its_sessions() {
			let (svc, sessions) = setup().await;
			let (_, password) = svc.create_identity("a@x", Role::User, "").await.unwrap();
			let outcome = sessions.login("a@x", password.expose(), None).await.unwrap();

			svc.delete("a@x").await.unwrap();

			assert_eq!(svc.get("a@x").await.unwrap_err().kind(), ErrorKind::NotFound);
			assert!(sessions.is_revoked(outcome.token.expose()).await.unwrap());
			assert_eq!(svc.delete("a@x").await.unwrap_err().kind(), ErrorKind::NotFound);
		}

		#[tokio::test]
		async fn disable_missing_identity_is_not_found() {
			let (svc, _) = setup().await;
			assert_eq!(
				svc.disable("nobody@x").await.unwrap_err().kind(),
				ErrorKind::NotFound
			);
		}
	}

	mod passwords {
		use super::*;

		#[tokio::test]
		async fn change_password_requires_current_password() {
			let (svc, sessions) = setup().await;
			let (_, password) = svc.create_identity("a@x", Role::User, "").await.unwrap();

			let err = svc
				.change_password("a@x", "wrong", "new-password")
				.await
				.unwrap_err();
			assert_eq!(err.credential(), Some(CredentialError::InvalidCredentials));

			svc.change_password("a@x", password.expose(), "new-password")
				.await
				.unwrap();
			assert!(sessions.login("a@x", "new-password", None).await.is_ok());
			assert!(sessions
				.login("a@x", password.expose(), None)
				.await
				.is_err());
		}

		#[tokio::test]
		async fn empty_new_password_is_rejected() {
			let (svc, _) = setup().await;
			let (_, password) = svc.create_identity("a@x", Role::User, "").await.unwrap();
			let err = svc
				.change_password("a@x", password.expose(), "")
				.await
				.unwrap_err();
			assert_eq!(err.kind(), ErrorKind::Validation);
			assert_eq!(
				svc.set_password("a@x", "").await.unwrap_err().kind(),
				ErrorKind::Validation
			);
		}

		#[tokio::test]
		async fn admin_reset_needs_no_current_password() {
			let (svc, sessions) = setup().await;
			svc.create_identity("a@x", Role::User, "").await.unwrap();

			svc.set_password("a@x", "reset-pw").await.unwrap();
			assert!(sessions.login("a@x", "reset-pw", None).await.is_ok());
			assert_eq!(
				svc.set_password("nobody@x", "pw").await.unwrap_err().kind(),
				ErrorKind::NotFound
			);
		}
	}
}
