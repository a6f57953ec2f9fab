// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Group-scoped secret operations.
//!
//! Every operation takes the caller's serialized grants and checks them
//! before touching storage. Values are encrypted before they reach the store
//! and decrypted on the way out.

use pman_common_secret::SecretString;
use pman_server_auth::authorize;
use pman_server_db::{SecretInfo, SecretRowStore};
use std::sync::Arc;
use tracing::instrument;

use crate::cipher::SecretCipher;
use crate::error::{SecretsError, SecretsResult};
use crate::path::{normalize_folder_prefix, validate_group, validate_list_prefix, validate_path};
use crate::tree::{build_tree, FolderNode};

#[derive(Clone)]
pub struct SecretsService {
	store: Arc<dyn SecretRowStore>,
	cipher: Arc<SecretCipher>,
}

impl SecretsService {
	pub fn new(store: Arc<dyn SecretRowStore>, cipher: Arc<SecretCipher>) -> Self {
		Self { store, cipher }
	}

	fn check_access(&self, grants: &str, group: &str, require_write: bool) -> SecretsResult<()> {
		if authorize(grants, group, require_write) {
			return Ok(());
		}
		let action = if require_write { "write" } else { "read" };
		tracing::warn!(group, action, "secret access denied");
		Err(SecretsError::Forbidden {
			group: group.to_string(),
			action,
		})
	}

	/// Store a value at `path`, replacing any existing value.
	///
	/// Creation provenance survives a replace; only `updated_*` moves.
	#[instrument(skip(self, value, grants))]
	pub async fn create(
		&self,
		path: &str,
		value: &SecretString,
		group: &str,
		actor: &str,
		grants: &str,
	) -> SecretsResult<()> {
		self.check_access(grants, group, true)?;
		validate_group(group)?;
		validate_path(path)?;

		let envelope = self.cipher.encrypt(value.expose())?;
		self.store.upsert_secret(path, group, &envelope, actor).await?;

		tracing::info!(path, group, actor, "secret stored");
		Ok(())
	}

	#[instrument(skip(self, grants))]
	pub async fn read(&self, path: &str, group: &str, grants: &str) -> SecretsResult<SecretString> {
		self.check_access(grants, group, false)?;
		validate_group(group)?;
		validate_path(path)?;

		let record = self
			.store
			.get_secret(path, group)
			.await?
			.ok_or_else(|| not_found(path, group))?;

		self.cipher.decrypt(&record.encrypted_value).map_err(|e| {
			tracing::error!(path, group, error = %e, "stored secret could not be decrypted");
			SecretsError::Crypto(e)
		})
	}

	/// Provenance of a secret. Never decrypts.
	#[instrument(skip(self, grants))]
	pub async fn read_info(&self, path: &str, group: &str, grants: &str) -> SecretsResult<SecretInfo> {
		self.check_access(grants, group, false)?;
		validate_group(group)?;
		validate_path(path)?;

		self.store
			.get_secret_info(path, group)
			.await?
			.ok_or_else(|| not_found(path, group))
	}

	/// Replace the value of an existing secret.
	#[instrument(skip(self, value, grants))]
	pub async fn update(
		&self,
		path: &str,
		value: &SecretString,
		group: &str,
		actor: &str,
		grants: &str,
	) -> SecretsResult<()> {
		self.check_access(grants, group, true)?;
		validate_group(group)?;
		validate_path(path)?;

		let envelope = self.cipher.encrypt(value.expose())?;
		if !self
			.store
			.update_secret_value(path, group, &envelope, actor)
			.await?
		{
			return Err(not_found(path, group));
		}

		tracing::info!(path, group, actor, "secret updated");
		Ok(())
	}

	/// Delete one secret. Folders need no cleanup since they only exist
	/// through the paths below them.
	#[instrument(skip(self, grants))]
	pub async fn delete(&self, path: &str, group: &str, grants: &str) -> SecretsResult<()> {
		self.check_access(grants, group, true)?;
		validate_group(group)?;
		validate_path(path)?;

		if !self.store.delete_secret(path, group).await? {
			return Err(not_found(path, group));
		}

		tracing::info!(path, group, "secret deleted");
		Ok(())
	}

	/// Delete the secret at `prefix` and everything below it.
	///
	/// Matching is by whole segments: `team/db` removes `team/db` and
	/// `team/db/user` but not `team/dbx`. A count of zero is not an error.
	#[instrument(skip(self, grants))]
	pub async fn delete_recursive(
		&self,
		prefix: &str,
		group: &str,
		grants: &str,
	) -> SecretsResult<u64> {
		self.check_access(grants, group, true)?;
		validate_group(group)?;
		let prefix = normalize_folder_prefix(prefix)?;

		let count = self.store.delete_secrets_under(prefix, group).await?;

		tracing::info!(prefix, group, count, "secrets deleted recursively");
		Ok(count)
	}

	/// Paths in `group`, ascending. The optional prefix is matched as a raw
	/// string, so `team/d` matches `team/db/...`.
	#[instrument(skip(self, grants))]
	pub async fn list(
		&self,
		group: &str,
		prefix: Option<&str>,
		grants: &str,
	) -> SecretsResult<Vec<String>> {
		self.check_access(grants, group, false)?;
		validate_group(group)?;
		if let Some(prefix) = prefix {
			validate_list_prefix(prefix)?;
		}

		Ok(self.store.list_secret_paths(group, prefix).await?)
	}

	/// Folder tree of [`SecretsService::list`], rooted at the group name.
	#[instrument(skip(self, grants))]
	pub async fn tree(
		&self,
		group: &str,
		prefix: Option<&str>,
		grants: &str,
	) -> SecretsResult<FolderNode> {
		let paths = self.list(group, prefix, grants).await?;
		Ok(build_tree(group, &paths))
	}
}

fn not_found(path: &str, group: &str) -> SecretsError {
	SecretsError::NotFound {
		path: path.to_string(),
		group: group.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::cipher::generate_key;
	use async_trait::async_trait;
	use pman_server_auth::ErrorKind;
	use pman_server_db::testing::create_test_pool;
	use pman_server_db::{DbError, SecretRecord, SecretRowRepository};
	use std::sync::atomic::{AtomicUsize, Ordering};

	const RW: &str = "team1:read_write,team2:read";

	/// Counts every storage call so tests can assert nothing was touched.
	struct CountingStore {
		inner: SecretRowRepository,
		calls: AtomicUsize,
	}

	impl CountingStore {
		fn tick(&self) {
			self.calls.fetch_add(1, Ordering::SeqCst);
		}
	}

	#[async_trait]
	impl SecretRowStore for CountingStore {
		async fn upsert_secret(
			&self,
			path: &str,
			group_name: &str,
			encrypted_value: &str,
			actor: &str,
		) -> Result<(), DbError> {
			self.tick();
			self.inner
				.upsert_secret(path, group_name, encrypted_value, actor)
				.await
		}

		async fn get_secret(
			&self,
			path: &str,
			group_name: &str,
		) -> Result<Option<SecretRecord>, DbError> {
			self.tick();
			self.inner.get_secret(path, group_name).await
		}

		async fn get_secret_info(
			&self,
			path: &str,
			group_name: &str,
		) -> Result<Option<SecretInfo>, DbError> {
			self.tick();
			self.inner.get_secret_info(path, group_name).await
		}

		async fn update_secret_value(
			&self,
			path: &str,
			group_name: &str,
			encrypted_value: &str,
			actor: &str,
		) -> Result<bool, DbError> {
			self.tick();
			self.inner
				.update_secret_value(path, group_name, encrypted_value, actor)
				.await
		}

		async fn delete_secret(&self, path: &str, group_name: &str) -> Result<bool, DbError> {
			self.tick();
			self.inner.delete_secret(path, group_name).await
		}

		async fn delete_secrets_under(&self, prefix: &str, group_name: &str) -> Result<u64, DbError> {
			self.tick();
			self.inner.delete_secrets_under(prefix, group_name).await
		}

		async fn list_secret_paths(
			&self,
			group_name: &str,
			prefix: Option<&str>,
		) -> Result<Vec<String>, DbError> {
			self.tick();
			self.inner.list_secret_paths(group_name, prefix).await
		}
	}

	async fn make_service() -> (SecretsService, Arc<CountingStore>) {
		let pool = create_test_pool().await.unwrap();
		let store = Arc::new(CountingStore {
			inner: SecretRowRepository::new(pool),
			calls: AtomicUsize::new(0),
		});
		let cipher = Arc::new(SecretCipher::new(&generate_key()));
		(SecretsService::new(store.clone(), cipher), store)
	}

	fn value(s: &str) -> SecretString {
		SecretString::new(s.to_string())
	}

	#[tokio::test]
	async fn create_then_read_roundtrips() {
		let (svc, _) = make_service().await;
		svc.create("db/password", &value("hunter2"), "team1", "a@x", RW)
			.await
			.unwrap();
		let got = svc.read("db/password", "team1", RW).await.unwrap();
		assert_eq!(got.expose(), "hunter2");
	}

	#[tokio::test]
	async fn create_twice_keeps_one_secret_with_latest_value() {
		let (svc, _) = make_service().await;
		svc.create("k", &value("v1"), "team1", "a@x", RW).await.unwrap();
		svc.create("k", &value("v2"), "team1", "b@x", RW).await.unwrap();

		assert_eq!(svc.list("team1", None, RW).await.unwrap(), vec!["k"]);
		assert_eq!(svc.read("k", "team1", RW).await.unwrap().expose(), "v2");

		let info = svc.read_info("k", "team1", RW).await.unwrap();
		assert_eq!(info.created_by, "a@x");
		assert_eq!(info.updated_by, "b@x");
	}

	#[tokio::test]
	async fn stored_value_is_not_plaintext() {
		let pool = create_test_pool().await.unwrap();
		let repo = SecretRowRepository::new(pool);
		let svc = SecretsService::new(
			Arc::new(repo.clone()),
			Arc::new(SecretCipher::new(&generate_key())),
		);
		svc.create("k", &value("plaintext-value"), "team1", "a@x", RW)
			.await
			.unwrap();

		let record = repo.get_secret("k", "team1").await.unwrap().unwrap();
		assert!(!record.encrypted_value.contains("plaintext-value"));
	}

	#[tokio::test]
	async fn forbidden_operations_touch_no_storage() {
		let (svc, store) = make_service().await;
		let read_only = "team1:read";
		let v = value("x");

		let results = [
			svc.create("k", &v, "team1", "a@x", read_only).await.unwrap_err(),
			svc.update("k", &v, "team1", "a@x", read_only).await.unwrap_err(),
			svc.delete("k", "team1", read_only).await.unwrap_err(),
			svc.delete_recursive("k", "team1", read_only).await.unwrap_err(),
			svc.read("k", "team9", read_only).await.unwrap_err(),
			svc.read_info("k", "team9", read_only).await.unwrap_err(),
			svc.list("team9", None, read_only).await.unwrap_err(),
			svc.tree("team9", None, read_only).await.unwrap_err(),
		];
		for err in results {
			assert_eq!(err.kind(), ErrorKind::Forbidden, "{err}");
		}
		assert_eq!(store.calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn malformed_grants_deny_access() {
		let (svc, store) = make_service().await;
		let err = svc
			.create("k", &value("x"), "team1", "a@x", "team1:rw")
			.await
			.unwrap_err();
		assert_eq!(err.kind(), ErrorKind::Forbidden);
		assert_eq!(store.calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn authorization_is_checked_before_validation() {
		let (svc, _) = make_service().await;
		let err = svc
			.create("/bad/", &value("x"), "team2", "a@x", RW)
			.await
			.unwrap_err();
		assert_eq!(err.kind(), ErrorKind::Forbidden);

		let err = svc
			.create("/bad/", &value("x"), "team1", "a@x", RW)
			.await
			.unwrap_err();
		assert_eq!(err.kind(), ErrorKind::Validation);
	}

	#[tokio::test]
	async fn read_only_grant_can_read_but_not_write() {
		let (svc, _) = make_service().await;
		svc.create("k", &value("v"), "team1", "a@x", RW).await.unwrap();

		let reader = "team1:read";
		assert_eq!(svc.read("k", "team1", reader).await.unwrap().expose(), "v");
		assert_eq!(
			svc.delete("k", "team1", reader).await.unwrap_err().kind(),
			ErrorKind::Forbidden
		);
	}

	#[tokio::test]
	async fn update_and_delete_missing_are_not_found() {
		let (svc, _) = make_service().await;
		let err = svc
			.update("missing", &value("v"), "team1", "a@x", RW)
			.await
			.unwrap_err();
		assert_eq!(err.kind(), ErrorKind::NotFound);

		let err = svc.delete("missing", "team1", RW).await.unwrap_err();
		assert_eq!(err.kind(), ErrorKind::NotFound);

		let err = svc.read("missing", "team1", RW).await.unwrap_err();
		assert_eq!(err.kind(), ErrorKind::NotFound);

		assert!(svc.list("team1", None, RW).await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn update_replaces_existing_value() {
		let (svc, _) = make_service().await;
		svc.create("k", &value("old"), "team1", "a@x", RW).await.unwrap();
		svc.update("k", &value("new"), "team1", "b@x", RW).await.unwrap();
		assert_eq!(svc.read("k", "team1", RW).await.unwrap().expose(), "new");
	}

	#[tokio::test]
	async fn same_path_in_different_groups_is_independent() {
		let (svc, _) = make_service().await;
		let grants = "team1:read_write,team2:read_write";
		svc.create("k", &value("one"), "team1", "a@x", grants).await.unwrap();
		svc.create("k", &value("two"), "team2", "a@x", grants).await.unwrap();

		svc.delete("k", "team1", grants).await.unwrap();
		assert_eq!(svc.read("k", "team2", grants).await.unwrap().expose(), "two");
	}

	#[tokio::test]
	async fn delete_recursive_respects_segment_boundaries() {
		let (svc, _) = make_service().await;
		for path in ["team/db", "team/db/user", "team/db/pass", "team/dbx", "other"] {
			svc.create(path, &value("v"), "team1", "a@x", RW).await.unwrap();
		}

		assert_eq!(svc.delete_recursive("team/db/", "team1", RW).await.unwrap(), 3);
		assert_eq!(
			svc.list("team1", None, RW).await.unwrap(),
			vec!["other", "team/dbx"]
		);
		assert_eq!(svc.delete_recursive("team/db", "team1", RW).await.unwrap(), 0);
	}

	#[tokio::test]
	async fn delete_recursive_rejects_empty_prefix() {
		let (svc, store) = make_service().await;
		let err = svc.delete_recursive("", "team1", RW).await.unwrap_err();
		assert_eq!(err.kind(), ErrorKind::Validation);
		assert_eq!(store.calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn list_is_sorted_and_prefix_filtered() {
		let (svc, _) = make_service().await;
		for path in ["b/2", "a/1", "b/1", "c"] {
			svc.create(path, &value("v"), "team1", "a@x", RW).await.unwrap();
		}

		assert_eq!(
			svc.list("team1", None, RW).await.unwrap(),
			vec!["a/1", "b/1", "b/2", "c"]
		);
		assert_eq!(
			svc.list("team1", Some("b/"), RW).await.unwrap(),
			vec!["b/1", "b/2"]
		);
	}

	#[tokio::test]
	async fn tree_groups_paths_into_folders() {
		let (svc, _) = make_service().await;
		for path in ["db/user", "db/pass", "token"] {
			svc.create(path, &value("v"), "team1", "a@x", RW).await.unwrap();
		}

		let tree = svc.tree("team1", None, RW).await.unwrap();
		assert_eq!(tree.name, "team1");
		assert_eq!(tree.secret_count(), 3);
		assert!(tree.find("db").unwrap().is_folder());
	}

	#[tokio::test]
	async fn wrong_key_read_is_crypto_failure() {
		let pool = create_test_pool().await.unwrap();
		let repo = Arc::new(SecretRowRepository::new(pool));
		let writer = SecretsService::new(repo.clone(), Arc::new(SecretCipher::from_passphrase("one")));
		let reader = SecretsService::new(repo, Arc::new(SecretCipher::from_passphrase("two")));

		writer.create("k", &value("v"), "team1", "a@x", RW).await.unwrap();
		let err = reader.read("k", "team1", RW).await.unwrap_err();
		assert_eq!(err.kind(), ErrorKind::CryptoFailure);
		assert!(err.is_internal());
	}

	#[tokio::test]
	async fn concurrent_creates_on_one_path_leave_one_secret() {
		let (svc, _) = make_service().await;
		let mut handles = Vec::new();
		for i in 0..8 {
			let svc = svc.clone();
			handles.push(tokio::spawn(async move {
				svc.create("shared", &value(&format!("v{i}")), "team1", "a@x", RW)
					.await
			}));
		}
		for handle in handles {
			handle.await.unwrap().unwrap();
		}

		assert_eq!(svc.list("team1", None, RW).await.unwrap(), vec!["shared"]);
		let got = svc.read("shared", "team1", RW).await.unwrap();
		assert!(got.expose().starts_with('v'));
	}
}
