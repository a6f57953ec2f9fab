// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Credential and session configuration.

use serde::Deserialize;

pub const DEFAULT_EXPIRE_DAYS: i64 = 24;
pub const DEFAULT_TOKEN_CLEANUP_INTERVAL_SECS: u64 = 3600;

#[derive(Debug, Clone)]
pub struct AuthConfig {
	/// Token issuer. Required.
	pub domain_name: String,
	pub default_expire_days: i64,
	/// Accept signed tokens that were never recorded in the revocation store.
	pub untracked_tokens_allowed: bool,
	pub token_cleanup_interval_secs: u64,
}

impl Default for AuthConfig {
	fn default() -> Self {
		Self {
			domain_name: String::new(),
			default_expire_days: DEFAULT_EXPIRE_DAYS,
			untracked_tokens_allowed: true,
			token_cleanup_interval_secs: DEFAULT_TOKEN_CLEANUP_INTERVAL_SECS,
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfigLayer {
	#[serde(default)]
	pub domain_name: Option<String>,
	#[serde(default)]
	pub default_expire_days: Option<i64>,
	#[serde(default)]
	pub untracked_tokens_allowed: Option<bool>,
	#[serde(default)]
	pub token_cleanup_interval_secs: Option<u64>,
}

impl AuthConfigLayer {
	pub fn merge(&mut self, other: AuthConfigLayer) {
		if other.domain_name.is_some() {
			self.domain_name = other.domain_name;
		}
		if other.default_expire_days.is_some() {
			self.default_expire_days = other.default_expire_days;
		}
		if other.untracked_tokens_allowed.is_some() {
			self.untracked_tokens_allowed = other.untracked_tokens_allowed;
		}
		if other.token_cleanup_interval_secs.is_some() {
			self.token_cleanup_interval_secs = other.token_cleanup_interval_secs;
		}
	}

	pub fn finalize(self) -> AuthConfig {
		AuthConfig {
			domain_name: self.domain_name.unwrap_or_default(),
			default_expire_days: self.default_expire_days.unwrap_or(DEFAULT_EXPIRE_DAYS),
			untracked_tokens_allowed: self.untracked_tokens_allowed.unwrap_or(true),
			token_cleanup_interval_secs: self
				.token_cleanup_interval_secs
				.unwrap_or(DEFAULT_TOKEN_CLEANUP_INTERVAL_SECS),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults() {
		let config = AuthConfigLayer::default().finalize();
		assert_eq!(config.domain_name, "");
		assert_eq!(config.default_expire_days, 24);
		assert!(config.untracked_tokens_allowed);
		assert_eq!(config.token_cleanup_interval_secs, 3600);
	}

	#[test]
	fn later_layer_wins() {
		let mut layer = AuthConfigLayer {
			domain_name: Some("a.example.com".to_string()),
			default_expire_days: Some(7),
			..Default::default()
		};
		layer.merge(AuthConfigLayer {
			domain_name: Some("b.example.com".to_string()),
			untracked_tokens_allowed: Some(false),
			..Default::default()
		});

		let config = layer.finalize();
		assert_eq!(config.domain_name, "b.example.com");
		assert_eq!(config.default_expire_days, 7);
		assert!(!config.untracked_tokens_allowed);
	}
}
