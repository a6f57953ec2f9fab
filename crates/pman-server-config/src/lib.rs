// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for the pman server.
//!
//! Sources are layered, lowest precedence first:
//! 1. Built-in defaults
//! 2. Config file (`/etc/pman/server.toml`, or a path given on the command line)
//! 3. Environment variables (`PMAN_*`)
//!
//! The encryption key is read from `PMAN_ENCRYPTION_KEY` or
//! `PMAN_ENCRYPTION_KEY_FILE` only.
//!
//! ```ignore
//! let config = pman_server_config::load_config()?;
//! println!("issuer: {}", config.auth.domain_name);
//! ```

pub mod error;
pub mod layer;
pub mod secret_env;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use secret_env::{load_secret_env, SecretEnvError};
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use pman_common_secret::SecretString;
use tracing::{debug, info};

pub const ENCRYPTION_KEY_VAR: &str = "PMAN_ENCRYPTION_KEY";

/// Fully resolved server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
	pub database: DatabaseConfig,
	pub auth: AuthConfig,
	pub crypto: CryptoConfig,
	pub logging: LoggingConfig,
}

impl ServerConfig {
	/// Log the resolved configuration with the key redacted. Call after the
	/// tracing subscriber is installed.
	pub fn log_summary(&self) {
		info!(
			database = %self.database.url,
			domain_name = %self.auth.domain_name,
			default_expire_days = self.auth.default_expire_days,
			untracked_tokens_allowed = self.auth.untracked_tokens_allowed,
			token_cleanup_interval_secs = self.auth.token_cleanup_interval_secs,
			encryption_key = %self.crypto.encryption_key,
			log_level = %self.logging.level,
			log_format = %self.logging.format,
			"Server configuration loaded"
		);
	}
}

/// Load configuration from all sources with standard precedence.
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

/// Load configuration from environment only.
pub fn load_config_from_env() -> Result<ServerConfig, ConfigError> {
	let mut merged = ServerConfigLayer::default();
	merged.merge(EnvSource.load()?);
	finalize(merged)
}

fn load_from_sources(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let encryption_key =
		load_secret_env(ENCRYPTION_KEY_VAR).map_err(|e| ConfigError::Secret(e.to_string()))?;
	finalize_with_key(layer, encryption_key)
}

/// Resolve a merged layer plus the separately loaded key material.
pub fn finalize_with_key(
	layer: ServerConfigLayer,
	encryption_key: Option<SecretString>,
) -> Result<ServerConfig, ConfigError> {
	let database = layer.database.unwrap_or_default().finalize();
	let auth = layer.auth.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();

	validate_config(&auth)?;

	let encryption_key =
		encryption_key.ok_or_else(|| ConfigError::MissingEnvVar(ENCRYPTION_KEY_VAR.to_string()))?;
	let crypto = CryptoConfig { encryption_key };

	Ok(ServerConfig {
		database,
		auth,
		crypto,
		logging,
	})
}

fn validate_config(auth: &AuthConfig) -> Result<(), ConfigError> {
	if auth.domain_name.trim().is_empty() {
		return Err(ConfigError::MissingEnvVar("PMAN_DOMAIN_NAME".to_string()));
	}

	if auth.default_expire_days <= 0 {
		return Err(ConfigError::Validation(format!(
			"default_expire_days must be positive, got {}",
			auth.default_expire_days
		)));
	}

	if auth.token_cleanup_interval_secs == 0 {
		return Err(ConfigError::Validation(
			"token_cleanup_interval_secs must be positive".to_string(),
		));
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn layer_with_domain(domain: &str) -> ServerConfigLayer {
		ServerConfigLayer {
			auth: Some(AuthConfigLayer {
				domain_name: Some(domain.to_string()),
				..Default::default()
			}),
			..Default::default()
		}
	}

	#[test]
	fn resolves_with_domain_and_key() {
		let config = finalize_with_key(
			layer_with_domain("pman.example.com"),
			Some(SecretString::new("key-material".to_string())),
		)
		.unwrap();
		assert_eq!(config.auth.domain_name, "pman.example.com");
		assert_eq!(config.auth.default_expire_days, 24);
		assert_eq!(config.crypto.key_bytes(), b"key-material");
	}

	#[test]
	fn missing_domain_fails() {
		let result = finalize_with_key(
			ServerConfigLayer::default(),
			Some(SecretString::new("k".to_string())),
		);
		assert!(matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "PMAN_DOMAIN_NAME"));
	}

	#[test]
	fn missing_key_fails() {
		let result = finalize_with_key(layer_with_domain("d"), None);
		assert!(matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == ENCRYPTION_KEY_VAR));
	}

	#[test]
	fn non_positive_expiry_fails() {
		let mut layer = layer_with_domain("d");
		if let Some(auth) = layer.auth.as_mut() {
			auth.default_expire_days = Some(0);
		}
		let result = finalize_with_key(layer, Some(SecretString::new("k".to_string())));
		assert!(matches!(result, Err(ConfigError::Validation(_))));
	}

	#[test]
	fn debug_redacts_key() {
		let config = finalize_with_key(
			layer_with_domain("d"),
			Some(SecretString::new("super-secret-material".to_string())),
		)
		.unwrap();
		assert!(!format!("{config:?}").contains("super-secret-material"));
	}

	#[test]
	fn file_layer_overridden_by_later_layer() {
		let mut merged = ServerConfigLayer::default();
		merged.merge(layer_with_domain("from-file"));
		merged.merge(layer_with_domain("from-env"));
		let config = finalize_with_key(merged, Some(SecretString::new("k".to_string()))).unwrap();
		assert_eq!(config.auth.domain_name, "from-env");
	}

	#[test]
	fn summary_is_logged_with_key_redacted() {
		#[derive(Clone, Default)]
		struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

		impl std::io::Write for Captured {
			fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
				self.0.lock().unwrap().extend_from_slice(buf);
				Ok(buf.len())
			}

			fn flush(&mut self) -> std::io::Result<()> {
				Ok(())
			}
		}

		let config = finalize_with_key(
			layer_with_domain("pman.example.com"),
			Some(SecretString::new("super-secret-material".to_string())),
		)
		.unwrap();

		let captured = Captured::default();
		let writer = captured.clone();
		let subscriber = tracing_subscriber::fmt()
			.with_writer(move || writer.clone())
			.with_ansi(false)
			.finish();
		tracing::subscriber::with_default(subscriber, || config.log_summary());

		let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
		assert!(output.contains("Server configuration loaded"));
		assert!(output.contains("pman.example.com"));
		assert!(output.contains("[REDACTED]"));
		assert!(!output.contains("super-secret-material"));
	}
}
