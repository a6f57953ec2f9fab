// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Encryption key material. Environment only; never read from TOML.

use pman_common_secret::SecretString;

#[derive(Debug, Clone)]
pub struct CryptoConfig {
	/// Raw key material. The cipher key is derived from it and the token
	/// signing secret is the material itself.
	pub encryption_key: SecretString,
}

impl CryptoConfig {
	pub fn key_bytes(&self) -> &[u8] {
		self.encryption_key.expose().as_bytes()
	}
}
