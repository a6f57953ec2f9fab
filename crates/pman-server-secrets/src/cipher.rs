// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authenticated encryption of stored secret values.
//!
//! Uses AES-256-GCM with a fresh 96-bit random nonce per call. The envelope is
//! `base64(nonce || ciphertext || tag)` so it fits a text column.
//!
//! The key is handed to [`SecretCipher::new`] once at startup. The cipher keeps
//! no per-call state and is shared across tasks by reference.

use aes_gcm::{
	aead::{Aead, KeyInit, OsRng},
	Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use pman_common_secret::SecretString;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::Zeroizing;

/// Size of encryption keys in bytes (256 bits for AES-256).
pub const KEY_SIZE: usize = 32;

/// Size of AES-GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;

/// Size of the AES-GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CipherError {
	/// Not something this cipher could have produced: bad base64 or too short.
	#[error("malformed envelope: {0}")]
	Malformed(String),

	/// Wrong key or tampered data.
	#[error("envelope failed authentication")]
	AuthenticationFailed,

	#[error("encryption failed: {0}")]
	Encryption(String),
}

/// Generate a random 256-bit key.
pub fn generate_key() -> Zeroizing<[u8; KEY_SIZE]> {
	let mut key = Zeroizing::new([0u8; KEY_SIZE]);
	OsRng.fill_bytes(key.as_mut());
	key
}

/// Generate a random nonce.
///
/// Random 96-bit nonces are safe for well under 2^32 encryptions per key,
/// far beyond the size of a secret store.
pub fn generate_nonce() -> [u8; NONCE_SIZE] {
	let mut nonce = [0u8; NONCE_SIZE];
	OsRng.fill_bytes(&mut nonce);
	nonce
}

#[derive(Clone)]
pub struct SecretCipher {
	cipher: Aes256Gcm,
}

impl SecretCipher {
	pub fn new(key: &[u8; KEY_SIZE]) -> Self {
		let key = Key::<Aes256Gcm>::from_slice(key);
		Self {
			cipher: Aes256Gcm::new(key),
		}
	}

	/// Derive the key as SHA-256 of operator supplied key material.
	pub fn from_passphrase(material: &str) -> Self {
		let digest = Zeroizing::new(<[u8; KEY_SIZE]>::from(Sha256::digest(material.as_bytes())));
		Self::new(&digest)
	}

	pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
		self.encrypt_bytes(plaintext.as_bytes())
	}

	pub fn decrypt(&self, envelope: &str) -> Result<SecretString, CipherError> {
		let plaintext = self.decrypt_bytes(envelope)?;
		let text = std::str::from_utf8(&plaintext)
			.map_err(|_| CipherError::Malformed("plaintext is not UTF-8".to_string()))?;
		Ok(SecretString::new(text.to_string()))
	}

	pub fn encrypt_bytes(&self, plaintext: &[u8]) -> Result<String, CipherError> {
		let nonce_bytes = generate_nonce();
		let nonce = Nonce::from_slice(&nonce_bytes);

		let ciphertext = self
			.cipher
			.encrypt(nonce, plaintext)
			.map_err(|e| CipherError::Encryption(e.to_string()))?;

		let mut envelope = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
		envelope.extend_from_slice(&nonce_bytes);
		envelope.extend_from_slice(&ciphertext);
		Ok(STANDARD.encode(envelope))
	}

	pub fn decrypt_bytes(&self, envelope: &str) -> Result<Zeroizing<Vec<u8>>, CipherError> {
		let raw = STANDARD
			.decode(envelope.trim())
			.map_err(|e| CipherError::Malformed(format!("invalid base64: {e}")))?;

		if raw.len() < NONCE_SIZE + TAG_SIZE {
			return Err(CipherError::Malformed(format!(
				"envelope is {} bytes, minimum is {}",
				raw.len(),
				NONCE_SIZE + TAG_SIZE
			)));
		}

		let (nonce_bytes, ciphertext) = raw.split_at(NONCE_SIZE);
		let plaintext = self
			.cipher
			.decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
			.map_err(|_| CipherError::AuthenticationFailed)?;

		Ok(Zeroizing::new(plaintext))
	}
}

impl fmt::Debug for SecretCipher {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SecretCipher").finish_non_exhaustive()
	}
}
