// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Secret loading with `*_FILE` support.
//!
//! `load_secret_env("PMAN_ENCRYPTION_KEY")` reads the value from
//! `PMAN_ENCRYPTION_KEY`, or from the file named by
//! `PMAN_ENCRYPTION_KEY_FILE` (Docker and Kubernetes secret mounts). Setting
//! both is an error.

use std::path::PathBuf;

use pman_common_secret::SecretString;

#[derive(Debug, thiserror::Error)]
pub enum SecretEnvError {
	#[error("both {name} and {name}_FILE are set; use only one")]
	BothSet { name: String },

	#[error("failed to read {name}_FILE at {path}: {source}")]
	FileRead {
		name: String,
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
}

/// Load an optional secret. Empty values count as unset.
pub fn load_secret_env(name: &str) -> Result<Option<SecretString>, SecretEnvError> {
	let file_var = format!("{name}_FILE");
	let direct = std::env::var(name).ok().filter(|v| !v.is_empty());
	let file = std::env::var(&file_var).ok().filter(|v| !v.is_empty());

	match (direct, file) {
		(Some(_), Some(_)) => Err(SecretEnvError::BothSet {
			name: name.to_string(),
		}),
		(Some(value), None) => Ok(Some(SecretString::new(value))),
		(None, Some(path)) => {
			let path = PathBuf::from(path);
			let content = std::fs::read_to_string(&path).map_err(|source| SecretEnvError::FileRead {
				name: name.to_string(),
				path: path.clone(),
				source,
			})?;
			let value = content.trim_end_matches(['\r', '\n']).to_string();
			if value.is_empty() {
				Ok(None)
			} else {
				Ok(Some(SecretString::new(value)))
			}
		}
		(None, None) => Ok(None),
	}
}
