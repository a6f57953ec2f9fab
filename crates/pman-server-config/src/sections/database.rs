// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Database configuration.

use serde::Deserialize;
use std::path::PathBuf;

const SQLITE_SCHEME: &str = "sqlite:";

/// Database configuration (runtime, fully resolved).
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
	pub url: String,
}

impl Default for DatabaseConfig {
	fn default() -> Self {
		Self { url: default_url() }
	}
}

impl DatabaseConfig {
	/// Filesystem path of the SQLite file, when the URL names one.
	///
	/// `None` for in-memory databases.
	pub fn file_path(&self) -> Option<PathBuf> {
		let rest = self.url.strip_prefix(SQLITE_SCHEME)?;
		let rest = rest.strip_prefix("//").unwrap_or(rest);
		let path = rest.split('?').next().unwrap_or(rest);
		if path.is_empty() || path == ":memory:" {
			return None;
		}
		Some(PathBuf::from(path))
	}
}

fn default_url() -> String {
	match dirs::home_dir() {
		Some(home) => format!("{SQLITE_SCHEME}{}", home.join(".pman").join("pman.db").display()),
		None => format!("{SQLITE_SCHEME}./pman.db"),
	}
}

/// Database configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfigLayer {
	#[serde(default)]
	pub url: Option<String>,
	/// Plain file path, used when `url` is unset.
	#[serde(default)]
	pub path: Option<String>,
}

impl DatabaseConfigLayer {
	pub fn merge(&mut self, other: DatabaseConfigLayer) {
		if other.url.is_some() {
			self.url = other.url;
		}
		if other.path.is_some() {
			self.path = other.path;
		}
	}

	pub fn finalize(self) -> DatabaseConfig {
		let url = self
			.url
			.or_else(|| self.path.map(|p| format!("{SQLITE_SCHEME}{p}")))
			.unwrap_or_else(default_url);
		DatabaseConfig { url }
	}
}
