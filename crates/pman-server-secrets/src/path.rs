// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shape rules for secret paths and group names.

/// Separator between path segments.
pub const SEPARATOR: char = '/';

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
	#[error("path must not be empty")]
	EmptyPath,

	#[error("path '{0}' must not start or end with '/'")]
	EdgeSeparator(String),

	#[error("path '{0}' contains an empty segment")]
	EmptySegment(String),

	#[error("{what} contains control characters")]
	ControlCharacter { what: &'static str },

	#[error("group name must not be empty")]
	EmptyGroup,

	#[error("group name '{0}' must not contain '/', ':' or ','")]
	InvalidGroup(String),

	#[error("group name '{0}' must not start or end with whitespace")]
	GroupWhitespace(String),

	#[error("prefix must not be empty")]
	EmptyPrefix,
}

/// A secret path: non-empty `/`-separated segments, none of them empty.
pub fn validate_path(path: &str) -> Result<(), PathError> {
	if path.is_empty() {
		return Err(PathError::EmptyPath);
	}
	if path.chars().any(char::is_control) {
		return Err(PathError::ControlCharacter { what: "path" });
	}
	if path.starts_with(SEPARATOR) || path.ends_with(SEPARATOR) {
		return Err(PathError::EdgeSeparator(path.to_string()));
	}
	if path.split(SEPARATOR).any(str::is_empty) {
		return Err(PathError::EmptySegment(path.to_string()));
	}
	Ok(())
}

/// Group names end up inside grant strings, so the grant delimiters are
/// not allowed. Grant entries are trimmed when parsed, so surrounding
/// whitespace is rejected too.
pub fn validate_group(group: &str) -> Result<(), PathError> {
	if group.trim().is_empty() {
		return Err(PathError::EmptyGroup);
	}
	if group.trim() != group {
		return Err(PathError::GroupWhitespace(group.to_string()));
	}
	if group.chars().any(char::is_control) {
		return Err(PathError::ControlCharacter { what: "group name" });
	}
	if group.contains([SEPARATOR, ':', ',']) {
		return Err(PathError::InvalidGroup(group.to_string()));
	}
	Ok(())
}

/// Normalize the prefix of a recursive delete: one trailing `/` is
/// accepted, the remainder must be a valid path.
pub fn normalize_folder_prefix(prefix: &str) -> Result<&str, PathError> {
	let trimmed = prefix.strip_suffix(SEPARATOR).unwrap_or(prefix);
	if trimmed.is_empty() {
		return Err(PathError::EmptyPrefix);
	}
	validate_path(trimmed)?;
	Ok(trimmed)
}

/// List filters are raw string prefixes and may end mid-segment.
pub fn validate_list_prefix(prefix: &str) -> Result<(), PathError> {
	if prefix.chars().any(char::is_control) {
		return Err(PathError::ControlCharacter { what: "prefix" });
	}
	Ok(())
}
