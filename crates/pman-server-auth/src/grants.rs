// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Group grants and the read/write authorization check.
//!
//! An identity's access is stored as a compact string such as
//! `team1:read_write,ops:read`. Every check reparses that string; nothing is
//! cached between requests, so an updated grant takes effect on the next call.
//!
//! Parsing fails closed: one malformed entry rejects the whole string, and
//! [`authorize`] answers `false` for every group when the string does not parse.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Access level held on a single group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
	Read,
	ReadWrite,
}

impl Permission {
	pub fn as_str(&self) -> &'static str {
		match self {
			Permission::Read => "read",
			Permission::ReadWrite => "read_write",
		}
	}

	pub fn allows_write(&self) -> bool {
		matches!(self, Permission::ReadWrite)
	}
}

impl fmt::Display for Permission {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Permission {
	type Err = GrantParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"read" => Ok(Permission::Read),
			"read_write" => Ok(Permission::ReadWrite),
			other => Err(GrantParseError::UnknownPermission {
				permission: other.to_string(),
			}),
		}
	}
}

/// A `(group, permission)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupGrant {
	pub group: String,
	pub permission: Permission,
}

impl GroupGrant {
	pub fn new(group: impl Into<String>, permission: Permission) -> Self {
		Self {
			group: group.into(),
			permission,
		}
	}
}

impl fmt::Display for GroupGrant {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}", self.group, self.permission)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GrantParseError {
	#[error("invalid grant entry '{entry}': expected <group>:<permission>")]
	InvalidEntry { entry: String },

	#[error("unknown permission '{permission}': expected read or read_write")]
	UnknownPermission { permission: String },

	#[error("group '{group}' is granted more than once")]
	DuplicateGroup { group: String },
}

/// Ordered set of grants, unique by group, in the order they were written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupGrants(Vec<GroupGrant>);

impl GroupGrants {
	/// Parse a comma separated `group:permission` list.
	///
	/// Empty input yields no grants. Blank entries between commas are skipped.
	/// Any other entry must split on `:` into exactly two non-empty trimmed
	/// tokens with a known permission, otherwise the whole string is rejected.
	pub fn parse(input: &str) -> Result<Self, GrantParseError> {
		let mut grants: Vec<GroupGrant> = Vec::new();

		for raw in input.split(',') {
			let entry = raw.trim();
			if entry.is_empty() {
				continue;
			}

			let parts: Vec<&str> = entry.split(':').map(str::trim).collect();
			let [group, permission] = parts.as_slice() else {
				return Err(GrantParseError::InvalidEntry {
					entry: entry.to_string(),
				});
			};
			if group.is_empty() || permission.is_empty() {
				return Err(GrantParseError::InvalidEntry {
					entry: entry.to_string(),
				});
			}

			let permission = permission.parse::<Permission>()?;
			if grants.iter().any(|g| g.group == *group) {
				return Err(GrantParseError::DuplicateGroup {
					group: group.to_string(),
				});
			}
			grants.push(GroupGrant::new(*group, permission));
		}

		Ok(Self(grants))
	}

	pub fn get(&self, group: &str) -> Option<&GroupGrant> {
		self.0.iter().find(|g| g.group == group)
	}

	/// Read is satisfied by either permission; write needs `read_write`.
	pub fn allows(&self, group: &str, require_write: bool) -> bool {
		match self.get(group) {
			Some(grant) => !require_write || grant.permission.allows_write(),
			None => false,
		}
	}

	pub fn iter(&self) -> impl Iterator<Item = &GroupGrant> {
		self.0.iter()
	}

	pub fn groups(&self) -> impl Iterator<Item = &str> {
		self.0.iter().map(|g| g.group.as_str())
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl fmt::Display for GroupGrants {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (i, grant) in self.0.iter().enumerate() {
			if i > 0 {
				f.write_str(",")?;
			}
			write!(f, "{grant}")?;
		}
		Ok(())
	}
}

impl FromStr for GroupGrants {
	type Err = GrantParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		GroupGrants::parse(s)
	}
}

/// Parse a grant string. See [`GroupGrants::parse`].
pub fn parse_grants(input: &str) -> Result<GroupGrants, GrantParseError> {
	GroupGrants::parse(input)
}

/// Decide whether `grants` allows access to `group`.
///
/// Never fails: an unparsable grant string authorizes nothing.
pub fn authorize(grants: &str, group: &str, require_write: bool) -> bool {
	match GroupGrants::parse(grants) {
		Ok(parsed) => parsed.allows(group, require_write),
		Err(e) => {
			tracing::debug!(error = %e, group, "rejecting malformed grant string");
			false
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	mod parse {
		use super::*;

		#[test]
		fn empty_string_has_no_grants() {
			let grants = parse_grants("").unwrap();
			assert!(grants.is_empty());
		}

		#[test]
		fn keeps_written_order() {
			let grants = parse_grants("team2:read,team1:read_write").unwrap();
			let groups: Vec<&str> = grants.groups().collect();
			assert_eq!(groups, vec!["team2", "team1"]);
			assert_eq!(
				grants.get("team1").map(|g| g.permission),
				Some(Permission::ReadWrite)
			);
		}

		#[test]
		fn trims_whitespace_and_skips_blank_entries() {
			let grants = parse_grants(" ops : read ,, dev:read_write , ").unwrap();
			assert_eq!(grants.len(), 2);
			assert_eq!(grants.to_string(), "ops:read,dev:read_write");
		}

		#[test]
		fn rejects_missing_permission() {
			assert_eq!(
				parse_grants("team1"),
				Err(GrantParseError::InvalidEntry {
					entry: "team1".to_string()
				})
			);
		}

		#[test]
		fn rejects_extra_separator() {
			assert!(parse_grants("team1:read:write").is_err());
		}

		#[test]
		fn rejects_empty_tokens() {
			assert!(parse_grants(":read").is_err());
			assert!(parse_grants("team1:").is_err());
			assert!(parse_grants("team1: ").is_err());
		}

		#[test]
		fn rejects_legacy_short_tokens() {
			assert!(matches!(
				parse_grants("team1:rw"),
				Err(GrantParseError::UnknownPermission { .. })
			));
		}

		#[test]
		fn one_bad_entry_rejects_everything() {
			assert!(parse_grants("team1:read_write,team2:admin").is_err());
		}

		#[test]
		fn rejects_duplicate_group() {
			assert_eq!(
				parse_grants("team1:read,team1:read_write"),
				Err(GrantParseError::DuplicateGroup {
					group: "team1".to_string()
				})
			);
		}
	}

	mod authorize_checks {
		use super::*;

		#[test]
		fn read_grant_allows_read_only() {
			assert!(authorize("team1:read", "team1", false));
			assert!(!authorize("team1:read", "team1", true));
		}

		#[test]
		fn read_write_grant_allows_both() {
			assert!(authorize("team1:read_write", "team1", false));
			assert!(authorize("team1:read_write", "team1", true));
		}

		#[test]
		fn other_groups_denied() {
			assert!(!authorize("team1:read_write", "team2", false));
			assert!(!authorize("", "team1", false));
		}

		#[test]
		fn malformed_grants_deny_even_listed_group() {
			assert!(!authorize("team1:read_write,broken", "team1", false));
		}
	}

	fn group_name() -> impl Strategy<Value = String> {
		"[a-z][a-z0-9_-]{0,11}"
	}

	fn permission() -> impl Strategy<Value = Permission> {
		prop_oneof![Just(Permission::Read), Just(Permission::ReadWrite)]
	}

	fn grant_string() -> impl Strategy<Value = String> {
		proptest::collection::btree_map(group_name(), permission(), 0..6).prop_map(|m| {
			m.into_iter()
				.map(|(g, p)| format!("{g}:{p}"))
				.collect::<Vec<_>>()
				.join(",")
		})
	}

	fn bad_entry() -> impl Strategy<Value = String> {
		prop_oneof![
			group_name(),
			group_name().prop_map(|g| format!("{g}:")),
			group_name().prop_map(|g| format!("{g}:rw")),
			group_name().prop_map(|g| format!("{g}:read:extra")),
			Just(":read_write".to_string()),
		]
	}

	proptest! {
		#[test]
		fn write_implies_read(grants in grant_string(), group in group_name()) {
			if authorize(&grants, &group, true) {
				prop_assert!(authorize(&grants, &group, false));
			}
		}

		#[test]
		fn malformed_grants_fail_closed(
			grants in grant_string(),
			bad in bad_entry(),
			group in group_name(),
		) {
			let malformed = if grants.is_empty() { bad } else { format!("{grants},{bad}") };
			prop_assert!(parse_grants(&malformed).is_err());
			prop_assert!(!authorize(&malformed, &group, false));
			prop_assert!(!authorize(&malformed, &group, true));
		}

		#[test]
		fn display_reparses_to_same_grants(grants in grant_string()) {
			let parsed = parse_grants(&grants).unwrap();
			prop_assert_eq!(parsed.to_string(), grants.clone());
			prop_assert_eq!(parse_grants(&parsed.to_string()).unwrap(), parsed);
		}
	}
}
