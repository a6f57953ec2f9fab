// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Folder view of a group's secret paths.
//!
//! Folders are implicit, so the tree is derived from a path listing. A path
//! can be both a secret and a folder (`db` and `db/user`); such nodes carry
//! the secret flag and children at the same time.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::path::SEPARATOR;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FolderNode {
	pub name: String,
	/// A secret is stored at exactly this node's path.
	pub is_secret: bool,
	pub children: BTreeMap<String, FolderNode>,
}

impl FolderNode {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			..Self::default()
		}
	}

	pub fn is_folder(&self) -> bool {
		!self.children.is_empty()
	}

	/// Number of secrets at or below this node.
	pub fn secret_count(&self) -> usize {
		usize::from(self.is_secret) + self.children.values().map(Self::secret_count).sum::<usize>()
	}

	/// Find a node by its path relative to this one.
	pub fn find(&self, path: &str) -> Option<&FolderNode> {
		path.split(SEPARATOR)
			.filter(|s| !s.is_empty())
			.try_fold(self, |node, segment| node.children.get(segment))
	}

	fn insert(&mut self, path: &str) {
		let mut node = self;
		for segment in path.split(SEPARATOR).filter(|s| !s.is_empty()) {
			node = node
				.children
				.entry(segment.to_string())
				.or_insert_with(|| FolderNode::new(segment));
		}
		node.is_secret = true;
	}

	/// Render as an indented text tree. Folders end in `/`; a folder that is
	/// also a secret is marked with `*`.
	///
	/// ```text
	/// team1
	/// ├── app/
	/// │   └── token
	/// └── db/
	///     ├── password
	///     └── user
	/// ```
	pub fn render(&self) -> String {
		let mut out = String::new();
		out.push_str(&self.name);
		out.push('\n');
		self.render_children(&mut out, "");
		out
	}

	fn render_children(&self, out: &mut String, indent: &str) {
		let last_idx = self.children.len().saturating_sub(1);
		for (idx, child) in self.children.values().enumerate() {
			let is_last = idx == last_idx;
			let branch = if is_last { "└── " } else { "├── " };
			let _ = writeln!(out, "{indent}{branch}{}", child.label());

			if child.is_folder() {
				let next = format!("{indent}{}", if is_last { "    " } else { "│   " });
				child.render_children(out, &next);
			}
		}
	}

	fn label(&self) -> String {
		match (self.is_folder(), self.is_secret) {
			(true, true) => format!("{}/ *", self.name),
			(true, false) => format!("{}/", self.name),
			_ => self.name.clone(),
		}
	}
}

/// Build the folder tree rooted at `root_name` from a list of paths.
pub fn build_tree<I, S>(root_name: &str, paths: I) -> FolderNode
where
	I: IntoIterator<Item = S>,
	S: AsRef<str>,
{
	let mut root = FolderNode::new(root_name);
	for path in paths {
		let path = path.as_ref();
		if !path.is_empty() {
			root.insert(path);
		}
	}
	root
}
