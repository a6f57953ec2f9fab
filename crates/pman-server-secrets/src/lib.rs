// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Encrypted secret storage for pman.
//!
//! Secrets live in groups and are addressed by `/`-separated paths. Folders
//! are implicit: `team/db` is a folder while any path starts with `team/db/`.
//!
//! - [`SecretCipher`]: AES-256-GCM envelope encryption of values
//! - [`SecretsService`]: authorized create/read/update/delete/list
//! - [`build_tree`]: folder view of a path listing

pub mod cipher;
pub mod error;
pub mod path;
pub mod service;
pub mod tree;

pub use cipher::{generate_key, CipherError, SecretCipher, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
pub use error::{SecretsError, SecretsResult};
pub use path::{validate_group, validate_path, PathError};
pub use service::SecretsService;
pub use tree::{build_tree, FolderNode};

pub use pman_server_db::SecretInfo;
