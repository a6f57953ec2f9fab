// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! # pman-server-db
//!
//! SQLite persistence for pman via sqlx.
//!
//! ## Repository Pattern
//!
//! Each table has an async `*Store` trait describing the operations and a
//! `*Repository` struct holding a `SqlitePool` that implements it. Services
//! depend on the trait so tests can swap storage.
//!
//! | Table | Trait | Repository |
//! |-------|-------|------------|
//! | `identities` | [`IdentityStore`] | [`IdentityRepository`] |
//! | `secrets` | [`SecretRowStore`] | [`SecretRowRepository`] |
//! | `revoked_tokens` | [`IssuedTokenStore`] | [`IssuedTokenRepository`] |
//!
//! ## Conventions
//!
//! - Lookups by key return `Result<Option<T>>`.
//! - Updates and deletes by key return `Result<bool>`; `false` means no row
//!   matched and nothing changed. Callers turn that into their own not-found
//!   error.
//! - Bulk deletes return the affected row count as `u64`.
//! - Unique violations on insert surface as [`DbError::Conflict`].
//! - Timestamps are fixed-width RFC 3339 UTC text.
//!
//! ## Testing
//!
//! [`testing::create_test_pool`] returns a single-connection in-memory pool
//! with [`run_migrations`] already applied.

pub mod error;
pub mod identity;
pub mod migrations;
pub mod pool;
pub mod secret;
pub mod testing;
mod time;
pub mod token;

pub use error::{DbError, Result};
pub use identity::{IdentityRepository, IdentityStore};
pub use migrations::run_migrations;
pub use pool::create_pool;
pub use secret::{SecretInfo, SecretRecord, SecretRowRepository, SecretRowStore};
pub use token::{IssuedToken, IssuedTokenRepository, IssuedTokenStore};

pub use sqlx::SqlitePool;
