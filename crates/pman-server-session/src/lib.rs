// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Identities, login and session tokens for pman.
//!
//! - [`SessionAuthority`]: credential checks, token issuance, revocation,
//!   validation and the expired-token sweep
//! - [`IdentityService`]: identity administration and the bootstrap admin
//! - [`TokenCodec`]: HS256 signing and verification of [`Claims`]
//! - [`TokenCleanupJob`]: scheduler job wrapping the sweep
//!
//! A token passes [`SessionAuthority::validate`] only if all of these hold:
//!
//! 1. it is a well-formed JWT signed with the configured secret
//! 2. its issuer is the configured domain and it has not expired
//! 3. its hash is not marked revoked
//! 4. its identity still exists and is enabled

pub mod authority;
pub mod cleanup;
pub mod error;
pub mod identity;
pub mod token;

pub use authority::{
	tracked_until, IssuedSession, LoginOutcome, SessionAuthority, SessionConfig, DEFAULT_EXPIRE_DAYS,
};
pub use cleanup::{TokenCleanupJob, TOKEN_CLEANUP_JOB_ID};
pub use error::{SessionError, SessionResult};
pub use identity::IdentityService;
pub use token::{Claims, TokenCodec};
