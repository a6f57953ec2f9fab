// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Argon2 parameters for account password hashing.
//!
//! Release builds use `Argon2::default()` (Argon2id, 19 MiB, 2 passes,
//! parallelism 1). Unit tests of this crate, and downstream crates that enable
//! the `test-params` feature for their test suites, get a 1 MiB single-pass
//! instance instead. Those parameters MUST NOT reach production.

use argon2::Argon2;
#[cfg(any(test, feature = "test-params"))]
use argon2::{Algorithm, Params, Version};

#[inline]
pub(crate) fn argon2_instance() -> Argon2<'static> {
	#[cfg(any(test, feature = "test-params"))]
	{
		match Params::new(1024, 1, 1, None) {
			Ok(params) => Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
			Err(_) => Argon2::default(),
		}
	}

	#[cfg(not(any(test, feature = "test-params")))]
	{
		Argon2::default()
	}
}
