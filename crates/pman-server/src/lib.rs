// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! pman server wiring.
//!
//! Builds the services from a resolved [`ServerConfig`]: opens the database,
//! applies migrations, derives the cipher and token keys, and makes sure the
//! bootstrap administrator exists.

pub mod logging;
pub mod state;
pub mod version;

pub use pman_server_config::ServerConfig;
pub use state::{create_app_state, create_app_state_with_pool, AppState};
