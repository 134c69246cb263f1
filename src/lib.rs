// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Fitcal: calendar backend for a fitness-tracking app
//!
//! This crate provides the HTTP API for account registration, token-based
//! sessions with server-side revocation, and owner-scoped calendar events.

pub mod config;
pub mod db;
pub mod error;
pub mod ids;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::CredentialStore;
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    /// Process-wide store handle, built once at startup.
    pub db: Arc<dyn CredentialStore>,
}
