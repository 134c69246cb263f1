// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod event;
pub mod revocation;
pub mod user;

pub use event::{Event, EventKind, EventPatch, TimeWindow, UpdateOutcome};
pub use revocation::RevokedToken;
pub use user::User;
