// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod accounts;
pub mod events;
pub mod password;
pub mod token;

pub use events::{EditOutcome, FieldErrors, ValidationError};
pub use token::{Claims, IssuedToken, TokenError};
