// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod activity;
pub mod user;

pub use activity::{ActivityRecord, NormalizedActivity};
pub use user::{NewUser, TokenRecord, TokenSet, User};
