// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod proxy;
pub mod strava;
pub mod sync;
pub mod tokens;

pub use proxy::{ProxyOutcome, ProxyService};
pub use strava::{ActivityQuery, StravaAthlete, StravaClient};
pub use sync::SyncPolicy;
pub use tokens::TokenManager;
