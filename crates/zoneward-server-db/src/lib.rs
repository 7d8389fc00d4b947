// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! # zoneward-server-db
//!
//! Persistence for zones, users, expiring codes and clients using SQLite via
//! sqlx.
//!
//! ## Repository Pattern
//!
//! Each domain has two components:
//! - **`*Store` trait**: the interface consumed by the verification services
//! - **`*Repository` struct**: concrete implementation holding a `SqlitePool`
//!
//! The trait impls delegate to inherent methods, which carry the tracing spans.
//!
//! ## Zone Scoping
//!
//! [`UserStore`] and [`ClientStore`] methods take a
//! [`ZoneContext`](zoneward_server_auth::ZoneContext) and filter every query on
//! its zone. Records of other zones are indistinguishable from missing ones.
//!
//! ## Error Handling
//!
//! | Variant | When to use |
//! |---------|-------------|
//! | `NotFound` | An update targeted a record that does not exist in the zone |
//! | `Conflict` | Unique constraint violation |
//! | `InvalidInput` | Caller-supplied value rejected before touching storage |
//! | `Sqlx` | Unexpected database errors, propagated via `?` |
//! | `Internal` | Invalid stored data (e.g., unparseable UUID) |
//!
//! Lookups where absence is normal return `Result<Option<T>>`.

pub mod client;
pub mod code;
pub mod error;
pub mod migrations;
pub mod pool;
mod row;
pub mod testing;
pub mod user;
pub mod zone;

pub use client::{ClientRepository, ClientStore};
pub use code::{CodeRepository, CodeStore, MAX_GENERATE_ATTEMPTS};
pub use error::{DbError, Result};
pub use migrations::run_migrations;
pub use pool::create_pool;
pub use user::{UserRepository, UserStore};
pub use zone::{ZoneRepository, ZoneStore};
