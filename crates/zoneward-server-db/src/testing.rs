// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Pools for tests, with the schema already applied.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

use crate::migrations::run_migrations;

/// In-memory database on a single connection.
///
/// Each SQLite in-memory connection is its own database, so the pool is capped
/// at one connection.
pub async fn create_test_pool() -> SqlitePool {
	let options = SqliteConnectOptions::from_str("sqlite::memory:").unwrap();
	let pool = SqlitePoolOptions::new()
		.max_connections(1)
		.connect_with(options)
		.await
		.unwrap();
	run_migrations(&pool).await.unwrap();
	pool
}

/// File-backed WAL database in `dir` with several connections.
pub async fn create_file_test_pool(dir: &Path, max_connections: u32) -> SqlitePool {
	let options = SqliteConnectOptions::new()
		.filename(dir.join("zoneward-test.db"))
		.journal_mode(SqliteJournalMode::Wal)
		.create_if_missing(true);
	let pool = SqlitePoolOptions::new()
		.max_connections(max_connections)
		.connect_with(options)
		.await
		.unwrap();
	run_migrations(&pool).await.unwrap();
	pool
}
