// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Connection pool for the identity store.
//!
//! Every connection runs in WAL mode with foreign keys enforced, so a user
//! row can never point at a zone that does not exist. Writers wait up to
//! [`BUSY_TIMEOUT`] for the lock before failing with `SQLITE_BUSY`.

use sqlx::sqlite::{
	SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::str::FromStr;
use std::time::Duration;

use crate::error::DbError;

pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open the database at `database_url`, creating the file if needed.
///
/// An in-memory URL always gets a single connection, since each SQLite
/// in-memory connection is a separate database.
#[tracing::instrument(skip(database_url))]
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<SqlitePool, DbError> {
	if max_connections == 0 {
		return Err(DbError::InvalidInput(
			"max_connections must be greater than zero".to_string(),
		));
	}

	let options = SqliteConnectOptions::from_str(database_url)
		.map_err(|e| DbError::Internal(format!("Invalid database URL: {e}")))?
		.journal_mode(SqliteJournalMode::Wal)
		.synchronous(SqliteSynchronous::Normal)
		.foreign_keys(true)
		.busy_timeout(BUSY_TIMEOUT)
		.create_if_missing(true);

	let max_connections = if database_url.contains(":memory:") {
		1
	} else {
		max_connections
	};

	let pool = SqlitePoolOptions::new()
		.max_connections(max_connections)
		.connect_with(options)
		.await?;

	tracing::debug!(max_connections, "database pool created");
	Ok(pool)
}
