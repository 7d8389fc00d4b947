// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use sqlx::sqlite::SqlitePool;

use crate::error::DbError;

const MIGRATIONS: &[(&str, &str)] = &[
	(
		"001_create_identity_zones",
		include_str!("../migrations/001_create_identity_zones.sql"),
	),
	(
		"002_create_users",
		include_str!("../migrations/002_create_users.sql"),
	),
	(
		"003_create_expiring_codes",
		include_str!("../migrations/003_create_expiring_codes.sql"),
	),
	(
		"004_create_oauth_clients",
		include_str!("../migrations/004_create_oauth_clients.sql"),
	),
];

/// Apply the schema and seed the default zone.
///
/// Every statement is idempotent, so this is safe to run on each start.
#[tracing::instrument(skip(pool))]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), DbError> {
	for (name, sql) in MIGRATIONS {
		for stmt in sql.split(';').filter(|s| !s.trim().is_empty()) {
			sqlx::query(stmt).execute(pool).await?;
		}
		tracing::debug!(migration = %name, "migration applied");
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_test_pool;

	#[tokio::test]
	async fn migrations_are_idempotent() {
		let pool = create_test_pool().await;
		run_migrations(&pool).await.unwrap();
		run_migrations(&pool).await.unwrap();

		let zones: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM identity_zones")
			.fetch_one(&pool)
			.await
			.unwrap();
		assert_eq!(zones.0, 1);
	}
}
