// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Identity zone repository.
//!
//! Zones are created administratively and read by everything else. Subdomains
//! are unique across all zones, compared case-insensitively.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqlitePool, Row};
use zoneward_server_auth::{Zone, ZoneId};

use crate::error::DbError;
use crate::row::parse_timestamp;

#[async_trait]
pub trait ZoneStore: Send + Sync {
	async fn create_zone(&self, zone: &Zone) -> Result<(), DbError>;
	async fn get_zone_by_id(&self, id: &ZoneId) -> Result<Option<Zone>, DbError>;
	async fn get_zone_by_subdomain(&self, subdomain: &str) -> Result<Option<Zone>, DbError>;
	async fn list_zones(&self) -> Result<Vec<Zone>, DbError>;
}

#[derive(Clone)]
pub struct ZoneRepository {
	pool: SqlitePool,
}

impl ZoneRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Create a zone.
	///
	/// # Errors
	/// Returns `DbError::Conflict` if the id or the subdomain is already taken.
	#[tracing::instrument(skip(self, zone), fields(zone_id = %zone.id, subdomain = %zone.subdomain))]
	pub async fn create_zone(&self, zone: &Zone) -> Result<(), DbError> {
		let now = Utc::now().to_rfc3339();
		sqlx::query(
			r#"
			INSERT INTO identity_zones (id, subdomain, name, description, created_at, updated_at)
			VALUES (?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(zone.id.as_str())
		.bind(zone.subdomain.trim().to_lowercase())
		.bind(&zone.name)
		.bind(&zone.description)
		.bind(zone.created_at.to_rfc3339())
		.bind(now)
		.execute(&self.pool)
		.await
		.map_err(|e| match e {
			sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
				if db_err.message().contains("identity_zones.id") {
					DbError::Conflict(format!("zone {} already exists", zone.id))
				} else {
					DbError::Conflict(format!(
						"The subdomain name {} is already taken. Please use a different subdomain",
						zone.subdomain
					))
				}
			}
			_ => DbError::Sqlx(e),
		})?;

		tracing::debug!("zone created");
		Ok(())
	}

	#[tracing::instrument(skip(self), fields(zone_id = %id))]
	pub async fn get_zone_by_id(&self, id: &ZoneId) -> Result<Option<Zone>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, subdomain, name, description, created_at, updated_at
			FROM identity_zones
			WHERE id = ?
			"#,
		)
		.bind(id.as_str())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| row_to_zone(&r)).transpose()
	}

	/// Look a zone up by subdomain, ignoring case. Subdomains are stored
	/// lowercased.
	#[tracing::instrument(skip(self))]
	pub async fn get_zone_by_subdomain(&self, subdomain: &str) -> Result<Option<Zone>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, subdomain, name, description, created_at, updated_at
			FROM identity_zones
			WHERE subdomain = ?
			"#,
		)
		.bind(subdomain.trim().to_lowercase())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| row_to_zone(&r)).transpose()
	}

	#[tracing::instrument(skip(self))]
	pub async fn list_zones(&self) -> Result<Vec<Zone>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT id, subdomain, name, description, created_at, updated_at
			FROM identity_zones
			ORDER BY id
			"#,
		)
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(row_to_zone).collect()
	}
}

#[async_trait]
impl ZoneStore for ZoneRepository {
	async fn create_zone(&self, zone: &Zone) -> Result<(), DbError> {
		self.create_zone(zone).await
	}

	async fn get_zone_by_id(&self, id: &ZoneId) -> Result<Option<Zone>, DbError> {
		self.get_zone_by_id(id).await
	}

	async fn get_zone_by_subdomain(&self, subdomain: &str) -> Result<Option<Zone>, DbError> {
		self.get_zone_by_subdomain(subdomain).await
	}

	async fn list_zones(&self) -> Result<Vec<Zone>, DbError> {
		self.list_zones().await
	}
}

fn row_to_zone(row: &sqlx::sqlite::SqliteRow) -> Result<Zone, DbError> {
	let id: String = row.get("id");
	Ok(Zone {
		id: ZoneId::new(id),
		subdomain: row.get("subdomain"),
		name: row.get("name"),
		description: row.get("description"),
		created_at: parse_timestamp(row, "created_at")?,
		updated_at: parse_timestamp(row, "updated_at")?,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_test_pool;
	use zoneward_server_auth::DEFAULT_ZONE_ID;

	#[tokio::test]
	async fn default_zone_is_seeded() {
		let repo = ZoneRepository::new(create_test_pool().await);

		let zone = repo
			.get_zone_by_id(&ZoneId::default_zone())
			.await
			.unwrap()
			.expect("default zone");
		assert_eq!(zone.id.as_str(), DEFAULT_ZONE_ID);
		assert_eq!(zone.subdomain, "");
		assert_eq!(zone.name, "uaa");
		assert!(zone.is_default());
	}

	#[tokio::test]
	async fn create_and_fetch_by_subdomain_ignoring_case() {
		let repo = ZoneRepository::new(create_test_pool().await);
		let zone = Zone::new("twiglet-id", "twiglet", "The Twiglet Zone");
		repo.create_zone(&zone).await.unwrap();

		let found = repo
			.get_zone_by_subdomain("TWIGLET")
			.await
			.unwrap()
			.expect("zone by subdomain");
		assert_eq!(found.id, zone.id);
		assert_eq!(found.name, "The Twiglet Zone");
	}

	#[tokio::test]
	async fn non_ascii_subdomain_matches_any_case() {
		let repo = ZoneRepository::new(create_test_pool().await);
		repo.create_zone(&Zone::new("zurich", "zürich", "Zürich"))
			.await
			.unwrap();

		let found = repo
			.get_zone_by_subdomain("ZÜRICH")
			.await
			.unwrap()
			.expect("zone by folded subdomain");
		assert_eq!(found.id.as_str(), "zurich");

		let err = repo
			.create_zone(&Zone::new("zurich-2", "ZÜRICH", "Again"))
			.await
			.unwrap_err();
		assert!(matches!(err, DbError::Conflict(_)), "{err:?}");
	}

	#[tokio::test]
	async fn duplicate_subdomain_is_conflict() {
		let repo = ZoneRepository::new(create_test_pool().await);
		repo.create_zone(&Zone::new("z1", "shared", "One"))
			.await
			.unwrap();

		let err = repo
			.create_zone(&Zone::new("z2", "SHARED", "Two"))
			.await
			.unwrap_err();
		match err {
			DbError::Conflict(msg) => assert!(msg.contains("subdomain"), "message: {msg}"),
			other => panic!("expected conflict, got {other:?}"),
		}
	}

	#[tokio::test]
	async fn duplicate_id_is_conflict() {
		let repo = ZoneRepository::new(create_test_pool().await);
		repo.create_zone(&Zone::new("z1", "one", "One")).await.unwrap();

		let err = repo
			.create_zone(&Zone::new("z1", "two", "Two"))
			.await
			.unwrap_err();
		match err {
			DbError::Conflict(msg) => assert!(msg.contains("z1"), "message: {msg}"),
			other => panic!("expected conflict, got {other:?}"),
		}
	}

	#[tokio::test]
	async fn list_includes_default_and_created() {
		let repo = ZoneRepository::new(create_test_pool().await);
		repo.create_zone(&Zone::new("z1", "one", "One")).await.unwrap();

		let zones = repo.list_zones().await.unwrap();
		let ids: Vec<_> = zones.iter().map(|z| z.id.as_str()).collect();
		assert_eq!(ids, vec!["uaa", "z1"]);
	}

	#[tokio::test]
	async fn unknown_zone_is_none() {
		let repo = ZoneRepository::new(create_test_pool().await);
		assert!(repo
			.get_zone_by_id(&ZoneId::new("missing"))
			.await
			.unwrap()
			.is_none());
		assert!(repo
			.get_zone_by_subdomain("missing")
			.await
			.unwrap()
			.is_none());
	}
}
