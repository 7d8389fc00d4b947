// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Registered client lookup.
//!
//! Clients are scoped to a zone like users: a client registered in another
//! zone is reported as absent.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use sqlx::{sqlite::SqlitePool, Row};
use zoneward_server_auth::{ClientRegistration, ZoneContext, ZoneId};

use crate::error::DbError;

#[async_trait]
pub trait ClientStore: Send + Sync {
	async fn create_client(
		&self,
		ctx: &ZoneContext,
		client: &ClientRegistration,
	) -> Result<(), DbError>;
	async fn get_client(
		&self,
		ctx: &ZoneContext,
		client_id: &str,
	) -> Result<Option<ClientRegistration>, DbError>;
}

#[derive(Clone)]
pub struct ClientRepository {
	pool: SqlitePool,
}

impl ClientRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Register a client in the context's zone.
	///
	/// # Errors
	/// - `DbError::InvalidInput` if the registration names a different zone.
	/// - `DbError::Conflict` if the client id is already registered in the zone.
	#[tracing::instrument(skip(self, ctx, client), fields(zone_id = %ctx.zone_id(), client_id = %client.client_id))]
	pub async fn create_client(
		&self,
		ctx: &ZoneContext,
		client: &ClientRegistration,
	) -> Result<(), DbError> {
		if &client.zone_id != ctx.zone_id() {
			return Err(DbError::InvalidInput(format!(
				"client belongs to zone {}, not {}",
				client.zone_id,
				ctx.zone_id()
			)));
		}

		let now = Utc::now().to_rfc3339();
		sqlx::query(
			r#"
			INSERT INTO oauth_clients (
				client_id, zone_id, grant_types, redirect_uris, additional_information,
				created_at, updated_at
			) VALUES (?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(&client.client_id)
		.bind(ctx.zone_id().as_str())
		.bind(serde_json::to_string(&client.grant_types)?)
		.bind(serde_json::to_string(&client.redirect_uris)?)
		.bind(serde_json::to_string(&client.additional_information)?)
		.bind(&now)
		.bind(&now)
		.execute(&self.pool)
		.await
		.map_err(|e| match e {
			sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
				DbError::Conflict(format!("client {} already exists", client.client_id))
			}
			_ => DbError::Sqlx(e),
		})?;

		tracing::debug!("client registered");
		Ok(())
	}

	#[tracing::instrument(skip(self, ctx), fields(zone_id = %ctx.zone_id()))]
	pub async fn get_client(
		&self,
		ctx: &ZoneContext,
		client_id: &str,
	) -> Result<Option<ClientRegistration>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT client_id, zone_id, grant_types, redirect_uris, additional_information
			FROM oauth_clients
			WHERE client_id = ? AND zone_id = ?
			"#,
		)
		.bind(client_id)
		.bind(ctx.zone_id().as_str())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| row_to_client(&r)).transpose()
	}
}

#[async_trait]
impl ClientStore for ClientRepository {
	async fn create_client(
		&self,
		ctx: &ZoneContext,
		client: &ClientRegistration,
	) -> Result<(), DbError> {
		self.create_client(ctx, client).await
	}

	async fn get_client(
		&self,
		ctx: &ZoneContext,
		client_id: &str,
	) -> Result<Option<ClientRegistration>, DbError> {
		self.get_client(ctx, client_id).await
	}
}

fn row_to_client(row: &sqlx::sqlite::SqliteRow) -> Result<ClientRegistration, DbError> {
	let zone_id: String = row.get("zone_id");
	let grant_types: String = row.get("grant_types");
	let redirect_uris: String = row.get("redirect_uris");
	let additional_information: String = row.get("additional_information");

	Ok(ClientRegistration {
		client_id: row.get("client_id"),
		zone_id: ZoneId::new(zone_id),
		grant_types: serde_json::from_str(&grant_types)?,
		redirect_uris: serde_json::from_str(&redirect_uris)?,
		additional_information: serde_json::from_str::<Map<String, Value>>(
			&additional_information,
		)?,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_test_pool;
	use crate::zone::ZoneRepository;
	use zoneward_server_auth::{RedirectPurpose, Zone};

	fn app_client(zone: &str) -> ClientRegistration {
		ClientRegistration::new("app", zone)
			.with_grant_type("authorization_code")
			.with_redirect_uri("http://app.com/*")
			.with_fallback(RedirectPurpose::EmailChange, "http://fallback.url/redirect")
	}

	#[tokio::test]
	async fn registered_client_round_trips() {
		let repo = ClientRepository::new(create_test_pool().await);
		let ctx = ZoneContext::default();
		repo.create_client(&ctx, &app_client("uaa")).await.unwrap();

		let client = repo.get_client(&ctx, "app").await.unwrap().expect("client");
		assert_eq!(client, app_client("uaa"));
		assert_eq!(
			client.fallback_redirect(RedirectPurpose::EmailChange).as_deref(),
			Some("http://fallback.url/redirect")
		);
	}

	#[tokio::test]
	async fn client_in_other_zone_is_not_found() {
		let pool = create_test_pool().await;
		ZoneRepository::new(pool.clone())
			.create_zone(&Zone::new("z2", "z2", "Zone Two"))
			.await
			.unwrap();
		let repo = ClientRepository::new(pool);
		let other = ZoneContext::new("z2");
		repo.create_client(&other, &app_client("z2")).await.unwrap();

		assert!(repo
			.get_client(&ZoneContext::default(), "app")
			.await
			.unwrap()
			.is_none());
		assert!(repo.get_client(&other, "app").await.unwrap().is_some());
	}

	#[tokio::test]
	async fn duplicate_client_is_conflict() {
		let repo = ClientRepository::new(create_test_pool().await);
		let ctx = ZoneContext::default();
		repo.create_client(&ctx, &app_client("uaa")).await.unwrap();

		let err = repo
			.create_client(&ctx, &app_client("uaa"))
			.await
			.unwrap_err();
		assert!(matches!(err, DbError::Conflict(_)));
	}

	#[tokio::test]
	async fn zone_mismatch_is_rejected() {
		let repo = ClientRepository::new(create_test_pool().await);
		let err = repo
			.create_client(&ZoneContext::default(), &app_client("elsewhere"))
			.await
			.unwrap_err();
		assert!(matches!(err, DbError::InvalidInput(_)));
	}
}
