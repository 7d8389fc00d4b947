// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use zoneward_server_auth::{NewUser, Origin, User, Zone, ZoneContext, ZoneId};
use zoneward_server_db::{
	testing::create_test_pool, ClientRepository, CodeRepository, DbError, UserRepository,
	ZoneRepository, ZoneStore,
};

use crate::email_change::EmailChangeService;
use crate::invitation::InvitationService;
use crate::redirect::RedirectResolver;
use crate::settings::VerificationSettings;

/// Repositories over one in-memory database.
pub(crate) struct Fixture {
	pub pool: SqlitePool,
	pub users: Arc<UserRepository>,
	pub codes: Arc<CodeRepository>,
	pub zones: Arc<ZoneRepository>,
	pub clients: Arc<ClientRepository>,
}

impl Fixture {
	pub async fn new() -> Self {
		let pool = create_test_pool().await;
		Self {
			users: Arc::new(UserRepository::new(pool.clone())),
			codes: Arc::new(CodeRepository::new(pool.clone())),
			zones: Arc::new(ZoneRepository::new(pool.clone())),
			clients: Arc::new(ClientRepository::new(pool.clone())),
			pool,
		}
	}

	fn redirects(&self) -> RedirectResolver {
		RedirectResolver::new(self.clients.clone())
	}

	pub fn email_change(&self) -> EmailChangeService {
		EmailChangeService::new(
			self.users.clone(),
			self.codes.clone(),
			self.zones.clone(),
			self.redirects(),
			VerificationSettings::default(),
		)
	}

	pub fn invitations(&self) -> InvitationService {
		InvitationService::new(
			self.users.clone(),
			self.codes.clone(),
			self.zones.clone(),
			self.redirects(),
			VerificationSettings::default(),
		)
	}

	/// Services whose zone lookups always fail.
	pub fn without_zones(&self) -> (EmailChangeService, InvitationService) {
		let zones: Arc<dyn ZoneStore> = Arc::new(UnavailableZones);
		(
			EmailChangeService::new(
				self.users.clone(),
				self.codes.clone(),
				zones.clone(),
				self.redirects(),
				VerificationSettings::default(),
			),
			InvitationService::new(
				self.users.clone(),
				self.codes.clone(),
				zones,
				self.redirects(),
				VerificationSettings::default(),
			),
		)
	}

	pub async fn user(&self, ctx: &ZoneContext, username: &str, email: &str) -> User {
		self.users
			.create_user(ctx, &NewUser::new(username, email, Origin::Internal))
			.await
			.unwrap()
	}

	pub async fn stored_codes(&self) -> i64 {
		let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM expiring_codes")
			.fetch_one(&self.pool)
			.await
			.unwrap();
		count.0
	}
}

struct UnavailableZones;

#[async_trait]
impl ZoneStore for UnavailableZones {
	async fn create_zone(&self, _zone: &Zone) -> Result<(), DbError> {
		Err(DbError::Internal("zone store unavailable".to_string()))
	}

	async fn get_zone_by_id(&self, _id: &ZoneId) -> Result<Option<Zone>, DbError> {
		Err(DbError::Internal("zone store unavailable".to_string()))
	}

	async fn get_zone_by_subdomain(&self, _subdomain: &str) -> Result<Option<Zone>, DbError> {
		Err(DbError::Internal("zone store unavailable".to_string()))
	}

	async fn list_zones(&self) -> Result<Vec<Zone>, DbError> {
		Err(DbError::Internal("zone store unavailable".to_string()))
	}
}
