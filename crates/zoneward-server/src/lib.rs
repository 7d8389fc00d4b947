// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Zoneward server wiring: repositories, verification services and the
//! background scheduler, built from a resolved [`ServerConfig`].

pub mod jobs;

use sqlx::sqlite::SqlitePool;
use std::sync::Arc;
use zoneward_server_config::ServerConfig;
use zoneward_server_db::{
	ClientRepository, CodeRepository, UserRepository, ZoneRepository,
};
use zoneward_server_jobs::{JobScheduler, TriggerSource};
use zoneward_server_verification::{
	EmailChangeService, InvitationService, RedirectResolver, VerificationSettings,
};

pub use zoneward_server_db::{create_pool, run_migrations};

use crate::jobs::{ExpiredCodeCleanupJob, EXPIRED_CODE_CLEANUP_JOB_ID};

/// Everything a request handler needs, sharing one pool.
#[derive(Clone)]
pub struct AppState {
	pub pool: SqlitePool,
	pub zones: Arc<ZoneRepository>,
	pub users: Arc<UserRepository>,
	pub clients: Arc<ClientRepository>,
	pub codes: Arc<CodeRepository>,
	pub email_change: EmailChangeService,
	pub invitations: InvitationService,
}

pub fn verification_settings(config: &ServerConfig) -> VerificationSettings {
	VerificationSettings {
		email_change_ttl: config.codes.email_change_ttl(),
		invitation_ttl: config.codes.invitation_ttl(),
		brand: config.directory.brand.clone(),
	}
}

pub fn create_app_state(pool: SqlitePool, config: &ServerConfig) -> AppState {
	let zones = Arc::new(ZoneRepository::new(pool.clone()));
	let users = Arc::new(UserRepository::with_default_authorities(
		pool.clone(),
		config.directory.default_authorities.clone(),
	));
	let clients = Arc::new(ClientRepository::new(pool.clone()));
	let codes = Arc::new(CodeRepository::new(pool.clone()));

	let settings = verification_settings(config);
	let redirects = RedirectResolver::new(clients.clone());

	let email_change = EmailChangeService::new(
		users.clone(),
		codes.clone(),
		zones.clone(),
		redirects.clone(),
		settings.clone(),
	);
	let invitations = InvitationService::new(
		users.clone(),
		codes.clone(),
		zones.clone(),
		redirects,
		settings,
	);

	AppState {
		pool,
		zones,
		users,
		clients,
		codes,
		email_change,
		invitations,
	}
}

/// Scheduler with the expired code reaper registered. Not yet started.
pub fn create_scheduler(state: &AppState, config: &ServerConfig) -> JobScheduler {
	let mut scheduler = JobScheduler::new();
	scheduler.register_periodic(
		Arc::new(ExpiredCodeCleanupJob::new(state.codes.clone())),
		config.codes.reaper_interval(),
	);
	scheduler
}

/// Runs the expired code reaper once through `scheduler` and returns how
/// many codes it deleted.
pub async fn sweep_expired_codes(scheduler: &JobScheduler) -> zoneward_server_jobs::Result<u64> {
	let run = scheduler
		.trigger_job(EXPIRED_CODE_CLEANUP_JOB_ID, TriggerSource::Manual)
		.await?;
	tracing::debug!(run_id = %run.id, retry_count = run.retry_count, "reaper run finished");
	Ok(run
		.metadata
		.as_ref()
		.and_then(|metadata| metadata["swept"].as_u64())
		.unwrap_or(0))
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::{Duration, Utc};
	use zoneward_server_auth::{NewUser, Origin, ZoneContext};
	use zoneward_server_db::testing::create_test_pool;
	use zoneward_server_jobs::{HealthState, JobStatus};

	#[tokio::test]
	async fn state_uses_configured_authorities() {
		let mut config = ServerConfig::default();
		config.directory.default_authorities = vec!["uaa.user".to_string(), "openid".to_string()];

		let state = create_app_state(create_test_pool().await, &config);
		let user = state
			.users
			.create_user(
				&ZoneContext::default(),
				&NewUser::new("marissa", "marissa@example.com", Origin::Internal),
			)
			.await
			.unwrap();

		assert!(user.has_authority("openid"));
		assert!(user.has_authority("uaa.user"));
	}

	#[test]
	fn settings_follow_config() {
		let mut config = ServerConfig::default();
		config.codes.email_change_ttl_secs = 90;
		config.directory.brand = "Acme".to_string();

		let settings = verification_settings(&config);
		assert_eq!(settings.email_change_ttl.as_secs(), 90);
		assert_eq!(settings.invitation_ttl.as_secs(), 604_800);
		assert_eq!(settings.brand, "Acme");
	}

	#[tokio::test]
	async fn scheduler_runs_reaper_on_demand() {
		let config = ServerConfig::default();
		let state = create_app_state(create_test_pool().await, &config);
		let scheduler = create_scheduler(&state, &config);

		let health = scheduler.health_status().await;
		assert_eq!(health.jobs.len(), 1);
		assert_eq!(health.jobs[0].job_id, EXPIRED_CODE_CLEANUP_JOB_ID);
		assert!(health.jobs[0].last_run.is_none());

		scheduler
			.trigger_job(EXPIRED_CODE_CLEANUP_JOB_ID, TriggerSource::Manual)
			.await
			.unwrap();
		let status = scheduler
			.job_status(EXPIRED_CODE_CLEANUP_JOB_ID)
			.await
			.unwrap();
		assert_eq!(status.last_run.unwrap().status, JobStatus::Succeeded);
		assert_eq!(scheduler.health_status().await.status, HealthState::Healthy);
	}

	#[tokio::test]
	async fn sweep_reports_deleted_code_count() {
		let config = ServerConfig::default();
		let state = create_app_state(create_test_pool().await, &config);
		state
			.codes
			.generate("{}", Utc::now() + Duration::hours(1), None)
			.await
			.unwrap();
		let past = (Utc::now() - Duration::minutes(5)).timestamp_millis();
		for digest in ["a", "b"] {
			sqlx::query("INSERT INTO expiring_codes (code_hash, expires_at, payload) VALUES (?, ?, '{}')")
				.bind(digest)
				.bind(past)
				.execute(&state.pool)
				.await
				.unwrap();
		}

		let scheduler = create_scheduler(&state, &config);
		assert_eq!(sweep_expired_codes(&scheduler).await.unwrap(), 2);
		assert_eq!(sweep_expired_codes(&scheduler).await.unwrap(), 0);
	}
}
