// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::instrument;
use zoneward_server_db::CodeStore;
use zoneward_server_jobs::{Job, JobContext, JobError, JobOutput};

pub const EXPIRED_CODE_CLEANUP_JOB_ID: &str = "expired-code-cleanup";

/// Deletes codes whose expiry has passed. Redemption already refuses them;
/// this only reclaims storage.
pub struct ExpiredCodeCleanupJob {
	codes: Arc<dyn CodeStore>,
}

impl ExpiredCodeCleanupJob {
	pub fn new(codes: Arc<dyn CodeStore>) -> Self {
		Self { codes }
	}
}

#[async_trait]
impl Job for ExpiredCodeCleanupJob {
	fn id(&self) -> &str {
		EXPIRED_CODE_CLEANUP_JOB_ID
	}

	fn name(&self) -> &str {
		"Expired Code Cleanup"
	}

	fn description(&self) -> &str {
		"Delete expired verification codes from the database"
	}

	#[instrument(skip(self, ctx), fields(job_id = EXPIRED_CODE_CLEANUP_JOB_ID, run_id = %ctx.run_id))]
	async fn run(&self, ctx: &JobContext) -> Result<JobOutput, JobError> {
		if ctx.cancellation_token.is_cancelled() {
			return Err(JobError::Cancelled);
		}

		let swept = self
			.codes
			.sweep_expired(Utc::now())
			.await
			.map_err(|e| JobError::Failed {
				message: e.to_string(),
				retryable: true,
			})?;

		tracing::info!(swept, "Expired code cleanup completed");

		Ok(JobOutput {
			message: format!("Deleted {swept} expired codes"),
			metadata: Some(serde_json::json!({ "swept": swept })),
		})
	}
}
