// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;

use crate::context::JobContext;
use crate::error::JobError;
use crate::types::JobOutput;

/// Unit of background work run by the [`JobScheduler`](crate::JobScheduler).
///
/// A run should check `ctx.cancellation_token` before doing work and return
/// [`JobError::Cancelled`] once it is set. Failures that may succeed on a
/// later attempt, such as a busy database, should be `retryable`.
#[async_trait]
pub trait Job: Send + Sync {
	/// Stable key used for triggering and in logs.
	fn id(&self) -> &str;

	fn name(&self) -> &str;

	fn description(&self) -> &str;

	async fn run(&self, ctx: &JobContext) -> Result<JobOutput, JobError>;
}
