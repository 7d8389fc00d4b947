// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-process record of the latest run of each job.

use crate::types::{JobRun, JobStatus};
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

struct JobRecord {
	last_run: JobRun,
	consecutive_failures: u32,
}

#[derive(Default)]
pub(crate) struct RunHistory {
	jobs: RwLock<HashMap<String, JobRecord>>,
}

impl RunHistory {
	pub(crate) async fn record_run_start(&self, run: JobRun) {
		let mut jobs = self.jobs.write().await;
		match jobs.get_mut(&run.job_id) {
			Some(record) => record.last_run = run,
			None => {
				jobs.insert(
					run.job_id.clone(),
					JobRecord {
						last_run: run,
						consecutive_failures: 0,
					},
				);
			}
		}
	}

	pub(crate) async fn record_retry(&self, job_id: &str, run_id: &str, retry_count: u32) {
		let mut jobs = self.jobs.write().await;
		if let Some(record) = jobs.get_mut(job_id).filter(|r| r.last_run.id == run_id) {
			record.last_run.retry_count = retry_count;
		}
	}

	/// Close the run and return it. A failure extends the failure streak;
	/// any other outcome ends it.
	pub(crate) async fn record_run_complete(
		&self,
		job_id: &str,
		run_id: &str,
		status: JobStatus,
		error_message: Option<String>,
		metadata: Option<serde_json::Value>,
	) -> Option<JobRun> {
		let mut jobs = self.jobs.write().await;
		let record = jobs.get_mut(job_id).filter(|r| r.last_run.id == run_id)?;

		let completed_at = Utc::now();
		let run = &mut record.last_run;
		run.duration_ms = Some((completed_at - run.started_at).num_milliseconds());
		run.completed_at = Some(completed_at);
		run.status = status;
		run.error_message = error_message;
		run.metadata = metadata;

		record.consecutive_failures = match status {
			JobStatus::Failed => record.consecutive_failures + 1,
			_ => 0,
		};
		Some(record.last_run.clone())
	}

	pub(crate) async fn last_run(&self, job_id: &str) -> Option<JobRun> {
		self.jobs
			.read()
			.await
			.get(job_id)
			.map(|r| r.last_run.clone())
	}

	pub(crate) async fn consecutive_failures(&self, job_id: &str) -> u32 {
		self.jobs
			.read()
			.await
			.get(job_id)
			.map_or(0, |r| r.consecutive_failures)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::TriggerSource;

	fn running(run_id: &str) -> JobRun {
		JobRun {
			id: run_id.to_string(),
			job_id: "sweep".to_string(),
			status: JobStatus::Running,
			started_at: Utc::now(),
			completed_at: None,
			duration_ms: None,
			error_message: None,
			retry_count: 0,
			triggered_by: TriggerSource::Schedule,
			metadata: None,
		}
	}

	#[tokio::test]
	async fn completion_closes_the_matching_run() {
		let history = RunHistory::default();
		history.record_run_start(running("run-1")).await;
		history.record_retry("sweep", "run-1", 2).await;

		let closed = history
			.record_run_complete(
				"sweep",
				"run-1",
				JobStatus::Succeeded,
				None,
				Some(serde_json::json!({ "swept": 4 })),
			)
			.await
			.unwrap();

		assert_eq!(closed.status, JobStatus::Succeeded);
		assert_eq!(closed.retry_count, 2);
		assert!(closed.duration_ms.unwrap() >= 0);
		assert_eq!(closed.metadata.unwrap()["swept"], 4);
		assert_eq!(
			history.last_run("sweep").await.unwrap().status,
			JobStatus::Succeeded
		);
	}

	#[tokio::test]
	async fn failure_streak_resets_on_success() {
		let history = RunHistory::default();
		let outcomes = [
			JobStatus::Failed,
			JobStatus::Succeeded,
			JobStatus::Failed,
			JobStatus::Failed,
		];
		for (i, status) in outcomes.into_iter().enumerate() {
			let run_id = format!("run-{i}");
			history.record_run_start(running(&run_id)).await;
			history
				.record_run_complete("sweep", &run_id, status, None, None)
				.await;
		}

		assert_eq!(history.consecutive_failures("sweep").await, 2);
		assert_eq!(history.consecutive_failures("other").await, 0);
	}

	#[tokio::test]
	async fn stale_run_completion_is_ignored() {
		let history = RunHistory::default();
		history.record_run_start(running("run-1")).await;
		history.record_run_start(running("run-2")).await;

		let stale = history
			.record_run_complete("sweep", "run-1", JobStatus::Failed, None, None)
			.await;
		assert!(stale.is_none());
		assert_eq!(history.consecutive_failures("sweep").await, 0);
		assert_eq!(history.last_run("sweep").await.unwrap().id, "run-2");
	}
}
