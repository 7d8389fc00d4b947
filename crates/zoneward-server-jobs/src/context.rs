// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::types::TriggerSource;
use std::sync::Arc;
use tokio::sync::watch;

/// Per-run state handed to [`Job::run`](crate::Job::run).
pub struct JobContext {
	pub run_id: String,
	pub triggered_by: TriggerSource,
	pub cancellation_token: CancellationToken,
}

/// Shared cancellation flag. Jobs poll it between steps; the scheduler also
/// awaits it so idle loops and retry backoff end promptly. Once cancelled it
/// stays cancelled.
#[derive(Clone)]
pub struct CancellationToken {
	state: Arc<watch::Sender<bool>>,
}

impl CancellationToken {
	pub fn new() -> Self {
		let (state, _) = watch::channel(false);
		Self {
			state: Arc::new(state),
		}
	}

	pub fn cancel(&self) {
		self.state.send_replace(true);
	}

	pub fn is_cancelled(&self) -> bool {
		*self.state.borrow()
	}

	/// Resolves once [`cancel`](Self::cancel) has been called on any clone.
	pub async fn cancelled(&self) {
		let mut rx = self.state.subscribe();
		// The sender lives in `self`, so the channel cannot close while waiting.
		let _ = rx.wait_for(|cancelled| *cancelled).await;
	}
}

impl Default for CancellationToken {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;

	#[test]
	fn clones_share_state() {
		let token = CancellationToken::new();
		let clone = token.clone();
		assert!(!clone.is_cancelled());

		token.cancel();
		assert!(clone.is_cancelled());
	}

	#[tokio::test]
	async fn waiters_wake_on_cancel() {
		let token = CancellationToken::new();
		let waiter = tokio::spawn({
			let token = token.clone();
			async move { token.cancelled().await }
		});

		tokio::task::yield_now().await;
		assert!(!waiter.is_finished());

		token.cancel();
		tokio::time::timeout(Duration::from_secs(1), waiter)
			.await
			.unwrap()
			.unwrap();
	}

	#[tokio::test]
	async fn already_cancelled_resolves_immediately() {
		let token = CancellationToken::new();
		token.cancel();
		tokio::time::timeout(Duration::from_millis(10), token.cancelled())
			.await
			.unwrap();
	}
}
