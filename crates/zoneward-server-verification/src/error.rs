// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Workflow error types.

use thiserror::Error;
use zoneward_server_auth::AuthError;
use zoneward_server_db::DbError;

/// Outcome of a failed begin or complete step.
///
/// Codes and users that are absent, expired or live in another zone all map to
/// the same variants, so callers cannot tell the cases apart.
#[derive(Debug, Error)]
pub enum VerificationError {
	#[error("invalid or expired code")]
	InvalidOrExpiredCode,

	#[error("malformed code: {0}")]
	MalformedCode(String),

	#[error("user not found")]
	UserNotFound,

	#[error("conflict: {0}")]
	Conflict(String),

	#[error("storage error: {0}")]
	Storage(#[source] DbError),
}

impl VerificationError {
	/// True when the caller may retry the same request.
	pub fn is_retryable(&self) -> bool {
		matches!(self, VerificationError::Storage(_))
	}

	/// True for recoverable outcomes that should be reported to the end user.
	pub fn is_user_facing(&self) -> bool {
		!self.is_retryable()
	}
}

impl From<DbError> for VerificationError {
	fn from(err: DbError) -> Self {
		match err {
			DbError::Conflict(message) => VerificationError::Conflict(message),
			DbError::NotFound(_) => VerificationError::UserNotFound,
			other => VerificationError::Storage(other),
		}
	}
}

impl From<AuthError> for VerificationError {
	fn from(err: AuthError) -> Self {
		VerificationError::MalformedCode(err.to_string())
	}
}

/// Why a redirect could not be resolved. Never fatal to a workflow.
#[derive(Debug, Error)]
pub enum RedirectError {
	#[error("client not found: {0}")]
	ClientNotFound(String),

	#[error("client lookup failed: {0}")]
	Storage(#[from] DbError),
}
