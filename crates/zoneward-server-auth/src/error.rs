// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Domain validation errors.

use thiserror::Error;

/// Errors raised while building or interpreting domain values.
#[derive(Debug, Error)]
pub enum AuthError {
	/// A verification payload could not be parsed.
	#[error("malformed verification payload: {0}")]
	MalformedPayload(String),

	/// A verification payload parsed but lacks a required field.
	#[error("verification payload missing required field: {0}")]
	MissingField(&'static str),

	/// A stored user id is not a valid UUID.
	#[error("invalid user id: {0}")]
	InvalidUserId(String),
}

pub type Result<T> = std::result::Result<T, AuthError>;
