// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared column decoding.

use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};

use crate::error::DbError;

pub(crate) fn parse_timestamp(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>, DbError> {
	let raw: String = row.get(column);
	DateTime::parse_from_rfc3339(&raw)
		.map(|dt| dt.with_timezone(&Utc))
		.map_err(|e| DbError::Internal(format!("Invalid {column}: {e}")))
}

pub(crate) fn millis_to_timestamp(millis: i64) -> Result<DateTime<Utc>, DbError> {
	DateTime::from_timestamp_millis(millis)
		.ok_or_else(|| DbError::Internal(format!("Invalid timestamp millis: {millis}")))
}
