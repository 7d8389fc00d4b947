// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Expiring code store.
//!
//! Codes are keyed by the SHA-256 digest of their value. Redemption is a single
//! `DELETE ... RETURNING` statement, so of any number of concurrent redeemers
//! of one code exactly one receives the row. An expired row found by
//! redemption is deleted and reported as absent; [`CodeRepository::sweep_expired`]
//! removes the rest.
//!
//! Expiry instants are stored as Unix epoch milliseconds.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePool, Row};
use zoneward_server_auth::{generate_code_token, hash_code, ExpiringCode};

use crate::error::DbError;
use crate::row::millis_to_timestamp;

/// Attempts at drawing a code that is not already stored.
pub const MAX_GENERATE_ATTEMPTS: u32 = 3;

#[async_trait]
pub trait CodeStore: Send + Sync {
	async fn generate(
		&self,
		payload: &str,
		expires_at: DateTime<Utc>,
		intent: Option<&str>,
	) -> Result<ExpiringCode, DbError>;
	async fn redeem(&self, code: &str) -> Result<Option<ExpiringCode>, DbError>;
	async fn redeem_for_intent(
		&self,
		code: &str,
		intent: &str,
	) -> Result<Option<ExpiringCode>, DbError>;
	async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<u64, DbError>;
}

#[derive(Clone)]
pub struct CodeRepository {
	pool: SqlitePool,
}

impl CodeRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Store a new code bound to `payload`.
	///
	/// The returned record is the only place the plaintext code exists. Its
	/// `expires_at` is truncated to the stored millisecond precision.
	///
	/// # Errors
	/// - `DbError::InvalidInput` if `expires_at` is not in the future.
	/// - `DbError::Conflict` if every attempt drew a code that was already stored.
	#[tracing::instrument(skip(self, payload, intent, expires_at), fields(intent = ?intent, expires_at = %expires_at))]
	pub async fn generate(
		&self,
		payload: &str,
		expires_at: DateTime<Utc>,
		intent: Option<&str>,
	) -> Result<ExpiringCode, DbError> {
		if expires_at <= Utc::now() {
			return Err(DbError::InvalidInput(
				"expiration must be in the future".to_string(),
			));
		}
		let expires_at_ms = expires_at.timestamp_millis();

		for attempt in 1..=MAX_GENERATE_ATTEMPTS {
			let code = generate_code_token();
			let result = sqlx::query(
				r#"
				INSERT INTO expiring_codes (code_hash, expires_at, payload, intent)
				VALUES (?, ?, ?, ?)
				"#,
			)
			.bind(hash_code(&code))
			.bind(expires_at_ms)
			.bind(payload)
			.bind(intent)
			.execute(&self.pool)
			.await;

			match result {
				Ok(_) => {
					let stored = ExpiringCode {
						code,
						expires_at: millis_to_timestamp(expires_at_ms)?,
						payload: payload.to_string(),
						intent: intent.map(str::to_string),
					};
					tracing::debug!(code_id = %stored.log_id(), "code stored");
					return Ok(stored);
				}
				Err(sqlx::Error::Database(ref db_err)) if db_err.is_unique_violation() => {
					tracing::warn!(attempt, "drew an already stored code, retrying");
				}
				Err(e) => return Err(e.into()),
			}
		}

		Err(DbError::Conflict(format!(
			"no unique code after {MAX_GENERATE_ATTEMPTS} attempts"
		)))
	}

	/// Atomically remove a code and return it if it had not expired.
	#[tracing::instrument(skip(self, code))]
	pub async fn redeem(&self, code: &str) -> Result<Option<ExpiringCode>, DbError> {
		let row = sqlx::query(
			r#"
			DELETE FROM expiring_codes
			WHERE code_hash = ?
			RETURNING expires_at, payload, intent
			"#,
		)
		.bind(hash_code(code))
		.fetch_optional(&self.pool)
		.await?;

		finish_redemption(code, row)
	}

	/// Like [`redeem`](Self::redeem), but only consumes codes issued for
	/// `intent`. A code with a different intent is left in place.
	#[tracing::instrument(skip(self, code))]
	pub async fn redeem_for_intent(
		&self,
		code: &str,
		intent: &str,
	) -> Result<Option<ExpiringCode>, DbError> {
		let row = sqlx::query(
			r#"
			DELETE FROM expiring_codes
			WHERE code_hash = ? AND intent = ?
			RETURNING expires_at, payload, intent
			"#,
		)
		.bind(hash_code(code))
		.bind(intent)
		.fetch_optional(&self.pool)
		.await?;

		finish_redemption(code, row)
	}

	/// Delete every code whose expiry is at or before `now`.
	#[tracing::instrument(skip(self, now), fields(now = %now))]
	pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<u64, DbError> {
		let result = sqlx::query("DELETE FROM expiring_codes WHERE expires_at <= ?")
			.bind(now.timestamp_millis())
			.execute(&self.pool)
			.await?;

		let swept = result.rows_affected();
		tracing::debug!(swept, "expired codes swept");
		Ok(swept)
	}
}

#[async_trait]
impl CodeStore for CodeRepository {
	async fn generate(
		&self,
		payload: &str,
		expires_at: DateTime<Utc>,
		intent: Option<&str>,
	) -> Result<ExpiringCode, DbError> {
		self.generate(payload, expires_at, intent).await
	}

	async fn redeem(&self, code: &str) -> Result<Option<ExpiringCode>, DbError> {
		self.redeem(code).await
	}

	async fn redeem_for_intent(
		&self,
		code: &str,
		intent: &str,
	) -> Result<Option<ExpiringCode>, DbError> {
		self.redeem_for_intent(code, intent).await
	}

	async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<u64, DbError> {
		self.sweep_expired(now).await
	}
}

fn finish_redemption(
	code: &str,
	row: Option<sqlx::sqlite::SqliteRow>,
) -> Result<Option<ExpiringCode>, DbError> {
	let Some(row) = row else {
		tracing::debug!("no such code");
		return Ok(None);
	};

	let expires_at_ms: i64 = row.get("expires_at");
	let redeemed = ExpiringCode {
		code: code.to_string(),
		expires_at: millis_to_timestamp(expires_at_ms)?,
		payload: row.get("payload"),
		intent: row.get("intent"),
	};

	if redeemed.is_expired_at(Utc::now()) {
		tracing::debug!(code_id = %redeemed.log_id(), "expired code removed on redemption");
		return Ok(None);
	}

	tracing::debug!(code_id = %redeemed.log_id(), "code redeemed");
	Ok(Some(redeemed))
}
