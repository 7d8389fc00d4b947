// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Zone-scoped user directory.
//!
//! Every query filters on the zone of the supplied [`ZoneContext`]. A user that
//! exists only in another zone is reported exactly like a user that does not
//! exist at all. Username and email comparisons ignore case, including
//! non-ASCII letters: each is stored alongside a Unicode-lowercased copy, and
//! the unique indexes on `(username, origin, zone)` and `(email, origin, zone)`
//! cover the lowercased copies.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqlitePool, Row};
use zoneward_server_auth::{
	NewUser, Origin, SecretString, User, UserId, UserUpdate, ZoneContext, ZoneId,
	DEFAULT_AUTHORITY,
};

use crate::error::DbError;
use crate::row::parse_timestamp;

const USER_COLUMNS: &str = "id, zone_id, username, email, given_name, family_name, origin, \
	authorities, verified, legacy_verification_behavior, password, salt, created_at, \
	updated_at, passwd_lastmodified";

#[async_trait]
pub trait UserStore: Send + Sync {
	async fn create_user(&self, ctx: &ZoneContext, user: &NewUser) -> Result<User, DbError>;
	async fn get_user_by_id(&self, ctx: &ZoneContext, id: &UserId)
		-> Result<Option<User>, DbError>;
	async fn get_user_by_username(
		&self,
		ctx: &ZoneContext,
		username: &str,
		origin: &Origin,
	) -> Result<Option<User>, DbError>;
	async fn get_user_by_email(
		&self,
		ctx: &ZoneContext,
		email: &str,
		origin: &Origin,
	) -> Result<Option<User>, DbError>;
	async fn update_user(
		&self,
		ctx: &ZoneContext,
		id: &UserId,
		update: &UserUpdate,
	) -> Result<User, DbError>;
	async fn add_authority(
		&self,
		ctx: &ZoneContext,
		id: &UserId,
		authority: &str,
	) -> Result<(), DbError>;
	async fn set_salt(&self, ctx: &ZoneContext, id: &UserId, salt: Option<&str>)
		-> Result<(), DbError>;
}

/// Repository for users of all zones.
///
/// Returned users carry their stored authorities plus the directory's default
/// authorities, which every user holds regardless of stored rows.
#[derive(Clone)]
pub struct UserRepository {
	pool: SqlitePool,
	default_authorities: Vec<String>,
}

impl UserRepository {
	/// Create a repository granting [`DEFAULT_AUTHORITY`] to every user.
	pub fn new(pool: SqlitePool) -> Self {
		Self::with_default_authorities(pool, vec![DEFAULT_AUTHORITY.to_string()])
	}

	pub fn with_default_authorities(pool: SqlitePool, default_authorities: Vec<String>) -> Self {
		Self {
			pool,
			default_authorities,
		}
	}

	pub fn default_authorities(&self) -> &[String] {
		&self.default_authorities
	}

	/// Provision a user in the context's zone.
	///
	/// # Errors
	/// Returns `DbError::Conflict` if the username or email is already used by
	/// another user with the same origin in the zone.
	#[tracing::instrument(
		skip(self, ctx, user),
		fields(zone_id = %ctx.zone_id(), origin = %user.origin, user_id)
	)]
	pub async fn create_user(&self, ctx: &ZoneContext, user: &NewUser) -> Result<User, DbError> {
		let id = UserId::generate();
		tracing::Span::current().record("user_id", id.to_string());
		let now = Utc::now().to_rfc3339();

		sqlx::query(
			r#"
			INSERT INTO users (
				id, zone_id, username, username_lower, email, email_lower, given_name,
				family_name, origin, authorities, verified, legacy_verification_behavior,
				password, salt, created_at, updated_at, passwd_lastmodified
			) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, '', ?, 0, ?, NULL, ?, ?, ?)
			"#,
		)
		.bind(id.to_string())
		.bind(ctx.zone_id().as_str())
		.bind(&user.username)
		.bind(fold_case(&user.username))
		.bind(&user.email)
		.bind(fold_case(&user.email))
		.bind(&user.given_name)
		.bind(&user.family_name)
		.bind(user.origin.as_str())
		.bind(user.verified as i32)
		.bind(user.password.as_ref().map(|p| p.expose().clone()))
		.bind(&now)
		.bind(&now)
		.bind(&now)
		.execute(&self.pool)
		.await
		.map_err(map_unique_violation)?;

		tracing::debug!("user created");
		self.get_user_by_id(ctx, &id)
			.await?
			.ok_or_else(|| DbError::Internal(format!("user {id} vanished after insert")))
	}

	#[tracing::instrument(skip(self, ctx, id), fields(zone_id = %ctx.zone_id(), user_id = %id))]
	pub async fn get_user_by_id(
		&self,
		ctx: &ZoneContext,
		id: &UserId,
	) -> Result<Option<User>, DbError> {
		let row = sqlx::query(&format!(
			"SELECT {USER_COLUMNS} FROM users WHERE id = ? AND zone_id = ?"
		))
		.bind(id.to_string())
		.bind(ctx.zone_id().as_str())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_user(&r)).transpose()
	}

	/// Look a user up by username within one origin, ignoring case.
	#[tracing::instrument(skip(self, ctx, origin), fields(zone_id = %ctx.zone_id(), origin = %origin))]
	pub async fn get_user_by_username(
		&self,
		ctx: &ZoneContext,
		username: &str,
		origin: &Origin,
	) -> Result<Option<User>, DbError> {
		let row = sqlx::query(&format!(
			"SELECT {USER_COLUMNS} FROM users \
			 WHERE username_lower = ? AND origin = ? AND zone_id = ?"
		))
		.bind(fold_case(username))
		.bind(origin.as_str())
		.bind(ctx.zone_id().as_str())
		.fetch_optional(&self.pool)
		.await?;

		let result = row.map(|r| self.row_to_user(&r)).transpose()?;
		if let Some(ref user) = result {
			tracing::debug!(user_id = %user.id, "user found by username");
		}
		Ok(result)
	}

	/// Look a user up by email within one origin, ignoring case.
	#[tracing::instrument(skip(self, ctx, email, origin), fields(zone_id = %ctx.zone_id(), origin = %origin))]
	pub async fn get_user_by_email(
		&self,
		ctx: &ZoneContext,
		email: &str,
		origin: &Origin,
	) -> Result<Option<User>, DbError> {
		let row = sqlx::query(&format!(
			"SELECT {USER_COLUMNS} FROM users \
			 WHERE email_lower = ? AND origin = ? AND zone_id = ?"
		))
		.bind(fold_case(email))
		.bind(origin.as_str())
		.bind(ctx.zone_id().as_str())
		.fetch_optional(&self.pool)
		.await?;

		let result = row.map(|r| self.row_to_user(&r)).transpose()?;
		if let Some(ref user) = result {
			tracing::debug!(user_id = %user.id, "user found by email");
		}
		Ok(result)
	}

	/// Apply a partial update and return the stored result. An empty update
	/// writes nothing and returns the user as stored.
	///
	/// # Errors
	/// - `DbError::NotFound` if the user does not exist in the context's zone.
	/// - `DbError::Conflict` if the new username or email collides with another
	///   user of the same origin in the zone.
	#[tracing::instrument(skip(self, ctx, id, update), fields(zone_id = %ctx.zone_id(), user_id = %id))]
	pub async fn update_user(
		&self,
		ctx: &ZoneContext,
		id: &UserId,
		update: &UserUpdate,
	) -> Result<User, DbError> {
		if update.is_empty() {
			return self
				.get_user_by_id(ctx, id)
				.await?
				.ok_or_else(|| DbError::NotFound(format!("user {id}")));
		}

		let result = sqlx::query(
			r#"
			UPDATE users SET
				username = COALESCE(?, username),
				username_lower = COALESCE(?, username_lower),
				email = COALESCE(?, email),
				email_lower = COALESCE(?, email_lower),
				origin = COALESCE(?, origin),
				verified = COALESCE(?, verified),
				legacy_verification_behavior = COALESCE(?, legacy_verification_behavior),
				updated_at = ?
			WHERE id = ? AND zone_id = ?
			"#,
		)
		.bind(update.username.as_deref())
		.bind(update.username.as_deref().map(fold_case))
		.bind(update.email.as_deref())
		.bind(update.email.as_deref().map(fold_case))
		.bind(update.origin.as_ref().map(Origin::as_str))
		.bind(update.verified.map(|v| v as i32))
		.bind(update.legacy_verification_behavior.map(|v| v as i32))
		.bind(Utc::now().to_rfc3339())
		.bind(id.to_string())
		.bind(ctx.zone_id().as_str())
		.execute(&self.pool)
		.await
		.map_err(map_unique_violation)?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("user {id}")));
		}

		tracing::debug!("user updated");
		self.get_user_by_id(ctx, id)
			.await?
			.ok_or_else(|| DbError::NotFound(format!("user {id}")))
	}

	/// Grant an authority. Granting one the user already holds is a no-op.
	#[tracing::instrument(skip(self, ctx, id), fields(zone_id = %ctx.zone_id(), user_id = %id))]
	pub async fn add_authority(
		&self,
		ctx: &ZoneContext,
		id: &UserId,
		authority: &str,
	) -> Result<(), DbError> {
		let authority = authority.trim();
		if authority.is_empty() || authority.contains(',') {
			return Err(DbError::InvalidInput(format!(
				"invalid authority name: {authority:?}"
			)));
		}

		let user = self
			.get_user_by_id(ctx, id)
			.await?
			.ok_or_else(|| DbError::NotFound(format!("user {id}")))?;
		if user.has_authority(authority) {
			return Ok(());
		}

		sqlx::query(
			r#"
			UPDATE users SET
				authorities = CASE WHEN authorities = '' THEN ? ELSE authorities || ',' || ? END,
				updated_at = ?
			WHERE id = ? AND zone_id = ?
			"#,
		)
		.bind(authority)
		.bind(authority)
		.bind(Utc::now().to_rfc3339())
		.bind(id.to_string())
		.bind(ctx.zone_id().as_str())
		.execute(&self.pool)
		.await?;

		tracing::debug!(authority, "authority granted");
		Ok(())
	}

	#[tracing::instrument(skip(self, ctx, id, salt), fields(zone_id = %ctx.zone_id(), user_id = %id))]
	pub async fn set_salt(
		&self,
		ctx: &ZoneContext,
		id: &UserId,
		salt: Option<&str>,
	) -> Result<(), DbError> {
		let result = sqlx::query("UPDATE users SET salt = ?, updated_at = ? WHERE id = ? AND zone_id = ?")
			.bind(salt)
			.bind(Utc::now().to_rfc3339())
			.bind(id.to_string())
			.bind(ctx.zone_id().as_str())
			.execute(&self.pool)
			.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("user {id}")));
		}
		Ok(())
	}

	fn row_to_user(&self, row: &sqlx::sqlite::SqliteRow) -> Result<User, DbError> {
		let id_str: String = row.get("id");
		let id = id_str
			.parse::<UserId>()
			.map_err(|e| DbError::Internal(format!("Invalid user ID: {e}")))?;

		let zone_id: String = row.get("zone_id");
		let origin: String = row.get("origin");
		let verified: i32 = row.get("verified");
		let legacy: i32 = row.get("legacy_verification_behavior");
		let stored_authorities: String = row.get("authorities");
		let password: Option<String> = row.get("password");

		Ok(User {
			id,
			zone_id: ZoneId::new(zone_id),
			username: row.get("username"),
			email: row.get("email"),
			given_name: row.get("given_name"),
			family_name: row.get("family_name"),
			origin: Origin::parse(&origin),
			authorities: merge_authorities(&stored_authorities, &self.default_authorities),
			verified: verified != 0,
			legacy_verification_behavior: legacy != 0,
			password: password.map(SecretString::new),
			salt: row.get("salt"),
			created_at: parse_timestamp(row, "created_at")?,
			updated_at: parse_timestamp(row, "updated_at")?,
			password_last_modified: parse_timestamp(row, "passwd_lastmodified")?,
		})
	}
}

#[async_trait]
impl UserStore for UserRepository {
	async fn create_user(&self, ctx: &ZoneContext, user: &NewUser) -> Result<User, DbError> {
		self.create_user(ctx, user).await
	}

	async fn get_user_by_id(
		&self,
		ctx: &ZoneContext,
		id: &UserId,
	) -> Result<Option<User>, DbError> {
		self.get_user_by_id(ctx, id).await
	}

	async fn get_user_by_username(
		&self,
		ctx: &ZoneContext,
		username: &str,
		origin: &Origin,
	) -> Result<Option<User>, DbError> {
		self.get_user_by_username(ctx, username, origin).await
	}

	async fn get_user_by_email(
		&self,
		ctx: &ZoneContext,
		email: &str,
		origin: &Origin,
	) -> Result<Option<User>, DbError> {
		self.get_user_by_email(ctx, email, origin).await
	}

	async fn update_user(
		&self,
		ctx: &ZoneContext,
		id: &UserId,
		update: &UserUpdate,
	) -> Result<User, DbError> {
		self.update_user(ctx, id, update).await
	}

	async fn add_authority(
		&self,
		ctx: &ZoneContext,
		id: &UserId,
		authority: &str,
	) -> Result<(), DbError> {
		self.add_authority(ctx, id, authority).await
	}

	async fn set_salt(
		&self,
		ctx: &ZoneContext,
		id: &UserId,
		salt: Option<&str>,
	) -> Result<(), DbError> {
		self.set_salt(ctx, id, salt).await
	}
}

/// Key used for case-insensitive matching and uniqueness.
fn fold_case(value: &str) -> String {
	value.to_lowercase()
}

fn map_unique_violation(e: sqlx::Error) -> DbError {
	match e {
		sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
			let message = db_err.message();
			if message.contains("username") {
				DbError::Conflict("Username already in use".to_string())
			} else if message.contains("email") {
				DbError::Conflict("Email already in use".to_string())
			} else {
				DbError::Conflict("User already exists".to_string())
			}
		}
		_ => DbError::Sqlx(e),
	}
}

fn merge_authorities(stored: &str, defaults: &[String]) -> Vec<String> {
	let mut authorities: Vec<String> = Vec::new();
	for authority in defaults
		.iter()
		.map(String::as_str)
		.chain(stored.split(','))
		.map(str::trim)
		.filter(|a| !a.is_empty())
	{
		if !authorities.iter().any(|a| a == authority) {
			authorities.push(authority.to_string());
		}
	}
	authorities
}
