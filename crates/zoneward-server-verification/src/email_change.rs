// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Email change verification.
//!
//! `begin_email_change` checks the new address is free in the user's zone and
//! origin, then issues a code bound to the pending change. `complete_email_change`
//! redeems the code and applies it. When the username mirrors the email the
//! username follows the email; otherwise only the email changes.
//!
//! Once the user update is stored the change stands. Redirect resolution runs
//! afterwards and can only cost the caller the redirect.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use zoneward_server_auth::{
	CodeIntent, RedirectPurpose, UserId, UserUpdate, VerificationPayload, ZoneContext,
};
use zoneward_server_db::{CodeStore, UserStore, ZoneStore};

use crate::error::VerificationError;
use crate::message::{verification_link, MessageKind, NotificationMessage};
use crate::redirect::RedirectResolver;
use crate::settings::{deadline, display_name, VerificationSettings};

/// A change request waiting for the recipient to present the code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEmailChange {
	pub code: String,
	pub expires_at: DateTime<Utc>,
	pub user_id: UserId,
	pub current_email: String,
	pub new_email: String,
	/// Brand or zone name to show in the message.
	pub display_name: String,
}

impl PendingEmailChange {
	/// Compose the verification message. `link_base` is the externally visible
	/// login URL, for example `http://localhost/login`.
	pub fn notification(&self, link_base: &str) -> NotificationMessage {
		let link = verification_link(link_base, "verify_email", &self.code);
		NotificationMessage {
			recipient: self.new_email.clone(),
			kind: MessageKind::ChangeEmail,
			subject: format!("{} Email change verification", self.display_name),
			body: format!(
				"A request has been made to change the email for {} from {} to {}.\n\n\
				 Verify the new address by visiting {link}\n\n\
				 If you did not request this change, you can ignore this message.",
				self.display_name, self.current_email, self.new_email
			),
		}
	}
}

/// Outcome of a completed change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailChangeResult {
	pub user_id: UserId,
	pub username: String,
	pub email: String,
	pub redirect_url: Option<String>,
}

#[derive(Clone)]
pub struct EmailChangeService {
	users: Arc<dyn UserStore>,
	codes: Arc<dyn CodeStore>,
	zones: Arc<dyn ZoneStore>,
	redirects: RedirectResolver,
	settings: VerificationSettings,
}

impl EmailChangeService {
	pub fn new(
		users: Arc<dyn UserStore>,
		codes: Arc<dyn CodeStore>,
		zones: Arc<dyn ZoneStore>,
		redirects: RedirectResolver,
		settings: VerificationSettings,
	) -> Self {
		Self {
			users,
			codes,
			zones,
			redirects,
			settings,
		}
	}

	/// Issue a code for changing `user_id`'s email to `new_email`.
	///
	/// # Errors
	/// - `UserNotFound` if the user does not exist in the context's zone.
	/// - `Conflict` if another user of the same origin already holds
	///   `new_email` as an email, or as a username when this user's username
	///   would follow the email.
	/// - `Storage` if the code could not be stored.
	#[tracing::instrument(
		skip(self, ctx, user_id, current_email, new_email, client_id, redirect_uri),
		fields(zone_id = %ctx.zone_id(), user_id = %user_id, client_id = ?client_id)
	)]
	pub async fn begin_email_change(
		&self,
		ctx: &ZoneContext,
		user_id: &UserId,
		current_email: &str,
		new_email: &str,
		client_id: Option<&str>,
		redirect_uri: Option<&str>,
	) -> Result<PendingEmailChange, VerificationError> {
		let user = self
			.users
			.get_user_by_id(ctx, user_id)
			.await?
			.ok_or(VerificationError::UserNotFound)?;

		if let Some(holder) = self
			.users
			.get_user_by_email(ctx, new_email, &user.origin)
			.await?
		{
			if holder.id != user.id {
				return Err(VerificationError::Conflict(
					"The email address is already in use".to_string(),
				));
			}
		}

		if user.username_mirrors_email() {
			if let Some(holder) = self
				.users
				.get_user_by_username(ctx, new_email, &user.origin)
				.await?
			{
				if holder.id != user.id {
					return Err(VerificationError::Conflict(
						"The email address is already in use as a username".to_string(),
					));
				}
			}
		}

		let payload = VerificationPayload::new(user.id, user.origin.clone(), new_email).with_client(
			client_id.map(str::to_string),
			redirect_uri.map(str::to_string),
		);
		let display_name = display_name(&self.zones, ctx, &self.settings.brand).await?;
		let code = self
			.codes
			.generate(
				&payload.to_json(),
				deadline(self.settings.email_change_ttl),
				Some(CodeIntent::EmailChange.as_str()),
			)
			.await
			.map_err(VerificationError::Storage)?;

		tracing::info!(code_id = %code.log_id(), "email change code issued");

		Ok(PendingEmailChange {
			code: code.code.clone(),
			expires_at: code.expires_at,
			user_id: user.id,
			current_email: current_email.to_string(),
			new_email: new_email.to_string(),
			display_name,
		})
	}

	/// Redeem `code` and apply the pending change.
	///
	/// # Errors
	/// - `InvalidOrExpiredCode` if the code is unknown, used, expired or was
	///   issued for another workflow. Nothing is changed.
	/// - `MalformedCode` if the stored payload lacks required fields.
	/// - `UserNotFound` if the user no longer exists in the context's zone.
	/// - `Conflict` if the new email was claimed since the code was issued.
	#[tracing::instrument(skip(self, ctx, code), fields(zone_id = %ctx.zone_id(), user_id))]
	pub async fn complete_email_change(
		&self,
		ctx: &ZoneContext,
		code: &str,
	) -> Result<EmailChangeResult, VerificationError> {
		let redeemed = self
			.codes
			.redeem_for_intent(code, CodeIntent::EmailChange.as_str())
			.await
			.map_err(VerificationError::Storage)?
			.ok_or(VerificationError::InvalidOrExpiredCode)?;

		let payload = VerificationPayload::from_json(&redeemed.payload)?;
		tracing::Span::current().record("user_id", payload.user_id.to_string());

		let user = self
			.users
			.get_user_by_id(ctx, &payload.user_id)
			.await?
			.ok_or(VerificationError::UserNotFound)?;

		let update = if user.username_mirrors_email() {
			UserUpdate {
				username: Some(payload.email.clone()),
				email: Some(payload.email.clone()),
				..Default::default()
			}
		} else {
			UserUpdate {
				email: Some(payload.email.clone()),
				..Default::default()
			}
		};
		let updated = self.users.update_user(ctx, &user.id, &update).await?;

		tracing::info!(username_changed = update.username.is_some(), "email change applied");

		let redirect_url = self
			.redirects
			.resolve_or_none(
				ctx,
				payload.client_id.as_deref(),
				payload.redirect_uri.as_deref(),
				RedirectPurpose::EmailChange,
			)
			.await;

		Ok(EmailChangeResult {
			user_id: updated.id,
			username: updated.username,
			email: updated.email,
			redirect_url,
		})
	}
}
