// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Invitation acceptance.
//!
//! Inviting an address provisions an unverified user for it (or reuses the one
//! already there) and issues a code. Accepting the invitation marks the user
//! verified and reconciles the origin. For a federated origin the username
//! becomes the name the provider asserted.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use zoneward_server_auth::{
	CodeIntent, NewUser, Origin, RedirectPurpose, UserId, UserUpdate, VerificationPayload,
	ZoneContext,
};
use zoneward_server_db::{CodeStore, UserStore, ZoneStore};

use crate::error::VerificationError;
use crate::message::{verification_link, MessageKind, NotificationMessage};
use crate::redirect::RedirectResolver;
use crate::settings::{deadline, display_name, VerificationSettings};

/// Who to invite and where they should land afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invitation {
	pub email: String,
	pub origin: Origin,
	/// Username to give a newly provisioned user. Defaults to the email.
	pub user_name: Option<String>,
	pub client_id: Option<String>,
	pub redirect_uri: Option<String>,
}

impl Invitation {
	pub fn new(email: impl Into<String>, origin: Origin) -> Self {
		Self {
			email: email.into(),
			origin,
			user_name: None,
			client_id: None,
			redirect_uri: None,
		}
	}

	pub fn with_user_name(mut self, user_name: impl Into<String>) -> Self {
		self.user_name = Some(user_name.into());
		self
	}

	pub fn with_client(mut self, client_id: impl Into<String>, redirect_uri: Option<String>) -> Self {
		self.client_id = Some(client_id.into());
		self.redirect_uri = redirect_uri;
		self
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingInvitation {
	pub code: String,
	pub expires_at: DateTime<Utc>,
	pub user_id: UserId,
	pub email: String,
	pub display_name: String,
}

impl PendingInvitation {
	pub fn notification(&self, link_base: &str) -> NotificationMessage {
		let link = verification_link(link_base, "invitations/accept", &self.code);
		NotificationMessage {
			recipient: self.email.clone(),
			kind: MessageKind::Invitation,
			subject: format!("Invitation to join {}", self.display_name),
			body: format!(
				"You have been invited to join {}.\n\n\
				 To accept the invitation, visit {link}",
				self.display_name
			),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvitationResult {
	pub user_id: UserId,
	pub username: String,
	pub email: String,
	pub origin: Origin,
	/// The invitee still has to choose a password before signing in.
	pub requires_password: bool,
	pub redirect_url: Option<String>,
}

#[derive(Clone)]
pub struct InvitationService {
	users: Arc<dyn UserStore>,
	codes: Arc<dyn CodeStore>,
	zones: Arc<dyn ZoneStore>,
	redirects: RedirectResolver,
	settings: VerificationSettings,
}

impl InvitationService {
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

	#[tracing::instrument(
		skip(self, ctx, invitation),
		fields(zone_id = %ctx.zone_id(), origin = %invitation.origin, user_id)
	)]
	pub async fn begin_invitation(
		&self,
		ctx: &ZoneContext,
		invitation: &Invitation,
	) -> Result<PendingInvitation, VerificationError> {
		let display_name = display_name(&self.zones, ctx, &self.settings.brand).await?;

		let existing = self
			.users
			.get_user_by_email(ctx, &invitation.email, &invitation.origin)
			.await?;
		let user = match existing {
			Some(user) => user,
			None => {
				let username = invitation
					.user_name
					.clone()
					.unwrap_or_else(|| invitation.email.clone());
				let new_user = NewUser::new(username, &invitation.email, invitation.origin.clone());
				let user = self.users.create_user(ctx, &new_user).await?;
				tracing::debug!("provisioned invited user");
				user
			}
		};
		tracing::Span::current().record("user_id", user.id.to_string());

		let mut payload = VerificationPayload::new(user.id, invitation.origin.clone(), &user.email)
			.with_client(invitation.client_id.clone(), invitation.redirect_uri.clone());
		if let Some(user_name) = &invitation.user_name {
			payload = payload.with_user_name(user_name);
		}

		let code = self
			.codes
			.generate(
				&payload.to_json(),
				deadline(self.settings.invitation_ttl),
				Some(CodeIntent::Invitation.as_str()),
			)
			.await
			.map_err(VerificationError::Storage)?;

		tracing::info!(code_id = %code.log_id(), "invitation code issued");

		Ok(PendingInvitation {
			code: code.code.clone(),
			expires_at: code.expires_at,
			user_id: user.id,
			email: user.email,
			display_name,
		})
	}

	/// Redeem an invitation code.
	///
	/// `accepted_username` is the name asserted by a federated provider during
	/// acceptance; it is ignored for the internal origin.
	#[tracing::instrument(
		skip(self, ctx, code, accepted_username),
		fields(zone_id = %ctx.zone_id(), user_id)
	)]
	pub async fn complete_invitation(
		&self,
		ctx: &ZoneContext,
		code: &str,
		accepted_username: Option<&str>,
	) -> Result<InvitationResult, VerificationError> {
		let redeemed = self
			.codes
			.redeem_for_intent(code, CodeIntent::Invitation.as_str())
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
		let was_verified = user.verified;

		let username = match &payload.origin {
			Origin::Internal => None,
			Origin::Federated(_) => accepted_username
				.filter(|name| !name.is_empty())
				.map(str::to_string)
				.or_else(|| payload.user_name.clone())
				.filter(|name| *name != user.username),
		};
		let update = UserUpdate {
			username,
			origin: Some(payload.origin.clone()),
			verified: Some(true),
			legacy_verification_behavior: Some(false),
			..Default::default()
		};
		let updated = self.users.update_user(ctx, &user.id, &update).await?;

		let requires_password = updated.origin.is_internal() && !was_verified;
		tracing::info!(requires_password, "invitation accepted");

		let redirect_url = self
			.redirects
			.resolve_or_none(
				ctx,
				payload.client_id.as_deref(),
				payload.redirect_uri.as_deref(),
				RedirectPurpose::Invitation,
			)
			.await;

		Ok(InvitationResult {
			user_id: updated.id,
			username: updated.username,
			email: updated.email,
			origin: updated.origin,
			requires_password,
			redirect_url,
		})
	}
}
