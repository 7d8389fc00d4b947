// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Redirect resolution against a client's allow-list.
//!
//! 1. No client id: no redirect.
//! 2. Unknown client: [`RedirectError::ClientNotFound`].
//! 3. No requested redirect: the client's fallback for the purpose.
//! 4. Requested redirect matching a registered pattern: returned verbatim.
//! 5. Anything else: the fallback. A mismatch is never an error.

use std::sync::Arc;

use zoneward_server_auth::{RedirectPurpose, ZoneContext};
use zoneward_server_db::ClientStore;

use crate::error::RedirectError;

#[derive(Clone)]
pub struct RedirectResolver {
	clients: Arc<dyn ClientStore>,
}

impl RedirectResolver {
	pub fn new(clients: Arc<dyn ClientStore>) -> Self {
		Self { clients }
	}

	#[tracing::instrument(
		skip(self, ctx, requested, purpose),
		fields(zone_id = %ctx.zone_id(), purpose = ?purpose)
	)]
	pub async fn resolve_redirect(
		&self,
		ctx: &ZoneContext,
		client_id: Option<&str>,
		requested: Option<&str>,
		purpose: RedirectPurpose,
	) -> Result<Option<String>, RedirectError> {
		let Some(client_id) = client_id.filter(|id| !id.is_empty()) else {
			return Ok(None);
		};

		let client = self
			.clients
			.get_client(ctx, client_id)
			.await?
			.ok_or_else(|| RedirectError::ClientNotFound(client_id.to_string()))?;

		let fallback = client.fallback_redirect(purpose);
		match requested.filter(|uri| !uri.is_empty()) {
			None => Ok(fallback),
			Some(uri) if client.allows_redirect(uri) => Ok(Some(uri.to_string())),
			Some(_) => {
				tracing::debug!("requested redirect not registered, using fallback");
				Ok(fallback)
			}
		}
	}

	/// Resolve, logging and absorbing any failure as "no redirect".
	pub async fn resolve_or_none(
		&self,
		ctx: &ZoneContext,
		client_id: Option<&str>,
		requested: Option<&str>,
		purpose: RedirectPurpose,
	) -> Option<String> {
		match self
			.resolve_redirect(ctx, client_id, requested, purpose)
			.await
		{
			Ok(redirect) => redirect,
			Err(e) => {
				tracing::warn!(error = %e, client_id = ?client_id, "redirect resolution failed");
				None
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use zoneward_server_auth::ClientRegistration;
	use zoneward_server_db::{testing::create_test_pool, ClientRepository};

	async fn resolver() -> RedirectResolver {
		let repo = ClientRepository::new(create_test_pool().await);
		let client = ClientRegistration::new("app", "uaa")
			.with_redirect_uri("http://app.com/*")
			.with_fallback(RedirectPurpose::EmailChange, "http://fallback.url/redirect");
		repo.create_client(&ZoneContext::default(), &client)
			.await
			.unwrap();
		RedirectResolver::new(Arc::new(repo))
	}

	async fn resolve(requested: Option<&str>) -> Option<String> {
		resolver()
			.await
			.resolve_redirect(
				&ZoneContext::default(),
				Some("app"),
				requested,
				RedirectPurpose::EmailChange,
			)
			.await
			.unwrap()
	}

	#[tokio::test]
	async fn matching_redirect_is_returned_verbatim() {
		assert_eq!(
			resolve(Some("http://app.com/redirect")).await.as_deref(),
			Some("http://app.com/redirect")
		);
	}

	#[tokio::test]
	async fn mismatched_redirect_falls_back() {
		assert_eq!(
			resolve(Some("http://blah.app.com/redirect")).await.as_deref(),
			Some("http://fallback.url/redirect")
		);
	}

	#[tokio::test]
	async fn missing_redirect_falls_back() {
		assert_eq!(
			resolve(None).await.as_deref(),
			Some("http://fallback.url/redirect")
		);
		assert_eq!(
			resolve(Some("")).await.as_deref(),
			Some("http://fallback.url/redirect")
		);
	}

	#[tokio::test]
	async fn missing_client_id_yields_no_redirect() {
		let resolved = resolver()
			.await
			.resolve_redirect(
				&ZoneContext::default(),
				None,
				Some("http://app.com/redirect"),
				RedirectPurpose::EmailChange,
			)
			.await
			.unwrap();
		assert_eq!(resolved, None);
	}

	#[tokio::test]
	async fn unknown_client_is_an_error_that_can_be_absorbed() {
		let resolver = resolver().await;
		let ctx = ZoneContext::default();
		let err = resolver
			.resolve_redirect(&ctx, Some("ghost"), None, RedirectPurpose::EmailChange)
			.await
			.unwrap_err();
		assert!(matches!(err, RedirectError::ClientNotFound(ref id) if id == "ghost"));

		assert_eq!(
			resolver
				.resolve_or_none(&ctx, Some("ghost"), None, RedirectPurpose::EmailChange)
				.await,
			None
		);
	}

	#[tokio::test]
	async fn fallback_is_chosen_per_purpose() {
		assert_eq!(
			resolver()
				.await
				.resolve_redirect(
					&ZoneContext::default(),
					Some("app"),
					Some("http://evil.com"),
					RedirectPurpose::Invitation,
				)
				.await
				.unwrap(),
			None
		);
	}
}
