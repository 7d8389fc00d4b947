// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use zoneward_server_auth::{ZoneContext, DEFAULT_EMAIL_CHANGE_TTL_SECS, DEFAULT_INVITATION_TTL_SECS};
use zoneward_server_db::ZoneStore;

use crate::error::VerificationError;

/// Fixed workflow parameters, set once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationSettings {
	pub email_change_ttl: Duration,
	pub invitation_ttl: Duration,
	/// Display name used in messages for the default zone.
	pub brand: String,
}

impl Default for VerificationSettings {
	fn default() -> Self {
		Self {
			email_change_ttl: Duration::from_secs(DEFAULT_EMAIL_CHANGE_TTL_SECS),
			invitation_ttl: Duration::from_secs(DEFAULT_INVITATION_TTL_SECS),
			brand: "Account".to_string(),
		}
	}
}

/// Name shown to users of the context's zone.
pub(crate) async fn display_name(
	zones: &Arc<dyn ZoneStore>,
	ctx: &ZoneContext,
	brand: &str,
) -> Result<String, VerificationError> {
	if ctx.is_default() {
		return Ok(brand.to_string());
	}
	let zone = zones.get_zone_by_id(ctx.zone_id()).await?;
	Ok(zone
		.map(|z| z.name)
		.unwrap_or_else(|| ctx.zone_id().to_string()))
}

/// Expiry for a code issued now with lifetime `ttl`.
pub(crate) fn deadline(ttl: Duration) -> DateTime<Utc> {
	chrono::Duration::from_std(ttl)
		.ok()
		.and_then(|ttl| Utc::now().checked_add_signed(ttl))
		.unwrap_or(DateTime::<Utc>::MAX_UTC)
}
