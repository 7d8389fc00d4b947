// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Identity zones and the per-request zone context.
//!
//! A zone is an isolated partition of users, clients and configuration. Every
//! user and client lookup takes a [`ZoneContext`] by reference; there is no
//! ambient "current zone", so a request can only ever see the zone it was
//! handed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of the zone every deployment starts with.
pub const DEFAULT_ZONE_ID: &str = "uaa";

/// Stable string identifier of an identity zone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(String);

impl ZoneId {
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	/// The well-known default zone.
	pub fn default_zone() -> Self {
		Self(DEFAULT_ZONE_ID.to_string())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub fn is_default(&self) -> bool {
		self.0 == DEFAULT_ZONE_ID
	}
}

impl Default for ZoneId {
	fn default() -> Self {
		Self::default_zone()
	}
}

impl fmt::Display for ZoneId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for ZoneId {
	fn from(id: &str) -> Self {
		Self(id.to_string())
	}
}

impl From<String> for ZoneId {
	fn from(id: String) -> Self {
		Self(id)
	}
}

/// An identity zone.
///
/// The subdomain is unique across all zones and stored lowercased. The
/// default zone has an empty subdomain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
	pub id: ZoneId,
	pub subdomain: String,
	pub name: String,
	pub description: Option<String>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl Zone {
	pub fn new(id: impl Into<ZoneId>, subdomain: &str, name: impl Into<String>) -> Self {
		let now = Utc::now();
		Self {
			id: id.into(),
			subdomain: subdomain.trim().to_lowercase(),
			name: name.into(),
			description: None,
			created_at: now,
			updated_at: now,
		}
	}

	pub fn is_default(&self) -> bool {
		self.id.is_default()
	}
}

/// The zone a unit of work runs in.
///
/// Built once per request by whatever resolves the tenant (for example from
/// the request hostname) and passed explicitly into every scoped lookup.
/// `ZoneContext::default()` is the default zone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ZoneContext {
	zone_id: ZoneId,
}

impl ZoneContext {
	pub fn new(zone_id: impl Into<ZoneId>) -> Self {
		Self {
			zone_id: zone_id.into(),
		}
	}

	pub fn default_zone() -> Self {
		Self::default()
	}

	pub fn zone_id(&self) -> &ZoneId {
		&self.zone_id
	}

	pub fn is_default(&self) -> bool {
		self.zone_id.is_default()
	}
}

impl From<&Zone> for ZoneContext {
	fn from(zone: &Zone) -> Self {
		Self::new(zone.id.clone())
	}
}
