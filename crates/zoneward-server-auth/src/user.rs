// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Users and identity origins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::secret::SecretString;
use crate::types::UserId;
use crate::zone::ZoneId;

/// Origin key of the internal user store.
pub const INTERNAL_ORIGIN: &str = "uaa";

/// Authority granted to every user of a directory unless configured otherwise.
pub const DEFAULT_AUTHORITY: &str = "uaa.user";

/// The identity source a user record belongs to.
///
/// Stored and serialized as its origin key: `"uaa"` for the internal store,
/// the provider alias for anything federated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Origin {
	Internal,
	Federated(String),
}

impl Origin {
	pub fn parse(key: &str) -> Self {
		if key == INTERNAL_ORIGIN {
			Origin::Internal
		} else {
			Origin::Federated(key.to_string())
		}
	}

	pub fn as_str(&self) -> &str {
		match self {
			Origin::Internal => INTERNAL_ORIGIN,
			Origin::Federated(alias) => alias,
		}
	}

	pub fn is_internal(&self) -> bool {
		matches!(self, Origin::Internal)
	}
}

impl Default for Origin {
	fn default() -> Self {
		Origin::Internal
	}
}

impl fmt::Display for Origin {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl From<String> for Origin {
	fn from(key: String) -> Self {
		Self::parse(&key)
	}
}

impl From<Origin> for String {
	fn from(origin: Origin) -> Self {
		origin.as_str().to_string()
	}
}

/// A user of one identity zone.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
	pub id: UserId,
	pub zone_id: ZoneId,
	pub username: String,
	pub email: String,
	pub given_name: Option<String>,
	pub family_name: Option<String>,
	pub origin: Origin,
	/// Granted authority names, stored ones plus the directory defaults.
	pub authorities: Vec<String>,
	pub verified: bool,
	/// Set on records that predate explicit verification tracking.
	pub legacy_verification_behavior: bool,
	pub password: Option<SecretString>,
	pub salt: Option<String>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	pub password_last_modified: DateTime<Utc>,
}

impl User {
	/// True when no separate username was ever chosen and the username is
	/// just the primary email.
	pub fn username_mirrors_email(&self) -> bool {
		self.username == self.email
	}

	pub fn has_authority(&self, authority: &str) -> bool {
		self.authorities.iter().any(|a| a == authority)
	}
}

/// Fields needed to provision a user.
#[derive(Debug, Clone)]
pub struct NewUser {
	pub username: String,
	pub email: String,
	pub given_name: Option<String>,
	pub family_name: Option<String>,
	pub origin: Origin,
	pub verified: bool,
	pub password: Option<SecretString>,
}

impl NewUser {
	pub fn new(username: impl Into<String>, email: impl Into<String>, origin: Origin) -> Self {
		Self {
			username: username.into(),
			email: email.into(),
			given_name: None,
			family_name: None,
			origin,
			verified: false,
			password: None,
		}
	}

	pub fn verified(mut self, verified: bool) -> Self {
		self.verified = verified;
		self
	}

	pub fn with_names(mut self, given: impl Into<String>, family: impl Into<String>) -> Self {
		self.given_name = Some(given.into());
		self.family_name = Some(family.into());
		self
	}
}

/// A partial update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserUpdate {
	pub username: Option<String>,
	pub email: Option<String>,
	pub origin: Option<Origin>,
	pub verified: Option<bool>,
	pub legacy_verification_behavior: Option<bool>,
}

impl UserUpdate {
	pub fn is_empty(&self) -> bool {
		*self == Self::default()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn origin_parses_internal_key() {
		assert_eq!(Origin::parse("uaa"), Origin::Internal);
		assert!(Origin::parse("uaa").is_internal());
	}

	#[test]
	fn origin_parses_federated_alias() {
		let origin = Origin::parse("okta-saml");
		assert_eq!(origin, Origin::Federated("okta-saml".to_string()));
		assert_eq!(origin.as_str(), "okta-saml");
		assert!(!origin.is_internal());
	}

	#[test]
	fn origin_serializes_as_key() {
		let json = serde_json::to_string(&Origin::Internal).unwrap();
		assert_eq!(json, "\"uaa\"");
		let back: Origin = serde_json::from_str("\"ldap\"").unwrap();
		assert_eq!(back, Origin::Federated("ldap".to_string()));
	}

	#[test]
	fn empty_update_is_empty() {
		assert!(UserUpdate::default().is_empty());
		let update = UserUpdate {
			email: Some("a@b.c".to_string()),
			..Default::default()
		};
		assert!(!update.is_empty());
	}
}
