// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Registered clients and redirect allow-list matching.
//!
//! # Matching rules
//!
//! A registered redirect pattern without `*` matches only the identical URI.
//! A pattern with `*` is split at its first `*` into a prefix and a suffix; a
//! URI matches when it starts with the prefix, ends with the suffix and is long
//! enough for the two not to overlap. Any further `*` in the suffix is taken
//! literally. This is intentionally not a glob or regex engine.
//!
//! ```
//! use zoneward_server_auth::redirect_matches;
//!
//! assert!(redirect_matches("http://app.com/*", "http://app.com/redirect"));
//! assert!(!redirect_matches("http://app.com/*", "http://blah.app.com/redirect"));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::zone::ZoneId;

/// Additional-information key holding the email change fallback redirect.
pub const CHANGE_EMAIL_REDIRECT_URL_KEY: &str = "change_email_redirect_url";

/// Additional-information key holding the invitation fallback redirect.
pub const INVITATION_REDIRECT_URL_KEY: &str = "invitation_redirect_url";

/// Which flow a redirect is being resolved for; selects the fallback key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RedirectPurpose {
	EmailChange,
	Invitation,
}

impl RedirectPurpose {
	pub fn fallback_key(self) -> &'static str {
		match self {
			RedirectPurpose::EmailChange => CHANGE_EMAIL_REDIRECT_URL_KEY,
			RedirectPurpose::Invitation => INVITATION_REDIRECT_URL_KEY,
		}
	}
}

/// An OAuth-style client registered in a zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRegistration {
	pub client_id: String,
	pub zone_id: ZoneId,
	pub grant_types: Vec<String>,
	/// Allowed redirect patterns.
	pub redirect_uris: Vec<String>,
	/// Free-form client metadata; fallback redirects live here.
	#[serde(default)]
	pub additional_information: Map<String, Value>,
}

impl ClientRegistration {
	pub fn new(client_id: impl Into<String>, zone_id: impl Into<ZoneId>) -> Self {
		Self {
			client_id: client_id.into(),
			zone_id: zone_id.into(),
			grant_types: Vec::new(),
			redirect_uris: Vec::new(),
			additional_information: Map::new(),
		}
	}

	pub fn with_grant_type(mut self, grant_type: impl Into<String>) -> Self {
		self.grant_types.push(grant_type.into());
		self
	}

	pub fn with_redirect_uri(mut self, pattern: impl Into<String>) -> Self {
		self.redirect_uris.push(pattern.into());
		self
	}

	pub fn with_fallback(mut self, purpose: RedirectPurpose, uri: impl Into<String>) -> Self {
		self.additional_information.insert(
			purpose.fallback_key().to_string(),
			Value::String(uri.into()),
		);
		self
	}

	/// The configured fallback redirect for `purpose`, if any.
	pub fn fallback_redirect(&self, purpose: RedirectPurpose) -> Option<String> {
		self.additional_information
			.get(purpose.fallback_key())
			.and_then(Value::as_str)
			.filter(|uri| !uri.is_empty())
			.map(str::to_string)
	}

	/// True when `uri` matches any registered pattern.
	pub fn allows_redirect(&self, uri: &str) -> bool {
		self.redirect_uris
			.iter()
			.any(|pattern| redirect_matches(pattern, uri))
	}
}

/// Single-wildcard prefix/suffix containment match.
pub fn redirect_matches(pattern: &str, uri: &str) -> bool {
	match pattern.split_once('*') {
		None => pattern == uri,
		Some((prefix, suffix)) => {
			uri.len() >= prefix.len() + suffix.len()
				&& uri.starts_with(prefix)
				&& uri.ends_with(suffix)
		}
	}
}
