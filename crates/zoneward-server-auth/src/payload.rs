// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Payload bound to verification codes.
//!
//! Stored as a flat JSON object of string values. `user_id` and `email` are
//! required; `origin` defaults to the internal store when absent.

use serde_json::{Map, Value};

use crate::error::{AuthError, Result};
use crate::types::UserId;
use crate::user::Origin;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationPayload {
	pub user_id: UserId,
	pub origin: Origin,
	pub email: String,
	/// Username the invitee is expected to end up with.
	pub user_name: Option<String>,
	pub client_id: Option<String>,
	pub redirect_uri: Option<String>,
}

impl VerificationPayload {
	pub fn new(user_id: UserId, origin: Origin, email: impl Into<String>) -> Self {
		Self {
			user_id,
			origin,
			email: email.into(),
			user_name: None,
			client_id: None,
			redirect_uri: None,
		}
	}

	pub fn with_client(mut self, client_id: Option<String>, redirect_uri: Option<String>) -> Self {
		self.client_id = client_id;
		self.redirect_uri = redirect_uri;
		self
	}

	pub fn with_user_name(mut self, user_name: impl Into<String>) -> Self {
		self.user_name = Some(user_name.into());
		self
	}

	pub fn to_json(&self) -> String {
		let mut map = Map::new();
		map.insert("user_id".into(), Value::String(self.user_id.to_string()));
		map.insert("origin".into(), Value::String(self.origin.to_string()));
		map.insert("email".into(), Value::String(self.email.clone()));
		let optional = [
			("user_name", &self.user_name),
			("client_id", &self.client_id),
			("redirect_uri", &self.redirect_uri),
		];
		for (key, value) in optional {
			if let Some(value) = value {
				map.insert(key.into(), Value::String(value.clone()));
			}
		}
		Value::Object(map).to_string()
	}

	pub fn from_json(raw: &str) -> Result<Self> {
		let map: Map<String, Value> =
			serde_json::from_str(raw).map_err(|e| AuthError::MalformedPayload(e.to_string()))?;

		let field = |key: &str| {
			map.get(key)
				.and_then(Value::as_str)
				.filter(|s| !s.is_empty())
				.map(str::to_string)
		};

		let user_id = field("user_id")
			.ok_or(AuthError::MissingField("user_id"))?
			.parse::<UserId>()
			.map_err(|e| AuthError::MalformedPayload(e.to_string()))?;
		let email = field("email").ok_or(AuthError::MissingField("email"))?;
		let origin = field("origin")
			.map(|key| Origin::parse(&key))
			.unwrap_or_default();

		Ok(Self {
			user_id,
			origin,
			email,
			user_name: field("user_name"),
			client_id: field("client_id"),
			redirect_uri: field("redirect_uri"),
		})
	}
}
