// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Plain-text notification content handed to an external mailer.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
	ChangeEmail,
	Invitation,
}

/// What a notification collaborator needs to deliver a code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationMessage {
	pub recipient: String,
	pub kind: MessageKind,
	pub subject: String,
	pub body: String,
}

/// `<base>/<path>?code=<code>`, tolerating a trailing slash on `base`.
pub(crate) fn verification_link(base: &str, path: &str, code: &str) -> String {
	format!("{}/{path}?code={code}", base.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn link_joins_without_double_slash() {
		assert_eq!(
			verification_link("http://localhost/login/", "verify_email", "abc"),
			"http://localhost/login/verify_email?code=abc"
		);
		assert_eq!(
			verification_link("http://localhost/login", "verify_email", "abc"),
			"http://localhost/login/verify_email?code=abc"
		);
	}

	#[test]
	fn kind_serializes_snake_case() {
		let message = NotificationMessage {
			recipient: "a@b.c".into(),
			kind: MessageKind::ChangeEmail,
			subject: "s".into(),
			body: "b".into(),
		};
		let json = serde_json::to_value(&message).unwrap();
		assert_eq!(json["kind"], "change_email");
	}
}
