// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Expiring single-use codes.
//!
//! A code binds an opaque payload to a deadline. It can be redeemed at most
//! once and only strictly before `expires_at`.
//!
//! # Security Properties
//!
//! - **Unpredictable**: [`CODE_TOKEN_BYTES`] bytes from the thread-local CSPRNG,
//!   hex-encoded so the value is URL-safe.
//! - **Digest storage**: only [`hash_code`] of a code is persisted, so a
//!   database dump does not yield redeemable codes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Number of random bytes in a code.
pub const CODE_TOKEN_BYTES: usize = 32;

/// Default lifetime of an email change code.
pub const DEFAULT_EMAIL_CHANGE_TTL_SECS: u64 = 60 * 60;

/// Default lifetime of an invitation code.
pub const DEFAULT_INVITATION_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// The workflow a code was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeIntent {
	EmailChange,
	Invitation,
}

impl CodeIntent {
	pub fn as_str(self) -> &'static str {
		match self {
			CodeIntent::EmailChange => "email_change",
			CodeIntent::Invitation => "invitation",
		}
	}
}

impl fmt::Display for CodeIntent {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A code together with what it was issued for.
///
/// `code` is the plaintext value handed to the recipient. It is only populated
/// on records returned from generation or redemption; storage keeps the
/// digest.
#[derive(Clone, PartialEq, Eq)]
pub struct ExpiringCode {
	pub code: String,
	pub expires_at: DateTime<Utc>,
	pub payload: String,
	pub intent: Option<String>,
}

impl ExpiringCode {
	/// True when the code can no longer be redeemed at `now`.
	pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
		self.expires_at <= now
	}

	/// Short digest prefix that is safe to put in logs.
	pub fn log_id(&self) -> String {
		let mut digest = hash_code(&self.code);
		digest.truncate(12);
		digest
	}
}

impl fmt::Debug for ExpiringCode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ExpiringCode")
			.field("code", &crate::secret::REDACTED)
			.field("expires_at", &self.expires_at)
			.field("intent", &self.intent)
			.finish_non_exhaustive()
	}
}

/// Generate a fresh code value.
///
/// Returns a hex string of `2 * CODE_TOKEN_BYTES` characters.
pub fn generate_code_token() -> String {
	use rand::Rng;

	let mut rng = rand::thread_rng();
	let bytes: [u8; CODE_TOKEN_BYTES] = rng.gen();
	hex::encode(bytes)
}

/// SHA-256 digest of a code, hex-encoded. Used as the storage key.
pub fn hash_code(code: &str) -> String {
	let mut hasher = Sha256::new();
	hasher.update(code.as_bytes());
	hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Duration;
	use proptest::prelude::*;
	use std::collections::HashSet;

	mod token_generation {
		use super::*;

		#[test]
		fn generates_token_with_correct_length() {
			assert_eq!(generate_code_token().len(), CODE_TOKEN_BYTES * 2);
		}

		#[test]
		fn generates_url_safe_token() {
			let token = generate_code_token();
			assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
		}

		#[test]
		fn generates_unique_tokens() {
			let tokens: HashSet<_> = (0..100).map(|_| generate_code_token()).collect();
			assert_eq!(tokens.len(), 100);
		}
	}

	mod hashing {
		use super::*;

		#[test]
		fn hash_is_deterministic() {
			assert_eq!(hash_code("abc"), hash_code("abc"));
		}

		#[test]
		fn hash_is_sha256_hex() {
			assert_eq!(
				hash_code("abc"),
				"ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
			);
		}

		#[test]
		fn different_codes_hash_differently() {
			assert_ne!(hash_code("code-a"), hash_code("code-b"));
		}
	}

	mod expiry {
		use super::*;

		fn code_expiring_at(expires_at: DateTime<Utc>) -> ExpiringCode {
			ExpiringCode {
				code: generate_code_token(),
				expires_at,
				payload: "{}".to_string(),
				intent: None,
			}
		}

		#[test]
		fn expired_exactly_at_deadline() {
			let now = Utc::now();
			assert!(code_expiring_at(now).is_expired_at(now));
		}

		#[test]
		fn valid_strictly_before_deadline() {
			let now = Utc::now();
			let code = code_expiring_at(now + Duration::seconds(1));
			assert!(!code.is_expired_at(now));
			assert!(code.is_expired_at(now + Duration::seconds(2)));
		}

		#[test]
		fn debug_never_prints_code() {
			let code = code_expiring_at(Utc::now());
			let rendered = format!("{code:?}");
			assert!(!rendered.contains(&code.code));
			assert!(rendered.contains("[REDACTED]"));
		}

		#[test]
		fn log_id_is_digest_prefix() {
			let code = code_expiring_at(Utc::now());
			assert_eq!(code.log_id(), hash_code(&code.code)[..12]);
		}
	}

	#[test]
	fn intent_keys_are_stable() {
		assert_eq!(CodeIntent::EmailChange.as_str(), "email_change");
		assert_eq!(CodeIntent::Invitation.to_string(), "invitation");
	}

	proptest! {
		#[test]
		fn hash_is_always_64_hex_chars(code in ".*") {
			let digest = hash_code(&code);
			prop_assert_eq!(digest.len(), 64);
			prop_assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
		}
	}
}
