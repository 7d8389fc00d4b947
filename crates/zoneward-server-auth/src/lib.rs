// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Domain types for the Zoneward identity core.
//!
//! This crate provides:
//! - Identity zones and the explicit [`ZoneContext`] every lookup is scoped by
//! - Users and their identity [`Origin`]
//! - Client registrations and the single-wildcard redirect matcher
//! - Expiring single-use codes and the payloads verification flows bind to them
//!
//! Nothing in here performs I/O. Persistence lives in `zoneward-server-db` and
//! orchestration in `zoneward-server-verification`.
//!
//! # Security Considerations
//!
//! - Codes are drawn from a CSPRNG and only their SHA-256 digest is persisted
//! - Password material is wrapped in [`Secret`] so it never reaches logs

pub mod client;
pub mod code;
pub mod error;
pub mod payload;
pub mod secret;
pub mod types;
pub mod user;
pub mod zone;

pub use client::{
	redirect_matches, ClientRegistration, RedirectPurpose, CHANGE_EMAIL_REDIRECT_URL_KEY,
	INVITATION_REDIRECT_URL_KEY,
};
pub use code::{
	generate_code_token, hash_code, CodeIntent, ExpiringCode, CODE_TOKEN_BYTES,
	DEFAULT_EMAIL_CHANGE_TTL_SECS, DEFAULT_INVITATION_TTL_SECS,
};
pub use error::{AuthError, Result};
pub use payload::VerificationPayload;
pub use secret::{Secret, SecretString, REDACTED};
pub use types::UserId;
pub use user::{NewUser, Origin, User, UserUpdate, DEFAULT_AUTHORITY, INTERNAL_ORIGIN};
pub use zone::{Zone, ZoneContext, ZoneId, DEFAULT_ZONE_ID};
