// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Verification workflows for Zoneward.
//!
//! Each workflow has a *begin* step, which validates the request and issues an
//! expiring code bound to the pending change, and a *complete* step, which
//! redeems the code exactly once and applies the change:
//!
//! - [`EmailChangeService`]: move a user to a new email address
//! - [`InvitationService`]: provision and verify an invited user
//!
//! The services never send anything. They return the code together with a
//! [`NotificationMessage`] builder for an external mailer.
//!
//! Retries are left to the caller; see [`VerificationError::is_retryable`].

pub mod email_change;
pub mod error;
pub mod invitation;
pub mod message;
pub mod redirect;
mod settings;

#[cfg(test)]
mod testing;

pub use email_change::{EmailChangeResult, EmailChangeService, PendingEmailChange};
pub use error::{RedirectError, VerificationError};
pub use invitation::{Invitation, InvitationResult, InvitationService, PendingInvitation};
pub use message::{MessageKind, NotificationMessage};
pub use redirect::RedirectResolver;
pub use settings::VerificationSettings;
