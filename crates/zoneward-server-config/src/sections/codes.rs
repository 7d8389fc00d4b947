// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Expiring code lifetimes and reaper schedule.

use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_EMAIL_CHANGE_TTL_SECS: u64 = 60 * 60;
const DEFAULT_INVITATION_TTL_SECS: u64 = 7 * 24 * 60 * 60;
const DEFAULT_REAPER_INTERVAL_SECS: u64 = 5 * 60;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CodesConfigLayer {
	pub email_change_ttl_secs: Option<u64>,
	pub invitation_ttl_secs: Option<u64>,
	pub reaper_interval_secs: Option<u64>,
}

impl CodesConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.email_change_ttl_secs.is_some() {
			self.email_change_ttl_secs = other.email_change_ttl_secs;
		}
		if other.invitation_ttl_secs.is_some() {
			self.invitation_ttl_secs = other.invitation_ttl_secs;
		}
		if other.reaper_interval_secs.is_some() {
			self.reaper_interval_secs = other.reaper_interval_secs;
		}
	}

	pub fn finalize(self) -> CodesConfig {
		CodesConfig {
			email_change_ttl_secs: self
				.email_change_ttl_secs
				.unwrap_or(DEFAULT_EMAIL_CHANGE_TTL_SECS),
			invitation_ttl_secs: self
				.invitation_ttl_secs
				.unwrap_or(DEFAULT_INVITATION_TTL_SECS),
			reaper_interval_secs: self
				.reaper_interval_secs
				.unwrap_or(DEFAULT_REAPER_INTERVAL_SECS),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodesConfig {
	pub email_change_ttl_secs: u64,
	pub invitation_ttl_secs: u64,
	pub reaper_interval_secs: u64,
}

impl CodesConfig {
	pub fn email_change_ttl(&self) -> Duration {
		Duration::from_secs(self.email_change_ttl_secs)
	}

	pub fn invitation_ttl(&self) -> Duration {
		Duration::from_secs(self.invitation_ttl_secs)
	}

	pub fn reaper_interval(&self) -> Duration {
		Duration::from_secs(self.reaper_interval_secs)
	}
}

impl Default for CodesConfig {
	fn default() -> Self {
		CodesConfigLayer::default().finalize()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults() {
		let config = CodesConfig::default();
		assert_eq!(config.email_change_ttl(), Duration::from_secs(3600));
		assert_eq!(config.invitation_ttl(), Duration::from_secs(604_800));
		assert_eq!(config.reaper_interval(), Duration::from_secs(300));
	}

	#[test]
	fn merge_keeps_unset_fields() {
		let mut base = CodesConfigLayer {
			email_change_ttl_secs: Some(600),
			invitation_ttl_secs: Some(86_400),
			reaper_interval_secs: None,
		};
		base.merge(CodesConfigLayer {
			email_change_ttl_secs: None,
			invitation_ttl_secs: Some(3_600),
			reaper_interval_secs: Some(30),
		});

		let config = base.finalize();
		assert_eq!(config.email_change_ttl_secs, 600);
		assert_eq!(config.invitation_ttl_secs, 3_600);
		assert_eq!(config.reaper_interval_secs, 30);
	}

	#[test]
	fn deserializes_partial_table() {
		let layer: CodesConfigLayer = toml::from_str("reaper_interval_secs = 60").unwrap();
		assert_eq!(layer.reaper_interval_secs, Some(60));
		assert!(layer.email_change_ttl_secs.is_none());
	}
}
