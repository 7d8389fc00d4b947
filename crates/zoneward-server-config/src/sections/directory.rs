// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! User directory configuration.

use serde::{Deserialize, Serialize};

fn default_authorities() -> Vec<String> {
	vec!["uaa.user".to_string()]
}

fn default_brand() -> String {
	"Account".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DirectoryConfigLayer {
	pub default_authorities: Option<Vec<String>>,
	pub brand: Option<String>,
}

impl DirectoryConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.default_authorities.is_some() {
			self.default_authorities = other.default_authorities;
		}
		if other.brand.is_some() {
			self.brand = other.brand;
		}
	}

	pub fn finalize(self) -> DirectoryConfig {
		let default_authorities = self
			.default_authorities
			.map(|authorities| {
				authorities
					.into_iter()
					.map(|authority| authority.trim().to_string())
					.filter(|authority| !authority.is_empty())
					.collect()
			})
			.unwrap_or_else(default_authorities);

		DirectoryConfig {
			default_authorities,
			brand: self.brand.unwrap_or_else(default_brand),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DirectoryConfig {
	/// Granted to every user on read, ahead of stored authorities.
	pub default_authorities: Vec<String>,
	/// Display name used in messages for the default zone.
	pub brand: String,
}

impl Default for DirectoryConfig {
	fn default() -> Self {
		Self {
			default_authorities: default_authorities(),
			brand: default_brand(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults() {
		let config = DirectoryConfigLayer::default().finalize();
		assert_eq!(config.default_authorities, vec!["uaa.user".to_string()]);
		assert_eq!(config.brand, "Account");
	}

	#[test]
	fn blank_authorities_are_dropped() {
		let layer = DirectoryConfigLayer {
			default_authorities: Some(vec![
				" uaa.user ".to_string(),
				"".to_string(),
				"openid".to_string(),
			]),
			brand: Some("Acme".to_string()),
		};
		let config = layer.finalize();
		assert_eq!(
			config.default_authorities,
			vec!["uaa.user".to_string(), "openid".to_string()]
		);
		assert_eq!(config.brand, "Acme");
	}

	#[test]
	fn explicit_empty_list_disables_defaults() {
		let layer: DirectoryConfigLayer = toml::from_str("default_authorities = []").unwrap();
		assert!(layer.finalize().default_authorities.is_empty());
	}
}
