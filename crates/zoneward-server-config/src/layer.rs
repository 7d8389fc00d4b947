// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration layer for merging from multiple sources.

use serde::Deserialize;

use crate::sections::{CodesConfigLayer, DatabaseConfigLayer, DirectoryConfigLayer, LoggingConfigLayer};

/// Server configuration layer - all fields are Option for merging.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfigLayer {
	#[serde(default)]
	pub database: Option<DatabaseConfigLayer>,
	#[serde(default)]
	pub codes: Option<CodesConfigLayer>,
	#[serde(default)]
	pub directory: Option<DirectoryConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
}

impl ServerConfigLayer {
	/// Merge another layer into this one. Other layer takes precedence.
	pub fn merge(&mut self, other: ServerConfigLayer) {
		merge_option(&mut self.database, other.database, DatabaseConfigLayer::merge);
		merge_option(&mut self.codes, other.codes, CodesConfigLayer::merge);
		merge_option(&mut self.directory, other.directory, DirectoryConfigLayer::merge);
		merge_option(&mut self.logging, other.logging, LoggingConfigLayer::merge);
	}
}

fn merge_option<T, F>(target: &mut Option<T>, source: Option<T>, merge_fn: F)
where
	F: FnOnce(&mut T, T),
{
	match (target.as_mut(), source) {
		(Some(t), Some(s)) => merge_fn(t, s),
		(None, Some(s)) => *target = Some(s),
		_ => {}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn merge_empty_layers() {
		let mut base = ServerConfigLayer::default();
		base.merge(ServerConfigLayer::default());
		assert!(base.database.is_none());
		assert!(base.codes.is_none());
	}

	#[test]
	fn merge_fills_missing_sections() {
		let mut base = ServerConfigLayer::default();
		base.merge(ServerConfigLayer {
			codes: Some(CodesConfigLayer {
				reaper_interval_secs: Some(10),
				..Default::default()
			}),
			..Default::default()
		});
		assert_eq!(base.codes.unwrap().reaper_interval_secs, Some(10));
	}

	#[test]
	fn parses_full_toml() {
		let layer: ServerConfigLayer = toml::from_str(
			r#"
			[database]
			url = "sqlite::memory:"

			[codes]
			email_change_ttl_secs = 900

			[directory]
			default_authorities = ["uaa.user", "openid"]
			brand = "Acme"

			[logging]
			level = "debug"
			format = "json"
			"#,
		)
		.unwrap();

		assert_eq!(layer.database.unwrap().url.as_deref(), Some("sqlite::memory:"));
		assert_eq!(layer.codes.unwrap().email_change_ttl_secs, Some(900));
		assert_eq!(layer.directory.unwrap().brand.as_deref(), Some("Acme"));
		assert_eq!(layer.logging.unwrap().level.as_deref(), Some("debug"));
	}

	fn codes_layer(ttl: Option<u64>) -> ServerConfigLayer {
		ServerConfigLayer {
			codes: Some(CodesConfigLayer {
				email_change_ttl_secs: ttl,
				..Default::default()
			}),
			..Default::default()
		}
	}

	proptest! {
		#[test]
		fn later_layer_wins_when_set(low in proptest::option::of(1u64..100_000), high in proptest::option::of(1u64..100_000)) {
			let mut merged = codes_layer(low);
			merged.merge(codes_layer(high));

			let expected = high.or(low);
			prop_assert_eq!(merged.codes.unwrap().email_change_ttl_secs, expected);
		}
	}
}
