// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Layered configuration for Zoneward server.
//!
//! Sources, lowest to highest precedence: built-in defaults, a TOML file,
//! then `ZONEWARD_SERVER_*` environment variables.
//!
//! ```ignore
//! use zoneward_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("database at {}", config.database.url);
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{
	ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource, SYSTEM_CONFIG_PATH,
};

use tracing::{debug, info};

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
	pub database: DatabaseConfig,
	pub codes: CodesConfig,
	pub directory: DirectoryConfig,
	pub logging: LoggingConfig,
}

impl ServerConfig {
	/// Log the resolved settings. Call once a subscriber is installed, since
	/// logging itself is configured from this value.
	pub fn log_summary(&self) {
		info!(
			database = %self.database.url,
			max_connections = self.database.max_connections,
			email_change_ttl_secs = self.codes.email_change_ttl_secs,
			invitation_ttl_secs = self.codes.invitation_ttl_secs,
			reaper_interval_secs = self.codes.reaper_interval_secs,
			default_authorities = ?self.directory.default_authorities,
			log_format = %self.logging.format,
			"Server configuration loaded"
		);
	}
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`ZONEWARD_SERVER_*`)
/// 2. Config file (`/etc/zoneward/server.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

/// Merge the given sources in precedence order and resolve the result.
pub fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let config = ServerConfig {
		database: layer.database.unwrap_or_default().finalize(),
		codes: layer.codes.unwrap_or_default().finalize(),
		directory: layer.directory.unwrap_or_default().finalize(),
		logging: layer.logging.unwrap_or_default().finalize(),
	};

	validate_config(&config)?;
	Ok(config)
}

/// Validate cross-field configuration rules.
pub fn validate_config(config: &ServerConfig) -> Result<(), ConfigError> {
	let durations = [
		("codes.email_change_ttl_secs", config.codes.email_change_ttl_secs),
		("codes.invitation_ttl_secs", config.codes.invitation_ttl_secs),
		("codes.reaper_interval_secs", config.codes.reaper_interval_secs),
	];
	for (key, value) in durations {
		if value == 0 {
			return Err(ConfigError::Validation(format!("{key} must be greater than zero")));
		}
	}

	if config.database.url.trim().is_empty() {
		return Err(ConfigError::Validation("database.url must not be empty".to_string()));
	}
	if config.database.max_connections == 0 {
		return Err(ConfigError::Validation(
			"database.max_connections must be greater than zero".to_string(),
		));
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;
	use std::sync::{Arc, Mutex};

	#[derive(Clone, Default)]
	struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

	impl CapturedLogs {
		fn contents(&self) -> String {
			String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
		}
	}

	impl Write for CapturedLogs {
		fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
			self.0.lock().unwrap().extend_from_slice(buf);
			Ok(buf.len())
		}

		fn flush(&mut self) -> std::io::Result<()> {
			Ok(())
		}
	}

	fn capture_info(f: impl FnOnce()) -> String {
		let logs = CapturedLogs::default();
		let writer = logs.clone();
		let subscriber = tracing_subscriber::fmt()
			.with_max_level(tracing::Level::INFO)
			.with_ansi(false)
			.with_writer(move || writer.clone())
			.finish();
		tracing::subscriber::with_default(subscriber, f);
		logs.contents()
	}

	#[test]
	fn summary_is_logged_on_request_not_on_load() {
		let mut config = None;
		let during_load = capture_info(|| {
			config = Some(load_from_sources(vec![Box::new(DefaultsSource)]).unwrap());
		});
		assert!(!during_load.contains("Server configuration loaded"));

		let config = config.unwrap();
		let summary = capture_info(|| config.log_summary());
		assert!(summary.contains("Server configuration loaded"));
		assert!(summary.contains("reaper_interval_secs=300"));
		assert!(summary.contains(&config.database.url));
	}

	struct FixedSource {
		precedence: Precedence,
		layer: ServerConfigLayer,
	}

	impl ConfigSource for FixedSource {
		fn name(&self) -> &'static str {
			"fixed"
		}

		fn precedence(&self) -> Precedence {
			self.precedence
		}

		fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
			Ok(self.layer.clone())
		}
	}

	fn brand_source(precedence: Precedence, brand: &str) -> Box<dyn ConfigSource> {
		Box::new(FixedSource {
			precedence,
			layer: ServerConfigLayer {
				directory: Some(DirectoryConfigLayer {
					brand: Some(brand.to_string()),
					..Default::default()
				}),
				..Default::default()
			},
		})
	}

	#[test]
	fn defaults_resolve_and_validate() {
		let config = load_from_sources(vec![Box::new(DefaultsSource)]).unwrap();
		assert_eq!(config.database.url, "sqlite:./zoneward.db");
		assert_eq!(config.codes.email_change_ttl_secs, 3600);
		assert_eq!(config.directory.brand, "Account");
	}

	#[test]
	fn higher_precedence_wins_regardless_of_order() {
		let config = load_from_sources(vec![
			brand_source(Precedence::Environment, "from-env"),
			brand_source(Precedence::ConfigFile, "from-file"),
		])
		.unwrap();
		assert_eq!(config.directory.brand, "from-env");
	}

	#[test]
	fn zero_ttl_is_rejected() {
		let mut config = ServerConfig::default();
		config.codes.invitation_ttl_secs = 0;
		let err = validate_config(&config).unwrap_err();
		assert!(err.to_string().contains("codes.invitation_ttl_secs"));
	}

	#[test]
	fn zero_pool_size_is_rejected() {
		let mut config = ServerConfig::default();
		config.database.max_connections = 0;
		let err = validate_config(&config).unwrap_err();
		assert!(err.to_string().contains("database.max_connections"));
	}

	#[test]
	fn zero_reaper_interval_from_file_fails_loading() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "[codes]\nreaper_interval_secs = 0").unwrap();

		let result = load_from_sources(vec![
			Box::new(DefaultsSource),
			Box::new(TomlSource::new(file.path())),
		]);
		assert!(matches!(result, Err(ConfigError::Validation(_))));
	}

	#[test]
	fn file_values_override_defaults() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(
			file,
			"[codes]\nemail_change_ttl_secs = 120\n\n[logging]\nformat = \"json\""
		)
		.unwrap();

		let config = load_from_sources(vec![
			Box::new(DefaultsSource),
			Box::new(TomlSource::new(file.path())),
		])
		.unwrap();
		assert_eq!(config.codes.email_change_ttl_secs, 120);
		assert_eq!(config.codes.invitation_ttl_secs, 604_800);
		assert_eq!(config.logging.format, LogFormat::Json);
	}
}
