// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for the Shield authorization engine.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Type-safe configuration with validation
//! - Consistent environment variable naming (`SHIELD_AUTHZ_*`)
//!
//! # Usage
//!
//! ```ignore
//! use shield_authz_config::load_config;
//!
//! let config = load_config()?;
//! println!("Policies stored in {}", config.database.url);
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::AuthzConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthzConfig {
	pub database: DatabaseConfig,
	pub engine: EngineConfig,
	pub logging: LoggingConfig,
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`SHIELD_AUTHZ_*`)
/// 2. Config file (`/etc/shield/authz.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<AuthzConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration from environment only (for testing or simple deployments).
pub fn load_config_from_env() -> Result<AuthzConfig, ConfigError> {
	let mut merged = AuthzConfigLayer::default();
	merged.merge(EnvSource.load()?);
	finalize(merged)
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<AuthzConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

/// Merge the given sources in precedence order and resolve the result.
pub fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<AuthzConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = AuthzConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
fn finalize(layer: AuthzConfigLayer) -> Result<AuthzConfig, ConfigError> {
	let database = layer.database.unwrap_or_default().finalize()?;
	let engine = layer.engine.unwrap_or_default().finalize()?;
	let logging = layer.logging.unwrap_or_default().finalize()?;

	info!(
		database = %database.url,
		max_hierarchy_depth = ?engine.max_hierarchy_depth,
		log_level = %logging.level,
		"authz configuration loaded"
	);

	Ok(AuthzConfig {
		database,
		engine,
		logging,
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	struct FixedSource(Precedence, AuthzConfigLayer);

	impl ConfigSource for FixedSource {
		fn name(&self) -> &'static str {
			"fixed"
		}

		fn precedence(&self) -> Precedence {
			self.0
		}

		fn load(&self) -> Result<AuthzConfigLayer, ConfigError> {
			Ok(self.1.clone())
		}
	}

	fn database(url: &str) -> AuthzConfigLayer {
		AuthzConfigLayer {
			database: Some(DatabaseConfigLayer {
				url: Some(url.to_string()),
			}),
			..Default::default()
		}
	}

	#[test]
	fn test_defaults_resolve() {
		let config = finalize(AuthzConfigLayer::default()).unwrap();
		assert_eq!(config.database.url, DEFAULT_DATABASE_URL);
		assert_eq!(config.engine, EngineConfig::default());
		assert_eq!(config.logging, LoggingConfig::default());
	}

	#[test]
	fn test_higher_precedence_wins_regardless_of_order() {
		let config = load_from_sources(vec![
			Box::new(FixedSource(Precedence::Environment, database("sqlite:env.db"))),
			Box::new(FixedSource(Precedence::ConfigFile, database("sqlite:file.db"))),
			Box::new(DefaultsSource),
		])
		.unwrap();
		assert_eq!(config.database.url, "sqlite:env.db");
	}

	#[test]
	fn test_invalid_engine_section_fails() {
		let layer = AuthzConfigLayer {
			engine: Some(EngineConfigLayer {
				max_hierarchy_depth: Some(0),
			}),
			..Default::default()
		};
		assert!(finalize(layer).is_err());
	}

	#[test]
	fn test_invalid_database_section_fails() {
		assert!(matches!(
			finalize(database("mysql://localhost/shield")),
			Err(ConfigError::InvalidValue { .. })
		));
	}

	#[test]
	fn test_load_with_missing_file_uses_defaults() {
		let config = load_from_sources(vec![
			Box::new(DefaultsSource),
			Box::new(TomlSource::new("/nonexistent/authz.toml")),
		])
		.unwrap();
		assert_eq!(config.database.url, DEFAULT_DATABASE_URL);
	}
}
