// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Policy database configuration.

use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_DATABASE_URL: &str = "sqlite:./shield-authz.db";

/// Where policies and grouping edges are persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
	/// SQLite connection URL, e.g. `sqlite:./shield-authz.db` or `sqlite::memory:`.
	pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct DatabaseConfigLayer {
	#[serde(default)]
	pub url: Option<String>,
}

impl DatabaseConfigLayer {
	pub fn merge(&mut self, other: DatabaseConfigLayer) {
		if other.url.is_some() {
			self.url = other.url;
		}
	}

	/// Resolves the URL, falling back to [`DEFAULT_DATABASE_URL`] when unset.
	pub fn finalize(self) -> Result<DatabaseConfig, ConfigError> {
		let Some(url) = self.url else {
			return Ok(DatabaseConfig {
				url: DEFAULT_DATABASE_URL.to_string(),
			});
		};
		let url = url.trim().to_string();
		if !url.starts_with("sqlite:") {
			return Err(ConfigError::invalid_value(
				"database.url",
				format!("'{url}' is not a sqlite: URL"),
			));
		}
		Ok(DatabaseConfig { url })
	}
}
