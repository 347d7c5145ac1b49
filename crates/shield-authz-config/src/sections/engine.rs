// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Enforcement engine configuration.

use serde::Deserialize;

use crate::error::ConfigError;

/// Engine configuration (runtime, fully resolved).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
	/// Maximum number of grouping hops followed during closure expansion.
	/// `None` follows edges until the closure is complete.
	pub max_hierarchy_depth: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct EngineConfigLayer {
	#[serde(default)]
	pub max_hierarchy_depth: Option<usize>,
}

impl EngineConfigLayer {
	pub fn merge(&mut self, other: EngineConfigLayer) {
		if other.max_hierarchy_depth.is_some() {
			self.max_hierarchy_depth = other.max_hierarchy_depth;
		}
	}

	pub fn finalize(self) -> Result<EngineConfig, ConfigError> {
		if self.max_hierarchy_depth == Some(0) {
			return Err(ConfigError::validation(
				"engine.max_hierarchy_depth must be at least 1; omit it for no limit",
			));
		}
		Ok(EngineConfig {
			max_hierarchy_depth: self.max_hierarchy_depth,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_is_unbounded() {
		let config = EngineConfigLayer::default().finalize().unwrap();
		assert_eq!(config.max_hierarchy_depth, None);
	}

	#[test]
	fn test_zero_depth_rejected() {
		let layer = EngineConfigLayer {
			max_hierarchy_depth: Some(0),
		};
		assert!(matches!(layer.finalize(), Err(ConfigError::Validation(_))));
	}

	#[test]
	fn test_merge() {
		let mut layer = EngineConfigLayer {
			max_hierarchy_depth: Some(10),
		};
		layer.merge(EngineConfigLayer::default());
		assert_eq!(layer.max_hierarchy_depth, Some(10));
		layer.merge(EngineConfigLayer {
			max_hierarchy_depth: Some(3),
		});
		assert_eq!(layer.finalize().unwrap().max_hierarchy_depth, Some(3));
	}
}
