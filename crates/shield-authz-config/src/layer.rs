// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Partial configuration produced by a single source.

use serde::Deserialize;

use crate::sections::{DatabaseConfigLayer, EngineConfigLayer, LoggingConfigLayer};

/// Every section is optional so that sources only override what they set.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AuthzConfigLayer {
	#[serde(default)]
	pub database: Option<DatabaseConfigLayer>,
	#[serde(default)]
	pub engine: Option<EngineConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
}

impl AuthzConfigLayer {
	/// Overlays `other` on top of `self`; values set in `other` win.
	pub fn merge(&mut self, other: AuthzConfigLayer) {
		if let Some(database) = other.database {
			self.database.get_or_insert_with(Default::default).merge(database);
		}
		if let Some(engine) = other.engine {
			self.engine.get_or_insert_with(Default::default).merge(engine);
		}
		if let Some(logging) = other.logging {
			self.logging.get_or_insert_with(Default::default).merge(logging);
		}
	}
}
