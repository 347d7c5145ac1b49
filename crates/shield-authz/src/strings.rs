// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Conversion of flat string identifiers into attribute sets.
//!
//! | input              | result                         |
//! |--------------------|--------------------------------|
//! | `"*"` or `""`      | wildcard (empty set)           |
//! | `{"role":"admin"}` | parsed JSON object             |
//! | `alice`            | `{"<dimension>": "alice"}`     |

use shield_authz_core::{AttributeSet, Dimension, Result, WILDCARD};

/// Parses a flat string for `dimension`.
pub fn parse_entity(dimension: Dimension, text: &str) -> Result<AttributeSet> {
	let trimmed = text.trim();
	if trimmed.is_empty() || trimmed == WILDCARD {
		return Ok(AttributeSet::wildcard());
	}
	if trimmed.starts_with('{') {
		return AttributeSet::parse_json(trimmed);
	}
	Ok(AttributeSet::single(dimension.identity_key(), trimmed))
}

/// Parses the three request strings at once.
pub fn parse_triple(
	subject: &str,
	resource: &str,
	action: &str,
) -> Result<(AttributeSet, AttributeSet, AttributeSet)> {
	Ok((
		parse_entity(Dimension::Subject, subject)?,
		parse_entity(Dimension::Resource, resource)?,
		parse_entity(Dimension::Action, action)?,
	))
}
