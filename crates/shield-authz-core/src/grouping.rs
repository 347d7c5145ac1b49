// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Grouping edges: role membership, resource containment, action categories.

use serde::{Deserialize, Serialize};

use crate::attrs::{AttributeSet, WILDCARD};
use crate::error::{AuthzError, Result};
use crate::policy::{Dimension, Options};

/// A directed `member -> group` edge within one dimension.
///
/// The member is a one-key reference such as `{userId: "u1"}`. The group may
/// carry several attributes, e.g. `{entity: "gojek", team: "transport"}`.
/// Identity is `(kind, member, group)`; options are metadata only.
///
/// A member whose value is a string containing `*` is a glob: the edge
/// applies to every entity whose value under the same key matches it, so
/// `{action: "beast.*"}` covers `{action: "beast.write"}` and
/// `{action: "*"}` covers every action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupingEdge {
	pub kind: Dimension,
	pub member: AttributeSet,
	pub group: AttributeSet,
	#[serde(default)]
	pub options: Options,
}

impl GroupingEdge {
	pub fn new(
		kind: Dimension,
		member: AttributeSet,
		group: AttributeSet,
		options: Options,
	) -> Result<Self> {
		validate_member(&member)?;
		validate_group(&group)?;
		Ok(Self {
			kind,
			member,
			group,
			options,
		})
	}

	/// Returns true if this edge links the same member and group.
	pub fn connects(&self, member: &AttributeSet, group: &AttributeSet) -> bool {
		&self.member == member && &self.group == group
	}

	/// `(key, glob)` when the member is a wildcard reference.
	pub fn member_pattern(&self) -> Option<(&str, &str)> {
		let (key, value) = self.member.iter().next()?;
		let text = value.as_str()?;
		text.contains(WILDCARD).then_some((key.as_str(), text))
	}
}

/// Matches `text` against `pattern`, where `*` stands for any run of
/// characters (including none). Every other character matches itself.
pub fn glob_match(pattern: &str, text: &str) -> bool {
	let (pattern, text) = (pattern.as_bytes(), text.as_bytes());
	let (mut p, mut t) = (0, 0);
	// position after the last `*` and the text offset it currently absorbs up to
	let mut backtrack: Option<(usize, usize)> = None;

	while t < text.len() {
		match pattern.get(p) {
			Some(b'*') => {
				p += 1;
				backtrack = Some((p, t));
			}
			Some(c) if *c == text[t] => {
				p += 1;
				t += 1;
			}
			_ => match backtrack {
				Some((after_star, absorbed)) => {
					p = after_star;
					t = absorbed + 1;
					backtrack = Some((after_star, absorbed + 1));
				}
				None => return false,
			},
		}
	}
	pattern[p..].iter().all(|c| *c == b'*')
}

/// Grouping members must be exactly one attribute.
pub fn validate_member(member: &AttributeSet) -> Result<()> {
	member.validate()?;
	if !member.is_one_key() {
		return Err(AuthzError::invalid_pattern(format!(
			"grouping member must have exactly one attribute, got {member}"
		)));
	}
	Ok(())
}

fn validate_group(group: &AttributeSet) -> Result<()> {
	group.validate()?;
	if group.is_empty() {
		return Err(AuthzError::invalid_pattern("grouping target must not be empty"));
	}
	Ok(())
}
