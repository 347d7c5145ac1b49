// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Policies, effects and the three request dimensions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::attrs::AttributeSet;
use crate::error::{AuthzError, Result};

/// Free-form policy or edge metadata (priority, source, created_by).
///
/// Preserved for audit and never consulted during matching.
pub type Options = serde_json::Map<String, serde_json::Value>;

/// Identifier assigned to a policy when it is inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyId(pub Uuid);

impl PolicyId {
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}
}

impl Default for PolicyId {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Display for PolicyId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for PolicyId {
	type Err = AuthzError;

	fn from_str(s: &str) -> Result<Self> {
		Uuid::parse_str(s)
			.map(Self)
			.map_err(|e| AuthzError::Serialization(format!("invalid policy id '{s}': {e}")))
	}
}

/// One of the three request dimensions. Also the kind of a grouping edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
	Subject,
	Resource,
	Action,
}

impl Dimension {
	pub const ALL: [Dimension; 3] = [Dimension::Subject, Dimension::Resource, Dimension::Action];

	pub fn as_str(&self) -> &'static str {
		match self {
			Dimension::Subject => "subject",
			Dimension::Resource => "resource",
			Dimension::Action => "action",
		}
	}

	/// Attribute name used when a flat string identifier is turned into an
	/// attribute set for this dimension.
	pub fn identity_key(&self) -> &'static str {
		self.as_str()
	}

	/// Position of this dimension in [`Dimension::ALL`].
	pub fn index(&self) -> usize {
		match self {
			Dimension::Subject => 0,
			Dimension::Resource => 1,
			Dimension::Action => 2,
		}
	}
}

impl fmt::Display for Dimension {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Dimension {
	type Err = AuthzError;

	fn from_str(s: &str) -> Result<Self> {
		match s {
			"subject" => Ok(Dimension::Subject),
			"resource" => Ok(Dimension::Resource),
			"action" => Ok(Dimension::Action),
			_ => Err(AuthzError::invalid_pattern(format!("unknown dimension: {s}"))),
		}
	}
}

/// Outcome a policy contributes when it matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
	#[default]
	Allow,
	Deny,
}

impl Effect {
	pub fn as_str(&self) -> &'static str {
		match self {
			Effect::Allow => "allow",
			Effect::Deny => "deny",
		}
	}
}

impl fmt::Display for Effect {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Effect {
	type Err = AuthzError;

	fn from_str(s: &str) -> Result<Self> {
		match s.to_ascii_lowercase().as_str() {
			"allow" => Ok(Effect::Allow),
			"deny" => Ok(Effect::Deny),
			_ => Err(AuthzError::invalid_pattern(format!("unknown effect: {s}"))),
		}
	}
}

/// A stored rule mapping subject/resource/action patterns to an effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
	pub id: PolicyId,
	pub subject: AttributeSet,
	pub resource: AttributeSet,
	pub action: AttributeSet,
	pub effect: Effect,
	#[serde(default)]
	pub options: Options,
}

impl Policy {
	/// Creates a policy with a freshly assigned identifier.
	pub fn new(
		subject: AttributeSet,
		resource: AttributeSet,
		action: AttributeSet,
		effect: Effect,
		options: Options,
	) -> Self {
		Self {
			id: PolicyId::new(),
			subject,
			resource,
			action,
			effect,
			options,
		}
	}

	pub fn pattern(&self, dimension: Dimension) -> &AttributeSet {
		match dimension {
			Dimension::Subject => &self.subject,
			Dimension::Resource => &self.resource,
			Dimension::Action => &self.action,
		}
	}

	/// Returns true when every field except the identifier is identical.
	pub fn same_rule(
		&self,
		subject: &AttributeSet,
		resource: &AttributeSet,
		action: &AttributeSet,
		effect: Effect,
		options: &Options,
	) -> bool {
		self.effect == effect
			&& &self.subject == subject
			&& &self.resource == resource
			&& &self.action == action
			&& &self.options == options
	}

	pub fn validate(&self) -> Result<()> {
		for dimension in Dimension::ALL {
			self
				.pattern(dimension)
				.validate()
				.map_err(|e| AuthzError::invalid_pattern(format!("{dimension} pattern: {e}")))?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_effect_parse() {
		assert_eq!("allow".parse::<Effect>().unwrap(), Effect::Allow);
		assert_eq!("DENY".parse::<Effect>().unwrap(), Effect::Deny);
		assert!("maybe".parse::<Effect>().is_err());
		assert_eq!(Effect::default(), Effect::Allow);
	}

	#[test]
	fn test_dimension_roundtrip_strings() {
		for dimension in Dimension::ALL {
			assert_eq!(dimension.as_str().parse::<Dimension>().unwrap(), dimension);
		}
		assert!("object".parse::<Dimension>().is_err());
	}

	#[test]
	fn test_policy_ids_are_unique() {
		assert_ne!(PolicyId::new(), PolicyId::new());
	}

	#[test]
	fn test_policy_id_parse() {
		let id = PolicyId::new();
		assert_eq!(id.to_string().parse::<PolicyId>().unwrap(), id);
		assert!("not-a-uuid".parse::<PolicyId>().is_err());
	}

	#[test]
	fn test_same_rule_includes_options() {
		let mut options = Options::new();
		options.insert("source".into(), json!("migration"));
		let policy = Policy::new(
			AttributeSet::single("role", "admin"),
			AttributeSet::wildcard(),
			AttributeSet::wildcard(),
			Effect::Allow,
			options.clone(),
		);

		assert!(policy.same_rule(
			&AttributeSet::single("role", "admin"),
			&AttributeSet::wildcard(),
			&AttributeSet::wildcard(),
			Effect::Allow,
			&options,
		));
		assert!(!policy.same_rule(
			&AttributeSet::single("role", "admin"),
			&AttributeSet::wildcard(),
			&AttributeSet::wildcard(),
			Effect::Allow,
			&Options::new(),
		));
		assert!(!policy.same_rule(
			&AttributeSet::single("role", "admin"),
			&AttributeSet::wildcard(),
			&AttributeSet::wildcard(),
			Effect::Deny,
			&options,
		));
	}

	#[test]
	fn test_policy_serializes_as_plain_json() {
		let policy = Policy::new(
			AttributeSet::single("role", "admin"),
			AttributeSet::single("type", "project"),
			AttributeSet::wildcard(),
			Effect::Deny,
			Options::new(),
		);
		let value = serde_json::to_value(&policy).unwrap();
		assert_eq!(value["subject"], json!({"role": "admin"}));
		assert_eq!(value["action"], json!({}));
		assert_eq!(value["effect"], json!("deny"));

		let decoded: Policy = serde_json::from_value(value).unwrap();
		assert_eq!(decoded, policy);
	}

	#[test]
	fn test_validate_reports_dimension() {
		let policy = Policy::new(
			AttributeSet::wildcard(),
			AttributeSet::single("", "x"),
			AttributeSet::wildcard(),
			Effect::Allow,
			Options::new(),
		);
		let err = policy.validate().unwrap_err();
		assert!(err.to_string().contains("resource pattern"));
	}
}
