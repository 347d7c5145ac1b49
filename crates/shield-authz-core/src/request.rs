// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Enforcement requests and decisions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::attrs::AttributeSet;
use crate::error::{AuthzError, Result};
use crate::policy::{Dimension, Policy, PolicyId};

/// A single `(subject, resource, action)` question. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnforcementRequest {
	pub subject: AttributeSet,
	pub resource: AttributeSet,
	pub action: AttributeSet,
}

impl EnforcementRequest {
	pub fn new(subject: AttributeSet, resource: AttributeSet, action: AttributeSet) -> Self {
		Self {
			subject,
			resource,
			action,
		}
	}

	/// Parses `{"subject": {..}, "resource": {..}, "action": {..}}`.
	pub fn from_json(value: &Value) -> Result<Self> {
		let field = |dimension: Dimension| -> Result<AttributeSet> {
			let raw = value.get(dimension.as_str()).ok_or_else(|| {
				AuthzError::invalid_pattern(format!("request is missing `{dimension}`"))
			})?;
			AttributeSet::from_json(raw)
				.map_err(|e| AuthzError::invalid_pattern(format!("request {dimension}: {e}")))
		};

		if !value.is_object() {
			return Err(AuthzError::invalid_pattern("request must be a JSON object"));
		}

		Ok(Self {
			subject: field(Dimension::Subject)?,
			resource: field(Dimension::Resource)?,
			action: field(Dimension::Action)?,
		})
	}

	pub fn entity(&self, dimension: Dimension) -> &AttributeSet {
		match dimension {
			Dimension::Subject => &self.subject,
			Dimension::Resource => &self.resource,
			Dimension::Action => &self.action,
		}
	}
}

/// Result of evaluating one request.
///
/// `Deny` carries one of the matching deny policies; ties are not ordered.
/// `Allow` carries the first matching allow policy in store order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
	/// No policy matched: default deny.
	NoMatch,
	Allow { policy: Policy },
	Deny { policy: Policy },
}

impl Decision {
	pub fn is_allowed(&self) -> bool {
		matches!(self, Decision::Allow { .. })
	}

	pub fn policy(&self) -> Option<&Policy> {
		match self {
			Decision::NoMatch => None,
			Decision::Allow { policy } | Decision::Deny { policy } => Some(policy),
		}
	}

	pub fn policy_id(&self) -> Option<PolicyId> {
		self.policy().map(|p| p.id)
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			Decision::NoMatch => "no_match",
			Decision::Allow { .. } => "allow",
			Decision::Deny { .. } => "deny",
		}
	}
}
