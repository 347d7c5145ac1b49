// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Public enforcement and mutation surface.

use std::sync::Arc;

use serde_json::Value;
use tracing::instrument;

use shield_authz_core::{
	AttributeSet, Decision, Dimension, Effect, EnforcementRequest, GroupingEdge, Options, PolicyId,
	Result,
};

use crate::batch;
use crate::matcher;
use crate::resolver::GroupingResolver;
use crate::store::PolicyStore;
use crate::strings::{parse_entity, parse_triple};

/// Answers allow/deny questions and edits the policies behind them.
///
/// Cloning is cheap and clones share the same store.
#[derive(Debug, Clone, Default)]
pub struct Enforcer {
	store: Arc<PolicyStore>,
	resolver: GroupingResolver,
}

impl Enforcer {
	/// An enforcer over a fresh, empty store.
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_store(store: Arc<PolicyStore>) -> Self {
		Self {
			store,
			resolver: GroupingResolver::new(),
		}
	}

	pub fn with_resolver(mut self, resolver: GroupingResolver) -> Self {
		self.resolver = resolver;
		self
	}

	pub fn store(&self) -> &Arc<PolicyStore> {
		&self.store
	}

	pub fn resolver(&self) -> &GroupingResolver {
		&self.resolver
	}

	// Enforcement

	pub fn enforce(&self, subject: &AttributeSet, resource: &AttributeSet, action: &AttributeSet) -> bool {
		self
			.decide(&EnforcementRequest::new(
				subject.clone(),
				resource.clone(),
				action.clone(),
			))
			.is_allowed()
	}

	/// Full decision including the deciding policy.
	pub fn decide(&self, request: &EnforcementRequest) -> Decision {
		matcher::evaluate(&self.store.snapshot(), &self.resolver, request)
	}

	/// Evaluates `{"subject": .., "resource": .., "action": ..}`.
	pub fn enforce_json(&self, request: &Value) -> Result<bool> {
		let request = EnforcementRequest::from_json(request)?;
		Ok(self.decide(&request).is_allowed())
	}

	/// Evaluates flat strings, see [`crate::strings`].
	pub fn enforce_str(&self, subject: &str, resource: &str, action: &str) -> Result<bool> {
		let (subject, resource, action) = parse_triple(subject, resource, action)?;
		Ok(self.enforce(&subject, &resource, &action))
	}

	pub fn batch_enforce(&self, requests: &[EnforcementRequest]) -> Vec<Decision> {
		batch::batch_enforce(&self.store.snapshot(), &self.resolver, requests)
	}

	pub fn batch_enforce_json(&self, entries: &[Value]) -> Vec<Result<bool>> {
		batch::batch_enforce_json(&self.store.snapshot(), &self.resolver, entries)
	}

	/// Everything `entity` belongs to through edges of `kind`, itself first.
	pub fn closure(&self, kind: Dimension, entity: &AttributeSet) -> Vec<AttributeSet> {
		self.resolver.closure(&self.store.snapshot(), kind, entity)
	}

	// Policies

	pub fn add_policy(
		&self,
		subject: AttributeSet,
		resource: AttributeSet,
		action: AttributeSet,
		effect: Effect,
		options: Options,
	) -> Result<PolicyId> {
		self.store.add_policy(subject, resource, action, effect, options)
	}

	#[instrument(level = "debug", skip(self, options))]
	pub fn add_str_policy(
		&self,
		subject: &str,
		resource: &str,
		action: &str,
		effect: Effect,
		options: Options,
	) -> Result<PolicyId> {
		let (subject, resource, action) = parse_triple(subject, resource, action)?;
		self.add_policy(subject, resource, action, effect, options)
	}

	pub fn remove_policy(
		&self,
		subject: &AttributeSet,
		resource: &AttributeSet,
		action: &AttributeSet,
		effect: Effect,
		options: &Options,
	) -> Result<PolicyId> {
		self.store.remove_policy(subject, resource, action, effect, options)
	}

	#[instrument(level = "debug", skip(self, options))]
	pub fn remove_str_policy(
		&self,
		subject: &str,
		resource: &str,
		action: &str,
		effect: Effect,
		options: &Options,
	) -> Result<PolicyId> {
		let (subject, resource, action) = parse_triple(subject, resource, action)?;
		self.remove_policy(&subject, &resource, &action, effect, options)
	}

	// Groupings

	pub fn add_subject_grouping(
		&self,
		member: AttributeSet,
		group: AttributeSet,
		options: Options,
	) -> Result<bool> {
		self.add_grouping(Dimension::Subject, member, group, options)
	}

	pub fn remove_subject_grouping(&self, member: &AttributeSet, group: &AttributeSet) -> Result<()> {
		self.remove_grouping(Dimension::Subject, member, group)
	}

	pub fn add_resource_grouping(
		&self,
		member: AttributeSet,
		group: AttributeSet,
		options: Options,
	) -> Result<bool> {
		self.add_grouping(Dimension::Resource, member, group, options)
	}

	pub fn remove_resource_grouping(&self, member: &AttributeSet, group: &AttributeSet) -> Result<()> {
		self.remove_grouping(Dimension::Resource, member, group)
	}

	/// Moves `member` to `group`, dropping every other resource grouping it had.
	pub fn upsert_resource_grouping(
		&self,
		member: AttributeSet,
		group: AttributeSet,
		options: Options,
	) -> Result<()> {
		self.store.upsert_resource_grouping_edge(member, group, options)?;
		Ok(())
	}

	pub fn remove_all_resource_groupings(&self, member: &AttributeSet) -> Result<usize> {
		self.store.remove_all_resource_grouping_edges(member)
	}

	pub fn add_action_grouping(
		&self,
		member: AttributeSet,
		group: AttributeSet,
		options: Options,
	) -> Result<bool> {
		self.add_grouping(Dimension::Action, member, group, options)
	}

	pub fn remove_action_grouping(&self, member: &AttributeSet, group: &AttributeSet) -> Result<()> {
		self.remove_grouping(Dimension::Action, member, group)
	}

	/// Adds an edge of any kind. Returns `false` when it already existed.
	pub fn add_grouping(
		&self,
		kind: Dimension,
		member: AttributeSet,
		group: AttributeSet,
		options: Options,
	) -> Result<bool> {
		self
			.store
			.add_grouping_edge(GroupingEdge::new(kind, member, group, options)?)
	}

	pub fn remove_grouping(
		&self,
		kind: Dimension,
		member: &AttributeSet,
		group: &AttributeSet,
	) -> Result<()> {
		self.store.remove_grouping_edge(kind, member, group)?;
		Ok(())
	}

	/// String form of [`Enforcer::add_grouping`]; see [`crate::strings`].
	pub fn add_str_grouping(&self, kind: Dimension, member: &str, group: &str) -> Result<bool> {
		self.add_grouping(
			kind,
			parse_entity(kind, member)?,
			parse_entity(kind, group)?,
			Options::new(),
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;
	use shield_authz_core::AuthzError;

	fn set(value: Value) -> AttributeSet {
		AttributeSet::from_json(&value).unwrap()
	}

	#[test]
	fn test_string_policy_round_trip() {
		let enforcer = Enforcer::new();
		enforcer
			.add_str_policy("alice", "/docs", "read", Effect::Allow, Options::new())
			.unwrap();
		assert!(enforcer.enforce_str("alice", "/docs", "read").unwrap());
		assert!(!enforcer.enforce_str("bob", "/docs", "read").unwrap());

		enforcer
			.remove_str_policy("alice", "/docs", "read", Effect::Allow, &Options::new())
			.unwrap();
		assert!(!enforcer.enforce_str("alice", "/docs", "read").unwrap());
	}

	#[test]
	fn test_string_and_json_forms_are_equivalent() {
		let enforcer = Enforcer::new();
		enforcer
			.add_str_policy(r#"{"role":"admin"}"#, "*", "*", Effect::Allow, Options::new())
			.unwrap();
		enforcer
			.add_subject_grouping(set(json!({"userId": "u1"})), set(json!({"role": "admin"})), Options::new())
			.unwrap();

		assert!(enforcer
			.enforce_json(&json!({
				"subject": {"userId": "u1"},
				"resource": {"type": "project"},
				"action": {"name": "read"}
			}))
			.unwrap());
		assert!(enforcer
			.enforce_str(r#"{"userId":"u1"}"#, "anything", "")
			.unwrap());
	}

	#[test]
	fn test_enforce_json_rejects_malformed() {
		let enforcer = Enforcer::new();
		let err = enforcer.enforce_json(&json!({"subject": {}})).unwrap_err();
		assert!(matches!(err, AuthzError::InvalidPattern(_)));
	}

	#[test]
	fn test_clones_share_store() {
		let enforcer = Enforcer::new();
		let clone = enforcer.clone();
		clone
			.add_policy(
				AttributeSet::wildcard(),
				AttributeSet::wildcard(),
				AttributeSet::wildcard(),
				Effect::Allow,
				Options::new(),
			)
			.unwrap();
		assert!(enforcer.enforce(&AttributeSet::new(), &AttributeSet::new(), &AttributeSet::new()));
	}

	#[test]
	fn test_action_grouping() {
		let enforcer = Enforcer::new();
		enforcer
			.add_policy(
				AttributeSet::wildcard(),
				AttributeSet::wildcard(),
				set(json!({"category": "read"})),
				Effect::Allow,
				Options::new(),
			)
			.unwrap();
		assert!(enforcer
			.add_action_grouping(set(json!({"name": "list"})), set(json!({"category": "read"})), Options::new())
			.unwrap());
		assert!(enforcer.enforce(
			&set(json!({"userId": "u1"})),
			&set(json!({"id": "x"})),
			&set(json!({"name": "list"}))
		));

		enforcer
			.remove_action_grouping(&set(json!({"name": "list"})), &set(json!({"category": "read"})))
			.unwrap();
		assert!(!enforcer.enforce(
			&set(json!({"userId": "u1"})),
			&set(json!({"id": "x"})),
			&set(json!({"name": "list"}))
		));
	}

	#[test]
	fn test_add_str_grouping() {
		let enforcer = Enforcer::new();
		assert!(enforcer.add_str_grouping(Dimension::Subject, "alice", "admins").unwrap());
		assert_eq!(
			enforcer.closure(Dimension::Subject, &AttributeSet::single("subject", "alice")),
			vec![
				AttributeSet::single("subject", "alice"),
				AttributeSet::single("subject", "admins")
			]
		);
		assert!(enforcer.add_str_grouping(Dimension::Subject, "*", "admins").is_err());
	}

	#[test]
	fn test_max_depth_applies_to_enforcement() {
		let enforcer = Enforcer::new().with_resolver(GroupingResolver::with_max_depth(Some(1)));
		enforcer
			.add_policy(
				set(json!({"role": "admin"})),
				AttributeSet::wildcard(),
				AttributeSet::wildcard(),
				Effect::Allow,
				Options::new(),
			)
			.unwrap();
		enforcer
			.add_subject_grouping(set(json!({"userId": "u1"})), set(json!({"group": "ops"})), Options::new())
			.unwrap();
		enforcer
			.add_subject_grouping(set(json!({"group": "ops"})), set(json!({"role": "admin"})), Options::new())
			.unwrap();

		let subject = set(json!({"group": "ops"}));
		assert!(enforcer.enforce(&subject, &AttributeSet::new(), &AttributeSet::new()));
		let subject = set(json!({"userId": "u1"}));
		assert!(!enforcer.enforce(&subject, &AttributeSet::new(), &AttributeSet::new()));
	}
}
