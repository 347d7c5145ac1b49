// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Enforcer kept in sync with durable storage.
//!
//! Reads are served from memory. Each mutation is validated, written to the
//! adapter, and only then applied to the in-memory store, all under one async
//! mutex so storage order and memory order agree. A storage failure leaves
//! memory untouched.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use shield_authz_core::grouping::validate_member;
use shield_authz_core::{
	AttributeSet, AuthzError, Decision, Dimension, Effect, EnforcementRequest, GroupingEdge, Options,
	Policy, PolicyId, Result,
};

use crate::adapter::PolicyAdapter;
use crate::enforcer::Enforcer;
use crate::resolver::GroupingResolver;
use crate::store::{PolicySnapshot, PolicyStore};

pub struct PersistentEnforcer {
	enforcer: Enforcer,
	adapter: Arc<dyn PolicyAdapter>,
	write_lock: Mutex<()>,
}

impl PersistentEnforcer {
	/// Loads every stored policy and edge into a fresh in-memory store.
	#[instrument(skip(adapter))]
	pub async fn open(adapter: Arc<dyn PolicyAdapter>, resolver: GroupingResolver) -> Result<Self> {
		let loaded = adapter.load().await?;
		let snapshot = PolicySnapshot::restore(loaded.policies, loaded.edges)?;
		info!(
			policies = snapshot.policy_count(),
			subject_edges = snapshot.edge_count(Dimension::Subject),
			resource_edges = snapshot.edge_count(Dimension::Resource),
			action_edges = snapshot.edge_count(Dimension::Action),
			"policy store loaded"
		);
		let store = Arc::new(PolicyStore::from_snapshot(snapshot));
		Ok(Self {
			enforcer: Enforcer::with_store(store).with_resolver(resolver),
			adapter,
			write_lock: Mutex::new(()),
		})
	}

	/// Discards the in-memory state and loads it again from storage.
	#[instrument(skip(self))]
	pub async fn reload(&self) -> Result<()> {
		let _guard = self.write_lock.lock().await;
		let loaded = self.adapter.load().await?;
		let snapshot = PolicySnapshot::restore(loaded.policies, loaded.edges)?;
		self.store().replace(snapshot);
		info!("policy store reloaded");
		Ok(())
	}

	fn store(&self) -> &Arc<PolicyStore> {
		self.enforcer.store()
	}

	// Reads

	/// Current in-memory state. Mutations go through the async writers below.
	pub fn snapshot(&self) -> Arc<PolicySnapshot> {
		self.store().snapshot()
	}

	pub fn closure(&self, kind: Dimension, entity: &AttributeSet) -> Vec<AttributeSet> {
		self.enforcer.closure(kind, entity)
	}

	pub fn policies(&self) -> Vec<Policy> {
		self.store().policies()
	}

	pub fn policy(&self, id: PolicyId) -> Option<Policy> {
		self.store().policy(id)
	}

	pub fn grouping_edges(&self, kind: Dimension) -> Vec<GroupingEdge> {
		self.store().grouping_edges(kind)
	}

	pub fn groups_of(&self, kind: Dimension, member: &AttributeSet) -> Vec<AttributeSet> {
		self.store().groups_of(kind, member)
	}

	pub fn policy_count(&self) -> usize {
		self.store().policy_count()
	}

	pub fn edge_count(&self, kind: Dimension) -> usize {
		self.store().edge_count(kind)
	}

	pub fn enforce(&self, subject: &AttributeSet, resource: &AttributeSet, action: &AttributeSet) -> bool {
		self.enforcer.enforce(subject, resource, action)
	}

	pub fn decide(&self, request: &EnforcementRequest) -> Decision {
		self.enforcer.decide(request)
	}

	pub fn batch_enforce(&self, requests: &[EnforcementRequest]) -> Vec<Decision> {
		self.enforcer.batch_enforce(requests)
	}

	pub fn batch_enforce_json(&self, entries: &[Value]) -> Vec<Result<bool>> {
		self.enforcer.batch_enforce_json(entries)
	}

	// Writes

	pub async fn add_policy(
		&self,
		subject: AttributeSet,
		resource: AttributeSet,
		action: AttributeSet,
		effect: Effect,
		options: Options,
	) -> Result<PolicyId> {
		let policy = Policy::new(subject, resource, action, effect, options);
		policy.validate()?;

		let _guard = self.write_lock.lock().await;
		self.adapter.insert_policy(&policy).await.inspect_err(log_storage)?;
		self.store().insert_policy(policy)
	}

	pub async fn remove_policy(
		&self,
		subject: &AttributeSet,
		resource: &AttributeSet,
		action: &AttributeSet,
		effect: Effect,
		options: &Options,
	) -> Result<PolicyId> {
		let _guard = self.write_lock.lock().await;
		let id = self
			.store()
			.snapshot()
			.find_policy(subject, resource, action, effect, options)
			.map(|p| p.id)
			.ok_or_else(|| {
				AuthzError::not_found(format!(
					"no {effect} policy for ({subject}, {resource}, {action})"
				))
			})?;

		self.adapter.delete_policy(id).await.inspect_err(log_storage)?;
		self.store().remove_policy_by_id(id)?;
		Ok(id)
	}

	pub async fn add_grouping(
		&self,
		kind: Dimension,
		member: AttributeSet,
		group: AttributeSet,
		options: Options,
	) -> Result<bool> {
		let edge = GroupingEdge::new(kind, member, group, options)?;

		let _guard = self.write_lock.lock().await;
		if self
			.store()
			.snapshot()
			.has_grouping_edge(kind, &edge.member, &edge.group)
		{
			return Ok(false);
		}
		self.adapter.insert_edge(&edge).await.inspect_err(log_storage)?;
		self.store().add_grouping_edge(edge)
	}

	pub async fn remove_grouping(
		&self,
		kind: Dimension,
		member: &AttributeSet,
		group: &AttributeSet,
	) -> Result<()> {
		let _guard = self.write_lock.lock().await;
		if !self.store().snapshot().has_grouping_edge(kind, member, group) {
			return Err(AuthzError::not_found(format!(
				"{kind} grouping {member} -> {group}"
			)));
		}
		self
			.adapter
			.delete_edge(kind, member, group)
			.await
			.inspect_err(log_storage)?;
		self.store().remove_grouping_edge(kind, member, group)?;
		Ok(())
	}

	pub async fn upsert_resource_grouping(
		&self,
		member: AttributeSet,
		group: AttributeSet,
		options: Options,
	) -> Result<()> {
		let edge = GroupingEdge::new(Dimension::Resource, member, group, options)?;

		let _guard = self.write_lock.lock().await;
		self
			.adapter
			.replace_member_edges(&edge)
			.await
			.inspect_err(log_storage)?;
		self
			.store()
			.upsert_resource_grouping_edge(edge.member, edge.group, edge.options)?;
		Ok(())
	}

	pub async fn remove_all_resource_groupings(&self, member: &AttributeSet) -> Result<usize> {
		validate_member(member)?;

		let _guard = self.write_lock.lock().await;
		self
			.adapter
			.delete_member_edges(Dimension::Resource, member)
			.await
			.inspect_err(log_storage)?;
		self.store().remove_all_resource_grouping_edges(member)
	}
}

fn log_storage(err: &AuthzError) {
	warn!(error = %err, "storage write failed, in-memory state unchanged");
}
