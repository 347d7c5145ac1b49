// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Durable storage seam for policies and grouping edges.

use async_trait::async_trait;

use shield_authz_core::{AttributeSet, Dimension, GroupingEdge, Policy, PolicyId, Result};

/// Everything a storage backend holds, in store order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedPolicies {
	pub policies: Vec<Policy>,
	pub edges: Vec<GroupingEdge>,
}

/// Storage backend for a [`crate::PersistentEnforcer`].
///
/// Implementations map failures to `AuthzError::Storage` and never retry.
#[async_trait]
pub trait PolicyAdapter: Send + Sync {
	async fn load(&self) -> Result<LoadedPolicies>;

	// Policy operations
	async fn insert_policy(&self, policy: &Policy) -> Result<()>;
	async fn delete_policy(&self, id: PolicyId) -> Result<bool>;

	// Grouping operations
	/// Returns `false` if the edge was already stored.
	async fn insert_edge(&self, edge: &GroupingEdge) -> Result<bool>;
	async fn delete_edge(
		&self,
		kind: Dimension,
		member: &AttributeSet,
		group: &AttributeSet,
	) -> Result<bool>;
	/// Atomically replaces every edge of `edge.member` in `edge.kind` with
	/// `edge`. Returns how many edges were removed.
	async fn replace_member_edges(&self, edge: &GroupingEdge) -> Result<u64>;
	async fn delete_member_edges(&self, kind: Dimension, member: &AttributeSet) -> Result<u64>;
}
