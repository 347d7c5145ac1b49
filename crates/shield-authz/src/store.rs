// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory policy store.
//!
//! All state lives in an immutable [`PolicySnapshot`] behind an
//! `RwLock<Arc<_>>`. Readers clone the `Arc` and evaluate without holding the
//! lock. Writers take the write lock, copy the snapshot if a reader still holds
//! it, and publish the result in one step, so a reader never observes a
//! half-applied mutation.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, instrument};

use shield_authz_core::grouping::{glob_match, validate_member};
use shield_authz_core::{
	AttributeSet, AuthzError, Dimension, Effect, GroupingEdge, Options, Policy, PolicyId, Result,
};

use crate::index::{PatternIndex, Seq};

/// Edges of one kind, keyed by the canonical form of their member.
///
/// Members holding a `*` glob are additionally listed under their attribute
/// key so a lookup only tests the globs that could apply.
#[derive(Debug, Clone, Default)]
struct GroupingTable {
	by_member: BTreeMap<String, Vec<GroupingEdge>>,
	/// attribute key -> (glob, member canonical), in insertion order
	patterns: HashMap<String, Vec<(String, String)>>,
	len: usize,
}

impl GroupingTable {
	fn edges_of(&self, member: &AttributeSet) -> &[GroupingEdge] {
		self.edges_by_canonical(&member.canonical())
	}

	fn edges_by_canonical(&self, canonical: &str) -> &[GroupingEdge] {
		self
			.by_member
			.get(canonical)
			.map(Vec::as_slice)
			.unwrap_or(&[])
	}

	/// Edges whose glob member matches the one-key `anchor`, excluding the
	/// anchor's own exact edges.
	fn pattern_edges_of<'a>(
		&'a self,
		anchor: &AttributeSet,
	) -> impl Iterator<Item = &'a GroupingEdge> + 'a {
		let canonical = anchor.canonical();
		let candidates = anchor
			.iter()
			.next()
			.and_then(|(key, value)| Some((self.patterns.get(key)?, value.as_str()?.to_string())));

		candidates
			.into_iter()
			.flat_map(move |(patterns, text)| {
				let canonical = canonical.clone();
				patterns
					.iter()
					.filter(move |(glob, member)| *member != canonical && glob_match(glob, &text))
					.flat_map(move |(_, member)| self.edges_by_canonical(member))
			})
	}

	fn contains(&self, member: &AttributeSet, group: &AttributeSet) -> bool {
		self.edges_of(member).iter().any(|e| e.connects(member, group))
	}

	fn insert(&mut self, edge: GroupingEdge) -> bool {
		if self.contains(&edge.member, &edge.group) {
			return false;
		}
		let canonical = edge.member.canonical();
		if !self.by_member.contains_key(&canonical) {
			if let Some((key, glob)) = edge.member_pattern() {
				self
					.patterns
					.entry(key.to_string())
					.or_default()
					.push((glob.to_string(), canonical.clone()));
			}
		}
		self.by_member.entry(canonical).or_default().push(edge);
		self.len += 1;
		true
	}

	fn remove(&mut self, member: &AttributeSet, group: &AttributeSet) -> Option<GroupingEdge> {
		let key = member.canonical();
		let edges = self.by_member.get_mut(&key)?;
		let position = edges.iter().position(|e| e.connects(member, group))?;
		let edge = edges.remove(position);
		if edges.is_empty() {
			self.by_member.remove(&key);
			self.forget_pattern(&edge, &key);
		}
		self.len -= 1;
		Some(edge)
	}

	fn remove_member(&mut self, member: &AttributeSet) -> usize {
		let key = member.canonical();
		let Some(edges) = self.by_member.remove(&key) else {
			return 0;
		};
		if let Some(edge) = edges.first() {
			self.forget_pattern(edge, &key);
		}
		self.len -= edges.len();
		edges.len()
	}

	fn forget_pattern(&mut self, edge: &GroupingEdge, canonical: &str) {
		let Some((key, _)) = edge.member_pattern() else {
			return;
		};
		if let Some(patterns) = self.patterns.get_mut(key) {
			patterns.retain(|(_, member)| member != canonical);
			if patterns.is_empty() {
				self.patterns.remove(key);
			}
		}
	}

	fn iter(&self) -> impl Iterator<Item = &GroupingEdge> {
		self.by_member.values().flatten()
	}
}

/// Consistent, immutable view of every policy and grouping edge.
#[derive(Debug, Clone, Default)]
pub struct PolicySnapshot {
	next_seq: Seq,
	policies: BTreeMap<Seq, Policy>,
	ids: HashMap<PolicyId, Seq>,
	indexes: [PatternIndex; 3],
	groupings: [GroupingTable; 3],
}

impl PolicySnapshot {
	/// Builds a snapshot from previously persisted rows, keeping their ids.
	///
	/// Policies keep the order they are given in. Duplicate edges collapse.
	pub fn restore(
		policies: impl IntoIterator<Item = Policy>,
		edges: impl IntoIterator<Item = GroupingEdge>,
	) -> Result<Self> {
		let mut snapshot = Self::default();
		for policy in policies {
			snapshot.insert_policy(policy)?;
		}
		for edge in edges {
			validate_member(&edge.member)?;
			snapshot.groupings[edge.kind.index()].insert(edge);
		}
		Ok(snapshot)
	}

	/// All policies in store order.
	pub fn policies(&self) -> impl Iterator<Item = &Policy> {
		self.policies.values()
	}

	pub fn policy(&self, id: PolicyId) -> Option<&Policy> {
		self.ids.get(&id).and_then(|seq| self.policies.get(seq))
	}

	pub fn policy_count(&self) -> usize {
		self.policies.len()
	}

	/// Oldest policy whose every field except the id equals the arguments.
	pub fn find_policy(
		&self,
		subject: &AttributeSet,
		resource: &AttributeSet,
		action: &AttributeSet,
		effect: Effect,
		options: &Options,
	) -> Option<&Policy> {
		let mut candidates = BTreeSet::new();
		self.indexes[Dimension::Subject.index()].collect_candidates(subject, &mut candidates);
		candidates
			.into_iter()
			.filter_map(|seq| self.policies.get(&seq))
			.find(|p| p.same_rule(subject, resource, action, effect, options))
	}

	/// All edges of one kind, grouped by member.
	pub fn grouping_edges(&self, kind: Dimension) -> impl Iterator<Item = &GroupingEdge> {
		self.groupings[kind.index()].iter()
	}

	/// Direct edges declared for `member`, in insertion order.
	pub fn groups_of(&self, kind: Dimension, member: &AttributeSet) -> &[GroupingEdge] {
		self.groupings[kind.index()].edges_of(member)
	}

	/// Edges that apply to the one-key `anchor`: those declared for it
	/// exactly, then those whose glob member matches it.
	pub fn edges_matching<'a>(
		&'a self,
		kind: Dimension,
		anchor: &AttributeSet,
	) -> impl Iterator<Item = &'a GroupingEdge> + 'a {
		let table = &self.groupings[kind.index()];
		table
			.edges_of(anchor)
			.iter()
			.chain(table.pattern_edges_of(anchor))
	}

	pub fn has_grouping_edge(
		&self,
		kind: Dimension,
		member: &AttributeSet,
		group: &AttributeSet,
	) -> bool {
		self.groupings[kind.index()].contains(member, group)
	}

	pub fn edge_count(&self, kind: Dimension) -> usize {
		self.groupings[kind.index()].len
	}

	/// Policies that may match the given closures, in store order.
	///
	/// Each dimension contributes the policies indexed under any closure
	/// element; only policies present in all three are returned. The caller
	/// still has to check the full patterns.
	pub(crate) fn candidates(&self, closures: [&[AttributeSet]; 3]) -> Vec<&Policy> {
		let mut sets: Vec<BTreeSet<Seq>> = Dimension::ALL
			.iter()
			.map(|d| self.indexes[d.index()].candidates(closures[d.index()]))
			.collect();
		sets.sort_by_key(BTreeSet::len);

		let (smallest, rest) = match sets.split_first() {
			Some(split) => split,
			None => return Vec::new(),
		};
		smallest
			.iter()
			.filter(|seq| rest.iter().all(|set| set.contains(*seq)))
			.filter_map(|seq| self.policies.get(seq))
			.collect()
	}

	fn insert_policy(&mut self, policy: Policy) -> Result<PolicyId> {
		policy.validate()?;
		if self.ids.contains_key(&policy.id) {
			return Err(AuthzError::invalid_pattern(format!(
				"policy {} already exists",
				policy.id
			)));
		}
		let seq = self.next_seq;
		self.next_seq += 1;
		for dimension in Dimension::ALL {
			self.indexes[dimension.index()].insert(seq, policy.pattern(dimension));
		}
		let id = policy.id;
		self.ids.insert(id, seq);
		self.policies.insert(seq, policy);
		Ok(id)
	}

	fn remove_policy_by_id(&mut self, id: PolicyId) -> Result<Policy> {
		let seq = self
			.ids
			.remove(&id)
			.ok_or_else(|| AuthzError::not_found(format!("policy {id}")))?;
		let policy = self
			.policies
			.remove(&seq)
			.ok_or_else(|| AuthzError::not_found(format!("policy {id}")))?;
		for dimension in Dimension::ALL {
			self.indexes[dimension.index()].remove(seq, policy.pattern(dimension));
		}
		Ok(policy)
	}
}

/// Thread-safe owner of the current [`PolicySnapshot`].
#[derive(Debug, Default)]
pub struct PolicyStore {
	state: RwLock<Arc<PolicySnapshot>>,
}

impl PolicyStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from_snapshot(snapshot: PolicySnapshot) -> Self {
		Self {
			state: RwLock::new(Arc::new(snapshot)),
		}
	}

	/// Current state. Later mutations do not affect the returned view.
	pub fn snapshot(&self) -> Arc<PolicySnapshot> {
		self.state.read().clone()
	}

	/// Replaces the whole state, e.g. after reloading from storage.
	pub fn replace(&self, snapshot: PolicySnapshot) {
		*self.state.write() = Arc::new(snapshot);
	}

	/// Applies `f` to a private copy of the state. Every mutation checks its
	/// preconditions before changing anything, so an error leaves the
	/// published state as it was.
	fn write<T>(&self, f: impl FnOnce(&mut PolicySnapshot) -> Result<T>) -> Result<T> {
		let mut guard = self.state.write();
		f(Arc::make_mut(&mut *guard))
	}

	#[instrument(level = "debug", skip_all, fields(effect = %effect))]
	pub fn add_policy(
		&self,
		subject: AttributeSet,
		resource: AttributeSet,
		action: AttributeSet,
		effect: Effect,
		options: Options,
	) -> Result<PolicyId> {
		self.insert_policy(Policy::new(subject, resource, action, effect, options))
	}

	/// Inserts a fully formed policy, keeping its id.
	#[instrument(level = "debug", skip_all, fields(policy_id = %policy.id))]
	pub fn insert_policy(&self, policy: Policy) -> Result<PolicyId> {
		let id = self.write(|state| state.insert_policy(policy))?;
		debug!(policy_id = %id, "policy added");
		Ok(id)
	}

	/// Removes the oldest policy identical to the arguments.
	#[instrument(level = "debug", skip_all, fields(effect = %effect))]
	pub fn remove_policy(
		&self,
		subject: &AttributeSet,
		resource: &AttributeSet,
		action: &AttributeSet,
		effect: Effect,
		options: &Options,
	) -> Result<PolicyId> {
		self.write(|state| {
			let id = state
				.find_policy(subject, resource, action, effect, options)
				.map(|p| p.id)
				.ok_or_else(|| {
					AuthzError::not_found(format!(
						"no {effect} policy for ({subject}, {resource}, {action})"
					))
				})?;
			state.remove_policy_by_id(id)?;
			debug!(policy_id = %id, "policy removed");
			Ok(id)
		})
	}

	#[instrument(level = "debug", skip(self))]
	pub fn remove_policy_by_id(&self, id: PolicyId) -> Result<Policy> {
		self.write(|state| state.remove_policy_by_id(id))
	}

	/// Adds an edge. Returns `false` if the same edge already exists.
	#[instrument(level = "debug", skip_all, fields(kind = %edge.kind, member = %edge.member, group = %edge.group))]
	pub fn add_grouping_edge(&self, edge: GroupingEdge) -> Result<bool> {
		validate_member(&edge.member)?;
		edge.group.validate()?;
		let kind = edge.kind;
		self.write(|state| Ok(state.groupings[kind.index()].insert(edge)))
	}

	#[instrument(level = "debug", skip_all, fields(kind = %kind, member = %member, group = %group))]
	pub fn remove_grouping_edge(
		&self,
		kind: Dimension,
		member: &AttributeSet,
		group: &AttributeSet,
	) -> Result<GroupingEdge> {
		self.write(|state| {
			state.groupings[kind.index()]
				.remove(member, group)
				.ok_or_else(|| AuthzError::not_found(format!("{kind} grouping {member} -> {group}")))
		})
	}

	/// Replaces every resource edge of `member` with a single edge to `group`.
	#[instrument(level = "debug", skip_all, fields(member = %member, group = %group))]
	pub fn upsert_resource_grouping_edge(
		&self,
		member: AttributeSet,
		group: AttributeSet,
		options: Options,
	) -> Result<usize> {
		let edge = GroupingEdge::new(Dimension::Resource, member, group, options)?;
		let replaced = self.write(|state| {
			let table = &mut state.groupings[Dimension::Resource.index()];
			let replaced = table.remove_member(&edge.member);
			table.insert(edge);
			Ok(replaced)
		})?;
		info!(replaced, "resource grouping upserted");
		Ok(replaced)
	}

	/// Removes every resource edge of `member`. Returns how many were removed.
	#[instrument(level = "debug", skip_all, fields(member = %member))]
	pub fn remove_all_resource_grouping_edges(&self, member: &AttributeSet) -> Result<usize> {
		self.remove_all_grouping_edges(Dimension::Resource, member)
	}

	#[instrument(level = "debug", skip_all, fields(kind = %kind, member = %member))]
	pub fn remove_all_grouping_edges(&self, kind: Dimension, member: &AttributeSet) -> Result<usize> {
		validate_member(member)?;
		let removed = self.write(|state| Ok(state.groupings[kind.index()].remove_member(member)))?;
		if removed > 0 {
			info!(removed, "grouping edges removed");
		}
		Ok(removed)
	}

	pub fn policies(&self) -> Vec<Policy> {
		self.snapshot().policies().cloned().collect()
	}

	pub fn policy(&self, id: PolicyId) -> Option<Policy> {
		self.snapshot().policy(id).cloned()
	}

	pub fn grouping_edges(&self, kind: Dimension) -> Vec<GroupingEdge> {
		self.snapshot().grouping_edges(kind).cloned().collect()
	}

	pub fn groups_of(&self, kind: Dimension, member: &AttributeSet) -> Vec<AttributeSet> {
		self
			.snapshot()
			.groups_of(kind, member)
			.iter()
			.map(|e| e.group.clone())
			.collect()
	}

	pub fn policy_count(&self) -> usize {
		self.state.read().policy_count()
	}

	pub fn edge_count(&self, kind: Dimension) -> usize {
		self.state.read().edge_count(kind)
	}
}
