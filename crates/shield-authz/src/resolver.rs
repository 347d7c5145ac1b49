// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Transitive expansion of grouping edges.

use std::collections::{HashSet, VecDeque};

use tracing::{instrument, trace};

use shield_authz_core::{AttributeSet, Dimension};

use crate::store::PolicySnapshot;

/// Expands an entity into the set of everything it belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupingResolver {
	max_depth: Option<usize>,
}

impl GroupingResolver {
	/// A resolver that follows edges without a hop limit.
	pub fn new() -> Self {
		Self::default()
	}

	/// Stops expanding nodes more than `max_depth` hops from the entity.
	/// `None` means unbounded.
	pub fn with_max_depth(max_depth: Option<usize>) -> Self {
		Self { max_depth }
	}

	pub fn max_depth(&self) -> Option<usize> {
		self.max_depth
	}

	/// Breadth-first closure of `entity` over edges of `kind`.
	///
	/// The entity itself is always the first element. Each node is looked up
	/// through its one-key projections, so `{userId: "u1", email: ".."}`
	/// inherits the edges declared for `{userId: "u1"}`. Edges with a glob
	/// member such as `{action: "beast.*"}` apply to every matching anchor.
	/// Nodes are deduplicated by canonical form, which also terminates cycles.
	#[instrument(level = "trace", skip_all, fields(kind = %kind, entity = %entity))]
	pub fn closure(
		&self,
		snapshot: &PolicySnapshot,
		kind: Dimension,
		entity: &AttributeSet,
	) -> Vec<AttributeSet> {
		let mut visited = HashSet::from([entity.canonical()]);
		let mut closure = vec![entity.clone()];
		let mut queue = VecDeque::from([(0usize, 0usize)]);

		while let Some((position, depth)) = queue.pop_front() {
			if self.max_depth.is_some_and(|max| depth >= max) {
				continue;
			}
			let anchors: Vec<AttributeSet> = closure[position].projections().collect();
			for anchor in &anchors {
				for edge in snapshot.edges_matching(kind, anchor) {
					if visited.insert(edge.group.canonical()) {
						closure.push(edge.group.clone());
						queue.push_back((closure.len() - 1, depth + 1));
					}
				}
			}
		}

		trace!(size = closure.len(), "closure resolved");
		closure
	}
}
