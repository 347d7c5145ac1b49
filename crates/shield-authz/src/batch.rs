// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Batch evaluation against a single snapshot.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, instrument};

use shield_authz_core::{AttributeSet, Decision, Dimension, EnforcementRequest, Result};

use crate::matcher;
use crate::resolver::GroupingResolver;
use crate::store::PolicySnapshot;

/// Evaluates requests in order against one snapshot.
///
/// Closures are memoized for the duration of the batch, so requests that
/// share a subject (the common case for a UI rendering many resources) only
/// expand it once. Decisions are independent of each other.
pub struct BatchEnforcer<'a> {
	snapshot: &'a PolicySnapshot,
	resolver: &'a GroupingResolver,
	closures: HashMap<(Dimension, String), Vec<AttributeSet>>,
}

impl<'a> BatchEnforcer<'a> {
	pub fn new(snapshot: &'a PolicySnapshot, resolver: &'a GroupingResolver) -> Self {
		Self {
			snapshot,
			resolver,
			closures: HashMap::new(),
		}
	}

	fn ensure_closure(&mut self, dimension: Dimension, entity: &AttributeSet) -> (Dimension, String) {
		let key = (dimension, entity.canonical());
		if !self.closures.contains_key(&key) {
			let closure = self.resolver.closure(self.snapshot, dimension, entity);
			self.closures.insert(key.clone(), closure);
		}
		key
	}

	pub fn decide(&mut self, request: &EnforcementRequest) -> Decision {
		let [subject, resource, action] =
			Dimension::ALL.map(|dimension| self.ensure_closure(dimension, request.entity(dimension)));
		matcher::decide(
			self.snapshot,
			[
				cached(&self.closures, &subject),
				cached(&self.closures, &resource),
				cached(&self.closures, &action),
			],
		)
	}

	/// Parses and evaluates one raw JSON entry.
	pub fn decide_json(&mut self, entry: &Value) -> Result<Decision> {
		let request = EnforcementRequest::from_json(entry)?;
		Ok(self.decide(&request))
	}
}

fn cached<'m>(
	closures: &'m HashMap<(Dimension, String), Vec<AttributeSet>>,
	key: &(Dimension, String),
) -> &'m [AttributeSet] {
	closures.get(key).map(Vec::as_slice).unwrap_or(&[])
}

/// Decisions for `requests`, in input order.
#[instrument(level = "debug", skip_all, fields(requests = requests.len()))]
pub fn batch_enforce(
	snapshot: &PolicySnapshot,
	resolver: &GroupingResolver,
	requests: &[EnforcementRequest],
) -> Vec<Decision> {
	let mut batch = BatchEnforcer::new(snapshot, resolver);
	let decisions: Vec<Decision> = requests.iter().map(|r| batch.decide(r)).collect();
	debug!(
		allowed = decisions.iter().filter(|d| d.is_allowed()).count(),
		"batch evaluated"
	);
	decisions
}

/// Per-entry results for raw JSON requests. A malformed entry yields an
/// `InvalidPattern` error in its slot; the remaining entries are still
/// evaluated.
#[instrument(level = "debug", skip_all, fields(entries = entries.len()))]
pub fn batch_enforce_json(
	snapshot: &PolicySnapshot,
	resolver: &GroupingResolver,
	entries: &[Value],
) -> Vec<Result<bool>> {
	let mut batch = BatchEnforcer::new(snapshot, resolver);
	let results: Vec<Result<bool>> = entries
		.iter()
		.map(|entry| batch.decide_json(entry).map(|d| d.is_allowed()))
		.collect();
	debug!(
		failed = results.iter().filter(|r| r.is_err()).count(),
		"json batch evaluated"
	);
	results
}
