// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-dimension inverted index over policy patterns.
//!
//! Each pattern is filed under a single anchor attribute. A non-empty pattern
//! can only match a candidate that carries its anchor key, so looking up the
//! candidate's own attributes always finds it:
//!
//! - empty pattern: wildcard bucket, returned for every lookup
//! - anchor with a scalar value: `(key, canonical value)` bucket
//! - anchor with `"*"`, a list or a map: `key` bucket, checked by full match
//!
//! The anchor is the first scalar attribute in key order, falling back to the
//! first attribute. Lookups return a superset; the matcher re-checks patterns.

use std::collections::{BTreeSet, HashMap};

use shield_authz_core::{AttrValue, AttributeSet};

/// Insertion sequence number of a policy within a snapshot.
pub(crate) type Seq = u64;

#[derive(Debug, Clone, Default)]
pub(crate) struct PatternIndex {
	wildcard: BTreeSet<Seq>,
	by_value: HashMap<(String, String), BTreeSet<Seq>>,
	by_key: HashMap<String, BTreeSet<Seq>>,
}

enum Anchor<'a> {
	Wildcard,
	Value(&'a str, &'a AttrValue),
	Key(&'a str),
}

fn anchor(pattern: &AttributeSet) -> Anchor<'_> {
	if pattern.is_empty() {
		return Anchor::Wildcard;
	}
	if let Some((key, value)) = pattern.iter().find(|(_, v)| v.is_scalar()) {
		return Anchor::Value(key, value);
	}
	match pattern.iter().next() {
		Some((key, _)) => Anchor::Key(key),
		None => Anchor::Wildcard,
	}
}

impl PatternIndex {
	pub(crate) fn insert(&mut self, seq: Seq, pattern: &AttributeSet) {
		match anchor(pattern) {
			Anchor::Wildcard => {
				self.wildcard.insert(seq);
			}
			Anchor::Value(key, value) => {
				self
					.by_value
					.entry((key.to_string(), value.canonical()))
					.or_default()
					.insert(seq);
			}
			Anchor::Key(key) => {
				self.by_key.entry(key.to_string()).or_default().insert(seq);
			}
		}
	}

	pub(crate) fn remove(&mut self, seq: Seq, pattern: &AttributeSet) {
		match anchor(pattern) {
			Anchor::Wildcard => {
				self.wildcard.remove(&seq);
			}
			Anchor::Value(key, value) => {
				let bucket_key = (key.to_string(), value.canonical());
				if let Some(bucket) = self.by_value.get_mut(&bucket_key) {
					bucket.remove(&seq);
					if bucket.is_empty() {
						self.by_value.remove(&bucket_key);
					}
				}
			}
			Anchor::Key(key) => {
				if let Some(bucket) = self.by_key.get_mut(key) {
					bucket.remove(&seq);
					if bucket.is_empty() {
						self.by_key.remove(key);
					}
				}
			}
		}
	}

	/// Adds every policy that could match `entity` to `out`.
	pub(crate) fn collect_candidates(&self, entity: &AttributeSet, out: &mut BTreeSet<Seq>) {
		out.extend(self.wildcard.iter().copied());
		for (key, value) in entity.iter() {
			if let Some(bucket) = self.by_value.get(&(key.clone(), value.canonical())) {
				out.extend(bucket.iter().copied());
			}
			if let Some(bucket) = self.by_key.get(key.as_str()) {
				out.extend(bucket.iter().copied());
			}
		}
	}

	/// Candidates for any element of a closure.
	pub(crate) fn candidates<'a>(
		&self,
		closure: impl IntoIterator<Item = &'a AttributeSet>,
	) -> BTreeSet<Seq> {
		let mut out = BTreeSet::new();
		for entity in closure {
			self.collect_candidates(entity, &mut out);
		}
		out
	}

	pub(crate) fn is_empty(&self) -> bool {
		self.wildcard.is_empty() && self.by_value.is_empty() && self.by_key.is_empty()
	}
}
