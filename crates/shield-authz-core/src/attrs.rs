// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Attribute values and attribute sets.
//!
//! Subjects, resources, actions, policy patterns and grouping nodes all share
//! one representation: a key-sorted map from attribute name to [`AttrValue`].
//!
//! # Pattern semantics
//!
//! When an [`AttributeSet`] is used as a pattern (see [`AttributeSet::matches`]):
//!
//! - the empty set matches every candidate
//! - an attribute absent from the pattern is a wildcard
//! - the value `"*"` matches any value, but the candidate must carry the key
//! - a list value matches a candidate value that equals the list or any member
//! - a nested map matches a candidate map by the same rules, recursively
//! - every other value must be equal
//!
//! # Canonical form
//!
//! [`AttributeSet::canonical`] renders compact JSON with keys sorted at every
//! level. The canonical string is the identity of grouping nodes and the form
//! written to storage.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};

use crate::error::{AuthzError, Result};

/// Attribute value that matches any present value.
pub const WILDCARD: &str = "*";

/// A single attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
	String(String),
	Number(Number),
	Bool(bool),
	List(Vec<AttrValue>),
	Map(BTreeMap<String, AttrValue>),
}

impl AttrValue {
	/// Converts a JSON value. `null` has no attribute representation and is rejected.
	pub fn from_json(value: &Value) -> Result<Self> {
		match value {
			Value::Null => Err(AuthzError::invalid_pattern(
				"null is not a valid attribute value",
			)),
			Value::Bool(b) => Ok(Self::Bool(*b)),
			Value::Number(n) => Ok(Self::Number(n.clone())),
			Value::String(s) => Ok(Self::String(s.clone())),
			Value::Array(items) => items
				.iter()
				.map(Self::from_json)
				.collect::<Result<Vec<_>>>()
				.map(Self::List),
			Value::Object(fields) => {
				let mut map = BTreeMap::new();
				for (key, value) in fields {
					validate_key(key)?;
					map.insert(key.clone(), Self::from_json(value)?);
				}
				Ok(Self::Map(map))
			}
		}
	}

	pub fn to_json(&self) -> Value {
		match self {
			Self::String(s) => Value::String(s.clone()),
			Self::Number(n) => Value::Number(n.clone()),
			Self::Bool(b) => Value::Bool(*b),
			Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
			Self::Map(fields) => Value::Object(map_to_json(fields)),
		}
	}

	/// Compact JSON rendering with sorted keys.
	pub fn canonical(&self) -> String {
		self.to_json().to_string()
	}

	pub fn is_wildcard(&self) -> bool {
		matches!(self, Self::String(s) if s == WILDCARD)
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::String(s) => Some(s),
			_ => None,
		}
	}

	/// Returns true for strings, numbers and booleans (other than `"*"`).
	pub fn is_scalar(&self) -> bool {
		match self {
			Self::String(s) => s != WILDCARD,
			Self::Number(_) | Self::Bool(_) => true,
			Self::List(_) | Self::Map(_) => false,
		}
	}

	/// Evaluates this value as a pattern against a candidate value.
	pub fn satisfied_by(&self, actual: &AttrValue) -> bool {
		match self {
			Self::String(s) if s == WILDCARD => true,
			Self::List(options) => self == actual || options.iter().any(|o| o.satisfied_by(actual)),
			Self::Map(pattern) => match actual {
				Self::Map(fields) => map_satisfied_by(pattern, fields),
				_ => false,
			},
			_ => self == actual,
		}
	}

	fn validate(&self) -> Result<()> {
		match self {
			Self::List(items) => items.iter().try_for_each(Self::validate),
			Self::Map(fields) => fields.iter().try_for_each(|(key, value)| {
				validate_key(key)?;
				value.validate()
			}),
			_ => Ok(()),
		}
	}
}

impl Serialize for AttrValue {
	fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
		match self {
			Self::String(s) => serializer.serialize_str(s),
			Self::Number(n) => n.serialize(serializer),
			Self::Bool(b) => serializer.serialize_bool(*b),
			Self::List(items) => items.serialize(serializer),
			Self::Map(fields) => fields.serialize(serializer),
		}
	}
}

impl<'de> Deserialize<'de> for AttrValue {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
		let value = Value::deserialize(deserializer)?;
		Self::from_json(&value).map_err(serde::de::Error::custom)
	}
}

impl fmt::Display for AttrValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.canonical())
	}
}

impl From<&str> for AttrValue {
	fn from(value: &str) -> Self {
		Self::String(value.to_string())
	}
}

impl From<String> for AttrValue {
	fn from(value: String) -> Self {
		Self::String(value)
	}
}

impl From<bool> for AttrValue {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}

impl From<i64> for AttrValue {
	fn from(value: i64) -> Self {
		Self::Number(value.into())
	}
}

impl From<i32> for AttrValue {
	fn from(value: i32) -> Self {
		Self::Number(value.into())
	}
}

impl From<u64> for AttrValue {
	fn from(value: u64) -> Self {
		Self::Number(value.into())
	}
}

impl<T: Into<AttrValue>> From<Vec<T>> for AttrValue {
	fn from(values: Vec<T>) -> Self {
		Self::List(values.into_iter().map(Into::into).collect())
	}
}

impl From<AttributeSet> for AttrValue {
	fn from(set: AttributeSet) -> Self {
		Self::Map(set.0)
	}
}

/// Canonical attribute map describing a subject, resource, action or pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeSet(BTreeMap<String, AttrValue>);

impl AttributeSet {
	pub fn new() -> Self {
		Self::default()
	}

	/// The full wildcard pattern.
	pub fn wildcard() -> Self {
		Self::default()
	}

	/// A one-key set such as `{role: "admin"}`.
	pub fn single(key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
		Self::new().with(key, value)
	}

	pub fn with(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
		self.0.insert(key.into(), value.into());
		self
	}

	pub fn insert(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Option<AttrValue> {
		self.0.insert(key.into(), value.into())
	}

	pub fn get(&self, key: &str) -> Option<&AttrValue> {
		self.0.get(key)
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// An empty set used as a pattern matches everything.
	pub fn is_wildcard(&self) -> bool {
		self.0.is_empty()
	}

	pub fn is_one_key(&self) -> bool {
		self.0.len() == 1
	}

	pub fn iter(&self) -> impl Iterator<Item = (&String, &AttrValue)> {
		self.0.iter()
	}

	/// Parses a JSON object. Any other JSON type is an invalid pattern.
	pub fn from_json(value: &Value) -> Result<Self> {
		match value {
			Value::Object(fields) => {
				let mut map = BTreeMap::new();
				for (key, value) in fields {
					validate_key(key)?;
					map.insert(key.clone(), AttrValue::from_json(value)?);
				}
				Ok(Self(map))
			}
			other => Err(AuthzError::invalid_pattern(format!(
				"attribute set must be a JSON object, got {}",
				json_type_name(other)
			))),
		}
	}

	/// Parses a JSON object from text.
	pub fn parse_json(text: &str) -> Result<Self> {
		let value: Value = serde_json::from_str(text)
			.map_err(|e| AuthzError::invalid_pattern(format!("invalid JSON attribute set: {e}")))?;
		Self::from_json(&value)
	}

	pub fn to_json(&self) -> Value {
		Value::Object(map_to_json(&self.0))
	}

	pub fn canonical(&self) -> String {
		self.to_json().to_string()
	}

	/// Rejects empty attribute names at any nesting level.
	pub fn validate(&self) -> Result<()> {
		self.0.iter().try_for_each(|(key, value)| {
			validate_key(key)?;
			value.validate()
		})
	}

	/// Evaluates `self` as a pattern against a concrete candidate.
	pub fn matches(&self, candidate: &AttributeSet) -> bool {
		map_satisfied_by(&self.0, &candidate.0)
	}

	/// One-key projections of this set, in key order.
	///
	/// A set with a single attribute yields only itself.
	pub fn projections(&self) -> impl Iterator<Item = AttributeSet> + '_ {
		self
			.0
			.iter()
			.map(|(key, value)| AttributeSet::single(key.clone(), value.clone()))
	}
}

impl fmt::Display for AttributeSet {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.canonical())
	}
}

impl Serialize for AttributeSet {
	fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
		self.0.serialize(serializer)
	}
}

impl<'de> Deserialize<'de> for AttributeSet {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
		let value = Value::deserialize(deserializer)?;
		Self::from_json(&value).map_err(serde::de::Error::custom)
	}
}

impl<K: Into<String>, V: Into<AttrValue>> FromIterator<(K, V)> for AttributeSet {
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		Self(
			iter
				.into_iter()
				.map(|(key, value)| (key.into(), value.into()))
				.collect(),
		)
	}
}

impl<K: Into<String>, V: Into<AttrValue>, const N: usize> From<[(K, V); N]> for AttributeSet {
	fn from(pairs: [(K, V); N]) -> Self {
		pairs.into_iter().collect()
	}
}

fn validate_key(key: &str) -> Result<()> {
	if key.trim().is_empty() {
		return Err(AuthzError::invalid_pattern("attribute name must not be empty"));
	}
	Ok(())
}

fn map_to_json(fields: &BTreeMap<String, AttrValue>) -> Map<String, Value> {
	fields
		.iter()
		.map(|(key, value)| (key.clone(), value.to_json()))
		.collect()
}

fn map_satisfied_by(pattern: &BTreeMap<String, AttrValue>, fields: &BTreeMap<String, AttrValue>) -> bool {
	pattern.iter().all(|(key, expected)| {
		fields
			.get(key)
			.map(|actual| expected.satisfied_by(actual))
			.unwrap_or(false)
	})
}

fn json_type_name(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "boolean",
		Value::Number(_) => "number",
		Value::String(_) => "string",
		Value::Array(_) => "array",
		Value::Object(_) => "object",
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use serde_json::json;

	fn set(value: Value) -> AttributeSet {
		AttributeSet::from_json(&value).unwrap()
	}

	#[test]
	fn test_canonical_sorts_keys() {
		let a = set(json!({"type": "project", "id": "p1"}));
		let b = AttributeSet::new().with("id", "p1").with("type", "project");
		assert_eq!(a, b);
		assert_eq!(a.canonical(), r#"{"id":"p1","type":"project"}"#);
	}

	#[test]
	fn test_canonical_sorts_nested_keys() {
		let a = set(json!({"meta": {"z": 1, "a": true}}));
		assert_eq!(a.canonical(), r#"{"meta":{"a":true,"z":1}}"#);
	}

	#[test]
	fn test_from_json_rejects_non_objects() {
		for value in [json!("admin"), json!(1), json!([1, 2]), json!(null), json!(true)] {
			let err = AttributeSet::from_json(&value).unwrap_err();
			assert!(matches!(err, AuthzError::InvalidPattern(_)), "{value}");
		}
	}

	#[test]
	fn test_from_json_rejects_null_values() {
		let err = AttributeSet::from_json(&json!({"role": null})).unwrap_err();
		assert!(matches!(err, AuthzError::InvalidPattern(_)));
	}

	#[test]
	fn test_from_json_rejects_empty_keys() {
		assert!(AttributeSet::from_json(&json!({"": "x"})).is_err());
		assert!(AttributeSet::from_json(&json!({"outer": {" ": 1}})).is_err());
	}

	#[test]
	fn test_validate_catches_programmatic_empty_key() {
		let bad = AttributeSet::single("", "x");
		assert!(bad.validate().is_err());
		let nested = AttributeSet::single("meta", AttributeSet::single("", 1));
		assert!(nested.validate().is_err());
		assert!(AttributeSet::single("role", "admin").validate().is_ok());
	}

	#[test]
	fn test_parse_json_text() {
		let parsed = AttributeSet::parse_json(r#"{"role":"admin"}"#).unwrap();
		assert_eq!(parsed, AttributeSet::single("role", "admin"));
		assert!(AttributeSet::parse_json("{oops").is_err());
	}

	#[test]
	fn test_empty_pattern_matches_everything() {
		let pattern = AttributeSet::wildcard();
		assert!(pattern.matches(&AttributeSet::new()));
		assert!(pattern.matches(&set(json!({"userId": "u1"}))));
	}

	#[test]
	fn test_subset_match() {
		let pattern = set(json!({"type": "project"}));
		assert!(pattern.matches(&set(json!({"type": "project", "id": "p1"}))));
		assert!(!pattern.matches(&set(json!({"type": "team", "id": "p1"}))));
		assert!(!pattern.matches(&set(json!({"id": "p1"}))));
	}

	#[test]
	fn test_concrete_pattern_needs_all_attributes() {
		let pattern = set(json!({"type": "project", "id": "p1"}));
		assert!(pattern.matches(&set(json!({"type": "project", "id": "p1"}))));
		assert!(!pattern.matches(&set(json!({"type": "project"}))));
		assert!(!pattern.matches(&set(json!({"type": "project", "id": "p2"}))));
	}

	#[test]
	fn test_wildcard_value_requires_key() {
		let pattern = set(json!({"team": "*"}));
		assert!(pattern.matches(&set(json!({"team": "transport"}))));
		assert!(pattern.matches(&set(json!({"team": 7}))));
		assert!(!pattern.matches(&set(json!({"entity": "gojek"}))));
	}

	#[test]
	fn test_list_pattern_is_any_of() {
		let pattern = set(json!({"entity": "gojek", "landscape": ["vn", "id"]}));
		assert!(pattern.matches(&set(json!({"entity": "gojek", "landscape": "id"}))));
		assert!(pattern.matches(&set(json!({"entity": "gojek", "landscape": "vn"}))));
		assert!(!pattern.matches(&set(json!({"entity": "gojek", "landscape": "th"}))));
		assert!(pattern.matches(&set(json!({"entity": "gojek", "landscape": ["vn", "id"]}))));
	}

	#[test]
	fn test_nested_map_is_subset_matched() {
		let pattern = set(json!({"owner": {"org": "o1"}}));
		assert!(pattern.matches(&set(json!({"owner": {"org": "o1", "team": "t1"}}))));
		assert!(!pattern.matches(&set(json!({"owner": {"org": "o2"}}))));
		assert!(!pattern.matches(&set(json!({"owner": "o1"}))));
	}

	#[test]
	fn test_numbers_and_bools_compare_by_value() {
		let pattern = set(json!({"level": 3, "active": true}));
		assert!(pattern.matches(&set(json!({"level": 3, "active": true}))));
		assert!(!pattern.matches(&set(json!({"level": "3", "active": true}))));
		assert!(!pattern.matches(&set(json!({"level": 3, "active": false}))));
	}

	#[test]
	fn test_projections() {
		let entity = set(json!({"userId": "u1", "email": "a@example.com"}));
		let projections: Vec<_> = entity.projections().collect();
		assert_eq!(
			projections,
			vec![
				AttributeSet::single("email", "a@example.com"),
				AttributeSet::single("userId", "u1"),
			]
		);
	}

	#[test]
	fn test_serde_uses_plain_json_objects() {
		let entity = AttributeSet::new()
			.with("id", "p1")
			.with("tags", vec!["a", "b"])
			.with("public", false);
		let encoded = serde_json::to_value(&entity).unwrap();
		assert_eq!(encoded, json!({"id": "p1", "tags": ["a", "b"], "public": false}));
		let decoded: AttributeSet = serde_json::from_value(encoded).unwrap();
		assert_eq!(decoded, entity);
	}

	#[test]
	fn test_deserialize_rejects_null() {
		let result: std::result::Result<AttributeSet, _> = serde_json::from_value(json!({"a": null}));
		assert!(result.is_err());
	}

	proptest! {
		#[test]
		fn canonical_is_independent_of_insertion_order(
			pairs in prop::collection::btree_map("[a-z]{1,8}", "[a-z0-9]{0,8}", 0..8)
		) {
			let forward: AttributeSet = pairs.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
			let reverse: AttributeSet = pairs.iter().rev().map(|(k, v)| (k.clone(), v.clone())).collect();
			prop_assert_eq!(forward.canonical(), reverse.canonical());
		}

		#[test]
		fn every_set_matches_itself(
			pairs in prop::collection::btree_map("[a-z]{1,8}", "[a-z0-9]{0,8}", 0..8)
		) {
			let entity: AttributeSet = pairs.into_iter().collect();
			prop_assert!(entity.matches(&entity));
		}

		#[test]
		fn dropping_attributes_keeps_match(
			pairs in prop::collection::btree_map("[a-z]{1,8}", "[a-z0-9]{0,8}", 1..8),
			keep in 0usize..8
		) {
			let entity: AttributeSet = pairs.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
			let pattern: AttributeSet = pairs.into_iter().take(keep).collect();
			prop_assert!(pattern.matches(&entity));
		}
	}
}
