// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Multi-team IAM fixture: users in teams, resources tagged with entity,
//! landscape and environment, and actions rolled up into roles.

use serde_json::{json, Value};
use shield_authz::{AttributeSet, Dimension, Effect, Enforcer, Options};

fn set(value: Value) -> AttributeSet {
	AttributeSet::from_json(&value).unwrap()
}

fn allow(enforcer: &Enforcer, subject: Value, resource: Value, action: Value) {
	let resource = if resource == json!("*") {
		AttributeSet::wildcard()
	} else {
		set(resource)
	};
	enforcer
		.add_policy(set(subject), resource, set(action), Effect::Allow, Options::new())
		.unwrap();
}

fn group(enforcer: &Enforcer, kind: Dimension, member: Value, group: Value) {
	enforcer
		.add_grouping(kind, set(member), set(group), Options::new())
		.unwrap();
}

fn fixture() -> Enforcer {
	let enforcer = Enforcer::new();

	allow(
		&enforcer,
		json!({"user": "alice"}),
		json!({"entity": "gojek", "landscape": ["vn", "id"], "environment": "production", "team": "transport"}),
		json!({"role": "resource.manager"}),
	);
	allow(&enforcer, json!({"user": "alice"}), json!({"entity": "gojek"}), json!({"role": "dwh.manager"}));
	allow(
		&enforcer,
		json!({"user": "frank"}),
		json!({"entity": "gojek", "landscape": "id", "environment": "production", "team": "augur"}),
		json!({"role": "resource.manager"}),
	);
	allow(&enforcer, json!({"user": "bob"}), json!({"team": "transport"}), json!({"role": "team.admin"}));
	allow(&enforcer, json!({"user": "cathy"}), json!({"entity": "gojek"}), json!({"role": "entity.admin"}));
	for team in ["transport", "augur", "gofinance"] {
		allow(&enforcer, json!({"team": team}), json!({"team": team}), json!({"role": "resource.viewer"}));
	}
	for (team, entity) in [("transport", "gojek"), ("augur", "gojek"), ("gofinance", "gofin")] {
		allow(
			&enforcer,
			json!({"team": team}),
			json!({"entity": entity, "privacy": "public"}),
			json!({"role": "resource.viewer"}),
		);
	}
	allow(&enforcer, json!({"team": "de"}), json!("*"), json!({"role": "super.admin"}));

	for (user, team) in [
		("alice", "transport"),
		("bob", "transport"),
		("dave", "augur"),
		("frank", "augur"),
		("ele", "gofinance"),
		("gary", "de"),
	] {
		group(&enforcer, Dimension::Subject, json!({"user": user}), json!({"team": team}));
	}

	let resources = [
		(
			"p-gojek-id-firehose-transport-123",
			json!({"entity": "gojek", "environment": "production", "landscape": "id", "team": "transport", "privacy": "public"}),
		),
		(
			"p-gojek-id-firehose-augur-345",
			json!({"entity": "gojek", "environment": "production", "landscape": "id", "team": "augur", "privacy": "public"}),
		),
		(
			"p-gojek-id-firehose-augur-private-345",
			json!({"entity": "gojek", "environment": "production", "landscape": "id", "team": "augur", "privacy": "private"}),
		),
		(
			"p-gojek-id-beast-123",
			json!({"entity": "gojek", "environment": "production", "landscape": "id", "privacy": "public"}),
		),
		(
			"p-gofin-id-firehose-gofinance-789",
			json!({"entity": "gofin", "environment": "production", "landscape": "id", "privacy": "public", "team": "gofinance"}),
		),
	];
	for (urn, attributes) in resources {
		group(&enforcer, Dimension::Resource, json!({"resource": urn}), attributes);
	}
	for (team, entity) in [("augur", "gojek"), ("transport", "gojek"), ("gofinance", "gofin")] {
		group(&enforcer, Dimension::Resource, json!({"team": team}), json!({"entity": entity}));
	}

	for role in ["team.admin", "entity.admin", "super.admin"] {
		group(&enforcer, Dimension::Action, json!({"action": "*"}), json!({"role": role}));
	}
	for action in ["firehose.read", "dagger.read", "beast.read"] {
		group(&enforcer, Dimension::Action, json!({"action": action}), json!({"role": "resource.viewer"}));
	}
	for action in ["firehose.write", "dagger.write"] {
		group(&enforcer, Dimension::Action, json!({"action": action}), json!({"role": "resource.manager"}));
	}
	group(
		&enforcer,
		Dimension::Action,
		json!({"role": "resource.viewer"}),
		json!({"role": "resource.manager"}),
	);
	group(&enforcer, Dimension::Action, json!({"action": "beast.*"}), json!({"role": "dwh.manager"}));

	enforcer
}

fn check(enforcer: &Enforcer, user: &str, resource: Value, action: &str) -> bool {
	let resource = match resource {
		Value::String(urn) => json!({"resource": urn}),
		attributes => attributes,
	};
	enforcer.enforce(
		&set(json!({"user": user})),
		&set(resource),
		&set(json!({"action": action})),
	)
}

#[test]
fn resource_manager_scoped_to_own_team() {
	let enforcer = fixture();
	let cases = [
		("alice", json!("p-gojek-id-firehose-transport-123"), "firehose.write", true),
		("alice", json!("p-gojek-id-firehose-augur-345"), "firehose.read", true),
		("alice", json!("p-gojek-id-firehose-augur-345"), "firehose.write", false),
		(
			"alice",
			json!({"entity": "gojek", "environment": "production", "landscape": "id", "team": "transport"}),
			"firehose.write",
			true,
		),
		(
			"alice",
			json!({"entity": "gojek", "environment": "production", "landscape": "id", "team": "augur"}),
			"firehose.write",
			false,
		),
		("alice", json!("p-gofin-id-firehose-gofinance-789"), "firehose.read", false),
		("alice", json!("p-gojek-id-firehose-augur-private-345"), "firehose.read", false),
		("frank", json!("p-gojek-id-firehose-augur-private-345"), "firehose.write", true),
	];
	for (user, resource, action, expected) in cases {
		assert_eq!(
			check(&enforcer, user, resource.clone(), action),
			expected,
			"{user} {action} on {resource}"
		);
	}
}

#[test]
fn action_globs_reach_dwh_manager() {
	let enforcer = fixture();
	let cases = [
		(
			"alice",
			json!({"entity": "gojek", "environment": "production", "landscape": "vn"}),
			"beast.write",
			true,
		),
		(
			"alice",
			json!({"entity": "gofin", "environment": "production", "landscape": "id"}),
			"beast.write",
			false,
		),
	];
	for (user, resource, action, expected) in cases {
		assert_eq!(
			check(&enforcer, user, resource.clone(), action),
			expected,
			"{user} {action} on {resource}"
		);
	}
}

#[test]
fn team_admin_and_viewer() {
	let enforcer = fixture();
	let cases = [
		("bob", json!("p-gojek-id-beast-123"), "beast.read", true),
		(
			"bob",
			json!({"entity": "gojek", "environment": "production", "landscape": "id"}),
			"beast.write",
			false,
		),
		("bob", json!("p-gojek-id-beast-123"), "beast.write", false),
		("bob", json!({"team": "transport"}), "role.creator", true),
		("alice", json!({"team": "transport"}), "role.creator", false),
	];
	for (user, resource, action, expected) in cases {
		assert_eq!(
			check(&enforcer, user, resource.clone(), action),
			expected,
			"{user} {action} on {resource}"
		);
	}
}

#[test]
fn entity_admin_covers_entity_resources_only() {
	let enforcer = fixture();
	let cases = [
		("cathy", json!({"entity": "gojek"}), "team.creator", true),
		(
			"cathy",
			json!({"entity": "gojek", "environment": "production", "landscape": "id", "team": "transport"}),
			"firehose.write",
			true,
		),
		("cathy", json!("p-gojek-id-firehose-transport-123"), "firehose.write", true),
		("cathy", json!("p-gojek-id-firehose-augur-private-345"), "firehose.write", true),
		("cathy", json!({"team": "transport"}), "role.creator", true),
		(
			"cathy",
			json!({"entity": "gojek", "environment": "production", "landscape": "id"}),
			"beast.write",
			true,
		),
		("cathy", json!("p-gofin-id-firehose-gofinance-789"), "firehose.read", false),
		("cathy", json!({"team": "gofinance"}), "role.creator", false),
	];
	for (user, resource, action, expected) in cases {
		assert_eq!(
			check(&enforcer, user, resource.clone(), action),
			expected,
			"{user} {action} on {resource}"
		);
	}
}

#[test]
fn team_viewer_reads_private_team_resources() {
	let enforcer = fixture();
	assert!(check(&enforcer, "dave", json!("p-gojek-id-firehose-augur-private-345"), "firehose.read"));
	assert!(!check(&enforcer, "dave", json!("p-gojek-id-firehose-augur-private-345"), "firehose.write"));
}

#[test]
fn super_admin_allowed_everywhere() {
	let enforcer = fixture();
	assert!(check(&enforcer, "gary", json!("p-gojek-id-firehose-augur-private-345"), "firehose.write"));
	assert!(check(&enforcer, "gary", json!({"team": "gofinance"}), "role.creator"));
	assert!(check(&enforcer, "gary", json!({"entity": "gojek"}), "team.creator"));
}

#[test]
fn removing_action_glob_revokes_dwh_manager() {
	let enforcer = fixture();
	let resource = json!({"entity": "gojek", "environment": "production", "landscape": "vn"});
	assert!(check(&enforcer, "alice", resource.clone(), "beast.write"));

	enforcer
		.remove_action_grouping(&set(json!({"action": "beast.*"})), &set(json!({"role": "dwh.manager"})))
		.unwrap();
	assert!(!check(&enforcer, "alice", resource, "beast.write"));
}
