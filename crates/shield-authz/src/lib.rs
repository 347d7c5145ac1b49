// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Attribute-based authorization engine.
//!
//! Policies match subjects, resources and actions described as attribute
//! sets. Grouping edges let a subject inherit roles, a resource inherit its
//! containers and an action inherit its categories. Evaluation is
//! default-deny with deny-overrides.
//!
//! # Example
//!
//! ```
//! use shield_authz::Enforcer;
//! use shield_authz_core::{AttributeSet, Effect, Options};
//!
//! let enforcer = Enforcer::new();
//! enforcer
//!     .add_policy(
//!         AttributeSet::single("role", "admin"),
//!         AttributeSet::wildcard(),
//!         AttributeSet::wildcard(),
//!         Effect::Allow,
//!         Options::new(),
//!     )
//!     .unwrap();
//! enforcer
//!     .add_subject_grouping(
//!         AttributeSet::single("userId", "u1"),
//!         AttributeSet::single("role", "admin"),
//!         Options::new(),
//!     )
//!     .unwrap();
//!
//! assert!(enforcer.enforce(
//!     &AttributeSet::single("userId", "u1"),
//!     &AttributeSet::single("type", "project"),
//!     &AttributeSet::single("name", "delete"),
//! ));
//! ```

pub mod adapter;
pub mod batch;
pub mod enforcer;
mod index;
pub mod matcher;
pub mod persistent;
pub mod resolver;
pub mod sqlite;
pub mod store;
pub mod strings;

pub use adapter::{LoadedPolicies, PolicyAdapter};
pub use batch::BatchEnforcer;
pub use enforcer::Enforcer;
pub use persistent::PersistentEnforcer;
pub use resolver::GroupingResolver;
pub use sqlite::{create_pool, SqlitePolicyAdapter};
pub use store::{PolicySnapshot, PolicyStore};

pub use shield_authz_core::{
	AttrValue, AttributeSet, AuthzError, Decision, Dimension, Effect, EnforcementRequest,
	GroupingEdge, Options, Policy, PolicyId, Result,
};
