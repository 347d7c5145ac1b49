// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the Shield authorization engine.
//!
//! This crate holds the data model shared by the engine (`shield-authz`), its
//! storage adapters and the CLI:
//!
//! - [`AttributeSet`] / [`AttrValue`]: subjects, resources, actions and patterns
//! - [`Policy`] / [`Effect`]: stored allow/deny rules
//! - [`GroupingEdge`]: membership edges within a [`Dimension`]
//! - [`EnforcementRequest`] / [`Decision`]: questions and answers
//!
//! # Example
//!
//! ```
//! use shield_authz_core::{AttributeSet, Effect, Options, Policy};
//!
//! let admin = AttributeSet::single("role", "admin");
//! let policy = Policy::new(
//!     admin.clone(),
//!     AttributeSet::wildcard(),
//!     AttributeSet::wildcard(),
//!     Effect::Allow,
//!     Options::new(),
//! );
//!
//! assert!(policy.subject.matches(&admin.clone().with("userId", "u1")));
//! ```

pub mod attrs;
pub mod error;
pub mod grouping;
pub mod policy;
pub mod request;

pub use attrs::{AttrValue, AttributeSet, WILDCARD};
pub use error::{AuthzError, Result};
pub use grouping::GroupingEdge;
pub use policy::{Dimension, Effect, Options, Policy, PolicyId};
pub use request::{Decision, EnforcementRequest};
