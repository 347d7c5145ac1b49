// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Policy evaluation with deny-overrides and default-deny.
//!
//! The evaluation order is:
//! 1. Expand subject, resource and action into their grouping closures
//! 2. Collect candidate policies from the per-dimension indexes
//! 3. Keep policies whose three patterns each match some closure element
//! 4. Any matching deny wins; otherwise the first matching allow; otherwise
//!    no match

use tracing::{debug, instrument};

use shield_authz_core::{AttributeSet, Decision, Dimension, Effect, EnforcementRequest, Policy};

use crate::resolver::GroupingResolver;
use crate::store::PolicySnapshot;

/// Evaluates one request against a snapshot.
#[instrument(
	level = "debug",
	skip_all,
	fields(
		subject = %request.subject,
		resource = %request.resource,
		action = %request.action,
	)
)]
pub fn evaluate(
	snapshot: &PolicySnapshot,
	resolver: &GroupingResolver,
	request: &EnforcementRequest,
) -> Decision {
	let closures =
		Dimension::ALL.map(|dimension| resolver.closure(snapshot, dimension, request.entity(dimension)));
	decide(
		snapshot,
		[
			closures[0].as_slice(),
			closures[1].as_slice(),
			closures[2].as_slice(),
		],
	)
}

/// Combines the policies matching already resolved closures.
pub(crate) fn decide(snapshot: &PolicySnapshot, closures: [&[AttributeSet]; 3]) -> Decision {
	let mut allow: Option<&Policy> = None;

	for policy in snapshot.candidates(closures) {
		if !policy_matches(policy, closures) {
			continue;
		}
		match policy.effect {
			Effect::Deny => {
				debug!(policy_id = %policy.id, "denied by policy");
				return Decision::Deny {
					policy: policy.clone(),
				};
			}
			Effect::Allow => {
				allow.get_or_insert(policy);
			}
		}
	}

	match allow {
		Some(policy) => {
			debug!(policy_id = %policy.id, "allowed by policy");
			Decision::Allow {
				policy: policy.clone(),
			}
		}
		None => {
			debug!("no matching policy, denying by default");
			Decision::NoMatch
		}
	}
}

/// True when each pattern of `policy` matches at least one element of the
/// closure for its dimension.
pub fn policy_matches(policy: &Policy, closures: [&[AttributeSet]; 3]) -> bool {
	Dimension::ALL.iter().all(|dimension| {
		let pattern = policy.pattern(*dimension);
		closures[dimension.index()]
			.iter()
			.any(|element| pattern.matches(element))
	})
}
