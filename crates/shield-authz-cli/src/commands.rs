// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Subcommand definitions and handlers. Every handler returns the JSON
//! document printed on stdout.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Subcommand, ValueEnum};
use serde_json::{json, Value};
use tracing::info;

use shield_authz::strings::{parse_entity, parse_triple};
use shield_authz::{Dimension, Effect, Options, PersistentEnforcer};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum KindArg {
	Subject,
	Resource,
	Action,
}

impl From<KindArg> for Dimension {
	fn from(kind: KindArg) -> Self {
		match kind {
			KindArg::Subject => Dimension::Subject,
			KindArg::Resource => Dimension::Resource,
			KindArg::Action => Dimension::Action,
		}
	}
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EffectArg {
	#[default]
	Allow,
	Deny,
}

impl From<EffectArg> for Effect {
	fn from(effect: EffectArg) -> Self {
		match effect {
			EffectArg::Allow => Effect::Allow,
			EffectArg::Deny => Effect::Deny,
		}
	}
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Evaluate a single request
	Check {
		/// Subject: plain identifier, JSON object, or "*"
		subject: String,
		/// Resource: plain identifier, JSON object, or "*"
		resource: String,
		/// Action: plain identifier, JSON object, or "*"
		action: String,
	},
	/// Evaluate a JSON array of {"subject", "resource", "action"} objects
	Batch {
		/// File containing the requests ("-" for stdin)
		file: PathBuf,
	},
	/// Show everything an entity belongs to
	Closure {
		#[arg(value_enum)]
		kind: KindArg,
		entity: String,
	},
	/// Manage policies
	#[command(subcommand)]
	Policy(PolicyCommand),
	/// Manage grouping edges
	#[command(subcommand)]
	Group(GroupCommand),
}

#[derive(Subcommand, Debug)]
pub enum PolicyCommand {
	/// Add a policy
	Add {
		subject: String,
		resource: String,
		action: String,
		#[arg(long, value_enum, default_value = "allow")]
		effect: EffectArg,
		/// Metadata as a JSON object
		#[arg(long)]
		options: Option<String>,
	},
	/// Remove the oldest identical policy
	Remove {
		subject: String,
		resource: String,
		action: String,
		#[arg(long, value_enum, default_value = "allow")]
		effect: EffectArg,
		#[arg(long)]
		options: Option<String>,
	},
	/// List all policies in store order
	List,
}

#[derive(Subcommand, Debug)]
pub enum GroupCommand {
	/// Add a member -> group edge
	Add {
		#[arg(value_enum)]
		kind: KindArg,
		member: String,
		group: String,
		#[arg(long)]
		options: Option<String>,
	},
	/// Remove a member -> group edge
	Remove {
		#[arg(value_enum)]
		kind: KindArg,
		member: String,
		group: String,
	},
	/// Replace every resource grouping of a member with one edge
	UpsertResource {
		member: String,
		group: String,
		#[arg(long)]
		options: Option<String>,
	},
	/// Remove every resource grouping of a member
	ClearResource { member: String },
	/// List edges, optionally of one kind
	List {
		#[arg(value_enum)]
		kind: Option<KindArg>,
	},
}

fn parse_options(options: Option<&str>) -> Result<Options> {
	match options {
		Some(text) => serde_json::from_str(text).context("--options must be a JSON object"),
		None => Ok(Options::new()),
	}
}

fn read_batch(file: &Path) -> Result<Vec<Value>> {
	let content = if file.as_os_str() == "-" {
		std::io::read_to_string(std::io::stdin()).context("failed to read requests from stdin")?
	} else {
		std::fs::read_to_string(file)
			.with_context(|| format!("failed to read {}", file.display()))?
	};
	match serde_json::from_str(&content).context("batch file is not valid JSON")? {
		Value::Array(entries) => Ok(entries),
		_ => bail!("batch file must contain a JSON array"),
	}
}

pub async fn run(command: Command, enforcer: &PersistentEnforcer) -> Result<Value> {
	match command {
		Command::Check {
			subject,
			resource,
			action,
		} => {
			let (subject, resource, action) = parse_triple(&subject, &resource, &action)?;
			let request = shield_authz::EnforcementRequest::new(subject, resource, action);
			let decision = enforcer.decide(&request);
			Ok(json!({
				"allowed": decision.is_allowed(),
				"decision": decision,
			}))
		}
		Command::Batch { file } => {
			let entries = read_batch(&file)?;
			let results: Vec<Value> = enforcer
				.batch_enforce_json(&entries)
				.into_iter()
				.map(|result| match result {
					Ok(allowed) => json!({ "allowed": allowed }),
					Err(e) => json!({ "allowed": false, "error": e.to_string() }),
				})
				.collect();
			Ok(Value::Array(results))
		}
		Command::Closure { kind, entity } => {
			let kind = Dimension::from(kind);
			let entity = parse_entity(kind, &entity)?;
			let closure = enforcer.closure(kind, &entity);
			Ok(serde_json::to_value(closure)?)
		}
		Command::Policy(command) => run_policy(command, enforcer).await,
		Command::Group(command) => run_group(command, enforcer).await,
	}
}

async fn run_policy(command: PolicyCommand, enforcer: &PersistentEnforcer) -> Result<Value> {
	match command {
		PolicyCommand::Add {
			subject,
			resource,
			action,
			effect,
			options,
		} => {
			let (subject, resource, action) = parse_triple(&subject, &resource, &action)?;
			let options = parse_options(options.as_deref())?;
			let id = enforcer
				.add_policy(subject, resource, action, effect.into(), options)
				.await?;
			info!(policy_id = %id, "policy added");
			Ok(json!({ "id": id }))
		}
		PolicyCommand::Remove {
			subject,
			resource,
			action,
			effect,
			options,
		} => {
			let (subject, resource, action) = parse_triple(&subject, &resource, &action)?;
			let options = parse_options(options.as_deref())?;
			let id = enforcer
				.remove_policy(&subject, &resource, &action, effect.into(), &options)
				.await?;
			info!(policy_id = %id, "policy removed");
			Ok(json!({ "removed": id }))
		}
		PolicyCommand::List => Ok(serde_json::to_value(enforcer.policies())?),
	}
}

async fn run_group(command: GroupCommand, enforcer: &PersistentEnforcer) -> Result<Value> {
	match command {
		GroupCommand::Add {
			kind,
			member,
			group,
			options,
		} => {
			let kind = Dimension::from(kind);
			let added = enforcer
				.add_grouping(
					kind,
					parse_entity(kind, &member)?,
					parse_entity(kind, &group)?,
					parse_options(options.as_deref())?,
				)
				.await?;
			Ok(json!({ "added": added }))
		}
		GroupCommand::Remove {
			kind,
			member,
			group,
		} => {
			let kind = Dimension::from(kind);
			enforcer
				.remove_grouping(kind, &parse_entity(kind, &member)?, &parse_entity(kind, &group)?)
				.await?;
			Ok(json!({ "removed": true }))
		}
		GroupCommand::UpsertResource {
			member,
			group,
			options,
		} => {
			enforcer
				.upsert_resource_grouping(
					parse_entity(Dimension::Resource, &member)?,
					parse_entity(Dimension::Resource, &group)?,
					parse_options(options.as_deref())?,
				)
				.await?;
			Ok(json!({ "upserted": true }))
		}
		GroupCommand::ClearResource { member } => {
			let removed = enforcer
				.remove_all_resource_groupings(&parse_entity(Dimension::Resource, &member)?)
				.await?;
			Ok(json!({ "removed": removed }))
		}
		GroupCommand::List { kind } => {
			let kinds = match kind {
				Some(kind) => vec![Dimension::from(kind)],
				None => Dimension::ALL.to_vec(),
			};
			let edges: Vec<_> = kinds
				.into_iter()
				.flat_map(|kind| enforcer.grouping_edges(kind))
				.collect();
			Ok(serde_json::to_value(edges)?)
		}
	}
}
