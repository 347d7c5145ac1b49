// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite storage for policies and grouping edges.
//!
//! Attribute sets and options are stored as canonical JSON text, so equal
//! sets always produce equal column values and the edge primary key doubles
//! as the `(kind, member, group)` identity.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqliteSynchronous};
use tracing::instrument;

use shield_authz_core::{
	AttributeSet, AuthzError, Dimension, Effect, GroupingEdge, Options, Policy, PolicyId, Result,
};

use crate::adapter::{LoadedPolicies, PolicyAdapter};

fn storage_err(err: sqlx::Error) -> AuthzError {
	AuthzError::storage(err.to_string())
}

fn corrupt(column: &str, err: impl std::fmt::Display) -> AuthzError {
	AuthzError::Serialization(format!("stored {column} is invalid: {err}"))
}

/// Create a SqlitePool with WAL mode and common settings.
///
/// # Arguments
/// * `database_url` - SQLite connection string (e.g., "sqlite:./shield-authz.db")
///
/// # Errors
/// Returns `AuthzError::Storage` if the URL is invalid or connection fails.
#[instrument(skip(database_url))]
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
	let options = SqliteConnectOptions::from_str(database_url)
		.map_err(|e| AuthzError::storage(format!("invalid database URL: {e}")))?
		.journal_mode(SqliteJournalMode::Wal)
		.synchronous(SqliteSynchronous::Normal)
		.create_if_missing(true);

	let pool = SqlitePool::connect_with(options).await.map_err(storage_err)?;

	tracing::debug!("database pool created");
	Ok(pool)
}

type PolicyRow = (String, String, String, String, String, String);
type EdgeRow = (String, String, String, String);

/// [`PolicyAdapter`] backed by the `authz_policies` and `authz_groupings`
/// tables.
#[derive(Clone)]
pub struct SqlitePolicyAdapter {
	pool: SqlitePool,
}

impl SqlitePolicyAdapter {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	pub fn pool(&self) -> &SqlitePool {
		&self.pool
	}

	/// Creates the tables if they do not exist.
	#[instrument(skip(self))]
	pub async fn migrate(&self) -> Result<()> {
		sqlx::query(
			r#"
			CREATE TABLE IF NOT EXISTS authz_policies (
				id TEXT PRIMARY KEY,
				subject TEXT NOT NULL,
				resource TEXT NOT NULL,
				action TEXT NOT NULL,
				effect TEXT NOT NULL,
				options TEXT NOT NULL DEFAULT '{}',
				created_at TEXT NOT NULL
			)
			"#,
		)
		.execute(&self.pool)
		.await
		.map_err(storage_err)?;

		sqlx::query(
			r#"
			CREATE TABLE IF NOT EXISTS authz_groupings (
				kind TEXT NOT NULL,
				member TEXT NOT NULL,
				grp TEXT NOT NULL,
				options TEXT NOT NULL DEFAULT '{}',
				created_at TEXT NOT NULL,
				PRIMARY KEY (kind, member, grp)
			)
			"#,
		)
		.execute(&self.pool)
		.await
		.map_err(storage_err)?;

		tracing::debug!("authz tables ready");
		Ok(())
	}

	fn policy_from_row(row: PolicyRow) -> Result<Policy> {
		let (id, subject, resource, action, effect, options) = row;
		Ok(Policy {
			id: PolicyId::from_str(&id)?,
			subject: AttributeSet::parse_json(&subject).map_err(|e| corrupt("subject", e))?,
			resource: AttributeSet::parse_json(&resource).map_err(|e| corrupt("resource", e))?,
			action: AttributeSet::parse_json(&action).map_err(|e| corrupt("action", e))?,
			effect: Effect::from_str(&effect).map_err(|e| corrupt("effect", e))?,
			options: parse_options(&options)?,
		})
	}

	fn edge_from_row(row: EdgeRow) -> Result<GroupingEdge> {
		let (kind, member, group, options) = row;
		GroupingEdge::new(
			Dimension::from_str(&kind).map_err(|e| corrupt("kind", e))?,
			AttributeSet::parse_json(&member).map_err(|e| corrupt("member", e))?,
			AttributeSet::parse_json(&group).map_err(|e| corrupt("group", e))?,
			parse_options(&options)?,
		)
		.map_err(|e| corrupt("edge", e))
	}
}

fn parse_options(text: &str) -> Result<Options> {
	serde_json::from_str(text).map_err(|e| corrupt("options", e))
}

fn options_json(options: &Options) -> Result<String> {
	Ok(serde_json::to_string(options)?)
}

#[async_trait]
impl PolicyAdapter for SqlitePolicyAdapter {
	#[instrument(skip(self))]
	async fn load(&self) -> Result<LoadedPolicies> {
		let policy_rows = sqlx::query_as::<_, PolicyRow>(
			r#"
			SELECT id, subject, resource, action, effect, options
			FROM authz_policies
			ORDER BY rowid
			"#,
		)
		.fetch_all(&self.pool)
		.await
		.map_err(storage_err)?;

		let edge_rows = sqlx::query_as::<_, EdgeRow>(
			r#"
			SELECT kind, member, grp, options
			FROM authz_groupings
			ORDER BY rowid
			"#,
		)
		.fetch_all(&self.pool)
		.await
		.map_err(storage_err)?;

		let loaded = LoadedPolicies {
			policies: policy_rows
				.into_iter()
				.map(Self::policy_from_row)
				.collect::<Result<_>>()?,
			edges: edge_rows
				.into_iter()
				.map(Self::edge_from_row)
				.collect::<Result<_>>()?,
		};
		tracing::debug!(
			policies = loaded.policies.len(),
			edges = loaded.edges.len(),
			"policies loaded"
		);
		Ok(loaded)
	}

	#[instrument(skip(self, policy), fields(policy_id = %policy.id))]
	async fn insert_policy(&self, policy: &Policy) -> Result<()> {
		sqlx::query(
			r#"
			INSERT INTO authz_policies (id, subject, resource, action, effect, options, created_at)
			VALUES (?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(policy.id.to_string())
		.bind(policy.subject.canonical())
		.bind(policy.resource.canonical())
		.bind(policy.action.canonical())
		.bind(policy.effect.as_str())
		.bind(options_json(&policy.options)?)
		.bind(Utc::now().to_rfc3339())
		.execute(&self.pool)
		.await
		.map_err(storage_err)?;

		Ok(())
	}

	#[instrument(skip(self), fields(policy_id = %id))]
	async fn delete_policy(&self, id: PolicyId) -> Result<bool> {
		let result = sqlx::query(
			r#"
			DELETE FROM authz_policies WHERE id = ?
			"#,
		)
		.bind(id.to_string())
		.execute(&self.pool)
		.await
		.map_err(storage_err)?;

		Ok(result.rows_affected() > 0)
	}

	#[instrument(skip(self, edge), fields(kind = %edge.kind, member = %edge.member, group = %edge.group))]
	async fn insert_edge(&self, edge: &GroupingEdge) -> Result<bool> {
		let result = sqlx::query(
			r#"
			INSERT OR IGNORE INTO authz_groupings (kind, member, grp, options, created_at)
			VALUES (?, ?, ?, ?, ?)
			"#,
		)
		.bind(edge.kind.as_str())
		.bind(edge.member.canonical())
		.bind(edge.group.canonical())
		.bind(options_json(&edge.options)?)
		.bind(Utc::now().to_rfc3339())
		.execute(&self.pool)
		.await
		.map_err(storage_err)?;

		Ok(result.rows_affected() > 0)
	}

	#[instrument(skip(self, member, group), fields(member = %member, group = %group))]
	async fn delete_edge(
		&self,
		kind: Dimension,
		member: &AttributeSet,
		group: &AttributeSet,
	) -> Result<bool> {
		let result = sqlx::query(
			r#"
			DELETE FROM authz_groupings WHERE kind = ? AND member = ? AND grp = ?
			"#,
		)
		.bind(kind.as_str())
		.bind(member.canonical())
		.bind(group.canonical())
		.execute(&self.pool)
		.await
		.map_err(storage_err)?;

		Ok(result.rows_affected() > 0)
	}

	#[instrument(skip(self, edge), fields(kind = %edge.kind, member = %edge.member, group = %edge.group))]
	async fn replace_member_edges(&self, edge: &GroupingEdge) -> Result<u64> {
		let options = options_json(&edge.options)?;
		let mut tx = self.pool.begin().await.map_err(storage_err)?;

		let removed = sqlx::query(
			r#"
			DELETE FROM authz_groupings WHERE kind = ? AND member = ?
			"#,
		)
		.bind(edge.kind.as_str())
		.bind(edge.member.canonical())
		.execute(&mut *tx)
		.await
		.map_err(storage_err)?
		.rows_affected();

		sqlx::query(
			r#"
			INSERT INTO authz_groupings (kind, member, grp, options, created_at)
			VALUES (?, ?, ?, ?, ?)
			"#,
		)
		.bind(edge.kind.as_str())
		.bind(edge.member.canonical())
		.bind(edge.group.canonical())
		.bind(options)
		.bind(Utc::now().to_rfc3339())
		.execute(&mut *tx)
		.await
		.map_err(storage_err)?;

		tx.commit().await.map_err(storage_err)?;
		Ok(removed)
	}

	#[instrument(skip(self, member), fields(member = %member))]
	async fn delete_member_edges(&self, kind: Dimension, member: &AttributeSet) -> Result<u64> {
		let result = sqlx::query(
			r#"
			DELETE FROM authz_groupings WHERE kind = ? AND member = ?
			"#,
		)
		.bind(kind.as_str())
		.bind(member.canonical())
		.execute(&self.pool)
		.await
		.map_err(storage_err)?;

		Ok(result.rows_affected())
	}
}
