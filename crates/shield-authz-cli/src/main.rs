// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

mod commands;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use shield_authz::{
	create_pool, AuthzError, Dimension, GroupingResolver, PersistentEnforcer, SqlitePolicyAdapter,
};
use shield_authz_config::{AuthzConfig, LogFormat, LogLevel, LoggingConfig};
use tracing::{debug, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::commands::Command;

#[derive(Parser, Debug)]
#[command(name = "shield-authz", version, about = "Query and administer Shield authorization policies")]
struct Args {
	/// Path to a TOML config file (defaults to /etc/shield/authz.toml)
	#[arg(long, global = true)]
	config: Option<PathBuf>,

	/// Policy database URL, e.g. sqlite:./shield-authz.db
	#[arg(long, global = true)]
	database: Option<String>,

	/// Maximum grouping depth followed during evaluation
	#[arg(long, global = true)]
	max_depth: Option<usize>,

	/// Log level (error, warn, info, debug, trace)
	#[arg(long, global = true)]
	log_level: Option<String>,

	/// Output logs as JSON
	#[arg(long, global = true)]
	json_logs: bool,

	#[command(subcommand)]
	command: Command,
}

impl Args {
	fn apply_overrides(&self, config: &mut AuthzConfig) -> Result<()> {
		if let Some(url) = &self.database {
			config.database.url = url.clone();
		}
		if let Some(depth) = self.max_depth {
			anyhow::ensure!(depth > 0, "--max-depth must be at least 1");
			config.engine.max_hierarchy_depth = Some(depth);
		}
		if let Some(level) = &self.log_level {
			config.logging.level = level.parse::<LogLevel>().map_err(anyhow::Error::msg)?;
		}
		if self.json_logs {
			config.logging.format = LogFormat::Json;
		}
		Ok(())
	}
}

fn log_level_to_tracing(level: LogLevel) -> &'static str {
	match level {
		LogLevel::Error => "error",
		LogLevel::Warn => "warn",
		LogLevel::Info => "info",
		LogLevel::Debug => "debug",
		LogLevel::Trace => "trace",
	}
}

fn init_tracing(logging: &LoggingConfig) {
	let level = log_level_to_tracing(logging.level);
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
		EnvFilter::new(format!(
			"shield_authz={level},shield_authz_cli={level},shield_authz_config={level}"
		))
	});

	// stdout carries command output
	match logging.format {
		LogFormat::Json => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().json().with_writer(std::io::stderr))
				.init();
		}
		LogFormat::Compact => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().compact().with_writer(std::io::stderr))
				.init();
		}
		LogFormat::Pretty => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().with_writer(std::io::stderr))
				.init();
		}
	}
}

fn load_config(args: &Args) -> Result<AuthzConfig> {
	let mut config = match &args.config {
		Some(path) => shield_authz_config::load_config_with_file(path),
		None => shield_authz_config::load_config(),
	}
	.context("failed to load configuration")?;
	args.apply_overrides(&mut config)?;
	Ok(config)
}

async fn open_enforcer(config: &AuthzConfig) -> Result<PersistentEnforcer> {
	let pool = create_pool(&config.database.url)
		.await
		.with_context(|| format!("failed to open {}", config.database.url))?;
	let adapter = SqlitePolicyAdapter::new(pool);
	adapter
		.migrate()
		.await
		.context("failed to migrate policy tables")?;

	let resolver = GroupingResolver::with_max_depth(config.engine.max_hierarchy_depth);
	PersistentEnforcer::open(Arc::new(adapter), resolver)
		.await
		.context("failed to load policies")
}

/// Rejected input exits with 2, every other failure with 1.
fn exit_code(err: &anyhow::Error) -> i32 {
	match err.downcast_ref::<AuthzError>() {
		Some(err) if err.is_client_error() => 2,
		_ => 1,
	}
}

#[tokio::main]
async fn main() {
	if let Err(err) = run(Args::parse()).await {
		eprintln!("error: {err:#}");
		std::process::exit(exit_code(&err));
	}
}

async fn run(args: Args) -> Result<()> {
	let config = load_config(&args)?;

	init_tracing(&config.logging);
	debug!(database = %config.database.url, "starting shield-authz");

	let enforcer = open_enforcer(&config).await?;
	info!(
		policies = enforcer.policy_count(),
		edges = Dimension::ALL
			.iter()
			.map(|kind| enforcer.edge_count(*kind))
			.sum::<usize>(),
		"policy store loaded"
	);

	let output = commands::run(args.command, &enforcer).await?;
	println!("{}", serde_json::to_string_pretty(&output)?);
	Ok(())
}
