// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Zoneward identity server binary.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use zoneward_server::{
	create_app_state, create_pool, create_scheduler, run_migrations, sweep_expired_codes,
};
use zoneward_server_config::{LogFormat, LoggingConfig, ServerConfig};

/// Zoneward server - multi-tenant identity trust core.
#[derive(Parser, Debug)]
#[command(name = "zoneward-server", about = "Zoneward identity server", version)]
struct Args {
	/// Config file to load instead of /etc/zoneward/server.toml
	#[arg(long, short = 'c', env = "ZONEWARD_SERVER_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Run the background reaper until interrupted (default)
	Serve,
	/// Delete expired codes once and exit
	Sweep,
	/// Show version information
	Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();
	let command = args.command.unwrap_or(Command::Serve);

	if let Command::Version = command {
		println!("zoneward-server version: {}", env!("CARGO_PKG_VERSION"));
		return Ok(());
	}

	let config = match &args.config {
		Some(path) => zoneward_server_config::load_config_with_file(path),
		None => zoneward_server_config::load_config(),
	}
	.context("failed to load configuration")?;

	init_tracing(&config.logging);
	config.log_summary();

	match command {
		Command::Serve => serve(config).await,
		Command::Sweep => sweep(config).await,
		Command::Version => Ok(()),
	}
}

fn init_tracing(logging: &LoggingConfig) {
	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

	let registry = tracing_subscriber::registry().with(filter);
	match logging.format {
		LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
		LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
	}
}

async fn open_database(config: &ServerConfig) -> anyhow::Result<sqlx::SqlitePool> {
	let pool = create_pool(&config.database.url, config.database.max_connections)
		.await
		.with_context(|| format!("failed to open database {}", config.database.url))?;
	run_migrations(&pool)
		.await
		.context("failed to run database migrations")?;
	Ok(pool)
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
	tracing::info!(database = %config.database.url, "starting zoneward-server");

	let pool = open_database(&config).await?;
	let state = create_app_state(pool, &config);
	let scheduler = create_scheduler(&state, &config);
	scheduler.start().await;

	tokio::signal::ctrl_c()
		.await
		.context("failed to listen for shutdown signal")?;

	tracing::info!("shutdown signal received");
	scheduler.shutdown().await;

	let health = scheduler.health_status().await;
	for job in &health.jobs {
		tracing::info!(
			job_id = %job.job_id,
			status = ?job.status,
			consecutive_failures = job.consecutive_failures,
			last_run = ?job.last_run.as_ref().map(|run| run.status),
			"job health at shutdown"
		);
	}
	tracing::info!(status = ?health.status, "scheduler stopped");
	state.pool.close().await;
	Ok(())
}

async fn sweep(config: ServerConfig) -> anyhow::Result<()> {
	let pool = open_database(&config).await?;
	let state = create_app_state(pool, &config);
	let scheduler = create_scheduler(&state, &config);

	let swept = sweep_expired_codes(&scheduler)
		.await
		.context("failed to sweep expired codes")?;

	tracing::info!(swept, "expired codes swept");
	println!("{swept}");
	state.pool.close().await;
	Ok(())
}
