use anyhow::{bail, Context, Result};
use clap::Parser;
use osdf_config::{ConfigLoader, OsdfConfig};
use osdf_core::{EngineBuilder, Workflow, WorkerPool};
use osdf_types::SolutionEnvelope;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;

use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();

	let config = ConfigLoader::new()
		.with_file(&args.config)
		.load()
		.await
		.with_context(|| format!("Failed to load configuration from {:?}", args.config))?;
	setup_tracing(log_level(args.log_level.as_deref(), &config))?;
	info!("Loaded configuration from: {:?}", args.config);

	match args.command {
		Command::Run { workflow, requests } => run_requests(config, workflow, &requests).await,
		Command::Validate => validate_config(&config),
	}
}

/// The command line wins over the configured level.
fn log_level<'a>(cli: Option<&'a str>, config: &'a OsdfConfig) -> &'a str {
	cli.unwrap_or(&config.service.log_level)
}

async fn run_requests(config: OsdfConfig, workflow: Workflow, requests: &[PathBuf]) -> Result<()> {
	info!(service = %config.service.name, %workflow, "Starting optimization run");

	let pool = WorkerPool::new(config.service.max_concurrent_requests);
	let engine = Arc::new(
		EngineBuilder::new()
			.with_config(config)
			.build()
			.context("Failed to build optimization engine")?,
	);

	let mut handles = Vec::with_capacity(requests.len());
	for path in requests {
		let request = read_request(path).await?;
		handles.push(engine.spawn(&pool, workflow, request));
	}

	let results = tokio::select! {
		results = futures::future::join_all(handles) => results,
		_ = setup_shutdown_signal() => {
			warn!("Shutdown signal received, abandoning queued requests");
			pool.close();
			bail!("Interrupted before all requests completed");
		}
	};

	let mut failures = 0;
	for (path, result) in requests.iter().zip(results) {
		match result {
			Ok(Some(Ok(envelope))) => print_envelope(&envelope)?,
			Ok(Some(Err(e))) => {
				failures += 1;
				error!(request = ?path, error = %e, "Request failed");
			}
			Ok(None) => {
				failures += 1;
				warn!(request = ?path, "Request was not started");
			}
			Err(e) => {
				failures += 1;
				error!(request = ?path, error = %e, "Request task panicked");
			}
		}
	}

	if failures > 0 {
		bail!("{} of {} requests failed", failures, requests.len());
	}
	info!("All {} requests completed", requests.len());
	Ok(())
}

async fn read_request(path: &Path) -> Result<Value> {
	let content = tokio::fs::read_to_string(path)
		.await
		.with_context(|| format!("Failed to read request file {:?}", path))?;
	serde_json::from_str(&content).with_context(|| format!("Request file {:?} is not valid JSON", path))
}

fn print_envelope(envelope: &SolutionEnvelope) -> Result<()> {
	let rendered = serde_json::to_string_pretty(envelope).context("Failed to serialize solution")?;
	println!("{}", rendered);
	Ok(())
}

fn validate_config(config: &OsdfConfig) -> Result<()> {
	info!("Configuration is valid");
	info!("Service name: {}", config.service.name);
	info!("Solver URL: {}", config.solver.url);
	info!(
		"Polling: every {}s, at most {} times",
		config.solver.ping_wait_secs, config.solver.max_retries
	);
	info!("Policy backend: {:?}", config.policy.backend);
	Ok(())
}

fn setup_tracing(log_level: &str) -> Result<()> {
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

	tracing_subscriber::registry()
		.with(env_filter)
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.init();

	Ok(())
}

async fn setup_shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = signal::ctrl_c().await {
			error!("Failed to listen for Ctrl+C: {}", e);
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match signal::unix::signal(signal::unix::SignalKind::terminate()) {
			Ok(mut stream) => {
				stream.recv().await;
			}
			Err(e) => {
				error!("Failed to install SIGTERM handler: {}", e);
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}
}
