//! Command-line interface definitions.

use clap::{Parser, Subcommand};
use osdf_core::Workflow;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "osdf")]
#[command(about = "Optimization service: policy-driven placement and slice selection", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
	/// Path to configuration file
	#[arg(short, long, value_name = "FILE", default_value = "config/osdf.toml")]
	pub config: PathBuf,

	/// Log level (trace, debug, info, warn, error); overrides `service.log_level`
	#[arg(long, env = "OSDF_LOG_LEVEL")]
	pub log_level: Option<String>,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Run optimization requests and print their solutions as JSON
	Run {
		/// Workflow the requests belong to (placement, nsi, nssi, nst)
		#[arg(short, long, value_parser = parse_workflow)]
		workflow: Workflow,

		/// Request files, processed concurrently
		#[arg(short, long = "request", value_name = "FILE", required = true, num_args = 1..)]
		requests: Vec<PathBuf>,
	},

	/// Validate the configuration file
	Validate,
}

fn parse_workflow(s: &str) -> Result<Workflow, String> {
	s.parse::<Workflow>().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
	use super::*;
	use clap::CommandFactory;

	#[test]
	fn test_cli_is_well_formed() {
		Args::command().debug_assert();
	}

	#[test]
	fn test_run_with_multiple_requests() {
		let args = Args::try_parse_from([
			"osdf",
			"-c",
			"custom.toml",
			"run",
			"--workflow",
			"nssi",
			"--request",
			"a.json",
			"b.json",
		])
		.unwrap();
		assert_eq!(args.config, PathBuf::from("custom.toml"));
		assert_eq!(args.log_level, None);
		match args.command {
			Command::Run { workflow, requests } => {
				assert_eq!(workflow, Workflow::NssiSelection);
				assert_eq!(requests.len(), 2);
			}
			other => panic!("unexpected command: {:?}", other),
		}
	}

	#[test]
	fn test_unknown_workflow_rejected() {
		assert!(Args::try_parse_from(["osdf", "run", "-w", "pci", "-r", "a.json"]).is_err());
	}
}
