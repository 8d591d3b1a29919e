use osdf_config::ConfigError;
use osdf_policy::PolicyError;
use osdf_solver::{BuildError, OrchestrationError, TransportError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkflowError {
	#[error("Configuration error: {0}")]
	Config(#[from] ConfigError),

	#[error("Invalid request: {0}")]
	InvalidRequest(String),

	#[error("Policy error: {0}")]
	Policy(#[from] PolicyError),

	#[error("Build error: {0}")]
	Build(#[from] BuildError),

	#[error("Orchestration error: {0}")]
	Orchestration(#[from] OrchestrationError),

	#[error("Transport error: {0}")]
	Transport(#[from] TransportError),
}
