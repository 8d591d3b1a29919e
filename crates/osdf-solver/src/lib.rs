//! Solver Service integration.
//!
//! Builds the constraint request from grouped policies, drives the
//! submit/poll protocol through a [`SolverTransport`], and translates the
//! resulting recommendations into solutions.

use async_trait::async_trait;
use osdf_policy::PolicyError;
use osdf_types::{ConstraintRequest, PlanEnvelope, SubmitResponse};
use thiserror::Error;

pub mod builder;
pub mod orchestrator;
pub mod translator;

pub mod implementations {
	pub mod http;
}

pub use builder::{ConstraintRequestBuilder, QueryContext};
pub use orchestrator::{
	OrchestrationState, OrchestratorSettings, Phase, SolverOrchestrator, SolverOutcome,
};
pub use translator::ResponseTranslator;

#[derive(Debug, Error)]
pub enum TransportError {
	#[error("HTTP request failed: {0}")]
	Http(String),
	#[error("Solver Service answered {status}: {body}")]
	Status { status: u16, body: String },
	#[error("Failed to decode Solver Service response: {0}")]
	Decode(String),
}

#[derive(Debug, Error)]
pub enum BuildError {
	#[error("Missing request info: {0}")]
	MissingRequestInfo(&'static str),
	#[error("Constraint name used by more than one policy: {0}")]
	DuplicateConstraint(String),
	#[error(transparent)]
	Policy(#[from] PolicyError),
}

#[derive(Debug, Error)]
pub enum OrchestrationError {
	#[error("Solver protocol violation: {0}")]
	ProtocolViolation(String),
	#[error("Solver Service reported an error: {0}")]
	RemoteSolver(String),
	#[error("No terminal plan status after {elapsed_secs}s (budget {budget_secs}s)")]
	BudgetExceeded { elapsed_secs: u64, budget_secs: u64 },
	#[error(transparent)]
	Transport(#[from] TransportError),
}

/// Wire access to the Solver Service.
///
/// Every call carries the request's transaction id.
#[async_trait]
pub trait SolverTransport: Send + Sync {
	/// POSTs a new plan.
	async fn submit(
		&self,
		request: &ConstraintRequest,
		transaction_id: &str,
	) -> Result<SubmitResponse, TransportError>;

	/// GETs the plan behind a follow-up link.
	async fn fetch_plan(&self, url: &str, transaction_id: &str)
		-> Result<PlanEnvelope, TransportError>;
}
