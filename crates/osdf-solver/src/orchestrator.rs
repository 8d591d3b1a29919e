//! Submit / follow-up / poll protocol with the Solver Service.
//!
//! One HTTP call is in flight at a time and polling runs at a fixed interval
//! without backoff. The loop ends on a terminal plan status or once the time
//! budget, `min(client timeout, max retries * ping wait)`, is spent.

use crate::{OrchestrationError, SolverTransport};
use osdf_config::SolverServiceConfig;
use osdf_types::{ConstraintRequest, Plan, PlanStatus, Recommendation, SubmitResponse};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorSettings {
	pub ping_wait: Duration,
	pub max_retries: u32,
	pub settle_delay: Duration,
}

impl From<&SolverServiceConfig> for OrchestratorSettings {
	fn from(config: &SolverServiceConfig) -> Self {
		Self {
			ping_wait: config.ping_wait(),
			max_retries: config.max_retries,
			settle_delay: config.settle_delay(),
		}
	}
}

impl OrchestratorSettings {
	pub fn budget(&self, client_timeout: Duration) -> Duration {
		client_timeout.min(self.ping_wait.saturating_mul(self.max_retries))
	}
}

/// Protocol phase of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
	Submitting,
	Polling,
	Done,
	NotFound,
	Error,
	TimedOut,
}

/// Progress of one run, owned by the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestrationState {
	pub phase: Phase,
	pub status: PlanStatus,
	pub next_poll_url: Option<String>,
	/// Time spent in the poll loop, counted in ping-wait steps.
	pub elapsed: Duration,
	pub polls: u32,
	pub recommendations: Vec<Recommendation>,
	pub message: Option<String>,
}

impl OrchestrationState {
	fn new() -> Self {
		Self {
			phase: Phase::Submitting,
			status: PlanStatus::Template,
			next_poll_url: None,
			elapsed: Duration::ZERO,
			polls: 0,
			recommendations: Vec::new(),
			message: None,
		}
	}

	/// Records a plan; keeps the previous poll URL when the plan has no links.
	fn apply(&mut self, plan: &Plan) {
		self.status = plan.status;
		if let Some(url) = plan.next_url() {
			self.next_poll_url = Some(url.to_string());
		}
		if plan.message.is_some() {
			self.message = plan.message.clone();
		}
		if let Some(recommendations) = &plan.recommendations {
			self.recommendations = recommendations.clone();
		}
	}
}

/// Result of a run that reached `done` or `not found`.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverOutcome {
	pub status: PlanStatus,
	pub recommendations: Vec<Recommendation>,
	pub message: Option<String>,
	pub polls: u32,
}

pub struct SolverOrchestrator {
	transport: Arc<dyn SolverTransport>,
	settings: OrchestratorSettings,
}

impl SolverOrchestrator {
	pub fn new(transport: Arc<dyn SolverTransport>, settings: OrchestratorSettings) -> Self {
		Self {
			transport,
			settings,
		}
	}

	pub fn settings(&self) -> &OrchestratorSettings {
		&self.settings
	}

	pub async fn run(
		&self,
		request: &ConstraintRequest,
		transaction_id: &str,
		client_timeout: Duration,
	) -> Result<SolverOutcome, OrchestrationError> {
		let budget = self.settings.budget(client_timeout);
		let mut state = OrchestrationState::new();

		let submitted = self.transport.submit(request, transaction_id).await?;
		let follow_up = accept_submission(&submitted)?;
		info!(
			transaction_id,
			plan = %request.name,
			budget_secs = budget.as_secs(),
			"Plan submitted"
		);

		tokio::time::sleep(self.settings.settle_delay).await;
		let envelope = self.transport.fetch_plan(&follow_up, transaction_id).await?;
		let plan = envelope.first_plan().ok_or_else(|| {
			OrchestrationError::ProtocolViolation("follow-up response has no plans".to_string())
		})?;
		state.next_poll_url = Some(follow_up);
		state.apply(plan);
		if state.status == PlanStatus::Error {
			state.phase = Phase::Error;
			return Err(remote_error(&state));
		}
		state.phase = Phase::Polling;

		while !state.status.is_terminal() {
			if state.elapsed >= budget {
				state.phase = Phase::TimedOut;
				warn!(
					transaction_id,
					polls = state.polls,
					elapsed_secs = state.elapsed.as_secs(),
					"Solver budget exhausted"
				);
				return Err(OrchestrationError::BudgetExceeded {
					elapsed_secs: state.elapsed.as_secs(),
					budget_secs: budget.as_secs(),
				});
			}

			tokio::time::sleep(self.settings.ping_wait).await;
			state.elapsed += self.settings.ping_wait;
			state.polls += 1;

			let Some(url) = state.next_poll_url.clone() else {
				return Err(OrchestrationError::ProtocolViolation(
					"no poll URL available".to_string(),
				));
			};
			match self.transport.fetch_plan(&url, transaction_id).await {
				Ok(envelope) => match envelope.first_plan() {
					Some(plan) => {
						state.apply(plan);
						debug!(transaction_id, poll = state.polls, status = %plan.status.as_str(), "Polled plan");
					}
					None => warn!(transaction_id, poll = state.polls, "Poll response has no plans"),
				},
				Err(e) => warn!(transaction_id, poll = state.polls, error = %e, "Poll failed, retrying"),
			}
		}

		match state.status {
			PlanStatus::Error => {
				state.phase = Phase::Error;
				Err(remote_error(&state))
			}
			status => {
				state.phase = if status == PlanStatus::NotFound {
					Phase::NotFound
				} else {
					Phase::Done
				};
				info!(
					transaction_id,
					status = status.as_str(),
					polls = state.polls,
					recommendations = state.recommendations.len(),
					"Plan finished"
				);
				Ok(SolverOutcome {
					status,
					recommendations: state.recommendations,
					message: state.message,
					polls: state.polls,
				})
			}
		}
	}
}

fn accept_submission(response: &SubmitResponse) -> Result<String, OrchestrationError> {
	if response.status != SubmitResponse::TEMPLATE_STATUS {
		return Err(OrchestrationError::ProtocolViolation(format!(
			"submit answered with status '{}'",
			response.status
		)));
	}
	response
		.follow_up_url()
		.map(str::to_string)
		.ok_or_else(|| {
			OrchestrationError::ProtocolViolation("submit response has no follow-up link".to_string())
		})
}

fn remote_error(state: &OrchestrationState) -> OrchestrationError {
	OrchestrationError::RemoteSolver(
		state
			.message
			.clone()
			.unwrap_or_else(|| "no message from Solver Service".to_string()),
	)
}
