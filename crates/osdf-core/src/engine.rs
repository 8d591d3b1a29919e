//! The optimization pipeline shared by every workflow.

use crate::pool::WorkerPool;
use crate::workflows::Workflow;
use crate::WorkflowError;
use osdf_config::{ConfigError, OsdfConfig};
use osdf_policy::{create_provider, PolicyProvider, PolicyService};
use osdf_solver::implementations::http::HttpSolverTransport;
use osdf_solver::{
	ConstraintRequestBuilder, OrchestratorSettings, QueryContext, ResponseTranslator,
	SolverOrchestrator, SolverTransport,
};
use osdf_types::SolutionEnvelope;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, instrument};
use uuid::Uuid;

/// Which slice component a slice selection request picks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceSelection {
	Nsi,
	Nssi,
}

impl SliceSelection {
	pub fn workflow(&self) -> Workflow {
		match self {
			SliceSelection::Nsi => Workflow::NsiSelection,
			SliceSelection::Nssi => Workflow::NssiSelection,
		}
	}
}

/// Policies, constraint request, solver run and translation, in that order.
pub struct OptimizationEngine {
	policies: PolicyService,
	builder: ConstraintRequestBuilder,
	orchestrator: SolverOrchestrator,
	translator: ResponseTranslator,
}

impl OptimizationEngine {
	pub async fn process_placement(&self, request: &Value) -> Result<SolutionEnvelope, WorkflowError> {
		self.process(Workflow::Placement, request).await
	}

	pub async fn process_slice_selection(
		&self,
		selection: SliceSelection,
		request: &Value,
	) -> Result<SolutionEnvelope, WorkflowError> {
		self.process(selection.workflow(), request).await
	}

	pub async fn process_nst_selection(&self, request: &Value) -> Result<SolutionEnvelope, WorkflowError> {
		self.process(Workflow::NstSelection, request).await
	}

	#[instrument(skip_all, fields(workflow = %workflow))]
	pub async fn process(
		&self,
		workflow: Workflow,
		request: &Value,
	) -> Result<SolutionEnvelope, WorkflowError> {
		let input = workflow.extract(request)?;
		let transaction_id = input
			.request_info
			.transaction_id
			.clone()
			.unwrap_or_else(|| Uuid::new_v4().to_string());
		info!(
			transaction_id = %transaction_id,
			request_id = ?input.request_info.request_id,
			demands = input.demands.len(),
			"Processing optimization request"
		);

		let resolved = self.policies.resolve(request, workflow.service_type()).await?;
		let query = QueryContext::new(request, workflow.param_root())
			.with_prov_status(resolved.prov_status.as_deref());
		let constraint_request =
			self.builder
				.build(&input.request_info, &input.demands, &resolved.groups, query)?;

		let outcome = self
			.orchestrator
			.run(
				&constraint_request,
				&transaction_id,
				Duration::from_secs(constraint_request.timeout),
			)
			.await?;

		let envelope = self
			.translator
			.translate(&outcome, &constraint_request.name, &transaction_id);
		info!(
			transaction_id = %transaction_id,
			status = %envelope.request_status,
			solutions = envelope.solutions.placement_solutions.len(),
			"Optimization request finished"
		);
		Ok(envelope)
	}

	/// Runs one request on the pool. Resolves to `None` if the pool was closed
	/// before the request started.
	pub fn spawn(
		self: &Arc<Self>,
		pool: &WorkerPool,
		workflow: Workflow,
		request: Value,
	) -> JoinHandle<Option<Result<SolutionEnvelope, WorkflowError>>> {
		let engine = Arc::clone(self);
		pool.spawn(async move { engine.process(workflow, &request).await })
	}
}

/// Assembles an [`OptimizationEngine`] from configuration, with optional
/// provider and transport overrides.
#[derive(Default)]
pub struct EngineBuilder {
	config: Option<OsdfConfig>,
	provider: Option<Box<dyn PolicyProvider>>,
	transport: Option<Arc<dyn SolverTransport>>,
}

impl EngineBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_config(mut self, config: OsdfConfig) -> Self {
		self.config = Some(config);
		self
	}

	pub fn with_policy_provider(mut self, provider: Box<dyn PolicyProvider>) -> Self {
		self.provider = Some(provider);
		self
	}

	pub fn with_transport(mut self, transport: Arc<dyn SolverTransport>) -> Self {
		self.transport = Some(transport);
		self
	}

	pub fn build(self) -> Result<OptimizationEngine, WorkflowError> {
		let config = self.config.ok_or_else(|| {
			ConfigError::ValidationError("No configuration provided".to_string())
		})?;

		let provider = match self.provider {
			Some(provider) => provider,
			None => create_provider(&config.policy),
		};
		let transport: Arc<dyn SolverTransport> = match self.transport {
			Some(transport) => transport,
			None => Arc::new(HttpSolverTransport::new(&config.solver)?),
		};

		Ok(OptimizationEngine {
			policies: PolicyService::new(provider),
			builder: ConstraintRequestBuilder::new(config.builder.clone()),
			orchestrator: SolverOrchestrator::new(
				transport,
				OrchestratorSettings::from(&config.solver),
			),
			translator: ResponseTranslator::new(config.translation.clone()),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use osdf_config::{parse_config, ConfigFormat};
	use osdf_policy::implementations::memory::MemoryPolicyProvider;
	use osdf_solver::{OrchestrationError, TransportError};
	use osdf_types::{ConstraintRequest, PlanEnvelope, RawPolicy, SubmitResponse};
	use serde_json::json;
	use std::sync::Mutex;

	/// Accepts any plan and answers the follow-up with a fixed plan.
	struct FixedTransport {
		plan: Value,
		submitted: Mutex<Vec<(Value, String)>>,
	}

	impl FixedTransport {
		fn new(plan: Value) -> Arc<Self> {
			Arc::new(Self {
				plan,
				submitted: Mutex::new(Vec::new()),
			})
		}
	}

	#[async_trait]
	impl SolverTransport for FixedTransport {
		async fn submit(
			&self,
			request: &ConstraintRequest,
			transaction_id: &str,
		) -> Result<SubmitResponse, TransportError> {
			self.submitted
				.lock()
				.unwrap()
				.push((request.to_wire(), transaction_id.to_string()));
			Ok(serde_json::from_value(
				json!({"status": "template", "links": [[{"href": "http://solver/plans/1"}]]}),
			)
			.unwrap())
		}

		async fn fetch_plan(
			&self,
			_url: &str,
			_transaction_id: &str,
		) -> Result<PlanEnvelope, TransportError> {
			Ok(serde_json::from_value(json!({ "plans": [self.plan.clone()] })).unwrap())
		}
	}

	fn config() -> OsdfConfig {
		parse_config(
			"[solver]\nurl = \"http://solver/v1/plans\"\nping_wait_secs = 5\n\n[policy]\nbackend = \"memory\"\n",
			ConfigFormat::Toml,
		)
		.unwrap()
	}

	fn raw(name: &str, config: Value) -> RawPolicy {
		RawPolicy {
			policy_name: name.to_string(),
			config: config.to_string(),
			priority: None,
		}
	}

	fn placement_policies() -> MemoryPolicyProvider {
		MemoryPolicyProvider::new()
			.with_policies(
				"placement",
				vec![
					raw(
						"vnf",
						json!({"type": "vnfPolicy", "content": {
							"resources": [],
							"vnfProperties": [{"inventoryProvider": "aai", "inventoryType": "cloud", "serviceType": "vCPE"}]
						}}),
					),
					raw(
						"attr_default",
						json!({"type": "attribute", "content": {
							"cloudAttributeProperty": {"cloudVersion": "1.1"}
						}}),
					),
					raw(
						"attr_vG",
						json!({"type": "attribute", "content": {
							"resources": ["vG"],
							"cloudAttributeProperty": {"cloudVersion": "2.0"}
						}}),
					),
				],
			)
			.with_prov_status("placement", "prov")
	}

	fn placement_request() -> Value {
		json!({
			"requestInfo": {"transactionId": "tx-9", "requestId": "req-9", "numSolutions": 1, "timeout": 600},
			"placementInfo": {
				"placementDemands": [
					{"resourceModuleName": "vG", "serviceResourceId": "vG-srv"},
					{"resourceModuleName": "vGMux", "serviceResourceId": "vGMux-srv"},
					{"resourceModuleName": "vFW", "serviceResourceId": "vFW-srv"}
				],
				"requestParameters": {"customerLatitude": 32.89, "customerLongitude": -97.04}
			}
		})
	}

	#[tokio::test(start_paused = true)]
	async fn test_placement_end_to_end() {
		let transport = FixedTransport::new(json!({
			"status": "done",
			"recommendations": [{
				"vG": {"candidate": {"inventory_type": "cloud", "candidate_id": "RegionOne", "cloud_owner": "CO"}, "attributes": {"physical-location-id": "clli"}}
			}]
		}));
		let engine = EngineBuilder::new()
			.with_config(config())
			.with_policy_provider(Box::new(placement_policies()))
			.with_transport(transport.clone())
			.build()
			.unwrap();

		let envelope = engine.process_placement(&placement_request()).await.unwrap();
		assert_eq!(envelope.transaction_id, "tx-9");
		assert_eq!(envelope.request_id, "req-9");
		assert_eq!(envelope.request_status, "completed");
		assert_eq!(
			envelope.solutions.placement_solutions[0][0].solution.identifiers,
			vec!["RegionOne"]
		);

		let submitted = transport.submitted.lock().unwrap();
		let (wire, transaction_id) = &submitted[0];
		assert_eq!(transaction_id, "tx-9");
		let constraints = wire["template"]["constraints"].as_object().unwrap();
		let mut names: Vec<&str> = constraints.keys().map(String::as_str).collect();
		names.sort();
		assert_eq!(names, vec!["attr_default_vFW", "attr_default_vGMux", "attr_vG"]);
		assert_eq!(
			constraints["attr_vG"]["properties"]["evaluate"]["cloud_version"],
			"2.0"
		);
		assert_eq!(wire["template"]["parameters"]["prov_status"], "prov");
		assert_eq!(wire["template"]["demands"].as_object().unwrap().len(), 3);
	}

	#[tokio::test(start_paused = true)]
	async fn test_remote_error_surfaces() {
		let transport = FixedTransport::new(json!({"status": "error", "message": "bad template"}));
		let engine = EngineBuilder::new()
			.with_config(config())
			.with_policy_provider(Box::new(placement_policies()))
			.with_transport(transport)
			.build()
			.unwrap();

		let err = engine.process_placement(&placement_request()).await.unwrap_err();
		assert!(matches!(
			err,
			WorkflowError::Orchestration(OrchestrationError::RemoteSolver(ref msg)) if msg == "bad template"
		));
	}

	#[tokio::test(start_paused = true)]
	async fn test_nst_selection_without_transaction_id() {
		let transport = FixedTransport::new(json!({"status": "not found", "message": "No NST"}));
		let engine = Arc::new(
			EngineBuilder::new()
				.with_config(config())
				.with_transport(transport.clone())
				.build()
				.unwrap(),
		);
		let pool = WorkerPool::new(2);
		let request = json!({
			"requestInfo": {"requestId": "req-nst", "numSolutions": 1, "timeout": 60},
			"serviceProfile": {"latency": 20}
		});

		let envelope = engine
			.spawn(&pool, Workflow::NstSelection, request)
			.await
			.unwrap()
			.unwrap()
			.unwrap();
		assert!(!envelope.has_solutions());
		assert_eq!(envelope.status_message, "No NST");
		assert!(Uuid::parse_str(&envelope.transaction_id).is_ok());
	}

	#[tokio::test]
	async fn test_build_requires_config() {
		assert!(matches!(
			EngineBuilder::new().build(),
			Err(WorkflowError::Config(_))
		));
	}
}
