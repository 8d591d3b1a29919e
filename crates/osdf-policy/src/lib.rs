//! Policy handling for the optimization pipeline.
//!
//! Policies are fetched from a [`PolicyProvider`], parsed, grouped by
//! (type, resource) and then matched against the demands of a request.

use async_trait::async_trait;
use osdf_types::RawPolicy;
use serde_json::Value;
use thiserror::Error;

pub mod grouper;
pub mod matcher;
pub mod parse;
pub mod payload;

pub mod implementations {
	pub mod file;
	pub mod memory;
}

pub use grouper::{GroupedPolicy, PolicyGroup, PolicyGrouper, PolicyGroups};
pub use matcher::{resolve_demands, MatchType, PolicyMatcher, ResultShape};
pub use payload::PolicyPayload;

#[derive(Debug, Error)]
pub enum PolicyError {
	/// One or more policy records could not be parsed.
	#[error("Unparsable policy config in: {}", .0.join(", "))]
	Configuration(Vec<String>),
	/// A policy's type-specific section is missing or malformed.
	#[error("Malformed payload in policy {identity}: {reason}")]
	Payload { identity: String, reason: String },
	#[error("Policy provider error: {0}")]
	Provider(String),
}

/// Policies returned for one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicySet {
	pub policies: Vec<RawPolicy>,
	/// Provisioning status reported alongside the policies.
	pub prov_status: Option<String>,
}

/// Source of the policies governing a request.
#[async_trait]
pub trait PolicyProvider: Send + Sync {
	async fn get_policies(
		&self,
		request: &Value,
		service_type: &str,
	) -> Result<PolicySet, PolicyError>;
}

/// Grouped policies plus the provisioning status they came with.
#[derive(Debug, Clone, Default)]
pub struct ResolvedPolicies {
	pub groups: PolicyGroups,
	pub prov_status: Option<String>,
}

/// Fetches and groups policies through a provider.
pub struct PolicyService {
	provider: Box<dyn PolicyProvider>,
	grouper: PolicyGrouper,
}

impl PolicyService {
	pub fn new(provider: Box<dyn PolicyProvider>) -> Self {
		Self {
			provider,
			grouper: PolicyGrouper::new(),
		}
	}

	pub async fn resolve(
		&self,
		request: &Value,
		service_type: &str,
	) -> Result<ResolvedPolicies, PolicyError> {
		let set = self.provider.get_policies(request, service_type).await?;
		let groups = self.grouper.group_raw(&set.policies)?;
		tracing::info!(
			service_type,
			received = set.policies.len(),
			kept = groups.len(),
			"Policies resolved"
		);
		Ok(ResolvedPolicies {
			groups,
			prov_status: set.prov_status,
		})
	}
}

/// Builds the provider selected by configuration.
pub fn create_provider(config: &osdf_config::PolicyConfig) -> Box<dyn PolicyProvider> {
	match config.backend {
		osdf_config::PolicyBackend::File => Box::new(
			implementations::file::FilePolicyProvider::new(config.path.clone()),
		),
		osdf_config::PolicyBackend::Memory => {
			Box::new(implementations::memory::MemoryPolicyProvider::new())
		}
	}
}
