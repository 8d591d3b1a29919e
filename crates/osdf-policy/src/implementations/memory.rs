//! In-memory policy provider.

use crate::{PolicyError, PolicyProvider, PolicySet};
use async_trait::async_trait;
use osdf_types::RawPolicy;
use serde_json::Value;
use std::collections::HashMap;

/// Fixed policy sets keyed by service type. Unknown service types yield an
/// empty set.
#[derive(Debug, Clone, Default)]
pub struct MemoryPolicyProvider {
	sets: HashMap<String, PolicySet>,
}

impl MemoryPolicyProvider {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_policies(mut self, service_type: impl Into<String>, policies: Vec<RawPolicy>) -> Self {
		self.sets.entry(service_type.into()).or_default().policies = policies;
		self
	}

	pub fn with_prov_status(
		mut self,
		service_type: impl Into<String>,
		prov_status: impl Into<String>,
	) -> Self {
		self.sets.entry(service_type.into()).or_default().prov_status = Some(prov_status.into());
		self
	}
}

#[async_trait]
impl PolicyProvider for MemoryPolicyProvider {
	async fn get_policies(
		&self,
		_request: &Value,
		service_type: &str,
	) -> Result<PolicySet, PolicyError> {
		Ok(self.sets.get(service_type).cloned().unwrap_or_default())
	}
}
