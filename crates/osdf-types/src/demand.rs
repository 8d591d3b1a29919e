//! Demands: the resources a request asks the solver to place or select.

use serde::{Deserialize, Serialize};

/// One resource instance requiring an optimization decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Demand {
	pub resource_module_name: String,
	#[serde(default)]
	pub service_resource_id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub tenant_id: Option<String>,
	#[serde(default)]
	pub resource_model_info: ResourceModelInfo,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub existing_candidates: Vec<Candidate>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub excluded_candidates: Vec<Candidate>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub required_candidates: Vec<Candidate>,
}

impl Demand {
	/// A demand with only a name and model identifiers, as built by the
	/// selection workflows.
	pub fn named(name: impl Into<String>, model: ResourceModelInfo) -> Self {
		let name = name.into();
		Self {
			service_resource_id: name.clone(),
			resource_module_name: name,
			tenant_id: None,
			resource_model_info: model,
			existing_candidates: Vec::new(),
			excluded_candidates: Vec::new(),
			required_candidates: Vec::new(),
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceModelInfo {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub model_invariant_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub model_version_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub model_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub model_type: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub model_version: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub model_customization_name: Option<String>,
}

/// A candidate named by the caller (existing, excluded or required).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
	pub identifier_type: String,
	#[serde(default)]
	pub identifiers: Vec<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub cloud_owner: Option<String>,
}
