//! The constraint request submitted to the Solver Service.

use crate::demand::Candidate;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Map, Value};

/// Request-level identifiers and limits supplied by the northbound caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestInfo {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub transaction_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub request_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub callback_url: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub source_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub request_type: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub num_solutions: Option<u32>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub optimizers: Vec<String>,
	/// Client timeout in seconds.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub timeout: Option<u64>,
}

/// Candidate reference in the Solver Service's vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRef {
	pub inventory_type: String,
	pub candidate_id: Vec<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub cloud_owner: Option<String>,
}

impl From<&Candidate> for CandidateRef {
	fn from(candidate: &Candidate) -> Self {
		Self {
			inventory_type: candidate.identifier_type.clone(),
			candidate_id: candidate.identifiers.clone(),
			cloud_owner: candidate.cloud_owner.clone(),
		}
	}
}

/// Inventory query for one demand, derived from one vnf-policy property object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandProperty {
	pub inventory_provider: String,
	pub inventory_type: String,
	pub service_type: String,
	pub service_resource_id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub unique: Option<Value>,
	#[serde(default)]
	pub attributes: Map<String, Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub passthrough_attributes: Option<Map<String, Value>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub excluded_candidates: Option<Vec<CandidateRef>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub required_candidates: Option<Vec<CandidateRef>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub existing_placement: Option<Vec<CandidateRef>>,
}

/// A policy paired with the demands it governs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedPolicyEntry {
	pub resource_identity: String,
	pub constraint_type: String,
	/// Never empty for an emitted entry.
	pub demand_names: Vec<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub properties: Option<Value>,
	/// Set when the entry was expanded from a default (unscoped) policy.
	#[serde(default)]
	pub from_default: bool,
}

impl MatchedPolicyEntry {
	/// Key of this entry in the wire `constraints` object.
	///
	/// Default policies are expanded one entry per demand, so those entries are
	/// suffixed with the demand name to keep keys unique.
	pub fn constraint_name(&self) -> String {
		match (self.from_default, self.demand_names.as_slice()) {
			(true, [demand]) => format!("{}_{}", self.resource_identity, demand),
			_ => self.resource_identity.clone(),
		}
	}

	fn to_wire(&self) -> Value {
		let mut body = Map::new();
		body.insert("type".to_string(), json!(self.constraint_type));
		body.insert("demands".to_string(), json!(self.demand_names));
		if let Some(properties) = &self.properties {
			body.insert("properties".to_string(), properties.clone());
		}
		Value::Object(body)
	}
}

/// Canonical payload sent to the Solver Service. Built once, never mutated
/// after submission.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintRequest {
	pub name: String,
	pub timeout: u64,
	pub limit: u32,
	/// Demand name to inventory queries, in the order demands were supplied.
	pub demands: Vec<(String, Vec<DemandProperty>)>,
	pub policies: Vec<MatchedPolicyEntry>,
	/// One `{objective: {operator: [terms]}}` object per optimization policy.
	pub optimization_policies: Vec<Value>,
	pub request_parameters: Map<String, Value>,
}

impl ConstraintRequest {
	pub const TEMPLATE_VERSION: &'static str = "2017-10-10";

	pub fn demand(&self, name: &str) -> Option<&[DemandProperty]> {
		self.demands
			.iter()
			.find(|(demand, _)| demand == name)
			.map(|(_, props)| props.as_slice())
	}

	/// Entries governing `demand`, compared case-insensitively.
	pub fn policies_for<'a>(&'a self, demand: &'a str) -> impl Iterator<Item = &'a MatchedPolicyEntry> {
		self.policies.iter().filter(move |entry| {
			entry
				.demand_names
				.iter()
				.any(|name| name.eq_ignore_ascii_case(demand))
		})
	}

	/// JSON body of the submit call.
	pub fn to_wire(&self) -> Value {
		let mut demands = Map::new();
		for (name, props) in &self.demands {
			demands.insert(name.clone(), json!(props));
		}

		let mut constraints = Map::new();
		for entry in &self.policies {
			constraints.insert(entry.constraint_name(), entry.to_wire());
		}

		let mut optimization = Map::new();
		for policy in &self.optimization_policies {
			if let Value::Object(objective) = policy {
				optimization.extend(objective.clone());
			}
		}

		let mut template = Map::new();
		template.insert(
			"homing_template_version".to_string(),
			json!(Self::TEMPLATE_VERSION),
		);
		template.insert(
			"parameters".to_string(),
			Value::Object(self.request_parameters.clone()),
		);
		if self.request_parameters.contains_key("customer_lat")
			&& self.request_parameters.contains_key("customer_long")
		{
			template.insert(
				"locations".to_string(),
				json!({
					"customer_loc": {
						"latitude": { "get_param": "customer_lat" },
						"longitude": { "get_param": "customer_long" }
					}
				}),
			);
		}
		template.insert("demands".to_string(), Value::Object(demands));
		template.insert("constraints".to_string(), Value::Object(constraints));
		template.insert("optimization".to_string(), Value::Object(optimization));

		json!({
			"name": self.name,
			"files": {},
			"timeout": self.timeout,
			"limit": self.limit,
			"num_solution": self.limit.to_string(),
			"template": Value::Object(template),
		})
	}
}

impl Serialize for ConstraintRequest {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		self.to_wire().serialize(serializer)
	}
}
