//! Assembly of the constraint request.

use crate::BuildError;
use osdf_config::BuilderConfig;
use osdf_policy::payload::{OptimizationPayload, VnfProperty};
use osdf_policy::{
	resolve_demands, MatchType, PolicyGroups, PolicyMatcher, PolicyPayload, ResultShape,
};
use osdf_types::{
	Candidate, CandidateRef, ConstraintRequest, Demand, DemandProperty, Policy, PolicyKind,
	RequestInfo,
};
use serde_json::{json, Map, Value};
use std::collections::HashSet;

/// Objective parameters evaluated on a single demand.
const SINGLE_DEMAND_PARAMETERS: [&str; 2] = ["cloud_version", "hpa_score"];
const DEFAULT_CUSTOMER_LOCATION: &str = "customer_loc";

/// Where request parameters are looked up.
#[derive(Debug, Clone, Copy)]
pub struct QueryContext<'a> {
	/// The raw northbound request.
	pub request: &'a Value,
	/// Dotted path of the workflow's parameter object inside `request`.
	pub param_root: &'a str,
	pub prov_status: Option<&'a str>,
}

impl<'a> QueryContext<'a> {
	pub fn new(request: &'a Value, param_root: &'a str) -> Self {
		Self {
			request,
			param_root,
			prov_status: None,
		}
	}

	pub fn with_prov_status(mut self, prov_status: Option<&'a str>) -> Self {
		self.prov_status = prov_status;
		self
	}

	/// Resolves `path` from the request root, then relative to the parameter root.
	pub fn lookup(&self, path: &str) -> Option<&'a Value> {
		lookup_path(self.request, path).or_else(|| {
			lookup_path(self.request, self.param_root).and_then(|root| lookup_path(root, path))
		})
	}
}

fn lookup_path<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
	let mut current = value;
	for segment in path.split('.').filter(|s| !s.is_empty()) {
		current = match current {
			Value::Object(map) => map.get(segment)?,
			Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
			_ => return None,
		};
	}
	(!current.is_null()).then_some(current)
}

pub struct ConstraintRequestBuilder {
	config: BuilderConfig,
	matcher: PolicyMatcher,
	camel_case: regex::Regex,
}

impl ConstraintRequestBuilder {
	pub fn new(config: BuilderConfig) -> Self {
		let matcher = PolicyMatcher::new(config.evaluate_attributes.clone());
		Self {
			config,
			matcher,
			camel_case: camel_case_regex(),
		}
	}

	pub fn build(
		&self,
		info: &RequestInfo,
		demands: &[Demand],
		policies: &PolicyGroups,
		query: QueryContext<'_>,
	) -> Result<ConstraintRequest, BuildError> {
		let request_id = info
			.request_id
			.clone()
			.ok_or(BuildError::MissingRequestInfo("requestId"))?;
		let timeout = info
			.timeout
			.ok_or(BuildError::MissingRequestInfo("timeout"))?;
		let limit = info
			.num_solutions
			.ok_or(BuildError::MissingRequestInfo("numSolutions"))?;

		let demand_names: Vec<String> = demands
			.iter()
			.map(|demand| demand.resource_module_name.clone())
			.collect();

		let vnf_policies = decode_all(policies.policies_of(PolicyKind::Vnf))?;
		let mut demand_section = Vec::with_capacity(demands.len());
		for demand in demands {
			let properties = self.demand_properties(demand, &vnf_policies);
			if properties.is_empty() {
				tracing::debug!(demand = %demand.resource_module_name, "No inventory query for demand");
				continue;
			}
			demand_section.push((demand.resource_module_name.clone(), properties));
		}

		let mut constraints = Vec::new();
		for kind in PolicyKind::CONSTRAINTS {
			let shape = match kind {
				PolicyKind::InventoryGroup => ResultShape::DemandsOnly,
				_ => ResultShape::Decorated,
			};
			constraints.extend(self.matcher.match_policies(
				&demand_names,
				policies.policies_of(kind),
				MatchType::Intersection,
				shape,
			)?);
		}
		let mut seen = HashSet::new();
		if let Some(clash) = constraints
			.iter()
			.map(|entry| entry.constraint_name())
			.find(|name| !seen.insert(name.clone()))
		{
			return Err(BuildError::DuplicateConstraint(clash));
		}

		let mut optimization = Vec::new();
		for (_, payload) in decode_all(policies.policies_of(PolicyKind::Optimization))? {
			if let PolicyPayload::Optimization(objective) = payload {
				optimization.push(objective_function(&objective, &demand_names));
			}
		}

		let request_parameters = self.request_parameters(policies, query)?;

		tracing::info!(
			request_id = %request_id,
			demands = demand_section.len(),
			constraints = constraints.len(),
			objectives = optimization.len(),
			"Constraint request built"
		);

		Ok(ConstraintRequest {
			name: request_id,
			timeout,
			limit,
			demands: demand_section,
			policies: constraints,
			optimization_policies: optimization,
			request_parameters,
		})
	}

	fn demand_properties(
		&self,
		demand: &Demand,
		vnf_policies: &[(&Policy, PolicyPayload)],
	) -> Vec<DemandProperty> {
		let mut properties = Vec::new();
		for (policy, payload) in vnf_policies {
			let PolicyPayload::Vnf(vnf) = payload else {
				continue;
			};
			let governs = policy.is_default()
				|| policy
					.resources
					.iter()
					.any(|r| r.eq_ignore_ascii_case(&demand.resource_module_name));
			if !governs {
				continue;
			}
			for property in &vnf.vnf_properties {
				properties.push(self.demand_property(demand, property));
			}
		}
		properties
	}

	fn demand_property(&self, demand: &Demand, property: &VnfProperty) -> DemandProperty {
		let model = &demand.resource_model_info;
		let mut attributes = Map::new();
		let mut put = |key: String, value: Option<Value>| {
			if let Some(value) = value.filter(|v| !is_empty(v)) {
				attributes.insert(key, value);
			}
		};

		put(
			"global-customer-id".to_string(),
			property.customer_id.clone().map(Value::String),
		);
		put(
			"model-invariant-id".to_string(),
			model.model_invariant_id.clone().map(Value::String),
		);
		put(
			"model-version-id".to_string(),
			model.model_version_id.clone().map(Value::String),
		);
		put(
			"equipment-role".to_string(),
			property.equipment_role.clone().map(Value::String),
		);
		for (key, value) in &property.attributes {
			put(self.attribute_key(key), Some(value.clone()));
		}

		DemandProperty {
			inventory_provider: property.inventory_provider.clone(),
			inventory_type: property.inventory_type.clone(),
			service_type: property.service_type.clone(),
			service_resource_id: demand.service_resource_id.clone(),
			unique: property.unique.clone(),
			attributes,
			passthrough_attributes: property.passthrough_attributes.clone(),
			excluded_candidates: candidate_refs(&demand.excluded_candidates),
			required_candidates: candidate_refs(&demand.required_candidates),
			existing_placement: candidate_refs(&demand.existing_candidates),
		}
	}

	/// Inventory attribute key for a policy attribute key.
	pub fn attribute_key(&self, key: &str) -> String {
		match self.config.attribute_remapping.get(key) {
			Some(mapped) => mapped.clone(),
			None => self
				.camel_case
				.replace_all(key, "$1-$2")
				.to_ascii_lowercase(),
		}
	}

	fn request_parameters(
		&self,
		policies: &PolicyGroups,
		query: QueryContext<'_>,
	) -> Result<Map<String, Value>, BuildError> {
		let mut parameters = Map::new();

		for default in &self.config.default_query_parameters {
			if let Some(value) = query.lookup(&default.location) {
				parameters.insert(default.attribute.clone(), value.clone());
			}
		}

		for (policy, payload) in decode_all(policies.policies_of(PolicyKind::Query))? {
			let PolicyPayload::Query(query_policy) = payload else {
				continue;
			};
			for property in &query_policy.query_properties {
				let value = query
					.lookup(property.location())
					.cloned()
					.or_else(|| property.value.clone().filter(|v| !v.is_null()));
				match value {
					Some(value) => {
						parameters.insert(property.attribute.clone(), value);
					}
					None => tracing::debug!(
						policy = %policy.identity,
						attribute = %property.attribute,
						"Query parameter unresolved"
					),
				}
			}
		}

		if let Some(prov_status) = query.prov_status {
			parameters.insert("prov_status".to_string(), json!(prov_status));
		}

		Ok(parameters)
	}
}

fn camel_case_regex() -> regex::Regex {
	regex::Regex::new("([a-z0-9])([A-Z])").expect("camelCase pattern is valid")
}

fn decode_all(policies: Vec<&Policy>) -> Result<Vec<(&Policy, PolicyPayload)>, BuildError> {
	policies
		.into_iter()
		.map(|policy| -> Result<_, BuildError> { Ok((policy, PolicyPayload::decode(policy)?)) })
		.collect()
}

/// `{objective: {operator: [{attr_operator: [weight, {param: args}]}...]}}`
fn objective_function(payload: &OptimizationPayload, demand_names: &[String]) -> Value {
	let mut terms = Vec::new();
	for attr in &payload.objective_parameter.parameter_attributes {
		let Some(demands) = resolve_demands(&attr.resources, demand_names, MatchType::Intersection)
		else {
			continue;
		};
		for demand in demands {
			let function = if SINGLE_DEMAND_PARAMETERS.contains(&attr.parameter.as_str()) {
				object(attr.parameter.as_str(), json!([demand]))
			} else {
				let location = attr
					.customer_location_info
					.as_deref()
					.unwrap_or(DEFAULT_CUSTOMER_LOCATION);
				object(format!("{}_between", attr.parameter), json!([location, demand]))
			};
			terms.push(object(
				attr.operator.as_str(),
				json!([attr.weight.clone(), function]),
			));
		}
	}
	object(
		payload.objective.as_str(),
		object(payload.objective_parameter.operator.as_str(), Value::Array(terms)),
	)
}

fn candidate_refs(list: &[Candidate]) -> Option<Vec<CandidateRef>> {
	(!list.is_empty()).then(|| list.iter().map(CandidateRef::from).collect())
}

fn object(key: impl Into<String>, value: Value) -> Value {
	let mut map = Map::new();
	map.insert(key.into(), value);
	Value::Object(map)
}

fn is_empty(value: &Value) -> bool {
	match value {
		Value::Null => true,
		Value::String(text) => text.is_empty(),
		_ => false,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use osdf_policy::PolicyGrouper;
	use osdf_types::ResourceModelInfo;

	fn policy(identity: &str, policy_type: &str, resources: &[&str], content: Value) -> Policy {
		Policy {
			identity: identity.to_string(),
			policy_type: policy_type.to_string(),
			priority: 0,
			resources: resources.iter().map(|r| r.to_string()).collect(),
			content,
		}
	}

	fn info() -> RequestInfo {
		RequestInfo {
			transaction_id: Some("tx-1".to_string()),
			request_id: Some("req-1".to_string()),
			num_solutions: Some(1),
			timeout: Some(600),
			..Default::default()
		}
	}

	fn demand(name: &str) -> Demand {
		let mut demand = Demand::named(
			name,
			ResourceModelInfo {
				model_invariant_id: Some(format!("{}-invariant", name)),
				model_version_id: Some(format!("{}-version", name)),
				..Default::default()
			},
		);
		demand.service_resource_id = format!("{}-srv", name);
		demand
	}

	fn vnf_policy(identity: &str, resources: &[&str]) -> Policy {
		policy(
			identity,
			"vnfPolicy",
			resources,
			json!({"vnfProperties": [{
				"inventoryProvider": "aai",
				"inventoryType": "cloud",
				"serviceType": "vCPE",
				"customerId": "",
				"equipmentRole": "vG",
				"attributes": {"cloudVersion": "1.1", "physicalLocationId": "clli1", "empty": null}
			}]}),
		)
	}

	fn groups(policies: Vec<Policy>) -> PolicyGroups {
		PolicyGrouper::new().group(&policies)
	}

	#[test]
	fn test_missing_request_info() {
		let builder = ConstraintRequestBuilder::new(BuilderConfig::default());
		let request = json!({});
		for (field, info) in [
			("requestId", RequestInfo { request_id: None, ..info() }),
			("timeout", RequestInfo { timeout: None, ..info() }),
			("numSolutions", RequestInfo { num_solutions: None, ..info() }),
		] {
			let err = builder
				.build(&info, &[], &PolicyGroups::default(), QueryContext::new(&request, ""))
				.unwrap_err();
			assert!(matches!(err, BuildError::MissingRequestInfo(name) if name == field));
		}
	}

	#[test]
	fn test_demand_properties() {
		let builder = ConstraintRequestBuilder::new(BuilderConfig::default());
		let mut vg = demand("vG");
		vg.excluded_candidates = vec![Candidate {
			identifier_type: "cloud".to_string(),
			identifiers: vec!["RegionOne".to_string()],
			cloud_owner: None,
		}];
		let request = json!({});
		let built = builder
			.build(
				&info(),
				&[vg, demand("vGMux")],
				&groups(vec![vnf_policy("vnf_vG", &["vg"])]),
				QueryContext::new(&request, ""),
			)
			.unwrap();

		assert!(built.demand("vGMux").is_none());
		let props = built.demand("vG").unwrap();
		assert_eq!(props.len(), 1);
		let prop = &props[0];
		assert_eq!(prop.inventory_provider, "aai");
		assert_eq!(prop.service_resource_id, "vG-srv");
		assert_eq!(prop.attributes.get("global-customer-id"), None);
		assert_eq!(prop.attributes["model-invariant-id"], "vG-invariant");
		assert_eq!(prop.attributes["equipment-role"], "vG");
		assert_eq!(prop.attributes["cloud_version"], "1.1");
		assert_eq!(prop.attributes["physical-location-id"], "clli1");
		assert!(prop.attributes.get("empty").is_none());
		let excluded = prop.excluded_candidates.as_ref().unwrap();
		assert_eq!(excluded[0].candidate_id, vec!["RegionOne"]);
		assert!(prop.required_candidates.is_none());
	}

	#[test]
	fn test_constraints_follow_kind_order() {
		let builder = ConstraintRequestBuilder::new(BuilderConfig::default());
		let request = json!({});
		let built = builder
			.build(
				&info(),
				&[demand("vG"), demand("vFW")],
				&groups(vec![
					policy(
						"zone_vG",
						"zone",
						&["vG"],
						json!({"affinityProperty": {"category": "complex", "qualifier": "same"}}),
					),
					policy("group", "inventory_group", &["vG", "vFW"], json!({})),
					policy(
						"attr",
						"attribute",
						&[],
						json!({"cloudAttributeProperty": {"cloudVersion": "1.1"}}),
					),
				]),
				QueryContext::new(&request, ""),
			)
			.unwrap();

		let names: Vec<String> = built.policies.iter().map(|p| p.constraint_name()).collect();
		assert_eq!(names, vec!["attr_vG", "attr_vFW", "group", "zone_vG"]);
		let governing: Vec<&str> = built
			.policies_for("vfw")
			.map(|entry| entry.resource_identity.as_str())
			.collect();
		assert_eq!(governing, vec!["attr", "group"]);
		assert_eq!(built.policies[2].properties, None);
		assert_eq!(
			built.policies[0].properties,
			Some(json!({"evaluate": {"cloud_version": "1.1"}}))
		);
	}

	#[test]
	fn test_optimization_objective() {
		let builder = ConstraintRequestBuilder::new(BuilderConfig::default());
		let request = json!({});
		let built = builder
			.build(
				&info(),
				&[demand("vG"), demand("vGMux")],
				&groups(vec![policy(
					"opt",
					"placement_optimization",
					&[],
					json!({
						"objective": "minimize",
						"objectiveParameter": {
							"operator": "sum",
							"parameterAttributes": [
								{"resources": ["vG"], "parameter": "distance", "weight": "1", "operator": "product", "customerLocationInfo": "customer_loc"},
								{"resources": ["vG", "vGMux"], "parameter": "hpa_score", "weight": "200", "operator": "product"}
							]
						}
					}),
				)]),
				QueryContext::new(&request, ""),
			)
			.unwrap();

		assert_eq!(
			built.optimization_policies[0],
			json!({"minimize": {"sum": [
				{"product": ["1", {"distance_between": ["customer_loc", "vG"]}]},
				{"product": ["200", {"hpa_score": ["vG"]}]},
				{"product": ["200", {"hpa_score": ["vGMux"]}]}
			]}})
		);
	}

	#[test]
	fn test_request_parameters() {
		let builder = ConstraintRequestBuilder::new(BuilderConfig::default());
		let request = json!({
			"serviceInfo": {"serviceName": "vCPE"},
			"placementInfo": {
				"requestParameters": {"customerLatitude": 32.89, "customerLongitude": -97.04}
			}
		});
		let built = builder
			.build(
				&info(),
				&[demand("vG")],
				&groups(vec![policy(
					"query",
					"optimizationQueryPolicy",
					&[],
					json!({"queryProperties": [
						{"attribute": "service_name", "attribute_location": "serviceInfo.serviceName"},
						{"attribute": "customerLatitude"},
						{"attribute": "region", "value": "US"},
						{"attribute": "missing"}
					]}),
				)]),
				QueryContext::new(&request, "placementInfo.requestParameters")
					.with_prov_status(Some("PROV")),
			)
			.unwrap();

		let params = &built.request_parameters;
		assert_eq!(params["customer_lat"], 32.89);
		assert_eq!(params["customer_long"], -97.04);
		assert_eq!(params["service_name"], "vCPE");
		assert_eq!(params["customerLatitude"], 32.89);
		assert_eq!(params["region"], "US");
		assert_eq!(params["prov_status"], "PROV");
		assert!(params.get("missing").is_none());
		assert!(params.get("REQUIRED_MEM").is_none());
		assert!(built.to_wire()["template"].get("locations").is_some());
	}

	#[test]
	fn test_attribute_key_conversion() {
		let builder = ConstraintRequestBuilder::new(BuilderConfig::default());
		assert_eq!(builder.attribute_key("cloudVersion"), "cloud_version");
		assert_eq!(builder.attribute_key("sriovNicNetwork"), "sriov-nic-network");
		assert_eq!(builder.attribute_key("plain"), "plain");
	}

	#[test]
	fn test_malformed_policy_payload_fails_build() {
		let builder = ConstraintRequestBuilder::new(BuilderConfig::default());
		let request = json!({});
		let err = builder
			.build(
				&info(),
				&[demand("vG")],
				&groups(vec![policy("dist", "distance", &["vG"], json!({}))]),
				QueryContext::new(&request, ""),
			)
			.unwrap_err();
		assert!(matches!(err, BuildError::Policy(_)));
	}

	#[test]
	fn test_clashing_constraint_names_fail_build() {
		let builder = ConstraintRequestBuilder::new(BuilderConfig::default());
		let request = json!({});
		let err = builder
			.build(
				&info(),
				&[demand("vG"), demand("vFW")],
				&groups(vec![
					policy(
						"attr",
						"attribute",
						&[],
						json!({"cloudAttributeProperty": {"cloudVersion": "1.1"}}),
					),
					policy(
						"attr_vFW",
						"zone",
						&["vG"],
						json!({"affinityProperty": {"category": "complex", "qualifier": "same"}}),
					),
				]),
				QueryContext::new(&request, ""),
			)
			.unwrap_err();
		assert!(matches!(err, BuildError::DuplicateConstraint(ref name) if name == "attr_vFW"));
	}
}
