//! Typed views of the type-specific policy content.

use crate::PolicyError;
use osdf_types::{Policy, PolicyKind};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributePayload {
	pub cloud_attribute_property: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistancePayload {
	pub distance_properties: DistanceProperties,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistanceProperties {
	pub location_info: String,
	pub distance: DistanceValue,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DistanceValue {
	pub value: Value,
	pub operator: String,
	pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZonePayload {
	pub affinity_property: AffinityProperty,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AffinityProperty {
	pub category: String,
	pub qualifier: String,
}

/// Controller plus a request document, used by capacity and reservation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ControllerRequest {
	pub controller: String,
	/// Either embedded JSON text or an inline object.
	pub request: Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityPayload {
	pub capacity_property: ControllerRequest,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationPayload {
	pub reservation_property: ControllerRequest,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HpaPayload {
	pub flavor_features: Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdPayload {
	pub threshold_properties: Vec<ThresholdProperty>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ThresholdProperty {
	pub attribute: String,
	pub operator: String,
	pub threshold: Value,
	#[serde(default)]
	pub unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationPayload {
	pub aggregation_properties: Vec<AggregationProperty>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AggregationProperty {
	pub attribute: String,
	pub function: String,
	#[serde(default)]
	pub operator: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationPayload {
	pub objective: String,
	pub objective_parameter: ObjectiveParameter,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectiveParameter {
	pub operator: String,
	#[serde(default)]
	pub parameter_attributes: Vec<ParameterAttribute>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterAttribute {
	#[serde(default)]
	pub resources: Vec<String>,
	pub parameter: String,
	pub weight: Value,
	pub operator: String,
	#[serde(default)]
	pub customer_location_info: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPayload {
	pub query_properties: Vec<QueryProperty>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QueryProperty {
	pub attribute: String,
	/// Dotted path into the request; defaults to `attribute`.
	#[serde(default)]
	pub attribute_location: Option<String>,
	#[serde(default)]
	pub value: Option<Value>,
}

impl QueryProperty {
	pub fn location(&self) -> &str {
		self.attribute_location.as_deref().unwrap_or(&self.attribute)
	}
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VnfPayload {
	pub vnf_properties: Vec<VnfProperty>,
}

/// One inventory query template of a vnf policy.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VnfProperty {
	pub inventory_provider: String,
	pub inventory_type: String,
	#[serde(default)]
	pub service_type: String,
	#[serde(default)]
	pub unique: Option<Value>,
	#[serde(default)]
	pub customer_id: Option<String>,
	#[serde(default)]
	pub equipment_role: Option<String>,
	#[serde(default)]
	pub attributes: Map<String, Value>,
	#[serde(default)]
	pub passthrough_attributes: Option<Map<String, Value>>,
}

/// Type-specific policy content, one variant per recognised kind.
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyPayload {
	Attribute(AttributePayload),
	Distance(DistancePayload),
	Zone(ZonePayload),
	Capacity(CapacityPayload),
	Hpa(HpaPayload),
	Reservation(ReservationPayload),
	Threshold(ThresholdPayload),
	Aggregation(AggregationPayload),
	InventoryGroup,
	Optimization(OptimizationPayload),
	Query(QueryPayload),
	Vnf(VnfPayload),
}

impl PolicyPayload {
	pub fn decode(policy: &Policy) -> Result<Self, PolicyError> {
		let Some(kind) = policy.kind() else {
			return Err(payload_error(
				policy,
				format!("unrecognised policy type '{}'", policy.policy_type),
			));
		};

		let payload = match kind {
			PolicyKind::Attribute => PolicyPayload::Attribute(section(policy)?),
			PolicyKind::Distance => PolicyPayload::Distance(section(policy)?),
			PolicyKind::Zone => PolicyPayload::Zone(section(policy)?),
			PolicyKind::Capacity => PolicyPayload::Capacity(section(policy)?),
			PolicyKind::Hpa => PolicyPayload::Hpa(section(policy)?),
			PolicyKind::Reservation => PolicyPayload::Reservation(section(policy)?),
			PolicyKind::Threshold => PolicyPayload::Threshold(section(policy)?),
			PolicyKind::Aggregation => PolicyPayload::Aggregation(section(policy)?),
			PolicyKind::InventoryGroup => PolicyPayload::InventoryGroup,
			PolicyKind::Optimization => PolicyPayload::Optimization(section(policy)?),
			PolicyKind::Query => PolicyPayload::Query(section(policy)?),
			PolicyKind::Vnf => PolicyPayload::Vnf(section(policy)?),
		};
		Ok(payload)
	}

	/// Constraint `properties` object sent to the Solver Service.
	///
	/// `evaluate_table` renames attribute-policy keys; keys absent from it are
	/// passed through.
	pub fn constraint_properties(
		&self,
		identity: &str,
		evaluate_table: &[(String, String)],
	) -> Result<Option<Value>, PolicyError> {
		let properties = match self {
			PolicyPayload::Attribute(attr) => {
				let mut evaluate = Map::new();
				for (key, value) in &attr.cloud_attribute_property {
					if is_empty_value(value) {
						continue;
					}
					let renamed = evaluate_table
						.iter()
						.find(|(from, _)| from == key)
						.map(|(_, to)| to.clone())
						.unwrap_or_else(|| key.clone());
					evaluate.insert(renamed, value.clone());
				}
				json!({ "evaluate": evaluate })
			}
			PolicyPayload::Distance(distance) => {
				let props = &distance.distance_properties;
				let value = match &props.distance.value {
					Value::String(text) => text.clone(),
					other => other.to_string(),
				};
				json!({
					"distance": format!("{} {} {}", props.distance.operator, value, props.distance.unit),
					"location": props.location_info,
				})
			}
			PolicyPayload::Zone(zone) => json!({
				"category": zone.affinity_property.category,
				"qualifier": zone.affinity_property.qualifier,
			}),
			PolicyPayload::Capacity(CapacityPayload {
				capacity_property: controller,
			})
			| PolicyPayload::Reservation(ReservationPayload {
				reservation_property: controller,
			}) => json!({
				"controller": controller.controller,
				"request": embedded_json(identity, "request", &controller.request)?,
			}),
			PolicyPayload::Hpa(hpa) => json!({
				"evaluate": embedded_json(identity, "flavorFeatures", &hpa.flavor_features)?,
			}),
			PolicyPayload::Threshold(threshold) => {
				let evaluate: Vec<Value> = threshold
					.threshold_properties
					.iter()
					.map(|prop| {
						let mut term = Map::new();
						term.insert("attribute".to_string(), json!(prop.attribute));
						term.insert("operator".to_string(), json!(prop.operator));
						term.insert("threshold".to_string(), prop.threshold.clone());
						if let Some(unit) = &prop.unit {
							term.insert("unit".to_string(), json!(unit));
						}
						Value::Object(term)
					})
					.collect();
				json!({ "evaluate": evaluate })
			}
			PolicyPayload::Aggregation(aggregation) => {
				let evaluate: Vec<Value> = aggregation
					.aggregation_properties
					.iter()
					.map(|prop| {
						let mut term = Map::new();
						term.insert("attribute".to_string(), json!(prop.attribute));
						term.insert("function".to_string(), json!(prop.function));
						if let Some(operator) = &prop.operator {
							term.insert("operator".to_string(), json!(operator));
						}
						Value::Object(term)
					})
					.collect();
				json!({ "evaluate": evaluate })
			}
			PolicyPayload::InventoryGroup
			| PolicyPayload::Optimization(_)
			| PolicyPayload::Query(_)
			| PolicyPayload::Vnf(_) => return Ok(None),
		};
		Ok(Some(properties))
	}
}

fn section<T: DeserializeOwned>(policy: &Policy) -> Result<T, PolicyError> {
	T::deserialize(&policy.content).map_err(|e| payload_error(policy, e.to_string()))
}

fn payload_error(policy: &Policy, reason: String) -> PolicyError {
	PolicyError::Payload {
		identity: policy.identity.clone(),
		reason,
	}
}

/// Decodes a value that may carry its JSON as text.
fn embedded_json(identity: &str, field: &str, value: &Value) -> Result<Value, PolicyError> {
	match value {
		Value::String(text) => serde_json::from_str(text).map_err(|e| PolicyError::Payload {
			identity: identity.to_string(),
			reason: format!("{} is not valid JSON: {}", field, e),
		}),
		other => Ok(other.clone()),
	}
}

pub(crate) fn is_empty_value(value: &Value) -> bool {
	match value {
		Value::Null => true,
		Value::String(text) => text.is_empty(),
		_ => false,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn policy(policy_type: &str, content: Value) -> Policy {
		Policy {
			identity: format!("{}_policy", policy_type),
			policy_type: policy_type.to_string(),
			priority: 0,
			resources: vec!["vG".to_string()],
			content,
		}
	}

	fn properties(policy: &Policy) -> Result<Option<Value>, PolicyError> {
		let table = vec![("cloudVersion".to_string(), "cloud_version".to_string())];
		PolicyPayload::decode(policy)?.constraint_properties(&policy.identity, &table)
	}

	#[test]
	fn test_attribute_keys_renamed() {
		let props = properties(&policy(
			"attribute",
			json!({"cloudAttributeProperty": {"cloudVersion": "1.1", "hypervisor": "kvm", "empty": ""}}),
		))
		.unwrap()
		.unwrap();
		assert_eq!(
			props,
			json!({"evaluate": {"cloud_version": "1.1", "hypervisor": "kvm"}})
		);
	}

	#[test]
	fn test_distance_expression() {
		let props = properties(&policy(
			"distance",
			json!({"distanceProperties": {
				"locationInfo": "customer_loc",
				"distance": {"value": 100, "operator": "<", "unit": "km"}
			}}),
		))
		.unwrap()
		.unwrap();
		assert_eq!(props, json!({"distance": "< 100 km", "location": "customer_loc"}));
	}

	#[test]
	fn test_capacity_request_is_decoded() {
		let props = properties(&policy(
			"vim_fit",
			json!({"capacityProperty": {
				"controller": "multicloud",
				"request": "{\"vCPU\": 10, \"Memory\": {\"quantity\": 100, \"unit\": \"GB\"}}"
			}}),
		))
		.unwrap()
		.unwrap();
		assert_eq!(props["controller"], "multicloud");
		assert_eq!(props["request"]["vCPU"], 10);
	}

	#[test]
	fn test_malformed_embedded_json() {
		let err = properties(&policy(
			"hpa",
			json!({"flavorFeatures": "[{\"id\": "}),
		))
		.unwrap_err();
		assert!(matches!(err, PolicyError::Payload { identity, .. } if identity == "hpa_policy"));
	}

	#[test]
	fn test_missing_section() {
		let err = PolicyPayload::decode(&policy("zone", json!({}))).unwrap_err();
		assert!(matches!(err, PolicyError::Payload { .. }));
	}

	#[test]
	fn test_threshold_and_aggregation_lists() {
		let props = properties(&policy(
			"threshold",
			json!({"thresholdProperties": [
				{"attribute": "latency", "operator": "lte", "threshold": 30, "unit": "ms"},
				{"attribute": "reliability", "operator": "gte", "threshold": 99.9}
			]}),
		))
		.unwrap()
		.unwrap();
		assert_eq!(props["evaluate"][0]["unit"], "ms");
		assert!(props["evaluate"][1].get("unit").is_none());

		let props = properties(&policy(
			"aggregation",
			json!({"aggregationProperties": [{"attribute": "latency", "function": "sum"}]}),
		))
		.unwrap()
		.unwrap();
		assert_eq!(props, json!({"evaluate": [{"attribute": "latency", "function": "sum"}]}));
	}

	#[test]
	fn test_inventory_group_has_no_properties() {
		assert_eq!(properties(&policy("inventory_group", json!({}))).unwrap(), None);
	}
}
