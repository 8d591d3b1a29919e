//! Raw policy records to [`Policy`].

use crate::PolicyError;
use osdf_types::serde_helpers::deserialize_opt_priority;
use osdf_types::{Policy, RawPolicy};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Decoded `config` document of a raw policy.
#[derive(Debug, Deserialize)]
struct PolicyConfigDocument {
	#[serde(rename = "type", default)]
	policy_type: Option<String>,
	#[serde(default, deserialize_with = "deserialize_opt_priority")]
	priority: Option<i64>,
	#[serde(default)]
	content: Option<Map<String, Value>>,
}

/// Parses one raw record.
pub fn parse_policy(raw: &RawPolicy) -> Result<Policy, String> {
	let document: PolicyConfigDocument =
		serde_json::from_str(&raw.config).map_err(|e| e.to_string())?;
	let content = document.content.unwrap_or_default();

	let policy_type = document
		.policy_type
		.or_else(|| string_field(&content, "policyType"))
		.unwrap_or_default();
	let identity =
		string_field(&content, "identity").unwrap_or_else(|| raw.policy_name.clone());
	let resources = match content.get("resources") {
		None | Some(Value::Null) => Vec::new(),
		Some(Value::String(single)) => vec![single.clone()],
		Some(Value::Array(items)) => items
			.iter()
			.map(|item| {
				item.as_str()
					.map(str::to_string)
					.ok_or_else(|| format!("resource entry is not a string: {}", item))
			})
			.collect::<Result<Vec<_>, _>>()?,
		Some(other) => return Err(format!("resources must be a list, got {}", other)),
	};

	Ok(Policy {
		identity,
		policy_type,
		priority: raw.priority.or(document.priority).unwrap_or(0),
		resources,
		content: Value::Object(content),
	})
}

/// Parses every record, reporting all unparsable records at once.
pub fn parse_policies(raw_policies: &[RawPolicy]) -> Result<Vec<Policy>, PolicyError> {
	let mut policies = Vec::with_capacity(raw_policies.len());
	let mut failed = Vec::new();

	for raw in raw_policies {
		match parse_policy(raw) {
			Ok(policy) => policies.push(policy),
			Err(reason) => {
				tracing::warn!(policy = %raw.policy_name, %reason, "Unparsable policy config");
				failed.push(raw.policy_name.clone());
			}
		}
	}

	if failed.is_empty() {
		Ok(policies)
	} else {
		Err(PolicyError::Configuration(failed))
	}
}

fn string_field(content: &Map<String, Value>, key: &str) -> Option<String> {
	content
		.get(key)
		.and_then(Value::as_str)
		.filter(|s| !s.is_empty())
		.map(str::to_string)
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn raw(name: &str, config: Value, priority: Option<i64>) -> RawPolicy {
		RawPolicy {
			policy_name: name.to_string(),
			config: config.to_string(),
			priority,
		}
	}

	#[test]
	fn test_parse_full_record() {
		let policy = parse_policy(&raw(
			"OSDF.Placement.Attr_vG",
			json!({
				"type": "attribute",
				"priority": "5",
				"content": {"identity": "attr_vG", "resources": ["vG"], "cloudAttributeProperty": {}}
			}),
			None,
		))
		.unwrap();
		assert_eq!(policy.identity, "attr_vG");
		assert_eq!(policy.policy_type, "attribute");
		assert_eq!(policy.priority, 5);
		assert_eq!(policy.resources, vec!["vG"]);
		assert!(policy.content.get("cloudAttributeProperty").is_some());
	}

	#[test]
	fn test_fallbacks() {
		let policy = parse_policy(&raw(
			"OSDF.Placement.Zone",
			json!({"content": {"policyType": "zone", "resources": "vGMux"}}),
			Some(7),
		))
		.unwrap();
		assert_eq!(policy.identity, "OSDF.Placement.Zone");
		assert_eq!(policy.policy_type, "zone");
		assert_eq!(policy.priority, 7);
		assert_eq!(policy.resources, vec!["vGMux"]);
	}

	#[test]
	fn test_outer_priority_wins() {
		let policy = parse_policy(&raw(
			"p",
			json!({"type": "hpa", "priority": 1, "content": {}}),
			Some(9),
		))
		.unwrap();
		assert_eq!(policy.priority, 9);
		assert!(policy.is_default());
	}

	#[test]
	fn test_all_bad_records_are_reported() {
		let records = vec![
			RawPolicy {
				policy_name: "broken_one".to_string(),
				config: "{not json".to_string(),
				priority: None,
			},
			raw("fine", json!({"type": "zone", "content": {}}), None),
			raw("broken_two", json!({"type": "zone", "content": {"resources": [1]}}), None),
		];
		match parse_policies(&records) {
			Err(PolicyError::Configuration(names)) => {
				assert_eq!(names, vec!["broken_one", "broken_two"])
			}
			other => panic!("expected configuration error, got {:?}", other),
		}
	}
}
