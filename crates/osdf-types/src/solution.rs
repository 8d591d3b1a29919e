//! Solutions handed back to the calling workflow.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Final answer of one optimization request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionEnvelope {
	pub transaction_id: String,
	pub request_id: String,
	pub request_status: String,
	#[serde(default)]
	pub status_message: String,
	#[serde(default)]
	pub solutions: Solutions,
}

impl SolutionEnvelope {
	pub const COMPLETED: &'static str = "completed";

	/// Envelope for a request the solver answered without any candidate.
	pub fn no_solution(
		request_id: impl Into<String>,
		transaction_id: impl Into<String>,
		message: impl Into<String>,
	) -> Self {
		Self {
			transaction_id: transaction_id.into(),
			request_id: request_id.into(),
			request_status: Self::COMPLETED.to_string(),
			status_message: message.into(),
			solutions: Solutions::default(),
		}
	}

	pub fn has_solutions(&self) -> bool {
		self.solutions
			.placement_solutions
			.iter()
			.any(|composite| !composite.is_empty())
	}
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Solutions {
	/// One inner list per composite solution.
	#[serde(rename = "placementSolutions", default)]
	pub placement_solutions: Vec<Vec<Solution>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Solution {
	pub resource_module_name: String,
	#[serde(default)]
	pub service_resource_id: String,
	pub solution: CandidateSolution,
	#[serde(default)]
	pub assignment_info: Vec<AssignmentInfo>,
}

impl Solution {
	pub fn assignment(&self, key: &str) -> Option<&Value> {
		self.assignment_info
			.iter()
			.find(|info| info.key == key)
			.map(|info| &info.value)
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateSolution {
	pub identifier_type: String,
	#[serde(default)]
	pub identifiers: Vec<String>,
	/// Candidate fields that survived the rename table.
	#[serde(flatten)]
	pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentInfo {
	pub key: String,
	pub value: Value,
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_no_solution_envelope() {
		let envelope = SolutionEnvelope::no_solution("req-1", "tx-1", "No solution found");
		assert!(!envelope.has_solutions());

		let wire = serde_json::to_value(&envelope).unwrap();
		assert_eq!(wire["requestStatus"], "completed");
		assert_eq!(wire["statusMessage"], "No solution found");
		assert_eq!(wire["solutions"]["placementSolutions"], json!([]));
	}

	#[test]
	fn test_candidate_fields_are_flattened() {
		let mut fields = Map::new();
		fields.insert("cloudOwner".to_string(), json!("CloudOwner"));
		let solution = Solution {
			resource_module_name: "vG".to_string(),
			service_resource_id: "vG-srv".to_string(),
			solution: CandidateSolution {
				identifier_type: "cloudRegionId".to_string(),
				identifiers: vec!["RegionOne".to_string()],
				fields,
			},
			assignment_info: vec![AssignmentInfo {
				key: "cloudClli".to_string(),
				value: json!("clli1"),
			}],
		};

		let wire = serde_json::to_value(&solution).unwrap();
		assert_eq!(wire["solution"]["cloudOwner"], "CloudOwner");
		assert_eq!(wire["solution"]["identifiers"], json!(["RegionOne"]));
		assert_eq!(solution.assignment("cloudClli"), Some(&json!("clli1")));
	}
}
