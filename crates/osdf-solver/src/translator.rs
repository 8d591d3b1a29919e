//! Recommendations to solutions.

use crate::SolverOutcome;
use osdf_config::TranslationConfig;
use osdf_types::{
	AssignmentInfo, CandidateSolution, PlanStatus, Recommendation, ResourceRecommendation,
	Solution, SolutionEnvelope, Solutions,
};
use serde_json::{Map, Value};

const NO_SOLUTION_MESSAGE: &str = "No solution found";

pub struct ResponseTranslator {
	config: TranslationConfig,
}

impl ResponseTranslator {
	pub fn new(config: TranslationConfig) -> Self {
		Self { config }
	}

	pub fn translate(
		&self,
		outcome: &SolverOutcome,
		request_id: &str,
		transaction_id: &str,
	) -> SolutionEnvelope {
		let placement_solutions: Vec<Vec<Solution>> = outcome
			.recommendations
			.iter()
			.map(|recommendation| self.composite(recommendation))
			.filter(|composite| !composite.is_empty())
			.collect();

		if placement_solutions.is_empty() {
			let message = outcome
				.message
				.clone()
				.unwrap_or_else(|| NO_SOLUTION_MESSAGE.to_string());
			tracing::info!(request_id, %message, "Solver returned no solution");
			return SolutionEnvelope::no_solution(request_id, transaction_id, message);
		}

		let request_status = match outcome.status {
			PlanStatus::Done => SolutionEnvelope::COMPLETED.to_string(),
			other => other.as_str().to_string(),
		};

		SolutionEnvelope {
			transaction_id: transaction_id.to_string(),
			request_id: request_id.to_string(),
			request_status,
			status_message: outcome.message.clone().unwrap_or_default(),
			solutions: Solutions {
				placement_solutions,
			},
		}
	}

	/// One composite solution, one entry per resource.
	pub fn composite(&self, recommendation: &Recommendation) -> Vec<Solution> {
		recommendation
			.resources
			.iter()
			.filter_map(|(name, resource)| self.solution(name, resource))
			.collect()
	}

	fn solution(&self, name: &str, resource: &ResourceRecommendation) -> Option<Solution> {
		let Some(candidate) = &resource.candidate else {
			tracing::debug!(resource = name, "Recommendation without candidate");
			return None;
		};

		let mut identifier_type = String::new();
		let mut identifiers = Vec::new();
		let mut fields = Map::new();
		for (key, value) in candidate {
			match key.as_str() {
				"inventory_type" => identifier_type = text(value),
				"candidate_id" => identifiers = identifier_list(value),
				other => match self.config.rename(other) {
					Some(renamed) => {
						fields.insert(renamed.to_string(), value.clone());
					}
					None => tracing::debug!(resource = name, key = other, "Dropping unmapped candidate key"),
				},
			}
		}

		let mut assignment_info = Vec::new();
		for (key, value) in &resource.attributes {
			match self.config.rename(key) {
				Some(renamed) => assignment_info.push(AssignmentInfo {
					key: renamed.to_string(),
					value: value.clone(),
				}),
				None => tracing::debug!(resource = name, key = %key, "Dropping unmapped attribute"),
			}
		}

		Some(Solution {
			resource_module_name: name.to_string(),
			service_resource_id: resource
				.service_resource_id
				.clone()
				.unwrap_or_else(|| name.to_string()),
			solution: CandidateSolution {
				identifier_type,
				identifiers,
				fields,
			},
			assignment_info,
		})
	}
}

fn text(value: &Value) -> String {
	match value {
		Value::String(s) => s.clone(),
		other => other.to_string(),
	}
}

fn identifier_list(value: &Value) -> Vec<String> {
	match value {
		Value::Array(items) => items.iter().map(text).collect(),
		Value::Null => Vec::new(),
		other => vec![text(other)],
	}
}
