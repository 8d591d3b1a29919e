//! Solver Service wire types.
//!
//! The submit call answers with a `template` acknowledgement carrying a
//! follow-up link; every follow-up answers with a plan envelope whose first plan
//! either holds the terminal result or the next link to poll.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
	pub href: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub rel: Option<String>,
}

fn first_href(links: &[Vec<Link>]) -> Option<&str> {
	links
		.first()
		.and_then(|row| row.first())
		.map(|link| link.href.as_str())
}

/// Immediate answer to the submit call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitResponse {
	pub status: String,
	#[serde(default)]
	pub links: Vec<Vec<Link>>,
}

impl SubmitResponse {
	pub const TEMPLATE_STATUS: &'static str = "template";

	/// `links[0][0].href`
	pub fn follow_up_url(&self) -> Option<&str> {
		first_href(&self.links)
	}
}

/// Status of a plan as reported by the Solver Service.
///
/// Anything other than the four named statuses (`translated`, `solving`,
/// `solved`, `reserving`, ...) is an intermediate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanStatus {
	Template,
	Done,
	NotFound,
	Error,
	Pending,
}

impl PlanStatus {
	pub fn from_wire(status: &str) -> Self {
		match status.trim() {
			"template" => PlanStatus::Template,
			"done" => PlanStatus::Done,
			"not found" | "not_found" => PlanStatus::NotFound,
			"error" => PlanStatus::Error,
			_ => PlanStatus::Pending,
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			PlanStatus::Template => "template",
			PlanStatus::Done => "done",
			PlanStatus::NotFound => "not found",
			PlanStatus::Error => "error",
			PlanStatus::Pending => "pending",
		}
	}

	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			PlanStatus::Done | PlanStatus::NotFound | PlanStatus::Error
		)
	}
}

impl Serialize for PlanStatus {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(self.as_str())
	}
}

impl<'de> Deserialize<'de> for PlanStatus {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let status = String::deserialize(deserializer)?;
		Ok(PlanStatus::from_wire(&status))
	}
}

/// Envelope returned by every follow-up GET.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanEnvelope {
	#[serde(default)]
	pub plans: Vec<Plan>,
}

impl PlanEnvelope {
	pub fn first_plan(&self) -> Option<&Plan> {
		self.plans.first()
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
	pub status: PlanStatus,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub recommendations: Option<Vec<Recommendation>>,
	#[serde(default)]
	pub links: Vec<Vec<Link>>,
}

impl Plan {
	pub fn next_url(&self) -> Option<&str> {
		first_href(&self.links)
	}
}

/// One composite solution: every demand name mapped to its chosen candidate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Recommendation {
	#[serde(with = "crate::serde_helpers::ordered_map")]
	pub resources: Vec<(String, ResourceRecommendation)>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecommendation {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub candidate: Option<Map<String, Value>>,
	#[serde(default)]
	pub attributes: Map<String, Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub service_resource_id: Option<String>,
}
