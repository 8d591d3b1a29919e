//! Policy records.
//!
//! Policies reach the pipeline in two forms: the raw record handed over by the
//! policy collaborator (a name plus a JSON document encoded as a string) and the
//! parsed [`Policy`] used by grouping and matching.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Policy record as delivered by the policy collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPolicy {
	#[serde(rename = "policyName")]
	pub policy_name: String,
	/// JSON document encoded as a string.
	pub config: String,
	#[serde(
		default,
		skip_serializing_if = "Option::is_none",
		deserialize_with = "crate::serde_helpers::deserialize_opt_priority"
	)]
	pub priority: Option<i64>,
}

/// A parsed policy.
///
/// `content` keeps the type-specific section untouched; it is decoded into a
/// typed payload only when a matcher needs it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
	pub identity: String,
	#[serde(rename = "type")]
	pub policy_type: String,
	#[serde(default)]
	pub priority: i64,
	/// Resource names this policy governs. Empty means a default policy.
	#[serde(rename = "resourceScope", default)]
	pub resources: Vec<String>,
	#[serde(default)]
	pub content: serde_json::Value,
}

impl Policy {
	/// The recognised kind of this policy, if any.
	pub fn kind(&self) -> Option<PolicyKind> {
		self.policy_type.parse().ok()
	}

	/// A policy with no declared scope applies to every demand.
	pub fn is_default(&self) -> bool {
		self.resources.is_empty()
	}
}

/// Every policy type the pipeline knows how to interpret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
	Attribute,
	Distance,
	Zone,
	Capacity,
	Hpa,
	Reservation,
	Threshold,
	Aggregation,
	InventoryGroup,
	Optimization,
	Query,
	Vnf,
}

impl PolicyKind {
	/// Kinds that become entries of the constraint section, in emission order.
	pub const CONSTRAINTS: [PolicyKind; 9] = [
		PolicyKind::Attribute,
		PolicyKind::Distance,
		PolicyKind::InventoryGroup,
		PolicyKind::Zone,
		PolicyKind::Reservation,
		PolicyKind::Capacity,
		PolicyKind::Hpa,
		PolicyKind::Threshold,
		PolicyKind::Aggregation,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			PolicyKind::Attribute => "attribute",
			PolicyKind::Distance => "distance_to_location",
			PolicyKind::Zone => "zone",
			PolicyKind::Capacity => "vim_fit",
			PolicyKind::Hpa => "hpa",
			PolicyKind::Reservation => "instance_reservation",
			PolicyKind::Threshold => "threshold",
			PolicyKind::Aggregation => "aggregation",
			PolicyKind::InventoryGroup => "inventory_group",
			PolicyKind::Optimization => "placement_optimization",
			PolicyKind::Query => "optimizationQueryPolicy",
			PolicyKind::Vnf => "vnfPolicy",
		}
	}

	/// Constraint type understood by the Solver Service, for constraint kinds.
	pub fn constraint_type(&self) -> Option<&'static str> {
		match self {
			PolicyKind::Optimization | PolicyKind::Query | PolicyKind::Vnf => None,
			other => Some(other.as_str()),
		}
	}
}

impl fmt::Display for PolicyKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Error returned when a policy type string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPolicyKind(pub String);

impl fmt::Display for UnknownPolicyKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Unknown policy type: {}", self.0)
	}
}

impl std::error::Error for UnknownPolicyKind {}

impl FromStr for PolicyKind {
	type Err = UnknownPolicyKind;

	/// Accepts both the short type names and the fully qualified policy type ids.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let kind = match s.trim() {
			"attribute" | "onap.policies.optimization.resource.AttributePolicy" => {
				PolicyKind::Attribute
			}
			"distance" | "distance_to_location"
			| "onap.policies.optimization.resource.DistancePolicy" => PolicyKind::Distance,
			"zone" | "affinity" | "onap.policies.optimization.resource.AffinityPolicy" => {
				PolicyKind::Zone
			}
			"capacity" | "vim_fit" | "onap.policies.optimization.resource.Vim_fit" => {
				PolicyKind::Capacity
			}
			"hpa" | "onap.policies.optimization.resource.HpaPolicy" => PolicyKind::Hpa,
			"reservation" | "instance_reservation" => PolicyKind::Reservation,
			"threshold" | "onap.policies.optimization.resource.ThresholdPolicy" => {
				PolicyKind::Threshold
			}
			"aggregation" | "onap.policies.optimization.resource.AggregationPolicy" => {
				PolicyKind::Aggregation
			}
			"inventory_group" | "inventoryGroup" => PolicyKind::InventoryGroup,
			"optimization" | "placement_optimization"
			| "onap.policies.optimization.resource.OptimizationPolicy" => PolicyKind::Optimization,
			"query" | "optimizationQueryPolicy"
			| "onap.policies.optimization.service.QueryPolicy" => PolicyKind::Query,
			"vnf" | "vnfPolicy" | "onap.policies.optimization.resource.VnfPolicy" => {
				PolicyKind::Vnf
			}
			other => return Err(UnknownPolicyKind(other.to_string())),
		};
		Ok(kind)
	}
}
