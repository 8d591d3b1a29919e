//! Northbound request shapes and their demands.

use crate::WorkflowError;
use osdf_types::{Demand, RequestInfo, ResourceModelInfo};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Demand name used by NST selection.
pub const NST_DEMAND: &str = "nst";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Workflow {
	Placement,
	NsiSelection,
	NssiSelection,
	NstSelection,
}

impl Workflow {
	/// Service type the policy provider is queried with.
	pub fn service_type(&self) -> &'static str {
		match self {
			Workflow::Placement => "placement",
			Workflow::NsiSelection => "nsi_selection",
			Workflow::NssiSelection => "nssi_selection",
			Workflow::NstSelection => "nst_selection",
		}
	}

	/// Dotted path of the parameter object query policies resolve against.
	pub fn param_root(&self) -> &'static str {
		match self {
			Workflow::Placement => "placementInfo.requestParameters",
			Workflow::NsiSelection | Workflow::NstSelection => "serviceProfile",
			Workflow::NssiSelection => "sliceProfile",
		}
	}
}

impl fmt::Display for Workflow {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.service_type())
	}
}

impl FromStr for Workflow {
	type Err = WorkflowError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"placement" => Ok(Workflow::Placement),
			"nsi" | "nsi_selection" => Ok(Workflow::NsiSelection),
			"nssi" | "nssi_selection" => Ok(Workflow::NssiSelection),
			"nst" | "nst_selection" => Ok(Workflow::NstSelection),
			other => Err(WorkflowError::InvalidRequest(format!(
				"Unknown workflow: {}",
				other
			))),
		}
	}
}

/// Request info and demands pulled out of a raw request.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowInput {
	pub request_info: RequestInfo,
	pub demands: Vec<Demand>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlacementRequest {
	request_info: RequestInfo,
	placement_info: PlacementInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlacementInfo {
	#[serde(default)]
	placement_demands: Vec<Demand>,
}

/// Model reference used by the slice selection requests.
#[derive(Debug, Clone, Deserialize)]
struct ModelReference {
	#[serde(rename = "UUID", default)]
	uuid: Option<String>,
	#[serde(rename = "invariantUUID", default)]
	invariant_uuid: Option<String>,
	name: String,
}

impl ModelReference {
	fn into_demand(self) -> Demand {
		Demand::named(
			self.name.clone(),
			ResourceModelInfo {
				model_invariant_id: self.invariant_uuid,
				model_version_id: self.uuid,
				model_name: Some(self.name),
				..Default::default()
			},
		)
	}
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
	One(T),
	Many(Vec<T>),
}

impl<T> OneOrMany<T> {
	fn into_vec(self) -> Vec<T> {
		match self {
			OneOrMany::One(item) => vec![item],
			OneOrMany::Many(items) => items,
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NsiSelectionRequest {
	request_info: RequestInfo,
	#[serde(rename = "NSTInfo")]
	nst_info: OneOrMany<ModelReference>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NssiSelectionRequest {
	request_info: RequestInfo,
	#[serde(rename = "NSSTInfo")]
	nsst_info: OneOrMany<ModelReference>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NstSelectionRequest {
	request_info: RequestInfo,
}

impl Workflow {
	pub fn extract(&self, request: &Value) -> Result<WorkflowInput, WorkflowError> {
		let input = match self {
			Workflow::Placement => {
				let parsed: PlacementRequest = decode(request)?;
				WorkflowInput {
					request_info: parsed.request_info,
					demands: parsed.placement_info.placement_demands,
				}
			}
			Workflow::NsiSelection => {
				let parsed: NsiSelectionRequest = decode(request)?;
				WorkflowInput {
					request_info: parsed.request_info,
					demands: demands_from(parsed.nst_info),
				}
			}
			Workflow::NssiSelection => {
				let parsed: NssiSelectionRequest = decode(request)?;
				WorkflowInput {
					request_info: parsed.request_info,
					demands: demands_from(parsed.nsst_info),
				}
			}
			Workflow::NstSelection => {
				let parsed: NstSelectionRequest = decode(request)?;
				WorkflowInput {
					request_info: parsed.request_info,
					demands: vec![Demand::named(NST_DEMAND, ResourceModelInfo::default())],
				}
			}
		};

		if input.demands.is_empty() {
			return Err(WorkflowError::InvalidRequest(format!(
				"{} request carries no demands",
				self
			)));
		}
		Ok(input)
	}
}

fn demands_from(models: OneOrMany<ModelReference>) -> Vec<Demand> {
	models
		.into_vec()
		.into_iter()
		.map(ModelReference::into_demand)
		.collect()
}

fn decode<T: DeserializeOwned>(request: &Value) -> Result<T, WorkflowError> {
	T::deserialize(request).map_err(|e| WorkflowError::InvalidRequest(e.to_string()))
}
