//! Configuration types.

use osdf_types::serde_helpers::ordered_map;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Complete service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OsdfConfig {
	#[serde(default)]
	pub service: ServiceSettings,
	/// Remote Solver Service settings
	pub solver: SolverServiceConfig,
	#[serde(default)]
	pub policy: PolicyConfig,
	#[serde(default)]
	pub builder: BuilderConfig,
	#[serde(default)]
	pub translation: TranslationConfig,
}

/// Service identity and worker sizing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceSettings {
	#[serde(default = "default_service_name")]
	pub name: String,
	#[serde(default = "default_log_level")]
	pub log_level: String,
	/// Upper bound on requests processed at the same time
	#[serde(default = "default_max_concurrent_requests")]
	pub max_concurrent_requests: usize,
}

impl Default for ServiceSettings {
	fn default() -> Self {
		Self {
			name: default_service_name(),
			log_level: default_log_level(),
			max_concurrent_requests: default_max_concurrent_requests(),
		}
	}
}

/// Solver Service endpoint and polling protocol settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SolverServiceConfig {
	/// Base URL plans are submitted to
	pub url: String,
	#[serde(default)]
	pub username: Option<String>,
	#[serde(default)]
	pub password: Option<String>,
	/// Send `X-MinorVersion` on every call
	#[serde(default)]
	pub versioning_enabled: bool,
	#[serde(default)]
	pub minor_version: Option<u32>,
	/// Seconds between two polls
	#[serde(default = "default_ping_wait_secs")]
	pub ping_wait_secs: u64,
	/// Upper bound on polls, combined with the client timeout
	#[serde(default = "default_max_retries")]
	pub max_retries: u32,
	/// Seconds to wait between submit and the first follow-up
	#[serde(default = "default_settle_delay_secs")]
	pub settle_delay_secs: u64,
	/// Per-call HTTP timeout in seconds
	#[serde(default = "default_http_timeout_secs")]
	pub http_timeout_secs: u64,
}

impl SolverServiceConfig {
	pub fn ping_wait(&self) -> Duration {
		Duration::from_secs(self.ping_wait_secs)
	}

	pub fn settle_delay(&self) -> Duration {
		Duration::from_secs(self.settle_delay_secs)
	}

	pub fn http_timeout(&self) -> Duration {
		Duration::from_secs(self.http_timeout_secs)
	}

	/// Minor version header value, only when versioning is switched on.
	pub fn minor_version_header(&self) -> Option<String> {
		if self.versioning_enabled {
			self.minor_version.map(|v| v.to_string())
		} else {
			None
		}
	}
}

/// Where policies are read from
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PolicyConfig {
	#[serde(default)]
	pub backend: PolicyBackend,
	/// Directory holding `<service type>.json` files for the file backend
	#[serde(default = "default_policy_path")]
	pub path: PathBuf,
}

impl Default for PolicyConfig {
	fn default() -> Self {
		Self {
			backend: PolicyBackend::default(),
			path: default_policy_path(),
		}
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyBackend {
	#[default]
	File,
	Memory,
}

/// A request parameter always extracted for the solver.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct QueryParameter {
	/// Parameter name in the constraint request
	pub attribute: String,
	/// Dotted path into the raw request
	pub location: String,
}

/// Key tables used while building the constraint request
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BuilderConfig {
	/// Policy attribute key to inventory attribute key; keys missing here are
	/// converted from camelCase to hyphenated form
	#[serde(default = "default_attribute_remapping")]
	pub attribute_remapping: HashMap<String, String>,
	/// `cloudAttributeProperty` key to `evaluate` key for attribute policies
	#[serde(with = "ordered_map", default = "default_evaluate_attributes")]
	pub evaluate_attributes: Vec<(String, String)>,
	#[serde(default = "default_query_parameters")]
	pub default_query_parameters: Vec<QueryParameter>,
}

impl Default for BuilderConfig {
	fn default() -> Self {
		Self {
			attribute_remapping: default_attribute_remapping(),
			evaluate_attributes: default_evaluate_attributes(),
			default_query_parameters: default_query_parameters(),
		}
	}
}

/// Rename table applied to solver recommendations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranslationConfig {
	#[serde(with = "ordered_map", default = "default_rename_table")]
	pub rename_table: Vec<(String, String)>,
}

impl Default for TranslationConfig {
	fn default() -> Self {
		Self {
			rename_table: default_rename_table(),
		}
	}
}

impl TranslationConfig {
	pub fn rename(&self, key: &str) -> Option<&str> {
		self.rename_table
			.iter()
			.find(|(from, _)| from == key)
			.map(|(_, to)| to.as_str())
	}
}

fn default_service_name() -> String {
	"osdf".to_string()
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_max_concurrent_requests() -> usize {
	16
}

fn default_ping_wait_secs() -> u64 {
	60
}

fn default_max_retries() -> u32 {
	30
}

fn default_settle_delay_secs() -> u64 {
	10
}

fn default_http_timeout_secs() -> u64 {
	30
}

fn default_policy_path() -> PathBuf {
	PathBuf::from("policies")
}

fn pairs(table: &[(&str, &str)]) -> Vec<(String, String)> {
	table
		.iter()
		.map(|(from, to)| (from.to_string(), to.to_string()))
		.collect()
}

fn default_attribute_remapping() -> HashMap<String, String> {
	pairs(&[
		("cloudVersion", "cloud_version"),
		("cloudType", "cloud_type"),
		("dataPlane", "dataplane"),
		("networkRoles", "network_roles"),
		("geoRegion", "geo_region"),
		("exclusivityGroups", "exclusivity_groups"),
		("replicationRole", "replication_role"),
		("equipmentRole", "equipment-role"),
		("customerId", "global-customer-id"),
		("modelInvariantId", "model-invariant-id"),
		("modelVersionId", "model-version-id"),
	])
	.into_iter()
	.collect()
}

fn default_evaluate_attributes() -> Vec<(String, String)> {
	pairs(&[
		("hypervisor", "hypervisor"),
		("cloudVersion", "cloud_version"),
		("cloudType", "cloud_type"),
		("dataPlane", "dataplane"),
		("networkRoles", "network_roles"),
		("complex", "complex"),
		("state", "state"),
		("country", "country"),
		("geoRegion", "geo_region"),
		("exclusivityGroups", "exclusivity_groups"),
		("replicationRole", "replication_role"),
	])
}

fn default_query_parameters() -> Vec<QueryParameter> {
	[
		("customer_lat", "customerLatitude"),
		("customer_long", "customerLongitude"),
		("REQUIRED_MEM", "requiredMemory"),
		("REQUIRED_DISK", "requiredDisk"),
	]
	.iter()
	.map(|(attribute, location)| QueryParameter {
		attribute: attribute.to_string(),
		location: location.to_string(),
	})
	.collect()
}

fn default_rename_table() -> Vec<(String, String)> {
	pairs(&[
		("physical-location-id", "cloudClli"),
		("host_id", "vnfHostName"),
		("cloud_version", "cloudVersion"),
		("cloud_owner", "cloudOwner"),
		("cloud", "cloudRegionId"),
		("service", "serviceInstanceId"),
		("is_rehome", "isRehome"),
		("location_id", "locationId"),
		("location_type", "locationType"),
		("directives", "oof_directives"),
		("sriov_automation", "sriovAutomation"),
		("vim-id", "vimId"),
	])
}
