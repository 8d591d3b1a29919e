//! File-backed policy provider.
//!
//! Reads `<service type>.json` from a base directory. A file holds either an
//! array of raw policies or `{"policies": [...], "provStatus": "..."}`.

use crate::{PolicyError, PolicyProvider, PolicySet};
use async_trait::async_trait;
use osdf_types::RawPolicy;
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use tokio::fs;

#[derive(Deserialize)]
#[serde(untagged)]
enum PolicyFile {
	List(Vec<RawPolicy>),
	Document {
		policies: Vec<RawPolicy>,
		#[serde(rename = "provStatus", default)]
		prov_status: Option<String>,
	},
}

pub struct FilePolicyProvider {
	base_path: PathBuf,
}

impl FilePolicyProvider {
	pub fn new(base_path: PathBuf) -> Self {
		Self { base_path }
	}

	fn get_file_path(&self, service_type: &str) -> PathBuf {
		let safe_name = service_type.replace(['/', '\\', ':'], "_");
		self.base_path.join(format!("{}.json", safe_name))
	}
}

#[async_trait]
impl PolicyProvider for FilePolicyProvider {
	async fn get_policies(
		&self,
		_request: &Value,
		service_type: &str,
	) -> Result<PolicySet, PolicyError> {
		let path = self.get_file_path(service_type);
		let content = match fs::read_to_string(&path).await {
			Ok(content) => content,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				return Err(PolicyError::Provider(format!(
					"No policy file for service type '{}' at {}",
					service_type,
					path.display()
				)))
			}
			Err(e) => return Err(PolicyError::Provider(e.to_string())),
		};

		let file: PolicyFile = serde_json::from_str(&content).map_err(|e| {
			PolicyError::Provider(format!("Invalid policy file {}: {}", path.display(), e))
		})?;
		let set = match file {
			PolicyFile::List(policies) => PolicySet {
				policies,
				prov_status: None,
			},
			PolicyFile::Document {
				policies,
				prov_status,
			} => PolicySet {
				policies,
				prov_status,
			},
		};
		tracing::debug!(path = %path.display(), count = set.policies.len(), "Loaded policy file");
		Ok(set)
	}
}
