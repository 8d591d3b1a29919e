//! Configuration loading for the optimization service.
//!
//! Files may be TOML, JSON or YAML (picked by extension). `${VAR}` references
//! are substituted from the environment before parsing, then a handful of
//! `OSDF_*` variables override individual settings.

use std::env;
use std::path::Path;
use thiserror::Error;

pub mod types;

pub use types::*;

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("File not found: {0}")]
	FileNotFound(String),

	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Validation error: {0}")]
	ValidationError(String),

	#[error("Environment variable not found: {0}")]
	EnvVarNotFound(String),

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
	Toml,
	Json,
	Yaml,
}

impl ConfigFormat {
	/// Format implied by the file extension; unknown extensions are read as TOML.
	pub fn from_path(path: &Path) -> Self {
		match path.extension().and_then(|s| s.to_str()) {
			Some("json") => ConfigFormat::Json,
			Some("yaml") | Some("yml") => ConfigFormat::Yaml,
			_ => ConfigFormat::Toml,
		}
	}
}

/// Configuration loader with environment variable substitution
pub struct ConfigLoader {
	file_path: Option<String>,
	env_prefix: String,
}

impl Default for ConfigLoader {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigLoader {
	pub fn new() -> Self {
		Self {
			file_path: None,
			env_prefix: "OSDF_".to_string(),
		}
	}

	pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
		self.file_path = Some(path.as_ref().to_string_lossy().to_string());
		self
	}

	pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.env_prefix = prefix.into();
		self
	}

	pub async fn load(&self) -> Result<OsdfConfig, ConfigError> {
		let mut config = if let Some(file_path) = &self.file_path {
			self.load_from_file(file_path).await?
		} else {
			return Err(ConfigError::FileNotFound(
				"No configuration file specified".to_string(),
			));
		};

		self.apply_env_overrides(&mut config)?;
		validate_config(&config)?;

		tracing::debug!(
			solver_url = %config.solver.url,
			policy_backend = ?config.policy.backend,
			"Configuration loaded"
		);
		Ok(config)
	}

	async fn load_from_file(&self, file_path: &str) -> Result<OsdfConfig, ConfigError> {
		let path = Path::new(file_path);
		if !path.exists() {
			return Err(ConfigError::FileNotFound(file_path.to_string()));
		}
		let content = tokio::fs::read_to_string(path).await?;
		let substituted = substitute_env_vars(&content)?;
		parse_config(&substituted, ConfigFormat::from_path(path))
	}

	fn apply_env_overrides(&self, config: &mut OsdfConfig) -> Result<(), ConfigError> {
		let var = |name: &str| env::var(format!("{}{}", self.env_prefix, name)).ok();

		if let Some(url) = var("SOLVER_URL") {
			config.solver.url = url;
		}
		if let Some(username) = var("SOLVER_USERNAME") {
			config.solver.username = Some(username);
		}
		if let Some(password) = var("SOLVER_PASSWORD") {
			config.solver.password = Some(password);
		}
		if let Some(log_level) = var("LOG_LEVEL") {
			config.service.log_level = log_level;
		}
		if let Some(max) = var("MAX_CONCURRENT_REQUESTS") {
			config.service.max_concurrent_requests = max.parse().map_err(|e| {
				ConfigError::ValidationError(format!("Invalid max concurrent requests: {}", e))
			})?;
		}

		Ok(())
	}
}

/// Parses already substituted configuration text.
pub fn parse_config(content: &str, format: ConfigFormat) -> Result<OsdfConfig, ConfigError> {
	let parsed = match format {
		ConfigFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
		ConfigFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
		ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
	};
	parsed.map_err(ConfigError::ParseError)
}

/// Replaces every `${VAR_NAME}` with the value of that environment variable.
pub fn substitute_env_vars(content: &str) -> Result<String, ConfigError> {
	let re = regex::Regex::new(r"\$\{([^}]+)\}")
		.map_err(|e| ConfigError::ParseError(e.to_string()))?;

	let mut result = content.to_string();
	for cap in re.captures_iter(content) {
		let full_match = &cap[0];
		let var_name = &cap[1];

		let env_value =
			env::var(var_name).map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;

		result = result.replace(full_match, &env_value);
	}

	Ok(result)
}

pub fn validate_config(config: &OsdfConfig) -> Result<(), ConfigError> {
	let url = config.solver.url.trim();
	if url.is_empty() {
		return Err(ConfigError::ValidationError(
			"solver.url must not be empty".to_string(),
		));
	}
	if !(url.starts_with("http://") || url.starts_with("https://")) {
		return Err(ConfigError::ValidationError(format!(
			"solver.url must be an http(s) URL, got '{}'",
			url
		)));
	}
	if config.solver.ping_wait_secs == 0 {
		return Err(ConfigError::ValidationError(
			"solver.ping_wait_secs must be positive".to_string(),
		));
	}
	if config.solver.max_retries == 0 {
		return Err(ConfigError::ValidationError(
			"solver.max_retries must be positive".to_string(),
		));
	}
	if config.solver.versioning_enabled && config.solver.minor_version.is_none() {
		return Err(ConfigError::ValidationError(
			"solver.minor_version is required when versioning is enabled".to_string(),
		));
	}
	if config.solver.username.is_some() != config.solver.password.is_some() {
		return Err(ConfigError::ValidationError(
			"solver.username and solver.password must be set together".to_string(),
		));
	}
	if config.service.max_concurrent_requests == 0 {
		return Err(ConfigError::ValidationError(
			"service.max_concurrent_requests must be positive".to_string(),
		));
	}
	if config.policy.backend == PolicyBackend::File && config.policy.path.as_os_str().is_empty() {
		return Err(ConfigError::ValidationError(
			"policy.path is required for the file backend".to_string(),
		));
	}
	Ok(())
}
