//! HTTP transport to the Solver Service.

use crate::{SolverTransport, TransportError};
use async_trait::async_trait;
use osdf_config::SolverServiceConfig;
use osdf_types::{ConstraintRequest, PlanEnvelope, SubmitResponse};
use serde::de::DeserializeOwned;

const TRANSACTION_ID_HEADER: &str = "transaction_id";
const MINOR_VERSION_HEADER: &str = "X-MinorVersion";

pub struct HttpSolverTransport {
	client: reqwest::Client,
	url: String,
	credentials: Option<(String, String)>,
	minor_version: Option<String>,
}

impl HttpSolverTransport {
	pub fn new(config: &SolverServiceConfig) -> Result<Self, TransportError> {
		let client = reqwest::Client::builder()
			.timeout(config.http_timeout())
			.build()
			.map_err(|e| TransportError::Http(format!("Failed to create HTTP client: {}", e)))?;

		let credentials = match (&config.username, &config.password) {
			(Some(user), Some(password)) => Some((user.clone(), password.clone())),
			_ => None,
		};

		Ok(Self {
			client,
			url: config.url.clone(),
			credentials,
			minor_version: config.minor_version_header(),
		})
	}

	fn decorate(&self, request: reqwest::RequestBuilder, transaction_id: &str) -> reqwest::RequestBuilder {
		let mut request = request.header(TRANSACTION_ID_HEADER, transaction_id);
		if let Some(version) = &self.minor_version {
			request = request.header(MINOR_VERSION_HEADER, version);
		}
		if let Some((user, password)) = &self.credentials {
			request = request.basic_auth(user, Some(password));
		}
		request
	}

	async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T, TransportError> {
		let response = request
			.send()
			.await
			.map_err(|e| TransportError::Http(e.to_string()))?;

		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			return Err(TransportError::Status {
				status: status.as_u16(),
				body,
			});
		}

		response
			.json()
			.await
			.map_err(|e| TransportError::Decode(e.to_string()))
	}
}

#[async_trait]
impl SolverTransport for HttpSolverTransport {
	async fn submit(
		&self,
		request: &ConstraintRequest,
		transaction_id: &str,
	) -> Result<SubmitResponse, TransportError> {
		tracing::debug!(url = %self.url, transaction_id, "Submitting plan");
		let call = self.decorate(self.client.post(&self.url), transaction_id).json(request);
		self.send(call).await
	}

	async fn fetch_plan(&self, url: &str, transaction_id: &str) -> Result<PlanEnvelope, TransportError> {
		tracing::debug!(url, transaction_id, "Fetching plan");
		let call = self.decorate(self.client.get(url), transaction_id);
		self.send(call).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use osdf_types::PlanStatus;
	use serde_json::{json, Map};
	use wiremock::matchers::{body_partial_json, header, header_exists, method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	fn config(url: String) -> SolverServiceConfig {
		SolverServiceConfig {
			url,
			username: Some("osdf".to_string()),
			password: Some("secret".to_string()),
			versioning_enabled: true,
			minor_version: Some(2),
			ping_wait_secs: 1,
			max_retries: 1,
			settle_delay_secs: 0,
			http_timeout_secs: 5,
		}
	}

	fn request() -> ConstraintRequest {
		ConstraintRequest {
			name: "req-1".to_string(),
			timeout: 600,
			limit: 1,
			demands: vec![],
			policies: vec![],
			optimization_policies: vec![],
			request_parameters: Map::new(),
		}
	}

	#[tokio::test]
	async fn test_submit_sends_headers_and_body() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/v1/plans"))
			.and(header("transaction_id", "tx-1"))
			.and(header("X-MinorVersion", "2"))
			.and(header_exists("authorization"))
			.and(body_partial_json(json!({"name": "req-1", "num_solution": "1"})))
			.respond_with(ResponseTemplate::new(201).set_body_json(json!({
				"status": "template",
				"links": [[{"href": format!("{}/v1/plans/p1", server.uri()), "rel": "self"}]]
			})))
			.expect(1)
			.mount(&server)
			.await;

		let transport = HttpSolverTransport::new(&config(format!("{}/v1/plans", server.uri()))).unwrap();
		let response = transport.submit(&request(), "tx-1").await.unwrap();
		assert_eq!(response.status, "template");
		assert_eq!(
			response.follow_up_url(),
			Some(format!("{}/v1/plans/p1", server.uri()).as_str())
		);
	}

	#[tokio::test]
	async fn test_fetch_plan() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/v1/plans/p1"))
			.and(header("transaction_id", "tx-2"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"plans": [{"status": "solving", "links": [[{"href": "next"}]]}]
			})))
			.mount(&server)
			.await;

		let transport = HttpSolverTransport::new(&config(format!("{}/v1/plans", server.uri()))).unwrap();
		let envelope = transport
			.fetch_plan(&format!("{}/v1/plans/p1", server.uri()), "tx-2")
			.await
			.unwrap();
		assert_eq!(envelope.first_plan().unwrap().status, PlanStatus::Pending);
	}

	#[tokio::test]
	async fn test_error_status_and_bad_body() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/down"))
			.respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
			.mount(&server)
			.await;
		Mock::given(method("GET"))
			.and(path("/garbage"))
			.respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
			.mount(&server)
			.await;

		let transport = HttpSolverTransport::new(&config(server.uri())).unwrap();
		let err = transport
			.fetch_plan(&format!("{}/down", server.uri()), "tx")
			.await
			.unwrap_err();
		assert!(matches!(err, TransportError::Status { status: 503, ref body } if body == "maintenance"));

		let err = transport
			.fetch_plan(&format!("{}/garbage", server.uri()), "tx")
			.await
			.unwrap_err();
		assert!(matches!(err, TransportError::Decode(_)));
	}
}
