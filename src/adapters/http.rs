use crate::domain::model::{
    ApiKey, Catalog, DatasetPreview, GenerateRequest, GenerateResponse, HealthStatus,
    PlanRequest, PlanResponse, StreamSnapshot,
};
use crate::domain::ports::MarketplaceApi;
use crate::utils::error::{MarketplaceError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

pub const API_KEY_HEADER: &str = "X-API-Key";

/// [`MarketplaceApi`] over HTTP.
pub struct HttpMarketplaceClient {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl HttpMarketplaceClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_optional_key(base_url, Some(api_key.into()))
    }

    /// A client without an API key; only `/health` is expected to succeed.
    pub fn anonymous(base_url: impl Into<String>) -> Self {
        Self::with_optional_key(base_url, None)
    }

    pub fn with_optional_key(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client: Client::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn stream_endpoint(&self, stream_id: &str) -> String {
        format!("{}/v1/streams/{}", self.base_url, stream_id)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header(API_KEY_HEADER, key),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, resource: &str) -> Result<T> {
        let response = request.send().await?;
        tracing::debug!("{} -> {}", resource, response.status());

        if response.status().is_success() {
            Ok(response.json::<T>().await?)
        } else {
            Err(Self::status_error(response, resource).await)
        }
    }

    async fn status_error(response: Response, resource: &str) -> MarketplaceError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string()
        });

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                MarketplaceError::Unauthorized { message }
            }
            StatusCode::NOT_FOUND => MarketplaceError::NotFound {
                resource: resource.to_string(),
            },
            _ => MarketplaceError::ApiError {
                status: status.as_u16(),
                message,
            },
        }
    }
}

/// Pulls `error` or `detail` out of a JSON error body.
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["error", "detail"]
        .iter()
        .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .map(str::to_string)
}

#[async_trait]
impl MarketplaceApi for HttpMarketplaceClient {
    async fn health(&self) -> Result<HealthStatus> {
        self.send(self.client.get(self.url("/health")), "health").await
    }

    async fn fetch_catalog(&self) -> Result<Catalog> {
        let request = self.authorized(self.client.get(self.url("/v1/datasets/catalog")));
        self.send(request, "catalog").await
    }

    async fn preview_dataset(&self, dataset_id: &str) -> Result<DatasetPreview> {
        let path = format!("/v1/datasets/{}/preview", dataset_id);
        let request = self.authorized(self.client.get(self.url(&path)));
        self.send(request, &format!("dataset '{}'", dataset_id)).await
    }

    async fn plan_query(&self, query: &str) -> Result<PlanResponse> {
        let body = PlanRequest {
            query: query.to_string(),
        };
        let request = self.authorized(self.client.post(self.url("/v1/datasets/plan")).json(&body));
        self.send(request, "plan").await
    }

    async fn generate_dataset(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        let builder = self.authorized(
            self.client
                .post(self.url("/v1/datasets/generate"))
                .json(request),
        );
        self.send(builder, &format!("dataset '{}'", request.dataset_id))
            .await
    }

    async fn get_stream(&self, stream_id: &str) -> Result<StreamSnapshot> {
        let request = self.authorized(self.client.get(self.stream_endpoint(stream_id)));
        self.send(request, &format!("stream '{}'", stream_id)).await
    }

    async fn create_api_key(&self) -> Result<ApiKey> {
        let request = self.authorized(self.client.post(self.url("/v1/api_keys/create")));
        self.send(request, "api key").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_catalog_sends_api_key() {
        let server = MockServer::start();
        let catalog_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v1/datasets/catalog")
                .header("X-API-Key", "demo_test");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({"datasets": []}));
        });

        let client = HttpMarketplaceClient::new(server.base_url(), "demo_test");
        let catalog = client.fetch_catalog().await.unwrap();

        catalog_mock.assert();
        assert!(catalog.datasets.is_empty());
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_typed_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v1/streams/ds_1");
            then.status(401)
                .header("Content-Type", "application/json")
                .json_body(json!({"error": "Invalid or missing API key."}));
        });

        let client = HttpMarketplaceClient::new(server.base_url(), "wrong");
        let err = client.get_stream("ds_1").await.unwrap_err();

        match err {
            MarketplaceError::Unauthorized { message } => {
                assert_eq!(message, "Invalid or missing API key.")
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_not_found_names_resource() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v1/streams/ds_missing");
            then.status(404)
                .header("Content-Type", "application/json")
                .json_body(json!({"detail": "Dataset not found"}));
        });

        let client = HttpMarketplaceClient::new(server.base_url(), "demo_test");
        let err = client.get_stream("ds_missing").await.unwrap_err();
        assert!(matches!(
            err,
            MarketplaceError::NotFound { ref resource } if resource == "stream 'ds_missing'"
        ));
    }

    #[tokio::test]
    async fn test_server_error_without_json_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/datasets/plan");
            then.status(502).body("bad gateway");
        });

        let client = HttpMarketplaceClient::new(server.base_url(), "demo_test");
        let err = client.plan_query("fitness").await.unwrap_err();
        match err {
            MarketplaceError::ApiError { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "Bad Gateway");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_health_without_api_key() {
        let server = MockServer::start();
        let health_mock = server.mock(|when, then| {
            when.method(GET).path("/health").header_missing(API_KEY_HEADER);
            then.status(200).json_body(json!({"ok": true, "demo": false}));
        });
        let catalog_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v1/datasets/catalog")
                .header_missing(API_KEY_HEADER);
            then.status(401).json_body(json!({"error": "Invalid or missing API key."}));
        });

        let client = HttpMarketplaceClient::anonymous(server.base_url());
        assert!(!client.has_api_key());

        let health = client.health().await.unwrap();
        assert!(health.ok);
        health_mock.assert();

        assert!(matches!(
            client.fetch_catalog().await,
            Err(MarketplaceError::Unauthorized { .. })
        ));
        catalog_mock.assert();
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = HttpMarketplaceClient::new("http://localhost:8000/", "demo_x");
        assert_eq!(
            client.stream_endpoint("ds_1"),
            "http://localhost:8000/v1/streams/ds_1"
        );
    }
}
