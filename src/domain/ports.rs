use crate::domain::model::{
    ApiKey, Catalog, DatasetPreview, GenerateRequest, GenerateResponse, HealthStatus,
    PlanResponse, StreamSnapshot,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<String>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn base_url(&self) -> &str;
    fn api_key(&self) -> Option<&str>;
    fn request_timeout(&self) -> Option<Duration>;
    fn poll_interval(&self) -> Duration;
    fn output_path(&self) -> &str;
    fn demo_mode(&self) -> bool;
    fn demo_delay(&self) -> Duration;
}

/// Typed client for the marketplace API.
///
/// Every call resolves to either its payload or a [`MarketplaceError`],
/// so callers never see raw HTTP.
///
/// [`MarketplaceError`]: crate::utils::error::MarketplaceError
#[async_trait]
pub trait MarketplaceApi: Send + Sync {
    async fn health(&self) -> Result<HealthStatus>;
    async fn fetch_catalog(&self) -> Result<Catalog>;
    async fn preview_dataset(&self, dataset_id: &str) -> Result<DatasetPreview>;
    async fn plan_query(&self, query: &str) -> Result<PlanResponse>;
    async fn generate_dataset(&self, request: &GenerateRequest) -> Result<GenerateResponse>;
    async fn get_stream(&self, stream_id: &str) -> Result<StreamSnapshot>;
    async fn create_api_key(&self) -> Result<ApiKey>;
}
