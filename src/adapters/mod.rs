// Adapters layer: concrete MarketplaceApi implementations.

pub mod demo;
pub mod http;

pub use demo::DemoMarketplace;
pub use http::HttpMarketplaceClient;

use crate::domain::ports::{ConfigProvider, MarketplaceApi};
use crate::utils::error::{MarketplaceError, Result};
use std::sync::Arc;

/// Builds the client the configuration asks for.
pub fn connect<C: ConfigProvider + ?Sized>(config: &C) -> Result<Arc<dyn MarketplaceApi>> {
    connect_with(config, true)
}

/// Like [`connect`], but `require_key = false` allows an HTTP client
/// without an API key (enough for `/health`).
pub fn connect_with<C: ConfigProvider + ?Sized>(
    config: &C,
    require_key: bool,
) -> Result<Arc<dyn MarketplaceApi>> {
    if config.demo_mode() {
        tracing::info!("Using the offline demo marketplace");
        return Ok(Arc::new(DemoMarketplace::new(config.demo_delay())));
    }

    let api_key = config.api_key().map(str::to_string);
    if require_key && api_key.is_none() {
        return Err(MarketplaceError::MissingConfigError {
            field: "api.api_key".to_string(),
        });
    }

    let mut client = HttpMarketplaceClient::with_optional_key(config.base_url(), api_key);
    if let Some(timeout) = config.request_timeout() {
        client = client.with_timeout(timeout)?;
    }
    tracing::debug!(
        "Using marketplace API at {} (api key: {})",
        client.base_url(),
        client.has_api_key()
    );
    Ok(Arc::new(client))
}
