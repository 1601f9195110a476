pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{connect, connect_with, DemoMarketplace, HttpMarketplaceClient};
pub use config::{cli::LocalStorage, ClientConfig};
pub use crate::core::{
    poller::{PollState, StreamPoller},
    selection::SelectionModel,
    session::{CreateDatasetSession, ViewState},
    streams::{StreamRecord, StreamRegistry, StreamStatus},
};
pub use domain::ports::MarketplaceApi;
pub use utils::error::{MarketplaceError, Result};
