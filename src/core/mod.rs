pub mod catalog;
pub mod export;
pub mod poller;
pub mod selection;
pub mod session;
pub mod streams;
pub mod summary;

pub use crate::domain::model::{Row, Source, StreamSnapshot};
pub use crate::domain::ports::{ConfigProvider, MarketplaceApi, Storage};
pub use crate::utils::error::Result;
