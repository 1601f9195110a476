use crate::core::Storage;
use crate::domain::model::GenerateResponse;
use crate::domain::ports::MarketplaceApi;
use crate::utils::error::{MarketplaceError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Registry file name, relative to the storage root.
pub const REGISTRY_FILE: &str = "streams.json";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamStatus {
    #[default]
    Active,
    Paused,
    Error,
}

impl fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamStatus::Active => f.write_str("active"),
            StreamStatus::Paused => f.write_str("paused"),
            StreamStatus::Error => f.write_str("error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamRecord {
    pub id: String,
    pub dataset_id: String,
    pub endpoint: String,
    pub source_count: usize,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub status: StreamStatus,
    #[serde(default)]
    pub row_count: usize,
    #[serde(default)]
    pub last_error: Option<String>,
}

/// The streams this client has generated, newest last.
///
/// Kept on disk as JSON so later invocations can list, refresh and remove them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamRegistry {
    streams: Vec<StreamRecord>,
}

impl StreamRegistry {
    /// Loads the registry; a missing file is an empty registry.
    pub async fn load<S: Storage>(storage: &S) -> Result<Self> {
        match storage.read_file(REGISTRY_FILE).await {
            Ok(data) => Ok(serde_json::from_slice(&data)?),
            Err(MarketplaceError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No stream registry yet, starting empty");
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn save<S: Storage>(&self, storage: &S) -> Result<String> {
        let data = serde_json::to_vec_pretty(self)?;
        storage.write_file(REGISTRY_FILE, &data).await
    }

    pub fn records(&self) -> &[StreamRecord] {
        &self.streams
    }

    pub fn get(&self, stream_id: &str) -> Option<&StreamRecord> {
        self.streams.iter().find(|s| s.id == stream_id)
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// Records a freshly generated stream. Generating the same id again replaces it.
    pub fn record(&mut self, dataset_id: &str, response: &GenerateResponse) -> &StreamRecord {
        let now = Utc::now();
        let record = StreamRecord {
            id: response.dataset_id.clone(),
            dataset_id: dataset_id.to_string(),
            endpoint: response.endpoint.clone(),
            source_count: response.selected_sources.len(),
            created_at: now,
            last_updated: now,
            status: StreamStatus::Active,
            row_count: response.sample.len(),
            last_error: None,
        };
        self.streams.retain(|s| s.id != record.id);
        self.streams.push(record);
        tracing::info!("Recorded stream {} for dataset {}", response.dataset_id, dataset_id);
        &self.streams[self.streams.len() - 1]
    }

    pub fn remove(&mut self, stream_id: &str) -> Option<StreamRecord> {
        let index = self.streams.iter().position(|s| s.id == stream_id)?;
        Some(self.streams.remove(index))
    }

    /// Marks a stream paused or active again. Returns false for unknown ids.
    pub fn set_paused(&mut self, stream_id: &str, paused: bool) -> bool {
        let Some(record) = self.streams.iter_mut().find(|s| s.id == stream_id) else {
            return false;
        };
        record.status = if paused {
            StreamStatus::Paused
        } else {
            StreamStatus::Active
        };
        record.last_updated = Utc::now();
        true
    }

    /// Fetches the stream once and stores the outcome on its record.
    ///
    /// API failures are recorded as [`StreamStatus::Error`] rather than
    /// returned; only an id missing from the registry is an error. A paused
    /// stream stays paused unless the fetch fails.
    pub async fn refresh(
        &mut self,
        api: &dyn MarketplaceApi,
        stream_id: &str,
    ) -> Result<&StreamRecord> {
        let index = self
            .streams
            .iter()
            .position(|s| s.id == stream_id)
            .ok_or_else(|| MarketplaceError::NotFound {
                resource: format!("stream '{}' in the local registry", stream_id),
            })?;

        let outcome = api.get_stream(stream_id).await;
        let record = &mut self.streams[index];
        record.last_updated = Utc::now();
        match outcome {
            Ok(snapshot) => {
                record.row_count = snapshot.rows.len();
                record.last_error = None;
                if record.status == StreamStatus::Error {
                    record.status = StreamStatus::Active;
                }
            }
            Err(e) => {
                tracing::warn!("Refreshing stream {} failed: {}", stream_id, e);
                record.status = StreamStatus::Error;
                record.last_error = Some(e.to_string());
            }
        }
        Ok(&*record)
    }

    /// Refreshes every recorded stream in order.
    pub async fn refresh_all(&mut self, api: &dyn MarketplaceApi) -> Result<()> {
        let ids: Vec<String> = self.streams.iter().map(|s| s.id.clone()).collect();
        for id in ids {
            self.refresh(api, &id).await?;
        }
        Ok(())
    }
}
