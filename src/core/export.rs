use crate::core::summary::display_value;
use crate::core::Storage;
use crate::domain::model::{Row, StreamSnapshot};
use crate::utils::error::{MarketplaceError, Result};

/// Serializes rows as CSV. Columns come from the first row; cells missing
/// from later rows are left empty.
pub fn rows_to_csv(rows: &[Row]) -> Result<String> {
    let Some(first) = rows.first() else {
        return Ok(String::new());
    };
    let headers: Vec<&str> = first.keys().map(String::as_str).collect();

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&headers)?;
    for row in rows {
        writer.write_record(
            headers
                .iter()
                .map(|h| row.get(*h).map(display_value).unwrap_or_default()),
        )?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| MarketplaceError::IoError(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| MarketplaceError::IoError(std::io::Error::other(e)))
}

pub fn export_filename(stream_id: &str) -> String {
    format!("dataset-{}.csv", stream_id)
}

/// Writes the snapshot's rows to `dataset-{id}.csv` and returns the path.
pub async fn export_stream_csv<S: Storage>(storage: &S, snapshot: &StreamSnapshot) -> Result<String> {
    let csv = rows_to_csv(&snapshot.rows)?;
    let filename = export_filename(&snapshot.dataset_id);
    tracing::debug!("Exporting {} rows to {}", snapshot.rows.len(), filename);
    storage.write_file(&filename, csv.as_bytes()).await
}
