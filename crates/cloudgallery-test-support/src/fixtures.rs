//! Record builders, sample bitmaps, and configuration pointed at mock servers.

use std::io::Cursor;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use cloudgallery_api_models::ImageRecord;
use cloudgallery_config::ClientConfig;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde_json::{Value, json};
use url::Url;

/// Minimal record with only the required fields set.
#[must_use]
pub fn image_record(id: i64) -> ImageRecord {
    ImageRecord {
        id,
        filename: format!("{id:04}.jpg"),
        thumbnail: format!("{id:04}.jpg"),
        description: None,
        location: None,
        capture_date: None,
        resolution: None,
        ai_tags: None,
    }
}

/// Fully populated record.
#[must_use]
pub fn described_record(id: i64, description: &str) -> ImageRecord {
    ImageRecord {
        description: Some(description.to_string()),
        location: Some("Lisbon".to_string()),
        capture_date: NaiveDate::from_ymd_opt(2024, 3, 9).and_then(|d| d.and_hms_opt(14, 5, 0)),
        resolution: Some("640x480".to_string()),
        ai_tags: Some("river, bridge".to_string()),
        ..image_record(id)
    }
}

/// JSON body the backend returns for `record`.
#[must_use]
pub fn record_json(record: &ImageRecord) -> Value {
    json!({
        "id": record.id,
        "filename": record.filename,
        "thumbnail": record.thumbnail,
        "description": record.description,
        "location": record.location,
        "capture_date": record
            .capture_date
            .map(|date| date.format("%Y-%m-%dT%H:%M:%S").to_string()),
        "resolution": record.resolution,
        "ai_tags": record.ai_tags,
    })
}

/// JSON array body for a list of records.
#[must_use]
pub fn records_json(records: &[ImageRecord]) -> Value {
    Value::Array(records.iter().map(record_json).collect())
}

/// Gradient bitmap of the requested size.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 96])
    }))
}

/// PNG-encoded gradient.
///
/// # Errors
///
/// Returns an error when encoding fails.
pub fn png_bytes(width: u32, height: u32) -> Result<Vec<u8>> {
    let mut bytes = Cursor::new(Vec::new());
    gradient(width, height)
        .write_to(&mut bytes, ImageFormat::Png)
        .context("failed to encode PNG fixture")?;
    Ok(bytes.into_inner())
}

/// Write a PNG fixture to `path`.
///
/// # Errors
///
/// Returns an error when encoding or writing fails.
pub fn write_png(path: &Path, width: u32, height: u32) -> Result<()> {
    std::fs::write(path, png_bytes(width, height)?)
        .with_context(|| format!("failed to write fixture {}", path.display()))
}

/// Configuration whose backend is `base_url` (as given by a mock server).
///
/// Upload lingering is disabled and the progress connect bound is short.
///
/// # Errors
///
/// Returns an error when `base_url` is not a URL with a port.
pub fn config_for(base_url: &str, session_file: &Path) -> Result<ClientConfig> {
    let origin = Url::parse(base_url).context("mock server URL")?;
    let port = origin.port().context("mock server URL has no port")?;
    let mut config = ClientConfig::with_session_file(session_file.to_path_buf())?;
    config.app_origin = origin;
    config.backend_port = port;
    config.http_timeout_secs = 5;
    config.progress_connect_timeout_ms = 500;
    config.post_upload_delay_ms = 0;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_json_round_trips_through_the_model() {
        let record = described_record(3, "Bridge");
        let parsed: ImageRecord =
            serde_json::from_value(record_json(&record)).expect("deserialize");
        assert_eq!(parsed, record);
    }

    #[test]
    fn png_fixture_decodes() {
        let bytes = png_bytes(12, 7).expect("png");
        let decoded = image::load_from_memory(&bytes).expect("decode");
        assert_eq!((decoded.width(), decoded.height()), (12, 7));
    }

    #[test]
    fn config_points_at_the_mock_port() {
        let config =
            config_for("http://127.0.0.1:4567", Path::new("/tmp/s.json")).expect("config");
        assert_eq!(config.backend_port, 4567);
        assert_eq!(
            config.endpoint().expect("endpoint").http_base().as_str(),
            "http://127.0.0.1:4567/"
        );
    }
}
