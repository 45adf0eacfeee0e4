#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls)]
#![warn(
    unused,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs
)]
//! Shared HTTP and WebSocket DTOs for the CloudGallery backend.
//!
//! The backend owns every record described here; the client only fetches,
//! displays, and resubmits them. Both the client core and the CLI decode
//! responses through these types so the wire contract lives in one place.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Location string the backend stores when EXIF carries no GPS data.
pub const UNKNOWN_LOCATION: &str = "Unknown";

/// Separator the backend uses when joining AI tags into one column.
const TAG_SEPARATOR: &str = ", ";

/// Image record as returned by `/my-images/`, `/search/`, and `/images/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageRecord {
    /// Backend-assigned identifier.
    pub id: i64,
    /// Stored file name of the original under `/static/originals/`.
    pub filename: String,
    /// Stored file name of the thumbnail under `/static/thumbnails/`.
    pub thumbnail: String,
    /// Free-form description supplied by the owner.
    #[serde(default)]
    pub description: Option<String>,
    /// Capture location (reverse-geocoded or user supplied).
    #[serde(default)]
    pub location: Option<String>,
    /// Capture timestamp extracted from EXIF or edited by the owner.
    #[serde(default, deserialize_with = "datetime::deserialize_opt")]
    pub capture_date: Option<NaiveDateTime>,
    /// Pixel resolution rendered as `WIDTHxHEIGHT`.
    #[serde(default)]
    pub resolution: Option<String>,
    /// Comma-joined tags produced by the backend classifier.
    #[serde(default)]
    pub ai_tags: Option<String>,
}

impl ImageRecord {
    /// Title shown in grids and captions: the description, else the file name.
    #[must_use]
    pub fn display_title(&self) -> &str {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(&self.filename)
    }

    /// AI tags split into individual labels.
    #[must_use]
    pub fn tags(&self) -> Vec<&str> {
        self.ai_tags
            .as_deref()
            .map(|raw| {
                raw.split(TAG_SEPARATOR)
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether the record carries a location worth showing.
    #[must_use]
    pub fn has_known_location(&self) -> bool {
        self.location
            .as_deref()
            .map(str::trim)
            .is_some_and(|value| !value.is_empty() && value != UNKNOWN_LOCATION)
    }
}

/// Metadata patch accepted by `PUT /images/{id}`.
///
/// Every field is sent; `None` serialises as `null` so the backend clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageUpdate {
    /// Replacement description.
    pub description: Option<String>,
    /// Replacement location.
    pub location: Option<String>,
    /// Replacement capture timestamp.
    pub capture_date: Option<NaiveDateTime>,
}

/// Bearer token returned by the `/token` credential exchange.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessToken {
    /// Opaque bearer credential.
    pub access_token: String,
    /// Token scheme, `bearer` in practice.
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Account creation payload for `POST /register`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegisterRequest {
    /// Desired login name.
    pub username: String,
    /// Contact e-mail address.
    pub email: String,
    /// Plain-text password (sent over the transport, hashed server side).
    pub password: String,
}

/// Account summary returned after registration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    /// Backend-assigned identifier.
    pub id: i64,
    /// Login name.
    pub username: String,
    /// Contact e-mail address.
    pub email: String,
    /// Account creation timestamp.
    #[serde(default, deserialize_with = "datetime::deserialize_opt")]
    pub created_at: Option<NaiveDateTime>,
}

/// Error document emitted by the backend on rejected requests.
///
/// `detail` is either a plain message or a list of validation entries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProblemDetail {
    /// Raw `detail` payload.
    #[serde(default)]
    pub detail: Value,
}

impl ProblemDetail {
    /// Flatten the detail payload into one human-readable message.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        match &self.detail {
            Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Value::Array(entries) => {
                let messages: Vec<String> = entries
                    .iter()
                    .filter_map(|entry| {
                        let msg = entry.get("msg").and_then(Value::as_str)?;
                        let field = entry
                            .get("loc")
                            .and_then(Value::as_array)
                            .and_then(|loc| loc.last())
                            .and_then(Value::as_str);
                        Some(field.map_or_else(|| msg.to_string(), |f| format!("{f}: {msg}")))
                    })
                    .collect();
                if messages.is_empty() {
                    None
                } else {
                    Some(messages.join("; "))
                }
            }
            _ => None,
        }
    }
}

/// Typed inbound message on the `/ws/{client_id}` progress channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum ProgressFrame {
    /// One plain-text processing step (resizing, tagging, ...).
    LogLine(String),
}

impl ProgressFrame {
    /// Wrap a received text frame.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        Self::LogLine(text.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Machine-friendly discriminator.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::LogLine(_) => "log_line",
        }
    }

    /// Text carried by the frame.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::LogLine(text) => text,
        }
    }
}

/// Lenient timestamp decoding for backend datetimes.
pub mod datetime {
    use chrono::{DateTime, NaiveDateTime};
    use serde::{Deserialize, Deserializer};

    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];

    /// Parse naive ISO-8601 values as well as RFC 3339 values carrying an offset.
    ///
    /// Offsets are dropped after conversion so the wall-clock time is kept.
    #[must_use]
    pub fn parse(raw: &str) -> Option<NaiveDateTime> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if let Ok(with_offset) = DateTime::parse_from_rfc3339(raw) {
            return Some(with_offset.naive_local());
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
    }

    /// Serde adapter for optional timestamps.
    ///
    /// # Errors
    ///
    /// Returns an error when the value is a non-empty string that matches none
    /// of the accepted formats.
    pub fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(value) if value.trim().is_empty() => Ok(None),
            Some(value) => parse(&value).map(Some).ok_or_else(|| {
                serde::de::Error::custom(format!("unrecognised timestamp '{value}'"))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};
    use serde_json::json;

    fn record() -> ImageRecord {
        ImageRecord {
            id: 7,
            filename: "abc.jpg".into(),
            thumbnail: "thumb_abc.jpg".into(),
            description: None,
            location: None,
            capture_date: None,
            resolution: None,
            ai_tags: None,
        }
    }

    #[test]
    fn image_record_decodes_backend_payload() {
        let payload = json!({
            "id": 3,
            "filename": "f.jpg",
            "thumbnail": "t.jpg",
            "description": "lake",
            "capture_date": "2024-05-01T10:20:30",
            "location": "Hangzhou",
            "resolution": "4000x3000",
            "ai_tags": "lake, mountain, sky"
        });
        let decoded: ImageRecord = serde_json::from_value(payload).expect("decode");
        assert_eq!(decoded.id, 3);
        assert_eq!(decoded.tags(), vec!["lake", "mountain", "sky"]);
        let date = decoded.capture_date.expect("date");
        assert_eq!(date.date(), NaiveDate::from_ymd_opt(2024, 5, 1).expect("ymd"));
        assert_eq!(date.hour(), 10);
    }

    #[test]
    fn image_record_tolerates_missing_optionals() {
        let payload = json!({"id": 1, "filename": "a", "thumbnail": "b", "capture_date": null});
        let decoded: ImageRecord = serde_json::from_value(payload).expect("decode");
        assert!(decoded.capture_date.is_none());
        assert!(decoded.tags().is_empty());
    }

    #[test]
    fn display_title_prefers_description() {
        let mut image = record();
        assert_eq!(image.display_title(), "abc.jpg");
        image.description = Some("   ".into());
        assert_eq!(image.display_title(), "abc.jpg");
        image.description = Some("sunset".into());
        assert_eq!(image.display_title(), "sunset");
    }

    #[test]
    fn unknown_location_is_hidden() {
        let mut image = record();
        assert!(!image.has_known_location());
        image.location = Some(UNKNOWN_LOCATION.into());
        assert!(!image.has_known_location());
        image.location = Some("Paris".into());
        assert!(image.has_known_location());
    }

    #[test]
    fn image_update_sends_nulls() {
        let update = ImageUpdate {
            description: Some("d".into()),
            location: None,
            capture_date: None,
        };
        let value = serde_json::to_value(&update).expect("encode");
        assert_eq!(
            value,
            json!({"description": "d", "location": null, "capture_date": null})
        );
    }

    #[test]
    fn problem_detail_flattens_validation_entries() {
        let plain: ProblemDetail =
            serde_json::from_value(json!({"detail": "Username already registered"}))
                .expect("decode");
        assert_eq!(plain.message().as_deref(), Some("Username already registered"));

        let structured: ProblemDetail = serde_json::from_value(json!({
            "detail": [{"loc": ["body", "email"], "msg": "value is not a valid email address", "type": "value_error"}]
        }))
        .expect("decode");
        assert_eq!(
            structured.message().as_deref(),
            Some("email: value is not a valid email address")
        );

        let empty: ProblemDetail = serde_json::from_value(json!({})).expect("decode");
        assert!(empty.message().is_none());
    }

    #[test]
    fn datetime_parse_accepts_offsets_and_minutes() {
        assert!(datetime::parse("2024-01-02T03:04").is_some());
        assert!(datetime::parse("2024-01-02T03:04:05.123456").is_some());
        let with_offset = datetime::parse("2024-01-02T03:04:05+08:00").expect("rfc3339");
        assert_eq!(with_offset.hour(), 3);
        assert!(datetime::parse("yesterday").is_none());
    }

    #[test]
    fn progress_frame_strips_line_endings() {
        let frame = ProgressFrame::from_text("resizing...\r\n");
        assert_eq!(frame.text(), "resizing...");
        assert_eq!(frame.kind(), "log_line");
    }
}
