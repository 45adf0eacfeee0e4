//! Single-image view with metadata editing and deletion.

use cloudgallery_api_models::{ImageRecord, ImageUpdate, datetime};
use tracing::{info, warn};
use url::Url;

use crate::api::{ApiClient, cache_stamp};
use crate::error::{ClientError, ClientResult};
use crate::routes::{Navigator, Route};

/// Date format used by the edit form (`YYYY-MM-DDTHH:MM`).
pub const FORM_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Editable metadata fields as entered by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditForm {
    /// Free-text description.
    pub description: String,
    /// Location label.
    pub location: String,
    /// Capture date in [`FORM_DATE_FORMAT`]; empty clears it.
    pub capture_date: String,
}

impl EditForm {
    /// Seed the form from a record.
    #[must_use]
    pub fn from_record(record: &ImageRecord) -> Self {
        Self {
            description: record.description.clone().unwrap_or_default(),
            location: record.location.clone().unwrap_or_default(),
            capture_date: record
                .capture_date
                .map(|date| date.format(FORM_DATE_FORMAT).to_string())
                .unwrap_or_default(),
        }
    }

    /// Convert into the update payload; an empty date becomes `null`.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the date cannot be parsed.
    pub fn to_update(&self) -> ClientResult<ImageUpdate> {
        let raw_date = self.capture_date.trim();
        let capture_date = if raw_date.is_empty() {
            None
        } else {
            Some(datetime::parse(raw_date).ok_or_else(|| {
                ClientError::validation(format!(
                    "capture date '{raw_date}' must look like 2024-05-01T09:30"
                ))
            })?)
        };
        Ok(ImageUpdate {
            description: Some(self.description.clone()),
            location: Some(self.location.clone()),
            capture_date,
        })
    }
}

/// Detail page state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailView {
    record: ImageRecord,
    form: EditForm,
    editing: bool,
    stamp: u64,
}

impl DetailView {
    /// Fetch the record; on failure other than an expired session the
    /// gallery is shown instead.
    ///
    /// # Errors
    ///
    /// Returns the API error.
    pub async fn load(api: &ApiClient, id: i64) -> ClientResult<Self> {
        match api.get_image(id).await {
            Ok(record) => Ok(Self::from_record(record, cache_stamp())),
            Err(err) => {
                if !matches!(err, ClientError::Unauthorized) {
                    warn!(id, error = %err, "image could not be loaded");
                    api.navigator().navigate(Route::Gallery);
                }
                Err(err)
            }
        }
    }

    /// View over an already fetched record.
    #[must_use]
    pub fn from_record(record: ImageRecord, stamp: u64) -> Self {
        let form = EditForm::from_record(&record);
        Self {
            record,
            form,
            editing: false,
            stamp,
        }
    }

    /// Record currently shown.
    #[must_use]
    pub const fn record(&self) -> &ImageRecord {
        &self.record
    }

    /// Whether the edit form is open.
    #[must_use]
    pub const fn is_editing(&self) -> bool {
        self.editing
    }

    /// Edit form contents.
    #[must_use]
    pub const fn form(&self) -> &EditForm {
        &self.form
    }

    /// Mutable access to the edit form.
    pub const fn form_mut(&mut self) -> &mut EditForm {
        &mut self.form
    }

    /// AI tags of the current record.
    #[must_use]
    pub fn tags(&self) -> Vec<&str> {
        self.record.tags()
    }

    /// Full-resolution URL with this view's refresh stamp.
    ///
    /// # Errors
    ///
    /// Returns an error when the URL cannot be built.
    pub fn original_url(&self, api: &ApiClient) -> ClientResult<Url> {
        api.original_url(&self.record.filename, self.stamp)
    }

    /// Open the edit form seeded from the record.
    pub fn begin_edit(&mut self) {
        self.form = EditForm::from_record(&self.record);
        self.editing = true;
    }

    /// Close the edit form and discard changes.
    pub fn cancel_edit(&mut self) {
        self.form = EditForm::from_record(&self.record);
        self.editing = false;
    }

    /// Submit the edit form.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a malformed date, or the API error. The
    /// form stays open on failure.
    pub async fn save(&mut self, api: &ApiClient) -> ClientResult<&ImageRecord> {
        let update = self.form.to_update()?;
        let record = api.update_metadata(self.record.id, &update).await?;
        info!(id = record.id, "metadata updated");
        self.record = record;
        self.form = EditForm::from_record(&self.record);
        self.editing = false;
        Ok(&self.record)
    }

    /// Delete the image after confirmation and return to the gallery.
    ///
    /// Returns `false` without side effects when `confirmed` is false.
    ///
    /// # Errors
    ///
    /// Returns the API error; the view is unchanged on failure.
    pub async fn delete(&self, api: &ApiClient, confirmed: bool) -> ClientResult<bool> {
        if !confirmed {
            return Ok(false);
        }
        api.delete_image(self.record.id).await?;
        info!(id = self.record.id, "image deleted");
        api.navigator().navigate(Route::Gallery);
        Ok(true)
    }

    /// Switch to the editor for this image.
    pub fn open_editor(&self, navigator: &Navigator) -> Route {
        navigator.navigate(Route::Editor {
            id: self.record.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record() -> ImageRecord {
        ImageRecord {
            id: 5,
            filename: "a.jpg".to_string(),
            thumbnail: "a.jpg".to_string(),
            description: Some("Lake".to_string()),
            location: None,
            capture_date: NaiveDate::from_ymd_opt(2022, 1, 2).and_then(|d| d.and_hms_opt(3, 4, 59)),
            resolution: Some("800x600".to_string()),
            ai_tags: Some("lake, tree".to_string()),
        }
    }

    #[test]
    fn form_is_seeded_with_minute_precision() {
        let form = EditForm::from_record(&record());
        assert_eq!(form.capture_date, "2022-01-02T03:04");
        assert_eq!(form.description, "Lake");
        assert_eq!(form.location, "");
    }

    #[test]
    fn empty_date_becomes_null() {
        let mut form = EditForm::from_record(&record());
        form.capture_date = "  ".to_string();
        let update = form.to_update().expect("update");
        assert_eq!(update.capture_date, None);
        let json = serde_json::to_value(&update).expect("json");
        assert!(json["capture_date"].is_null());
    }

    #[test]
    fn malformed_date_is_rejected() {
        let mut form = EditForm::from_record(&record());
        form.capture_date = "yesterday".to_string();
        assert!(form.to_update().expect_err("bad date").is_validation());
    }

    #[test]
    fn cancel_restores_record_values() {
        let mut view = DetailView::from_record(record(), 1);
        view.begin_edit();
        view.form_mut().description = "changed".to_string();
        view.cancel_edit();
        assert!(!view.is_editing());
        assert_eq!(view.form().description, "Lake");
        assert_eq!(view.tags(), vec!["lake", "tree"]);
    }
}
