//! Gallery view state: listing, search, selection, and slideshow launch.
//!
//! # Design
//! - The selection is always a subset of the loaded ids; every refresh prunes it.
//! - The slideshow plays the selection in list order, or every image when
//!   nothing is selected.

use std::collections::BTreeSet;

use cloudgallery_api_models::ImageRecord;
use tracing::debug;

use crate::api::{ApiClient, cache_stamp};
use crate::error::ClientResult;
use crate::slideshow::Slideshow;

/// Toggle the presence of an id in the selection set.
#[must_use]
pub fn toggle_selection(selected: &BTreeSet<i64>, id: i64) -> BTreeSet<i64> {
    let mut next = selected.clone();
    if !next.remove(&id) {
        next.insert(id);
    }
    next
}

/// Gallery grid state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GalleryView {
    images: Vec<ImageRecord>,
    search_term: String,
    select_mode: bool,
    selected: BTreeSet<i64>,
    stamp: u64,
}

impl GalleryView {
    /// Empty gallery.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loaded images in backend order.
    #[must_use]
    pub fn images(&self) -> &[ImageRecord] {
        &self.images
    }

    /// Active search term.
    #[must_use]
    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    /// Whether clicks select instead of opening the detail view.
    #[must_use]
    pub const fn select_mode(&self) -> bool {
        self.select_mode
    }

    /// Selected image ids.
    #[must_use]
    pub const fn selected(&self) -> &BTreeSet<i64> {
        &self.selected
    }

    /// Cache-busting stamp of the last load.
    #[must_use]
    pub const fn stamp(&self) -> u64 {
        self.stamp
    }

    /// Reload with the current search term.
    ///
    /// # Errors
    ///
    /// Returns the API error; the loaded images are kept on failure.
    pub async fn refresh(&mut self, api: &ApiClient) -> ClientResult<()> {
        let images = api.search(&self.search_term).await?;
        self.replace_images(images, cache_stamp());
        Ok(())
    }

    /// Run a search; a blank term lists everything.
    ///
    /// # Errors
    ///
    /// Returns the API error; the loaded images are kept on failure.
    pub async fn search(&mut self, api: &ApiClient, term: &str) -> ClientResult<()> {
        self.search_term = term.trim().to_string();
        self.refresh(api).await
    }

    /// Drop the search term and reload everything.
    ///
    /// # Errors
    ///
    /// Returns the API error; the loaded images are kept on failure.
    pub async fn clear_search(&mut self, api: &ApiClient) -> ClientResult<()> {
        self.search_term.clear();
        self.refresh(api).await
    }

    /// Install a freshly loaded list and prune the selection to it.
    pub fn replace_images(&mut self, images: Vec<ImageRecord>, stamp: u64) {
        self.images = images;
        self.stamp = stamp;
        let loaded: BTreeSet<i64> = self.images.iter().map(|image| image.id).collect();
        let before = self.selected.len();
        self.selected.retain(|id| loaded.contains(id));
        if self.selected.len() != before {
            debug!(
                dropped = before - self.selected.len(),
                "selection pruned after reload"
            );
        }
    }

    /// Enter or leave select mode; leaving clears the selection.
    pub fn toggle_select_mode(&mut self) {
        self.select_mode = !self.select_mode;
        if !self.select_mode {
            self.selected.clear();
        }
    }

    /// Toggle one id; ignored outside select mode or for unloaded ids.
    pub fn toggle_selection(&mut self, id: i64) -> bool {
        if !self.select_mode || !self.images.iter().any(|image| image.id == id) {
            return false;
        }
        self.selected = toggle_selection(&self.selected, id);
        true
    }

    /// Images the slideshow would play, in list order.
    #[must_use]
    pub fn slideshow_images(&self) -> Vec<ImageRecord> {
        if self.selected.is_empty() {
            return self.images.clone();
        }
        self.images
            .iter()
            .filter(|image| self.selected.contains(&image.id))
            .cloned()
            .collect()
    }

    /// Label for the play button.
    #[must_use]
    pub fn play_label(&self) -> String {
        if self.selected.is_empty() {
            "Play all".to_string()
        } else {
            format!("Play selected ({})", self.selected.len())
        }
    }

    /// Slideshow starting at the first image, or `None` when there is nothing to show.
    #[must_use]
    pub fn open_slideshow(&self) -> Option<Slideshow> {
        Slideshow::new(self.slideshow_images(), 0)
    }
}
