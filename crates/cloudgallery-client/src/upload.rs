//! Upload flow with a live progress log.
//!
//! # Design
//! - The session id is the Unix time in milliseconds at construction and is
//!   sent both as the WebSocket path segment and as the `client_id` form field.
//! - If the progress channel cannot be opened within the connect timeout the
//!   upload still proceeds; a notice line is logged and progress frames for
//!   this session are not recovered.
//! - Failures append an error line and re-enable the form; success pauses
//!   briefly so the final lines stay visible, then returns to the gallery.

use std::path::{Path, PathBuf};
use std::time::Duration;

use cloudgallery_api_models::{ImageRecord, ProgressFrame};
use cloudgallery_config::ClientConfig;
use tracing::{info, warn};

use crate::api::{ApiClient, cache_stamp};
use crate::error::{ClientError, ClientResult};
use crate::progress::{ProgressChannel, ProgressLog};
use crate::routes::Route;

/// First line written when a submission starts.
pub const LINE_OPENING_CHANNEL: &str = "Opening progress channel...";
/// Second line written when a submission starts.
pub const LINE_PREPARING_REQUEST: &str = "Preparing upload request...";
/// Line written when the progress channel could not be opened.
pub const LINE_CHANNEL_UNAVAILABLE: &str =
    "Progress channel unavailable; uploading without live updates";
/// Line written when the upload fails.
pub const LINE_UPLOAD_FAILED: &str = "Upload failed";

/// File chosen for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    path: PathBuf,
    name: String,
}

impl SelectedFile {
    /// Path on disk.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name sent to the backend.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Upload page state.
#[derive(Debug)]
pub struct UploadSession {
    client_id: String,
    file: Option<SelectedFile>,
    /// Optional description sent with the file.
    pub description: String,
    log: ProgressLog,
    busy: bool,
    channel: Option<ProgressChannel>,
    connect_timeout: Duration,
    post_upload_delay: Duration,
}

impl UploadSession {
    /// New session keyed by the current time in milliseconds.
    #[must_use]
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_client_id(config, cache_stamp().to_string())
    }

    /// New session with an explicit id.
    #[must_use]
    pub fn with_client_id(config: &ClientConfig, client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            file: None,
            description: String::new(),
            log: ProgressLog::new(config.progress_log_capacity),
            busy: false,
            channel: None,
            connect_timeout: config.progress_connect_timeout(),
            post_upload_delay: config.post_upload_delay(),
        }
    }

    /// Correlation id shared by the upload and its progress channel.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Selected file.
    #[must_use]
    pub const fn file(&self) -> Option<&SelectedFile> {
        self.file.as_ref()
    }

    /// Progress lines for the current submission.
    #[must_use]
    pub const fn log(&self) -> &ProgressLog {
        &self.log
    }

    /// Whether a submission is in flight.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        self.busy
    }

    /// Whether a progress channel is attached.
    #[must_use]
    pub const fn has_channel(&self) -> bool {
        self.channel.is_some()
    }

    /// Choose a file.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the path is not a readable file.
    pub fn select_file(&mut self, path: impl Into<PathBuf>) -> ClientResult<()> {
        let path = path.into();
        if !path.is_file() {
            return Err(ClientError::validation(format!(
                "'{}' is not a file",
                path.display()
            )));
        }
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .ok_or_else(|| ClientError::validation("file name must be valid UTF-8"))?;
        self.file = Some(SelectedFile { path, name });
        Ok(())
    }

    /// Forget the selected file.
    pub fn clear_file(&mut self) {
        self.file = None;
    }

    /// Use an already connected progress channel.
    pub fn attach_channel(&mut self, channel: ProgressChannel) {
        if let Some(previous) = self.channel.replace(channel) {
            previous.close();
        }
    }

    /// Open the progress channel; returns whether it connected.
    pub async fn open_channel(&mut self, api: &ApiClient) -> bool {
        self.open_channel_with(api, &mut |_: &str| {}).await
    }

    /// Upload the selected file.
    ///
    /// # Errors
    ///
    /// See [`UploadSession::submit_with`].
    pub async fn submit(&mut self, api: &ApiClient) -> ClientResult<ImageRecord> {
        self.submit_with(api, |_: &str| {}).await
    }

    /// Upload the selected file, reporting each log line to `on_line` as it
    /// is recorded.
    ///
    /// # Errors
    ///
    /// Returns a validation error without a selected non-empty file (no
    /// request is made), or the API error after logging it.
    pub async fn submit_with<F>(&mut self, api: &ApiClient, mut on_line: F) -> ClientResult<ImageRecord>
    where
        F: FnMut(&str),
    {
        if self.busy {
            return Err(ClientError::validation("an upload is already in progress"));
        }
        let file = self
            .file
            .clone()
            .ok_or_else(|| ClientError::validation("select an image to upload first"))?;
        let bytes = tokio::fs::read(file.path()).await.map_err(|err| {
            ClientError::validation(format!(
                "cannot read '{}': {err}",
                file.path().display()
            ))
        })?;
        if bytes.is_empty() {
            return Err(ClientError::validation(format!(
                "'{}' is empty",
                file.name()
            )));
        }

        self.busy = true;
        self.log.clear();
        for line in [LINE_OPENING_CHANNEL, LINE_PREPARING_REQUEST] {
            on_line(line);
            self.log.push(line);
        }
        if self.channel.is_none() {
            self.open_channel_with(api, &mut on_line).await;
        }

        let description = self.description.clone();
        let client_id = self.client_id.clone();
        let upload = api.upload(file.name(), bytes, Some(&description), &client_id);
        tokio::pin!(upload);
        let result = loop {
            tokio::select! {
                result = &mut upload => break result,
                Some(frame) = next_frame(&mut self.channel) => {
                    on_line(frame.text());
                    self.log.push(frame.text());
                }
            }
        };

        match result {
            Ok(record) => {
                info!(id = record.id, client_id = %self.client_id, "upload finished");
                self.linger(&mut on_line).await;
                self.close();
                api.navigator().navigate(Route::Gallery);
                Ok(record)
            }
            Err(err) => {
                self.drain(&mut on_line);
                let line = format!("{LINE_UPLOAD_FAILED}: {err}");
                on_line(&line);
                self.log.push(line);
                self.busy = false;
                Err(err)
            }
        }
    }

    /// Tear down the progress channel.
    pub fn close(&mut self) {
        if let Some(channel) = self.channel.take() {
            channel.close();
        }
    }

    async fn open_channel_with<F>(&mut self, api: &ApiClient, on_line: &mut F) -> bool
    where
        F: FnMut(&str),
    {
        let connected = match api.progress_url(&self.client_id) {
            Ok(url) => ProgressChannel::connect(&url, self.connect_timeout).await,
            Err(err) => Err(err),
        };
        match connected {
            Ok(channel) => {
                self.channel = Some(channel);
                true
            }
            Err(err) => {
                warn!(client_id = %self.client_id, error = %err, "progress channel unavailable");
                on_line(LINE_CHANNEL_UNAVAILABLE);
                self.log.push(LINE_CHANNEL_UNAVAILABLE);
                false
            }
        }
    }

    async fn linger<F>(&mut self, on_line: &mut F)
    where
        F: FnMut(&str),
    {
        let deadline = tokio::time::sleep(self.post_upload_delay);
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                () = &mut deadline => break,
                Some(frame) = next_frame(&mut self.channel) => {
                    on_line(frame.text());
                    self.log.push(frame.text());
                }
            }
        }
        self.drain(on_line);
    }

    fn drain<F>(&mut self, on_line: &mut F)
    where
        F: FnMut(&str),
    {
        let Some(channel) = self.channel.as_mut() else {
            return;
        };
        while let Some(frame) = channel.try_recv() {
            on_line(frame.text());
            self.log.push(frame.text());
        }
    }
}

impl Drop for UploadSession {
    fn drop(&mut self) {
        self.close();
    }
}

async fn next_frame(channel: &mut Option<ProgressChannel>) -> Option<ProgressFrame> {
    match channel {
        Some(channel) => channel.recv().await,
        None => std::future::pending().await,
    }
}
