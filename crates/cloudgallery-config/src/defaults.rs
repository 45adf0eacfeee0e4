//! Default values for client configuration.
//!
//! # Design
//! - Keep every default in one place so the loader, docs, and tests agree.
//! - Durations are stored as integers to keep the TOML format flat.

/// Application directory name under the platform config dir.
pub const APP_DIR: &str = "cloudgallery";
/// Configuration file name inside [`APP_DIR`].
pub const CONFIG_FILE: &str = "config.toml";
/// Session file name inside [`APP_DIR`].
pub const SESSION_FILE: &str = "session.json";
/// Origin the front-end is served from when nothing else is configured.
pub const APP_ORIGIN: &str = "http://localhost:5173";
/// Fixed backend port paired with the origin host.
pub const BACKEND_PORT: u16 = 8000;
/// HTTP request timeout in seconds.
pub const HTTP_TIMEOUT_SECS: u64 = 10;
/// Slideshow autoplay period in milliseconds.
pub const SLIDESHOW_INTERVAL_MS: u64 = 3_500;
/// Maximum number of retained upload progress lines.
pub const PROGRESS_LOG_CAPACITY: usize = 256;
/// Upper bound on waiting for the progress channel before uploading anyway.
pub const PROGRESS_CONNECT_TIMEOUT_MS: u64 = 2_000;
/// Pause between a successful upload and returning to the gallery.
pub const POST_UPLOAD_DELAY_MS: u64 = 1_500;
/// Default log filter.
pub const LOG_LEVEL: &str = "info";
