//! Typed client configuration and the backend endpoint derived from it.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use url::Url;

use crate::defaults;
use crate::error::{ConfigError, ConfigResult};
use crate::validate;

/// Fully resolved client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientConfig {
    /// Origin the front-end runs under; its scheme and host locate the backend.
    pub app_origin: Url,
    /// Backend port paired with the origin host.
    pub backend_port: u16,
    /// File holding the persisted session token.
    pub session_file: PathBuf,
    /// Per-request HTTP timeout in seconds.
    pub http_timeout_secs: u64,
    /// Slideshow autoplay period in milliseconds.
    pub slideshow_interval_ms: u64,
    /// Capacity of the upload progress log.
    pub progress_log_capacity: usize,
    /// Maximum wait for the progress channel before the upload proceeds.
    pub progress_connect_timeout_ms: u64,
    /// Pause after a successful upload before returning to the gallery.
    pub post_upload_delay_ms: u64,
    /// Log filter directive.
    pub log_level: String,
    /// Log output format (`pretty` or `json`); inferred when absent.
    pub log_format: Option<String>,
}

impl ClientConfig {
    /// Defaults rooted at the provided session file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] if the built-in origin fails to parse.
    pub fn with_session_file(session_file: PathBuf) -> ConfigResult<Self> {
        let app_origin =
            Url::parse(defaults::APP_ORIGIN).map_err(|_| ConfigError::InvalidField {
                field: "app_origin",
                value: Some(defaults::APP_ORIGIN.to_string()),
                reason: "must be an absolute URL",
            })?;
        Ok(Self {
            app_origin,
            backend_port: defaults::BACKEND_PORT,
            session_file,
            http_timeout_secs: defaults::HTTP_TIMEOUT_SECS,
            slideshow_interval_ms: defaults::SLIDESHOW_INTERVAL_MS,
            progress_log_capacity: defaults::PROGRESS_LOG_CAPACITY,
            progress_connect_timeout_ms: defaults::PROGRESS_CONNECT_TIMEOUT_MS,
            post_upload_delay_ms: defaults::POST_UPLOAD_DELAY_MS,
            log_level: defaults::LOG_LEVEL.to_string(),
            log_format: None,
        })
    }

    /// Check every field against its constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] for the first failing field.
    pub fn validate(&self) -> ConfigResult<()> {
        validate::origin(&self.app_origin)?;
        validate::port(self.backend_port)?;
        validate::positive("http_timeout_secs", self.http_timeout_secs)?;
        validate::positive("slideshow_interval_ms", self.slideshow_interval_ms)?;
        validate::positive(
            "progress_connect_timeout_ms",
            self.progress_connect_timeout_ms,
        )?;
        validate::positive(
            "progress_log_capacity",
            u64::try_from(self.progress_log_capacity).unwrap_or(u64::MAX),
        )?;
        if self.log_level.trim().is_empty() {
            return Err(ConfigError::InvalidField {
                field: "log_level",
                value: None,
                reason: "must not be empty",
            });
        }
        Ok(())
    }

    /// Apply command-line overrides on top of the loaded values.
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(origin) = overrides.app_origin {
            self.app_origin = origin;
        }
        if let Some(port) = overrides.backend_port {
            self.backend_port = port;
        }
        if let Some(path) = overrides.session_file {
            self.session_file = path;
        }
        if let Some(timeout) = overrides.http_timeout_secs {
            self.http_timeout_secs = timeout;
        }
    }

    /// Backend endpoint derived from the origin and port.
    ///
    /// # Errors
    ///
    /// Returns an error when the origin cannot carry a port or a WebSocket scheme.
    pub fn endpoint(&self) -> ConfigResult<BackendEndpoint> {
        BackendEndpoint::from_origin(&self.app_origin, self.backend_port)
    }

    /// HTTP timeout as a [`Duration`].
    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Slideshow autoplay period as a [`Duration`].
    #[must_use]
    pub const fn slideshow_interval(&self) -> Duration {
        Duration::from_millis(self.slideshow_interval_ms)
    }

    /// Progress channel connect bound as a [`Duration`].
    #[must_use]
    pub const fn progress_connect_timeout(&self) -> Duration {
        Duration::from_millis(self.progress_connect_timeout_ms)
    }

    /// Post-upload pause as a [`Duration`].
    #[must_use]
    pub const fn post_upload_delay(&self) -> Duration {
        Duration::from_millis(self.post_upload_delay_ms)
    }
}

/// Values supplied on the command line that take precedence over files and env.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Replacement origin.
    pub app_origin: Option<Url>,
    /// Replacement backend port.
    pub backend_port: Option<u16>,
    /// Replacement session file.
    pub session_file: Option<PathBuf>,
    /// Replacement HTTP timeout.
    pub http_timeout_secs: Option<u64>,
}

/// Backend base addresses for REST and WebSocket traffic.
///
/// Built from the origin's scheme and host with the fixed backend port, so a
/// client reached through `http://10.0.0.5:5173` talks to `http://10.0.0.5:8000`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendEndpoint {
    http: Url,
    ws: Url,
}

impl BackendEndpoint {
    /// Derive both base URLs from an origin.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] when the origin is not an
    /// `http`/`https` URL with a host.
    pub fn from_origin(origin: &Url, port: u16) -> ConfigResult<Self> {
        validate::origin(origin)?;
        validate::port(port)?;

        let mut http = origin.clone();
        http.set_path("/");
        http.set_query(None);
        http.set_fragment(None);
        http.set_port(Some(port))
            .map_err(|()| invalid_origin(origin, "cannot carry a port"))?;

        let mut ws = http.clone();
        let ws_scheme = if http.scheme() == "https" { "wss" } else { "ws" };
        ws.set_scheme(ws_scheme)
            .map_err(|()| invalid_origin(origin, "cannot be mapped to a websocket scheme"))?;

        Ok(Self { http, ws })
    }

    /// REST base URL (`scheme://host:port/`).
    #[must_use]
    pub const fn http_base(&self) -> &Url {
        &self.http
    }

    /// WebSocket base URL (`ws(s)://host:port/`).
    #[must_use]
    pub const fn ws_base(&self) -> &Url {
        &self.ws
    }

    /// Resolve a REST path against the base.
    ///
    /// # Errors
    ///
    /// Returns an error when the path cannot be joined onto the base URL.
    pub fn http_url(&self, path: &str) -> ConfigResult<Url> {
        self.http.join(path).map_err(|_| ConfigError::InvalidField {
            field: "path",
            value: Some(path.to_string()),
            reason: "cannot be joined onto the backend URL",
        })
    }

    /// Resolve a WebSocket path against the base.
    ///
    /// # Errors
    ///
    /// Returns an error when the path cannot be joined onto the base URL.
    pub fn ws_url(&self, path: &str) -> ConfigResult<Url> {
        self.ws.join(path).map_err(|_| ConfigError::InvalidField {
            field: "path",
            value: Some(path.to_string()),
            reason: "cannot be joined onto the websocket URL",
        })
    }
}

fn invalid_origin(origin: &Url, reason: &'static str) -> ConfigError {
    ConfigError::InvalidField {
        field: "app_origin",
        value: Some(origin.to_string()),
        reason,
    }
}
