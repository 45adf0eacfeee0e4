//! Field-level checks shared by the loader and the typed model.

use url::Url;

use crate::error::{ConfigError, ConfigResult};

/// Require an `http`/`https` origin that carries a host.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for any other scheme or a missing host.
pub fn origin(url: &Url) -> ConfigResult<()> {
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidField {
            field: "app_origin",
            value: Some(url.to_string()),
            reason: "scheme must be http or https",
        });
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(ConfigError::InvalidField {
            field: "app_origin",
            value: Some(url.to_string()),
            reason: "must include a host",
        });
    }
    Ok(())
}

/// Reject port zero.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the port is `0`.
pub fn port(port: u16) -> ConfigResult<()> {
    if port == 0 {
        return Err(ConfigError::InvalidField {
            field: "backend_port",
            value: Some(port.to_string()),
            reason: "must be between 1 and 65535",
        });
    }
    Ok(())
}

/// Require a strictly positive numeric field.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the value is `0`.
pub fn positive(field: &'static str, value: u64) -> ConfigResult<()> {
    if value == 0 {
        return Err(ConfigError::InvalidField {
            field,
            value: Some(value.to_string()),
            reason: "must be greater than zero",
        });
    }
    Ok(())
}
