//! Layered configuration loading.
//!
//! # Design
//! - Precedence is defaults, then the TOML file, then `CLOUDGALLERY_*` env vars.
//! - A missing file is not an error unless it was requested explicitly.
//! - Environment lookup is injectable so tests never touch process state.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::defaults;
use crate::error::{ConfigError, ConfigResult};
use crate::model::ClientConfig;

/// Prefix shared by every environment override.
pub const ENV_PREFIX: &str = "CLOUDGALLERY_";

/// On-disk configuration schema; every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    app_origin: Option<Url>,
    backend_port: Option<u16>,
    session_file: Option<PathBuf>,
    http_timeout_secs: Option<u64>,
    slideshow_interval_ms: Option<u64>,
    progress_log_capacity: Option<usize>,
    progress_connect_timeout_ms: Option<u64>,
    post_upload_delay_ms: Option<u64>,
    log_level: Option<String>,
    log_format: Option<String>,
}

/// Platform configuration file location (`<config_dir>/cloudgallery/config.toml`).
///
/// # Errors
///
/// Returns [`ConfigError::ConfigDirUnavailable`] when the platform exposes no
/// configuration directory.
pub fn default_config_path() -> ConfigResult<PathBuf> {
    app_dir().map(|dir| dir.join(defaults::CONFIG_FILE))
}

fn app_dir() -> ConfigResult<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(defaults::APP_DIR))
        .ok_or(ConfigError::ConfigDirUnavailable)
}

/// Load configuration using the process environment.
///
/// # Errors
///
/// See [`load_with`].
pub fn load(explicit: Option<&Path>) -> ConfigResult<ClientConfig> {
    load_with(explicit, |key| std::env::var(key).ok())
}

/// Load configuration with a custom environment lookup.
///
/// # Errors
///
/// Returns an error when an explicit file is missing or unreadable, when the
/// file fails to parse, when an environment value is malformed, or when the
/// merged result fails validation.
pub fn load_with<F>(explicit: Option<&Path>, env: F) -> ConfigResult<ClientConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let file = match explicit {
        Some(path) => read_file(path)?,
        None => match default_config_path() {
            Ok(path) if path.exists() => read_file(&path)?,
            _ => ConfigFile::default(),
        },
    };

    let session_file = match env_value(&env, "SESSION_FILE") {
        Some(raw) => PathBuf::from(raw),
        None => match file.session_file.clone() {
            Some(path) => path,
            None => app_dir()?.join(defaults::SESSION_FILE),
        },
    };

    let mut config = ClientConfig::with_session_file(session_file)?;
    apply_file(&mut config, file);
    apply_env(&mut config, &env)?;
    config.validate()?;
    debug!(
        origin = %config.app_origin,
        backend_port = config.backend_port,
        session_file = %config.session_file.display(),
        "configuration loaded"
    );
    Ok(config)
}

fn read_file(path: &Path) -> ConfigResult<ConfigFile> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn apply_file(config: &mut ClientConfig, file: ConfigFile) {
    if let Some(origin) = file.app_origin {
        config.app_origin = origin;
    }
    if let Some(port) = file.backend_port {
        config.backend_port = port;
    }
    if let Some(value) = file.http_timeout_secs {
        config.http_timeout_secs = value;
    }
    if let Some(value) = file.slideshow_interval_ms {
        config.slideshow_interval_ms = value;
    }
    if let Some(value) = file.progress_log_capacity {
        config.progress_log_capacity = value;
    }
    if let Some(value) = file.progress_connect_timeout_ms {
        config.progress_connect_timeout_ms = value;
    }
    if let Some(value) = file.post_upload_delay_ms {
        config.post_upload_delay_ms = value;
    }
    if let Some(value) = file.log_level {
        config.log_level = value;
    }
    if file.log_format.is_some() {
        config.log_format = file.log_format;
    }
}

fn apply_env<F>(config: &mut ClientConfig, env: &F) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = env_value(env, "ORIGIN") {
        config.app_origin = Url::parse(&raw).map_err(|_| ConfigError::InvalidEnv {
            key: env_key("ORIGIN"),
            value: raw.clone(),
            reason: "must be an absolute URL",
        })?;
    }
    if let Some(port) = parse_env(env, "BACKEND_PORT")? {
        config.backend_port = port;
    }
    if let Some(value) = parse_env(env, "HTTP_TIMEOUT_SECS")? {
        config.http_timeout_secs = value;
    }
    if let Some(value) = parse_env(env, "SLIDESHOW_INTERVAL_MS")? {
        config.slideshow_interval_ms = value;
    }
    if let Some(value) = parse_env(env, "PROGRESS_LOG_CAPACITY")? {
        config.progress_log_capacity = value;
    }
    if let Some(value) = parse_env(env, "PROGRESS_CONNECT_TIMEOUT_MS")? {
        config.progress_connect_timeout_ms = value;
    }
    if let Some(value) = env_value(env, "LOG_LEVEL") {
        config.log_level = value;
    }
    if let Some(value) = env_value(env, "LOG_FORMAT") {
        config.log_format = Some(value);
    }
    Ok(())
}

fn env_key(suffix: &str) -> String {
    format!("{ENV_PREFIX}{suffix}")
}

fn env_value<F>(env: &F, suffix: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    env(&env_key(suffix))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_env<F, T>(env: &F, suffix: &str) -> ConfigResult<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    env_value(env, suffix)
        .map(|raw| {
            raw.parse::<T>().map_err(|_| ConfigError::InvalidEnv {
                key: env_key(suffix),
                value: raw.clone(),
                reason: "must be a non-negative integer",
            })
        })
        .transpose()
}
