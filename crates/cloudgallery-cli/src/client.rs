//! Shared application context, error type, and exit-code mapping for the CLI.

use std::fmt::{self, Display, Formatter};

use cloudgallery_client::{
    ApiClient, ClientError, FileTokenStore, Navigator, Route, SessionContext,
};
use cloudgallery_config::{ClientConfig, ConfigError};
use reqwest::StatusCode;

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

impl From<ClientError> for CliError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::InvalidCredentials | ClientError::Validation(_) => {
                Self::validation(err.to_string())
            }
            ClientError::Unauthorized => {
                Self::validation("session expired; run `cloudgallery login` again")
            }
            ClientError::Api { status, detail }
                if matches!(
                    status,
                    StatusCode::BAD_REQUEST
                        | StatusCode::NOT_FOUND
                        | StatusCode::CONFLICT
                        | StatusCode::UNPROCESSABLE_ENTITY
                ) =>
            {
                Self::validation(detail)
            }
            other => Self::failure(other),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::validation(format!("{:#}", anyhow::Error::new(err)))
    }
}

/// Application context passed to command handlers.
pub(crate) struct AppContext {
    pub(crate) api: ApiClient,
    pub(crate) config: ClientConfig,
}

impl AppContext {
    /// Open the persisted session and build the API client.
    pub(crate) fn from_config(config: ClientConfig, trace_id: &str) -> CliResult<Self> {
        let session = SessionContext::init(FileTokenStore::new(config.session_file.clone()))?;
        let navigator = Navigator::new(session.clone(), Route::Gallery);
        let api = ApiClient::new(&config, session, navigator)?.with_request_id(trace_id)?;
        Ok(Self { api, config })
    }

    /// Show `route`, failing when the guard sends the user to the login page.
    pub(crate) fn enter(&self, route: Route) -> CliResult<()> {
        if self.api.navigator().navigate(route) == route {
            Ok(())
        } else {
            Err(CliError::validation(format!(
                "{route} requires a session; run `cloudgallery login` first"
            )))
        }
    }
}
