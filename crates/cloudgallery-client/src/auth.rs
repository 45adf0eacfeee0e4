//! Login and registration forms.
//!
//! # Design
//! - Forms validate locally before any request and surface failures through
//!   an inline `error` string as well as the returned error.
//! - Successful submission drives navigation: login to the gallery,
//!   registration to the login screen.

use cloudgallery_api_models::{RegisterRequest, UserProfile};
use tracing::info;

use crate::api::ApiClient;
use crate::error::{ClientError, ClientResult};
use crate::routes::{Navigator, Route};
use crate::session::SessionContext;

/// Minimum password length accepted by the backend.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Inline message shown for rejected credentials.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "invalid username or password";

/// Credential entry form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    /// Username field.
    pub username: String,
    /// Password field.
    pub password: String,
    error: Option<String>,
}

impl LoginForm {
    /// Form pre-filled with credentials.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            error: None,
        }
    }

    /// Inline error from the last submission.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Exchange the credentials for a token and open the gallery.
    ///
    /// # Errors
    ///
    /// Returns a validation error for blank fields and
    /// [`ClientError::InvalidCredentials`] when the backend rejects them.
    pub async fn submit(&mut self, api: &ApiClient) -> ClientResult<Route> {
        self.error = None;
        if self.username.trim().is_empty() || self.password.is_empty() {
            return Err(self.fail(ClientError::validation(
                "username and password are required",
            )));
        }

        match api.login(self.username.trim(), &self.password).await {
            Ok(_) => {
                info!(username = %self.username.trim(), "logged in");
                Ok(api.navigator().navigate(Route::Gallery))
            }
            Err(ClientError::InvalidCredentials) => {
                self.error = Some(INVALID_CREDENTIALS_MESSAGE.to_string());
                Err(ClientError::InvalidCredentials)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    fn fail(&mut self, err: ClientError) -> ClientError {
        self.error = Some(err.to_string());
        err
    }
}

/// Account creation form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterForm {
    /// Username field.
    pub username: String,
    /// Email field.
    pub email: String,
    /// Password field.
    pub password: String,
    error: Option<String>,
}

impl RegisterForm {
    /// Form pre-filled with values.
    #[must_use]
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            error: None,
        }
    }

    /// Inline error from the last submission.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Check the fields without contacting the backend.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] describing the first bad field.
    pub fn validate(&self) -> ClientResult<()> {
        if self.username.trim().is_empty() {
            return Err(ClientError::validation("username is required"));
        }
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(ClientError::validation("a valid email address is required"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ClientError::validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        Ok(())
    }

    /// Create the account and move to the login screen.
    ///
    /// # Errors
    ///
    /// Returns a validation error for bad fields or the backend's rejection.
    pub async fn submit(&mut self, api: &ApiClient) -> ClientResult<UserProfile> {
        self.error = None;
        if let Err(err) = self.validate() {
            self.error = Some(err.to_string());
            return Err(err);
        }

        let request = RegisterRequest {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password.clone(),
        };
        match api.register(&request).await {
            Ok(profile) => {
                info!(username = %profile.username, "account registered");
                api.navigator().navigate(Route::Login);
                Ok(profile)
            }
            Err(err) => {
                self.error = Some(match &err {
                    ClientError::Api { detail, .. } => detail.clone(),
                    other => other.to_string(),
                });
                Err(err)
            }
        }
    }
}

/// Navbar logout: clear the session and show the login screen.
///
/// # Errors
///
/// Returns an error when the persisted token cannot be removed; the user is
/// logged out in memory regardless.
pub fn logout(session: &SessionContext, navigator: &Navigator) -> ClientResult<()> {
    let result = session.logout();
    navigator.redirect_to_login();
    result
}
