//! HTTP client for the CloudGallery backend.
//!
//! # Design
//! - Every request carries `Authorization: Bearer <token>` when the session
//!   holds one.
//! - A 401 from any call other than the token exchange expires the session
//!   and redirects to the login route before the error is returned.
//! - Non-success responses are flattened into [`ClientError::Api`] using the
//!   backend's `detail` payload.

use std::time::{SystemTime, UNIX_EPOCH};

use cloudgallery_api_models::{
    AccessToken, ImageRecord, ImageUpdate, ProblemDetail, RegisterRequest, UserProfile,
};
use cloudgallery_config::{BackendEndpoint, ClientConfig};
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::error::{ClientError, ClientResult};
use crate::routes::Navigator;
use crate::session::SessionContext;

/// Header carrying the caller's correlation id.
pub const HEADER_REQUEST_ID: &str = "x-request-id";

/// MIME type used for edited image uploads.
const JPEG_MIME: &str = "image/jpeg";

/// Backend client bound to one session and navigator.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    endpoint: BackendEndpoint,
    session: SessionContext,
    navigator: Navigator,
    request_id: Option<HeaderValue>,
}

impl ApiClient {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend endpoint cannot be derived or the
    /// HTTP client cannot be constructed.
    pub fn new(
        config: &ClientConfig,
        session: SessionContext,
        navigator: Navigator,
    ) -> ClientResult<Self> {
        let endpoint = config.endpoint()?;
        let http = Client::builder()
            .timeout(config.http_timeout())
            .build()
            .map_err(|source| ClientError::Transport {
                endpoint: endpoint.http_base().to_string(),
                source,
            })?;
        Ok(Self {
            http,
            endpoint,
            session,
            navigator,
            request_id: None,
        })
    }

    /// Attach a correlation id to every request.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the id is not a valid header value.
    pub fn with_request_id(mut self, request_id: &str) -> ClientResult<Self> {
        let value = HeaderValue::from_str(request_id).map_err(|_| {
            ClientError::validation("trace identifier contains invalid characters")
        })?;
        self.request_id = Some(value);
        Ok(self)
    }

    /// Session this client authenticates with.
    #[must_use]
    pub const fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Navigator that receives forced redirects.
    #[must_use]
    pub const fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    /// Backend base addresses.
    #[must_use]
    pub const fn endpoint(&self) -> &BackendEndpoint {
        &self.endpoint
    }

    /// Exchange credentials for a token and store it.
    ///
    /// Any previous token is discarded before the exchange.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidCredentials`] when the backend rejects
    /// the credentials.
    pub async fn login(&self, username: &str, password: &str) -> ClientResult<AccessToken> {
        if self.session.is_authenticated() {
            self.session.logout()?;
        }

        let path = "/token";
        let request = self
            .http
            .post(self.url(path)?)
            .form(&[("username", username), ("password", password)]);
        let response = self.dispatch(path, request).await?;
        let status = response.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::BAD_REQUEST) {
            debug!(%status, "credentials rejected");
            return Err(ClientError::InvalidCredentials);
        }
        if !status.is_success() {
            return Err(problem(response).await);
        }

        let token: AccessToken = decode(path, response).await?;
        self.session.establish(token.access_token.clone())?;
        Ok(token)
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Api`] carrying the backend's reason on rejection.
    pub async fn register(&self, request: &RegisterRequest) -> ClientResult<UserProfile> {
        let path = "/register";
        let builder = self.http.post(self.url(path)?).json(request);
        let response = self.send(path, builder).await?;
        decode(path, response).await
    }

    /// Images owned by the current user.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails or the session has expired.
    pub async fn list_images(&self) -> ClientResult<Vec<ImageRecord>> {
        let path = "/my-images/";
        let response = self.send(path, self.http.get(self.url(path)?)).await?;
        decode(path, response).await
    }

    /// Search the current user's images; a blank query lists everything.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails or the session has expired.
    pub async fn search(&self, query: &str) -> ClientResult<Vec<ImageRecord>> {
        let query = query.trim();
        if query.is_empty() {
            return self.list_images().await;
        }
        let path = "/search/";
        let builder = self.http.get(self.url(path)?).query(&[("q", query)]);
        let response = self.send(path, builder).await?;
        decode(path, response).await
    }

    /// Fetch one image record.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Api`] with status 404 when the image is unknown.
    pub async fn get_image(&self, id: i64) -> ClientResult<ImageRecord> {
        let path = format!("/images/{id}");
        let response = self.send(&path, self.http.get(self.url(&path)?)).await?;
        decode(&path, response).await
    }

    /// Replace description, location, and capture date.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails or the session has expired.
    pub async fn update_metadata(&self, id: i64, update: &ImageUpdate) -> ClientResult<ImageRecord> {
        let path = format!("/images/{id}");
        let builder = self.http.put(self.url(&path)?).json(update);
        let response = self.send(&path, builder).await?;
        decode(&path, response).await
    }

    /// Replace the stored bitmap with an edited JPEG.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails or the session has expired.
    pub async fn replace_content(
        &self,
        id: i64,
        file_name: &str,
        jpeg: Vec<u8>,
    ) -> ClientResult<()> {
        let path = format!("/images/{id}/content");
        let part = Part::bytes(jpeg)
            .file_name(file_name.to_string())
            .mime_str(JPEG_MIME)
            .map_err(|source| ClientError::Transport {
                endpoint: path.clone(),
                source,
            })?;
        let builder = self
            .http
            .put(self.url(&path)?)
            .multipart(Form::new().part("file", part));
        self.send(&path, builder).await?;
        Ok(())
    }

    /// Delete an image.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails or the session has expired.
    pub async fn delete_image(&self, id: i64) -> ClientResult<()> {
        let path = format!("/images/{id}");
        self.send(&path, self.http.delete(self.url(&path)?)).await?;
        Ok(())
    }

    /// Upload a new image tagged with the progress channel's `client_id`.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails or the session has expired.
    pub async fn upload(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        description: Option<&str>,
        client_id: &str,
    ) -> ClientResult<ImageRecord> {
        let path = "/upload/";
        let mut form = Form::new()
            .part("file", Part::bytes(bytes).file_name(file_name.to_string()))
            .text("client_id", client_id.to_string());
        if let Some(description) = description.map(str::trim).filter(|d| !d.is_empty()) {
            form = form.text("description", description.to_string());
        }
        let builder = self.http.post(self.url(path)?).multipart(form);
        let response = self.send(path, builder).await?;
        decode(path, response).await
    }

    /// Download the original bitmap, bypassing caches.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails.
    pub async fn fetch_original(&self, filename: &str) -> ClientResult<Vec<u8>> {
        let url = self.original_url(filename, cache_stamp())?;
        let path = url.path().to_string();
        let response = self.send(&path, self.http.get(url)).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|source| ClientError::Decode {
                endpoint: path,
                source,
            })?;
        Ok(bytes.to_vec())
    }

    /// URL of an original with a cache-busting stamp.
    ///
    /// # Errors
    ///
    /// Returns an error when the URL cannot be built.
    pub fn original_url(&self, filename: &str, stamp: u64) -> ClientResult<Url> {
        self.static_url("originals", filename, stamp)
    }

    /// URL of a thumbnail with a cache-busting stamp.
    ///
    /// # Errors
    ///
    /// Returns an error when the URL cannot be built.
    pub fn thumbnail_url(&self, thumbnail: &str, stamp: u64) -> ClientResult<Url> {
        self.static_url("thumbnails", thumbnail, stamp)
    }

    /// WebSocket URL of the progress channel for `client_id`.
    ///
    /// # Errors
    ///
    /// Returns an error when the URL cannot be built.
    pub fn progress_url(&self, client_id: &str) -> ClientResult<Url> {
        Ok(self.endpoint.ws_url(&format!("/ws/{client_id}"))?)
    }

    fn static_url(&self, folder: &str, name: &str, stamp: u64) -> ClientResult<Url> {
        let mut url = self.url(&format!("/static/{folder}/{name}"))?;
        url.query_pairs_mut().append_pair("t", &stamp.to_string());
        Ok(url)
    }

    fn url(&self, path: &str) -> ClientResult<Url> {
        Ok(self.endpoint.http_url(path)?)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = match &self.request_id {
            Some(value) => builder.header(HEADER_REQUEST_ID, value.clone()),
            None => builder,
        };
        match self.session.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn dispatch(&self, endpoint: &str, builder: RequestBuilder) -> ClientResult<Response> {
        self.authorize(builder)
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                endpoint: endpoint.to_string(),
                source,
            })
    }

    async fn send(&self, endpoint: &str, builder: RequestBuilder) -> ClientResult<Response> {
        let response = self.dispatch(endpoint, builder).await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            self.handle_unauthorized(endpoint);
            return Err(ClientError::Unauthorized);
        }
        if !status.is_success() {
            return Err(problem(response).await);
        }
        Ok(response)
    }

    fn handle_unauthorized(&self, endpoint: &str) {
        if self.session.expire() {
            warn!(endpoint, "backend rejected session token; logging out");
        }
        self.navigator.redirect_to_login();
    }
}

/// Millisecond stamp used for cache busting.
#[must_use]
pub fn cache_stamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

async fn decode<T: DeserializeOwned>(endpoint: &str, response: Response) -> ClientResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|source| ClientError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })
}

async fn problem(response: Response) -> ClientError {
    let status = response.status();
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains("json"));
    let bytes = response.bytes().await.unwrap_or_default();
    let body_text = String::from_utf8_lossy(&bytes).trim().to_string();

    let detail = is_json
        .then(|| serde_json::from_slice::<ProblemDetail>(&bytes).ok())
        .flatten()
        .and_then(|problem| problem.message())
        .unwrap_or_else(|| {
            if body_text.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("unexpected response")
                    .to_string()
            } else {
                body_text
            }
        });
    ClientError::Api { status, detail }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::Route;
    use crate::session::MemoryTokenStore;
    use anyhow::Result;
    use httpmock::prelude::*;
    use std::path::PathBuf;

    fn client_for(server: &MockServer, session: SessionContext) -> Result<ApiClient> {
        let mut config = ClientConfig::with_session_file(PathBuf::from("/tmp/unused.json"))?;
        config.app_origin = Url::parse(&server.base_url())?;
        config.backend_port = server.port();
        let navigator = Navigator::new(session.clone(), Route::Gallery);
        Ok(ApiClient::new(&config, session, navigator)?)
    }

    #[test]
    fn static_urls_carry_stamp() -> Result<()> {
        let server = MockServer::start();
        let client = client_for(&server, SessionContext::in_memory())?;
        let url = client.thumbnail_url("abc.jpg", 42)?;
        assert_eq!(url.path(), "/static/thumbnails/abc.jpg");
        assert_eq!(url.query(), Some("t=42"));
        let ws = client.progress_url("1700000000000")?;
        assert_eq!(ws.scheme(), "ws");
        assert_eq!(ws.path(), "/ws/1700000000000");
        Ok(())
    }

    #[tokio::test]
    async fn problem_detail_is_flattened() -> Result<()> {
        let server = MockServer::start_async().await;
        let session = SessionContext::init(MemoryTokenStore::with_token("t"))?;
        let mock = server.mock(|when, then| {
            when.method(GET).path("/images/9");
            then.status(404)
                .header("content-type", "application/json")
                .body(r#"{"detail":"Not Found"}"#);
        });
        let client = client_for(&server, session)?;
        let err = client.get_image(9).await.expect_err("missing image");
        mock.assert();
        match err {
            ClientError::Api { status, detail } => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(detail, "Not Found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn request_id_header_is_forwarded() -> Result<()> {
        let server = MockServer::start_async().await;
        let session = SessionContext::init(MemoryTokenStore::with_token("t"))?;
        let mock = server.mock(|when, then| {
            when.method(DELETE)
                .path("/images/3")
                .header(HEADER_REQUEST_ID, "trace-1");
            then.status(204);
        });
        let client = client_for(&server, session)?.with_request_id("trace-1")?;
        client.delete_image(3).await?;
        mock.assert();
        Ok(())
    }
}
