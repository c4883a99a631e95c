//! Hosted backend client (auth, tables, storage, realtime).
//!
//! # Architecture
//!
//! ```text
//! Backend (Arc inner, cheap to clone)
//!   ├── auth      /auth/v1/*          password sign-in, sign-up, refresh
//!   ├── rest      /rest/v1/<table>    filtered reads, conditional writes
//!   ├── storage   /storage/v1/object  uploads and public URLs
//!   └── realtime  /realtime/v1/websocket   postgres change feeds
//! ```
//!
//! Every request carries the anon key as `apikey` and a bearer token: the
//! signed-in session's access token when present, the anon key otherwise.

mod auth;
mod error;
mod realtime;
mod rest;
mod storage;

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, MutexGuard, RwLock, watch};
use url::Url;

use crate::config::BackendConfig;

pub use auth::{AuthEvent, AuthUser, Session, SignUpDetails, SignUpOutcome};
pub use error::{ApiErrorResponse, BackendError};
pub use realtime::{ChangeEvent, ChangeFilter, ChangeKind, EventFilter, Incoming, PhoenixMessage};
pub use rest::{Direction, Filter, Query};
pub use storage::content_type_for;

/// Client for the hosted backend.
///
/// Cloning is cheap; all clones share the HTTP connection pool and the
/// signed-in session.
#[derive(Clone)]
pub struct Backend {
    inner: Arc<BackendInner>,
}

struct BackendInner {
    http: reqwest::Client,
    base_url: Url,
    config: BackendConfig,
    session: RwLock<Option<Session>>,
    auth_events: watch::Sender<AuthEvent>,
    /// Held across a courier's active-delivery check and claim update.
    claim_lock: Mutex<()>,
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl Backend {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the anon key is not a valid header value or the
    /// HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(config.anon_key.expose_secret())
                .map_err(|e| BackendError::InvalidHeader(e.to_string()))?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.http_timeout)
            .build()?;

        let (auth_events, _) = watch::channel(AuthEvent::SignedOut);

        Ok(Self {
            inner: Arc::new(BackendInner {
                http,
                base_url: with_trailing_slash(config.url.clone()),
                config: config.clone(),
                session: RwLock::new(None),
                auth_events,
                claim_lock: Mutex::new(()),
            }),
        })
    }

    /// The configuration this client was built from.
    #[must_use]
    pub fn config(&self) -> &BackendConfig {
        &self.inner.config
    }

    /// Subscribe to auth state changes.
    ///
    /// The receiver starts at the current state and wakes on every sign-in,
    /// sign-out and token refresh.
    #[must_use]
    pub fn auth_events(&self) -> watch::Receiver<AuthEvent> {
        self.inner.auth_events.subscribe()
    }

    /// A copy of the current session, if signed in.
    pub async fn session(&self) -> Option<Session> {
        self.inner.session.read().await.clone()
    }

    /// The signed-in user, if any, without a network round trip.
    pub async fn current_user(&self) -> Option<AuthUser> {
        self.inner
            .session
            .read()
            .await
            .as_ref()
            .map(|s| s.user.clone())
    }

    /// The signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotSignedIn` when there is no session.
    pub async fn require_user(&self) -> Result<AuthUser, BackendError> {
        self.current_user().await.ok_or(BackendError::NotSignedIn)
    }

    /// Resolve a path relative to the project URL.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        Ok(self.inner.base_url.join(path)?)
    }

    /// Token for the `Authorization` header.
    pub(crate) async fn bearer(&self) -> String {
        self.inner.session.read().await.as_ref().map_or_else(
            || self.inner.config.anon_key.expose_secret().to_owned(),
            |s| s.access_token.expose_secret().to_owned(),
        )
    }

    /// Serialize delivery claims made through this client.
    pub(crate) async fn claim_guard(&self) -> MutexGuard<'_, ()> {
        self.inner.claim_lock.lock().await
    }

    /// Start a request with the bearer token attached.
    pub(crate) async fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let token = self.bearer().await;
        self.inner.http.request(method, url).bearer_auth(token)
    }

    /// Start a request without a user token (auth endpoints).
    pub(crate) fn anonymous_request(&self, method: Method, url: Url) -> RequestBuilder {
        self.request_with_token(method, url, self.inner.config.anon_key.expose_secret())
    }

    /// Start a request with an explicit bearer token.
    pub(crate) fn request_with_token(&self, method: Method, url: Url, token: &str) -> RequestBuilder {
        self.inner.http.request(method, url).bearer_auth(token)
    }

    async fn set_session(&self, session: Option<Session>, event: AuthEvent) {
        *self.inner.session.write().await = session;
        self.inner.auth_events.send_replace(event);
    }
}

/// Parse a successful JSON response, or map the error status.
pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    let response = ensure_success(response).await?;
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| BackendError::Parse(format!("Failed to parse response: {e}")))
}

/// Pass a successful response through, or turn an error status into a `BackendError`.
pub(crate) async fn ensure_success(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(error_from_status(status, response).await)
    }
}

async fn error_from_status(status: StatusCode, response: Response) -> BackendError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok())
            .unwrap_or(60);
        return BackendError::RateLimited(retry_after);
    }

    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => return BackendError::Http(e),
    };
    let message = serde_json::from_str::<ApiErrorResponse>(&body)
        .ok()
        .and_then(ApiErrorResponse::into_message)
        .unwrap_or(body);

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Unauthorized(message),
        // 406 is how the table layer reports "no row" for a single-object read
        StatusCode::NOT_FOUND | StatusCode::NOT_ACCEPTABLE => BackendError::NotFound(message),
        StatusCode::CONFLICT => BackendError::Conflict(message),
        _ => BackendError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
