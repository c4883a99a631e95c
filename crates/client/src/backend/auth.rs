//! Password authentication against `/auth/v1`.

use chrono::{DateTime, Duration, Utc};
use pedeai_core::{Cnpj, Email, Role, UserId};
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{Backend, BackendError, ensure_success, read_json};

/// An authenticated user as reported by the auth endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    /// Metadata attached at sign-up (`role`, `full_name`, ...).
    #[serde(default)]
    pub user_metadata: serde_json::Value,
}

/// A signed-in session.
///
/// Tokens are kept as secrets so they never end up in logs.
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
    pub expires_at: Option<DateTime<Utc>>,
    pub user: AuthUser,
}

impl Session {
    /// Whether the access token has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Auth state change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedOut,
    SignedIn(UserId),
    TokenRefreshed(UserId),
}

impl AuthEvent {
    /// The user the event concerns, if signed in.
    #[must_use]
    pub const fn user_id(&self) -> Option<UserId> {
        match self {
            Self::SignedOut => None,
            Self::SignedIn(id) | Self::TokenRefreshed(id) => Some(*id),
        }
    }
}

/// Role metadata attached to a new account.
///
/// A database trigger copies this into the `profiles` row.
#[derive(Debug, Clone, Serialize)]
pub struct SignUpDetails {
    pub role: Role,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cnpj: Option<Cnpj>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cnh: Option<String>,
}

/// Result of a sign-up.
#[derive(Debug, Clone)]
pub enum SignUpOutcome {
    /// The project auto-confirms accounts; the new user is signed in.
    SignedIn(AuthUser),
    /// The user must confirm their email before signing in.
    ConfirmationRequired(AuthUser),
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

impl TokenResponse {
    fn into_session(self, now: DateTime<Utc>) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .or_else(|| self.expires_in.map(|secs| now + Duration::seconds(secs)));
        Session {
            access_token: SecretString::from(self.access_token),
            refresh_token: SecretString::from(self.refresh_token),
            expires_at,
            user: self.user,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(Box<TokenResponse>),
    User(AuthUser),
}

#[derive(Serialize)]
struct PasswordCredentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    data: &'a SignUpDetails,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

impl Backend {
    /// Create an account carrying role metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the email is already registered.
    #[instrument(skip(self, password, details), fields(role = %details.role))]
    pub async fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
        details: &SignUpDetails,
    ) -> Result<SignUpOutcome, BackendError> {
        let url = self.endpoint("auth/v1/signup")?;
        let response = self
            .anonymous_request(Method::POST, url)
            .json(&SignUpRequest {
                email: email.as_str(),
                password: password.expose_secret(),
                data: details,
            })
            .send()
            .await?;

        match read_json::<SignUpResponse>(response).await? {
            SignUpResponse::Session(tokens) => {
                let session = tokens.into_session(Utc::now());
                let user = session.user.clone();
                self.set_session(Some(session), AuthEvent::SignedIn(user.id))
                    .await;
                tracing::info!(user_id = %user.id, "Signed up and signed in");
                Ok(SignUpOutcome::SignedIn(user))
            }
            SignUpResponse::User(user) => {
                tracing::info!(user_id = %user.id, "Signed up, confirmation pending");
                Ok(SignUpOutcome::ConfirmationRequired(user))
            }
        }
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Api` (400) for wrong credentials.
    #[instrument(skip(self, password))]
    pub async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<Session, BackendError> {
        let url = self.endpoint("auth/v1/token")?;
        let response = self
            .anonymous_request(Method::POST, url)
            .query(&[("grant_type", "password")])
            .json(&PasswordCredentials {
                email: email.as_str(),
                password: password.expose_secret(),
            })
            .send()
            .await?;

        let session = read_json::<TokenResponse>(response)
            .await?
            .into_session(Utc::now());
        self.set_session(Some(session.clone()), AuthEvent::SignedIn(session.user.id))
            .await;
        tracing::info!(user_id = %session.user.id, "Signed in");
        Ok(session)
    }

    /// Exchange the refresh token for a fresh session.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotSignedIn` without a session, or the
    /// backend error when the refresh token was revoked.
    #[instrument(skip(self))]
    pub async fn refresh_session(&self) -> Result<Session, BackendError> {
        let refresh_token = self
            .session()
            .await
            .map(|s| s.refresh_token)
            .ok_or(BackendError::NotSignedIn)?;

        let url = self.endpoint("auth/v1/token")?;
        let response = self
            .anonymous_request(Method::POST, url)
            .query(&[("grant_type", "refresh_token")])
            .json(&RefreshRequest {
                refresh_token: refresh_token.expose_secret(),
            })
            .send()
            .await?;

        let session = read_json::<TokenResponse>(response)
            .await?
            .into_session(Utc::now());
        self.set_session(
            Some(session.clone()),
            AuthEvent::TokenRefreshed(session.user.id),
        )
        .await;
        tracing::debug!(user_id = %session.user.id, "Session refreshed");
        Ok(session)
    }

    /// Fetch the signed-in user from the auth server.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotSignedIn` without a session, or
    /// `BackendError::Unauthorized` when the token is no longer valid.
    #[instrument(skip(self))]
    pub async fn get_user(&self) -> Result<AuthUser, BackendError> {
        if self.session().await.is_none() {
            return Err(BackendError::NotSignedIn);
        }
        let url = self.endpoint("auth/v1/user")?;
        let response = self.request(Method::GET, url).await.send().await?;
        read_json(response).await
    }

    /// Sign out, revoking the session server-side.
    ///
    /// The local session is dropped even if the revoke call fails.
    ///
    /// # Errors
    ///
    /// Returns the backend error from the revoke call.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<(), BackendError> {
        let Some(session) = self.session().await else {
            return Ok(());
        };

        let url = self.endpoint("auth/v1/logout")?;
        let result = self
            .request_with_token(Method::POST, url, session.access_token.expose_secret())
            .send()
            .await;

        self.set_session(None, AuthEvent::SignedOut).await;
        tracing::info!(user_id = %session.user.id, "Signed out");

        ensure_success(result?).await.map(|_| ())
    }
}
