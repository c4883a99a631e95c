//! Command implementations, grouped by role.

pub mod assistant;
pub mod chat;
pub mod courier;
pub mod customer;
pub mod session;
pub mod staff;
pub mod store;
pub mod support;

use std::fmt;
use std::io::Write;

use clap::Args;
use pedeai_client::backend::BackendError;
use pedeai_client::config::ConfigError;
use pedeai_client::gemini::{GeminiClient, GeminiError};
use pedeai_client::models::Order;
use pedeai_client::registry::{RegistryClient, RegistryError};
use pedeai_client::services::SessionService;
use pedeai_client::{Backend, PedeaiConfig, ServiceError};
use pedeai_core::{Email, EmailError, UserId};
use secrecy::SecretString;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Gemini(#[from] GeminiError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Invalid email: {0}")]
    Email(#[from] EmailError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The command needs credentials that were not given.
    #[error("Missing credentials: pass --email/--password or set PEDEAI_EMAIL/PEDEAI_PASSWORD")]
    MissingCredentials,

    /// The signed-in account cannot run this command.
    #[error("This command needs a {0} account")]
    WrongRole(&'static str),
}

/// Account credentials.
#[derive(Args)]
pub struct Credentials {
    /// Account email
    #[arg(long, env = "PEDEAI_EMAIL", global = true)]
    email: Option<String>,

    /// Account password
    #[arg(long, env = "PEDEAI_PASSWORD", hide_env_values = true, global = true)]
    password: Option<String>,
}

/// Shared state for one command run.
pub struct Context {
    pub config: PedeaiConfig,
    pub backend: Backend,
    credentials: Credentials,
}

impl Context {
    /// Build the backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: PedeaiConfig, credentials: Credentials) -> Result<Self, CliError> {
        let backend = Backend::new(&config.backend)?;
        Ok(Self {
            config,
            backend,
            credentials,
        })
    }

    /// Email and password from flags or environment.
    ///
    /// # Errors
    ///
    /// Returns `CliError::MissingCredentials` when either is absent.
    pub fn credentials(&self) -> Result<(Email, SecretString), CliError> {
        let (Some(email), Some(password)) = (&self.credentials.email, &self.credentials.password)
        else {
            return Err(CliError::MissingCredentials);
        };
        Ok((Email::parse(email)?, SecretString::from(password.clone())))
    }

    /// Sign in and return the user id.
    ///
    /// # Errors
    ///
    /// Returns an error for missing or wrong credentials.
    pub async fn sign_in(&self) -> Result<UserId, CliError> {
        if let Some(user) = self.backend.current_user().await {
            return Ok(user.id);
        }
        let (email, password) = self.credentials()?;
        let (session, screen) = SessionService::new(&self.backend)
            .sign_in(&email, &password)
            .await?;
        tracing::debug!(user_id = %session.user.id, ?screen, "Signed in");
        Ok(session.user.id)
    }

    /// Gemini client when an API key is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be built.
    pub fn gemini(&self) -> Result<Option<GeminiClient>, CliError> {
        self.config
            .gemini()
            .map(GeminiClient::new)
            .transpose()
            .map_err(CliError::from)
    }

    /// Company registry client.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be built.
    pub fn registry(&self) -> Result<RegistryClient, CliError> {
        Ok(RegistryClient::new(&self.config.registry)?)
    }
}

/// Write one line to stdout.
///
/// # Errors
///
/// Returns an error if stdout is closed.
pub fn emit(line: impl fmt::Display) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{line}")?;
    Ok(())
}

/// One-line order summary.
pub(crate) fn order_line(order: &Order) -> String {
    format!(
        "{} {}  {:<11} {}  {} item(s)  {}",
        order.short_ref(),
        order.id,
        order.status.label(),
        order.total,
        order.item_count(),
        order.created_at.format("%d/%m %H:%M"),
    )
}
