//! Sign-up, sign-in and role routing.
//!
//! Every auth user has one `profiles` row (created by a backend trigger from
//! the sign-up metadata). The role stored there decides which screen set the
//! user lands on.

use pedeai_core::{Cnpj, Email, Role, UserId};
use secrecy::SecretString;
use tracing::instrument;

use crate::backend::{Backend, BackendError, Query, Session, SignUpDetails, SignUpOutcome};
use crate::error::ServiceError;
use crate::models::Profile;
use crate::registry::{CompanyRecord, RegistryClient};

/// Top-level screen set for a signed-in identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    /// Role selection and login.
    Onboarding,
    Customer,
    StoreAdmin,
    Courier,
    Staff,
}

impl Screen {
    /// Screen set for a stored role.
    #[must_use]
    pub const fn for_role(role: Role) -> Self {
        match role {
            Role::Client => Self::Customer,
            Role::Store => Self::StoreAdmin,
            Role::Courier => Self::Courier,
            Role::Staff => Self::Staff,
        }
    }

    /// Screen set for an optional profile; no profile means onboarding.
    #[must_use]
    pub fn for_profile(profile: Option<&Profile>) -> Self {
        profile.map_or(Self::Onboarding, |p| Self::for_role(p.role))
    }
}

/// Registration input for a new account.
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: Email,
    pub password: SecretString,
    pub full_name: String,
    pub role: Role,
    /// Required for stores.
    pub cnpj: Option<String>,
    /// Required for couriers.
    pub cnh: Option<String>,
}

/// Result of registering an account.
#[derive(Debug, Clone)]
pub struct Registered {
    pub outcome: SignUpOutcome,
    /// Registry record when a store's CNPJ was looked up.
    pub company: Option<CompanyRecord>,
}

/// Authentication and role resolution.
pub struct SessionService<'a> {
    backend: &'a Backend,
    registry: Option<&'a RegistryClient>,
}

impl<'a> SessionService<'a> {
    #[must_use]
    pub const fn new(backend: &'a Backend) -> Self {
        Self {
            backend,
            registry: None,
        }
    }

    /// Look store CNPJs up in the company registry before registering.
    #[must_use]
    pub const fn with_registry(mut self, registry: &'a RegistryClient) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Create a customer, store or courier account.
    ///
    /// Stores must carry a valid CNPJ; when a registry is attached the
    /// company must also exist there. Couriers must carry a CNH. Staff
    /// accounts are never self-registered.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Forbidden` for the staff role,
    /// `ServiceError::Validation` for missing or malformed documents,
    /// `ServiceError::Registry` when the lookup fails, or a backend error.
    #[instrument(skip(self, registration), fields(role = %registration.role))]
    pub async fn register(&self, registration: Registration) -> Result<Registered, ServiceError> {
        if registration.role == Role::Staff {
            tracing::warn!("Staff self-registration refused");
            return Err(ServiceError::Forbidden(
                "Contas de equipe não podem ser criadas pelo cadastro".to_string(),
            ));
        }

        let full_name = registration.full_name.trim().to_string();
        if full_name.is_empty() {
            return Err(ServiceError::Validation("Informe seu nome".to_string()));
        }

        let mut details = SignUpDetails {
            role: registration.role,
            full_name,
            cnpj: None,
            cnh: None,
        };
        let mut company = None;

        match registration.role {
            Role::Store => {
                let raw = registration.cnpj.as_deref().unwrap_or_default();
                let cnpj = Cnpj::parse(raw)?;
                if let Some(registry) = self.registry {
                    let record = registry.lookup(&cnpj).await?;
                    if !record.is_active() {
                        tracing::warn!(cnpj = %cnpj, "Registering store with inactive CNPJ");
                    }
                    company = Some(record);
                }
                details.cnpj = Some(cnpj);
            }
            Role::Courier => {
                let cnh = registration
                    .cnh
                    .as_deref()
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .ok_or_else(|| ServiceError::Validation("Informe sua CNH".to_string()))?;
                details.cnh = Some(cnh.to_string());
            }
            Role::Client | Role::Staff => {}
        }

        let outcome = self
            .backend
            .sign_up(&registration.email, &registration.password, &details)
            .await?;
        Ok(Registered { outcome, company })
    }

    /// Sign in and resolve the landing screen.
    ///
    /// # Errors
    ///
    /// Returns a backend error for wrong credentials.
    #[instrument(skip(self, password))]
    pub async fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<(Session, Screen), ServiceError> {
        let session = self.backend.sign_in_with_password(email, password).await?;
        let screen = self.current_screen().await?;
        Ok((session, screen))
    }

    /// Sign out; the next screen is always onboarding.
    ///
    /// # Errors
    ///
    /// Never fails on a revoke error; the local session is dropped regardless.
    pub async fn sign_out(&self) -> Result<Screen, ServiceError> {
        if let Err(e) = self.backend.sign_out().await {
            tracing::warn!(error = %e, "Token revoke failed");
        }
        Ok(Screen::Onboarding)
    }

    /// Profile of the signed-in user, if both exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile query fails.
    pub async fn current_profile(&self) -> Result<Option<Profile>, ServiceError> {
        let Some(user) = self.backend.current_user().await else {
            return Ok(None);
        };
        self.profile(user.id).await
    }

    /// Profile of any user.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn profile(&self, user_id: UserId) -> Result<Option<Profile>, ServiceError> {
        match self
            .backend
            .select_single::<Profile>(&Query::table("profiles").eq("id", user_id))
            .await
        {
            Ok(profile) => Ok(Some(profile)),
            Err(BackendError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Screen for the current session.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile query fails.
    pub async fn current_screen(&self) -> Result<Screen, ServiceError> {
        let profile = self.current_profile().await?;
        Ok(Screen::for_profile(profile.as_ref()))
    }
}
