//! Account commands.

use pedeai_client::backend::SignUpOutcome;
use pedeai_client::services::{Registration, Screen, SessionService};
use pedeai_core::Role;

use super::{CliError, Context, emit};

/// Register a new account with the credentials given on the command line.
///
/// # Errors
///
/// Returns an error if validation, the registry lookup or sign-up fails.
pub async fn signup(
    ctx: &Context,
    role: Role,
    name: &str,
    cnpj: Option<&str>,
    cnh: Option<&str>,
    lookup: bool,
) -> Result<(), CliError> {
    if role == Role::Staff {
        return Err(CliError::WrongRole("client, store or courier"));
    }
    let (email, password) = ctx.credentials()?;
    let registry = ctx.registry()?;

    let mut sessions = SessionService::new(&ctx.backend);
    if lookup {
        sessions = sessions.with_registry(&registry);
    }

    let registered = sessions
        .register(Registration {
            email,
            password,
            full_name: name.to_string(),
            role,
            cnpj: cnpj.map(str::to_string),
            cnh: cnh.map(str::to_string),
        })
        .await?;

    if let Some(company) = &registered.company {
        emit(format!(
            "Empresa: {} ({})",
            company.display_name(),
            company.registration_status.as_deref().unwrap_or("?")
        ))?;
    }
    match registered.outcome {
        SignUpOutcome::SignedIn(user) => emit(format!("Conta criada: {}", user.id)),
        SignUpOutcome::ConfirmationRequired(_) => {
            emit("Confirme seu e-mail para ativar sua conta!")
        }
    }
}

/// Show who is signed in and where they land.
///
/// # Errors
///
/// Returns an error if sign-in or the profile query fails.
pub async fn whoami(ctx: &Context) -> Result<(), CliError> {
    ctx.sign_in().await?;
    let sessions = SessionService::new(&ctx.backend);
    let profile = sessions.current_profile().await?;
    let screen = Screen::for_profile(profile.as_ref());

    match profile {
        Some(profile) => {
            emit(format!(
                "{} <{}>",
                profile.full_name.as_deref().unwrap_or("-"),
                profile.email.as_deref().unwrap_or("-")
            ))?;
            emit(format!("id: {}", profile.id))?;
            emit(format!("role: {}", profile.role))?;
            if let Some(status) = profile.status {
                emit(format!("status: {status}"))?;
            }
        }
        None => emit("Sem perfil")?,
    }
    emit(format!("screen: {screen:?}"))
}
