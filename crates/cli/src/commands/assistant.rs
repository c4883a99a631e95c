//! Gemini helpers and CNPJ tools.

use pedeai_client::ServiceError;
use pedeai_client::services::SuggestionService;
use pedeai_core::{Cnpj, format_cnpj};

use super::{CliError, Context, emit};

/// Suggest dishes for a craving.
///
/// # Errors
///
/// Returns an error if the Gemini client cannot be built.
pub async fn suggest(ctx: &Context, craving: &str) -> Result<(), CliError> {
    let gemini = ctx.gemini()?;
    let suggestions = SuggestionService::new(gemini.as_ref());
    if !suggestions.is_enabled() {
        tracing::warn!("GEMINI_API_KEY not set, suggestions disabled");
    }

    let dishes = suggestions.menu_suggestions(craving).await;
    if dishes.is_empty() {
        return emit("Nenhuma sugestão no momento");
    }
    for dish in dishes {
        match dish.price_hint {
            Some(price) => emit(format!("{} ({price})", dish.name))?,
            None => emit(&dish.name)?,
        }
        emit(format!("    {}", dish.description))?;
    }
    Ok(())
}

/// Write a menu description for a product name.
///
/// # Errors
///
/// Returns an error if the Gemini client cannot be built.
pub async fn describe(ctx: &Context, product: &str) -> Result<(), CliError> {
    let gemini = ctx.gemini()?;
    let text = SuggestionService::new(gemini.as_ref())
        .product_description(product)
        .await;
    emit(text)
}

/// Validate a CNPJ and optionally look it up in the registry.
///
/// # Errors
///
/// Returns an error for an invalid CNPJ or a failed lookup.
pub async fn cnpj(ctx: &Context, value: &str, lookup: bool) -> Result<(), CliError> {
    let cnpj = Cnpj::parse(value).map_err(ServiceError::from)?;
    emit(format_cnpj(value))?;
    if !lookup {
        return Ok(());
    }

    let company = ctx.registry()?.lookup(&cnpj).await?;
    emit(company.display_name())?;
    if let Some(status) = &company.registration_status {
        emit(format!("Situação: {status}"))?;
    }
    if let Some(activity) = &company.main_activity {
        emit(format!("Atividade: {activity}"))?;
    }
    if let (Some(city), Some(state)) = (&company.city, &company.state) {
        emit(format!("{city}/{state}"))?;
    }
    Ok(())
}
