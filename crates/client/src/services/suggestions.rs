//! AI helpers with fixed fallbacks.
//!
//! The assistant is optional: without a Gemini key, or when a request fails,
//! customers get no suggestions and stores get a stock description.

use tracing::instrument;

use crate::gemini::{GeminiClient, MenuSuggestion};

/// Description used when generation fails.
pub const FALLBACK_DESCRIPTION: &str = "Uma escolha deliciosa para sua próxima refeição.";

/// Description used when the model answers with nothing.
pub const EMPTY_DESCRIPTION: &str = "Um favorito dos clientes, preparado na hora.";

pub struct SuggestionService<'a> {
    gemini: Option<&'a GeminiClient>,
}

impl<'a> SuggestionService<'a> {
    #[must_use]
    pub const fn new(gemini: Option<&'a GeminiClient>) -> Self {
        Self { gemini }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.gemini.is_some()
    }

    /// Dish ideas for a craving; empty when unavailable.
    #[instrument(skip(self))]
    pub async fn menu_suggestions(&self, craving: &str) -> Vec<MenuSuggestion> {
        let craving = craving.trim();
        let Some(gemini) = self.gemini.filter(|_| !craving.is_empty()) else {
            return Vec::new();
        };
        match gemini.menu_suggestions(craving).await {
            Ok(suggestions) => suggestions,
            Err(e) => {
                tracing::error!(error = %e, "Menu suggestions failed");
                Vec::new()
            }
        }
    }

    /// Marketing copy for a product, never empty.
    #[instrument(skip(self))]
    pub async fn product_description(&self, product_name: &str) -> String {
        let Some(gemini) = self.gemini else {
            return FALLBACK_DESCRIPTION.to_string();
        };
        match gemini.product_description(product_name).await {
            Ok(text) if text.is_empty() => EMPTY_DESCRIPTION.to_string(),
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "Product description failed");
                FALLBACK_DESCRIPTION.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_assistant_falls_back() {
        let service = SuggestionService::new(None);
        assert!(!service.is_enabled());
        assert!(service.menu_suggestions("algo leve").await.is_empty());
        assert_eq!(
            service.product_description("Bowl de Açaí").await,
            FALLBACK_DESCRIPTION
        );
    }
}
