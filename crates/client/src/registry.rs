//! Company registry lookup (CNPJ) for store registration.
//!
//! Queries the public BrasilAPI mirror of the federal company registry.
//! Validation of the number itself is local ([`pedeai_core::Cnpj`]); this
//! client only answers whether the company exists and what it is called.

use std::sync::Arc;

use pedeai_core::Cnpj;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use crate::config::RegistryConfig;

/// Errors from the registry lookup.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// No company is registered under this CNPJ.
    #[error("CNPJ não encontrado ou inexistente: {0}")]
    NotFound(String),

    /// The registry answered with an unexpected status.
    #[error("Erro ao verificar CNPJ (status {0}). Tente novamente mais tarde.")]
    Lookup(u16),

    /// Failed to parse the registry response.
    #[error("parse error: {0}")]
    Parse(String),
}

/// Registry record for a company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub cnpj: String,
    #[serde(rename = "razao_social", default)]
    pub legal_name: String,
    #[serde(rename = "nome_fantasia", default)]
    pub trade_name: Option<String>,
    #[serde(rename = "descricao_situacao_cadastral", default)]
    pub registration_status: Option<String>,
    #[serde(rename = "cnae_fiscal_descricao", default)]
    pub main_activity: Option<String>,
    #[serde(rename = "municipio", default)]
    pub city: Option<String>,
    #[serde(rename = "uf", default)]
    pub state: Option<String>,
    #[serde(default)]
    pub cep: Option<String>,
}

impl CompanyRecord {
    /// Trade name when the company has one, otherwise the legal name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.trade_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.legal_name)
    }

    /// Whether the registry lists the company as active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.registration_status
            .as_deref()
            .is_some_and(|status| status.eq_ignore_ascii_case("ATIVA"))
    }
}

/// Client for the company registry.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    inner: Arc<RegistryClientInner>,
}

#[derive(Debug)]
struct RegistryClientInner {
    client: reqwest::Client,
    base_url: String,
}

impl RegistryClient {
    /// Create a registry client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &RegistryConfig) -> Result<Self, RegistryError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("pedeai-client/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            inner: Arc::new(RegistryClientInner {
                client,
                base_url: config.base_url.trim_end_matches('/').to_string(),
            }),
        })
    }

    /// Look up a company by CNPJ.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::NotFound` for unknown companies and
    /// `RegistryError::Lookup` for any other non-success status.
    #[instrument(skip(self), fields(cnpj = %cnpj))]
    pub async fn lookup(&self, cnpj: &Cnpj) -> Result<CompanyRecord, RegistryError> {
        let url = format!("{}/{}", self.inner.base_url, cnpj.digits());
        let response = self.inner.client.get(url).send().await?;

        match response.status() {
            status if status.is_success() => {
                let body = response.text().await?;
                serde_json::from_str(&body)
                    .map_err(|e| RegistryError::Parse(format!("Failed to parse company: {e}")))
            }
            StatusCode::NOT_FOUND => Err(RegistryError::NotFound(cnpj.formatted())),
            status => {
                tracing::warn!(status = %status, "CNPJ lookup failed");
                Err(RegistryError::Lookup(status.as_u16()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_company_record_deserialization() {
        let json = r#"{
            "cnpj": "11222333000181",
            "razao_social": "CANTINA DA NONNA LTDA",
            "nome_fantasia": "Cantina da Nonna",
            "descricao_situacao_cadastral": "ATIVA",
            "cnae_fiscal_descricao": "Restaurantes e similares",
            "municipio": "SAO PAULO",
            "uf": "SP",
            "cep": "01310100",
            "qsa": []
        }"#;
        let record: CompanyRecord = serde_json::from_str(json).expect("deserialize");
        assert_eq!(record.display_name(), "Cantina da Nonna");
        assert!(record.is_active());
        assert_eq!(record.state.as_deref(), Some("SP"));
    }

    #[test]
    fn test_display_name_falls_back_to_legal_name() {
        let json = r#"{"cnpj": "11222333000181", "razao_social": "PADARIA ESTRELA LTDA", "nome_fantasia": "  ", "descricao_situacao_cadastral": "BAIXADA"}"#;
        let record: CompanyRecord = serde_json::from_str(json).expect("deserialize");
        assert_eq!(record.display_name(), "PADARIA ESTRELA LTDA");
        assert!(!record.is_active());
    }

    #[test]
    fn test_not_found_message() {
        let err = RegistryError::NotFound("11.222.333/0001-81".to_string());
        assert_eq!(
            err.to_string(),
            "CNPJ não encontrado ou inexistente: 11.222.333/0001-81"
        );
    }
}
