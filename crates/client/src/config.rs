//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SUPABASE_URL` - Project URL of the hosted backend (e.g. `https://xyz.supabase.co`)
//! - `SUPABASE_ANON_KEY` - Public anon key; row-level security does the rest
//!
//! ## Optional
//! - `GEMINI_API_KEY` - Google Gemini API key (AI suggestions disabled when unset)
//! - `GEMINI_MODEL` - Gemini model ID (default: gemini-3-flash-preview)
//! - `CNPJ_API_URL` - Company registry base URL (default: BrasilAPI)
//! - `PRODUCT_IMAGES_BUCKET` - Storage bucket for menu photos (default: product-images)
//! - `STORE_IMAGES_BUCKET` - Storage bucket for store profile photos (default: store-images)
//! - `REALTIME_HEARTBEAT_SECS` - Realtime heartbeat interval (default: 25)
//! - `HTTP_TIMEOUT_SECS` - Per-request timeout for REST calls (default: 30)
//! - `PEDEAI_LOG_JSON` - Emit JSON logs when set
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Sentry error sample rate (default: 1.0)

use std::collections::HashMap;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

pub(crate) const DEFAULT_GEMINI_MODEL: &str = "gemini-3-flash-preview";
pub(crate) const DEFAULT_CNPJ_API_URL: &str = "https://brasilapi.com.br/api/cnpj/v1";
const DEFAULT_PRODUCT_IMAGES_BUCKET: &str = "product-images";
const DEFAULT_STORE_IMAGES_BUCKET: &str = "store-images";
const DEFAULT_HEARTBEAT_SECS: u64 = 25;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Top-level client configuration.
#[derive(Debug, Clone)]
pub struct PedeaiConfig {
    /// Hosted backend (auth, tables, storage, realtime)
    pub backend: BackendConfig,
    /// Gemini configuration (optional - enables AI suggestions)
    pub gemini: Option<GeminiConfig>,
    /// Company registry lookup configuration
    pub registry: RegistryConfig,
    /// Emit JSON-formatted logs
    pub log_json: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
}

/// Backend-as-a-service connection settings.
///
/// Implements `Debug` manually to redact the anon key.
#[derive(Clone)]
pub struct BackendConfig {
    /// Project base URL
    pub url: Url,
    /// Public anon key sent as `apikey` on every request
    pub anon_key: SecretString,
    /// Bucket holding product photos
    pub product_images_bucket: String,
    /// Bucket holding store profile photos
    pub store_images_bucket: String,
    /// Interval between realtime heartbeats
    pub heartbeat_interval: Duration,
    /// Timeout applied to each REST request
    pub http_timeout: Duration,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("url", &self.url.as_str())
            .field("anon_key", &"[REDACTED]")
            .field("product_images_bucket", &self.product_images_bucket)
            .field("store_images_bucket", &self.store_images_bucket)
            .field("heartbeat_interval", &self.heartbeat_interval)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

impl BackendConfig {
    /// Build a backend configuration with default buckets and timings.
    #[must_use]
    pub fn new(url: Url, anon_key: SecretString) -> Self {
        Self {
            url,
            anon_key,
            product_images_bucket: DEFAULT_PRODUCT_IMAGES_BUCKET.to_string(),
            store_images_bucket: DEFAULT_STORE_IMAGES_BUCKET.to_string(),
            heartbeat_interval: Duration::from_secs(DEFAULT_HEARTBEAT_SECS),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }

    fn from_env() -> Result<Self, ConfigError> {
        let raw_url = get_required_env("SUPABASE_URL")?;
        let url = Url::parse(&raw_url)
            .map_err(|e| ConfigError::InvalidEnvVar("SUPABASE_URL".to_string(), e.to_string()))?;

        // The anon key is public by design, so weak-looking values only warn.
        let anon_key = get_required_env("SUPABASE_ANON_KEY")?;
        if let Err(e) = validate_secret_strength(&anon_key, "SUPABASE_ANON_KEY") {
            tracing::warn!("SUPABASE_ANON_KEY validation warning: {e}");
        }

        Ok(Self {
            url,
            anon_key: SecretString::from(anon_key),
            product_images_bucket: get_env_or_default(
                "PRODUCT_IMAGES_BUCKET",
                DEFAULT_PRODUCT_IMAGES_BUCKET,
            ),
            store_images_bucket: get_env_or_default(
                "STORE_IMAGES_BUCKET",
                DEFAULT_STORE_IMAGES_BUCKET,
            ),
            heartbeat_interval: Duration::from_secs(get_u64_or_default(
                "REALTIME_HEARTBEAT_SECS",
                DEFAULT_HEARTBEAT_SECS,
            )?),
            http_timeout: Duration::from_secs(get_u64_or_default(
                "HTTP_TIMEOUT_SECS",
                DEFAULT_HTTP_TIMEOUT_SECS,
            )?),
        })
    }
}

/// Google Gemini API configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct GeminiConfig {
    /// Gemini API key
    pub api_key: SecretString,
    /// Model ID (e.g., gemini-3-flash-preview)
    pub model: String,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .finish()
    }
}

impl GeminiConfig {
    /// Load Gemini configuration from environment.
    ///
    /// Returns `Ok(None)` if `GEMINI_API_KEY` is not set (AI suggestions disabled).
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(key) = get_optional_env("GEMINI_API_KEY") else {
            return Ok(None);
        };
        validate_secret_strength(&key, "GEMINI_API_KEY")?;
        Ok(Some(Self {
            api_key: SecretString::from(key),
            model: get_env_or_default("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
        }))
    }
}

/// Company registry (CNPJ lookup) configuration.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Base URL; the 14-digit CNPJ is appended as the last path segment
    pub base_url: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_CNPJ_API_URL.to_string(),
        }
    }
}

impl PedeaiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let backend = BackendConfig::from_env()?;
        let gemini = GeminiConfig::from_env()?;
        let registry = RegistryConfig {
            base_url: get_env_or_default("CNPJ_API_URL", DEFAULT_CNPJ_API_URL),
        };
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            backend,
            gemini,
            registry,
            log_json: get_optional_env("PEDEAI_LOG_JSON").is_some(),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate,
        })
    }

    /// Returns a reference to the Gemini configuration, if available.
    #[must_use]
    pub const fn gemini(&self) -> Option<&GeminiConfig> {
        self.gemini.as_ref()
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable (empty counts as unset).
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Get a numeric environment variable with a default value.
fn get_u64_or_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}
