use crate::error::ConfigError;
use tracing::debug;
use url::Url;

pub const API_KEY_VAR: &str = "GEMINI_API_KEY";
pub const MODEL_VAR: &str = "GEMINI_MODEL";
pub const EMBED_MODEL_VAR: &str = "GEMINI_EMBED_MODEL";
pub const EMBED_DIMENSIONS_VAR: &str = "GEMINI_EMBED_DIMENSIONS";
pub const BASE_URL_VAR: &str = "GEMINI_BASE_URL";

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_EMBED_MODEL: &str = "text-embedding-004";
pub const DEFAULT_EMBED_DIMENSIONS: usize = 768;
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";

#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: Url,
    pub model: String,
    pub embed_model: String,
    pub embed_dimensions: usize,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url.as_str())
            .field("model", &self.model)
            .field("embed_model", &self.embed_model)
            .field("embed_dimensions", &self.embed_dimensions)
            .finish()
    }
}

impl GeminiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "loaded .env");
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let api_key = non_blank(API_KEY_VAR).ok_or(ConfigError::MissingVar(API_KEY_VAR))?;

        let mut raw_base = non_blank(BASE_URL_VAR).unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if !raw_base.ends_with('/') {
            raw_base.push('/');
        }
        let base_url = Url::parse(&raw_base)?;

        let embed_dimensions = match non_blank(EMBED_DIMENSIONS_VAR) {
            Some(value) => value
                .parse::<usize>()
                .ok()
                .filter(|dims| *dims > 0)
                .ok_or_else(|| ConfigError::InvalidValue {
                    name: EMBED_DIMENSIONS_VAR,
                    details: format!("expected a positive integer, got '{value}'"),
                })?,
            None => DEFAULT_EMBED_DIMENSIONS,
        };

        Ok(Self {
            api_key,
            base_url,
            model: non_blank(MODEL_VAR).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            embed_model: non_blank(EMBED_MODEL_VAR)
                .unwrap_or_else(|| DEFAULT_EMBED_MODEL.to_string()),
            embed_dimensions,
        })
    }
}
