use std::fmt;
use std::time::Duration;

use stride_core::store::EvictionPolicy;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_LLM_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_LLM_MAX_TOKENS: u32 = 1000;
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Runtime configuration, read from the environment after `.env` is loaded.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub require_https: bool,
    pub llm: LlmConfig,
    pub eviction: EvictionPolicy,
}

#[derive(Clone)]
pub struct LlmConfig {
    /// Absent means chat turns fail with 503.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| get(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_url = var("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let port = parse_or("PORT", var("PORT"), DEFAULT_PORT)?;
        let require_https = var("STRIDE_REQUIRE_HTTPS").is_some_and(|v| v == "true");

        let llm = LlmConfig {
            api_key: var("OPENAI_API_KEY"),
            base_url: var("STRIDE_LLM_BASE_URL")
                .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string()),
            model: var("STRIDE_LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            temperature: parse_or(
                "STRIDE_LLM_TEMPERATURE",
                var("STRIDE_LLM_TEMPERATURE"),
                DEFAULT_LLM_TEMPERATURE,
            )?,
            max_tokens: parse_or(
                "STRIDE_LLM_MAX_TOKENS",
                var("STRIDE_LLM_MAX_TOKENS"),
                DEFAULT_LLM_MAX_TOKENS,
            )?,
            timeout: Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS),
        };

        // A TTL wins over a capacity bound when both are configured.
        let ttl: Option<u64> = parse_opt(
            "STRIDE_CONVERSATION_TTL_SECONDS",
            var("STRIDE_CONVERSATION_TTL_SECONDS"),
        )?;
        let capacity: Option<usize> = parse_opt(
            "STRIDE_CONVERSATION_CAPACITY",
            var("STRIDE_CONVERSATION_CAPACITY"),
        )?;
        let eviction = match (ttl, capacity) {
            (Some(secs), _) if secs > 0 => EvictionPolicy::Ttl(Duration::from_secs(secs)),
            (_, Some(capacity)) if capacity > 0 => EvictionPolicy::Lru { capacity },
            _ => EvictionPolicy::Unbounded,
        };

        Ok(Self {
            database_url,
            port,
            require_https,
            llm,
            eviction,
        })
    }
}

fn parse_opt<T: std::str::FromStr>(
    name: &'static str,
    raw: Option<String>,
) -> Result<Option<T>, ConfigError> {
    raw.map(|value| {
        value
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { name, value })
    })
    .transpose()
}

fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    Ok(parse_opt(name, raw)?.unwrap_or(default))
}
