//! Configuration for the completion client

use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_MAX_TOKENS: u32 = 500;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Token cap for the credential probe; the reply is discarded
pub const PROBE_MAX_TOKENS: u32 = 5;

/// Configuration for the OpenAI-compatible endpoint
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// API base, e.g. `https://api.openai.com/v1`
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// `None` means requests wait for the upstream indefinitely
    pub request_timeout: Option<Duration>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            request_timeout: None,
        }
    }
}

impl LlmConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let timeout_secs: u64 = parse_or("CHAT_REQUEST_TIMEOUT_SECS", lookup("CHAT_REQUEST_TIMEOUT_SECS"), 0);

        Self {
            base_url: lookup("OPENAI_BASE_URL")
                .filter(|url| !url.trim().is_empty())
                .map_or(defaults.base_url, |url| url.trim_end_matches('/').to_string()),
            model: lookup("CHAT_MODEL")
                .filter(|model| !model.trim().is_empty())
                .unwrap_or(defaults.model),
            max_tokens: parse_or("CHAT_MAX_TOKENS", lookup("CHAT_MAX_TOKENS"), defaults.max_tokens),
            temperature: parse_or(
                "CHAT_TEMPERATURE",
                lookup("CHAT_TEMPERATURE"),
                defaults.temperature,
            ),
            request_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
        }
    }

    /// Full URL of the chat completions endpoint
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

/// Parse an optional environment value, keeping the default on absence or garbage
pub(crate) fn parse_or<T: FromStr + Copy>(name: &str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(value) => value.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(variable = name, value = %value, "Ignoring unparsable setting");
            default
        }),
    }
}
