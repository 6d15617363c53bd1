use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use dotenvy::dotenv;

use crate::services::generator::ProviderKind;

const DEFAULT_ADDR: &str = "127.0.0.1:3000";

fn default_max_body_bytes() -> usize {
    // 16 MB in bytes
    16 * 1024 * 1024
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub api_key: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct AzureSettings {
    pub api_key: String,
    pub endpoint: String,
    pub deployment: String,
    pub api_version: String,
}

/// Which text generators can be built, and with which credentials.
#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    pub provider: ProviderKind,
    pub openai: Option<ApiSettings>,
    pub anthropic: Option<ApiSettings>,
    pub gemini: Option<ApiSettings>,
    pub azure_openai: Option<AzureSettings>,
    /// Pause between consecutive generations in a bulk run.
    pub request_delay: Duration,
    pub rate_limit_backoff: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub max_body_bytes: usize,
    pub generators: GeneratorSettings,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file first
        dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let get_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let addr: SocketAddr = get_or("STORY_SHEETS_ADDR", DEFAULT_ADDR)
            .parse()
            .context("Failed to parse STORY_SHEETS_ADDR")?;

        let max_body_bytes: usize = match get("STORY_SHEETS_MAX_BODY_BYTES") {
            Some(v) => v.parse().context("Failed to parse STORY_SHEETS_MAX_BODY_BYTES")?,
            None => default_max_body_bytes(),
        };

        let provider: ProviderKind = get_or("AI_PROVIDER", "gemini")
            .parse()
            .context("Failed to parse AI_PROVIDER")?;

        let api = |key_var: &str, model_var: &str, default_model: &str| {
            get(key_var).map(|api_key| ApiSettings {
                api_key,
                model: get_or(model_var, default_model),
            })
        };

        let azure_openai = match (get("AZURE_OPENAI_API_KEY"), get("AZURE_OPENAI_ENDPOINT"), get("AZURE_OPENAI_DEPLOYMENT")) {
            (Some(api_key), Some(endpoint), Some(deployment)) => Some(AzureSettings {
                api_key,
                endpoint,
                deployment,
                api_version: get_or("AZURE_OPENAI_API_VERSION", "2024-02-15-preview"),
            }),
            _ => None,
        };

        let default_delay_ms = if provider == ProviderKind::Gemini { 2000 } else { 1000 };
        let request_delay: u64 = match get("GENERATION_DELAY_MS") {
            Some(v) => v.parse().context("Failed to parse GENERATION_DELAY_MS")?,
            None => default_delay_ms,
        };
        let rate_limit_backoff: u64 = match get("RATE_LIMIT_BACKOFF_SECS") {
            Some(v) => v.parse().context("Failed to parse RATE_LIMIT_BACKOFF_SECS")?,
            None => 60,
        };

        Ok(Config {
            addr,
            max_body_bytes,
            generators: GeneratorSettings {
                provider,
                openai: api("OPENAI_API_KEY", "OPENAI_MODEL", "gpt-4.1"),
                anthropic: api("ANTHROPIC_API_KEY", "ANTHROPIC_MODEL", "claude-3-sonnet-20240229"),
                gemini: api("GEMINI_API_KEY", "GEMINI_MODEL", "gemini-2.0-flash"),
                azure_openai,
                request_delay: Duration::from_millis(request_delay),
                rate_limit_backoff: Duration::from_secs(rate_limit_backoff),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = config(&[]).unwrap();
        assert_eq!(config.addr, "127.0.0.1:3000".parse().unwrap());
        assert_eq!(config.max_body_bytes, 16 * 1024 * 1024);
        assert_eq!(config.generators.provider, ProviderKind::Gemini);
        assert_eq!(config.generators.request_delay, Duration::from_millis(2000));
        assert!(config.generators.gemini.is_none());
        assert!(config.generators.azure_openai.is_none());
    }

    #[test]
    fn credentials_enable_providers() {
        let config = config(&[
            ("AI_PROVIDER", "openai"),
            ("OPENAI_API_KEY", "sk-test"),
            ("GEMINI_API_KEY", "  "),
            ("AZURE_OPENAI_API_KEY", "az"),
            ("AZURE_OPENAI_ENDPOINT", "https://example.openai.azure.com/"),
            ("AZURE_OPENAI_DEPLOYMENT", "qa"),
        ])
        .unwrap();
        let generators = config.generators;
        assert_eq!(generators.provider, ProviderKind::OpenAi);
        assert_eq!(generators.openai.unwrap().model, "gpt-4.1");
        assert!(generators.gemini.is_none());
        assert_eq!(generators.azure_openai.unwrap().api_version, "2024-02-15-preview");
        assert_eq!(generators.request_delay, Duration::from_millis(1000));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(config(&[("AI_PROVIDER", "bard")]).is_err());
        assert!(config(&[("STORY_SHEETS_ADDR", "nowhere")]).is_err());
        assert!(config(&[("GENERATION_DELAY_MS", "soon")]).is_err());
    }
}
