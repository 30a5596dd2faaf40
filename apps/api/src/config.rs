use anyhow::{Context, Result};

use crate::ai::ProviderKeys;
use crate::bypass::DevBypass;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub port: u16,
    pub rust_log: String,
    pub bypass: DevBypass,
    pub provider_keys: ProviderKeys,
    /// Empty means any origin.
    pub allowed_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            jwt_secret: require_env("JWT_SECRET")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            bypass: DevBypass::from_env_value(std::env::var("DEV_BYPASS_AUTH").ok().as_deref()),
            provider_keys: ProviderKeys {
                google: optional_env("GOOGLE_API_KEY"),
                openai: optional_env("OPENAI_API_KEY"),
                anthropic: optional_env("ANTHROPIC_API_KEY"),
                deepseek: optional_env("DEEPSEEK_API_KEY"),
            },
            allowed_origins: parse_origins(std::env::var("ALLOWED_ORIGINS").ok().as_deref()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_origins(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect()
}
