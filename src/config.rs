use std::env;
use std::path::PathBuf;

use anyhow::Result;
use once_cell::sync::Lazy;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub log_dir: PathBuf,
    pub database_url: String,
    pub gateway_api_key: String,
    pub gateway_base_url: String,
    pub high_quality_model: String,
    pub fast_model: String,
    pub request_timeout_seconds: u64,
}

pub static CONFIG: Lazy<Config> =
    Lazy::new(|| Config::load().expect("Failed to load configuration"));

fn env_string(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}

fn normalize_database_url(value: String) -> String {
    if value.starts_with("sqlite+aiosqlite://") {
        return value.replacen("sqlite+aiosqlite://", "sqlite://", 1);
    }
    value
}

fn normalize_model_id(name: &str, value: String, default: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        warn!("{} is empty; defaulting to {}.", name, default);
        return default.to_string();
    }
    trimmed.to_string()
}

pub const DEFAULT_HIGH_QUALITY_MODEL: &str = "google/gemini-3-pro-image-preview";
pub const DEFAULT_FAST_MODEL: &str = "google/gemini-2.5-flash-image";

impl Config {
    pub fn load() -> Result<Self> {
        let request_timeout_seconds = env_u64("REQUEST_TIMEOUT_SECONDS", 120).max(1);

        Ok(Config {
            log_level: env_string("LOG_LEVEL", "info").to_lowercase(),
            log_dir: PathBuf::from(env_string("LOG_DIR", "logs")),
            database_url: normalize_database_url(env_string(
                "DATABASE_URL",
                "sqlite://studio.db?mode=rwc",
            )),
            gateway_api_key: env_string("AI_GATEWAY_API_KEY", ""),
            gateway_base_url: env_string(
                "AI_GATEWAY_BASE_URL",
                "https://ai.gateway.lovable.dev/v1",
            ),
            high_quality_model: normalize_model_id(
                "HIGH_QUALITY_MODEL",
                env_string("HIGH_QUALITY_MODEL", DEFAULT_HIGH_QUALITY_MODEL),
                DEFAULT_HIGH_QUALITY_MODEL,
            ),
            fast_model: normalize_model_id(
                "FAST_MODEL",
                env_string("FAST_MODEL", DEFAULT_FAST_MODEL),
                DEFAULT_FAST_MODEL,
            ),
            request_timeout_seconds,
        })
    }

    pub fn require_gateway_key(&self) -> Result<&str> {
        let key = self.gateway_api_key.trim();
        if key.is_empty() {
            return Err(anyhow::anyhow!("AI_GATEWAY_API_KEY is required"));
        }
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_async_sqlite_scheme() {
        let url = normalize_database_url("sqlite+aiosqlite:///studio.db".to_string());
        assert_eq!(url, "sqlite:///studio.db");
    }

    #[test]
    fn blank_model_id_falls_back_to_default() {
        let model = normalize_model_id("FAST_MODEL", "   ".to_string(), DEFAULT_FAST_MODEL);
        assert_eq!(model, DEFAULT_FAST_MODEL);
    }
}
