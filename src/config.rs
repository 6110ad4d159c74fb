use anyhow::{Context, Result};
use chrono::{FixedOffset, Offset, Utc};
use std::env;

const DEFAULT_JWT_SECRET: &str = "your-default-secret-key";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub bcrypt_cost: u32,
    pub azure: AzureOpenAiConfig,
    pub gemini: GeminiConfig,
    pub quota: QuotaConfig,
}

#[derive(Debug, Clone)]
pub struct AzureOpenAiConfig {
    pub endpoint: String,
    pub api_key: String,
    pub deployment: String,
    pub api_version: String,
}

impl AzureOpenAiConfig {
    pub fn is_complete(&self) -> bool {
        !self.endpoint.is_empty() && !self.api_key.is_empty() && !self.deployment.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl GeminiConfig {
    pub fn is_complete(&self) -> bool {
        !self.api_key.is_empty() && !self.model.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct QuotaConfig {
    /// Ceiling assigned to users on their first quota lookup.
    pub default_daily_quota: i64,
    /// Tokens reserved before a provider call, before the real cost is known.
    pub chat_token_estimate: u32,
    pub sweep_interval_secs: u64,
    /// Calendar days roll over at midnight in this offset.
    pub utc_offset: FixedOffset,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            default_daily_quota: 100_000,
            chat_token_estimate: 1_000,
            sweep_interval_secs: 3_600,
            utc_offset: Utc.fix(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            database_url: "sqlite::memory:".to_string(),
            database_max_connections: 1,
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            bcrypt_cost: bcrypt::DEFAULT_COST,
            azure: AzureOpenAiConfig {
                endpoint: String::new(),
                api_key: String::new(),
                deployment: "gpt-4o".to_string(),
                api_version: "2024-06-01".to_string(),
            },
            gemini: GeminiConfig {
                api_key: String::new(),
                model: "gemini-2.0-flash".to_string(),
                base_url: "https://generativelanguage.googleapis.com".to_string(),
            },
            quota: QuotaConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let offset_minutes: i32 = env_or("QUOTA_UTC_OFFSET_MINUTES", "0")
            .parse()
            .context("QUOTA_UTC_OFFSET_MINUTES must be an integer")?;
        let utc_offset = FixedOffset::east_opt(offset_minutes * 60)
            .context("QUOTA_UTC_OFFSET_MINUTES is out of range")?;

        let default_daily_quota: i64 = env_or("DEFAULT_DAILY_TOKEN_QUOTA", "100000")
            .parse()
            .context("DEFAULT_DAILY_TOKEN_QUOTA must be an integer")?;
        if default_daily_quota <= 0 {
            anyhow::bail!("DEFAULT_DAILY_TOKEN_QUOTA must be positive");
        }

        let config = Config {
            port: env_or("PORT", "8080").parse().context("PORT must be a port number")?,
            database_url: env_or("DATABASE_URL", "sqlite://gateway.db"),
            database_max_connections: env_or("DATABASE_MAX_CONNECTIONS", "5")
                .parse()
                .context("DATABASE_MAX_CONNECTIONS must be an integer")?,
            jwt_secret: env_or("JWT_SECRET", DEFAULT_JWT_SECRET),
            bcrypt_cost: env_or("BCRYPT_COST", &bcrypt::DEFAULT_COST.to_string())
                .parse()
                .context("BCRYPT_COST must be an integer")?,
            azure: AzureOpenAiConfig {
                endpoint: env_or("AZURE_OPENAI_ENDPOINT", ""),
                api_key: env_or("AZURE_OPENAI_KEY", ""),
                deployment: env_or("AZURE_OPENAI_DEPLOYMENT", "gpt-4o"),
                api_version: env_or("AZURE_OPENAI_API_VERSION", "2024-06-01"),
            },
            gemini: GeminiConfig {
                api_key: env_or("GEMINI_API_KEY", ""),
                model: env_or("GEMINI_MODEL", "gemini-2.0-flash"),
                base_url: env_or(
                    "GEMINI_BASE_URL",
                    "https://generativelanguage.googleapis.com",
                ),
            },
            quota: QuotaConfig {
                default_daily_quota,
                chat_token_estimate: env_or("CHAT_TOKEN_ESTIMATE", "1000")
                    .parse()
                    .context("CHAT_TOKEN_ESTIMATE must be a non-negative integer")?,
                sweep_interval_secs: env_or("USAGE_SWEEP_INTERVAL_SECS", "3600")
                    .parse()
                    .context("USAGE_SWEEP_INTERVAL_SECS must be an integer")?,
                utc_offset,
            },
        };

        config.warn_on_incomplete();
        Ok(config)
    }

    fn warn_on_incomplete(&self) {
        if self.jwt_secret == DEFAULT_JWT_SECRET {
            tracing::warn!("Using default JWT secret; set JWT_SECRET in the environment");
        }
        if !self.azure.is_complete() {
            tracing::warn!(
                "Azure OpenAI configuration is incomplete; set AZURE_OPENAI_ENDPOINT, AZURE_OPENAI_KEY and AZURE_OPENAI_DEPLOYMENT"
            );
        }
        if !self.gemini.is_complete() {
            tracing::warn!("Gemini configuration is incomplete; set GEMINI_API_KEY");
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(value) if !value.is_empty() => value,
        _ => default.to_string(),
    }
}
