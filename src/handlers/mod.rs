use std::{sync::Arc, time::Duration};

use crate::{
    auth::JwtService,
    config::Config,
    database::Database,
    errors::{AppError, Result},
    services::{AzureOpenAiClient, GeminiClient, MetricsService, TokenQuotaService},
};

pub mod agent;
pub mod auth;
pub mod chat;
pub mod docs;
pub mod health;
pub mod metrics;
pub mod quota;

/// Upper bound on a single upstream provider call.
const PROVIDER_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Clone)]
pub struct AppState {
    pub database: Database,
    pub config: Arc<Config>,
    pub jwt: Arc<JwtService>,
    pub quota: TokenQuotaService,
    pub azure: AzureOpenAiClient,
    pub gemini: GeminiClient,
    pub metrics: Arc<MetricsService>,
}

impl AppState {
    pub fn new(database: Database, config: Config) -> Result<Self> {
        Ok(Self {
            quota: TokenQuotaService::new(database.clone(), &config.quota),
            jwt: Arc::new(JwtService::new(&config.jwt_secret)),
            azure: AzureOpenAiClient::new(config.azure.clone(), PROVIDER_TIMEOUT)?,
            gemini: GeminiClient::new(config.gemini.clone(), PROVIDER_TIMEOUT)?,
            metrics: Arc::new(MetricsService::new()?),
            config: Arc::new(config),
            database,
        })
    }
}

/// Charges the upfront estimate for a provider call.
async fn reserve_tokens(state: &AppState, user_id: uuid::Uuid, provider: &str) -> Result<u32> {
    let estimate = state.config.quota.chat_token_estimate;

    match state.quota.update_usage(user_id, estimate).await {
        Ok(_) => {
            state.metrics.record_tokens(provider, estimate);
            Ok(estimate)
        }
        Err(e @ AppError::QuotaExceeded { .. }) => {
            state.metrics.record_quota_rejection(provider);
            Err(e)
        }
        Err(e) => Err(e),
    }
}

/// Charges whatever the provider reported beyond the reservation.
///
/// The provider call has already happened, so a rejection here is logged
/// rather than surfaced to the client.
async fn settle_tokens(
    state: &AppState,
    user_id: uuid::Uuid,
    provider: &str,
    reserved: u32,
    actual: u32,
) {
    let overage = actual.saturating_sub(reserved);
    if overage == 0 {
        return;
    }

    match state.quota.update_usage(user_id, overage).await {
        Ok(usage) => {
            state.metrics.record_tokens(provider, overage);
            tracing::debug!(%user_id, provider, overage, tokens_used = usage.tokens_used, "Charged token overage");
        }
        Err(AppError::QuotaExceeded { .. }) => {
            state.metrics.record_quota_rejection(provider);
            tracing::warn!(%user_id, provider, overage, "Token overage exceeds remaining daily quota");
        }
        Err(e) => tracing::error!(%user_id, provider, "Failed to charge token overage: {}", e),
    }
}
