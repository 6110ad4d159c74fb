use std::time::Duration;

use tokio::task::JoinHandle;

use crate::services::token_quota::TokenQuotaService;

/// Periodically prunes usage rows from previous days.
///
/// The first sweep runs immediately. Failures are logged and retried on the
/// next tick.
pub fn spawn_usage_sweeper(quota: TokenQuotaService, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match quota.reset_daily_usage().await {
                Ok(deleted) => tracing::debug!(deleted, "Token usage sweep finished"),
                Err(e) => tracing::error!("Token usage sweep failed: {}", e),
            }
        }
    })
}
