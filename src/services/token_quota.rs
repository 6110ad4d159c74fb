//! Per-user, per-day token accounting.
//!
//! A user's ceiling lives in `token_quotas`; consumption lives in one
//! `token_usage` row per (user, calendar day). The ceiling "resets" each day
//! only because a new day starts a fresh zero row. [`TokenQuotaService::reset_daily_usage`]
//! merely prunes rows from earlier days.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use crate::{
    config::QuotaConfig,
    database::{queries::QuotaQueries, Database},
    errors::{AppError, Result},
    models::{DailyUsage, QuotaStatusResponse, UserQuota},
};

#[derive(Clone)]
pub struct TokenQuotaService {
    database: Database,
    default_daily_quota: i64,
    utc_offset: FixedOffset,
}

impl TokenQuotaService {
    pub fn new(database: Database, config: &QuotaConfig) -> Self {
        Self {
            database,
            default_daily_quota: config.default_daily_quota,
            utc_offset: config.utc_offset,
        }
    }

    /// Calendar day containing `at`, in the service's reference offset.
    pub fn day_of(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.utc_offset).date_naive()
    }

    pub fn today(&self) -> NaiveDate {
        self.day_of(Utc::now())
    }

    /// Start of the next calendar day, as a UTC instant.
    pub fn next_reset(&self) -> DateTime<Utc> {
        let tomorrow = self.today() + Duration::days(1);
        let midnight = tomorrow.and_time(NaiveTime::MIN);
        (midnight - Duration::seconds(i64::from(self.utc_offset.local_minus_utc()))).and_utc()
    }

    pub async fn get_user_quota(&self, user_id: Uuid) -> Result<UserQuota> {
        let pool = self.database.pool();

        if let Some(quota) = QuotaQueries::find_quota(pool, user_id).await? {
            return Ok(quota);
        }

        tracing::debug!(%user_id, daily_quota = self.default_daily_quota, "Creating default token quota");
        QuotaQueries::insert_quota(pool, user_id, self.default_daily_quota).await?;

        // A concurrent caller may have inserted first; read whichever row won.
        QuotaQueries::find_quota(pool, user_id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("token quota for {} vanished after insert", user_id)))
    }

    pub async fn get_daily_usage(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<DailyUsage> {
        self.usage_for_day(user_id, self.day_of(at)).await
    }

    async fn usage_for_day(&self, user_id: Uuid, date: NaiveDate) -> Result<DailyUsage> {
        let pool = self.database.pool();

        if let Some(usage) = QuotaQueries::find_usage(pool, user_id, date).await? {
            return Ok(usage);
        }

        QuotaQueries::insert_usage(pool, user_id, date).await?;

        QuotaQueries::find_usage(pool, user_id, date)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("token usage for {} on {} vanished after insert", user_id, date)))
    }

    /// Charges `tokens` against today's usage.
    ///
    /// Fails with [`AppError::QuotaExceeded`] when the new total would pass the
    /// user's ceiling; the stored usage is left untouched in that case.
    pub async fn update_usage(&self, user_id: Uuid, tokens: u32) -> Result<DailyUsage> {
        let today = self.today();
        let usage = self.usage_for_day(user_id, today).await?;
        let quota = self.get_user_quota(user_id).await?;

        if tokens == 0 {
            return Ok(usage);
        }

        match QuotaQueries::try_increment_usage(self.database.pool(), user_id, today, i64::from(tokens)).await? {
            Some(updated) => {
                tracing::debug!(
                    %user_id,
                    tokens,
                    tokens_used = updated.tokens_used,
                    daily_quota = quota.daily_quota,
                    "Recorded token usage"
                );
                Ok(updated)
            }
            None => Err(AppError::QuotaExceeded {
                user_id,
                requested: tokens,
            }),
        }
    }

    /// Deletes usage rows from days before today. Returns the number of rows removed.
    pub async fn reset_daily_usage(&self) -> Result<u64> {
        let today = self.today();
        let deleted = QuotaQueries::delete_usage_before(self.database.pool(), today).await?;

        if deleted > 0 {
            tracing::info!(deleted, before = %today, "Pruned token usage from previous days");
        }

        Ok(deleted)
    }

    pub async fn quota_status(&self, user_id: Uuid) -> Result<QuotaStatusResponse> {
        let usage = self.get_daily_usage(user_id, Utc::now()).await?;
        let quota = self.get_user_quota(user_id).await?;

        Ok(QuotaStatusResponse {
            daily_quota: quota.daily_quota,
            tokens_used: usage.tokens_used,
            remaining: (quota.daily_quota - usage.tokens_used).max(0),
            date: usage.usage_date,
            resets_at: self.next_reset(),
        })
    }
}
