use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Per-user daily ceiling, in provider tokens.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserQuota {
    pub user_id: Uuid,
    pub daily_quota: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Tokens consumed by one user on one calendar day.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DailyUsage {
    pub id: i64,
    pub user_id: Uuid,
    pub usage_date: NaiveDate,
    pub tokens_used: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QuotaStatusResponse {
    pub daily_quota: i64,
    pub tokens_used: i64,
    pub remaining: i64,
    pub date: NaiveDate,
    pub resets_at: DateTime<Utc>,
}
