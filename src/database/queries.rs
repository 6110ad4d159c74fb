use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::errors::Result;
use crate::models::*;

pub struct UserQueries;

impl UserQueries {
    pub async fn create_user(
        pool: &SqlitePool,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User> {
        let now = Utc::now();
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, email, password_hash, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id, username, email, password_hash, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_username(pool: &SqlitePool, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, created_at, updated_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, created_at, updated_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// True when either the username or the email is already registered.
    pub async fn exists(pool: &SqlitePool, username: &str, email: &str) -> Result<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ? OR email = ?")
                .bind(username)
                .bind(email)
                .fetch_one(pool)
                .await?;

        Ok(count > 0)
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

pub struct QuotaQueries;

impl QuotaQueries {
    pub async fn find_quota(pool: &SqlitePool, user_id: Uuid) -> Result<Option<UserQuota>> {
        let quota = sqlx::query_as::<_, UserQuota>(
            "SELECT user_id, daily_quota, created_at, updated_at FROM token_quotas WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(quota)
    }

    /// Inserts a quota row unless one already exists; an existing row wins.
    pub async fn insert_quota(pool: &SqlitePool, user_id: Uuid, daily_quota: i64) -> Result<()> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO token_quotas (user_id, daily_quota, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(daily_quota)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn find_usage(
        pool: &SqlitePool,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<DailyUsage>> {
        let usage = sqlx::query_as::<_, DailyUsage>(
            r#"
            SELECT id, user_id, usage_date, tokens_used, created_at, updated_at
            FROM token_usage
            WHERE user_id = ? AND usage_date = ?
            "#,
        )
        .bind(user_id)
        .bind(date)
        .fetch_optional(pool)
        .await?;

        Ok(usage)
    }

    /// Inserts a zero-usage row for (user, date) unless one already exists.
    pub async fn insert_usage(pool: &SqlitePool, user_id: Uuid, date: NaiveDate) -> Result<()> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO token_usage (user_id, usage_date, tokens_used, created_at, updated_at)
            VALUES (?, ?, 0, ?, ?)
            ON CONFLICT (user_id, usage_date) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(date)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Adds `tokens` to the (user, date) row only if the new total stays within
    /// the user's quota. The check and the write are one statement, so
    /// concurrent callers cannot both pass on a stale read.
    ///
    /// Returns `None` when the row is missing or the quota would be exceeded;
    /// nothing is written in that case.
    pub async fn try_increment_usage(
        pool: &SqlitePool,
        user_id: Uuid,
        date: NaiveDate,
        tokens: i64,
    ) -> Result<Option<DailyUsage>> {
        let usage = sqlx::query_as::<_, DailyUsage>(
            r#"
            UPDATE token_usage
            SET tokens_used = tokens_used + ?, updated_at = ?
            WHERE user_id = ?
              AND usage_date = ?
              AND tokens_used + ? <= (
                  SELECT daily_quota FROM token_quotas WHERE user_id = ?
              )
            RETURNING id, user_id, usage_date, tokens_used, created_at, updated_at
            "#,
        )
        .bind(tokens)
        .bind(Utc::now())
        .bind(user_id)
        .bind(date)
        .bind(tokens)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(usage)
    }

    pub async fn delete_usage_before(pool: &SqlitePool, date: NaiveDate) -> Result<u64> {
        let result = sqlx::query("DELETE FROM token_usage WHERE usage_date < ?")
            .bind(date)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn count_usage_rows(pool: &SqlitePool) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM token_usage")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}
