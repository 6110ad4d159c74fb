use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use uuid::Uuid;

use crate::{database::queries::UserQueries, errors::AppError, handlers::AppState};

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub username: String,
}

/// Accepts `Authorization: Bearer <jwt>` as well as a bare token.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let token = header_value
        .strip_prefix("Bearer ")
        .unwrap_or(header_value)
        .trim();

    (!token.is_empty()).then_some(token)
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| AppError::Auth("Authorization header is required".to_string()))?;

        let claims = state
            .jwt
            .verify_access_token(token)
            .map_err(|_| AppError::Auth("Invalid token".to_string()))?;

        // Tokens outlive account deletion; only accept users that still exist.
        let user = UserQueries::find_by_id(state.database.pool(), claims.sub)
            .await?
            .ok_or_else(|| AppError::Auth("User not found".to_string()))?;

        Ok(AuthenticatedUser {
            id: user.id,
            username: user.username,
        })
    }
}
