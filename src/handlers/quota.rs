use axum::{extract::State, response::Json};

use crate::{
    errors::Result,
    handlers::AppState,
    middleware::AuthenticatedUser,
    models::{ErrorResponse, QuotaStatusResponse},
};

#[utoipa::path(
    get,
    path = "/quota",
    tag = "quota",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Today's token usage against the daily quota", body = QuotaStatusResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    )
)]
pub async fn get_quota(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<QuotaStatusResponse>> {
    Ok(Json(state.quota.quota_status(user.id).await?))
}
