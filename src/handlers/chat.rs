use axum::{extract::State, response::Json};

use crate::{
    errors::{AppError, Result},
    handlers::{reserve_tokens, settle_tokens, AppState},
    middleware::AuthenticatedUser,
    models::{ChatCompletionRequest, ChatCompletionResponse, ErrorResponse},
};

const PROVIDER: &str = "azure";

#[utoipa::path(
    post,
    path = "/azure/chat/completions",
    tag = "azure",
    security(("bearer_auth" = [])),
    request_body = ChatCompletionRequest,
    responses(
        (status = 200, description = "Completion from the Azure OpenAI deployment", body = ChatCompletionResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 429, description = "Daily token quota exceeded", body = ErrorResponse),
        (status = 500, description = "Provider not configured", body = ErrorResponse)
    )
)]
pub async fn chat_completion(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<ChatCompletionRequest>,
) -> Result<Json<ChatCompletionResponse>> {
    if !state.azure.is_configured() {
        return Err(AppError::Configuration(
            "Azure OpenAI configuration is incomplete".to_string(),
        ));
    }

    if request.messages.is_empty() {
        return Err(AppError::Validation("messages must not be empty".to_string()));
    }

    let reserved = reserve_tokens(&state, user.id, PROVIDER).await?;

    let response = state.azure.chat_completion(&request).await?;

    settle_tokens(&state, user.id, PROVIDER, reserved, response.usage.total_tokens).await;

    Ok(Json(response))
}
