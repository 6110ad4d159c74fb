use axum::{extract::State, response::Json};

use crate::{
    errors::{AppError, Result},
    handlers::{reserve_tokens, settle_tokens, AppState},
    middleware::AuthenticatedUser,
    models::{Content, ErrorResponse, HtmlRequest, HtmlResponse},
};

const PROVIDER: &str = "gemini";

const HTML_INSTRUCTION: &str = "You are an expert software engineer who generates HTML code.";

#[utoipa::path(
    post,
    path = "/agent/make-html",
    tag = "agent",
    security(("bearer_auth" = [])),
    request_body = HtmlRequest,
    responses(
        (status = 200, description = "Generated HTML", body = HtmlResponse),
        (status = 400, description = "No contents provided", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 429, description = "Daily token quota exceeded", body = ErrorResponse)
    )
)]
pub async fn make_html(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<HtmlRequest>,
) -> Result<Json<HtmlResponse>> {
    let mut contents = request.contents;
    if contents.is_empty() {
        return Err(AppError::Validation("No contents provided".to_string()));
    }
    if contents.len() == 1 {
        contents.push(Content::user_text(HTML_INSTRUCTION));
    }

    if !state.gemini.is_configured() {
        return Err(AppError::Configuration(
            "Gemini configuration is incomplete".to_string(),
        ));
    }

    let reserved = reserve_tokens(&state, user.id, PROVIDER).await?;

    let reply = state.gemini.generate_content(&contents).await?;

    settle_tokens(&state, user.id, PROVIDER, reserved, reply.total_tokens).await;

    Ok(Json(HtmlResponse { html: reply.text }))
}
