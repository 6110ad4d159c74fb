use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::refresh,
        crate::handlers::auth::profile,
        crate::handlers::chat::chat_completion,
        crate::handlers::agent::make_html,
        crate::handlers::quota::get_quota,
    ),
    components(
        schemas(
            crate::models::RegisterRequest,
            crate::models::LoginRequest,
            crate::models::RefreshRequest,
            crate::models::MessageResponse,
            crate::models::TokenResponse,
            crate::models::ProfileResponse,
            crate::models::ErrorResponse,
            crate::models::ChatMessage,
            crate::models::ChatCompletionRequest,
            crate::models::ChatCompletionResponse,
            crate::models::ChatChoice,
            crate::models::TokenUsage,
            crate::models::Content,
            crate::models::Part,
            crate::models::HtmlRequest,
            crate::models::HtmlResponse,
            crate::models::QuotaStatusResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration, login and token refresh"),
        (name = "azure", description = "Azure OpenAI chat completions"),
        (name = "agent", description = "Gemini HTML generation"),
        (name = "quota", description = "Daily token quota"),
        (name = "health", description = "Health check endpoints")
    ),
    info(
        title = "LLM Quota Gateway",
        version = "1.0.0",
        description = "Authenticated LLM gateway with per-user daily token quotas"
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn create_docs_router() -> Router<AppState> {
    Router::new().merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
