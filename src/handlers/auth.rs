use axum::{extract::State, http::StatusCode, response::Json};

use crate::{
    auth::PasswordService,
    database::queries::UserQueries,
    errors::{AppError, Result},
    handlers::AppState,
    middleware::AuthenticatedUser,
    models::{
        ErrorResponse, LoginRequest, MessageResponse, ProfileResponse, RefreshRequest,
        RegisterRequest, TokenResponse,
    },
};

#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = MessageResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 409, description = "Username or email taken", body = ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<MessageResponse>)> {
    PasswordService::validate_username(&request.username)?;

    if !request.email.contains('@') {
        return Err(AppError::Validation("Invalid email format".to_string()));
    }

    PasswordService::validate_password_strength(&request.password)?;

    let pool = state.database.pool();
    if UserQueries::exists(pool, &request.username, &request.email).await? {
        return Err(AppError::Conflict(
            "Username or email already registered".to_string(),
        ));
    }

    let password_hash = PasswordService::hash_password(&request.password, state.config.bcrypt_cost)?;

    let user = match UserQueries::create_user(pool, &request.username, &request.email, &password_hash).await {
        Ok(user) => user,
        Err(AppError::Database(sqlx::Error::Database(e))) if e.is_unique_violation() => {
            return Err(AppError::Conflict(
                "Username or email already registered".to_string(),
            ));
        }
        Err(e) => return Err(e),
    };

    tracing::info!(user_id = %user.id, username = %user.username, "Registered user");

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "User created successfully".to_string(),
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Access and refresh tokens", body = TokenResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>> {
    let invalid = || AppError::Auth("Invalid credentials".to_string());

    let user = UserQueries::find_by_username(state.database.pool(), &request.username)
        .await?
        .ok_or_else(invalid)?;

    if !PasswordService::verify_password(&request.password, &user.password_hash)? {
        return Err(invalid());
    }

    let pair = state.jwt.generate_pair(user.id, &user.username)?;

    Ok(Json(TokenResponse::bearer(
        pair.access_token,
        pair.refresh_token,
        state.jwt.access_token_ttl_secs(),
    )))
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    tag = "auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Rotated tokens", body = TokenResponse),
        (status = 401, description = "Invalid refresh token", body = ErrorResponse)
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<TokenResponse>> {
    let claims = state
        .jwt
        .verify_refresh_token(&request.refresh_token)
        .map_err(|_| AppError::Auth("Invalid refresh token".to_string()))?;

    let user = UserQueries::find_by_id(state.database.pool(), claims.sub)
        .await?
        .ok_or_else(|| AppError::Auth("Invalid refresh token".to_string()))?;

    let pair = state.jwt.generate_pair(user.id, &user.username)?;

    Ok(Json(TokenResponse::bearer(
        pair.access_token,
        pair.refresh_token,
        state.jwt.access_token_ttl_secs(),
    )))
}

#[utoipa::path(
    get,
    path = "/auth/profile",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Authenticated user's profile", body = ProfileResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
pub async fn profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<ProfileResponse>> {
    let user = UserQueries::find_by_id(state.database.pool(), user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

    Ok(Json(ProfileResponse::from(user)))
}
