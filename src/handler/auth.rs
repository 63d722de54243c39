use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::{
    handler::{error_response, service_error_response, Ack, ErrorResponse},
    service::credentials::RegisterInput,
    state::AppState,
};

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub phone: Option<String>,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct RegisterResponse {
    pub account_uid: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct AccountSummary {
    pub uid: String,
    pub email: Option<String>,
    pub username: Option<String>,
    pub phone: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub account: AccountSummary,
}

#[derive(Deserialize, ToSchema)]
pub struct ForgotPasswordRequest {
    pub identifier: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ResetPasswordRequest {
    pub identifier: String,
    pub code: String,
    pub new_password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Serialize, ToSchema)]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/auth/register", post(register))
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/auth/forgot-password", post(forgot_password))
        .route("/api/v1/auth/reset-password", post(reset_password))
        .route("/api/v1/auth/refresh", post(refresh))
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Created", body = RegisterResponse),
        (status = 400, description = "Invalid payload", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Response {
    let input = RegisterInput {
        email: payload.email,
        username: payload.username,
        phone: payload.phone,
        password: payload.password,
    };

    match state.credentials().register(input).await {
        Ok(account) => (
            StatusCode::CREATED,
            Json(RegisterResponse {
                account_uid: account.uid.to_string(),
            }),
        )
            .into_response(),
        Err(err) => service_error_response(err),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Response {
    let account = match state
        .identity()
        .resolve_login(&payload.identifier, &payload.password)
        .await
    {
        Ok(account) => account,
        Err(err) => return service_error_response(err),
    };

    let pair = match state.tokens().issue(account.uid).await {
        Ok(pair) => pair,
        Err(err) => {
            tracing::error!(error = %err, "token issue failed");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                None,
                "internal error",
            );
        }
    };

    let response = LoginResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        account: AccountSummary {
            uid: account.uid.to_string(),
            email: account.email,
            username: account.username,
            phone: account.phone,
        },
    };
    (StatusCode::OK, Json(response)).into_response()
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset code issued", body = Ack),
        (status = 400, description = "Identifier is not an email or phone", body = ErrorResponse),
        (status = 404, description = "No matching account", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Response {
    match state.credentials().request_reset(&payload.identifier).await {
        Ok(()) => (StatusCode::OK, Ack::new("reset code issued")).into_response(),
        Err(err) => service_error_response(err),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password replaced", body = Ack),
        (status = 400, description = "Bad code or password", body = ErrorResponse),
        (status = 404, description = "No matching account", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Response {
    match state
        .credentials()
        .confirm_reset(&payload.identifier, &payload.code, &payload.new_password)
        .await
    {
        Ok(_) => (StatusCode::OK, Ack::new("password updated")).into_response(),
        Err(err) => service_error_response(err),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair", body = RefreshResponse),
        (status = 401, description = "Refresh token invalid or expired", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RefreshRequest>,
) -> Response {
    match state.tokens().refresh(&payload.refresh_token).await {
        Ok(Some(pair)) => (
            StatusCode::OK,
            Json(RefreshResponse {
                access_token: pair.access_token,
                refresh_token: pair.refresh_token,
            }),
        )
            .into_response(),
        Ok(None) => error_response(
            StatusCode::UNAUTHORIZED,
            "invalid_token",
            None,
            "refresh token is invalid or expired",
        ),
        Err(err) => {
            tracing::error!(error = %err, "token refresh failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                None,
                "internal error",
            )
        }
    }
}
