use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::{
    entities::accounts,
    handler::{require_account, service_error_response, Ack, ErrorResponse},
    service::credentials::ProfileUpdate,
    state::AppState,
};

#[derive(Serialize, ToSchema)]
pub struct AccountResponse {
    pub uid: String,
    pub email: Option<String>,
    pub username: Option<String>,
    pub phone: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<accounts::Model> for AccountResponse {
    fn from(model: accounts::Model) -> Self {
        Self {
            uid: model.uid.to_string(),
            email: model.email,
            username: model.username,
            phone: model.phone,
            first_name: model.first_name,
            last_name: model.last_name,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ChangeUsernameRequest {
    pub username: String,
}

#[derive(Serialize, ToSchema)]
pub struct ChangeUsernameResponse {
    pub message: String,
    pub username: String,
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/me", get(me).patch(update_me))
        .route("/api/v1/me/password", post(change_password))
        .route("/api/v1/me/username", post(change_username))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/api/v1/me",
    responses(
        (status = 200, description = "Current account", body = AccountResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "me"
)]
pub async fn me(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let account = match require_account(&state, &headers).await {
        Ok(account) => account,
        Err(response) => return response,
    };
    (StatusCode::OK, Json(AccountResponse::from(account))).into_response()
}

#[utoipa::path(
    patch,
    path = "/api/v1/me",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated account", body = AccountResponse),
        (status = 400, description = "Field conflict or invalid value", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "me"
)]
pub async fn update_me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<UpdateProfileRequest>,
) -> Response {
    let account = match require_account(&state, &headers).await {
        Ok(account) => account,
        Err(response) => return response,
    };

    let update = ProfileUpdate {
        first_name: payload.first_name,
        last_name: payload.last_name,
        username: payload.username,
        email: payload.email,
        phone: payload.phone,
    };

    match state.credentials().update_profile(account, update).await {
        Ok(updated) => (StatusCode::OK, Json(AccountResponse::from(updated))).into_response(),
        Err(err) => service_error_response(err),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/me/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = Ack),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "me"
)]
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<ChangePasswordRequest>,
) -> Response {
    let account = match require_account(&state, &headers).await {
        Ok(account) => account,
        Err(response) => return response,
    };

    match state
        .credentials()
        .change_password(account, &payload.old_password, &payload.new_password)
        .await
    {
        Ok(_) => (StatusCode::OK, Ack::new("password changed")).into_response(),
        Err(err) => service_error_response(err),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/me/username",
    request_body = ChangeUsernameRequest,
    responses(
        (status = 200, description = "Username changed", body = ChangeUsernameResponse),
        (status = 400, description = "Username taken or invalid", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "me"
)]
pub async fn change_username(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<ChangeUsernameRequest>,
) -> Response {
    let account = match require_account(&state, &headers).await {
        Ok(account) => account,
        Err(response) => return response,
    };

    match state
        .credentials()
        .change_username(account, &payload.username)
        .await
    {
        Ok(updated) => (
            StatusCode::OK,
            Json(ChangeUsernameResponse {
                message: "username changed".to_string(),
                username: updated.username.unwrap_or_default(),
            }),
        )
            .into_response(),
        Err(err) => service_error_response(err),
    }
}
