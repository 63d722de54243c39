use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{entities::accounts, service::ServiceError, state::AppState};

pub mod auth;
pub mod comments;
pub mod health;
pub mod me;
pub mod posts;

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct Ack {
    pub message: String,
}

impl Ack {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

pub(crate) fn error_response(
    status: StatusCode,
    code: &str,
    field: Option<&str>,
    message: impl Into<String>,
) -> Response {
    (
        status,
        Json(ErrorResponse {
            code: code.to_string(),
            field: field.map(str::to_string),
            message: message.into(),
        }),
    )
        .into_response()
}

/// Map a domain failure onto the wire. Internal details are logged, never
/// echoed.
pub(crate) fn service_error_response(err: ServiceError) -> Response {
    match err {
        ServiceError::Validation { field, message } => {
            error_response(StatusCode::BAD_REQUEST, "validation_error", Some(field), message)
        }
        ServiceError::AuthFailure => error_response(
            StatusCode::UNAUTHORIZED,
            "invalid_credentials",
            None,
            "invalid credentials",
        ),
        ServiceError::NotFound => {
            error_response(StatusCode::NOT_FOUND, "not_found", None, "not found")
        }
        ServiceError::Internal(detail) => {
            tracing::error!(%detail, "request failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                None,
                "internal error",
            )
        }
    }
}

fn auth_required() -> Response {
    error_response(
        StatusCode::UNAUTHORIZED,
        "auth_required",
        None,
        "authentication required",
    )
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolve the Authorization header to an account, or produce the 401
/// response. Handlers pass the account into the services explicitly; there is
/// no ambient current-user state.
pub(crate) async fn require_account(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<accounts::Model, Response> {
    let Some(token) = bearer_token(headers) else {
        return Err(auth_required());
    };

    let account_uid = match state.tokens().authenticate(token).await {
        Ok(Some(uid)) => uid,
        Ok(None) => return Err(auth_required()),
        Err(err) => {
            tracing::error!(error = %err, "token lookup failed");
            return Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                None,
                "internal error",
            ));
        }
    };

    let account = match state.accounts_repo().find_by_uid(account_uid).await {
        Ok(value) => value,
        Err(err) => {
            tracing::error!(error = %err, "account lookup failed");
            return Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                None,
                "internal error",
            ));
        }
    };

    account.ok_or_else(auth_required)
}
