use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    handler::{error_response, require_account, service_error_response, ErrorResponse},
    service::comments::CommentView,
    state::AppState,
};

#[derive(Deserialize, ToSchema)]
pub struct CreateCommentRequest {
    pub content: String,
    pub mentions: Option<Vec<Uuid>>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateCommentRequest {
    pub content: Option<String>,
    pub mentions: Option<Vec<Uuid>>,
}

#[derive(Serialize, ToSchema)]
pub struct CommentResponse {
    pub uid: String,
    pub post_uid: String,
    pub author_uid: String,
    pub content: String,
    pub mentions: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CommentView> for CommentResponse {
    fn from(view: CommentView) -> Self {
        Self {
            uid: view.comment.uid.to_string(),
            post_uid: view.post_uid.to_string(),
            author_uid: view.author_uid.to_string(),
            content: view.comment.content,
            mentions: view.mention_uids,
            created_at: view.comment.created_at.with_timezone(&Utc),
            updated_at: view.comment.updated_at.with_timezone(&Utc),
        }
    }
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/api/v1/posts/:uid/comments",
            get(list_comments).post(create_comment),
        )
        .route(
            "/api/v1/comments/:uid",
            get(get_comment).patch(update_comment).delete(delete_comment),
        )
        .with_state(state)
}

fn parse_uid(raw: &str) -> Result<Uuid, Response> {
    Uuid::parse_str(raw).map_err(|_| {
        error_response(StatusCode::BAD_REQUEST, "validation_error", Some("uid"), "invalid uid")
    })
}

#[utoipa::path(
    get,
    path = "/api/v1/posts/{uid}/comments",
    params(("uid" = String, Path, description = "Post uid")),
    responses(
        (status = 200, description = "Comments on the post, newest first", body = [CommentResponse]),
        (status = 404, description = "Post not found", body = ErrorResponse)
    ),
    tag = "comments"
)]
pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
) -> Response {
    let uid = match parse_uid(&uid) {
        Ok(uid) => uid,
        Err(response) => return response,
    };
    match state.comments().list_by_post(uid).await {
        Ok(views) => {
            let body: Vec<CommentResponse> = views.into_iter().map(Into::into).collect();
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => service_error_response(err),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/posts/{uid}/comments",
    request_body = CreateCommentRequest,
    params(("uid" = String, Path, description = "Post uid")),
    responses(
        (status = 201, description = "Created", body = CommentResponse),
        (status = 400, description = "Invalid payload", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Post not found", body = ErrorResponse)
    ),
    tag = "comments"
)]
pub async fn create_comment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(uid): Path<String>,
    Json(payload): Json<CreateCommentRequest>,
) -> Response {
    let account = match require_account(&state, &headers).await {
        Ok(account) => account,
        Err(response) => return response,
    };
    let uid = match parse_uid(&uid) {
        Ok(uid) => uid,
        Err(response) => return response,
    };

    match state
        .comments()
        .create(
            uid,
            &account,
            payload.content,
            payload.mentions.unwrap_or_default(),
        )
        .await
    {
        Ok(view) => (StatusCode::CREATED, Json(CommentResponse::from(view))).into_response(),
        Err(err) => service_error_response(err),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/comments/{uid}",
    params(("uid" = String, Path, description = "Comment uid")),
    responses(
        (status = 200, description = "Comment", body = CommentResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "comments"
)]
pub async fn get_comment(State(state): State<Arc<AppState>>, Path(uid): Path<String>) -> Response {
    let uid = match parse_uid(&uid) {
        Ok(uid) => uid,
        Err(response) => return response,
    };
    match state.comments().get(uid).await {
        Ok(view) => (StatusCode::OK, Json(CommentResponse::from(view))).into_response(),
        Err(err) => service_error_response(err),
    }
}

#[utoipa::path(
    patch,
    path = "/api/v1/comments/{uid}",
    request_body = UpdateCommentRequest,
    params(("uid" = String, Path, description = "Comment uid")),
    responses(
        (status = 200, description = "Updated", body = CommentResponse),
        (status = 400, description = "Invalid payload", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "comments"
)]
pub async fn update_comment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(uid): Path<String>,
    Json(payload): Json<UpdateCommentRequest>,
) -> Response {
    if let Err(response) = require_account(&state, &headers).await {
        return response;
    }
    let uid = match parse_uid(&uid) {
        Ok(uid) => uid,
        Err(response) => return response,
    };

    match state
        .comments()
        .update(uid, payload.content, payload.mentions)
        .await
    {
        Ok(view) => (StatusCode::OK, Json(CommentResponse::from(view))).into_response(),
        Err(err) => service_error_response(err),
    }
}

#[utoipa::path(
    delete,
    path = "/api/v1/comments/{uid}",
    params(("uid" = String, Path, description = "Comment uid")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "comments"
)]
pub async fn delete_comment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(uid): Path<String>,
) -> Response {
    if let Err(response) = require_account(&state, &headers).await {
        return response;
    }
    let uid = match parse_uid(&uid) {
        Ok(uid) => uid,
        Err(response) => return response,
    };

    match state.comments().delete(uid).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => service_error_response(err),
    }
}
