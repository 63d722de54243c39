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
    service::posts::PostView,
    state::AppState,
};

#[derive(Deserialize, ToSchema)]
pub struct CreatePostRequest {
    pub content: String,
    pub mentions: Option<Vec<Uuid>>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdatePostRequest {
    pub content: Option<String>,
    pub mentions: Option<Vec<Uuid>>,
}

#[derive(Serialize, ToSchema)]
pub struct PostResponse {
    pub uid: String,
    pub author_uid: String,
    pub content: String,
    pub mentions: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PostView> for PostResponse {
    fn from(view: PostView) -> Self {
        Self {
            uid: view.post.uid.to_string(),
            author_uid: view.author_uid.to_string(),
            content: view.post.content,
            mentions: view.mention_uids,
            created_at: view.post.created_at.with_timezone(&Utc),
            updated_at: view.post.updated_at.with_timezone(&Utc),
        }
    }
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/posts", get(list_posts).post(create_post))
        .route(
            "/api/v1/posts/:uid",
            get(get_post).patch(update_post).delete(delete_post),
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
    path = "/api/v1/posts",
    responses(
        (status = 200, description = "All posts, newest first", body = [PostResponse])
    ),
    tag = "posts"
)]
pub async fn list_posts(State(state): State<Arc<AppState>>) -> Response {
    match state.posts().list().await {
        Ok(views) => {
            let body: Vec<PostResponse> = views.into_iter().map(Into::into).collect();
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => service_error_response(err),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/posts",
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Created", body = PostResponse),
        (status = 400, description = "Invalid payload", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "posts"
)]
pub async fn create_post(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<CreatePostRequest>,
) -> Response {
    let account = match require_account(&state, &headers).await {
        Ok(account) => account,
        Err(response) => return response,
    };

    match state
        .posts()
        .create(&account, payload.content, payload.mentions.unwrap_or_default())
        .await
    {
        Ok(view) => (StatusCode::CREATED, Json(PostResponse::from(view))).into_response(),
        Err(err) => service_error_response(err),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/posts/{uid}",
    params(("uid" = String, Path, description = "Post uid")),
    responses(
        (status = 200, description = "Post", body = PostResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "posts"
)]
pub async fn get_post(State(state): State<Arc<AppState>>, Path(uid): Path<String>) -> Response {
    let uid = match parse_uid(&uid) {
        Ok(uid) => uid,
        Err(response) => return response,
    };
    match state.posts().get(uid).await {
        Ok(view) => (StatusCode::OK, Json(PostResponse::from(view))).into_response(),
        Err(err) => service_error_response(err),
    }
}

#[utoipa::path(
    patch,
    path = "/api/v1/posts/{uid}",
    request_body = UpdatePostRequest,
    params(("uid" = String, Path, description = "Post uid")),
    responses(
        (status = 200, description = "Updated", body = PostResponse),
        (status = 400, description = "Invalid payload", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "posts"
)]
pub async fn update_post(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(uid): Path<String>,
    Json(payload): Json<UpdatePostRequest>,
) -> Response {
    if let Err(response) = require_account(&state, &headers).await {
        return response;
    }
    let uid = match parse_uid(&uid) {
        Ok(uid) => uid,
        Err(response) => return response,
    };

    match state
        .posts()
        .update(uid, payload.content, payload.mentions)
        .await
    {
        Ok(view) => (StatusCode::OK, Json(PostResponse::from(view))).into_response(),
        Err(err) => service_error_response(err),
    }
}

#[utoipa::path(
    delete,
    path = "/api/v1/posts/{uid}",
    params(("uid" = String, Path, description = "Post uid")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "posts"
)]
pub async fn delete_post(
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

    match state.posts().delete(uid).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => service_error_response(err),
    }
}
