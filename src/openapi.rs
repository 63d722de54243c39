use utoipa::OpenApi;

use crate::handler::{
    self,
    auth::{
        AccountSummary, ForgotPasswordRequest, LoginRequest, LoginResponse, RefreshRequest,
        RefreshResponse, RegisterRequest, RegisterResponse, ResetPasswordRequest,
    },
    comments::{CommentResponse, CreateCommentRequest, UpdateCommentRequest},
    health::Health,
    me::{
        AccountResponse, ChangePasswordRequest, ChangeUsernameRequest, ChangeUsernameResponse,
        UpdateProfileRequest,
    },
    posts::{CreatePostRequest, PostResponse, UpdatePostRequest},
    Ack, ErrorResponse,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        handler::health::health,
        handler::auth::register,
        handler::auth::login,
        handler::auth::forgot_password,
        handler::auth::reset_password,
        handler::auth::refresh,
        handler::me::me,
        handler::me::update_me,
        handler::me::change_password,
        handler::me::change_username,
        handler::posts::list_posts,
        handler::posts::create_post,
        handler::posts::get_post,
        handler::posts::update_post,
        handler::posts::delete_post,
        handler::comments::list_comments,
        handler::comments::create_comment,
        handler::comments::get_comment,
        handler::comments::update_comment,
        handler::comments::delete_comment
    ),
    components(schemas(
        Health,
        ErrorResponse,
        Ack,
        RegisterRequest,
        RegisterResponse,
        LoginRequest,
        LoginResponse,
        AccountSummary,
        ForgotPasswordRequest,
        ResetPasswordRequest,
        RefreshRequest,
        RefreshResponse,
        AccountResponse,
        UpdateProfileRequest,
        ChangePasswordRequest,
        ChangeUsernameRequest,
        ChangeUsernameResponse,
        CreatePostRequest,
        UpdatePostRequest,
        PostResponse,
        CreateCommentRequest,
        UpdateCommentRequest,
        CommentResponse
    )),
    tags(
        (name = "health", description = "Health check"),
        (name = "auth", description = "Registration, login, password reset"),
        (name = "me", description = "Authenticated account"),
        (name = "posts", description = "Posts"),
        (name = "comments", description = "Comments")
    )
)]
pub struct ApiDoc;
