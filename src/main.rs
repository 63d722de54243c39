use axum::Router;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod db;
mod entities;
mod handler;
mod openapi;
mod repo;
mod schema;
mod service;
mod state;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let state = state::AppState::new().await;

    let app = Router::new()
        .merge(handler::health::routes())
        .merge(handler::auth::routes(state.clone()))
        .merge(handler::me::routes(state.clone()))
        .merge(handler::posts::routes(state.clone()))
        .merge(handler::comments::routes(state.clone()))
        .merge(
            SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", openapi::ApiDoc::openapi()),
        );

    let port = state.config().port();
    let bind_addr = format!("0.0.0.0:{port}");

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|_| panic!("failed to bind to {}", bind_addr));

    tracing::info!(%bind_addr, "listening");
    axum::serve(listener, app).await.expect("server error");
}
