use anyhow::Result;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::services::QueryService;

use super::handlers::{self, AppState};

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/chat/completions", post(handlers::chat_completions))
        .route("/health", get(handlers::health))
        .with_state(state)
}

/// Serve the OpenAI-compatible RAG endpoint until interrupted.
pub async fn run_server(host: &str, port: u16, query: QueryService) -> Result<()> {
    let app = create_routes(AppState { query })
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    println!("🌐 textrag serving at http://{addr}");
    println!("💬 Chat endpoint: POST http://{addr}/v1/chat/completions");
    println!();
    println!("Press Ctrl+C to stop the server");

    axum::serve(listener, app).await?;

    Ok(())
}
