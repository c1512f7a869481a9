use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};

use crate::upstream::SnapshotCache;

use super::dashboard::Dashboard;
use super::routes;

#[derive(Clone)]
pub struct AppState {
    pub dashboard: Arc<Dashboard>,
    pub snapshots: SnapshotCache,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/operators", get(routes::operators))
        .route("/api/operators/query", post(routes::set_query))
        .route("/api/operators/stats", get(routes::operator_stats))
        .route("/api/health", get(routes::health))
        .layer(cors)
        .with_state(state)
}

pub async fn run(state: AppState, port: u16) {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("Failed to bind");

    tracing::info!("API server listening on port {port}");
    axum::serve(listener, app).await.expect("Server failed");
}
