use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use darts_backend::api;
use darts_backend::config::Config;
use darts_backend::db::Database;
use darts_backend::events::BroadcastSink;
use darts_backend::metrics;
use darts_backend::pipeline::TurnPipeline;
use darts_backend::store::{MemoryStore, SessionStore};

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "darts-backend" }))
}

fn build_app<S: SessionStore>(store: S, config: &Config) -> Router {
    let events = Arc::new(BroadcastSink::new(config.event_channel_capacity));
    let pipeline = Arc::new(TurnPipeline::new(
        store,
        events.clone(),
        config.bot_throw_delay,
    ));

    Router::new()
        .route("/health", get(health_check))
        .merge(api::router(pipeline, events))
        .layer(CorsLayer::permissive())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    metrics::register_metrics();

    let config = Config::load();

    let app = match &config.database_url {
        Some(url) => {
            let db = Database::new(url)
                .await
                .expect("Failed to initialize database");
            tracing::info!("Persisting games to {url}");
            build_app(db, &config)
        }
        None => {
            tracing::info!("No DATABASE_URL set, keeping games in memory");
            build_app(MemoryStore::new(), &config)
        }
    };

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to {addr}: {e}"));

    tracing::info!("Darts backend listening on port {}", config.port);
    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
